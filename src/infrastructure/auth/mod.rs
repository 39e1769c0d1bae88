//! Authentication infrastructure module
//!
//! This module provides JWT issuance and verification for the two token kinds.

mod jwt;

pub use jwt::{JwtConfig, JwtService, TokenClaims, TokenIssuer, TokenVerifier};
