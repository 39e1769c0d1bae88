//! Session endpoint logic
//!
//! Token issuance at register/login, access-token minting at refresh, and
//! bearer-token authorization for protected routes.

mod service;

pub use service::{IssuedSession, RefreshedSession, Registration, SessionService, TokenService};
