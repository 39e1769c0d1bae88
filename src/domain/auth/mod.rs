//! Authentication domain
//!
//! Error taxonomy and token vocabulary shared by the session endpoints and
//! the client gatekeeper.

mod error;
mod token;

pub use error::AuthError;
pub use token::{InvalidToken, TokenKind};
