//! Domain layer - Core entities, errors and repository traits

pub mod auth;
pub mod error;
pub mod user;

pub use auth::{AuthError, InvalidToken, TokenKind};
pub use error::DomainError;
pub use user::{User, UserId, UserProfile, UserRepository, UserRole};
