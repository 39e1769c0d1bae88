//! User infrastructure module
//!
//! Argon2 password hashing, the in-memory user store, and the user service
//! the session endpoints delegate to.

mod password;
mod repository;
mod service;

pub use password::{Argon2PasswordHasher, PasswordHasher};
pub use repository::InMemoryUserRepository;
pub use service::{CreateUserRequest, UpdateProfileRequest, UpdateUserRequest, UserService};
