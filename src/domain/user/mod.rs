//! User domain
//!
//! This module provides domain types and traits for the user store the
//! session endpoints call into: user entities, validation, and the
//! repository trait.

mod entity;
mod repository;
mod validation;

pub use entity::{User, UserId, UserProfile, UserRole};
pub use repository::UserRepository;
pub use validation::{
    normalize_email, validate_email, validate_name, validate_password, UserValidationError,
};
