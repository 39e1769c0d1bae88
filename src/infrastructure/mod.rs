//! Infrastructure layer - Token signing, password hashing, stores and services

pub mod auth;
pub mod logging;
pub mod session;
pub mod user;
