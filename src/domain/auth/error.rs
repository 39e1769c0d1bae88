//! Session-level error taxonomy

use thiserror::Error;

use crate::domain::DomainError;

/// Outcomes of the session protocol that a caller can act on.
///
/// HTTP status codes are assigned at the API boundary only; inside the
/// crate (server services and the client gatekeeper) these variants are the
/// single vocabulary for authentication failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    /// Registration with an email that is already in use
    #[error("{0}")]
    Conflict(String),

    /// Login failed. Deliberately identical for unknown email and wrong password.
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// No refresh cookie, or the subject it names no longer exists
    #[error("Unauthorized")]
    Unauthenticated,

    /// Refresh cookie present but tampered with or expired
    #[error("Forbidden")]
    Forbidden,

    /// The refresh call itself failed (network, timeout, unexpected reply)
    #[error("Session refresh failed: {0}")]
    UpstreamFailure(String),

    /// Rejected input
    #[error("{0}")]
    Validation(String),

    /// Store or signing fault
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        Self::UpstreamFailure(message.into())
    }
}

impl From<DomainError> for AuthError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Conflict { message } => Self::Conflict(message),
            DomainError::Validation { message } | DomainError::InvalidId { message } => {
                Self::Validation(message)
            }
            other => Self::Internal(other.to_string()),
        }
    }
}
