//! Client error type

use reqwest::StatusCode;
use thiserror::Error;

use crate::domain::AuthError;

#[derive(Debug, Error)]
pub enum ClientError {
    /// The session could not be kept alive or established
    #[error(transparent)]
    Session(#[from] AuthError),

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-success reply passed through from the server
    #[error("HTTP {status}: {message}")]
    Status { status: StatusCode, message: String },

    #[error("Failed to decode response: {0}")]
    Decode(String),
}

impl ClientError {
    /// Status code of a passed-through server reply
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The session-level failure behind this error, if any
    pub fn auth_error(&self) -> Option<&AuthError> {
        match self {
            Self::Session(err) => Some(err),
            _ => None,
        }
    }
}
