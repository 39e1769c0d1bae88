//! Token kinds and the verification failure they share

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The two credential kinds. Each is signed with its own secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Access => write!(f, "access"),
            Self::Refresh => write!(f, "refresh"),
        }
    }
}

/// Malformed, wrongly signed and expired tokens all collapse to this
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("Invalid or expired {0} token")]
pub struct InvalidToken(pub TokenKind);
