//! Access and refresh token issuance and verification
//!
//! Both token kinds share the claim shape `{ id, iat, exp }` and differ only
//! in lifetime and signing secret. Each kind has its own key pair and its
//! own verification path; nothing inspects a "type" claim, so a token of
//! one kind can only ever validate against its own secret.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

use crate::domain::{DomainError, InvalidToken, TokenKind, UserId};

/// JWT claims carried by both token kinds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject (user ID)
    pub id: String,
    /// Issued at timestamp (Unix epoch)
    pub iat: i64,
    /// Expiration timestamp (Unix epoch)
    pub exp: i64,
}

impl TokenClaims {
    /// Create claims for a subject that expire after `ttl`
    pub fn new(subject: &UserId, ttl: Duration) -> Self {
        let now = Utc::now();

        Self {
            id: subject.to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        }
    }
}

/// Configuration for the token service
#[derive(Clone)]
pub struct JwtConfig {
    pub access_secret: String,
    pub refresh_secret: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

impl JwtConfig {
    pub fn new(
        access_secret: impl Into<String>,
        refresh_secret: impl Into<String>,
        access_ttl: Duration,
        refresh_ttl: Duration,
    ) -> Self {
        Self {
            access_secret: access_secret.into(),
            refresh_secret: refresh_secret.into(),
            access_ttl,
            refresh_ttl,
        }
    }
}

impl Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("access_secret", &"[hidden]")
            .field("refresh_secret", &"[hidden]")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish()
    }
}

/// Mints signed tokens for a subject
pub trait TokenIssuer: Send + Sync + Debug {
    fn issue_access_token(&self, subject: &UserId) -> Result<String, DomainError>;

    fn issue_refresh_token(&self, subject: &UserId) -> Result<String, DomainError>;
}

/// Validates tokens and recovers the subject they assert
pub trait TokenVerifier: Send + Sync + Debug {
    fn verify_access_token(&self, token: &str) -> Result<UserId, InvalidToken>;

    fn verify_refresh_token(&self, token: &str) -> Result<UserId, InvalidToken>;
}

/// Key material and lifetime for one token kind
#[derive(Clone)]
struct SigningKeys {
    kind: TokenKind,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl SigningKeys {
    fn new(kind: TokenKind, secret: &str, ttl: Duration) -> Self {
        Self {
            kind,
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    fn issue(&self, subject: &UserId) -> Result<String, DomainError> {
        let claims = TokenClaims::new(subject, self.ttl);

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key).map_err(|e| {
            DomainError::internal(format!("Failed to generate {} token: {}", self.kind, e))
        })
    }

    fn verify(&self, token: &str) -> Result<UserId, InvalidToken> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let token_data = decode::<TokenClaims>(token, &self.decoding_key, &validation)
            .map_err(|_| InvalidToken(self.kind))?;

        UserId::parse(&token_data.claims.id).map_err(|_| InvalidToken(self.kind))
    }
}

/// HS256 token service holding one key pair per token kind
#[derive(Clone)]
pub struct JwtService {
    access: SigningKeys,
    refresh: SigningKeys,
}

impl Debug for JwtService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtService")
            .field("access_ttl", &self.access.ttl)
            .field("refresh_ttl", &self.refresh.ttl)
            .field("keys", &"[hidden]")
            .finish()
    }
}

impl JwtService {
    /// Create a new token service.
    ///
    /// Rejects empty secrets and a shared secret for both kinds.
    pub fn new(config: JwtConfig) -> Result<Self, DomainError> {
        if config.access_secret.is_empty() || config.refresh_secret.is_empty() {
            return Err(DomainError::configuration("Token secrets cannot be empty"));
        }

        if config.access_secret == config.refresh_secret {
            return Err(DomainError::configuration(
                "Access and refresh tokens must be signed with different secrets",
            ));
        }

        if config.access_ttl <= Duration::zero() || config.refresh_ttl <= Duration::zero() {
            return Err(DomainError::configuration("Token lifetimes must be positive"));
        }

        Ok(Self {
            access: SigningKeys::new(TokenKind::Access, &config.access_secret, config.access_ttl),
            refresh: SigningKeys::new(
                TokenKind::Refresh,
                &config.refresh_secret,
                config.refresh_ttl,
            ),
        })
    }

    pub fn access_ttl(&self) -> Duration {
        self.access.ttl
    }

    pub fn refresh_ttl(&self) -> Duration {
        self.refresh.ttl
    }
}

impl TokenIssuer for JwtService {
    fn issue_access_token(&self, subject: &UserId) -> Result<String, DomainError> {
        self.access.issue(subject)
    }

    fn issue_refresh_token(&self, subject: &UserId) -> Result<String, DomainError> {
        self.refresh.issue(subject)
    }
}

impl TokenVerifier for JwtService {
    fn verify_access_token(&self, token: &str) -> Result<UserId, InvalidToken> {
        self.access.verify(token)
    }

    fn verify_refresh_token(&self, token: &str) -> Result<UserId, InvalidToken> {
        self.refresh.verify(token)
    }
}
