//! Session service: register, login, refresh and bearer authorization
//!
//! Stateless on the server side: every call reads the user store and signs
//! or verifies tokens, nothing is cached between requests.

use std::sync::Arc;

use tracing::{info, warn};

use crate::domain::user::{User, UserRole};
use crate::domain::AuthError;
use crate::infrastructure::auth::{TokenIssuer, TokenVerifier};
use crate::infrastructure::user::{CreateUserRequest, UserService};

/// Credentials for a new account
#[derive(Debug, Clone)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Result of register/login: both tokens plus the user they were minted for
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub user: User,
    pub access_token: String,
    pub refresh_token: String,
}

/// Result of a refresh: a new access token only, the refresh token is reused
#[derive(Debug, Clone)]
pub struct RefreshedSession {
    pub user: User,
    pub access_token: String,
}

/// Anything that can both issue and verify tokens
pub trait TokenService: TokenIssuer + TokenVerifier {}

impl<T: TokenIssuer + TokenVerifier> TokenService for T {}

#[derive(Debug)]
pub struct SessionService {
    users: Arc<UserService>,
    tokens: Arc<dyn TokenService>,
}

impl SessionService {
    pub fn new(users: Arc<UserService>, tokens: Arc<dyn TokenService>) -> Self {
        Self { users, tokens }
    }

    /// Create an account and open a session for it
    pub async fn register(&self, registration: Registration) -> Result<IssuedSession, AuthError> {
        let user = self
            .users
            .create(CreateUserRequest {
                name: registration.name,
                email: registration.email,
                password: registration.password,
                role: UserRole::User,
            })
            .await?;

        info!(user_id = %user.id(), "User registered");

        self.issue(user)
    }

    /// Open a session for an existing account
    pub async fn login(&self, email: &str, password: &str) -> Result<IssuedSession, AuthError> {
        let user = self
            .users
            .authenticate(email, password)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        info!(user_id = %user.id(), "User logged in");

        self.issue(user)
    }

    /// Mint a new access token from the refresh cookie value.
    ///
    /// No cookie and a vanished subject are `Unauthenticated`; a cookie that
    /// fails verification is `Forbidden`.
    pub async fn refresh(&self, refresh_token: Option<&str>) -> Result<RefreshedSession, AuthError> {
        let refresh_token = refresh_token
            .filter(|token| !token.is_empty())
            .ok_or(AuthError::Unauthenticated)?;

        let subject = self.tokens.verify_refresh_token(refresh_token).map_err(|e| {
            warn!("Refresh rejected: {}", e);
            AuthError::Forbidden
        })?;

        let user = self.users.get(&subject).await?.ok_or_else(|| {
            warn!(user_id = %subject, "Refresh for a user that no longer exists");
            AuthError::Unauthenticated
        })?;

        let access_token = self.tokens.issue_access_token(user.id())?;

        Ok(RefreshedSession { user, access_token })
    }

    /// Close a session. Tokens are stateless, so this only records the event;
    /// the refresh token itself stays valid until it expires.
    pub fn logout(&self, refresh_token: Option<&str>) {
        match refresh_token.and_then(|token| self.tokens.verify_refresh_token(token).ok()) {
            Some(subject) => info!(user_id = %subject, "User logged out"),
            None => info!("Logout without an active session"),
        }
    }

    /// Resolve a bearer access token to its user
    pub async fn authorize(&self, access_token: &str) -> Result<User, AuthError> {
        let subject = self
            .tokens
            .verify_access_token(access_token)
            .map_err(|_| AuthError::Unauthenticated)?;

        self.users
            .get(&subject)
            .await?
            .ok_or(AuthError::Unauthenticated)
    }

    fn issue(&self, user: User) -> Result<IssuedSession, AuthError> {
        let access_token = self.tokens.issue_access_token(user.id())?;
        let refresh_token = self.tokens.issue_refresh_token(user.id())?;

        Ok(IssuedSession {
            user,
            access_token,
            refresh_token,
        })
    }
}
