//! authgate
//!
//! A user API with role-based access control built around a dual-token
//! session protocol:
//! - short-lived bearer access tokens returned in response bodies
//! - a long-lived refresh token carried only in an httpOnly cookie
//! - a client that refreshes expired access tokens silently, one refresh at a time

pub mod api;
pub mod cli;
pub mod client;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;

use api::auth::RefreshCookie;
use api::state::AppState;
use domain::UserRole;
use infrastructure::{
    auth::{JwtConfig, JwtService},
    session::SessionService,
    user::{Argon2PasswordHasher, CreateUserRequest, InMemoryUserRepository, UserService},
};
use rand::Rng;
use tracing::{info, warn};

/// Create the application state with custom configuration
pub async fn create_app_state_with_config(config: &AppConfig) -> anyhow::Result<AppState> {
    let user_repository = Arc::new(InMemoryUserRepository::new());
    let user_service = Arc::new(UserService::new(
        user_repository,
        Arc::new(Argon2PasswordHasher::new()),
    ));

    let jwt_service = Arc::new(create_jwt_service(config)?);
    let refresh_cookie = RefreshCookie::new(
        !config.auth.environment.is_development(),
        time::Duration::seconds(jwt_service.refresh_ttl().num_seconds()),
    );

    let session_service = Arc::new(SessionService::new(user_service.clone(), jwt_service));

    create_initial_admin_user(&user_service).await?;

    info!(environment = ?config.auth.environment, "Application state initialized");

    Ok(AppState::new(session_service, user_service, refresh_cookie))
}

/// Generate a random token secret
fn generate_random_secret() -> String {
    use rand::distributions::Alphanumeric;

    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(64)
        .map(char::from)
        .collect()
}

/// Resolve a secret from config, then the environment, then a random value
fn resolve_secret(configured: Option<&str>, env_var: &str) -> String {
    configured
        .filter(|secret| !secret.is_empty())
        .map(str::to_string)
        .or_else(|| std::env::var(env_var).ok().filter(|secret| !secret.is_empty()))
        .unwrap_or_else(|| {
            warn!(
                "No {} configured. Generating random secret. \
                Sessions will NOT survive a restart.",
                env_var
            );
            generate_random_secret()
        })
}

/// Create the token service; the two secrets must differ
fn create_jwt_service(config: &AppConfig) -> anyhow::Result<JwtService> {
    let access_secret = resolve_secret(
        config.auth.access_token_secret.as_deref(),
        "ACCESS_TOKEN_SECRET",
    );
    let refresh_secret = resolve_secret(
        config.auth.refresh_token_secret.as_deref(),
        "REFRESH_TOKEN_SECRET",
    );

    let access_ttl = chrono::Duration::seconds(i64::try_from(config.auth.access_token_ttl_secs)?);
    let refresh_ttl = chrono::Duration::days(i64::try_from(config.auth.refresh_token_ttl_days)?);

    Ok(JwtService::new(JwtConfig::new(
        access_secret,
        refresh_secret,
        access_ttl,
        refresh_ttl,
    ))?)
}

/// Generate a random password for the initial admin user
fn generate_random_password() -> String {
    use rand::distributions::Alphanumeric;

    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(16)
        .map(char::from)
        .collect()
}

/// Create an initial admin user if no users exist
async fn create_initial_admin_user(user_service: &UserService) -> anyhow::Result<()> {
    if user_service.count().await? > 0 {
        return Ok(());
    }

    let email = std::env::var("ADMIN_EMAIL")
        .ok()
        .filter(|e| !e.is_empty())
        .unwrap_or_else(|| "admin@localhost.localdomain".to_string());

    // Use ADMIN_DEFAULT_PASSWORD env var if set, otherwise generate random password
    let (password, is_default) = match std::env::var("ADMIN_DEFAULT_PASSWORD") {
        Ok(p) if !p.is_empty() => (p, true),
        _ => (generate_random_password(), false),
    };

    user_service
        .create(CreateUserRequest {
            name: "Administrator".to_string(),
            email: email.clone(),
            password: password.clone(),
            role: UserRole::Admin,
        })
        .await?;

    info!("===========================================");
    info!("Initial admin user created!");
    info!("Email: {}", email);

    if is_default {
        info!("Password: (set via ADMIN_DEFAULT_PASSWORD)");
    } else {
        info!("Password: {}", password);
    }

    info!("Please change this password after first login.");
    info!("===========================================");

    Ok(())
}
