//! Session endpoints
//!
//! Register and login set the refresh cookie and return the access token in
//! the body; refresh trades the cookie for a new access token; logout
//! overwrites the cookie with an expired one.

mod cookie;

pub use cookie::{REFRESH_COOKIE_NAME, RefreshCookie};

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Router,
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api::state::AppState;
use crate::api::types::{ApiError, Json};
use crate::domain::UserProfile;
use crate::infrastructure::session::{IssuedSession, Registration};

/// Create the authentication router
pub fn create_auth_router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/refresh", get(refresh))
}

/// Register request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Login request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Register/login response: the public profile plus the access token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    #[serde(flatten)]
    pub user: UserProfile,
    pub access_token: String,
}

/// Refresh response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
    pub user: UserProfile,
}

/// Logout response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogoutResponse {
    pub message: String,
}

/// POST /auth/register
pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, CookieJar, Json<AuthResponse>), ApiError> {
    let session = state
        .session_service
        .register(Registration {
            name: request.name,
            email: request.email,
            password: request.password,
        })
        .await?;

    let (jar, body) = open_session(&state, jar, session);

    Ok((StatusCode::CREATED, jar, body))
}

/// POST /auth/login
///
/// Unknown email and wrong password produce the same 401.
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(request): Json<LoginRequest>,
) -> Result<(CookieJar, Json<AuthResponse>), ApiError> {
    let session = state
        .session_service
        .login(&request.email, &request.password)
        .await?;

    Ok(open_session(&state, jar, session))
}

/// POST /auth/logout
///
/// Never fails. The refresh token is not revoked, only the cookie is dropped.
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> (CookieJar, Json<LogoutResponse>) {
    state.session_service.logout(state.refresh_cookie.read(&jar));

    let jar = jar.add(state.refresh_cookie.expired());

    (
        jar,
        Json(LogoutResponse {
            message: "Logged out successfully".to_string(),
        }),
    )
}

/// GET /auth/refresh
///
/// 401 without a cookie or when the user is gone, 403 when the cookie fails
/// verification.
pub async fn refresh(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Json<RefreshResponse>, ApiError> {
    let refreshed = state
        .session_service
        .refresh(state.refresh_cookie.read(&jar))
        .await?;

    debug!(user_id = %refreshed.user.id(), "Access token refreshed");

    Ok(Json(RefreshResponse {
        access_token: refreshed.access_token,
        user: UserProfile::from(&refreshed.user),
    }))
}

fn open_session(
    state: &AppState,
    jar: CookieJar,
    session: IssuedSession,
) -> (CookieJar, Json<AuthResponse>) {
    let jar = jar.add(state.refresh_cookie.issue(session.refresh_token));

    (
        jar,
        Json(AuthResponse {
            user: UserProfile::from(&session.user),
            access_token: session.access_token,
        }),
    )
}
