//! Profile endpoints for the authenticated user

use axum::{extract::State, routing::get, Router};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::middleware::RequireUser;
use crate::api::state::AppState;
use crate::api::types::{ApiError, Json};
use crate::domain::UserProfile;
use crate::infrastructure::user::UpdateProfileRequest;

/// Create the users router
pub fn create_users_router() -> Router<AppState> {
    Router::new().route("/profile", get(get_profile).put(update_profile))
}

/// Profile update body; omitted or blank fields are left unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateProfileApiRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// GET /users/profile
pub async fn get_profile(RequireUser(user): RequireUser) -> Json<UserProfile> {
    Json(UserProfile::from(&user))
}

/// PUT /users/profile
pub async fn update_profile(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Json(request): Json<UpdateProfileApiRequest>,
) -> Result<Json<UserProfile>, ApiError> {
    let updated = state
        .user_service
        .update_profile(
            user.id(),
            UpdateProfileRequest {
                name: request.name,
                email: request.email,
                password: request.password,
            },
        )
        .await?;

    info!(user_id = %updated.id(), "Profile updated");

    Ok(Json(UserProfile::from(&updated)))
}
