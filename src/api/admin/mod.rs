//! Admin endpoints for managing user accounts

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::api::middleware::RequireAdmin;
use crate::api::state::AppState;
use crate::api::types::{ApiError, Json};
use crate::domain::{DomainError, UserId, UserProfile, UserRole};
use crate::infrastructure::user::{CreateUserRequest, UpdateUserRequest};

/// Create admin API router
pub fn create_admin_router() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route(
            "/users/{user_id}",
            get(get_user).put(update_user).delete(delete_user),
        )
}

/// Request to create a user on someone's behalf
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserApiRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub role: Option<UserRole>,
}

/// Request to update a user
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateUserApiRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<UserRole>,
}

/// List users response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListUsersResponse {
    pub users: Vec<UserProfile>,
    pub total: usize,
}

/// Delete user response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteUserResponse {
    pub message: String,
}

fn parse_user_id(user_id: &str) -> Result<UserId, ApiError> {
    UserId::parse(user_id)
        .map_err(|_| DomainError::invalid_id(format!("Invalid user ID '{}'", user_id)).into())
}

/// GET /admin/users
pub async fn list_users(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
) -> Result<Json<ListUsersResponse>, ApiError> {
    debug!(admin_id = %admin.id(), "Admin listing users");

    let users: Vec<UserProfile> = state
        .user_service
        .list()
        .await?
        .iter()
        .map(UserProfile::from)
        .collect();
    let total = users.len();

    Ok(Json(ListUsersResponse { users, total }))
}

/// POST /admin/users
pub async fn create_user(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(request): Json<CreateUserApiRequest>,
) -> Result<(StatusCode, Json<UserProfile>), ApiError> {
    debug!(admin_id = %admin.id(), "Admin creating user");

    let user = state
        .user_service
        .create(CreateUserRequest {
            name: request.name,
            email: request.email,
            password: request.password,
            role: request.role.unwrap_or_default(),
        })
        .await?;

    info!(
        admin_id = %admin.id(),
        user_id = %user.id(),
        role = ?user.role(),
        "User created by admin"
    );

    Ok((StatusCode::CREATED, Json(UserProfile::from(&user))))
}

/// GET /admin/users/{user_id}
pub async fn get_user(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    Path(user_id): Path<String>,
) -> Result<Json<UserProfile>, ApiError> {
    debug!(user_id = %user_id, "Admin getting user");

    let user = state
        .user_service
        .get(&parse_user_id(&user_id)?)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("User '{}' not found", user_id)))?;

    Ok(Json(UserProfile::from(&user)))
}

/// PUT /admin/users/{user_id}
pub async fn update_user(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(user_id): Path<String>,
    Json(request): Json<UpdateUserApiRequest>,
) -> Result<Json<UserProfile>, ApiError> {
    debug!(user_id = %user_id, "Admin updating user");

    let user = state
        .user_service
        .update_user(
            &parse_user_id(&user_id)?,
            UpdateUserRequest {
                name: request.name,
                email: request.email,
                role: request.role,
            },
        )
        .await?;

    info!(
        admin_id = %admin.id(),
        user_id = %user.id(),
        role = ?user.role(),
        "User updated by admin"
    );

    Ok(Json(UserProfile::from(&user)))
}

/// DELETE /admin/users/{user_id}
pub async fn delete_user(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(user_id): Path<String>,
) -> Result<Json<DeleteUserResponse>, ApiError> {
    let id = parse_user_id(&user_id)?;

    state.user_service.delete(&id).await?;

    info!(admin_id = %admin.id(), user_id = %id, "User deleted by admin");

    Ok(Json(DeleteUserResponse {
        message: "User removed".to_string(),
    }))
}
