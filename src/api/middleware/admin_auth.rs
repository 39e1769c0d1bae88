//! Admin authorization: a valid access token whose user has the admin role

use axum::{extract::FromRequestParts, http::request::Parts};
use tracing::debug;

use crate::api::state::AppState;
use crate::api::types::ApiError;
use crate::domain::user::User;

use super::user_auth::RequireUser;

/// Extractor that requires an authenticated admin
///
/// Authentication failures stay 401 (so the client may refresh); an
/// authenticated non-admin is a 403.
#[derive(Debug, Clone)]
pub struct RequireAdmin(pub User);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let RequireUser(user) = RequireUser::from_request_parts(parts, state).await?;

        if !user.role().is_admin() {
            debug!(user_id = %user.id(), "Admin access denied");
            return Err(ApiError::forbidden("Not authorized as an admin"));
        }

        Ok(RequireAdmin(user))
    }
}
