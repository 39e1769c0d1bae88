//! Refresh over HTTP using the cookie the server set at login

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::debug;

use crate::api::auth::RefreshResponse;
use crate::domain::AuthError;

use super::session::TokenRefresher;

/// Calls `GET {base}/auth/refresh` with the shared cookie-holding client
#[derive(Debug, Clone)]
pub struct HttpTokenRefresher {
    client: reqwest::Client,
    refresh_url: String,
}

impl HttpTokenRefresher {
    /// `client` must be the same cookie-store client that performed login
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            refresh_url: format!("{}/auth/refresh", base_url.trim_end_matches('/')),
        }
    }
}

#[async_trait]
impl TokenRefresher for HttpTokenRefresher {
    async fn refresh(&self) -> Result<RefreshResponse, AuthError> {
        let response = self
            .client
            .get(&self.refresh_url)
            .send()
            .await
            .map_err(|e| AuthError::upstream(format!("refresh request failed: {}", e)))?;

        let status = response.status();
        debug!(%status, "Refresh endpoint replied");

        match status {
            StatusCode::UNAUTHORIZED => Err(AuthError::Unauthenticated),
            StatusCode::FORBIDDEN => Err(AuthError::Forbidden),
            status if status.is_success() => response
                .json::<RefreshResponse>()
                .await
                .map_err(|e| AuthError::upstream(format!("invalid refresh response: {}", e))),
            status => Err(AuthError::upstream(format!(
                "unexpected refresh status {}",
                status
            ))),
        }
    }
}
