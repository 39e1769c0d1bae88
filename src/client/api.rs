//! Request gatekeeper
//!
//! Every call goes out with the in-memory access token. A 401 triggers one
//! refresh through the shared `SessionManager` and one replay; anything else,
//! including the replay's own result, is handed back untouched.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Method, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::debug;

use crate::api::auth::{AuthResponse, LoginRequest, RegisterRequest};
use crate::api::types::ApiErrorResponse;
use crate::config::ClientConfig;
use crate::domain::UserProfile;

use super::error::ClientError;
use super::refresher::HttpTokenRefresher;
use super::session::{SessionEvent, SessionManager, TokenRefresher};

/// A replayable request description
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::POST, path).with_body(body)
    }

    pub fn put(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::PUT, path).with_body(body)
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session: Arc<SessionManager>,
    refresher: Arc<dyn TokenRefresher>,
}

impl ApiClient {
    /// Client with a cookie store shared between API calls and refreshes
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().cookie_store(true).build()?;
        let base_url = config.base_url.trim_end_matches('/').to_string();
        let refresher = Arc::new(HttpTokenRefresher::new(http.clone(), &base_url));
        let session = Arc::new(SessionManager::new(Duration::from_secs(
            config.refresh_timeout_secs,
        )));

        Ok(Self {
            http,
            base_url,
            session,
            refresher,
        })
    }

    /// Replace the refresh call
    pub fn with_refresher(mut self, refresher: Arc<dyn TokenRefresher>) -> Self {
        self.refresher = refresher;
        self
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.session.subscribe()
    }

    /// Send through the gatekeeper
    pub async fn send(&self, request: ApiRequest) -> Result<Response, ClientError> {
        let token = self.session.access_token();
        let response = self.dispatch(&request, token.as_deref()).await?;

        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        debug!(method = %request.method, path = %request.path, "Access token rejected");

        // Replayed once; a second 401 goes back to the caller
        let replayed = self
            .session
            .refresh_and_replay(
                self.refresher.as_ref(),
                token.as_deref(),
                |fresh| async move { self.dispatch(&request, Some(&fresh)).await },
            )
            .await?;

        Ok(replayed?)
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        decode(self.send(ApiRequest::get(path)).await?).await
    }

    pub async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        let request = ApiRequest::post(path, to_value(body)?);
        decode(self.send(request).await?).await
    }

    pub async fn put_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        let request = ApiRequest::put(path, to_value(body)?);
        decode(self.send(request).await?).await
    }

    /// Create an account and start a session
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<UserProfile, ClientError> {
        let body = to_value(&RegisterRequest {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        })?;

        self.open_session(ApiRequest::post("/auth/register", body))
            .await
    }

    /// Log in and start a session
    pub async fn login(&self, email: &str, password: &str) -> Result<UserProfile, ClientError> {
        let body = to_value(&LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        })?;

        self.open_session(ApiRequest::post("/auth/login", body)).await
    }

    /// Drop the server cookie and the local session. Local state is cleared
    /// even when the server cannot be reached.
    pub async fn logout(&self) -> Result<(), ClientError> {
        let result = self
            .dispatch(&ApiRequest::new(Method::POST, "/auth/logout"), None)
            .await;

        self.session.sign_out();

        let response = result?;
        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        Ok(())
    }

    /// Restore a session from the refresh cookie alone, e.g. at startup.
    /// Goes through the same single refresh slot and timeout as the 401 path.
    pub async fn verify(&self) -> Result<UserProfile, ClientError> {
        Ok(self.session.restore(self.refresher.as_ref()).await?)
    }

    /// GET /users/profile
    pub async fn profile(&self) -> Result<UserProfile, ClientError> {
        self.get_json("/users/profile").await
    }

    /// Login and register bypass the 401 interception: a wrong password is
    /// not an expired session.
    async fn open_session(&self, request: ApiRequest) -> Result<UserProfile, ClientError> {
        let response = self.dispatch(&request, None).await?;
        let AuthResponse { user, access_token } = decode(response).await?;

        self.session.sign_in(user.clone(), access_token);

        Ok(user)
    }

    async fn dispatch(
        &self,
        request: &ApiRequest,
        token: Option<&str>,
    ) -> Result<Response, reqwest::Error> {
        let url = format!("{}{}", self.base_url, request.path);
        let mut builder = self.http.request(request.method.clone(), url);

        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        builder.send().await
    }
}

fn to_value<B: Serialize>(body: &B) -> Result<Value, ClientError> {
    serde_json::to_value(body).map_err(|e| ClientError::Decode(e.to_string()))
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    if !response.status().is_success() {
        return Err(status_error(response).await);
    }

    response
        .json::<T>()
        .await
        .map_err(|e| ClientError::Decode(e.to_string()))
}

/// Pull the server's error message out of a failed reply
async fn status_error(response: Response) -> ClientError {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();

    let message = serde_json::from_str::<ApiErrorResponse>(&text)
        .map(|body| body.error.message)
        .unwrap_or(text);

    ClientError::Status { status, message }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::api::auth::RefreshResponse;
    use crate::domain::AuthError;

    fn profile_json() -> Value {
        json!({
            "id": "0f8fad5b-d9cb-469f-a165-70867728950e",
            "name": "Ada",
            "email": "a@x.com",
            "role": "user",
            "profileImage": null
        })
    }

    fn client_for(server: &MockServer) -> ApiClient {
        ApiClient::new(&ClientConfig {
            base_url: server.uri(),
            refresh_timeout_secs: 5,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_login_starts_session_without_refresh() {
        let server = MockServer::start().await;

        let mut body = profile_json();
        body["accessToken"] = json!("token-1");

        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .and(body_json(json!({ "email": "a@x.com", "password": "secret1" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let mut events = client.subscribe();

        let user = client.login("a@x.com", "secret1").await.unwrap();

        assert_eq!(user.email, "a@x.com");
        assert_eq!(client.session().access_token().as_deref(), Some("token-1"));
        assert!(matches!(events.try_recv(), Ok(SessionEvent::LoggedIn(_))));
    }

    #[tokio::test]
    async fn test_login_failure_is_not_intercepted() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": { "message": "Invalid email or password", "type": "authentication_error" }
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/auth/refresh"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.login("a@x.com", "wrong-pass").await.unwrap_err();

        assert_eq!(err.status(), Some(StatusCode::UNAUTHORIZED));
        assert!(err.to_string().contains("Invalid email or password"));
        assert!(!client.session().is_authenticated());
    }

    #[tokio::test]
    async fn test_non_auth_failures_pass_through() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/users/profile"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({
                "error": { "message": "boom", "type": "server_error" }
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/auth/refresh"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.profile().await.unwrap_err();

        assert_eq!(err.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
    }

    #[tokio::test]
    async fn test_replay_is_attempted_only_once() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/users/profile"))
            .respond_with(ResponseTemplate::new(401))
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/auth/refresh"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "accessToken": "fresh",
                "user": profile_json()
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.profile().await.unwrap_err();

        assert_eq!(err.status(), Some(StatusCode::UNAUTHORIZED));
        assert_eq!(client.session().access_token().as_deref(), Some("fresh"));
    }

    #[tokio::test]
    async fn test_bearer_is_attached() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/users/profile"))
            .and(header("authorization", "Bearer token-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(profile_json()))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        client.session().sign_in(
            serde_json::from_value(profile_json()).unwrap(),
            "token-1".to_string(),
        );

        let user = client.profile().await.unwrap();
        assert_eq!(user.name, "Ada");
    }

    #[tokio::test]
    async fn test_logout_clears_session_even_when_server_is_down() {
        let client = ApiClient::new(&ClientConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            refresh_timeout_secs: 1,
        })
        .unwrap();
        client.session().sign_in(
            serde_json::from_value(profile_json()).unwrap(),
            "token-1".to_string(),
        );
        let mut events = client.subscribe();

        assert!(matches!(
            client.logout().await,
            Err(ClientError::Transport(_))
        ));
        assert!(!client.session().is_authenticated());
        assert_eq!(events.try_recv().unwrap(), SessionEvent::LoggedOut);
    }

    #[derive(Debug)]
    struct FixedRefresher(String);

    #[async_trait]
    impl TokenRefresher for FixedRefresher {
        async fn refresh(&self) -> Result<RefreshResponse, AuthError> {
            Ok(RefreshResponse {
                access_token: self.0.clone(),
                user: serde_json::from_value(profile_json()).unwrap(),
            })
        }
    }

    #[tokio::test]
    async fn test_replacement_refresher_serves_the_401_path() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/users/profile"))
            .and(header("authorization", "Bearer from-keychain"))
            .respond_with(ResponseTemplate::new(200).set_body_json(profile_json()))
            .with_priority(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/users/profile"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/auth/refresh"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = client_for(&server)
            .with_refresher(Arc::new(FixedRefresher("from-keychain".to_string())));

        let user = client.profile().await.unwrap();

        assert_eq!(user.email, "a@x.com");
        assert_eq!(
            client.session().access_token().as_deref(),
            Some("from-keychain")
        );
    }

    #[tokio::test]
    async fn test_verify_failure_does_not_force_logout() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/auth/refresh"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let mut events = client.subscribe();

        let err = client.verify().await.unwrap_err();

        assert_eq!(err.auth_error(), Some(&AuthError::Unauthenticated));
        assert!(events.try_recv().is_err());
    }
}
