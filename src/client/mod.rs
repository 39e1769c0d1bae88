//! HTTP client with silent access-token refresh
//!
//! `ApiClient` attaches the in-memory access token to every call and, on a
//! 401, refreshes it through a `SessionManager` that lets only one refresh
//! run at a time. Session changes are published as `SessionEvent`s.

mod api;
mod error;
mod refresher;
mod session;

pub use api::{ApiClient, ApiRequest};
pub use error::ClientError;
pub use refresher::HttpTokenRefresher;
pub use session::{SessionEvent, SessionManager, TokenRefresher};
