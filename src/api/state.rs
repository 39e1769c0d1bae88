//! Application state shared across handlers

use std::sync::Arc;

use crate::api::auth::RefreshCookie;
use crate::infrastructure::session::SessionService;
use crate::infrastructure::user::UserService;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub session_service: Arc<SessionService>,
    pub user_service: Arc<UserService>,
    pub refresh_cookie: RefreshCookie,
}

impl AppState {
    pub fn new(
        session_service: Arc<SessionService>,
        user_service: Arc<UserService>,
        refresh_cookie: RefreshCookie,
    ) -> Self {
        Self {
            session_service,
            user_service,
            refresh_cookie,
        }
    }
}
