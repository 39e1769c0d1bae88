//! Client-side session state and the single-flight refresh coordinator
//!
//! One `SessionManager` exists per client process. It owns the in-memory
//! access token, the signed-in profile, and the refresh bookkeeping: a flag
//! saying a refresh call is in flight plus the callers waiting on it, in
//! arrival order. The std mutex guarding that bookkeeping is only ever held
//! for a few instructions and never across an `.await`.

use std::fmt::Debug;
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{broadcast, oneshot};
use tracing::{debug, info, warn};

use crate::api::auth::RefreshResponse;
use crate::domain::{AuthError, UserProfile};

const EVENT_CAPACITY: usize = 64;

/// Session lifecycle notifications for the rest of the application
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    LoggedIn(UserProfile),
    /// A new access token replaced the expired one
    TokenRefreshed(String),
    /// Refresh failed; all local session state has been cleared
    ForcedLogout,
    LoggedOut,
}

/// The call that trades the refresh cookie for a new access token
#[async_trait]
pub trait TokenRefresher: Send + Sync + Debug {
    async fn refresh(&self) -> Result<RefreshResponse, AuthError>;
}

type Waiter = oneshot::Sender<Result<String, AuthError>>;

#[derive(Default)]
struct RefreshState {
    in_flight: bool,
    pending: Vec<Waiter>,
}

pub struct SessionManager {
    access_token: RwLock<Option<String>>,
    user: RwLock<Option<UserProfile>>,
    refresh: Mutex<RefreshState>,
    events: broadcast::Sender<SessionEvent>,
    refresh_timeout: Duration,
}

impl Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("authenticated", &self.is_authenticated())
            .field("refreshing", &self.is_refreshing())
            .field("refresh_timeout", &self.refresh_timeout)
            .finish()
    }
}

impl SessionManager {
    pub fn new(refresh_timeout: Duration) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            access_token: RwLock::new(None),
            user: RwLock::new(None),
            refresh: Mutex::new(RefreshState::default()),
            events,
            refresh_timeout,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn access_token(&self) -> Option<String> {
        self.access_token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn user(&self) -> Option<UserProfile> {
        self.user.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.access_token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    pub fn is_refreshing(&self) -> bool {
        self.lock_refresh().in_flight
    }

    /// Number of callers parked behind the refresh in flight
    pub fn queued(&self) -> usize {
        self.lock_refresh().pending.len()
    }

    /// Install a session obtained from login, register or a startup refresh
    pub fn sign_in(&self, user: UserProfile, access_token: String) {
        info!(user_id = %user.id, "Session started");
        self.store(access_token, user.clone());
        self.publish(SessionEvent::LoggedIn(user));
    }

    /// Voluntary logout
    pub fn sign_out(&self) {
        self.clear();
        self.publish(SessionEvent::LoggedOut);
        info!("Session ended");
    }

    /// Obtain an access token for a request that got a 401.
    pub async fn refresh_access_token(
        &self,
        refresher: &dyn TokenRefresher,
        stale_token: Option<&str>,
    ) -> Result<String, AuthError> {
        self.refresh_and_replay(refresher, stale_token, std::future::ready)
            .await
    }

    /// Refresh the access token, then run `replay` with it.
    ///
    /// `stale_token` is the token the failed request carried. At most one
    /// refresh call runs at a time. The caller that runs it replays first;
    /// callers arriving meanwhile are then released in arrival order and
    /// replay with the same token. On failure nobody replays, the session is
    /// cleared and `ForcedLogout` is published once.
    pub async fn refresh_and_replay<R, F, Fut>(
        &self,
        refresher: &dyn TokenRefresher,
        stale_token: Option<&str>,
        replay: F,
    ) -> Result<R, AuthError>
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = R>,
    {
        self.coordinate(refresher, RefreshMode::Replay { stale_token }, replay)
            .await
    }

    /// Restore a session from the refresh cookie alone, e.g. at startup.
    ///
    /// Shares the single refresh slot with the request path: if a refresh
    /// is already in flight this waits for it instead of starting another.
    /// Failure clears local state but only publishes `ForcedLogout` when
    /// there was a session to lose.
    pub async fn restore(&self, refresher: &dyn TokenRefresher) -> Result<UserProfile, AuthError> {
        self.coordinate(refresher, RefreshMode::Restore, std::future::ready)
            .await?;

        self.user().ok_or(AuthError::Unauthenticated)
    }

    async fn coordinate<R, F, Fut>(
        &self,
        refresher: &dyn TokenRefresher,
        mode: RefreshMode<'_>,
        replay: F,
    ) -> Result<R, AuthError>
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = R>,
    {
        let entry = {
            let mut state = self.lock_refresh();

            if state.in_flight {
                let (tx, rx) = oneshot::channel();
                state.pending.push(tx);
                Entry::Wait(rx)
            } else {
                let shortcut = match mode {
                    RefreshMode::Replay { stale_token } => {
                        match (self.access_token(), stale_token) {
                            // Someone already replaced the token this request used
                            (Some(current), stale) if stale != Some(current.as_str()) => {
                                Some(Entry::Current(current))
                            }
                            // Session ended while the request was out
                            (None, Some(_)) => return Err(AuthError::Unauthenticated),
                            _ => None,
                        }
                    }
                    RefreshMode::Restore => None,
                };

                shortcut.unwrap_or_else(|| {
                    state.in_flight = true;
                    Entry::Lead
                })
            }
        };

        match entry {
            Entry::Current(token) => return Ok(replay(token).await),
            Entry::Wait(rx) => {
                debug!("Refresh already in flight, waiting");
                let token = rx
                    .await
                    .unwrap_or_else(|_| Err(AuthError::upstream("refresh was abandoned")))?;
                return Ok(replay(token).await);
            }
            Entry::Lead => {}
        }

        // Waiters are released when the guard drops, after our own replay
        let mut guard = RefreshGuard {
            manager: self,
            outcome: None,
        };

        let result = self.run_refresh(refresher, &mode).await;
        guard.outcome = Some(result.clone());

        let token = result?;
        Ok(replay(token).await)
    }

    async fn run_refresh(
        &self,
        refresher: &dyn TokenRefresher,
        mode: &RefreshMode<'_>,
    ) -> Result<String, AuthError> {
        debug!("Refreshing access token");

        let outcome = match tokio::time::timeout(self.refresh_timeout, refresher.refresh()).await {
            Ok(outcome) => outcome,
            Err(_) => Err(AuthError::upstream(format!(
                "refresh timed out after {:?}",
                self.refresh_timeout
            ))),
        };

        match outcome {
            Ok(response) => {
                let token = response.access_token;
                self.store(token.clone(), response.user.clone());

                match mode {
                    RefreshMode::Replay { .. } => {
                        self.publish(SessionEvent::TokenRefreshed(token.clone()))
                    }
                    RefreshMode::Restore => {
                        info!(user_id = %response.user.id, "Session restored");
                        self.publish(SessionEvent::LoggedIn(response.user));
                    }
                }

                Ok(token)
            }
            Err(err) => {
                let had_session = self.is_authenticated();
                self.clear();

                if matches!(mode, RefreshMode::Replay { .. }) || had_session {
                    warn!("Refresh failed, forcing logout: {}", err);
                    self.publish(SessionEvent::ForcedLogout);
                } else {
                    debug!("No session to restore: {}", err);
                }

                Err(err)
            }
        }
    }

    fn store(&self, access_token: String, user: UserProfile) {
        *self
            .access_token
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(access_token);
        *self.user.write().unwrap_or_else(PoisonError::into_inner) = Some(user);
    }

    fn clear(&self) {
        *self
            .access_token
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
        *self.user.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    fn publish(&self, event: SessionEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    fn lock_refresh(&self) -> MutexGuard<'_, RefreshState> {
        self.refresh.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Clear the flag and hand the queued waiters back
    fn finish_refresh(&self) -> Vec<Waiter> {
        let mut state = self.lock_refresh();
        state.in_flight = false;
        std::mem::take(&mut state.pending)
    }
}

/// How a caller entered the refresh slot
enum Entry {
    Lead,
    Wait(oneshot::Receiver<Result<String, AuthError>>),
    Current(String),
}

/// Why a refresh is being run
#[derive(Debug, Clone, Copy)]
enum RefreshMode<'a> {
    /// A request got a 401 while carrying `stale_token`
    Replay { stale_token: Option<&'a str> },
    /// Restore from the cookie with no request to replay
    Restore,
}

/// Releases the in-flight flag and the queued callers however the
/// refreshing caller exits.
///
/// Dropped without an outcome means the refreshing future was cancelled
/// mid-call; the waiters then fail instead of hanging.
struct RefreshGuard<'a> {
    manager: &'a SessionManager,
    outcome: Option<Result<String, AuthError>>,
}

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        let waiters = self.manager.finish_refresh();

        let outcome = self.outcome.take().unwrap_or_else(|| {
            warn!(waiting = waiters.len(), "Refresh cancelled before it settled");
            Err(AuthError::upstream("refresh was cancelled"))
        });

        for waiter in waiters {
            let _ = waiter.send(outcome.clone());
        }
    }
}
