//! Session context: the single source of truth for "who is logged in".
//!
//! Constructed once at the application root and shared as `Arc<SessionContext>`.
//! State changes are published on a `watch` channel; navigation requests
//! (logout sends the user to `/login`) go out on an `mpsc` channel.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use super::gate::LOGIN_PATH;
use crate::api::{AuthError, SessionClient};
use crate::auth::{CredentialStore, StoreError};
use crate::models::{Credentials, LoginResponse, UserProfile};

/// Buffer size for the navigation channel.
/// Navigation is user-driven, a handful of pending events is plenty.
const NAVIGATION_BUFFER_SIZE: usize = 16;

/// Request to move the application to another view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    pub path: String,
    /// Replace the current history entry instead of pushing a new one
    pub replace: bool,
}

impl Navigation {
    pub fn to_login() -> Self {
        Self {
            path: LOGIN_PATH.to_string(),
            replace: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Initializing,
    Authenticated,
    Unauthenticated,
}

/// Snapshot of the session as seen by consumers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub user: Option<UserProfile>,
    pub is_loading: bool,
    in_flight: usize,
}

impl SessionState {
    fn initializing() -> Self {
        Self {
            user: None,
            is_loading: true,
            in_flight: 0,
        }
    }

    /// True while at least one login attempt is in flight.
    pub fn is_busy(&self) -> bool {
        self.in_flight > 0
    }
}

pub struct SessionContext {
    client: SessionClient,
    state: watch::Sender<SessionState>,
    nav_tx: mpsc::Sender<Navigation>,
    /// Sequence number of the latest login attempt. Logout advances it too.
    latest_attempt: Mutex<u64>,
    restored: AtomicBool,
}

/// Releases one in-flight login on every exit path.
struct BusyGuard<'a> {
    state: &'a watch::Sender<SessionState>,
}

impl<'a> BusyGuard<'a> {
    fn acquire(state: &'a watch::Sender<SessionState>) -> Self {
        state.send_modify(|s| s.in_flight += 1);
        Self { state }
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.state.send_modify(|s| s.in_flight = s.in_flight.saturating_sub(1));
    }
}

impl SessionContext {
    /// Create the context in the `Initializing` state.
    ///
    /// Returns the receiving end of the navigation channel. Call [`restore`]
    /// to settle the initial state.
    ///
    /// [`restore`]: SessionContext::restore
    pub fn new(client: SessionClient) -> (Self, mpsc::Receiver<Navigation>) {
        let (state, _) = watch::channel(SessionState::initializing());
        let (nav_tx, nav_rx) = mpsc::channel(NAVIGATION_BUFFER_SIZE);

        let context = Self {
            client,
            state,
            nav_tx,
            latest_attempt: Mutex::new(0),
            restored: AtomicBool::new(false),
        };
        (context, nav_rx)
    }

    /// Create the context and run the restoration pass.
    pub fn start(client: SessionClient) -> (Self, mpsc::Receiver<Navigation>) {
        let (context, nav_rx) = Self::new(client);
        context.restore();
        (context, nav_rx)
    }

    fn attempts(&self) -> MutexGuard<'_, u64> {
        self.latest_attempt.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn store(&self) -> &CredentialStore {
        self.client.store()
    }

    /// Rebuild the session from storage without contacting the server.
    ///
    /// Only the first call does anything. Unreadable storage is cleared and the
    /// session settles as unauthenticated.
    pub fn restore(&self) {
        if self.restored.swap(true, Ordering::SeqCst) {
            return;
        }

        let user = match self.store().user_checked() {
            Ok(Some(user)) if self.store().is_authenticated() => Some(user),
            Ok(_) => None,
            Err(e) => {
                warn!(error = %e, "Stored session unreadable, clearing it");
                let _ = self.client.logout();
                None
            }
        };

        debug!(authenticated = user.is_some(), "Session restored");
        self.state.send_modify(|s| {
            s.user = user;
            s.is_loading = false;
        });
    }

    /// Log in, replacing any current session.
    ///
    /// On failure the session is left as it was and the error is returned for
    /// display. If a newer login or a logout started while this one was in
    /// flight, its result is discarded and `AuthError::Superseded` returned.
    pub async fn login(&self, credentials: &Credentials) -> Result<UserProfile, AuthError> {
        let attempt = {
            let mut latest = self.attempts();
            *latest += 1;
            *latest
        };
        let _busy = BusyGuard::acquire(&self.state);

        let result = self.client.authenticate(credentials).await;

        let latest = self.attempts();
        if *latest != attempt {
            debug!(attempt, latest = *latest, "Discarding stale login result");
            return match result {
                Ok(_) => Err(AuthError::Superseded),
                Err(e) => Err(e),
            };
        }

        let LoginResponse { token, user } = result?;
        self.store().save_session(&token, &user)?;
        self.state.send_modify(|s| s.user = Some(user.clone()));
        drop(latest);

        info!(user_id = %user.id, "Login successful");
        Ok(user)
    }

    /// End the session locally and send the user to the login view.
    ///
    /// In-memory state is cleared and the navigation fires even if clearing
    /// storage fails; that failure is returned.
    pub fn logout(&self) -> Result<(), StoreError> {
        let result = {
            let mut latest = self.attempts();
            *latest += 1;
            let result = self.client.logout();
            self.state.send_modify(|s| s.user = None);
            result
        };

        if let Err(e) = self.nav_tx.try_send(Navigation::to_login()) {
            warn!(error = %e, "Failed to send navigation to login");
        }
        info!("Logged out");
        result
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn user(&self) -> Option<UserProfile> {
        self.state.borrow().user.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().is_loading
    }

    pub fn is_busy(&self) -> bool {
        self.state.borrow().is_busy()
    }

    /// In-memory user present and a full token/profile pair still stored.
    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().user.is_some() && self.store().is_authenticated()
    }

    pub fn status(&self) -> SessionStatus {
        if self.is_loading() {
            SessionStatus::Initializing
        } else if self.is_authenticated() {
            SessionStatus::Authenticated
        } else {
            SessionStatus::Unauthenticated
        }
    }

    pub fn client(&self) -> &SessionClient {
        &self.client
    }
}
