use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::api::auth::{AuthApi, AuthResponse};
use crate::auth::session::{SessionEvent, SessionSnapshot, SessionState, User};
use crate::auth::storage::SessionStorage;
use crate::error::AuthError;
use crate::events::{SessionEvents, SessionSubscriber};

// Event channel sizing; session traffic is tiny
const EVENT_CAPACITY: usize = 64;
const EVENT_BUFFER_SIZE: usize = 16;

/// Notification shown when a persisted session is rejected
const SESSION_EXPIRED_NOTICE: &str = "Session expired. Please sign in again.";

/// Single source of truth for client-side authentication state.
///
/// Constructed explicitly from its collaborators and shared by `Arc`; there
/// is no global instance. All mutation goes through `initialize`, `login`,
/// `register`, `logout`, and `refresh_profile`. Reads (`snapshot`) are
/// synchronous and never touch the network or disk.
pub struct SessionStore {
    api: Arc<AuthApi>,
    storage: Arc<SessionStorage>,
    state: RwLock<SessionState>,
    /// Set exactly once, when the first initialize pass completes
    initialized: AtomicBool,
    /// Serializes concurrent initialize passes
    init_lock: Mutex<()>,
    events: SessionEvents,
}

impl SessionStore {
    /// Create a store in the `Uninitialized` state
    pub fn new(api: Arc<AuthApi>, storage: Arc<SessionStorage>) -> Self {
        Self {
            api,
            storage,
            state: RwLock::new(SessionState::Uninitialized),
            initialized: AtomicBool::new(false),
            init_lock: Mutex::new(()),
            events: SessionEvents::new(EVENT_CAPACITY, EVENT_BUFFER_SIZE),
        }
    }

    /// Take a synchronous snapshot of the session fields
    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.read_state();
        SessionSnapshot {
            user: state.user().cloned(),
            is_authenticated: state.is_authenticated(),
            is_loading: state.is_loading(),
            is_initialized: self.initialized.load(Ordering::Acquire),
        }
    }

    /// Whether the first initialize pass has completed
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Subscribe to session events
    pub fn subscribe(&self) -> SessionSubscriber {
        self.events.subscribe()
    }

    /// Restore the session from durable storage.
    ///
    /// With no stored token this resolves `Unauthenticated` without touching
    /// the network. With one, the profile fetch decides: success restores
    /// `Authenticated`, failure clears storage and emits `Expired`. Runs at
    /// most once; concurrent callers await the same pass and later calls are
    /// no-ops. Failures on this path are absorbed, never returned.
    pub async fn initialize(&self) -> SessionSnapshot {
        let _guard = self.init_lock.lock().await;
        if self.initialized.load(Ordering::Acquire) {
            debug!("Session already initialized, skipping");
            return self.snapshot();
        }

        *self.write_state() = SessionState::Initializing;
        debug!("Initializing session from storage");

        match self.storage.load().await {
            Ok(None) => {
                debug!("No stored session, starting unauthenticated");
                *self.write_state() = SessionState::Unauthenticated;
            }
            Ok(Some(stored)) => match self.api.fetch_profile(&stored.token).await {
                Ok(user) => {
                    info!(username = %user.username, "Session restored");
                    *self.write_state() = SessionState::Authenticated { user };
                }
                Err(err) => {
                    self.expire_session(&format!("profile fetch failed: {err}"))
                        .await;
                }
            },
            Err(err) => {
                // Unreadable or tampered payloads get the invalid-token treatment
                self.expire_session(&format!("stored session rejected: {err}"))
                    .await;
            }
        }

        self.initialized.store(true, Ordering::Release);
        self.snapshot()
    }

    /// Sign in with an existing account.
    ///
    /// On success the token and user are persisted together, the session
    /// becomes `Authenticated`, and `LoggedIn` is emitted. On failure the
    /// session is left exactly as it was and the error propagates to the
    /// calling form.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let response = self.api.login(email, password).await?;
        self.complete_sign_in(response).await
    }

    /// Create an account and sign in. Same contract as `login`.
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<User, AuthError> {
        let response = self.api.register(username, email, password).await?;
        self.complete_sign_in(response).await
    }

    /// Sign out: clear persistence, drop the user, emit `LoggedOut`.
    ///
    /// Navigation is left to whoever consumes the event.
    pub async fn logout(&self) -> Result<(), AuthError> {
        self.storage.clear().await.map_err(AuthError::storage)?;
        *self.write_state() = SessionState::Unauthenticated;
        self.events.publish(SessionEvent::LoggedOut);
        info!("Signed out");
        Ok(())
    }

    /// Re-fetch the profile with the persisted token, replacing the cached
    /// user wholesale. Fails with `MissingToken` when nothing is persisted;
    /// other failures propagate without mutating the session.
    pub async fn refresh_profile(&self) -> Result<User, AuthError> {
        let stored = self
            .storage
            .load()
            .await
            .map_err(AuthError::storage)?
            .ok_or(AuthError::MissingToken)?;

        let user = self.api.fetch_profile(&stored.token).await?;
        debug!(username = %user.username, "Profile refreshed");
        *self.write_state() = SessionState::Authenticated { user: user.clone() };
        Ok(user)
    }

    // Persist then transition; persistence failure leaves the session untouched.
    async fn complete_sign_in(&self, response: AuthResponse) -> Result<User, AuthError> {
        let user = response.user;
        self.storage
            .save(&response.token, &user)
            .await
            .map_err(AuthError::storage)?;

        *self.write_state() = SessionState::Authenticated { user: user.clone() };
        self.events.publish(SessionEvent::LoggedIn { user: user.clone() });
        info!(username = %user.username, "Signed in");
        Ok(user)
    }

    // Forced logout on the initialize path: clear, notify, settle unauthenticated.
    async fn expire_session(&self, detail: &str) {
        warn!(detail, "Session expired, clearing stored credentials");
        if let Err(err) = self.storage.clear().await {
            warn!(error = %err, "Failed to clear stored session");
        }
        *self.write_state() = SessionState::Unauthenticated;
        self.events.publish(SessionEvent::Expired {
            reason: SESSION_EXPIRED_NOTICE.to_string(),
        });
    }

    fn read_state(&self) -> RwLockReadGuard<'_, SessionState> {
        self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, SessionState> {
        self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
