use std::future::Future;

use chrono::Duration;
use tokio::sync::{watch, Mutex};
use tracing::{debug, error, info, warn};

use crate::api::{ApiClient, ApiError, AuthPayload, SESSION_EXPIRED_MESSAGE};
use crate::models::{CurrentUser, LoginRequest, ProfileUpdate, RegisterRequest};
use crate::notify::Notifier;
use crate::storage::LocalStore;

/// Storage key of the bearer token entry.
pub const TOKEN_KEY: &str = "token";

/// Token lifetime in hours, counted from login on this client.
pub const TOKEN_TTL_HOURS: i64 = 24;

pub fn token_ttl() -> Duration {
    Duration::hours(TOKEN_TTL_HOURS)
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    /// Start-up check of a stored token has not finished yet.
    Rehydrating,
    Unauthenticated,
    Authenticated(CurrentUser),
}

/// What subscribers see on every change.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub loading: bool,
    /// Last failure, phrased for display.
    pub error: Option<String>,
}

impl SessionSnapshot {
    fn initial() -> Self {
        Self {
            state: SessionState::Rehydrating,
            loading: true,
            error: None,
        }
    }

    pub fn current_user(&self) -> Option<&CurrentUser> {
        match self.state {
            SessionState::Authenticated(ref user) => Some(user),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.current_user().is_some()
    }
}

/// Owns the session state machine.
///
/// Holds no token in memory: the credential lives in the `LocalStore` and
/// the API client reads it from there. State changes are published on a
/// watch channel. Login, registration, logout, rehydration, refresh and
/// profile updates run one at a time.
pub struct SessionStore {
    api: ApiClient,
    store: LocalStore,
    notifier: Notifier,
    state: watch::Sender<SessionSnapshot>,
    op_guard: Mutex<()>,
}

impl SessionStore {
    /// The store starts in `Rehydrating`; call `rehydrate` once at start-up.
    pub fn new(api: ApiClient, notifier: Notifier) -> Self {
        let store = api.store().clone();
        let (state, _) = watch::channel(SessionSnapshot::initial());
        Self {
            api,
            store,
            notifier,
            state,
            op_guard: Mutex::new(()),
        }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.state.subscribe()
    }

    pub fn current_user(&self) -> Option<CurrentUser> {
        self.state.borrow().current_user().cloned()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().loading
    }

    pub fn last_error(&self) -> Option<String> {
        self.state.borrow().error.clone()
    }

    /// True when an unexpired token is stored.
    pub fn has_credential(&self) -> bool {
        self.store.read::<String>(TOKEN_KEY).is_some()
    }

    fn begin(&self) {
        self.state.send_modify(|s| {
            s.loading = true;
            s.error = None;
        });
    }

    fn settle(&self, state: SessionState) {
        self.state.send_modify(|s| {
            s.state = state;
            s.loading = false;
        });
    }

    /// Record a failure. An established identity is kept; a session that
    /// never finished rehydrating becomes unauthenticated.
    fn fail(&self, err: &ApiError) {
        let message = err.message().to_string();
        self.state.send_modify(|s| {
            if s.state == SessionState::Rehydrating {
                s.state = SessionState::Unauthenticated;
            }
            s.loading = false;
            s.error = Some(message);
        });
    }

    /// Swap in a fresh copy of the user if the session is still live.
    /// Returns false when it ended while the request was in flight.
    fn replace_identity(&self, user: CurrentUser) -> bool {
        let live = self.has_credential();
        let mut applied = false;
        self.state.send_modify(|s| {
            if live && s.is_authenticated() {
                s.state = SessionState::Authenticated(user);
                applied = true;
            }
            s.loading = false;
        });
        applied
    }

    fn ended_in_flight() -> ApiError {
        warn!("Session ended while the request was in flight, dropping the response");
        ApiError::Unauthorized(SESSION_EXPIRED_MESSAGE.to_string())
    }

    fn persist_token(&self, token: &str) {
        self.store.write(TOKEN_KEY, token, Some(token_ttl()));
    }

    /// Restore the session from a stored token.
    ///
    /// Always ends in `Authenticated` or `Unauthenticated`, and clears the
    /// loading flag only once the outcome is known.
    pub async fn rehydrate(&self) -> SessionState {
        let _guard = self.op_guard.lock().await;
        self.state.send_modify(|s| s.loading = true);

        if self.store.read::<String>(TOKEN_KEY).is_none() {
            debug!("No stored token, starting unauthenticated");
            self.settle(SessionState::Unauthenticated);
            return SessionState::Unauthenticated;
        }

        let next = match self.api.fetch_current_user().await {
            Ok(user) => {
                info!(user_id = user.id, "Session restored");
                SessionState::Authenticated(user)
            }
            Err(e) => {
                warn!(error = %e, status = ?e.status_code(), "Could not restore session, discarding token");
                self.store.remove(TOKEN_KEY);
                SessionState::Unauthenticated
            }
        };
        self.settle(next.clone());
        next
    }

    /// Check the login/registration response and persist its token.
    ///
    /// Returns the user and whether a token was stored.
    fn accept_auth(
        &self,
        payload: AuthPayload,
        token_required: bool,
    ) -> Result<(CurrentUser, bool), ApiError> {
        let user = payload.user.ok_or_else(|| {
            error!("Auth response is missing the user");
            ApiError::invalid_response()
        })?;

        match payload.token.filter(|t| !t.trim().is_empty()) {
            Some(token) => {
                self.persist_token(&token);
                Ok((user, true))
            }
            None if token_required => {
                error!("Auth response is missing the token");
                Err(ApiError::invalid_response())
            }
            None => {
                // A token from an earlier account must not outlive the switch
                self.store.remove(TOKEN_KEY);
                Ok((user, false))
            }
        }
    }

    /// Log in and persist the issued token for `TOKEN_TTL_HOURS`.
    ///
    /// On failure the previous state is kept and the message is recorded
    /// as the last error.
    pub async fn login(&self, credentials: &LoginRequest) -> Result<CurrentUser, ApiError> {
        let _guard = self.op_guard.lock().await;
        self.begin();

        let result = match self.api.login(credentials).await {
            Ok(payload) => self.accept_auth(payload, true),
            Err(e) => Err(e),
        };

        match result {
            Ok((user, _)) => {
                info!(user_id = user.id, "Login successful");
                self.settle(SessionState::Authenticated(user.clone()));
                self.notifier
                    .success(format!("Welcome back, {}", user.username));
                Ok(user)
            }
            Err(e) => {
                error!(error = %e, status = ?e.status_code(), "Login failed");
                self.fail(&e);
                self.notifier.error(e.message());
                Err(e)
            }
        }
    }

    /// Register a new account.
    ///
    /// A response without a token still signs the user in for this process;
    /// nothing is persisted in that case.
    pub async fn register(&self, details: &RegisterRequest) -> Result<CurrentUser, ApiError> {
        let _guard = self.op_guard.lock().await;
        self.begin();

        let result = match self.api.register(details).await {
            Ok(payload) => self.accept_auth(payload, false),
            Err(e) => Err(e),
        };

        match result {
            Ok((user, persisted)) => {
                if !persisted {
                    warn!(user_id = user.id, "No token received from register response, session will not persist");
                }
                info!(user_id = user.id, "Registration successful");
                self.settle(SessionState::Authenticated(user.clone()));
                self.notifier.success("Account created successfully");
                Ok(user)
            }
            Err(e) => {
                error!(error = %e, status = ?e.status_code(), "Registration failed");
                self.fail(&e);
                self.notifier.error(e.message());
                Err(e)
            }
        }
    }

    /// Log out. The local session is cleared even if the server call fails.
    pub async fn logout(&self) {
        let _guard = self.op_guard.lock().await;
        self.state.send_modify(|s| s.loading = true);

        if let Err(e) = self.api.logout().await {
            warn!(error = %e, "Logout failed, clearing session anyway");
        }

        self.store.remove(TOKEN_KEY);
        self.state.send_modify(|s| {
            s.state = SessionState::Unauthenticated;
            s.loading = false;
            s.error = None;
        });
        info!("Logged out");
        self.notifier.info("You have been logged out");
    }

    /// Forced logout after the server rejected the credential.
    pub fn invalidate(&self) {
        self.store.remove(TOKEN_KEY);
        self.state.send_modify(|s| {
            s.state = SessionState::Unauthenticated;
            s.loading = false;
            s.error = Some(SESSION_EXPIRED_MESSAGE.to_string());
        });
        warn!("Session invalidated by server");
        self.notifier.error(SESSION_EXPIRED_MESSAGE);
    }

    /// Run an authenticated call. A 401 from it invalidates the session
    /// before the error reaches the caller.
    pub async fn with_api<T, F, Fut>(&self, op: F) -> Result<T, ApiError>
    where
        F: FnOnce(ApiClient) -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let result = op(self.api.clone()).await;
        if let Err(ref e) = result {
            if e.is_unauthorized() {
                self.invalidate();
            }
        }
        result
    }

    /// Re-fetch the current user, e.g. after a contribution changed totals.
    pub async fn refresh_user(&self) -> Result<CurrentUser, ApiError> {
        let _guard = self.op_guard.lock().await;
        let user = self.with_api(|api| async move { api.fetch_current_user().await }).await?;
        if !self.replace_identity(user.clone()) {
            return Err(Self::ended_in_flight());
        }
        Ok(user)
    }

    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<CurrentUser, ApiError> {
        let _guard = self.op_guard.lock().await;
        self.begin();
        let result = self
            .with_api(|api| async move { api.update_profile(update).await })
            .await;

        match result {
            Ok(user) => {
                if !self.replace_identity(user.clone()) {
                    return Err(Self::ended_in_flight());
                }
                self.notifier.success("Profile updated");
                Ok(user)
            }
            Err(e) => {
                if !e.is_unauthorized() {
                    self.fail(&e);
                    self.notifier.error(e.message());
                }
                Err(e)
            }
        }
    }
}
