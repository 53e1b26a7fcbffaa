//! Session lifecycle.
//!
//! # Responsibility
//! - Own the signed-in user and the persisted copy of their session.
//! - Restore the session once at startup; sign in, register and sign out.
//!
//! # Invariants
//! - `current_user` and `is_authenticated` are both computed from one
//!   `SessionState` value, so they can never disagree.
//! - The persisted session is written before the state changes; a failed
//!   write leaves the store as it was.

pub mod codec;
pub mod model;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::error::TaskflowResult;
use crate::navigation::{NavigationIntent, Route};
use crate::remote::RemoteApi;
use crate::state::{Derived, StateCell};
use codec::SessionCodec;
use model::{AuthenticatedUser, CredentialToken, Credentials, RegisterRequest};

/// Where the session lifecycle currently stands.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    /// Process start, before `initialize` ran.
    Restoring,
    Unauthenticated,
    Authenticated(AuthenticatedUser),
}

impl SessionState {
    pub fn user(&self) -> Option<&AuthenticatedUser> {
        match self {
            Self::Authenticated(user) => Some(user),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Restoring => "restoring",
            Self::Unauthenticated => "unauthenticated",
            Self::Authenticated(_) => "authenticated",
        }
    }
}

/// Owns the current user and the session lifecycle.
pub struct SessionStore {
    remote: Arc<dyn RemoteApi>,
    codec: SessionCodec,
    state: StateCell<SessionState>,
    watch: Derived<SessionState>,
    current_user: Derived<Option<AuthenticatedUser>>,
    authenticated: Derived<bool>,
    navigation: broadcast::Sender<NavigationIntent>,
    initialized: AtomicBool,
}

impl SessionStore {
    pub fn new(remote: Arc<dyn RemoteApi>, codec: SessionCodec) -> Self {
        let state = StateCell::new(SessionState::Restoring);
        let watch = state.derive(SessionState::clone);
        let current_user = state.derive(|s: &SessionState| s.user().cloned());
        let authenticated = state.derive(SessionState::is_authenticated);
        let (navigation, _rx) = broadcast::channel(16);

        Self {
            remote,
            codec,
            state,
            watch,
            current_user,
            authenticated,
            navigation,
            initialized: AtomicBool::new(false),
        }
    }

    /// Restore the persisted session.
    ///
    /// Runs once; later calls return the current state untouched. Unreadable
    /// persisted data is cleared and the store falls back to
    /// `Unauthenticated`.
    pub fn initialize(&self) -> SessionState {
        if self.initialized.swap(true, Ordering::SeqCst) {
            debug!("Session already initialized");
            return self.state.read();
        }
        if !matches!(self.state.read(), SessionState::Restoring) {
            debug!("Session settled before initialization, keeping it");
            return self.state.read();
        }

        match self.codec.load() {
            Some(user) => {
                info!(user_id = %user.id, "Restored persisted session");
                self.state.set(SessionState::Authenticated(user));
            }
            None => {
                debug!("No persisted session");
                self.codec.clear();
                self.state.set(SessionState::Unauthenticated);
            }
        }
        self.state.read()
    }

    /// Sign in. On success the session is persisted, published and a
    /// navigation to the landing route is emitted. On failure nothing changes.
    pub async fn login(&self, credentials: &Credentials) -> TaskflowResult<AuthenticatedUser> {
        debug!(email = %credentials.email, "Signing in");
        let user = self
            .remote
            .login(credentials)
            .await
            .inspect_err(|e| warn!(email = %credentials.email, error = %e, "Login failed"))?;
        self.establish(user)
    }

    /// Create an account and sign in as it. Same contract as `login`.
    pub async fn register(&self, request: &RegisterRequest) -> TaskflowResult<AuthenticatedUser> {
        debug!(email = %request.email, "Registering");
        let user = self
            .remote
            .register(request)
            .await
            .inspect_err(|e| warn!(email = %request.email, error = %e, "Registration failed"))?;
        self.establish(user)
    }

    /// Sign out. Never fails.
    pub fn logout(&self) {
        let previous = self.state.read();
        self.codec.clear();
        self.state.set(SessionState::Unauthenticated);
        if let Some(user) = previous.user() {
            info!(user_id = %user.id, "Signed out");
        }
        self.navigate(Route::SIGN_IN);
    }

    fn establish(&self, user: AuthenticatedUser) -> TaskflowResult<AuthenticatedUser> {
        self.codec.save(&user)?;
        self.state.set(SessionState::Authenticated(user.clone()));
        info!(user_id = %user.id, "Session established");
        self.navigate(Route::LANDING);
        Ok(user)
    }

    fn navigate(&self, target: Route) {
        debug!(%target, "Requesting navigation");
        // No receivers is fine: nobody is routing.
        let _ = self.navigation.send(NavigationIntent::to(target));
    }

    /// Snapshot of the session state.
    pub fn state(&self) -> SessionState {
        self.state.read()
    }

    /// The session state as a subscribable value.
    pub fn watch(&self) -> &Derived<SessionState> {
        &self.watch
    }

    pub fn current_user(&self) -> &Derived<Option<AuthenticatedUser>> {
        &self.current_user
    }

    /// Synchronously readable; the route guards consult it.
    pub fn is_authenticated(&self) -> &Derived<bool> {
        &self.authenticated
    }

    /// Token for the transport to attach to requests.
    pub fn token(&self) -> Option<CredentialToken> {
        self.state.with(|s| s.user().map(|u| u.token.clone()))
    }

    /// Navigation intents emitted after this call.
    pub fn navigation(&self) -> broadcast::Receiver<NavigationIntent> {
        self.navigation.subscribe()
    }
}
