//! Authentication state machine.
//!
//! ```text
//! uninitialized ──bootstrap──▶ loading ──▶ authenticated
//!        │                        │
//!        └──(no token)──▶ anonymous ◀──(401 anywhere / logout)
//!                                 ▲
//!                   errored ──────┘ (bootstrap failure)
//! ```
//!
//! The bearer token lives in two places: the persisted [`CredentialStore`]
//! and the attached slot read by the HTTP client on every request. Both are
//! owned here.

use std::sync::{Arc, RwLock};

use api_types::auth::{AuthResponse, Login, MeResponse, Register, User};
use serde::Serialize;

use crate::{
    client::{AuthHook, Client},
    credentials::CredentialStore,
    error::{CoreError, Outcome},
    util,
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SessionStatus {
    #[default]
    Uninitialized,
    Loading,
    Authenticated,
    Anonymous,
    Errored,
}

/// Snapshot handed to callers for rendering.
///
/// `status == Authenticated` iff `user` and `credential` are both present.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionState {
    pub status: SessionStatus,
    pub user: Option<User>,
    pub credential: Option<String>,
    pub last_error: Option<String>,
}

#[derive(Debug)]
pub(crate) enum SessionAction {
    /// `credential` is whatever the client is about to send, if anything.
    Loading { credential: Option<String> },
    SignedIn { user: User, credential: String },
    Failed(String),
    SignedOut,
    Expired(String),
    ClearError,
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        self.status == SessionStatus::Authenticated
            && self.user.is_some()
            && self.credential.is_some()
    }

    pub(crate) fn apply(&mut self, action: SessionAction) {
        match action {
            SessionAction::Loading { credential } => {
                self.status = SessionStatus::Loading;
                self.user = None;
                self.credential = credential;
            }
            SessionAction::SignedIn { user, credential } => {
                self.status = SessionStatus::Authenticated;
                self.user = Some(user);
                self.credential = Some(credential);
                self.last_error = None;
            }
            SessionAction::Failed(message) => {
                self.status = SessionStatus::Errored;
                self.user = None;
                self.credential = None;
                self.last_error = Some(message);
            }
            SessionAction::SignedOut => {
                self.status = SessionStatus::Anonymous;
                self.user = None;
                self.credential = None;
                self.last_error = None;
            }
            SessionAction::Expired(message) => {
                self.status = SessionStatus::Anonymous;
                self.user = None;
                self.credential = None;
                self.last_error = Some(message);
            }
            SessionAction::ClearError => {
                self.last_error = None;
            }
        }
    }
}

/// Runs whenever the credential is dropped, so per-user data goes with it.
pub(crate) type SignOutHook = Box<dyn Fn() + Send + Sync>;

pub(crate) struct SessionShared {
    state: RwLock<SessionState>,
    attached: RwLock<Option<String>>,
    store: Arc<dyn CredentialStore>,
    on_sign_out: SignOutHook,
}

impl SessionShared {
    pub(crate) fn new(store: Arc<dyn CredentialStore>, on_sign_out: SignOutHook) -> Self {
        Self {
            state: RwLock::new(SessionState::default()),
            attached: RwLock::new(None),
            store,
            on_sign_out,
        }
    }

    fn dispatch(&self, action: SessionAction) {
        util::write(&self.state).apply(action);
    }

    fn attach(&self, token: Option<String>) {
        *util::write(&self.attached) = token;
    }

    fn persist(&self, token: &str) {
        if let Err(err) = self.store.save(token) {
            tracing::warn!("failed to persist credential: {err}");
        }
    }

    /// Detaches and erases the credential everywhere.
    fn forget(&self) {
        self.attach(None);
        if let Err(err) = self.store.clear() {
            tracing::warn!("failed to clear persisted credential: {err}");
        }
        (self.on_sign_out)();
    }
}

impl AuthHook for SessionShared {
    fn bearer(&self) -> Option<String> {
        util::read(&self.attached).clone()
    }

    fn unauthorized(&self, message: &str) {
        tracing::info!("authorization rejected, dropping session");
        self.forget();
        self.dispatch(SessionAction::Expired(message.to_string()));
    }
}

/// Owns the session state machine and the credential lifecycle.
#[derive(Clone)]
pub struct SessionManager {
    shared: Arc<SessionShared>,
    client: Client,
}

impl SessionManager {
    pub(crate) fn new(shared: Arc<SessionShared>, client: Client) -> Self {
        Self { shared, client }
    }

    pub fn snapshot(&self) -> SessionState {
        util::read(&self.shared.state).clone()
    }

    pub fn status(&self) -> SessionStatus {
        util::read(&self.shared.state).status
    }

    pub fn current_user(&self) -> Option<User> {
        util::read(&self.shared.state).user.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        util::read(&self.shared.state).is_authenticated()
    }

    pub fn clear_error(&self) {
        self.shared.dispatch(SessionAction::ClearError);
    }

    /// Resumes a persisted session, if any.
    ///
    /// Returns `Ok(None)` when there was nothing to resume.
    pub async fn bootstrap(&self) -> Outcome<Option<User>> {
        let token = self.shared.store.load().unwrap_or_else(|err| {
            tracing::warn!("failed to read persisted credential: {err}");
            None
        });
        let Some(token) = token else {
            self.shared.dispatch(SessionAction::SignedOut);
            return Ok(None);
        };

        self.shared.attach(Some(token.clone()));
        self.shared.dispatch(SessionAction::Loading {
            credential: Some(token.clone()),
        });

        match self.client.get::<MeResponse>("/api/auth/me").await {
            Ok(MeResponse { user }) => {
                tracing::info!("resumed session for {}", user.email);
                self.shared.dispatch(SessionAction::SignedIn {
                    user: user.clone(),
                    credential: token,
                });
                Ok(Some(user))
            }
            Err(err) => {
                let err = CoreError::from(err);
                self.shared.forget();
                self.shared.dispatch(SessionAction::Failed(err.to_string()));
                self.shared.dispatch(SessionAction::Expired(err.to_string()));
                Err(err)
            }
        }
    }

    pub async fn login(&self, email: &str, password: &str) -> Outcome<User> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(CoreError::validation("email and password are required"));
        }

        let body = Login {
            email: email.to_string(),
            password: password.to_string(),
        };
        self.authenticate("/api/auth/login", &body).await
    }

    /// Registers a new account; success leaves the session signed in.
    pub async fn register(&self, name: &str, email: &str, password: &str) -> Outcome<User> {
        let name = name.trim();
        let email = email.trim();
        if name.is_empty() || email.is_empty() || password.is_empty() {
            return Err(CoreError::validation(
                "name, email and password are required",
            ));
        }

        let body = Register {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        };
        self.authenticate("/api/auth/register", &body).await
    }

    /// Drops the session locally. No request is sent.
    pub fn logout(&self) {
        self.shared.forget();
        self.shared.dispatch(SessionAction::SignedOut);
        tracing::info!("signed out");
    }

    async fn authenticate<B: Serialize>(&self, path: &str, body: &B) -> Outcome<User> {
        self.shared.attach(None);
        self.shared.dispatch(SessionAction::Loading { credential: None });

        match self.client.post::<_, AuthResponse>(path, body).await {
            Ok(AuthResponse { token, user }) => {
                self.shared.persist(&token);
                self.shared.attach(Some(token.clone()));
                tracing::info!("signed in as {}", user.email);
                self.shared.dispatch(SessionAction::SignedIn {
                    user: user.clone(),
                    credential: token,
                });
                Ok(user)
            }
            Err(err) => {
                let err = CoreError::from_auth(err);
                self.shared.forget();
                self.shared.dispatch(SessionAction::Failed(err.to_string()));
                Err(err)
            }
        }
    }
}
