//! Session/auth controller and route guard.
//!
//! DESIGN
//! ======
//! A two-state machine, `Anonymous` and `Authenticated`, owned by one
//! [`SessionController`]. Every transition takes `&mut self`, so updates are
//! serialized by ownership; readers borrow the controller.
//!
//! Transitions:
//! - `login` / `login_admin`: `Anonymous -> Authenticated` on success; on
//!   failure nothing changes except the error message. A successful login
//!   over an existing session revokes the old token (best effort).
//! - `restore`: `Anonymous -> Authenticated` when the stored token is still
//!   accepted by the backend.
//! - `logout`: any state `-> Anonymous`, unconditionally.
//!
//! ERROR HANDLING
//! ==============
//! Only two login messages ever reach the user:
//! [`INVALID_CREDENTIALS_MESSAGE`] when the backend refuses the credentials
//! and [`GENERIC_ERROR_MESSAGE`] for anything else. There is no retry,
//! backoff, or token refresh.

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use crate::net::types::{LoginKind, RegisterRequest, User};
use crate::net::{AuthBackend, BackendError};

use super::token_store::TokenStore;

pub const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid email or password";
pub const GENERIC_ERROR_MESSAGE: &str = "An error occurred. Please try again.";
pub const MIN_PASSWORD_LEN: usize = 8;

// =============================================================================
// ROUTES
// =============================================================================

/// Portal views.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Route {
    Home,
    Login,
    Register,
    Dashboard,
    Admin,
}

impl Route {
    #[must_use]
    pub fn path(self) -> &'static str {
        match self {
            Self::Home => "/",
            Self::Login => "/login",
            Self::Register => "/register",
            Self::Dashboard => "/dashboard",
            Self::Admin => "/admin",
        }
    }

    #[must_use]
    pub fn is_public(self) -> bool {
        matches!(self, Self::Home | Self::Login | Self::Register)
    }
}

/// Outcome of a route guard check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Access {
    Granted,
    Redirect(Route),
}

// =============================================================================
// STATE
// =============================================================================

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    Anonymous,
    Authenticated {
        user: User,
        token: String,
    },
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("Name is required")]
    MissingName,
    #[error("Passwords do not match")]
    PasswordMismatch,
    #[error("Password must be at least {MIN_PASSWORD_LEN} characters long")]
    PasswordTooShort,
    /// The backend refused the request; carries its message.
    #[error("{0}")]
    Rejected(String),
    #[error("{GENERIC_ERROR_MESSAGE}")]
    Unexpected,
}

impl From<BackendError> for SessionError {
    fn from(err: BackendError) -> Self {
        if err.is_rejection() {
            return Self::Rejected(err.to_string());
        }
        tracing::warn!(error = %err, "backend request failed");
        Self::Unexpected
    }
}

/// Local checks run before a registration reaches the backend.
///
/// # Errors
///
/// Returns the first failed rule.
pub fn validate_registration(name: &str, password: &str, confirm_password: &str) -> Result<(), SessionError> {
    if name.trim().is_empty() {
        return Err(SessionError::MissingName);
    }
    if password != confirm_password {
        return Err(SessionError::PasswordMismatch);
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(SessionError::PasswordTooShort);
    }
    Ok(())
}

/// Map a login failure onto one of the two user-facing messages.
fn login_error_message(err: &BackendError) -> &'static str {
    if err.is_rejection() { INVALID_CREDENTIALS_MESSAGE } else { GENERIC_ERROR_MESSAGE }
}

// =============================================================================
// CONTROLLER
// =============================================================================

#[derive(Debug)]
pub struct SessionController<B, S> {
    backend: B,
    store: S,
    state: SessionState,
    error: Option<String>,
}

impl<B: AuthBackend, S: TokenStore> SessionController<B, S> {
    /// Start anonymous. Call [`Self::restore`] to pick up a stored token.
    pub fn new(backend: B, store: S) -> Self {
        Self { backend, store, state: SessionState::Anonymous, error: None }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.state, SessionState::Authenticated { .. })
    }

    pub fn current_user(&self) -> Option<&User> {
        match &self.state {
            SessionState::Authenticated { user, .. } => Some(user),
            SessionState::Anonymous => None,
        }
    }

    pub fn token(&self) -> Option<&str> {
        match &self.state {
            SessionState::Authenticated { token, .. } => Some(token),
            SessionState::Anonymous => None,
        }
    }

    /// Message from the last failed login, cleared by the next attempt.
    pub fn last_error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Developer login. Returns `true` on success; the caller should then
    /// navigate to [`Route::Dashboard`].
    pub async fn login(&mut self, email: &str, password: &str) -> bool {
        self.login_as(LoginKind::Developer, email, password).await
    }

    /// Admin login. Returns `true` on success; the caller should then
    /// navigate to [`Route::Admin`].
    pub async fn login_admin(&mut self, email: &str, password: &str) -> bool {
        self.login_as(LoginKind::Admin, email, password).await
    }

    /// Where a successful login of this kind lands.
    pub fn post_login_route(kind: LoginKind) -> Route {
        match kind {
            LoginKind::Developer => Route::Dashboard,
            LoginKind::Admin => Route::Admin,
        }
    }

    async fn login_as(&mut self, kind: LoginKind, email: &str, password: &str) -> bool {
        self.error = None;
        match self.backend.login(kind, email, password).await {
            Ok(response) => {
                if let Err(e) = self.store.save(&response.token) {
                    tracing::warn!(error = %e, "session token not persisted");
                }
                tracing::info!(user_id = %response.user.id, "signed in");
                let previous = std::mem::replace(
                    &mut self.state,
                    SessionState::Authenticated { user: response.user, token: response.token },
                );
                if let SessionState::Authenticated { token: old, .. } = previous {
                    if let Err(e) = self.backend.logout(&old).await {
                        tracing::warn!(error = %e, "previous session not revoked");
                    }
                }
                true
            }
            Err(e) => {
                tracing::debug!(error = %e, "login failed");
                self.error = Some(login_error_message(&e).to_owned());
                false
            }
        }
    }

    /// Clear the session. The backend is told on a best-effort basis; the
    /// local state is cleared whatever happens, even when already anonymous.
    pub async fn logout(&mut self) {
        let previous = std::mem::take(&mut self.state);
        if let SessionState::Authenticated { token, .. } = previous {
            if let Err(e) = self.backend.logout(&token).await {
                tracing::warn!(error = %e, "backend logout failed; clearing local session anyway");
            }
        }
        if let Err(e) = self.store.clear() {
            tracing::warn!(error = %e, "stored session token not cleared");
        }
        self.error = None;
    }

    /// Create an account. Never changes the session: a new account must
    /// verify its email and then log in.
    ///
    /// # Errors
    ///
    /// Returns a validation error, the backend's rejection message, or
    /// [`SessionError::Unexpected`].
    pub async fn register(
        &mut self,
        name: &str,
        email: &str,
        password: &str,
        confirm_password: &str,
    ) -> Result<(), SessionError> {
        validate_registration(name, password, confirm_password)?;
        let request = RegisterRequest {
            name: name.trim().to_owned(),
            email: email.trim().to_owned(),
            password: password.to_owned(),
            confirm_password: confirm_password.to_owned(),
        };
        self.backend.register(&request).await?;
        Ok(())
    }

    /// Confirm an email address with the code that was sent to it.
    ///
    /// # Errors
    ///
    /// Returns the backend's rejection message or [`SessionError::Unexpected`].
    pub async fn verify_email(&mut self, email: &str, code: &str) -> Result<(), SessionError> {
        self.backend.verify_email(email.trim(), code.trim()).await?;
        Ok(())
    }

    /// Re-establish a session from the token store. Returns `true` when
    /// authenticated afterwards.
    ///
    /// A token the backend rejects (401) is cleared. Any other failure keeps
    /// the token for a later attempt and stays anonymous.
    pub async fn restore(&mut self) -> bool {
        if self.is_authenticated() {
            return true;
        }
        let token = match self.store.load() {
            Ok(Some(token)) => token,
            Ok(None) => return false,
            Err(e) => {
                tracing::warn!(error = %e, "stored session token unreadable");
                return false;
            }
        };

        match self.backend.current_user(&token).await {
            Ok(user) => {
                self.state = SessionState::Authenticated { user, token };
                true
            }
            Err(e) if e.is_unauthorized() => {
                tracing::info!("stored session rejected; clearing");
                if let Err(e) = self.store.clear() {
                    tracing::warn!(error = %e, "stored session token not cleared");
                }
                false
            }
            Err(e) => {
                tracing::warn!(error = %e, "session restore failed");
                false
            }
        }
    }

    /// Gate access to a view.
    pub fn guard(&self, route: Route) -> Access {
        if route.is_public() {
            return Access::Granted;
        }
        match (&self.state, route) {
            (SessionState::Anonymous, _) => Access::Redirect(Route::Login),
            (SessionState::Authenticated { user, .. }, Route::Admin) if !user.is_admin => {
                Access::Redirect(Route::Dashboard)
            }
            (SessionState::Authenticated { .. }, _) => Access::Granted,
        }
    }
}
