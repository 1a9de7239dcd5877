//! In-memory backend with fixed mock credentials and data.
//!
//! Used by `movie-cli --mock`, by front ends running without a server, and
//! by tests. Every call optionally waits a fixed delay first, standing in
//! for network latency; there is no cancellation or timeout.

#[cfg(test)]
#[path = "mock_test.rs"]
mod mock_test;

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use super::types::{AdminOverview, ApiKeyRecord, DashboardData, LoginKind, LoginResponse, RegisterRequest, User};
use super::{AuthBackend, BackendError, PortalData};

pub const MOCK_DEVELOPER_EMAIL: &str = "developer@example.com";
pub const MOCK_DEVELOPER_PASSWORD: &str = "password123";
pub const MOCK_ADMIN_EMAIL: &str = "admin@movieapi.com";
pub const MOCK_ADMIN_PASSWORD: &str = "admin123";
/// Code accepted by [`MockAuthBackend::verify_email`].
pub const MOCK_VERIFICATION_CODE: &str = "123456";

#[derive(Clone, Debug)]
struct MockAccount {
    user: User,
    password: String,
    verified: bool,
}

#[derive(Debug, Default)]
struct MockInner {
    accounts: Vec<MockAccount>,
    sessions: HashMap<String, Uuid>,
}

fn rejected(status: u16, detail: &str) -> BackendError {
    BackendError::Api { status, detail: detail.to_owned() }
}

#[derive(Debug)]
pub struct MockAuthBackend {
    inner: Mutex<MockInner>,
    delay: Duration,
}

impl Default for MockAuthBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockAuthBackend {
    /// Seeded with one verified developer and one admin, no delay.
    #[must_use]
    pub fn new() -> Self {
        let backend = Self { inner: Mutex::new(MockInner::default()), delay: Duration::ZERO };
        backend.add_account("Developer", MOCK_DEVELOPER_EMAIL, MOCK_DEVELOPER_PASSWORD, false);
        backend.add_account("Admin", MOCK_ADMIN_EMAIL, MOCK_ADMIN_PASSWORD, true);
        backend
    }

    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Add a verified account.
    pub fn add_account(&self, name: &str, email: &str, password: &str, is_admin: bool) -> User {
        let user = User { id: Uuid::new_v4(), name: name.to_owned(), email: email.to_owned(), is_admin };
        self.lock().accounts.push(MockAccount { user: user.clone(), password: password.to_owned(), verified: true });
        user
    }

    /// Drop every session, as if they all expired server-side.
    pub fn expire_sessions(&self) {
        self.lock().sessions.clear();
    }

    #[must_use]
    pub fn session_count(&self) -> usize {
        self.lock().sessions.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn wait(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }

    fn user_for(&self, token: &str) -> Result<User, BackendError> {
        let inner = self.lock();
        let user_id = inner
            .sessions
            .get(token)
            .ok_or_else(|| rejected(401, "Session expired. Please sign in again."))?;
        inner
            .accounts
            .iter()
            .find(|a| a.user.id == *user_id)
            .map(|a| a.user.clone())
            .ok_or_else(|| rejected(401, "Session expired. Please sign in again."))
    }
}

fn same_email(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

#[async_trait]
impl AuthBackend for MockAuthBackend {
    async fn login(&self, kind: LoginKind, email: &str, password: &str) -> Result<LoginResponse, BackendError> {
        self.wait().await;
        let mut inner = self.lock();
        let account = inner
            .accounts
            .iter()
            .find(|a| same_email(&a.user.email, email) && a.password == password)
            .filter(|a| a.user.is_admin == (kind == LoginKind::Admin))
            .cloned()
            .ok_or_else(|| rejected(401, "Invalid email or password"))?;
        if !account.verified {
            return Err(rejected(403, "Please verify your email before signing in"));
        }

        let token = Uuid::new_v4().simple().to_string();
        inner.sessions.insert(token.clone(), account.user.id);
        Ok(LoginResponse { token, user: account.user })
    }

    async fn logout(&self, token: &str) -> Result<(), BackendError> {
        self.wait().await;
        self.lock().sessions.remove(token);
        Ok(())
    }

    async fn register(&self, request: &RegisterRequest) -> Result<(), BackendError> {
        self.wait().await;
        let mut inner = self.lock();
        if inner.accounts.iter().any(|a| same_email(&a.user.email, &request.email)) {
            return Err(rejected(409, "Email already registered"));
        }
        inner.accounts.push(MockAccount {
            user: User {
                id: Uuid::new_v4(),
                name: request.name.trim().to_owned(),
                email: request.email.trim().to_ascii_lowercase(),
                is_admin: false,
            },
            password: request.password.clone(),
            verified: false,
        });
        Ok(())
    }

    async fn verify_email(&self, email: &str, code: &str) -> Result<(), BackendError> {
        self.wait().await;
        let mut inner = self.lock();
        let account = inner
            .accounts
            .iter_mut()
            .find(|a| same_email(&a.user.email, email) && !a.verified)
            .filter(|_| code.trim() == MOCK_VERIFICATION_CODE)
            .ok_or_else(|| rejected(400, "Invalid or expired verification code"))?;
        account.verified = true;
        Ok(())
    }

    async fn current_user(&self, token: &str) -> Result<User, BackendError> {
        self.wait().await;
        self.user_for(token)
    }
}

#[async_trait]
impl PortalData for MockAuthBackend {
    async fn dashboard(&self, token: &str) -> Result<DashboardData, BackendError> {
        self.wait().await;
        let user = self.user_for(token)?;
        let record = ApiKeyRecord::mock();
        Ok(DashboardData { user, api_key: Some(record.clone()), api_keys: vec![record] })
    }

    async fn admin_overview(&self, token: &str) -> Result<AdminOverview, BackendError> {
        self.wait().await;
        let user = self.user_for(token)?;
        if !user.is_admin {
            return Err(rejected(403, "Admin access required"));
        }
        Ok(AdminOverview::mock())
    }
}
