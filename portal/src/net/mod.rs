//! Network layer.
//!
//! DESIGN
//! ======
//! The session controller and view states only see two traits:
//! [`AuthBackend`] for account operations and [`PortalData`] for the
//! dashboard/admin fetches. [`api::ApiClient`] implements both over HTTP;
//! [`mock::MockAuthBackend`] implements both in memory with fixed data.

pub mod api;
pub mod mock;
pub mod types;

use async_trait::async_trait;

use types::{AdminOverview, DashboardData, LoginKind, LoginResponse, RegisterRequest, User};

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// The server answered with a non-success status and a `detail` message.
    #[error("{detail}")]
    Api { status: u16, detail: String },
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),
}

impl BackendError {
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            Self::InvalidBaseUrl(_) => None,
        }
    }

    /// The server understood the request and refused it (4xx).
    #[must_use]
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Api { status, .. } if (400..500).contains(status))
    }

    /// The presented session token is not (or no longer) valid.
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Api { status: 401, .. })
    }
}

/// Account operations used by the session controller.
#[async_trait]
pub trait AuthBackend: Send + Sync {
    async fn login(&self, kind: LoginKind, email: &str, password: &str) -> Result<LoginResponse, BackendError>;
    async fn logout(&self, token: &str) -> Result<(), BackendError>;
    async fn register(&self, request: &RegisterRequest) -> Result<(), BackendError>;
    async fn verify_email(&self, email: &str, code: &str) -> Result<(), BackendError>;
    async fn current_user(&self, token: &str) -> Result<User, BackendError>;
}

/// Authenticated data fetches behind the dashboard and admin views.
#[async_trait]
pub trait PortalData: Send + Sync {
    async fn dashboard(&self, token: &str) -> Result<DashboardData, BackendError>;
    async fn admin_overview(&self, token: &str) -> Result<AdminOverview, BackendError>;
}
