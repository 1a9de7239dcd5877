//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! This module binds the public movie API (authorized per request by
//! `X-API-KEY`), the developer account API (session cookie or bearer token),
//! and the admin API (admin session) under a single Axum router. Every error
//! leaves the server as `{"detail": "<message>"}`.

pub mod admin;
pub mod api_key;
pub mod auth;
pub mod dev;
pub mod movies;

use axum::Router;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::rate_limit::RateLimitError;
use crate::services::account::AccountError;
use crate::services::api_key::ApiKeyError;
use crate::services::email::EmailError;
use crate::services::movie::MovieError;
use crate::state::AppState;

/// Build the complete application router.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/healthz", get(healthz))
        .route("/movies", get(movies::list_movies))
        .route("/movies/{id}", get(movies::get_movie))
        .route("/search", get(movies::search_movies))
        .route("/api-key/stats", get(api_key::key_stats))
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/verify", post(auth::verify))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/me", get(auth::me))
        .route("/api/dev/dashboard", get(dev::dashboard))
        .route("/api/dev/api-keys", post(dev::generate_key))
        .route("/admin/login", post(auth::admin_login))
        .route("/admin/stats", get(admin::stats))
        .route("/admin/api-keys", get(admin::list_keys).post(admin::create_key))
        .route("/admin/api-keys/{id}/toggle", post(admin::toggle_key))
        .route("/admin/api-keys/{id}/reset", post(admin::reset_key))
        .route("/admin/reset-usage", post(admin::reset_usage))
        .route("/admin/movies", get(admin::list_movies))
        .route("/admin/movies/upload", post(admin::upload_movies))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

/// `GET /`: service info; no key required.
async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "message": "Welcome to the Movie API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "movies": "/movies - List movies with pagination (requires API key)",
            "search": "/search - Search movies by title, year, genre (requires API key)",
            "movie_detail": "/movies/{id} - Get movie details by ID (requires API key)",
            "usage_stats": "/api-key/stats - Usage statistics for your API key",
            "developer": "/api/auth/* and /api/dev/* - Developer account and keys",
            "admin": "/admin/* - Admin endpoints (admin session required)"
        },
        "authentication": {
            "header": "X-API-KEY",
            "description": "All movie endpoints require a valid API key"
        }
    }))
}

// =============================================================================
// ERROR RESPONSE
// =============================================================================

/// HTTP error rendered as `{"detail": ...}`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub detail: String,
}

impl ApiError {
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self { status, detail: detail.into() }
    }

    /// Log the underlying error and hide it behind a generic 500.
    pub fn internal(err: &dyn std::fmt::Display) -> Self {
        tracing::error!(error = %err, "request failed");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(serde_json::json!({ "detail": self.detail }))).into_response()
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        Self::internal(&err)
    }
}

impl From<RateLimitError> for ApiError {
    fn from(err: RateLimitError) -> Self {
        Self::new(StatusCode::TOO_MANY_REQUESTS, err.to_string())
    }
}

impl From<ApiKeyError> for ApiError {
    fn from(err: ApiKeyError) -> Self {
        let status = match &err {
            ApiKeyError::Missing | ApiKeyError::Invalid => StatusCode::UNAUTHORIZED,
            ApiKeyError::Suspended => StatusCode::FORBIDDEN,
            ApiKeyError::QuotaExceeded { .. } | ApiKeyError::Throttled(_) => StatusCode::TOO_MANY_REQUESTS,
            ApiKeyError::KeyLimitReached { .. } => StatusCode::CONFLICT,
            ApiKeyError::InvalidPlan(_) | ApiKeyError::InvalidLimit => StatusCode::BAD_REQUEST,
            ApiKeyError::NotFound => StatusCode::NOT_FOUND,
            ApiKeyError::Database(e) => return Self::internal(e),
        };
        Self::new(status, err.to_string())
    }
}

impl From<AccountError> for ApiError {
    fn from(err: AccountError) -> Self {
        let status = match err {
            AccountError::ApiKey(inner) => return inner.into(),
            AccountError::Database(ref e) => return Self::internal(e),
            AccountError::PasswordHash(ref msg) => return Self::internal(msg),
            AccountError::MissingName
            | AccountError::InvalidEmail
            | AccountError::PasswordMismatch
            | AccountError::PasswordTooShort
            | AccountError::UnsupportedEmailDomain
            | AccountError::DisposableEmail
            | AccountError::VerificationFailed => StatusCode::BAD_REQUEST,
            AccountError::EmailTaken => StatusCode::CONFLICT,
            AccountError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AccountError::NotVerified => StatusCode::FORBIDDEN,
        };
        Self::new(status, err.to_string())
    }
}

impl From<MovieError> for ApiError {
    fn from(err: MovieError) -> Self {
        let status = match &err {
            MovieError::NotFound(_) | MovieError::PageNotFound { .. } => StatusCode::NOT_FOUND,
            MovieError::InvalidPage
            | MovieError::InvalidPerPage
            | MovieError::NoSearchFilter
            | MovieError::MissingColumns
            | MovieError::Csv(_) => StatusCode::BAD_REQUEST,
            MovieError::Database(e) => return Self::internal(e),
        };
        Self::new(status, err.to_string())
    }
}

impl From<EmailError> for ApiError {
    fn from(err: EmailError) -> Self {
        tracing::error!(error = %err, "verification email delivery failed");
        Self::new(StatusCode::BAD_GATEWAY, "Could not send verification email. Please try again.")
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
