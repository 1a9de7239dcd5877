//! Router-level tests. All requests here are rejected or answered before any
//! database I/O, so the lazily-connected test pool is never used.

use std::time::Duration;

use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use super::*;
use crate::rate_limit::RateLimitConfig;
use crate::state::test_helpers;

async fn send(app: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() { serde_json::Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    (status, json)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: &serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

// =============================================================================
// PUBLIC
// =============================================================================

#[tokio::test]
async fn healthz_ok() {
    let app = app(test_helpers::test_app_state());
    let response = app.oneshot(get("/healthz")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn root_describes_service() {
    let (status, body) = send(app(test_helpers::test_app_state()), get("/")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["authentication"]["header"], "X-API-KEY");
}

// =============================================================================
// REJECTIONS BEFORE DATABASE ACCESS
// =============================================================================

#[tokio::test]
async fn movie_routes_require_api_key() {
    for uri in ["/movies", "/movies/1", "/search?title=matrix", "/api-key/stats"] {
        let (status, body) = send(app(test_helpers::test_app_state()), get(uri)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
        assert_eq!(body["detail"], "API key required. Please provide X-API-KEY header.");
    }
}

#[tokio::test]
async fn session_routes_require_session() {
    for uri in ["/api/auth/me", "/api/dev/dashboard", "/admin/stats", "/admin/api-keys", "/admin/movies"] {
        let (status, body) = send(app(test_helpers::test_app_state()), get(uri)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
        assert_eq!(body["detail"], "Not authenticated");
    }
}

#[tokio::test]
async fn register_rejects_mismatched_passwords() {
    let body = serde_json::json!({
        "name": "Neo",
        "email": "neo@gmail.com",
        "password": "password123",
        "confirm_password": "password321",
    });
    let (status, body) = send(app(test_helpers::test_app_state()), post_json("/api/auth/register", &body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Passwords do not match");
}

#[tokio::test]
async fn register_rejects_disposable_email() {
    let body = serde_json::json!({
        "name": "Neo",
        "email": "neo@mailinator.com",
        "password": "password123",
        "confirm_password": "password123",
    });
    let (status, body) = send(app(test_helpers::test_app_state()), post_json("/api/auth/register", &body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Disposable email addresses are not allowed");
}

#[tokio::test]
async fn login_is_throttled_before_credentials_are_checked() {
    let base = test_helpers::test_app_state();
    let window = Duration::from_secs(60);
    let no_logins = RateLimitConfig { per_client_limit: 0, per_client_window: window, global_limit: 10, global_window: window };
    let state = AppState::with_limiters(base.pool.clone(), test_helpers::test_config(), base.key_limiter.config(), no_logins);

    let body = serde_json::json!({ "email": "neo@gmail.com", "password": "password123" });
    let (status, body) = send(app(state), post_json("/api/auth/login", &body)).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["detail"], "Too many login attempts. Please try again later.");
}

// =============================================================================
// ERROR MAPPING
// =============================================================================

#[test]
fn api_key_errors_map_to_status() {
    assert_eq!(ApiError::from(ApiKeyError::Invalid).status, StatusCode::UNAUTHORIZED);
    assert_eq!(ApiError::from(ApiKeyError::Suspended).status, StatusCode::FORBIDDEN);
    assert_eq!(ApiError::from(ApiKeyError::QuotaExceeded { limit: 1000 }).status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(ApiError::from(ApiKeyError::KeyLimitReached { max: 3 }).status, StatusCode::CONFLICT);
    assert_eq!(ApiError::from(ApiKeyError::NotFound).status, StatusCode::NOT_FOUND);
}

#[test]
fn account_errors_map_to_status() {
    assert_eq!(ApiError::from(AccountError::EmailTaken).status, StatusCode::CONFLICT);
    assert_eq!(ApiError::from(AccountError::InvalidCredentials).status, StatusCode::UNAUTHORIZED);
    assert_eq!(ApiError::from(AccountError::NotVerified).status, StatusCode::FORBIDDEN);
    assert_eq!(ApiError::from(AccountError::VerificationFailed).status, StatusCode::BAD_REQUEST);
    let nested = ApiError::from(AccountError::ApiKey(ApiKeyError::KeyLimitReached { max: 3 }));
    assert_eq!(nested.status, StatusCode::CONFLICT);
}

#[test]
fn movie_errors_map_to_status() {
    assert_eq!(ApiError::from(MovieError::NotFound(9)).status, StatusCode::NOT_FOUND);
    assert_eq!(ApiError::from(MovieError::PageNotFound { page: 4, total_pages: 3 }).status, StatusCode::NOT_FOUND);
    assert_eq!(ApiError::from(MovieError::NoSearchFilter).status, StatusCode::BAD_REQUEST);
    assert_eq!(ApiError::from(MovieError::MissingColumns).status, StatusCode::BAD_REQUEST);
}

#[test]
fn internal_errors_hide_detail() {
    let err = ApiError::from(AccountError::PasswordHash("salt exploded".into()));
    assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(err.detail, "Internal server error");
}

#[tokio::test]
async fn error_body_uses_detail_field() {
    let response = ApiError::new(StatusCode::NOT_FOUND, "Movie with ID 9 not found").into_response();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body, serde_json::json!({ "detail": "Movie with ID 9 not found" }));
}
