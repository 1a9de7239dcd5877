use super::*;

// =============================================================
// normalize_base_url
// =============================================================

#[test]
fn base_url_trailing_slash_trimmed() {
    assert_eq!(normalize_base_url("http://127.0.0.1:5000/").unwrap(), "http://127.0.0.1:5000");
    assert_eq!(normalize_base_url("  https://api.example.com  ").unwrap(), "https://api.example.com");
}

#[test]
fn base_url_requires_scheme_and_host() {
    assert!(matches!(normalize_base_url("127.0.0.1:5000"), Err(BackendError::InvalidBaseUrl(_))));
    assert!(matches!(normalize_base_url("http://"), Err(BackendError::InvalidBaseUrl(_))));
    assert!(matches!(normalize_base_url("ftp://host"), Err(BackendError::InvalidBaseUrl(_))));
}

#[test]
fn client_joins_paths() {
    let client = ApiClient::new("http://localhost:5000/").unwrap();
    assert_eq!(client.url("/movies"), "http://localhost:5000/movies");
    assert_eq!(client.base_url(), "http://localhost:5000");
}

#[test]
fn blank_api_key_is_dropped() {
    let client = ApiClient::new("http://localhost:5000").unwrap().with_api_key(Some("  ".into()));
    assert!(client.api_key.is_none());
    let client = client.with_api_key(Some("mapi_x".into()));
    assert_eq!(client.api_key.as_deref(), Some("mapi_x"));
}

// =============================================================
// error_from_body
// =============================================================

#[test]
fn error_uses_detail_field() {
    let err = error_from_body(StatusCode::UNAUTHORIZED, br#"{"detail":"Invalid email or password"}"#);
    assert_eq!(err.to_string(), "Invalid email or password");
    assert_eq!(err.status(), Some(401));
    assert!(err.is_rejection());
    assert!(err.is_unauthorized());
}

#[test]
fn error_without_detail_uses_reason() {
    let err = error_from_body(StatusCode::BAD_GATEWAY, b"<html>upstream</html>");
    assert_eq!(err.to_string(), "Bad Gateway");
    assert!(!err.is_rejection());
}

#[test]
fn forbidden_is_rejection_not_unauthorized() {
    let err = error_from_body(StatusCode::FORBIDDEN, br#"{"detail":"Admin access required"}"#);
    assert!(err.is_rejection());
    assert!(!err.is_unauthorized());
}

#[tokio::test]
async fn unreachable_server_is_transport_error() {
    // Port 1 on loopback refuses connections.
    let client = ApiClient::new("http://127.0.0.1:1").unwrap();
    let err = client.current_user("token").await.unwrap_err();
    assert!(matches!(err, BackendError::Http(_)));
    assert!(!err.is_rejection());
}
