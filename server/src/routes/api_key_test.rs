use super::*;
use axum::extract::FromRequestParts;
use axum::http::{Request, StatusCode};

use crate::state::test_helpers;

fn parts(builder: axum::http::request::Builder) -> Parts {
    builder.body(()).unwrap().into_parts().0
}

#[test]
fn request_meta_records_path_and_method() {
    let p = parts(Request::builder().method("GET").uri("/movies?page=2").header("user-agent", "curl/8.5"));
    let meta = request_meta(&p);
    assert_eq!(meta.endpoint, "/movies");
    assert_eq!(meta.method, "GET");
    assert_eq!(meta.user_agent.as_deref(), Some("curl/8.5"));
    assert_eq!(meta.ip_address, None);
}

#[test]
fn forwarded_for_uses_first_hop() {
    let p = parts(Request::builder().uri("/search").header("x-forwarded-for", "203.0.113.7, 10.0.0.1"));
    assert_eq!(client_ip(&p).as_deref(), Some("203.0.113.7"));
}

#[test]
fn connect_info_is_fallback() {
    let mut p = parts(Request::builder().uri("/movies"));
    p.extensions.insert(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 4242))));
    assert_eq!(client_ip(&p).as_deref(), Some("127.0.0.1"));
}

#[tokio::test]
async fn missing_key_is_rejected_without_database() {
    let state = test_helpers::test_app_state();
    let mut p = parts(Request::builder().uri("/movies"));
    let Err(err) = ApiKeyAuth::from_request_parts(&mut p, &state).await else {
        panic!("expected rejection");
    };
    assert_eq!(err.status, StatusCode::UNAUTHORIZED);
    assert_eq!(err.detail, "API key required. Please provide X-API-KEY header.");
}

#[tokio::test]
async fn blank_key_counts_as_missing() {
    let state = test_helpers::test_app_state();
    let mut p = parts(Request::builder().uri("/movies").header("x-api-key", "   "));
    let Err(err) = ApiKeyAuth::from_request_parts(&mut p, &state).await else {
        panic!("expected rejection");
    };
    assert_eq!(err.detail, "API key required. Please provide X-API-KEY header.");
}

#[tokio::test]
async fn malformed_key_is_invalid_without_database() {
    let state = test_helpers::test_app_state();
    let mut p = parts(Request::builder().uri("/movies").header("x-api-key", "not-a-key"));
    let Err(err) = ApiKeyAuth::from_request_parts(&mut p, &state).await else {
        panic!("expected rejection");
    };
    assert_eq!(err.status, StatusCode::UNAUTHORIZED);
    assert_eq!(err.detail, "Invalid API key.");
}

#[test]
fn key_view_derives_percentage_and_formats_times() {
    let row = ApiKeyRow {
        id: uuid::Uuid::nil(),
        owner_id: uuid::Uuid::nil(),
        owner_name: "Dev".into(),
        key: "mapi_dev_1234567890abcdef1234567890abcdef".into(),
        plan: "free".into(),
        usage_count: 247,
        monthly_limit: 1000,
        is_active: true,
        created_at: time::macros::datetime!(2026-01-02 03:04:05 UTC),
        last_reset: time::macros::datetime!(2026-01-01 00:00 UTC),
        last_used: None,
    };
    let view = ApiKeyView::from(&row);
    assert!((view.usage_percentage - 24.7).abs() < f64::EPSILON);
    assert_eq!(view.created_at, "2026-01-02T03:04:05Z");
    assert_eq!(view.last_used, None);

    let json = serde_json::to_value(&view).unwrap();
    assert!(json.get("total_requests").is_none());
}
