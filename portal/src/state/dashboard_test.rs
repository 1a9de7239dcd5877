use super::*;
use crate::net::AuthBackend;
use crate::net::api::ApiClient;
use crate::net::mock::{MOCK_DEVELOPER_EMAIL, MOCK_DEVELOPER_PASSWORD, MockAuthBackend};
use crate::net::types::{LoginKind, MOCK_API_KEY};

#[test]
fn starts_loading() {
    let state = DashboardState::new();
    assert!(state.loading);
    assert!(state.record.is_none());
    assert!(!state.copied);
}

#[tokio::test(start_paused = true)]
async fn mock_load_waits_then_populates() {
    let mut state = DashboardState::new();
    let start = tokio::time::Instant::now();
    state.load_mock(MOCK_DELAY).await;

    assert!(start.elapsed() >= MOCK_DELAY);
    assert!(!state.loading);
    let record = state.record.as_ref().unwrap();
    assert!(record.is_well_formed());
    assert_eq!(record.key, MOCK_API_KEY);
    assert_eq!(record.plan, "free");
    assert_eq!((record.usage_count, record.monthly_limit), (247, 1000));
    assert!((record.usage_percentage - 24.7).abs() < f64::EPSILON);
}

#[tokio::test]
async fn load_uses_first_key() {
    let backend = MockAuthBackend::new();
    let login = backend.login(LoginKind::Developer, MOCK_DEVELOPER_EMAIL, MOCK_DEVELOPER_PASSWORD).await.unwrap();

    let mut state = DashboardState::new();
    state.load(&backend, &login.token).await;
    assert!(!state.loading);
    assert_eq!(state.record, Some(ApiKeyRecord::mock()));
    assert_eq!(state.error, None);
}

#[tokio::test]
async fn load_failure_sets_generic_error() {
    let mut state = DashboardState::new();
    state.load(&MockAuthBackend::new(), "not-a-session").await;
    assert!(!state.loading);
    assert!(state.record.is_none());
    assert_eq!(state.error.as_deref(), Some(GENERIC_ERROR_MESSAGE));
}

#[tokio::test]
async fn load_unreachable_server_sets_generic_error() {
    let client = ApiClient::new("http://127.0.0.1:1").unwrap();
    let mut state = DashboardState::new();
    state.load(&client, "tok").await;
    assert!(!state.loading);
    assert_eq!(state.error.as_deref(), Some(GENERIC_ERROR_MESSAGE));
}

#[test]
fn quick_start_command() {
    assert_eq!(
        quick_start("http://localhost:5000/", "mapi_abc"),
        r#"curl -X GET "http://localhost:5000/movies" -H "X-API-KEY: mapi_abc""#
    );
}

#[tokio::test(start_paused = true)]
async fn quick_start_needs_record() {
    let mut state = DashboardState::new();
    assert_eq!(state.quick_start("http://localhost:5000"), None);
    state.load_mock(Duration::ZERO).await;
    assert!(state.quick_start("http://localhost:5000").unwrap().contains(MOCK_API_KEY));
}

#[test]
fn copy_toggle() {
    let mut state = DashboardState::new();
    state.mark_copied();
    assert!(state.copied);
    state.reset_copied();
    assert!(!state.copied);
}
