use super::*;

const PER_CLIENT_LIMIT: usize = 3;
const PER_CLIENT_WINDOW: Duration = Duration::from_secs(60);
const GLOBAL_LIMIT: usize = 5;

fn limiter() -> RateLimiter {
    RateLimiter::new(RateLimitConfig {
        per_client_limit: PER_CLIENT_LIMIT,
        per_client_window: PER_CLIENT_WINDOW,
        global_limit: GLOBAL_LIMIT,
        global_window: Duration::from_secs(60),
    })
}

#[test]
fn per_client_allows_up_to_limit() {
    let rl = limiter();
    let now = Instant::now();

    for i in 0..PER_CLIENT_LIMIT {
        assert!(rl.check_and_record_at("key-a", now).is_ok(), "request {i} should succeed");
    }
    assert_eq!(
        rl.check_and_record_at("key-a", now),
        Err(RateLimitError::PerClientExceeded { limit: PER_CLIENT_LIMIT, window_secs: 60 })
    );
}

#[test]
fn global_allows_up_to_limit() {
    let rl = limiter();
    let now = Instant::now();

    for i in 0..GLOBAL_LIMIT {
        let client = format!("client-{i}");
        assert!(rl.check_and_record_at(&client, now).is_ok(), "request {i} should succeed");
    }
    assert!(matches!(
        rl.check_and_record_at("one-more", now),
        Err(RateLimitError::GlobalExceeded { .. })
    ));
}

#[test]
fn window_expiry_allows_new_requests() {
    let rl = limiter();
    let start = Instant::now();

    for _ in 0..PER_CLIENT_LIMIT {
        rl.check_and_record_at("key-a", start).unwrap();
    }
    assert!(rl.check_and_record_at("key-a", start).is_err());

    let after_window = start + PER_CLIENT_WINDOW + Duration::from_millis(1);
    assert!(rl.check_and_record_at("key-a", after_window).is_ok());
}

#[test]
fn distinct_clients_do_not_interfere() {
    let rl = limiter();
    let now = Instant::now();

    for _ in 0..PER_CLIENT_LIMIT {
        rl.check_and_record_at("key-a", now).unwrap();
    }
    assert!(rl.check_and_record_at("key-a", now).is_err());
    assert!(rl.check_and_record_at("key-b", now).is_ok());
}

#[test]
fn clear_forgets_client_history() {
    let rl = limiter();
    let now = Instant::now();

    for _ in 0..PER_CLIENT_LIMIT {
        rl.check_and_record_at("user@gmail.com", now).unwrap();
    }
    assert!(rl.check_and_record_at("user@gmail.com", now).is_err());

    rl.clear("user@gmail.com");
    assert!(rl.check_and_record_at("user@gmail.com", now).is_ok());
}

#[test]
fn login_config_has_no_global_cap() {
    let cfg = RateLimitConfig::logins_from_env();
    assert_eq!(cfg.global_limit, usize::MAX);
    assert!(cfg.per_client_limit > 0);
}

#[test]
fn idle_clients_are_evicted() {
    let rl = RateLimiter::new(RateLimitConfig {
        per_client_limit: PER_CLIENT_LIMIT,
        per_client_window: PER_CLIENT_WINDOW,
        global_limit: usize::MAX,
        global_window: PER_CLIENT_WINDOW,
    });
    let start = Instant::now();
    for i in 0..1_000 {
        rl.check_and_record_at(&format!("user{i}@gmail.com"), start).unwrap();
    }

    let later = start + Duration::from_secs(3600);
    rl.check_and_record_at("late@gmail.com", later).unwrap();

    let inner = rl.inner.lock().unwrap();
    assert_eq!(inner.client_requests.len(), 1);
    assert!(inner.client_requests.contains_key("late@gmail.com"));
}

#[test]
fn sweep_keeps_clients_inside_window() {
    let rl = limiter();
    let start = Instant::now();
    rl.check_and_record_at("old", start).unwrap();

    let mid = start + PER_CLIENT_WINDOW / 2;
    rl.check_and_record_at("recent", mid).unwrap();

    let after_old_expires = start + PER_CLIENT_WINDOW + Duration::from_secs(1);
    rl.check_and_record_at("new", after_old_expires).unwrap();

    let inner = rl.inner.lock().unwrap();
    assert!(!inner.client_requests.contains_key("old"));
    assert!(inner.client_requests.contains_key("recent"));
    assert!(inner.client_requests.contains_key("new"));
}
