//! In-memory burst limiting for API keys and login attempts.
//!
//! DESIGN
//! ======
//! Sliding-window counters backed by `HashMap<String, VecDeque<Instant>>`.
//! Two windows are enforced per limiter:
//! - Per-client: requests per client key (API key id, or normalized email
//!   for login attempts)
//! - Global: requests across all clients
//!
//! The monthly quota lives in Postgres; this limiter only smooths bursts and
//! is reset on restart. Clients idle for a full window are swept, so the map
//! stays bounded by the clients active in the last window.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::config::env_parse;

const DEFAULT_PER_KEY_LIMIT: usize = 60;
const DEFAULT_PER_KEY_WINDOW_SECS: u64 = 60;

const DEFAULT_GLOBAL_LIMIT: usize = 600;
const DEFAULT_GLOBAL_WINDOW_SECS: u64 = 60;

const DEFAULT_LOGIN_ATTEMPTS: usize = 5;
const DEFAULT_LOGIN_WINDOW_SECS: u64 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub per_client_limit: usize,
    pub per_client_window: Duration,
    pub global_limit: usize,
    pub global_window: Duration,
}

impl RateLimitConfig {
    /// Limits applied to authenticated API-key traffic.
    #[must_use]
    pub fn api_keys_from_env() -> Self {
        Self {
            per_client_limit: env_parse("RATE_LIMIT_PER_KEY", DEFAULT_PER_KEY_LIMIT),
            per_client_window: Duration::from_secs(env_parse(
                "RATE_LIMIT_PER_KEY_WINDOW_SECS",
                DEFAULT_PER_KEY_WINDOW_SECS,
            )),
            global_limit: env_parse("RATE_LIMIT_GLOBAL", DEFAULT_GLOBAL_LIMIT),
            global_window: Duration::from_secs(env_parse("RATE_LIMIT_GLOBAL_WINDOW_SECS", DEFAULT_GLOBAL_WINDOW_SECS)),
        }
    }

    /// Limits applied to password login attempts. There is no global cap.
    #[must_use]
    pub fn logins_from_env() -> Self {
        let window = Duration::from_secs(env_parse("LOGIN_ATTEMPT_WINDOW_SECS", DEFAULT_LOGIN_WINDOW_SECS));
        Self {
            per_client_limit: env_parse("LOGIN_ATTEMPTS_PER_WINDOW", DEFAULT_LOGIN_ATTEMPTS),
            per_client_window: window,
            global_limit: usize::MAX,
            global_window: window,
        }
    }
}

// =============================================================================
// ERROR TYPE
// =============================================================================

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[allow(clippy::enum_variant_names)]
pub enum RateLimitError {
    #[error("rate limit exceeded (max {limit} requests/{window_secs}s)")]
    PerClientExceeded { limit: usize, window_secs: u64 },
    #[error("service busy (max {limit} requests/{window_secs}s across all clients)")]
    GlobalExceeded { limit: usize, window_secs: u64 },
}

// =============================================================================
// RATE LIMITER
// =============================================================================

#[derive(Clone)]
pub struct RateLimiter {
    inner: Arc<Mutex<RateLimiterInner>>,
    config: RateLimitConfig,
}

#[derive(Default)]
struct RateLimiterInner {
    /// Per-client request timestamps.
    client_requests: HashMap<String, VecDeque<Instant>>,
    /// Global request timestamps.
    global_requests: VecDeque<Instant>,
    /// When idle clients were last dropped from `client_requests`.
    last_sweep: Option<Instant>,
}

impl RateLimiterInner {
    /// Drop clients with no request inside `window`, at most once per window.
    fn sweep_idle_clients(&mut self, now: Instant, window: Duration) {
        if self.last_sweep.is_some_and(|last| now.saturating_duration_since(last) < window) {
            return;
        }
        self.client_requests.retain(|_, deque| {
            prune_window(deque, now, window);
            !deque.is_empty()
        });
        self.last_sweep = Some(now);
    }
}

impl RateLimiter {
    #[must_use]
    pub fn new(config: RateLimitConfig) -> Self {
        Self { inner: Arc::new(Mutex::new(RateLimiterInner::default())), config }
    }

    #[must_use]
    pub fn config(&self) -> RateLimitConfig {
        self.config
    }

    /// Check both per-client and global limits, then record the request.
    pub fn check_and_record(&self, client: &str) -> Result<(), RateLimitError> {
        self.check_and_record_at(client, Instant::now())
    }

    /// Internal: check + record with explicit timestamp (for testing).
    fn check_and_record_at(&self, client: &str, now: Instant) -> Result<(), RateLimitError> {
        let mut inner = self
            .inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let cfg = self.config;

        inner.sweep_idle_clients(now, cfg.per_client_window);
        prune_window(&mut inner.global_requests, now, cfg.global_window);
        if inner.global_requests.len() >= cfg.global_limit {
            return Err(RateLimitError::GlobalExceeded {
                limit: cfg.global_limit,
                window_secs: cfg.global_window.as_secs(),
            });
        }

        let client_deque = inner.client_requests.entry(client.to_owned()).or_default();
        prune_window(client_deque, now, cfg.per_client_window);
        if client_deque.len() >= cfg.per_client_limit {
            return Err(RateLimitError::PerClientExceeded {
                limit: cfg.per_client_limit,
                window_secs: cfg.per_client_window.as_secs(),
            });
        }

        client_deque.push_back(now);
        inner.global_requests.push_back(now);

        Ok(())
    }

    /// Forget a client's history, e.g. after a successful login.
    pub fn clear(&self, client: &str) {
        let mut inner = self
            .inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        inner.client_requests.remove(client);
    }
}

// =============================================================================
// HELPERS
// =============================================================================

fn prune_window(deque: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(&front) = deque.front() {
        if now.duration_since(front) > window {
            deque.pop_front();
        } else {
            break;
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[path = "rate_limit_test.rs"]
mod tests;
