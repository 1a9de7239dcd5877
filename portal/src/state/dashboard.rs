//! Developer dashboard view state.
//!
//! Starts in `loading`. Either loader clears it exactly once; a failed real
//! fetch leaves `record` empty and sets the generic error.

#[cfg(test)]
#[path = "dashboard_test.rs"]
mod dashboard_test;

use std::time::Duration;

use crate::net::PortalData;
use crate::net::types::ApiKeyRecord;

use super::session::GENERIC_ERROR_MESSAGE;

/// Simulated latency of the mock fetch.
pub const MOCK_DELAY: Duration = Duration::from_millis(1000);

#[derive(Clone, Debug, PartialEq)]
pub struct DashboardState {
    pub loading: bool,
    pub record: Option<ApiKeyRecord>,
    pub error: Option<String>,
    pub copied: bool,
}

impl Default for DashboardState {
    fn default() -> Self {
        Self { loading: true, record: None, error: None, copied: false }
    }
}

impl DashboardState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait `delay`, then populate the fixed mock record.
    pub async fn load_mock(&mut self, delay: Duration) {
        tokio::time::sleep(delay).await;
        self.record = Some(ApiKeyRecord::mock());
        self.error = None;
        self.loading = false;
    }

    /// Fetch the caller's first API key from the server.
    pub async fn load(&mut self, backend: &impl PortalData, token: &str) {
        match backend.dashboard(token).await {
            Ok(data) => {
                self.record = data.api_key.or_else(|| data.api_keys.into_iter().next());
                self.error = None;
            }
            Err(e) => {
                tracing::warn!(error = %e, "dashboard fetch failed");
                self.record = None;
                self.error = Some(GENERIC_ERROR_MESSAGE.to_owned());
            }
        }
        self.loading = false;
    }

    /// Sample request for the loaded key, or `None` while nothing is loaded.
    #[must_use]
    pub fn quick_start(&self, base_url: &str) -> Option<String> {
        self.record.as_ref().map(|r| quick_start(base_url, &r.key))
    }

    pub fn mark_copied(&mut self) {
        self.copied = true;
    }

    pub fn reset_copied(&mut self) {
        self.copied = false;
    }
}

/// `curl` one-liner listing movies with `key`.
#[must_use]
pub fn quick_start(base_url: &str, key: &str) -> String {
    let base = base_url.trim_end_matches('/');
    format!("curl -X GET \"{base}/movies\" -H \"X-API-KEY: {key}\"")
}
