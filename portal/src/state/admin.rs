//! Admin overview view state.

#[cfg(test)]
#[path = "admin_test.rs"]
mod admin_test;

use std::time::Duration;

use crate::net::PortalData;
use crate::net::types::AdminOverview;

use super::session::GENERIC_ERROR_MESSAGE;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AdminState {
    pub loading: bool,
    pub overview: Option<AdminOverview>,
    pub error: Option<String>,
}

impl Default for AdminState {
    fn default() -> Self {
        Self { loading: true, overview: None, error: None }
    }
}

impl AdminState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn load_mock(&mut self, delay: Duration) {
        tokio::time::sleep(delay).await;
        self.overview = Some(AdminOverview::mock());
        self.error = None;
        self.loading = false;
    }

    pub async fn load(&mut self, backend: &impl PortalData, token: &str) {
        match backend.admin_overview(token).await {
            Ok(overview) => {
                self.overview = Some(overview);
                self.error = None;
            }
            Err(e) => {
                tracing::warn!(error = %e, "admin stats fetch failed");
                self.overview = None;
                self.error = Some(GENERIC_ERROR_MESSAGE.to_owned());
            }
        }
        self.loading = false;
    }
}
