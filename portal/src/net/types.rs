//! Wire types shared by the HTTP client and the mock backend.
//!
//! Field names match the server's JSON. Optional extras carry
//! `#[serde(default)]` so mock records and older responses still decode.

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Key shown on the mock dashboard.
pub const MOCK_API_KEY: &str = "mapi_dev_1234567890abcdef1234567890abcdef";

/// Authenticated user as returned by `/api/auth/me`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub is_admin: bool,
}

/// Which login endpoint a credential pair is sent to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoginKind {
    Developer,
    Admin,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

/// One API key with its usage counters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ApiKeyRecord {
    pub key: String,
    pub plan: String,
    pub usage_count: i64,
    pub monthly_limit: i64,
    pub usage_percentage: f64,
    #[serde(default)]
    pub id: Option<Uuid>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub last_used: Option<String>,
    #[serde(default)]
    pub total_requests: Option<i64>,
}

fn default_active() -> bool {
    true
}

/// `usage_count / monthly_limit * 100`, rounded to two decimals; 0 when the
/// limit is 0.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn usage_percentage(usage_count: i64, monthly_limit: i64) -> f64 {
    if monthly_limit <= 0 {
        return 0.0;
    }
    let pct = usage_count.max(0) as f64 / monthly_limit as f64 * 100.0;
    (pct * 100.0).round() / 100.0
}

impl ApiKeyRecord {
    #[must_use]
    pub fn new(key: impl Into<String>, plan: impl Into<String>, usage_count: i64, monthly_limit: i64) -> Self {
        Self {
            key: key.into(),
            plan: plan.into(),
            usage_count,
            monthly_limit,
            usage_percentage: usage_percentage(usage_count, monthly_limit),
            id: None,
            is_active: true,
            created_at: None,
            last_used: None,
            total_requests: None,
        }
    }

    /// Placeholder record: free plan, 247 of 1000 requests used.
    #[must_use]
    pub fn mock() -> Self {
        Self::new(MOCK_API_KEY, "free", 247, 1000)
    }

    /// Every counter present and non-negative, percentage consistent with
    /// the counters.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        !self.key.is_empty()
            && !self.plan.is_empty()
            && self.usage_count >= 0
            && self.monthly_limit >= 0
            && self.usage_percentage >= 0.0
            && (self.usage_percentage - usage_percentage(self.usage_count, self.monthly_limit)).abs() < 0.01
    }

    #[must_use]
    pub fn remaining(&self) -> i64 {
        (self.monthly_limit - self.usage_count).max(0)
    }
}

/// Response of `GET /api/dev/dashboard`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DashboardData {
    pub user: User,
    pub api_key: Option<ApiKeyRecord>,
    #[serde(default)]
    pub api_keys: Vec<ApiKeyRecord>,
}

/// Headline numbers for the admin view. Decodes from `GET /admin/stats`,
/// ignoring the extra fields the server sends.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminOverview {
    pub total_users: i64,
    pub total_api_keys: i64,
    pub total_requests: i64,
    pub total_movies: i64,
}

impl AdminOverview {
    #[must_use]
    pub fn mock() -> Self {
        Self { total_users: 156, total_api_keys: 134, total_requests: 45_678, total_movies: 10_547 }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movie {
    pub id: i64,
    pub title: String,
    pub year: i32,
    pub genre: Vec<String>,
    pub director: String,
    pub actors: Vec<String>,
    pub plot: String,
    pub poster_url: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoviePage {
    pub movies: Vec<Movie>,
    pub page: i64,
    pub per_page: i64,
    pub total_movies: i64,
    pub total_pages: i64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResults {
    pub movies: Vec<Movie>,
    pub query: SearchQuery,
    pub total_results: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UsageStats {
    pub api_key: String,
    pub owner_name: String,
    pub plan: String,
    pub usage_count: i64,
    pub monthly_limit: i64,
    pub usage_percentage: f64,
    pub endpoint_breakdown: BTreeMap<String, i64>,
    pub period_days: i32,
}
