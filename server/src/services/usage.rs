//! Usage analytics over `usage_logs`: per-key breakdowns and admin totals.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use super::api_key::ApiKeyRow;

pub const STATS_PERIOD_DAYS: i32 = 30;
const TOP_ENDPOINTS: i64 = 5;

#[derive(Debug, Clone, Serialize)]
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

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EndpointCount {
    pub endpoint: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdminStats {
    pub total_users: i64,
    pub total_api_keys: i64,
    pub active_api_keys: i64,
    pub suspended_api_keys: i64,
    pub total_movies: i64,
    pub total_requests: i64,
    pub total_requests_today: i64,
    pub top_endpoints: Vec<EndpointCount>,
}

/// Request counts per endpoint for one key over the last `days` days.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn endpoint_breakdown(pool: &PgPool, api_key_id: Uuid, days: i32) -> Result<BTreeMap<String, i64>, sqlx::Error> {
    let rows = sqlx::query(
        r"SELECT endpoint, COUNT(*) AS count
          FROM usage_logs
          WHERE api_key_id = $1 AND timestamp >= now() - make_interval(days => $2)
          GROUP BY endpoint",
    )
    .bind(api_key_id)
    .bind(days)
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(|r| (r.get("endpoint"), r.get("count"))).collect())
}

/// Stats for the key presented on `/api-key/stats`.
///
/// # Errors
///
/// Returns a database error if the breakdown query fails.
pub async fn stats_for_key(pool: &PgPool, key: &ApiKeyRow) -> Result<UsageStats, sqlx::Error> {
    let endpoint_breakdown = endpoint_breakdown(pool, key.id, STATS_PERIOD_DAYS).await?;
    Ok(UsageStats {
        api_key: key.key.clone(),
        owner_name: key.owner_name.clone(),
        plan: key.plan.clone(),
        usage_count: key.usage_count,
        monthly_limit: key.monthly_limit,
        usage_percentage: key.usage_percentage(),
        endpoint_breakdown,
        period_days: STATS_PERIOD_DAYS,
    })
}

/// Lifetime request totals for every key an owner holds.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn request_totals_for_owner(pool: &PgPool, owner_id: Uuid) -> Result<HashMap<Uuid, i64>, sqlx::Error> {
    let rows = sqlx::query(
        r"SELECT k.id, COUNT(l.id) AS total
          FROM api_keys k
          LEFT JOIN usage_logs l ON l.api_key_id = k.id
          WHERE k.owner_id = $1
          GROUP BY k.id",
    )
    .bind(owner_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(|r| (r.get("id"), r.get("total"))).collect())
}

/// Portal-wide totals for the admin overview.
///
/// # Errors
///
/// Returns a database error if any query fails.
pub async fn admin_stats(pool: &PgPool) -> Result<AdminStats, sqlx::Error> {
    let totals = sqlx::query(
        r"SELECT
              (SELECT COUNT(*) FROM users WHERE NOT is_admin) AS total_users,
              (SELECT COUNT(*) FROM api_keys) AS total_api_keys,
              (SELECT COUNT(*) FROM api_keys WHERE is_active) AS active_api_keys,
              (SELECT COUNT(*) FROM movies) AS total_movies,
              (SELECT COUNT(*) FROM usage_logs) AS total_requests,
              (SELECT COUNT(*) FROM usage_logs WHERE timestamp >= date_trunc('day', now())) AS total_requests_today",
    )
    .fetch_one(pool)
    .await?;

    let top = sqlx::query(
        r"SELECT endpoint, COUNT(*) AS count
          FROM usage_logs
          GROUP BY endpoint
          ORDER BY count DESC, endpoint
          LIMIT $1",
    )
    .bind(TOP_ENDPOINTS)
    .fetch_all(pool)
    .await?;

    let total_api_keys: i64 = totals.get("total_api_keys");
    let active_api_keys: i64 = totals.get("active_api_keys");

    Ok(AdminStats {
        total_users: totals.get("total_users"),
        total_api_keys,
        active_api_keys,
        suspended_api_keys: total_api_keys - active_api_keys,
        total_movies: totals.get("total_movies"),
        total_requests: totals.get("total_requests"),
        total_requests_today: totals.get("total_requests_today"),
        top_endpoints: top
            .iter()
            .map(|r| EndpointCount { endpoint: r.get("endpoint"), count: r.get("count") })
            .collect(),
    })
}
