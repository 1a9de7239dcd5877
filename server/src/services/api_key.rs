//! API key service: issuance, lookup, quota accounting, admin controls.
//!
//! DESIGN
//! ======
//! Every request to the movie API runs [`authorize_request`], which locks the
//! key row (`SELECT ... FOR UPDATE`), applies the calendar-month reset, checks
//! the monthly quota, writes a usage log row, and increments the counter in a
//! single transaction. Concurrent requests on one key therefore serialize on
//! the row lock and cannot overshoot `monthly_limit`.
//!
//! The in-memory burst limiter runs after the quota check so a rejected
//! request never consumes burst budget it was not going to use.

use rand::Rng;
use rand::distr::Alphanumeric;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::rate_limit::{RateLimitError, RateLimiter};

pub const KEY_PREFIX: &str = "mapi_";
const KEY_BODY_LEN: usize = 32;
pub const DEFAULT_MONTHLY_LIMIT: i64 = 1000;
pub const MAX_KEYS_PER_USER: i64 = 3;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ApiKeyError {
    #[error("API key required. Please provide X-API-KEY header.")]
    Missing,
    #[error("Invalid API key.")]
    Invalid,
    #[error("API key is suspended.")]
    Suspended,
    #[error("Monthly usage limit ({limit}) exceeded. Please upgrade your plan.")]
    QuotaExceeded { limit: i64 },
    #[error("{0}")]
    Throttled(#[from] RateLimitError),
    #[error("Maximum {max} API keys allowed")]
    KeyLimitReached { max: i64 },
    #[error("unknown plan: {0}")]
    InvalidPlan(String),
    #[error("monthly limit must not be negative")]
    InvalidLimit,
    #[error("API key not found")]
    NotFound,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Subscription plan attached to a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    Free,
    Basic,
    Pro,
    Enterprise,
}

impl Plan {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Basic => "basic",
            Self::Pro => "pro",
            Self::Enterprise => "enterprise",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "free" => Some(Self::Free),
            "basic" => Some(Self::Basic),
            "pro" => Some(Self::Pro),
            "enterprise" => Some(Self::Enterprise),
            _ => None,
        }
    }
}

/// Row returned from key queries, joined with the owner's name.
#[derive(Debug, Clone)]
pub struct ApiKeyRow {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub owner_name: String,
    pub key: String,
    pub plan: String,
    pub usage_count: i64,
    pub monthly_limit: i64,
    pub is_active: bool,
    pub created_at: OffsetDateTime,
    pub last_reset: OffsetDateTime,
    pub last_used: Option<OffsetDateTime>,
}

impl ApiKeyRow {
    fn from_row(r: &PgRow) -> Self {
        Self {
            id: r.get("id"),
            owner_id: r.get("owner_id"),
            owner_name: r.get("owner_name"),
            key: r.get("key"),
            plan: r.get("plan"),
            usage_count: r.get("usage_count"),
            monthly_limit: r.get("monthly_limit"),
            is_active: r.get("is_active"),
            created_at: r.get("created_at"),
            last_reset: r.get("last_reset"),
            last_used: r.get("last_used"),
        }
    }

    #[must_use]
    pub fn usage_percentage(&self) -> f64 {
        usage_percentage(self.usage_count, self.monthly_limit)
    }
}

/// Request metadata recorded in `usage_logs`.
#[derive(Debug, Clone, Default)]
pub struct RequestMeta {
    pub endpoint: String,
    pub method: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

const KEY_COLUMNS: &str = r"k.id, k.owner_id, u.name AS owner_name, k.key, k.plan, k.usage_count,
    k.monthly_limit, k.is_active, k.created_at, k.last_reset, k.last_used";

// =============================================================================
// PURE HELPERS
// =============================================================================

/// Generate a new key: `mapi_` followed by 32 ASCII alphanumerics.
#[must_use]
pub fn generate_api_key() -> String {
    let body: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(KEY_BODY_LEN)
        .map(char::from)
        .collect();
    format!("{KEY_PREFIX}{body}")
}

/// Cheap shape check run before touching the database.
#[must_use]
pub fn is_well_formed_key(key: &str) -> bool {
    key.strip_prefix(KEY_PREFIX)
        .is_some_and(|body| body.len() == KEY_BODY_LEN && body.chars().all(|c| c.is_ascii_alphanumeric()))
}

/// Monthly usage resets when the calendar month or year has changed.
#[must_use]
pub fn should_reset_monthly_usage(last_reset: OffsetDateTime, now: OffsetDateTime) -> bool {
    let last = last_reset.to_offset(time::UtcOffset::UTC);
    let now = now.to_offset(time::UtcOffset::UTC);
    last.month() != now.month() || last.year() != now.year()
}

/// Percentage of the monthly limit consumed, rounded to two decimals.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn usage_percentage(usage_count: i64, monthly_limit: i64) -> f64 {
    if monthly_limit <= 0 {
        return 0.0;
    }
    let pct = usage_count.max(0) as f64 / monthly_limit as f64 * 100.0;
    (pct * 100.0).round() / 100.0
}

fn placeholder_email(owner_name: &str) -> String {
    let local: String = owner_name
        .trim()
        .to_ascii_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(".");
    let local = if local.is_empty() { "owner".to_owned() } else { local };
    format!("{local}@example.com")
}

// =============================================================================
// ISSUANCE
// =============================================================================

pub(crate) async fn insert_key(
    tx: &mut Transaction<'_, Postgres>,
    owner_id: Uuid,
    plan: Plan,
    monthly_limit: i64,
) -> Result<Uuid, ApiKeyError> {
    if monthly_limit < 0 {
        return Err(ApiKeyError::InvalidLimit);
    }
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO api_keys (id, owner_id, key, plan, monthly_limit) VALUES ($1, $2, $3, $4, $5)")
        .bind(id)
        .bind(owner_id)
        .bind(generate_api_key())
        .bind(plan.as_str())
        .bind(monthly_limit)
        .execute(&mut **tx)
        .await?;
    Ok(id)
}

/// Generate an extra free key for a developer, enforcing the per-user cap.
///
/// # Errors
///
/// Returns [`ApiKeyError::KeyLimitReached`] when the developer already holds
/// [`MAX_KEYS_PER_USER`] keys.
pub async fn generate_for_developer(pool: &PgPool, owner_id: Uuid) -> Result<ApiKeyRow, ApiKeyError> {
    let mut tx = pool.begin().await?;

    // Serialize concurrent generation for one owner on the user row.
    sqlx::query("SELECT id FROM users WHERE id = $1 FOR UPDATE")
        .bind(owner_id)
        .execute(&mut *tx)
        .await?;

    let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM api_keys WHERE owner_id = $1")
        .bind(owner_id)
        .fetch_one(&mut *tx)
        .await?;
    if existing >= MAX_KEYS_PER_USER {
        return Err(ApiKeyError::KeyLimitReached { max: MAX_KEYS_PER_USER });
    }

    let id = insert_key(&mut tx, owner_id, Plan::Free, DEFAULT_MONTHLY_LIMIT).await?;
    tx.commit().await?;

    find_by_id(pool, id).await?.ok_or(ApiKeyError::NotFound)
}

/// Admin issuance by owner name. Unknown names get a verified placeholder
/// account with an unusable password.
///
/// # Errors
///
/// Returns a database error if any insert fails.
pub async fn create_for_owner_name(
    pool: &PgPool,
    owner_name: &str,
    plan: Plan,
    monthly_limit: i64,
) -> Result<ApiKeyRow, ApiKeyError> {
    let mut tx = pool.begin().await?;

    let owner_id: Option<Uuid> = sqlx::query_scalar("SELECT id FROM users WHERE name = $1 ORDER BY created_at LIMIT 1")
        .bind(owner_name)
        .fetch_optional(&mut *tx)
        .await?;

    let owner_id = match owner_id {
        Some(id) => id,
        None => {
            let id = Uuid::new_v4();
            sqlx::query(
                r"INSERT INTO users (id, name, email, password_hash, is_verified, is_admin)
                  VALUES ($1, $2, $3, '!', TRUE, FALSE)
                  ON CONFLICT (email) DO UPDATE SET name = users.name
                  RETURNING id",
            )
            .bind(id)
            .bind(owner_name)
            .bind(placeholder_email(owner_name))
            .fetch_one(&mut *tx)
            .await?
            .get("id")
        }
    };

    let id = insert_key(&mut tx, owner_id, plan, monthly_limit).await?;
    tx.commit().await?;

    find_by_id(pool, id).await?.ok_or(ApiKeyError::NotFound)
}

// =============================================================================
// LOOKUP
// =============================================================================

/// # Errors
///
/// Returns a database error if the query fails.
pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<ApiKeyRow>, ApiKeyError> {
    let row = sqlx::query(&format!(
        "SELECT {KEY_COLUMNS} FROM api_keys k JOIN users u ON u.id = k.owner_id WHERE k.id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row.as_ref().map(ApiKeyRow::from_row))
}

/// # Errors
///
/// Returns a database error if the query fails.
pub async fn list_all(pool: &PgPool) -> Result<Vec<ApiKeyRow>, ApiKeyError> {
    let rows = sqlx::query(&format!(
        "SELECT {KEY_COLUMNS} FROM api_keys k JOIN users u ON u.id = k.owner_id ORDER BY k.created_at DESC"
    ))
    .fetch_all(pool)
    .await?;
    Ok(rows.iter().map(ApiKeyRow::from_row).collect())
}

/// Keys owned by one user, oldest first (the first is the primary key).
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn list_for_owner(pool: &PgPool, owner_id: Uuid) -> Result<Vec<ApiKeyRow>, ApiKeyError> {
    let rows = sqlx::query(&format!(
        "SELECT {KEY_COLUMNS} FROM api_keys k JOIN users u ON u.id = k.owner_id
         WHERE k.owner_id = $1 ORDER BY k.created_at ASC"
    ))
    .bind(owner_id)
    .fetch_all(pool)
    .await?;
    Ok(rows.iter().map(ApiKeyRow::from_row).collect())
}

// =============================================================================
// QUOTA ACCOUNTING
// =============================================================================

/// Validate a presented key, enforce quota and burst limits, and log usage.
///
/// # Errors
///
/// Returns the [`ApiKeyError`] variant matching the first failed check.
pub async fn authorize_request(
    pool: &PgPool,
    limiter: &RateLimiter,
    presented: &str,
    meta: &RequestMeta,
) -> Result<ApiKeyRow, ApiKeyError> {
    if !is_well_formed_key(presented) {
        return Err(ApiKeyError::Invalid);
    }

    let mut tx = pool.begin().await?;

    let row = sqlx::query(&format!(
        "SELECT {KEY_COLUMNS} FROM api_keys k JOIN users u ON u.id = k.owner_id
         WHERE k.key = $1 FOR UPDATE OF k"
    ))
    .bind(presented)
    .fetch_optional(&mut *tx)
    .await?;
    let Some(mut key) = row.as_ref().map(ApiKeyRow::from_row) else {
        return Err(ApiKeyError::Invalid);
    };

    if !key.is_active {
        return Err(ApiKeyError::Suspended);
    }

    let now = OffsetDateTime::now_utc();
    if should_reset_monthly_usage(key.last_reset, now) {
        sqlx::query("UPDATE api_keys SET usage_count = 0, last_reset = $2, updated_at = now() WHERE id = $1")
            .bind(key.id)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        key.usage_count = 0;
        key.last_reset = now;
    }

    if key.usage_count >= key.monthly_limit {
        // Persist a pending month reset even though the request is rejected.
        tx.commit().await?;
        return Err(ApiKeyError::QuotaExceeded { limit: key.monthly_limit });
    }

    if let Err(e) = limiter.check_and_record(&key.id.to_string()) {
        tx.commit().await?;
        tracing::warn!(api_key_id = %key.id, error = %e, "api key throttled");
        return Err(e.into());
    }

    sqlx::query(
        r"INSERT INTO usage_logs (api_key_id, endpoint, method, ip_address, user_agent)
          VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(key.id)
    .bind(&meta.endpoint)
    .bind(&meta.method)
    .bind(&meta.ip_address)
    .bind(&meta.user_agent)
    .execute(&mut *tx)
    .await?;

    sqlx::query("UPDATE api_keys SET usage_count = usage_count + 1, last_used = $2 WHERE id = $1")
        .bind(key.id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    key.usage_count += 1;
    key.last_used = Some(now);
    Ok(key)
}

// =============================================================================
// ADMIN CONTROLS
// =============================================================================

/// Reset usage for a key by its string value.
///
/// # Errors
///
/// Returns [`ApiKeyError::NotFound`] if no key matches.
pub async fn reset_usage_by_key(pool: &PgPool, key: &str) -> Result<(), ApiKeyError> {
    let result = sqlx::query("UPDATE api_keys SET usage_count = 0, last_reset = now(), updated_at = now() WHERE key = $1")
        .bind(key)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(ApiKeyError::NotFound);
    }
    Ok(())
}

/// Reset usage for a key by id.
///
/// # Errors
///
/// Returns [`ApiKeyError::NotFound`] if no key matches.
pub async fn reset_usage_by_id(pool: &PgPool, id: Uuid) -> Result<(), ApiKeyError> {
    let result = sqlx::query("UPDATE api_keys SET usage_count = 0, last_reset = now(), updated_at = now() WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(ApiKeyError::NotFound);
    }
    Ok(())
}

/// Flip a key between active and suspended, returning the new state.
///
/// # Errors
///
/// Returns [`ApiKeyError::NotFound`] if no key matches.
pub async fn toggle_active(pool: &PgPool, id: Uuid) -> Result<bool, ApiKeyError> {
    let is_active: Option<bool> =
        sqlx::query_scalar("UPDATE api_keys SET is_active = NOT is_active, updated_at = now() WHERE id = $1 RETURNING is_active")
            .bind(id)
            .fetch_optional(pool)
            .await?;
    is_active.ok_or(ApiKeyError::NotFound)
}

#[cfg(test)]
#[path = "api_key_test.rs"]
mod tests;
