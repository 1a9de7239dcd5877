//! Developer accounts: registration, email verification, password login.
//!
//! DESIGN
//! ======
//! Registration creates an unverified user plus a six-digit code (stored as a
//! sha256 hash, valid for 15 minutes). Verifying the code marks the account
//! verified and issues the default free API key in the same transaction.
//! Passwords are hashed with Argon2id on the blocking pool.
//!
//! ERROR HANDLING
//! ==============
//! Unknown email, wrong password, and wrong account kind all collapse into
//! [`AccountError::InvalidCredentials`] so login responses do not reveal
//! which accounts exist.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use rand::Rng;
use sha2::{Digest, Sha256};
use sqlx::{PgPool, Row};
use time::OffsetDateTime;
use uuid::Uuid;

use super::api_key::{self, ApiKeyError, DEFAULT_MONTHLY_LIMIT, Plan};
use super::session::{SessionUser, bytes_to_hex};

pub const MIN_PASSWORD_LEN: usize = 8;
pub const CODE_TTL_MINUTES: i64 = 15;
const CODE_LEN: usize = 6;
const MAX_FAILED_ATTEMPTS: i32 = 5;

const ALLOWED_EMAIL_DOMAINS: &[&str] = &[
    "gmail.com",
    "googlemail.com",
    "yahoo.com",
    "yahoo.co.uk",
    "yahoo.ca",
    "yahoo.au",
    "outlook.com",
    "hotmail.com",
    "live.com",
    "msn.com",
];

const DISPOSABLE_EMAIL_DOMAINS: &[&str] = &[
    "10minutemail.com",
    "tempmail.org",
    "guerrillamail.com",
    "mailinator.com",
    "yopmail.com",
    "temp-mail.org",
    "throwaway.email",
    "getnada.com",
    "maildrop.cc",
];

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    #[error("Name is required")]
    MissingName,
    #[error("Please enter a valid email address")]
    InvalidEmail,
    #[error("Passwords do not match")]
    PasswordMismatch,
    #[error("Password must be at least {MIN_PASSWORD_LEN} characters long")]
    PasswordTooShort,
    #[error("Please use Gmail, Yahoo, or Outlook email")]
    UnsupportedEmailDomain,
    #[error("Disposable email addresses are not allowed")]
    DisposableEmail,
    #[error("Email already registered")]
    EmailTaken,
    #[error("Invalid or expired verification code")]
    VerificationFailed,
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Please verify your email before signing in")]
    NotVerified,
    #[error("password hashing failed: {0}")]
    PasswordHash(String),
    #[error(transparent)]
    ApiKey(#[from] ApiKeyError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// A registration request that passed local validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccount {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Result of a successful registration: the code still has to be delivered.
#[derive(Debug, Clone)]
pub struct PendingVerification {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub code: String,
}

/// Which login surface is authenticating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginScope {
    Developer,
    Admin,
}

// =============================================================================
// VALIDATION
// =============================================================================

#[must_use]
pub fn normalize_email(email: &str) -> Option<String> {
    let normalized = email.trim().to_ascii_lowercase();
    let (local, domain) = normalized.split_once('@')?;
    if local.is_empty() || domain.is_empty() || domain.contains('@') || !domain.contains('.') {
        return None;
    }
    Some(normalized)
}

fn email_domain(normalized: &str) -> &str {
    normalized.rsplit('@').next().unwrap_or_default()
}

#[must_use]
pub fn is_allowed_email_domain(normalized: &str) -> bool {
    ALLOWED_EMAIL_DOMAINS.contains(&email_domain(normalized))
}

#[must_use]
pub fn is_disposable_email(normalized: &str) -> bool {
    DISPOSABLE_EMAIL_DOMAINS.contains(&email_domain(normalized))
}

/// Validate a registration form without touching the database.
///
/// # Errors
///
/// Returns the first failed rule as an [`AccountError`].
pub fn validate_registration(
    name: &str,
    email: &str,
    password: &str,
    confirm_password: &str,
) -> Result<NewAccount, AccountError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AccountError::MissingName);
    }
    let email = normalize_email(email).ok_or(AccountError::InvalidEmail)?;
    if password != confirm_password {
        return Err(AccountError::PasswordMismatch);
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AccountError::PasswordTooShort);
    }
    if is_disposable_email(&email) {
        return Err(AccountError::DisposableEmail);
    }
    if !is_allowed_email_domain(&email) {
        return Err(AccountError::UnsupportedEmailDomain);
    }
    Ok(NewAccount { name: name.to_owned(), email, password: password.to_owned() })
}

// =============================================================================
// CODES AND PASSWORDS
// =============================================================================

#[must_use]
pub fn generate_verification_code() -> String {
    let mut rng = rand::rng();
    (0..CODE_LEN)
        .map(|_| char::from(b'0' + rng.random_range(0..10u8)))
        .collect()
}

#[must_use]
pub fn normalize_code(code: &str) -> Option<String> {
    let normalized = code.trim();
    if normalized.len() != CODE_LEN || !normalized.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(normalized.to_owned())
}

#[must_use]
pub fn hash_code(code: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(code.as_bytes());
    bytes_to_hex(&hasher.finalize())
}

/// Hash a password with Argon2id and a random salt (PHC string format).
///
/// # Errors
///
/// Returns [`AccountError::PasswordHash`] if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AccountError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AccountError::PasswordHash(e.to_string()))
}

/// Verify a password against a stored PHC hash. Unparseable hashes never match.
#[must_use]
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

async fn hash_password_blocking(password: String) -> Result<String, AccountError> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| AccountError::PasswordHash(e.to_string()))?
}

async fn verify_password_blocking(password: String, stored_hash: String) -> bool {
    tokio::task::spawn_blocking(move || verify_password(&password, &stored_hash))
        .await
        .unwrap_or(false)
}

/// An existing account may be replaced by a new registration only while it
/// is unverified and has no outstanding code (expired, burned, or never sent).
#[must_use]
pub fn is_stale_unverified(is_verified: bool, live_code_expires_at: Option<OffsetDateTime>, now: OffsetDateTime) -> bool {
    !is_verified && live_code_expires_at.is_none_or(|expires| expires <= now)
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|db| db.code().as_deref() == Some("23505"))
}

// =============================================================================
// REGISTRATION
// =============================================================================

/// Create an unverified developer account and its first verification code.
///
/// # Errors
///
/// Returns [`AccountError::EmailTaken`] if the email belongs to a verified
/// account or to an unverified one whose code is still live. A stale
/// unverified account is replaced.
pub async fn register(pool: &PgPool, account: &NewAccount) -> Result<PendingVerification, AccountError> {
    let password_hash = hash_password_blocking(account.password.clone()).await?;
    let user_id = Uuid::new_v4();
    let code = generate_verification_code();

    let mut tx = pool.begin().await?;

    let existing: Option<(Uuid, bool, Option<OffsetDateTime>)> = sqlx::query_as(
        r"SELECT u.id, u.is_verified,
                 (SELECT max(v.expires_at)
                  FROM email_verifications v
                  WHERE v.user_id = u.id AND v.consumed_at IS NULL)
          FROM users u
          WHERE u.email = $1
          FOR UPDATE OF u",
    )
    .bind(&account.email)
    .fetch_optional(&mut *tx)
    .await?;
    if let Some((stale_id, is_verified, live_code_expires_at)) = existing {
        if !is_stale_unverified(is_verified, live_code_expires_at, OffsetDateTime::now_utc()) {
            return Err(AccountError::EmailTaken);
        }
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(stale_id)
            .execute(&mut *tx)
            .await?;
        tracing::info!(user_id = %stale_id, "replacing stale unverified account");
    }

    let inserted = sqlx::query(
        r"INSERT INTO users (id, name, email, password_hash, is_verified, is_admin)
          VALUES ($1, $2, $3, $4, FALSE, FALSE)",
    )
    .bind(user_id)
    .bind(&account.name)
    .bind(&account.email)
    .bind(&password_hash)
    .execute(&mut *tx)
    .await;
    match inserted {
        Ok(_) => {}
        Err(e) if is_unique_violation(&e) => return Err(AccountError::EmailTaken),
        Err(e) => return Err(e.into()),
    }

    sqlx::query(
        r"INSERT INTO email_verifications (id, user_id, code_hash, expires_at)
          VALUES ($1, $2, $3, now() + make_interval(mins => $4))",
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(hash_code(&code))
    .bind(i32::try_from(CODE_TTL_MINUTES).unwrap_or(15))
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(PendingVerification { user_id, name: account.name.clone(), email: account.email.clone(), code })
}

/// Remove an account that never verified, used when the code could not be
/// delivered so the email can register again.
///
/// # Errors
///
/// Returns a database error if the delete fails.
pub async fn discard_unverified(pool: &PgPool, user_id: Uuid) -> Result<(), AccountError> {
    sqlx::query("DELETE FROM users WHERE id = $1 AND NOT is_verified")
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Consume a verification code, mark the account verified, and issue the
/// default API key.
///
/// # Errors
///
/// Returns [`AccountError::VerificationFailed`] for unknown emails, wrong or
/// expired codes. Five wrong attempts burn the outstanding code.
pub async fn verify_email(pool: &PgPool, email: &str, code: &str) -> Result<Uuid, AccountError> {
    let email = normalize_email(email).ok_or(AccountError::VerificationFailed)?;
    let code = normalize_code(code).ok_or(AccountError::VerificationFailed)?;

    let mut tx = pool.begin().await?;

    let user_id: Option<Uuid> = sqlx::query_scalar("SELECT id FROM users WHERE email = $1 FOR UPDATE")
        .bind(&email)
        .fetch_optional(&mut *tx)
        .await?;
    let Some(user_id) = user_id else {
        return Err(AccountError::VerificationFailed);
    };

    let consumed = sqlx::query(
        r"UPDATE email_verifications
          SET consumed_at = now()
          WHERE id = (
              SELECT id
              FROM email_verifications
              WHERE user_id = $1
                AND consumed_at IS NULL
                AND expires_at > now()
              ORDER BY created_at DESC
              LIMIT 1
          )
          AND code_hash = $2
          RETURNING id",
    )
    .bind(user_id)
    .bind(hash_code(&code))
    .fetch_optional(&mut *tx)
    .await?;

    if consumed.is_none() {
        sqlx::query(
            r"UPDATE email_verifications
              SET attempts = attempts + 1,
                  consumed_at = CASE WHEN attempts + 1 >= $2 THEN now() ELSE consumed_at END
              WHERE id = (
                  SELECT id
                  FROM email_verifications
                  WHERE user_id = $1
                    AND consumed_at IS NULL
                    AND expires_at > now()
                  ORDER BY created_at DESC
                  LIMIT 1
              )",
        )
        .bind(user_id)
        .bind(MAX_FAILED_ATTEMPTS)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        return Err(AccountError::VerificationFailed);
    }

    sqlx::query("UPDATE users SET is_verified = TRUE, updated_at = now() WHERE id = $1")
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

    let key_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM api_keys WHERE owner_id = $1")
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;
    if key_count == 0 {
        api_key::insert_key(&mut tx, user_id, Plan::Free, DEFAULT_MONTHLY_LIMIT).await?;
    }

    tx.commit().await?;
    Ok(user_id)
}

// =============================================================================
// LOGIN
// =============================================================================

/// Check credentials for the given login surface.
///
/// # Errors
///
/// Returns [`AccountError::InvalidCredentials`] or [`AccountError::NotVerified`].
pub async fn authenticate(
    pool: &PgPool,
    email: &str,
    password: &str,
    scope: LoginScope,
) -> Result<SessionUser, AccountError> {
    let email = normalize_email(email).ok_or(AccountError::InvalidCredentials)?;

    let row = sqlx::query("SELECT id, name, email, password_hash, is_verified, is_admin FROM users WHERE email = $1")
        .bind(&email)
        .fetch_optional(pool)
        .await?;
    let Some(row) = row else {
        return Err(AccountError::InvalidCredentials);
    };

    let is_admin: bool = row.get("is_admin");
    let scope_matches = match scope {
        LoginScope::Developer => !is_admin,
        LoginScope::Admin => is_admin,
    };
    if !scope_matches {
        return Err(AccountError::InvalidCredentials);
    }

    let stored_hash: String = row.get("password_hash");
    if !verify_password_blocking(password.to_owned(), stored_hash).await {
        return Err(AccountError::InvalidCredentials);
    }

    let is_verified: bool = row.get("is_verified");
    if !is_verified {
        return Err(AccountError::NotVerified);
    }

    Ok(SessionUser { id: row.get("id"), name: row.get("name"), email: row.get("email"), is_admin })
}

/// Seed the default admin account when no user holds the admin email.
/// Returns `true` when an account was created.
///
/// # Errors
///
/// Returns an error if hashing or the insert fails.
pub async fn ensure_admin(pool: &PgPool, email: &str, password: &str) -> Result<bool, AccountError> {
    let email = normalize_email(email).ok_or(AccountError::InvalidEmail)?;
    let password_hash = hash_password_blocking(password.to_owned()).await?;

    let result = sqlx::query(
        r"INSERT INTO users (id, name, email, password_hash, is_verified, is_admin)
          VALUES ($1, 'Admin', $2, $3, TRUE, TRUE)
          ON CONFLICT (email) DO NOTHING",
    )
    .bind(Uuid::new_v4())
    .bind(&email)
    .bind(password_hash)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
#[path = "account_test.rs"]
mod tests;
