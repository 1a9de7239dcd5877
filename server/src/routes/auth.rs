//! Auth routes: developer registration, email verification, password
//! login for developers and admins, session management.

use axum::extract::{FromRef, State};
use axum::http::header::AUTHORIZATION;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use time::Duration;

use super::ApiError;
use crate::services::account::{self, LoginScope};
use crate::services::{email, session};
use crate::state::AppState;

pub(crate) const COOKIE_NAME: &str = "session_token";

/// Read the session token from the cookie, falling back to a bearer header.
pub(crate) fn session_token(parts: &axum::http::request::Parts) -> Option<String> {
    let jar = CookieJar::from_headers(&parts.headers);
    if let Some(cookie) = jar.get(COOKIE_NAME).filter(|c| !c.value().is_empty()) {
        return Some(cookie.value().to_owned());
    }
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_owned)
}

fn session_cookie(token: String, secure: bool, max_age: Duration) -> Cookie<'static> {
    Cookie::build((COOKIE_NAME, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(max_age)
        .build()
}

// =============================================================================
// AUTH EXTRACTORS
// =============================================================================

/// Authenticated user extracted from the session cookie or bearer token.
/// Use as a handler parameter to require authentication.
pub struct AuthUser {
    pub user: session::SessionUser,
    pub token: String,
}

impl<S> axum::extract::FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut axum::http::request::Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = session_token(parts).ok_or_else(|| ApiError::new(StatusCode::UNAUTHORIZED, "Not authenticated"))?;

        let app_state = AppState::from_ref(state);
        let user = session::validate_session(&app_state.pool, &token)
            .await?
            .ok_or_else(|| ApiError::new(StatusCode::UNAUTHORIZED, "Session expired. Please sign in again."))?;

        Ok(Self { user, token })
    }
}

/// Authenticated admin. Non-admin sessions are rejected with 403.
pub struct AdminUser(pub AuthUser);

impl<S> axum::extract::FromRequestParts<S> for AdminUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut axum::http::request::Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth = AuthUser::from_request_parts(parts, state).await?;
        if !auth.user.is_admin {
            return Err(ApiError::new(StatusCode::FORBIDDEN, "Admin access required"));
        }
        Ok(Self(auth))
    }
}

// =============================================================================
// REGISTRATION
// =============================================================================

#[derive(Deserialize)]
pub struct RegisterBody {
    name: String,
    email: String,
    password: String,
    confirm_password: String,
}

/// `POST /api/auth/register`: create an unverified account and send a code.
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterBody>,
) -> Result<impl IntoResponse, ApiError> {
    let account = account::validate_registration(&body.name, &body.email, &body.password, &body.confirm_password)?;
    let pending = account::register(&state.pool, &account).await?;

    let delivered = email::deliver_verification_code(
        state.config.resend.as_ref(),
        &pending.name,
        &pending.email,
        &pending.code,
        account::CODE_TTL_MINUTES,
    )
    .await;
    if let Err(e) = delivered {
        account::discard_unverified(&state.pool, pending.user_id).await?;
        return Err(e.into());
    }

    tracing::info!(user_id = %pending.user_id, "developer registered");
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "message": "Registration successful. Please check your email for the verification code.",
            "email": pending.email,
        })),
    ))
}

#[derive(Deserialize)]
pub struct VerifyBody {
    email: String,
    code: String,
}

/// `POST /api/auth/verify`: consume a code and activate the account.
pub async fn verify(
    State(state): State<AppState>,
    Json(body): Json<VerifyBody>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user_id = account::verify_email(&state.pool, &body.email, &body.code).await?;
    tracing::info!(%user_id, "developer email verified");
    Ok(Json(serde_json::json!({
        "message": "Email verified successfully. You can now sign in.",
    })))
}

// =============================================================================
// LOGIN / LOGOUT
// =============================================================================

#[derive(Deserialize)]
pub struct LoginBody {
    email: String,
    password: String,
}

async fn login_with_scope(state: &AppState, body: LoginBody, scope: LoginScope) -> Result<impl IntoResponse, ApiError> {
    let throttle_key = body.email.trim().to_ascii_lowercase();
    if let Err(e) = state.login_limiter.check_and_record(&throttle_key) {
        tracing::warn!(error = %e, "login throttled");
        return Err(ApiError::new(
            StatusCode::TOO_MANY_REQUESTS,
            "Too many login attempts. Please try again later.",
        ));
    }

    let user = account::authenticate(&state.pool, &body.email, &body.password, scope).await?;
    state.login_limiter.clear(&throttle_key);

    let ttl_hours = state.config.session_ttl_hours;
    let token = session::create_session(&state.pool, user.id, ttl_hours).await?;
    tracing::info!(user_id = %user.id, admin = user.is_admin, "session created");

    let jar = CookieJar::new().add(session_cookie(token.clone(), state.config.cookie_secure, Duration::hours(ttl_hours)));
    Ok((jar, Json(serde_json::json!({ "token": token, "user": user }))))
}

/// `POST /api/auth/login`: developer login. Admin accounts are rejected.
pub async fn login(State(state): State<AppState>, Json(body): Json<LoginBody>) -> Result<impl IntoResponse, ApiError> {
    login_with_scope(&state, body, LoginScope::Developer).await
}

/// `POST /admin/login`: admin login. Developer accounts are rejected.
pub async fn admin_login(
    State(state): State<AppState>,
    Json(body): Json<LoginBody>,
) -> Result<impl IntoResponse, ApiError> {
    login_with_scope(&state, body, LoginScope::Admin).await
}

/// `GET /api/auth/me`: return current user.
pub async fn me(auth: AuthUser) -> Json<session::SessionUser> {
    Json(auth.user)
}

/// `POST /api/auth/logout`: delete session, clear cookie.
pub async fn logout(State(state): State<AppState>, auth: AuthUser) -> impl IntoResponse {
    if let Err(e) = session::delete_session(&state.pool, &auth.token).await {
        tracing::error!(error = %e, "session delete failed");
    }

    let jar = CookieJar::new().add(session_cookie(String::new(), state.config.cookie_secure, Duration::ZERO));
    (jar, StatusCode::NO_CONTENT)
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
