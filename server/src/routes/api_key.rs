//! API-key extractor for the public movie API.
//!
//! DESIGN
//! ======
//! `ApiKeyAuth` runs the full per-request authorization (quota, burst limit,
//! usage log) before the handler body. A request without `X-API-KEY` is
//! rejected before the database is touched.

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, FromRef, State};
use axum::http::header::USER_AGENT;
use axum::http::request::Parts;
use axum::response::Json;
use serde::Serialize;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use uuid::Uuid;

use super::ApiError;
use crate::services::api_key::{self, ApiKeyError, ApiKeyRow, RequestMeta};
use crate::services::usage::{self, UsageStats};
use crate::state::AppState;

pub(crate) const API_KEY_HEADER: &str = "x-api-key";

fn header_str<'a>(parts: &'a Parts, name: impl axum::http::header::AsHeaderName) -> Option<&'a str> {
    parts.headers.get(name).and_then(|v| v.to_str().ok())
}

/// Client address: first `X-Forwarded-For` hop, else the socket peer.
fn client_ip(parts: &Parts) -> Option<String> {
    if let Some(forwarded) = header_str(parts, "x-forwarded-for") {
        if let Some(first) = forwarded.split(',').map(str::trim).find(|s| !s.is_empty()) {
            return Some(first.to_owned());
        }
    }
    parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
}

pub(crate) fn request_meta(parts: &Parts) -> RequestMeta {
    RequestMeta {
        endpoint: parts.uri.path().to_owned(),
        method: parts.method.as_str().to_owned(),
        ip_address: client_ip(parts),
        user_agent: header_str(parts, USER_AGENT).map(str::to_owned),
    }
}

fn rfc3339(ts: OffsetDateTime) -> String {
    ts.format(&Rfc3339).unwrap_or_default()
}

/// JSON view of a key shared by the developer dashboard and admin listing.
#[derive(Debug, Clone, Serialize)]
pub struct ApiKeyView {
    pub id: Uuid,
    pub owner_name: String,
    pub key: String,
    pub plan: String,
    pub usage_count: i64,
    pub monthly_limit: i64,
    pub usage_percentage: f64,
    pub is_active: bool,
    pub created_at: String,
    pub last_reset: String,
    pub last_used: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_requests: Option<i64>,
}

impl From<&ApiKeyRow> for ApiKeyView {
    fn from(row: &ApiKeyRow) -> Self {
        Self {
            id: row.id,
            owner_name: row.owner_name.clone(),
            key: row.key.clone(),
            plan: row.plan.clone(),
            usage_count: row.usage_count,
            monthly_limit: row.monthly_limit,
            usage_percentage: row.usage_percentage(),
            is_active: row.is_active,
            created_at: rfc3339(row.created_at),
            last_reset: rfc3339(row.last_reset),
            last_used: row.last_used.map(rfc3339),
            total_requests: None,
        }
    }
}

/// Key presented in `X-API-KEY`, already authorized and counted.
pub struct ApiKeyAuth(pub ApiKeyRow);

impl<S> axum::extract::FromRequestParts<S> for ApiKeyAuth
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let presented = header_str(parts, API_KEY_HEADER)
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or(ApiKeyError::Missing)?;

        let app_state = AppState::from_ref(state);
        let meta = request_meta(parts);
        let key = api_key::authorize_request(&app_state.pool, &app_state.key_limiter, presented, &meta).await?;
        Ok(Self(key))
    }
}

/// `GET /api-key/stats`: usage for the presented key over the last 30 days.
pub async fn key_stats(State(state): State<AppState>, ApiKeyAuth(key): ApiKeyAuth) -> Result<Json<UsageStats>, ApiError> {
    Ok(Json(usage::stats_for_key(&state.pool, &key).await?))
}

#[cfg(test)]
#[path = "api_key_test.rs"]
mod tests;
