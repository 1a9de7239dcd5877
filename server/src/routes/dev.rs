//! Developer dashboard routes.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use serde::Serialize;

use super::ApiError;
use super::api_key::ApiKeyView;
use super::auth::AuthUser;
use crate::services::session::SessionUser;
use crate::services::{api_key, usage};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub user: SessionUser,
    /// Oldest key; the one shown on the dashboard card.
    pub api_key: Option<ApiKeyView>,
    pub api_keys: Vec<ApiKeyView>,
    pub max_keys: i64,
}

/// `GET /api/dev/dashboard`
pub async fn dashboard(State(state): State<AppState>, auth: AuthUser) -> Result<Json<DashboardResponse>, ApiError> {
    let rows = api_key::list_for_owner(&state.pool, auth.user.id).await?;
    let totals = usage::request_totals_for_owner(&state.pool, auth.user.id).await?;

    let api_keys: Vec<ApiKeyView> = rows
        .iter()
        .map(|row| ApiKeyView { total_requests: Some(totals.get(&row.id).copied().unwrap_or(0)), ..row.into() })
        .collect();

    Ok(Json(DashboardResponse {
        user: auth.user,
        api_key: api_keys.first().cloned(),
        api_keys,
        max_keys: api_key::MAX_KEYS_PER_USER,
    }))
}

/// `POST /api/dev/api-keys`: issue another free key, up to the per-user cap.
pub async fn generate_key(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<(StatusCode, Json<ApiKeyView>), ApiError> {
    let row = api_key::generate_for_developer(&state.pool, auth.user.id).await?;
    tracing::info!(user_id = %auth.user.id, api_key_id = %row.id, "developer key generated");
    Ok((StatusCode::CREATED, Json(ApiKeyView::from(&row))))
}
