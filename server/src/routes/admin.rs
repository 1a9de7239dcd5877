//! Admin routes: portal stats, key management, catalogue upload.
//! Every handler requires an admin session via [`AdminUser`].

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;
use uuid::Uuid;

use super::ApiError;
use super::api_key::ApiKeyView;
use super::auth::AdminUser;
use crate::services::api_key::{self, ApiKeyError, DEFAULT_MONTHLY_LIMIT, Plan};
use crate::services::movie::{self, Movie};
use crate::services::usage::{self, AdminStats};
use crate::state::AppState;

/// `GET /admin/stats`
pub async fn stats(State(state): State<AppState>, _admin: AdminUser) -> Result<Json<AdminStats>, ApiError> {
    Ok(Json(usage::admin_stats(&state.pool).await?))
}

/// `GET /admin/api-keys`
pub async fn list_keys(State(state): State<AppState>, _admin: AdminUser) -> Result<Json<Vec<ApiKeyView>>, ApiError> {
    let rows = api_key::list_all(&state.pool).await?;
    Ok(Json(rows.iter().map(ApiKeyView::from).collect()))
}

#[derive(Debug, Deserialize)]
pub struct CreateKeyBody {
    owner_name: String,
    plan: Option<String>,
    monthly_limit: Option<i64>,
}

/// `POST /admin/api-keys`: issue a key for an owner name.
pub async fn create_key(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Json(body): Json<CreateKeyBody>,
) -> Result<(StatusCode, Json<ApiKeyView>), ApiError> {
    let owner_name = body.owner_name.trim();
    if owner_name.is_empty() {
        return Err(ApiError::new(StatusCode::BAD_REQUEST, "owner_name is required"));
    }
    let plan = match body.plan.as_deref() {
        None => Plan::Free,
        Some(raw) => Plan::parse(raw).ok_or_else(|| ApiKeyError::InvalidPlan(raw.to_owned()))?,
    };
    let monthly_limit = body.monthly_limit.unwrap_or(DEFAULT_MONTHLY_LIMIT);

    let row = api_key::create_for_owner_name(&state.pool, owner_name, plan, monthly_limit).await?;
    tracing::info!(admin_id = %admin.user.id, api_key_id = %row.id, owner = %row.owner_name, "admin created api key");
    Ok((StatusCode::CREATED, Json(ApiKeyView::from(&row))))
}

/// `POST /admin/api-keys/{id}/toggle`
pub async fn toggle_key(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let is_active = api_key::toggle_active(&state.pool, id).await?;
    tracing::info!(api_key_id = %id, is_active, "api key toggled");
    Ok(Json(serde_json::json!({ "id": id, "is_active": is_active })))
}

/// `POST /admin/api-keys/{id}/reset`
pub async fn reset_key(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    api_key::reset_usage_by_id(&state.pool, id).await?;
    Ok(Json(serde_json::json!({ "message": "Usage reset successfully" })))
}

#[derive(Debug, Deserialize)]
pub struct ResetUsageBody {
    api_key: String,
}

/// `POST /admin/reset-usage`: reset by key string.
pub async fn reset_usage(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(body): Json<ResetUsageBody>,
) -> Result<Json<serde_json::Value>, ApiError> {
    api_key::reset_usage_by_key(&state.pool, body.api_key.trim()).await?;
    Ok(Json(serde_json::json!({ "message": "Usage reset successfully" })))
}

/// `GET /admin/movies`: newest first.
pub async fn list_movies(State(state): State<AppState>, _admin: AdminUser) -> Result<Json<Vec<Movie>>, ApiError> {
    Ok(Json(movie::list_all_recent(&state.pool).await?))
}

/// `POST /admin/movies/upload`: raw CSV body.
pub async fn upload_movies(
    State(state): State<AppState>,
    _admin: AdminUser,
    body: String,
) -> Result<Json<serde_json::Value>, ApiError> {
    let summary = movie::import_csv(&state.pool, &body).await?;
    Ok(Json(serde_json::json!({
        "message": format!(
            "Successfully processed CSV: {} movies added, {} movies updated",
            summary.added, summary.updated
        ),
        "added": summary.added,
        "updated": summary.updated,
    })))
}
