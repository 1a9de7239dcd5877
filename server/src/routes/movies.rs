//! Public movie API. Every handler takes [`ApiKeyAuth`], so the request is
//! authorized and counted before the catalogue is queried.

use axum::extract::{Path, Query, State};
use axum::response::Json;
use serde::Deserialize;

use super::ApiError;
use super::api_key::ApiKeyAuth;
use crate::services::movie::{self, Movie, MoviePage, Pagination, SearchFilter, SearchResults};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListParams {
    page: Option<i64>,
    per_page: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    title: Option<String>,
    year: Option<i32>,
    genre: Option<String>,
}

/// `GET /movies?page&per_page`
pub async fn list_movies(
    State(state): State<AppState>,
    _key: ApiKeyAuth,
    Query(params): Query<ListParams>,
) -> Result<Json<MoviePage>, ApiError> {
    let pagination = Pagination::new(params.page, params.per_page)?;
    Ok(Json(movie::list_page(&state.pool, pagination).await?))
}

/// `GET /movies/{id}`
pub async fn get_movie(
    State(state): State<AppState>,
    _key: ApiKeyAuth,
    Path(id): Path<i64>,
) -> Result<Json<Movie>, ApiError> {
    Ok(Json(movie::get(&state.pool, id).await?))
}

/// `GET /search?title&year&genre`
pub async fn search_movies(
    State(state): State<AppState>,
    _key: ApiKeyAuth,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResults>, ApiError> {
    let filter = SearchFilter { title: params.title, year: params.year, genre: params.genre };
    Ok(Json(movie::search(&state.pool, filter).await?))
}
