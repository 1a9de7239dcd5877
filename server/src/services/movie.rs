//! Movie catalogue: pagination, lookup, search, and CSV import.
//!
//! DESIGN
//! ======
//! Genres and actors are stored pipe-separated and exposed as lists. CSV
//! import upserts on `(title, year)` inside one transaction so a failed file
//! leaves the catalogue untouched.

use serde::Serialize;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};

pub const DEFAULT_PER_PAGE: i64 = 10;
pub const MAX_PER_PAGE: i64 = 50;
const LIST_SEPARATOR: char = '|';

pub const CSV_COLUMNS: [&str; 8] = ["id", "title", "year", "genre", "director", "actors", "plot", "poster_url"];

const MOVIE_COLUMNS: &str = "id, title, year, genre, director, actors, plot, poster_url";

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum MovieError {
    #[error("Movie with ID {0} not found")]
    NotFound(i64),
    #[error("Page {page} not found. Total pages: {total_pages}")]
    PageNotFound { page: i64, total_pages: i64 },
    #[error("page must be at least 1")]
    InvalidPage,
    #[error("per_page must be between 1 and {MAX_PER_PAGE}")]
    InvalidPerPage,
    #[error("At least one search parameter (title, year, or genre) must be provided")]
    NoSearchFilter,
    #[error("CSV must contain columns: {}", CSV_COLUMNS.join(", "))]
    MissingColumns,
    #[error("Error processing CSV: {0}")]
    Csv(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
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

impl Movie {
    fn from_row(r: &PgRow) -> Self {
        Self {
            id: r.get("id"),
            title: r.get("title"),
            year: r.get("year"),
            genre: split_list(r.get("genre")),
            director: r.get("director"),
            actors: split_list(r.get("actors")),
            plot: r.get("plot"),
            poster_url: r.get::<Option<String>, _>("poster_url").unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: i64,
    pub per_page: i64,
}

impl Pagination {
    /// # Errors
    ///
    /// Returns [`MovieError::InvalidPage`] or [`MovieError::InvalidPerPage`]
    /// when a value is out of bounds.
    pub fn new(page: Option<i64>, per_page: Option<i64>) -> Result<Self, MovieError> {
        let page = page.unwrap_or(1);
        let per_page = per_page.unwrap_or(DEFAULT_PER_PAGE);
        if page < 1 {
            return Err(MovieError::InvalidPage);
        }
        if !(1..=MAX_PER_PAGE).contains(&per_page) {
            return Err(MovieError::InvalidPerPage);
        }
        Ok(Self { page, per_page })
    }

    #[must_use]
    pub fn offset(self) -> i64 {
        (self.page - 1).saturating_mul(self.per_page)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MoviePage {
    pub movies: Vec<Movie>,
    pub page: i64,
    pub per_page: i64,
    pub total_movies: i64,
    pub total_pages: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SearchFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
}

impl SearchFilter {
    /// Drop blank text filters.
    #[must_use]
    pub fn normalized(self) -> Self {
        let clean = |v: Option<String>| v.map(|s| s.trim().to_owned()).filter(|s| !s.is_empty());
        Self { title: clean(self.title), year: self.year, genre: clean(self.genre) }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.year.is_none() && self.genre.is_none()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResults {
    pub movies: Vec<Movie>,
    pub query: SearchFilter,
    pub total_results: usize,
}

/// One parsed CSV row. The `id` column is required but ignored; rows are
/// matched on `(title, year)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovieInput {
    pub title: String,
    pub year: i32,
    pub genre: String,
    pub director: String,
    pub actors: String,
    pub plot: String,
    pub poster_url: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub added: u64,
    pub updated: u64,
}

// =============================================================================
// PURE HELPERS
// =============================================================================

#[must_use]
pub fn split_list(raw: Option<String>) -> Vec<String> {
    raw.map(|s| {
        s.split(LIST_SEPARATOR)
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(str::to_owned)
            .collect()
    })
    .unwrap_or_default()
}

#[must_use]
pub fn total_pages(total: i64, per_page: i64) -> i64 {
    if total <= 0 || per_page <= 0 {
        return 0;
    }
    (total + per_page - 1) / per_page
}

/// Escape `%`, `_`, and `\` so user input matches literally inside `ILIKE`.
#[must_use]
pub fn escape_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Parse an uploaded catalogue file.
///
/// # Errors
///
/// Returns [`MovieError::MissingColumns`] when the header lacks a required
/// column, or [`MovieError::Csv`] for malformed rows.
pub fn parse_csv(body: &str) -> Result<Vec<MovieInput>, MovieError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(body.as_bytes());

    let headers = reader.headers().map_err(|e| MovieError::Csv(e.to_string()))?.clone();
    let position = |name: &str| headers.iter().position(|h| h.eq_ignore_ascii_case(name));
    let mut index = [0usize; CSV_COLUMNS.len()];
    for (slot, column) in index.iter_mut().zip(CSV_COLUMNS) {
        *slot = position(column).ok_or(MovieError::MissingColumns)?;
    }
    let [_, title, year, genre, director, actors, plot, poster_url] = index;

    let mut movies = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record.map_err(|e| MovieError::Csv(e.to_string()))?;
        let field = |i: usize| record.get(i).unwrap_or_default().to_owned();

        let title_value = field(title);
        if title_value.is_empty() {
            return Err(MovieError::Csv(format!("row {}: title is empty", line + 1)));
        }
        let year_value = field(year)
            .parse::<i32>()
            .map_err(|_| MovieError::Csv(format!("row {}: invalid year {:?}", line + 1, field(year))))?;

        movies.push(MovieInput {
            title: title_value,
            year: year_value,
            genre: field(genre),
            director: field(director),
            actors: field(actors),
            plot: field(plot),
            poster_url: field(poster_url),
        });
    }
    Ok(movies)
}

// =============================================================================
// QUERIES
// =============================================================================

/// # Errors
///
/// Returns a database error if the query fails.
pub async fn count(pool: &PgPool) -> Result<i64, MovieError> {
    Ok(sqlx::query_scalar("SELECT COUNT(*) FROM movies").fetch_one(pool).await?)
}

/// One page of the catalogue ordered by id.
///
/// # Errors
///
/// Returns [`MovieError::PageNotFound`] when `page` is past the last page.
pub async fn list_page(pool: &PgPool, pagination: Pagination) -> Result<MoviePage, MovieError> {
    let total_movies = count(pool).await?;
    let total = total_pages(total_movies, pagination.per_page);

    if total_movies == 0 {
        return Ok(MoviePage {
            movies: Vec::new(),
            page: pagination.page,
            per_page: pagination.per_page,
            total_movies: 0,
            total_pages: 0,
        });
    }
    if pagination.page > total {
        return Err(MovieError::PageNotFound { page: pagination.page, total_pages: total });
    }

    let rows = sqlx::query(&format!("SELECT {MOVIE_COLUMNS} FROM movies ORDER BY id LIMIT $1 OFFSET $2"))
        .bind(pagination.per_page)
        .bind(pagination.offset())
        .fetch_all(pool)
        .await?;

    Ok(MoviePage {
        movies: rows.iter().map(Movie::from_row).collect(),
        page: pagination.page,
        per_page: pagination.per_page,
        total_movies,
        total_pages: total,
    })
}

/// # Errors
///
/// Returns [`MovieError::NotFound`] if no movie has this id.
pub async fn get(pool: &PgPool, id: i64) -> Result<Movie, MovieError> {
    let row = sqlx::query(&format!("SELECT {MOVIE_COLUMNS} FROM movies WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(Movie::from_row).ok_or(MovieError::NotFound(id))
}

/// Case-insensitive substring match on title and genre, exact match on year.
///
/// # Errors
///
/// Returns [`MovieError::NoSearchFilter`] when every filter is empty.
pub async fn search(pool: &PgPool, filter: SearchFilter) -> Result<SearchResults, MovieError> {
    let filter = filter.normalized();
    if filter.is_empty() {
        return Err(MovieError::NoSearchFilter);
    }

    let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(format!("SELECT {MOVIE_COLUMNS} FROM movies WHERE TRUE"));
    if let Some(title) = &filter.title {
        qb.push(" AND title ILIKE ").push_bind(format!("%{}%", escape_like(title)));
    }
    if let Some(year) = filter.year {
        qb.push(" AND year = ").push_bind(year);
    }
    if let Some(genre) = &filter.genre {
        qb.push(" AND genre ILIKE ").push_bind(format!("%{}%", escape_like(genre)));
    }
    qb.push(" ORDER BY id");

    let rows = qb.build().fetch_all(pool).await?;
    let movies: Vec<Movie> = rows.iter().map(Movie::from_row).collect();
    Ok(SearchResults { total_results: movies.len(), movies, query: filter })
}

/// Whole catalogue, newest first, for the admin view.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn list_all_recent(pool: &PgPool) -> Result<Vec<Movie>, MovieError> {
    let rows = sqlx::query(&format!("SELECT {MOVIE_COLUMNS} FROM movies ORDER BY created_at DESC, id DESC"))
        .fetch_all(pool)
        .await?;
    Ok(rows.iter().map(Movie::from_row).collect())
}

/// Parse and upsert a CSV catalogue file.
///
/// # Errors
///
/// Returns parse errors from [`parse_csv`] or a database error; in both cases
/// nothing is written.
pub async fn import_csv(pool: &PgPool, body: &str) -> Result<ImportSummary, MovieError> {
    let movies = parse_csv(body)?;
    let mut summary = ImportSummary::default();

    let mut tx = pool.begin().await?;
    for movie in &movies {
        let inserted: bool = sqlx::query_scalar(
            r"INSERT INTO movies (title, year, genre, director, actors, plot, poster_url)
              VALUES ($1, $2, $3, $4, $5, $6, $7)
              ON CONFLICT (title, year) DO UPDATE
              SET genre = EXCLUDED.genre,
                  director = EXCLUDED.director,
                  actors = EXCLUDED.actors,
                  plot = EXCLUDED.plot,
                  poster_url = EXCLUDED.poster_url,
                  updated_at = now()
              RETURNING (xmax = 0)",
        )
        .bind(&movie.title)
        .bind(movie.year)
        .bind(&movie.genre)
        .bind(&movie.director)
        .bind(&movie.actors)
        .bind(&movie.plot)
        .bind(&movie.poster_url)
        .fetch_one(&mut *tx)
        .await?;

        if inserted {
            summary.added += 1;
        } else {
            summary.updated += 1;
        }
    }
    tx.commit().await?;

    tracing::info!(added = summary.added, updated = summary.updated, "movie catalogue imported");
    Ok(summary)
}

#[cfg(test)]
#[path = "movie_test.rs"]
mod tests;
