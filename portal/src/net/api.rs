//! HTTP client for the movie API server.
//!
//! ERROR HANDLING
//! ==============
//! Non-success responses become [`BackendError::Api`] carrying the server's
//! `{"detail": ...}` message (or the status reason when the body has none),
//! so callers can branch on status without parsing text.

#[cfg(test)]
#[path = "api_test.rs"]
mod api_test;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use super::types::{
    AdminOverview, ApiKeyRecord, DashboardData, LoginKind, LoginResponse, Movie, MoviePage, RegisterRequest,
    SearchQuery, SearchResults, UsageStats, User,
};
use super::{AuthBackend, BackendError, PortalData};

const API_KEY_HEADER: &str = "X-API-KEY";

#[derive(Deserialize)]
struct ErrorBody {
    detail: String,
}

/// Build the error for a non-success response body.
pub(crate) fn error_from_body(status: StatusCode, body: &[u8]) -> BackendError {
    let detail = serde_json::from_slice::<ErrorBody>(body)
        .map(|b| b.detail)
        .unwrap_or_else(|_| status.canonical_reason().unwrap_or("request failed").to_owned());
    BackendError::Api { status: status.as_u16(), detail }
}

/// Normalise and validate a server base URL.
pub(crate) fn normalize_base_url(base_url: &str) -> Result<String, BackendError> {
    let trimmed = base_url.trim().trim_end_matches('/');
    let has_host = trimmed
        .strip_prefix("http://")
        .or_else(|| trimmed.strip_prefix("https://"))
        .is_some_and(|rest| !rest.is_empty());
    if !has_host {
        return Err(BackendError::InvalidBaseUrl(base_url.to_owned()));
    }
    Ok(trimmed.to_owned())
}

#[derive(Clone, Debug)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl ApiClient {
    /// # Errors
    ///
    /// Returns [`BackendError::InvalidBaseUrl`] unless `base_url` is an
    /// `http://` or `https://` URL with a host.
    pub fn new(base_url: &str) -> Result<Self, BackendError> {
        Ok(Self { http: reqwest::Client::new(), base_url: normalize_base_url(base_url)?, api_key: None })
    }

    /// Attach the `X-API-KEY` used by the movie endpoints.
    #[must_use]
    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|k| !k.trim().is_empty());
        self
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http.request(method, self.url(path))
    }

    fn keyed(&self, path: &str) -> RequestBuilder {
        let request = self.request(Method::GET, path);
        match &self.api_key {
            Some(key) => request.header(API_KEY_HEADER, key),
            None => request,
        }
    }

    async fn send(request: RequestBuilder) -> Result<reqwest::Response, BackendError> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.bytes().await.unwrap_or_default();
        Err(error_from_body(status, &body))
    }

    async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, BackendError> {
        Ok(Self::send(request).await?.json::<T>().await?)
    }

    // =========================================================================
    // MOVIE API (X-API-KEY)
    // =========================================================================

    /// # Errors
    ///
    /// Returns the server's rejection (missing key, quota, page out of range).
    pub async fn list_movies(&self, page: i64, per_page: i64) -> Result<MoviePage, BackendError> {
        let request = self.keyed("/movies").query(&[("page", page), ("per_page", per_page)]);
        Self::send_json(request).await
    }

    /// # Errors
    ///
    /// Returns the server's rejection, including 404 for an unknown id.
    pub async fn get_movie(&self, id: i64) -> Result<Movie, BackendError> {
        Self::send_json(self.keyed(&format!("/movies/{id}"))).await
    }

    /// # Errors
    ///
    /// Returns the server's rejection, including 400 for an empty query.
    pub async fn search_movies(&self, query: &SearchQuery) -> Result<SearchResults, BackendError> {
        Self::send_json(self.keyed("/search").query(query)).await
    }

    /// # Errors
    ///
    /// Returns the server's rejection for a missing or invalid key.
    pub async fn key_stats(&self) -> Result<UsageStats, BackendError> {
        Self::send_json(self.keyed("/api-key/stats")).await
    }

    // =========================================================================
    // DEVELOPER API (session)
    // =========================================================================

    /// Issue another key for the signed-in developer.
    ///
    /// # Errors
    ///
    /// Returns 409 from the server once the per-user key cap is reached.
    pub async fn generate_key(&self, token: &str) -> Result<ApiKeyRecord, BackendError> {
        Self::send_json(self.request(Method::POST, "/api/dev/api-keys").bearer_auth(token)).await
    }
}

#[async_trait]
impl AuthBackend for ApiClient {
    async fn login(&self, kind: LoginKind, email: &str, password: &str) -> Result<LoginResponse, BackendError> {
        let path = match kind {
            LoginKind::Developer => "/api/auth/login",
            LoginKind::Admin => "/admin/login",
        };
        let body = serde_json::json!({ "email": email, "password": password });
        Self::send_json(self.request(Method::POST, path).json(&body)).await
    }

    async fn logout(&self, token: &str) -> Result<(), BackendError> {
        Self::send(self.request(Method::POST, "/api/auth/logout").bearer_auth(token)).await?;
        Ok(())
    }

    async fn register(&self, request: &RegisterRequest) -> Result<(), BackendError> {
        Self::send(self.request(Method::POST, "/api/auth/register").json(request)).await?;
        Ok(())
    }

    async fn verify_email(&self, email: &str, code: &str) -> Result<(), BackendError> {
        let body = serde_json::json!({ "email": email, "code": code });
        Self::send(self.request(Method::POST, "/api/auth/verify").json(&body)).await?;
        Ok(())
    }

    async fn current_user(&self, token: &str) -> Result<User, BackendError> {
        Self::send_json(self.request(Method::GET, "/api/auth/me").bearer_auth(token)).await
    }
}

#[async_trait]
impl PortalData for ApiClient {
    async fn dashboard(&self, token: &str) -> Result<DashboardData, BackendError> {
        Self::send_json(self.request(Method::GET, "/api/dev/dashboard").bearer_auth(token)).await
    }

    async fn admin_overview(&self, token: &str) -> Result<AdminOverview, BackendError> {
        Self::send_json(self.request(Method::GET, "/admin/stats").bearer_auth(token)).await
    }
}
