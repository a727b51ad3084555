//! HTTP service exposing author search, daily browsing, profiles, category
//! preferences and search history as JSON endpoints.
//!
//! Every failure is reported as `{"success": false, "error": ..., "kind": ...}`
//! so clients can tell a failed fetch apart from an empty result.

pub mod server;

pub use server::{router, run};

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use std::sync::Arc;

use crate::client::{ArxivClient, PaperSource};
use crate::config::AppConfig;
use crate::error::{QueryError, SearchError, StorageError};
use crate::storage::FileStorage;

/// Shared state handed to every handler.
pub struct AppState {
    pub source: Arc<dyn PaperSource>,
    pub storage: Arc<FileStorage>,
    /// Fresh cached daily results are served without hitting arXiv.
    pub cache_max_age: chrono::Duration,
}

impl AppState {
    pub fn new(source: Arc<dyn PaperSource>, storage: Arc<FileStorage>, config: &AppConfig) -> Self {
        let hours = i64::try_from(config.storage.cache_max_age_hours).unwrap_or(i64::MAX / 3600);
        Self {
            source,
            storage,
            cache_max_age: chrono::Duration::hours(hours),
        }
    }

    /// State backed by the live arXiv client and on-disk storage.
    pub fn from_config(config: &AppConfig) -> crate::error::Result<Self> {
        let client = ArxivClient::new(&config.arxiv, config.retry.clone())?;
        let storage = FileStorage::from_config(&config.storage)?;
        Ok(Self::new(Arc::new(client), Arc::new(storage), config))
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("storage", &self.storage.root())
            .field("cache_max_age", &self.cache_max_age)
            .finish()
    }
}

pub type SharedState = Arc<AppState>;

fn default_max_results() -> i64 {
    50
}

/// Body of `POST /papers/by-author`.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthorSearchBody {
    pub author_id: String,
    #[serde(default = "default_max_results")]
    pub max_results: i64,
    #[serde(default)]
    pub sort_by: Option<String>,
    #[serde(default)]
    pub sort_order: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
}

/// Body of `POST /papers/daily`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DailySearchBody {
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub date_range: Option<String>,
    #[serde(default)]
    pub sort_by: Option<String>,
    #[serde(default)]
    pub sort_order: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
}

/// Query string of `GET /history`.
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryParams {
    #[serde(default = "default_history_limit")]
    pub limit: usize,
}

fn default_history_limit() -> usize {
    20
}

/// Error responses, tagged by the layer that failed.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Transport(String),

    #[error("{0}")]
    Storage(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Transport(_) => StatusCode::BAD_GATEWAY,
            ApiError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "validation",
            ApiError::Transport(_) => "transport",
            ApiError::Storage(_) => "storage",
        }
    }
}

impl From<QueryError> for ApiError {
    fn from(err: QueryError) -> Self {
        ApiError::Validation(err.to_string())
    }
}

impl From<SearchError> for ApiError {
    fn from(err: SearchError) -> Self {
        match err {
            SearchError::Validation(e) => ApiError::Validation(e.to_string()),
            SearchError::Transport(e) => ApiError::Transport(e.to_string()),
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::InvalidKey { .. } => ApiError::Validation(err.to_string()),
            other => ApiError::Storage(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::Validation(_) => tracing::debug!(error = %self, "Rejected request"),
            _ => tracing::error!(kind = self.kind(), error = %self, "Request failed"),
        }
        let body = serde_json::json!({
            "success": false,
            "error": self.to_string(),
            "kind": self.kind(),
        });
        (self.status(), Json(body)).into_response()
    }
}
