//! Router, handlers and listener for the HTTP service.

use axum::{
    Json, Router,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    routing::{get, post},
};
use chrono::Utc;
use serde_json::{Value, json};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::{ApiError, AuthorSearchBody, DailySearchBody, HistoryParams, SharedState};
use crate::config::ServerConfig;
use crate::query::{self, ArxivQuery};
use crate::sort::{SortKey, SortOrder, sort_papers};
use crate::storage::cache_id_for;
use crate::types::{
    CategoryPreferences, PaperRecord, SearchHistoryEntry, SearchMode, SearchRequest, UserProfile,
};

/// Build the service router.
pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/papers/by-author", post(author_handler))
        .route("/papers/daily", post(daily_handler))
        .route("/profile", post(save_profile_handler))
        .route("/profile/{user_id}", get(get_profile_handler))
        .route("/profiles", get(list_profiles_handler))
        .route(
            "/categories/{user_id}",
            get(get_categories_handler).put(put_categories_handler),
        )
        .route("/history", get(history_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind the configured address and serve until Ctrl-C.
pub async fn run(state: SharedState, config: &ServerConfig) -> crate::error::Result<()> {
    let app = router(state);
    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "arXiv Agent service listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}

fn papers_response(papers: Vec<PaperRecord>, cached: bool) -> Json<Value> {
    Json(json!({
        "success": true,
        "count": papers.len(),
        "cached": cached,
        "papers": papers,
    }))
}

/// `sort_by` absent keeps upstream order; `sort_order` defaults to descending.
fn parse_sort(
    sort_by: Option<&str>,
    sort_order: Option<&str>,
) -> Result<Option<(SortKey, SortOrder)>, ApiError> {
    let Some(sort_by) = sort_by else {
        return Ok(None);
    };
    let key = SortKey::from_str_loose(sort_by)
        .ok_or_else(|| ApiError::Validation(format!("Unknown sort_by '{}'", sort_by)))?;
    let order = match sort_order {
        Some(raw) => SortOrder::from_str_loose(raw)
            .ok_or_else(|| ApiError::Validation(format!("Unknown sort_order '{}'", raw)))?,
        None => SortOrder::default(),
    };
    Ok(Some((key, order)))
}

fn record_history(
    state: &SharedState,
    user_id: Option<String>,
    mode: SearchMode,
    query: &ArxivQuery,
    result_count: usize,
) {
    let entry = SearchHistoryEntry {
        timestamp: Utc::now(),
        user_id,
        mode,
        query: query.search_query.clone(),
        result_count,
    };
    if let Err(e) = state.storage.record_search(entry) {
        tracing::warn!(error = %e, "Failed to record search history");
    }
}

async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn author_handler(
    State(state): State<SharedState>,
    body: Result<Json<AuthorSearchBody>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(body) = body.map_err(|e| ApiError::Validation(e.body_text()))?;
    let sort = parse_sort(body.sort_by.as_deref(), body.sort_order.as_deref())?;
    let query = query::author_query(&body.author_id, body.max_results)?;

    let request = SearchRequest::author(body.author_id.trim(), query.max_results);
    let mut papers = state.source.search(&request).await?;
    record_history(&state, body.user_id, SearchMode::Author, &query, papers.len());

    if let Some((key, order)) = sort {
        sort_papers(&mut papers, key, order);
    }
    Ok(papers_response(papers, false))
}

async fn daily_handler(
    State(state): State<SharedState>,
    body: Result<Json<DailySearchBody>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(body) = body.map_err(|e| ApiError::Validation(e.body_text()))?;
    let sort = parse_sort(body.sort_by.as_deref(), body.sort_order.as_deref())?;

    let categories = match body.user_id.as_deref() {
        Some(user_id) => {
            let prefs = state.storage.get_category_preferences(user_id)?;
            if prefs.hides_all(&body.categories) {
                tracing::info!(user_id, "Every requested category is hidden");
                return Ok(papers_response(Vec::new(), false));
            }
            prefs.visible(&body.categories)
        }
        None => body.categories.clone(),
    };

    let query = query::daily_query(&categories, body.date_range.as_deref())?;
    let cache_id = cache_id_for(&query);

    let cached = match state.storage.get_paper_cache(&cache_id, state.cache_max_age) {
        Ok(cached) => cached,
        Err(e) => {
            tracing::warn!(cache_id = %cache_id, error = %e, "Ignoring unreadable paper cache");
            None
        }
    };
    if let Some(mut papers) = cached {
        tracing::debug!(cache_id = %cache_id, papers = papers.len(), "Serving daily papers from cache");
        if let Some((key, order)) = sort {
            sort_papers(&mut papers, key, order);
        }
        return Ok(papers_response(papers, true));
    }

    let request = SearchRequest::daily(categories, body.date_range.clone());
    let mut papers = state.source.search(&request).await?;
    if !papers.is_empty() {
        if let Err(e) = state.storage.save_paper_cache(&cache_id, &papers) {
            tracing::warn!(cache_id = %cache_id, error = %e, "Failed to cache daily papers");
        }
    }
    record_history(&state, body.user_id, SearchMode::Daily, &query, papers.len());

    if let Some((key, order)) = sort {
        sort_papers(&mut papers, key, order);
    }
    Ok(papers_response(papers, false))
}

async fn get_profile_handler(
    State(state): State<SharedState>,
    Path(user_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let profile = state
        .storage
        .get_profile(&user_id)?
        .unwrap_or_else(|| UserProfile::new(user_id.as_str()));
    Ok(Json(json!({ "success": true, "profile": profile })))
}

async fn save_profile_handler(
    State(state): State<SharedState>,
    body: Result<Json<UserProfile>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(profile) = body.map_err(|e| ApiError::Validation(e.body_text()))?;
    let profile = UserProfile {
        user_id: profile.user_id.trim().to_string(),
        ..profile
    }
    .normalized();
    state.storage.save_profile(&profile)?;
    Ok(Json(json!({ "success": true, "profile": profile })))
}

async fn list_profiles_handler(State(state): State<SharedState>) -> Result<Json<Value>, ApiError> {
    let profiles = state.storage.list_profiles()?;
    Ok(Json(json!({ "success": true, "profiles": profiles })))
}

async fn get_categories_handler(
    State(state): State<SharedState>,
    Path(user_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let prefs = state.storage.get_category_preferences(&user_id)?;
    Ok(Json(json!({ "success": true, "hidden": prefs.hidden })))
}

async fn put_categories_handler(
    State(state): State<SharedState>,
    Path(user_id): Path<String>,
    body: Result<Json<CategoryPreferences>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(prefs) = body.map_err(|e| ApiError::Validation(e.body_text()))?;
    let prefs = CategoryPreferences {
        hidden: prefs
            .hidden
            .into_iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect(),
    };
    state.storage.save_category_preferences(&user_id, &prefs)?;
    tracing::info!(user_id = %user_id, hidden = prefs.hidden.len(), "Updated category preferences");
    Ok(Json(json!({ "success": true, "hidden": prefs.hidden })))
}

async fn history_handler(
    State(state): State<SharedState>,
    params: Result<Query<HistoryParams>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    let Query(params) = params.map_err(|e| ApiError::Validation(e.body_text()))?;
    let history = state.storage.search_history(params.limit)?;
    Ok(Json(json!({
        "success": true,
        "count": history.len(),
        "history": history,
    })))
}
