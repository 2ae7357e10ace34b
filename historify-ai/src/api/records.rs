//! Stored record API handlers
//!
//! GET /history, GET /search, GET /records/:id, GET /stats

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    error::{ApiError, ApiResult},
    models::{AnalysisRecord, HistoryEntry},
    AppState,
};

pub const DEFAULT_HISTORY_LIMIT: u32 = 50;
pub const DEFAULT_SEARCH_LIMIT: u32 = 20;
pub const MAX_LIMIT: u32 = 500;

/// GET /history query
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<u32>,
}

/// GET /search query
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
    pub limit: Option<u32>,
}

fn clamp_limit(limit: Option<u32>, default: u32) -> u32 {
    limit.unwrap_or(default).clamp(1, MAX_LIMIT)
}

/// GET /history
pub async fn get_history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Json<Vec<HistoryEntry>> {
    let limit = clamp_limit(query.limit, DEFAULT_HISTORY_LIMIT);
    Json(state.persistence.history(limit).await)
}

/// GET /search
pub async fn search_records(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<Vec<HistoryEntry>>> {
    if query.q.trim().is_empty() {
        return Err(ApiError::BadRequest("Query parameter q must not be blank".to_string()));
    }

    let limit = clamp_limit(query.limit, DEFAULT_SEARCH_LIMIT);
    Ok(Json(state.persistence.search(&query.q, limit).await))
}

/// GET /records/:id
pub async fn get_record(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<AnalysisRecord>> {
    state
        .persistence
        .get_by_id(id)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Analysis result {}", id)))
}

/// GET /stats
///
/// `{}` when statistics could not be computed.
pub async fn get_stats(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let body = match state.persistence.stats().await {
        Some(stats) => serde_json::to_value(stats)?,
        None => json!({}),
    };
    Ok(Json(body))
}

/// Build record routes
pub fn record_routes() -> Router<AppState> {
    Router::new()
        .route("/history", get(get_history))
        .route("/search", get(search_records))
        .route("/records/:id", get(get_record))
        .route("/stats", get(get_stats))
}
