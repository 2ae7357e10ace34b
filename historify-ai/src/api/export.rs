//! Export API handlers
//!
//! GET /records/:id/export, POST /export

use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

use crate::{
    error::{ApiError, ApiResult},
    models::BatchItem,
    services::export::{self, ExportFile},
    AppState,
};

fn attachment(file: ExportFile) -> Response {
    (
        [
            (header::CONTENT_TYPE, "application/json".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file.filename),
            ),
        ],
        file.contents,
    )
        .into_response()
}

/// GET /records/:id/export
pub async fn export_record(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Response> {
    let record = state
        .persistence
        .get_by_id(id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("Analysis result {}", id)))?;

    Ok(attachment(export::export_record(id, &record)?))
}

/// POST /export
pub async fn export_batch(Json(items): Json<Vec<BatchItem>>) -> ApiResult<Response> {
    let file = export::export_batch(&items, &historify_common::time::now())?;
    tracing::debug!(count = items.len(), filename = %file.filename, "Exporting batch results");
    Ok(attachment(file))
}

/// Build export routes
pub fn export_routes() -> Router<AppState> {
    Router::new()
        .route("/records/:id/export", get(export_record))
        .route("/export", post(export_batch))
}
