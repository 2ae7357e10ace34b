//! Analysis API handlers
//!
//! POST /analyze (multipart batch), POST /infer (metadata only)

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    routing::post,
    Json, Router,
};
use tracing::{info, warn};

use crate::{
    error::{ApiError, ApiResult},
    models::{analysis_record::ERROR_TITLE, AnalysisRecord, BatchItem, UploadedImage},
    services::ImageMetadata,
    AppState,
};

/// Upper bound on a multipart request body
const MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

/// POST /analyze
///
/// Every multipart field is treated as one image, in upload order. Empty or
/// unsupported files come back as analysis-error items.
pub async fn analyze_images(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<Vec<BatchItem>>> {
    let mut images = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        let name = field
            .file_name()
            .or_else(|| field.name())
            .map(str::to_string)
            .unwrap_or_else(|| format!("image_{}", images.len() + 1));

        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Failed to read upload {}: {}", name, e)))?;

        images.push(UploadedImage::new(name, bytes.to_vec()));
    }

    if images.is_empty() {
        return Err(ApiError::BadRequest("No images uploaded".to_string()));
    }

    info!(count = images.len(), "Received analysis request");

    let items = state.orchestrator.process_batch(&images).await;

    if let Some(failed) = items.iter().rev().find(|item| item.record.title == ERROR_TITLE) {
        state
            .record_error(format!("{}: {}", failed.image_name, failed.record.description))
            .await;
    }

    Ok(Json(items))
}

/// POST /infer
///
/// Runs the text-only path on caller-supplied metadata. The result is not
/// persisted; a failed call returns the analysis-error record.
pub async fn infer_from_metadata(
    State(state): State<AppState>,
    Json(metadata): Json<ImageMetadata>,
) -> ApiResult<Json<AnalysisRecord>> {
    if metadata.caption.trim().is_empty()
        && metadata.extracted_text.trim().is_empty()
        && metadata.detected_objects.is_empty()
    {
        return Err(ApiError::BadRequest(
            "At least one of caption, extracted_text or detected_objects is required".to_string(),
        ));
    }

    let record = match state.vision.infer_from_metadata(&metadata).await {
        Ok(record) => record,
        Err(e) => {
            warn!(error = %e, "Metadata inference failed");
            state.record_error(e.to_string()).await;
            AnalysisRecord::analysis_error(e)
        }
    };

    Ok(Json(record))
}

/// Build analysis routes
pub fn analyze_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/analyze",
            post(analyze_images).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/infer", post(infer_from_metadata))
}
