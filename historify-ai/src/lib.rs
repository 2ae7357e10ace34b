//! historify-ai library interface
//!
//! Historical image analysis service: vision-model inference, result
//! validation, multi-backend persistence and the HTTP JSON API.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod validators;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::db::PersistenceFacade;
use crate::services::{BatchOrchestrator, GeoLookup, ImageStore, VisionAnalyzer};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub persistence: PersistenceFacade,
    pub orchestrator: Arc<BatchOrchestrator>,
    pub vision: Arc<dyn VisionAnalyzer>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last analysis failure for diagnostic purposes
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(
        persistence: PersistenceFacade,
        image_store: Arc<dyn ImageStore>,
        vision: Arc<dyn VisionAnalyzer>,
        geo: Arc<dyn GeoLookup>,
    ) -> Self {
        let orchestrator = Arc::new(BatchOrchestrator::new(
            image_store,
            Arc::clone(&vision),
            geo,
            persistence.clone(),
        ));

        Self {
            persistence,
            orchestrator,
            vision,
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }

    pub async fn record_error(&self, message: impl Into<String>) {
        *self.last_error.write().await = Some(message.into());
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::analyze_routes())
        .merge(api::record_routes())
        .merge(api::export_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
