//! Test Helper Utilities
//!
//! Shared fakes and fixtures for testing historify-ai

#![allow(dead_code)]

pub mod fakes;
pub mod postgrest;

use std::io::Cursor;
use std::sync::Arc;

use historify_ai::db::{PersistenceFacade, SqliteStore};
use historify_ai::models::UploadedImage;
use historify_ai::{build_router, AppState};
use image::{DynamicImage, ImageOutputFormat, Rgb, RgbImage};
use serde_json::Value;

pub use fakes::{FailingStore, FakeGeo, FakeImageStore, FakeVision};

/// Encode a solid-colour PNG
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb([120, 110, 90]));
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut out, ImageOutputFormat::Png)
        .expect("encode test PNG");
    out.into_inner()
}

pub fn png_upload(name: &str) -> UploadedImage {
    UploadedImage::new(name, png_bytes(32, 24))
}

/// SQLite-backed facade in a fresh temp directory
pub async fn sqlite_facade() -> (tempfile::TempDir, PersistenceFacade) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let store = SqliteStore::connect(&dir.path().join("historical_analysis.db"))
        .await
        .expect("open SQLite store");
    (dir, PersistenceFacade::from_store(Arc::new(store)))
}

/// Router over SQLite plus fakes; `responses` are returned by the fake vision client in order
pub async fn create_test_app(responses: Vec<Value>) -> (axum::Router, AppState, tempfile::TempDir) {
    let (dir, persistence) = sqlite_facade().await;

    let state = AppState::new(
        persistence,
        Arc::new(FakeImageStore::default()),
        Arc::new(FakeVision::with_responses(responses)),
        Arc::new(FakeGeo::default()),
    );

    (build_router(state.clone()), state, dir)
}
