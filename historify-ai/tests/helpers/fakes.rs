//! Hand-written fakes of the service traits

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use historify_ai::db::{AnalysisStore, BackendKind, StoreError};
use historify_ai::models::{AnalysisRecord, DatabaseStats, Gps, HistoryEntry};
use historify_ai::services::{
    GeoError, GeoLookup, ImageMetadata, ImageStore, ImageStoreError, PreparedImage,
    VisionAnalyzer, VisionError,
};
use historify_ai::validators::ResultValidator;

/// Vision client returning canned responses, failing on selected calls
#[derive(Default)]
pub struct FakeVision {
    responses: Vec<Value>,
    /// 1-based call numbers that fail
    fail_on: HashSet<usize>,
    calls: AtomicUsize,
}

impl FakeVision {
    pub fn with_responses(responses: Vec<Value>) -> Self {
        Self {
            responses,
            ..Self::default()
        }
    }

    pub fn failing_on(mut self, calls: &[usize]) -> Self {
        self.fail_on = calls.iter().copied().collect();
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn next(&self) -> Result<AnalysisRecord, VisionError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_on.contains(&call) {
            return Err(VisionError::ApiError(503, format!("model overloaded on call {}", call)));
        }
        let raw = self
            .responses
            .get(call - 1)
            .or_else(|| self.responses.last())
            .cloned()
            .unwrap_or(Value::Null);
        Ok(ResultValidator::validate(&raw))
    }
}

#[async_trait]
impl VisionAnalyzer for FakeVision {
    async fn analyze_image(&self, _jpeg: &[u8]) -> Result<AnalysisRecord, VisionError> {
        self.next()
    }

    async fn infer_from_metadata(&self, _metadata: &ImageMetadata) -> Result<AnalysisRecord, VisionError> {
        self.next()
    }
}

/// Image store returning deterministic remote URLs
#[derive(Default)]
pub struct FakeImageStore {
    pub fail: bool,
    pub stored: Mutex<Vec<String>>,
}

impl FakeImageStore {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl ImageStore for FakeImageStore {
    async fn store(&self, _image: &PreparedImage, object_name: &str) -> Result<String, ImageStoreError> {
        if self.fail {
            return Err(ImageStoreError::UploadError(500, "bucket unavailable".to_string()));
        }
        self.stored
            .lock()
            .expect("lock stored names")
            .push(object_name.to_string());
        Ok(format!("https://storage.test/{}", object_name))
    }
}

/// Geocoder resolving every location to one point
pub struct FakeGeo {
    pub result: Option<Gps>,
    pub fail: bool,
    pub lookups: AtomicUsize,
}

impl Default for FakeGeo {
    fn default() -> Self {
        Self {
            result: Gps::new(48.8566, 2.3522),
            fail: false,
            lookups: AtomicUsize::new(0),
        }
    }
}

impl FakeGeo {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl GeoLookup for FakeGeo {
    async fn lookup(&self, _location_name: &str) -> Result<Option<Gps>, GeoError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(GeoError::Timeout(3));
        }
        Ok(self.result)
    }
}

/// Backend whose every operation fails
pub struct FailingStore;

#[async_trait]
impl AnalysisStore for FailingStore {
    fn kind(&self) -> BackendKind {
        BackendKind::Supabase
    }

    async fn save(&self, _: &AnalysisRecord, _: &str, _: Option<&str>) -> Result<i64, StoreError> {
        Err(StoreError::ApiError(500, "insert failed".to_string()))
    }

    async fn history(&self, _: u32) -> Result<Vec<HistoryEntry>, StoreError> {
        Err(StoreError::NetworkError("connection reset".to_string()))
    }

    async fn search(&self, _: &str, _: u32) -> Result<Vec<HistoryEntry>, StoreError> {
        Err(StoreError::NetworkError("connection reset".to_string()))
    }

    async fn get_by_id(&self, _: i64) -> Result<Option<AnalysisRecord>, StoreError> {
        Err(StoreError::ParseError("bad row".to_string()))
    }

    async fn stats(&self) -> Result<DatabaseStats, StoreError> {
        Err(StoreError::ApiError(401, "unauthorized".to_string()))
    }
}
