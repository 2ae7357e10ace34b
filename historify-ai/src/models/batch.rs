//! Batch input and output types

use serde::{Deserialize, Serialize};

use super::AnalysisRecord;

/// One uploaded image as received from the client
#[derive(Debug, Clone)]
pub struct UploadedImage {
    /// Original filename, free text
    pub name: String,
    /// Raw file bytes
    pub bytes: Vec<u8>,
}

impl UploadedImage {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }
}

/// Enriched per-image result of a batch run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchItem {
    /// 1-based position in the submitted batch
    pub image_index: usize,
    pub image_name: String,
    /// Remote URL or `local_storage://` pseudo-URL; `None` when storage failed
    pub image_url: Option<String>,
    /// Backend id; `None` means the record was not saved
    pub database_id: Option<i64>,
    #[serde(flatten)]
    pub record: AnalysisRecord,
}
