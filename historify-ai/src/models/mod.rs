//! Data models for historify-ai

pub mod analysis_record;
pub mod batch;
pub mod history;

pub use analysis_record::{
    AnalysisRecord, Confidence, Gps, VisualElements, WikipediaLinks, Year, UNKNOWN,
};
pub use batch::{BatchItem, UploadedImage};
pub use history::{DatabaseStats, HistoryEntry};
