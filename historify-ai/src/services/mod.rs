//! Service modules for image analysis
//!
//! External clients sit behind traits (`ImageStore`, `VisionAnalyzer`,
//! `GeoLookup`) so the orchestrator can be driven by fakes in tests.

pub mod batch_orchestrator;
pub mod export;
pub mod geo_lookup;
pub mod image_store;
pub mod reference_links;
pub mod vision_analyzer;

pub use batch_orchestrator::BatchOrchestrator;
pub use geo_lookup::{GeoError, GeoLookup, NominatimGeoLookup};
pub use image_store::{FirebaseImageStore, FirebaseSettings, ImageStore, ImageStoreError, PreparedImage};
pub use reference_links::ReferenceLinkBuilder;
pub use vision_analyzer::{ImageMetadata, OpenAiSettings, OpenAiVisionAnalyzer, VisionAnalyzer, VisionError};
