//! Batch orchestrator
//!
//! Runs each uploaded image through the pipeline, strictly one at a time:
//!
//! PREPARE → STORE → ANALYZE → GEOCODE → LINK → PERSIST
//!
//! Every step failure is substituted with its typed default, so the output
//! always has one item per input, in input order.

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::db::PersistenceFacade;
use crate::models::{AnalysisRecord, BatchItem, UploadedImage};
use crate::services::geo_lookup::GeoLookup;
use crate::services::image_store::{self, ImageStore};
use crate::services::reference_links::ReferenceLinkBuilder;
use crate::services::vision_analyzer::VisionAnalyzer;

pub struct BatchOrchestrator {
    image_store: Arc<dyn ImageStore>,
    vision: Arc<dyn VisionAnalyzer>,
    geo: Arc<dyn GeoLookup>,
    persistence: PersistenceFacade,
}

impl BatchOrchestrator {
    pub fn new(
        image_store: Arc<dyn ImageStore>,
        vision: Arc<dyn VisionAnalyzer>,
        geo: Arc<dyn GeoLookup>,
        persistence: PersistenceFacade,
    ) -> Self {
        Self {
            image_store,
            vision,
            geo,
            persistence,
        }
    }

    /// Process all images sequentially
    pub async fn process_batch(&self, images: &[UploadedImage]) -> Vec<BatchItem> {
        info!(count = images.len(), "Starting batch analysis");

        let mut items = Vec::with_capacity(images.len());
        for (offset, image) in images.iter().enumerate() {
            items.push(self.process_image(image, offset + 1).await);
        }

        let saved = items.iter().filter(|item| item.database_id.is_some()).count();
        info!(count = items.len(), saved, "Batch analysis complete");

        items
    }

    /// Process one image; `index` is 1-based
    pub async fn process_image(&self, image: &UploadedImage, index: usize) -> BatchItem {
        debug!(index, image = %image.name, bytes = image.bytes.len(), "Processing image");

        let (image_url, mut record) = match image_store::prepare_image(&image.bytes) {
            Ok(prepared) => {
                let stamp = historify_common::time::file_stamp(&historify_common::time::now());
                let object_name = image_store::object_name(&image.name, index, &stamp);

                let image_url = match self.image_store.store(&prepared, &object_name).await {
                    Ok(url) => Some(url),
                    Err(e) => {
                        warn!(index, image = %image.name, error = %e, "Image storage failed");
                        None
                    }
                };

                let record = match self.vision.analyze_image(&prepared.jpeg).await {
                    Ok(record) => record,
                    Err(e) => {
                        warn!(index, image = %image.name, error = %e, "Vision analysis failed");
                        AnalysisRecord::analysis_error(e)
                    }
                };

                (image_url, record)
            }
            Err(e) => {
                warn!(index, image = %image.name, error = %e, "Image could not be prepared");
                (None, AnalysisRecord::analysis_error(e))
            }
        };

        if record.has_known_location() {
            match self.geo.lookup(&record.location_name).await {
                Ok(Some(gps)) => record.gps = Some(gps),
                Ok(None) => debug!(location = %record.location_name, "Location not geocoded"),
                Err(e) => warn!(location = %record.location_name, error = %e, "Geocoding failed"),
            }
        }

        if record.has_identified_event() {
            record.wikipedia = ReferenceLinkBuilder::build(&record.event, &record.location_name);
        }

        let database_id = self
            .persistence
            .save(&record, &image.name, image_url.as_deref())
            .await;

        if database_id.is_none() {
            warn!(index, image = %image.name, "Analysis result was not persisted");
        }

        BatchItem {
            image_index: index,
            image_name: image.name.clone(),
            image_url,
            database_id,
            record,
        }
    }
}
