//! JSON export of analysis results

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Pretty-printed export document and its download name
#[derive(Debug, Clone)]
pub struct ExportFile {
    pub filename: String,
    pub contents: String,
}

/// Export of a posted batch: `historical_analysis_<unix-ts>.json`
pub fn export_batch<T: Serialize>(items: &T, at: &DateTime<Utc>) -> Result<ExportFile, serde_json::Error> {
    Ok(ExportFile {
        filename: format!("historical_analysis_{}.json", at.timestamp()),
        contents: serde_json::to_string_pretty(items)?,
    })
}

/// Export of one stored record: `historical_analysis_<id>.json`
pub fn export_record<T: Serialize>(id: i64, record: &T) -> Result<ExportFile, serde_json::Error> {
    Ok(ExportFile {
        filename: format!("historical_analysis_{}.json", id),
        contents: serde_json::to_string_pretty(record)?,
    })
}
