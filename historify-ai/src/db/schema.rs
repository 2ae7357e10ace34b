//! Stored schema for analysis results
//!
//! One flat row per record. `raw_result` holds the full validated record as
//! JSON and is the source of truth for `get_by_id`; the other columns exist
//! for listing, search and statistics.

use serde::Serialize;
use serde_json::Value;

use crate::models::AnalysisRecord;

/// Table used by the relational backends
pub const TABLE_NAME: &str = "analysis_results";

/// Columns returned by history and search
pub const HISTORY_COLUMNS: &str =
    "id, image_name, title, event, location_name, year, exact_date, ai_generated_probability, created_at";

// ============================================================================
// DDL
// ============================================================================

pub const SQLITE_CREATE_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS analysis_results (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        image_name TEXT,
        title TEXT,
        event TEXT,
        description TEXT,
        location_name TEXT,
        gps_lat REAL,
        gps_lon REAL,
        year INTEGER,
        exact_date TEXT,
        ai_generated_probability INTEGER,
        ai_analysis TEXT,
        extracted_text TEXT,
        visual_elements TEXT,
        confidence_year INTEGER,
        confidence_location INTEGER,
        confidence_event INTEGER,
        confidence_exact_date INTEGER,
        wikipedia_search_url TEXT,
        wikipedia_direct_url TEXT,
        image_url TEXT,
        prompt TEXT,
        celebrity INTEGER NOT NULL DEFAULT 0,
        celebrity_name TEXT,
        raw_result TEXT NOT NULL,
        created_at TEXT NOT NULL
    )
"#;

pub const SQLITE_CREATE_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_analysis_results_created_at ON analysis_results (created_at)";

pub const POSTGRES_CREATE_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS analysis_results (
        id BIGSERIAL PRIMARY KEY,
        image_name VARCHAR(255),
        title VARCHAR(500),
        event VARCHAR(500),
        description TEXT,
        location_name VARCHAR(255),
        gps_lat DOUBLE PRECISION,
        gps_lon DOUBLE PRECISION,
        year INTEGER,
        exact_date TEXT,
        ai_generated_probability INTEGER,
        ai_analysis TEXT,
        extracted_text TEXT,
        visual_elements TEXT,
        confidence_year INTEGER,
        confidence_location INTEGER,
        confidence_event INTEGER,
        confidence_exact_date INTEGER,
        wikipedia_search_url TEXT,
        wikipedia_direct_url TEXT,
        image_url TEXT,
        prompt TEXT,
        celebrity BOOLEAN NOT NULL DEFAULT FALSE,
        celebrity_name TEXT,
        raw_result JSONB NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
"#;

pub const POSTGRES_CREATE_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_analysis_results_created_at ON analysis_results (created_at)";

/// Column list for INSERT, in [`RecordRow`] bind order
pub const INSERT_COLUMNS: &str = "image_name, title, event, description, location_name, gps_lat, gps_lon, \
    year, exact_date, ai_generated_probability, ai_analysis, extracted_text, visual_elements, \
    confidence_year, confidence_location, confidence_event, confidence_exact_date, \
    wikipedia_search_url, wikipedia_direct_url, image_url, prompt, celebrity, celebrity_name, raw_result";

/// Number of columns in [`INSERT_COLUMNS`]
pub const INSERT_COLUMN_COUNT: usize = 24;

// ============================================================================
// Row mapping
// ============================================================================

/// Flattened column values for one record
///
/// Serializes directly as the PostgREST insert body.
#[derive(Debug, Clone, Serialize)]
pub struct RecordRow {
    pub image_name: String,
    pub title: String,
    pub event: String,
    pub description: String,
    pub location_name: String,
    pub gps_lat: Option<f64>,
    pub gps_lon: Option<f64>,
    pub year: Option<i32>,
    pub exact_date: String,
    pub ai_generated_probability: i32,
    pub ai_analysis: String,
    pub extracted_text: String,
    /// JSON text of the string or list
    pub visual_elements: String,
    pub confidence_year: i32,
    pub confidence_location: i32,
    pub confidence_event: i32,
    pub confidence_exact_date: i32,
    pub wikipedia_search_url: Option<String>,
    pub wikipedia_direct_url: Option<String>,
    pub image_url: Option<String>,
    pub prompt: String,
    pub celebrity: bool,
    pub celebrity_name: Option<String>,
    pub raw_result: Value,
}

impl RecordRow {
    pub fn new(
        record: &AnalysisRecord,
        image_name: &str,
        image_url: Option<&str>,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            image_name: image_name.to_string(),
            title: record.title.clone(),
            event: record.event.clone(),
            description: record.description.clone(),
            location_name: record.location_name.clone(),
            gps_lat: record.gps.map(|g| g.latitude()),
            gps_lon: record.gps.map(|g| g.longitude()),
            year: record.year.as_column(),
            exact_date: record.exact_date.clone(),
            ai_generated_probability: record.ai_generated_probability as i32,
            ai_analysis: record.ai_analysis.clone(),
            extracted_text: record.extracted_text.clone(),
            visual_elements: serde_json::to_string(&record.visual_elements)?,
            confidence_year: record.confidence.year as i32,
            confidence_location: record.confidence.location as i32,
            confidence_event: record.confidence.event as i32,
            confidence_exact_date: record.confidence.exact_date as i32,
            wikipedia_search_url: record.wikipedia.as_ref().map(|w| w.search_url.clone()),
            wikipedia_direct_url: record.wikipedia.as_ref().map(|w| w.direct_url.clone()),
            image_url: image_url.map(str::to_string),
            prompt: record.prompt.clone(),
            celebrity: record.celebrity,
            celebrity_name: record.celebrity_name.clone(),
            raw_result: serde_json::to_value(record)?,
        })
    }
}

/// Escape `%`, `_` and `\` so a query matches literally under `ESCAPE '\'`
pub fn escape_like(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len() + 2);
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// `%<escaped query>%`; case folding is left to `LIKE` / `ILIKE`
pub fn like_pattern(query: &str) -> String {
    format!("%{}%", escape_like(query))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Gps, VisualElements, Year};

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("100%"), "100\\%");
        assert_eq!(escape_like("a_b\\c"), "a\\_b\\\\c");
        assert_eq!(like_pattern("New York "), "%New York %");
    }

    #[test]
    fn test_row_maps_unknown_year_to_null() {
        let record = AnalysisRecord::default();
        let row = RecordRow::new(&record, "photo.jpg", None).unwrap();
        assert_eq!(row.year, None);
        assert_eq!(row.visual_elements, "[]");
        assert_eq!(row.confidence_year, 50);
        assert!(row.gps_lat.is_none());
    }

    #[test]
    fn test_row_flattens_enrichment() {
        let record = AnalysisRecord {
            year: Year::Known(1989),
            gps: Gps::new(52.52, 13.405),
            visual_elements: VisualElements::Text("wall, crowd".to_string()),
            ..AnalysisRecord::default()
        };
        let row = RecordRow::new(&record, "wall.png", Some("local_storage:///tmp/x.jpg")).unwrap();

        assert_eq!(row.year, Some(1989));
        assert_eq!(row.gps_lat, Some(52.52));
        assert_eq!(row.visual_elements, "\"wall, crowd\"");
        assert_eq!(row.raw_result["year"], 1989);
        assert_eq!(row.image_url.as_deref(), Some("local_storage:///tmp/x.jpg"));
    }

    #[test]
    fn test_insert_column_count_matches() {
        assert_eq!(INSERT_COLUMNS.split(',').count(), INSERT_COLUMN_COUNT);
    }
}
