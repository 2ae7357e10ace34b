//! Result Validator
//!
//! Normalizes the decoded vision-model response into an [`AnalysisRecord`].
//!
//! The model is asked for structured JSON, but nothing guarantees the shape:
//! keys go missing, numbers arrive as strings, confidence can be a bare
//! number. Every consumer (storage, export, the API) needs a complete and
//! bounded record, so validation is exhaustive and never fails.
//!
//! # Field rules
//! - **Free text** (`title`, `event`, `description`, `location_name`,
//!   `exact_date`, `ai_analysis`, `extracted_text`, `prompt`): strings pass
//!   through unmodified, other scalars are rendered, anything else takes the
//!   default
//! - **year**: integer coercion; outside [1800, 2024] or unparseable becomes
//!   `"Unknown"`
//! - **confidence**: each of `year`, `location`, `event`, `exact_date` is
//!   coerced and clamped to [0, 100]; missing keys default to 50 (0 for
//!   `exact_date`); a non-object replaces the whole mapping with defaults
//! - **ai_generated_probability**: coerced and clamped to [0, 100], else 0
//! - **celebrity** / **celebrity_name**: boolean (default false) and nullable
//!   string
//! - **gps** / **wikipedia**: carried through when already well-formed, so a
//!   stored record re-validates to itself
//!
//! # Example
//! ```rust
//! use historify_ai::validators::ResultValidator;
//! use historify_ai::models::Year;
//! use serde_json::json;
//!
//! let record = ResultValidator::validate(&json!({"year": "1776"}));
//! assert_eq!(record.year, Year::Unknown);
//! assert_eq!(record.title, "Historical Event");
//! ```

use serde_json::{Map, Value};
use tracing::debug;

use super::coerce;
use crate::models::analysis_record::{
    DEFAULT_AI_ANALYSIS, DEFAULT_DESCRIPTION, DEFAULT_EVENT, DEFAULT_EXTRACTED_TEXT,
    DEFAULT_LOCATION, DEFAULT_TITLE,
};
use crate::models::{AnalysisRecord, Confidence, Gps, VisualElements, WikipediaLinks, Year, UNKNOWN};

/// Stateless validator for raw model output
pub struct ResultValidator;

impl ResultValidator {
    /// Validate an arbitrary JSON value
    ///
    /// A non-object input is treated as an empty mapping.
    pub fn validate(raw: &Value) -> AnalysisRecord {
        static EMPTY: std::sync::OnceLock<Map<String, Value>> = std::sync::OnceLock::new();
        let map = raw
            .as_object()
            .unwrap_or_else(|| EMPTY.get_or_init(Map::new));
        Self::validate_map(map)
    }

    /// Validate a decoded JSON object
    pub fn validate_map(raw: &Map<String, Value>) -> AnalysisRecord {
        let text = |key: &str, default: &str| -> String {
            raw.get(key)
                .and_then(coerce::to_text)
                .unwrap_or_else(|| default.to_string())
        };

        let year = raw.get("year").map(Year::from_value).unwrap_or_default();

        let ai_generated_probability = raw
            .get("ai_generated_probability")
            .and_then(coerce::to_score)
            .unwrap_or(0);

        let record = AnalysisRecord {
            title: text("title", DEFAULT_TITLE),
            event: text("event", DEFAULT_EVENT),
            description: text("description", DEFAULT_DESCRIPTION),
            location_name: text("location_name", DEFAULT_LOCATION),
            year,
            exact_date: text("exact_date", UNKNOWN),
            confidence: Self::confidence(raw.get("confidence")),
            ai_generated_probability,
            ai_analysis: text("ai_analysis", DEFAULT_AI_ANALYSIS),
            extracted_text: text("extracted_text", DEFAULT_EXTRACTED_TEXT),
            visual_elements: Self::visual_elements(raw.get("visual_elements")),
            prompt: text("prompt", UNKNOWN),
            celebrity: raw
                .get("celebrity")
                .and_then(coerce::to_bool)
                .unwrap_or(false),
            celebrity_name: raw
                .get("celebrity_name")
                .and_then(|v| v.as_str())
                .map(str::to_string),
            gps: raw.get("gps").and_then(Self::gps),
            wikipedia: raw
                .get("wikipedia")
                .and_then(|v| serde_json::from_value::<WikipediaLinks>(v.clone()).ok()),
        };

        debug!(
            title = %record.title,
            year = %record.year,
            ai_probability = record.ai_generated_probability,
            "Validated analysis result"
        );

        record
    }

    fn confidence(raw: Option<&Value>) -> Confidence {
        let Some(Value::Object(scores)) = raw else {
            return Confidence::default();
        };

        let score = |key: &str, default: u8| -> u8 {
            scores
                .get(key)
                .and_then(coerce::to_score)
                .unwrap_or(default)
        };

        Confidence {
            year: score("year", Confidence::DEFAULT_SCORE),
            location: score("location", Confidence::DEFAULT_SCORE),
            event: score("event", Confidence::DEFAULT_SCORE),
            exact_date: score("exact_date", Confidence::DEFAULT_EXACT_DATE_SCORE),
        }
    }

    fn visual_elements(raw: Option<&Value>) -> VisualElements {
        match raw {
            Some(Value::String(s)) => VisualElements::Text(s.clone()),
            Some(Value::Array(items)) => {
                VisualElements::List(items.iter().filter_map(coerce::to_text).collect())
            }
            _ => VisualElements::default(),
        }
    }

    fn gps(raw: &Value) -> Option<Gps> {
        let pair = raw.as_array()?;
        if pair.len() != 2 {
            return None;
        }
        Gps::new(coerce::to_float(&pair[0])?, coerce::to_float(&pair[1])?)
    }
}
