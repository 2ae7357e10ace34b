//! Canonical analysis record
//!
//! An `AnalysisRecord` is only ever produced by the result validator, so
//! every field is populated and bounded. `gps` and `wikipedia` are attached
//! later by the batch orchestrator.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::validators::coerce;

/// Earliest year accepted as a plausible photograph date
pub const MIN_YEAR: i64 = 1800;
/// Latest year accepted
pub const MAX_YEAR: i64 = 2024;

/// Sentinel for unparseable or out-of-range years and dates
pub const UNKNOWN: &str = "Unknown";

pub const DEFAULT_TITLE: &str = "Historical Event";
pub const DEFAULT_EVENT: &str = "Unidentified Historical Event";
pub const DEFAULT_DESCRIPTION: &str =
    "Unable to determine specific historical event from available evidence.";
pub const DEFAULT_LOCATION: &str = "Unknown Location";
pub const DEFAULT_AI_ANALYSIS: &str = "No AI-generation analysis available.";
pub const DEFAULT_EXTRACTED_TEXT: &str = "No text detected.";

pub const ERROR_TITLE: &str = "Analysis Error";
pub const ERROR_EVENT: &str = "Error During Analysis";

/// Year of the depicted event: a bounded integer or the `"Unknown"` sentinel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Year {
    Known(i32),
    #[default]
    Unknown,
}

impl Year {
    /// Interpret an arbitrary JSON value; anything out of range is `Unknown`
    pub fn from_value(value: &Value) -> Self {
        match coerce::to_int(value) {
            Some(y) if (MIN_YEAR..=MAX_YEAR).contains(&y) => Year::Known(y as i32),
            _ => Year::Unknown,
        }
    }

    /// Interpret a nullable integer column
    pub fn from_column(value: Option<i64>) -> Self {
        match value {
            Some(y) if (MIN_YEAR..=MAX_YEAR).contains(&y) => Year::Known(y as i32),
            _ => Year::Unknown,
        }
    }

    /// Value stored in the `year` column (`NULL` for unknown)
    pub fn as_column(&self) -> Option<i32> {
        match self {
            Year::Known(y) => Some(*y),
            Year::Unknown => None,
        }
    }
}

impl std::fmt::Display for Year {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Year::Known(y) => write!(f, "{}", y),
            Year::Unknown => f.write_str(UNKNOWN),
        }
    }
}

impl Serialize for Year {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Year::Known(y) => serializer.serialize_i32(*y),
            Year::Unknown => serializer.serialize_str(UNKNOWN),
        }
    }
}

impl<'de> Deserialize<'de> for Year {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Year::from_value(&value))
    }
}

/// Model self-reported certainty per inferred field, each in [0, 100]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Confidence {
    pub year: u8,
    pub location: u8,
    pub event: u8,
    pub exact_date: u8,
}

impl Confidence {
    pub const DEFAULT_SCORE: u8 = 50;
    pub const DEFAULT_EXACT_DATE_SCORE: u8 = 0;

    pub fn zeroed() -> Self {
        Self {
            year: 0,
            location: 0,
            event: 0,
            exact_date: 0,
        }
    }
}

impl Default for Confidence {
    fn default() -> Self {
        Self {
            year: Self::DEFAULT_SCORE,
            location: Self::DEFAULT_SCORE,
            event: Self::DEFAULT_SCORE,
            exact_date: Self::DEFAULT_EXACT_DATE_SCORE,
        }
    }
}

/// Geographic coordinates, always within valid ranges
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "[f64; 2]", into = "[f64; 2]")]
pub struct Gps {
    latitude: f64,
    longitude: f64,
}

impl Gps {
    /// Returns `None` when either coordinate is out of range or not finite
    pub fn new(latitude: f64, longitude: f64) -> Option<Self> {
        let lat_ok = latitude.is_finite() && (-90.0..=90.0).contains(&latitude);
        let lon_ok = longitude.is_finite() && (-180.0..=180.0).contains(&longitude);
        (lat_ok && lon_ok).then_some(Self {
            latitude,
            longitude,
        })
    }

    /// Build from a geocoder result, rounding to 4 decimals
    pub fn rounded(latitude: f64, longitude: f64) -> Option<Self> {
        let round4 = |v: f64| (v * 10_000.0).round() / 10_000.0;
        Self::new(round4(latitude), round4(longitude))
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }
}

impl TryFrom<[f64; 2]> for Gps {
    type Error = String;

    fn try_from(pair: [f64; 2]) -> Result<Self, Self::Error> {
        Gps::new(pair[0], pair[1])
            .ok_or_else(|| format!("coordinates out of range: {}, {}", pair[0], pair[1]))
    }
}

impl From<Gps> for [f64; 2] {
    fn from(gps: Gps) -> Self {
        [gps.latitude, gps.longitude]
    }
}

/// Reference links derived from the event name and location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WikipediaLinks {
    pub search_url: String,
    pub direct_url: String,
    pub summary: String,
}

/// Visual cues reported by the model: free text or a list of phrases
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VisualElements {
    Text(String),
    List(Vec<String>),
}

impl Default for VisualElements {
    fn default() -> Self {
        VisualElements::List(Vec::new())
    }
}

/// Validated metadata for one analyzed image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub title: String,
    pub event: String,
    pub description: String,
    pub location_name: String,
    pub year: Year,
    pub exact_date: String,
    pub confidence: Confidence,
    pub ai_generated_probability: u8,
    pub ai_analysis: String,
    pub extracted_text: String,
    pub visual_elements: VisualElements,
    pub prompt: String,
    pub celebrity: bool,
    pub celebrity_name: Option<String>,
    #[serde(default)]
    pub gps: Option<Gps>,
    #[serde(default)]
    pub wikipedia: Option<WikipediaLinks>,
}

impl Default for AnalysisRecord {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            event: DEFAULT_EVENT.to_string(),
            description: DEFAULT_DESCRIPTION.to_string(),
            location_name: DEFAULT_LOCATION.to_string(),
            year: Year::Unknown,
            exact_date: UNKNOWN.to_string(),
            confidence: Confidence::default(),
            ai_generated_probability: 0,
            ai_analysis: DEFAULT_AI_ANALYSIS.to_string(),
            extracted_text: DEFAULT_EXTRACTED_TEXT.to_string(),
            visual_elements: VisualElements::default(),
            prompt: UNKNOWN.to_string(),
            celebrity: false,
            celebrity_name: None,
            gps: None,
            wikipedia: None,
        }
    }
}

impl AnalysisRecord {
    /// Record substituted when the vision call fails
    pub fn analysis_error(reason: impl std::fmt::Display) -> Self {
        Self {
            title: ERROR_TITLE.to_string(),
            event: ERROR_EVENT.to_string(),
            description: format!("Error occurred during historical analysis: {}", reason),
            location_name: UNKNOWN.to_string(),
            confidence: Confidence::zeroed(),
            ..Self::default()
        }
    }

    /// True unless the location is one of the unknown placeholders
    pub fn has_known_location(&self) -> bool {
        let location = self.location_name.trim();
        !location.is_empty()
            && !location.eq_ignore_ascii_case(UNKNOWN)
            && !location.eq_ignore_ascii_case(DEFAULT_LOCATION)
    }

    /// True unless the event is one of the unidentified placeholders
    pub fn has_identified_event(&self) -> bool {
        let event = self.event.trim();
        !event.is_empty()
            && !event.eq_ignore_ascii_case(DEFAULT_EVENT)
            && !event.eq_ignore_ascii_case(ERROR_EVENT)
            && !event.eq_ignore_ascii_case(UNKNOWN)
    }
}
