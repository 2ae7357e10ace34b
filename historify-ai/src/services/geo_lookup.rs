//! Location name → GPS coordinates
//!
//! Resolution order:
//! 1. Built-in table of frequently photographed cities (substring match)
//! 2. Nominatim search, when enabled; timeouts are retried, a miss on the full
//!    name is retried once with a simplified name

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

use crate::models::Gps;

const NOMINATIM_BASE_URL: &str = "https://nominatim.openstreetmap.org";
const USER_AGENT: &str = "historical_image_analyzer";
const REQUEST_TIMEOUT_SECS: u64 = 10;
const MAX_ATTEMPTS: u32 = 3;
const RETRY_BACKOFF: Duration = Duration::from_secs(1);

/// Lower-cased keys matched as substrings of the lower-cased location
const KNOWN_LOCATIONS: &[(&str, f64, f64)] = &[
    ("berlin, germany", 52.5200, 13.4050),
    ("new york, usa", 40.7128, -74.0060),
    ("london, england", 51.5074, -0.1278),
    ("paris, france", 48.8566, 2.3522),
    ("washington dc, usa", 38.9072, -77.0369),
    ("moscow, russia", 55.7558, 37.6176),
    ("beijing, china", 39.9042, 116.4074),
    ("tokyo, japan", 35.6762, 139.6503),
];

/// Phrases stripped by [`simplify_location_name`]
const DESCRIPTIVE_PHRASES: &[&str] = &[
    "near",
    "around",
    "vicinity of",
    "area of",
    "region of",
    "front of",
    "outside",
    "inside",
    "at the",
    "in the",
];

/// Geocoding errors
#[derive(Debug, Error)]
pub enum GeoError {
    #[error("Geocoding timed out after {0} attempts")]
    Timeout(u32),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Geocoding service error {0}: {1}")]
    ServiceError(u16, String),

    #[error("Parse error: {0}")]
    ParseError(String),
}

/// Resolve a free-text location to coordinates
#[async_trait]
pub trait GeoLookup: Send + Sync {
    /// `Ok(None)` when the location is a placeholder or simply not found
    async fn lookup(&self, location_name: &str) -> Result<Option<Gps>, GeoError>;
}

/// True for blank names and the unknown-location placeholders
pub fn is_unknown_location(location_name: &str) -> bool {
    let name = location_name.trim();
    name.is_empty()
        || name.eq_ignore_ascii_case("unknown")
        || name.eq_ignore_ascii_case("unknown location")
}

/// Look up the built-in city table
pub fn lookup_known_location(location_name: &str) -> Option<Gps> {
    let lower = location_name.to_lowercase();
    KNOWN_LOCATIONS
        .iter()
        .find(|(key, _, _)| lower.contains(key))
        .and_then(|(_, lat, lon)| Gps::new(*lat, *lon))
}

/// Strip descriptive phrases and reduce comma lists to `first, last`
///
/// Phrases are removed only as whole words. Single-part names are
/// title-cased; comma lists stay lower-case.
pub fn simplify_location_name(location_name: &str) -> String {
    let mut words: Vec<String> = location_name
        .to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .collect();

    for phrase in DESCRIPTIVE_PHRASES {
        let phrase_words: Vec<&str> = phrase.split(' ').collect();
        let mut i = 0;
        while i + phrase_words.len() <= words.len() {
            let matches = phrase_words
                .iter()
                .enumerate()
                .all(|(j, p)| words[i + j] == *p);
            if matches {
                words.drain(i..i + phrase_words.len());
            } else {
                i += 1;
            }
        }
    }

    let simplified = words.join(" ");
    let parts: Vec<&str> = simplified.split(',').map(str::trim).collect();

    if parts.len() >= 2 {
        return format!("{}, {}", parts[0], parts[parts.len() - 1]);
    }

    title_case(&simplified)
}

fn title_case(text: &str) -> String {
    text.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
}

/// Built-in table with optional Nominatim fallback
pub struct NominatimGeoLookup {
    http_client: reqwest::Client,
    base_url: String,
    remote_enabled: bool,
}

impl NominatimGeoLookup {
    pub fn new(base_url: Option<String>, remote_enabled: bool) -> Result<Self, GeoError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| GeoError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url
                .unwrap_or_else(|| NOMINATIM_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            remote_enabled,
        })
    }

    /// Table-only lookup, no network access
    pub fn offline() -> Result<Self, GeoError> {
        Self::new(None, false)
    }

    /// Single search request
    async fn search(&self, query: &str) -> Result<Option<Gps>, reqwest::Error> {
        let url = format!("{}/search", self.base_url);

        tracing::debug!(query = %query, "Querying Nominatim");

        let response = self
            .http_client
            .get(&url)
            .query(&[("q", query), ("format", "json"), ("limit", "1")])
            .send()
            .await?
            .error_for_status()?;

        let places: Vec<NominatimPlace> = response.json().await?;

        Ok(places.first().and_then(|place| {
            let lat = place.lat.trim().parse::<f64>().ok()?;
            let lon = place.lon.trim().parse::<f64>().ok()?;
            Gps::rounded(lat, lon)
        }))
    }

    async fn search_remote(&self, location_name: &str) -> Result<Option<Gps>, GeoError> {
        for attempt in 1..=MAX_ATTEMPTS {
            match self.search(location_name).await {
                Ok(Some(gps)) => return Ok(Some(gps)),
                Ok(None) => {
                    let simplified = simplify_location_name(location_name);
                    if simplified == location_name {
                        return Ok(None);
                    }
                    tracing::debug!(
                        location = %location_name,
                        simplified = %simplified,
                        "No geocoding match, retrying with simplified name"
                    );
                    return self.search(&simplified).await.map_err(classify_error);
                }
                Err(e) if e.is_timeout() => {
                    if attempt < MAX_ATTEMPTS {
                        tracing::debug!(attempt, location = %location_name, "Geocoding timeout, retrying");
                        tokio::time::sleep(RETRY_BACKOFF).await;
                        continue;
                    }
                    return Err(GeoError::Timeout(MAX_ATTEMPTS));
                }
                Err(e) => return Err(classify_error(e)),
            }
        }

        Err(GeoError::Timeout(MAX_ATTEMPTS))
    }
}

fn classify_error(e: reqwest::Error) -> GeoError {
    if let Some(status) = e.status() {
        GeoError::ServiceError(status.as_u16(), e.to_string())
    } else if e.is_decode() {
        GeoError::ParseError(e.to_string())
    } else {
        GeoError::NetworkError(e.to_string())
    }
}

#[async_trait]
impl GeoLookup for NominatimGeoLookup {
    async fn lookup(&self, location_name: &str) -> Result<Option<Gps>, GeoError> {
        if is_unknown_location(location_name) {
            return Ok(None);
        }

        if let Some(gps) = lookup_known_location(location_name) {
            tracing::debug!(location = %location_name, "Resolved location from built-in table");
            return Ok(Some(gps));
        }

        if !self.remote_enabled {
            return Ok(None);
        }

        let result = self.search_remote(location_name).await?;

        if let Some(gps) = result {
            tracing::info!(
                location = %location_name,
                latitude = gps.latitude(),
                longitude = gps.longitude(),
                "Geocoded location"
            );
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_placeholders() {
        assert!(is_unknown_location(""));
        assert!(is_unknown_location("  "));
        assert!(is_unknown_location("UNKNOWN"));
        assert!(is_unknown_location("Unknown Location"));
        assert!(!is_unknown_location("Unknown Soldier Memorial, Arlington"));
    }

    #[test]
    fn test_known_location_substring_match() {
        let gps = lookup_known_location("Brandenburg Gate, Berlin, Germany").unwrap();
        assert_eq!(gps.latitude(), 52.52);
        assert_eq!(gps.longitude(), 13.405);

        assert!(lookup_known_location("TIMES SQUARE, NEW YORK, USA").is_some());
        assert!(lookup_known_location("Berlin").is_none());
    }

    #[test]
    fn test_simplify_removes_descriptive_words() {
        assert_eq!(
            simplify_location_name("Near the old bridge, Prague, Czech Republic"),
            "the old bridge, czech republic"
        );
        assert_eq!(simplify_location_name("in the vicinity of Gettysburg"), "Gettysburg");
        assert_eq!(simplify_location_name("Nearby Hill"), "Nearby Hill");
    }

    #[test]
    fn test_simplify_reduces_comma_lists() {
        assert_eq!(
            simplify_location_name("Red Square, Moscow, Soviet Union"),
            "red square, soviet union"
        );
    }

    #[tokio::test]
    async fn test_offline_lookup() {
        let geo = NominatimGeoLookup::offline().unwrap();
        assert!(geo.lookup("Unknown").await.unwrap().is_none());
        assert!(geo.lookup("Eiffel Tower, Paris, France").await.unwrap().is_some());
        assert!(geo.lookup("Atlantis").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unreachable_service_is_an_error() {
        let geo = NominatimGeoLookup::new(Some("http://127.0.0.1:1".to_string()), true).unwrap();
        let result = geo.lookup("Somewhere Remote").await;
        assert!(matches!(result, Err(GeoError::NetworkError(_))));
    }
}
