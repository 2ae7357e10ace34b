//! Timestamp utilities

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Fixed-width RFC 3339 form used for stored timestamps
///
/// Microsecond precision with a `Z` suffix, so lexicographic order of the
/// text equals chronological order.
pub fn to_storage_string(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a stored or remote timestamp
///
/// Accepts RFC 3339 with any offset, and offset-less ISO 8601 (optionally
/// with `T` replaced by a space) interpreted as UTC.
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Some(ts.with_timezone(&Utc));
    }

    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// Compact `YYYYmmdd_HHMMSS` stamp used in generated file names
pub fn file_stamp(ts: &DateTime<Utc>) -> String {
    ts.format("%Y%m%d_%H%M%S").to_string()
}
