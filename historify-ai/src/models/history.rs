//! Read-side shapes shared by all persistence backends

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::Year;

/// Summary row returned by history and search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: i64,
    pub image_name: Option<String>,
    pub title: Option<String>,
    pub event: Option<String>,
    pub location_name: Option<String>,
    #[serde(default)]
    pub year: Year,
    pub exact_date: Option<String>,
    pub ai_generated_probability: Option<i32>,
    pub created_at: DateTime<Utc>,
}

/// Aggregate statistics over stored records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseStats {
    /// Label of the active backend
    pub database_type: String,
    pub total_records: i64,
    /// Counts for the 10 most recent known years
    pub records_by_year: BTreeMap<i32, i64>,
    /// Records with `ai_generated_probability > 70`
    pub likely_ai_generated: i64,
}

/// Threshold above which a record counts as likely AI-generated
pub const LIKELY_AI_THRESHOLD: i32 = 70;

/// Number of distinct years reported in `records_by_year`
pub const STATS_YEAR_LIMIT: usize = 10;

/// Keep the `STATS_YEAR_LIMIT` most recent years of a year histogram
pub fn most_recent_years(counts: BTreeMap<i32, i64>) -> BTreeMap<i32, i64> {
    counts
        .into_iter()
        .rev()
        .take(STATS_YEAR_LIMIT)
        .collect()
}
