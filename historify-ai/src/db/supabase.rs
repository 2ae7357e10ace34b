//! Supabase backend over the PostgREST HTTP API
//!
//! The table is managed outside this service; only its column names are
//! assumed. Counts come from the `Content-Range` header of
//! `Prefer: count=exact` requests.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;

use super::schema::RecordRow;
use super::store::{AnalysisStore, BackendKind, StoreError};
use crate::models::history::{most_recent_years, LIKELY_AI_THRESHOLD};
use crate::models::{AnalysisRecord, DatabaseStats, HistoryEntry, Year};
use crate::validators::ResultValidator;

pub const DEFAULT_TABLE: &str = "ai-guess";

const REQUEST_TIMEOUT_SECS: u64 = 30;
const HISTORY_SELECT: &str =
    "id,image_name,title,event,location_name,year,exact_date,ai_generated_probability,created_at";

/// Supabase project credentials
#[derive(Debug, Clone)]
pub struct SupabaseSettings {
    pub url: String,
    pub key: String,
    pub table: String,
}

#[derive(Debug, Deserialize)]
struct InsertedRow {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct RawResultRow {
    raw_result: Value,
}

#[derive(Debug, Deserialize)]
struct YearRow {
    year: Value,
}

#[derive(Debug, Deserialize)]
struct HistoryRow {
    id: i64,
    image_name: Option<String>,
    title: Option<String>,
    event: Option<String>,
    location_name: Option<String>,
    #[serde(default)]
    year: Value,
    exact_date: Option<String>,
    ai_generated_probability: Option<i32>,
    created_at: String,
}

impl TryFrom<HistoryRow> for HistoryEntry {
    type Error = StoreError;

    fn try_from(row: HistoryRow) -> Result<Self, Self::Error> {
        let created_at = historify_common::time::parse_timestamp(&row.created_at)
            .ok_or_else(|| StoreError::ParseError(format!("invalid created_at: {}", row.created_at)))?;

        Ok(HistoryEntry {
            id: row.id,
            image_name: row.image_name,
            title: row.title,
            event: row.event,
            location_name: row.location_name,
            year: Year::from_value(&row.year),
            exact_date: row.exact_date,
            ai_generated_probability: row.ai_generated_probability,
            created_at,
        })
    }
}

/// Quote a value for a PostgREST `or=(...)` filter
///
/// Reserved characters (`,` `.` `:` `(` `)`) are safe inside double quotes;
/// `"` and `\` are backslash-escaped.
pub fn quote_filter_value(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        if c == '"' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

/// `or` filter matching the query in title, event or location
///
/// `*` is the PostgREST wildcard; `%` and `_` are escaped so ILIKE matches
/// them literally.
pub fn search_filter(query: &str) -> String {
    let pattern = quote_filter_value(&format!("*{}*", super::schema::escape_like(query)));
    format!(
        "(title.ilike.{p},event.ilike.{p},location_name.ilike.{p})",
        p = pattern
    )
}

/// Total from a `Content-Range` header such as `0-24/573` or `*/0`
pub fn parse_content_range_total(header: &str) -> Option<i64> {
    header.rsplit('/').next()?.trim().parse().ok()
}

pub struct SupabaseStore {
    http_client: reqwest::Client,
    table_url: String,
}

impl SupabaseStore {
    /// Build the client and probe the table
    pub async fn connect(settings: &SupabaseSettings) -> Result<Self, StoreError> {
        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(&settings.key)
            .map_err(|e| StoreError::ParseError(format!("invalid Supabase key: {}", e)))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", settings.key))
            .map_err(|e| StoreError::ParseError(format!("invalid Supabase key: {}", e)))?;
        headers.insert("apikey", key);
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http_client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| StoreError::NetworkError(e.to_string()))?;

        let store = Self {
            http_client,
            table_url: format!(
                "{}/rest/v1/{}",
                settings.url.trim_end_matches('/'),
                settings.table
            ),
        };

        store.probe().await?;

        tracing::info!(table = %settings.table, "Supabase backend reachable");

        Ok(store)
    }

    async fn probe(&self) -> Result<(), StoreError> {
        self.get(&[("select", "id"), ("limit", "1")], None).await?;
        Ok(())
    }

    async fn get(
        &self,
        params: &[(&str, &str)],
        prefer: Option<&str>,
    ) -> Result<reqwest::Response, StoreError> {
        let mut request = self.http_client.get(&self.table_url).query(params);
        if let Some(prefer) = prefer {
            request = request.header("Prefer", prefer);
        }

        let response = request
            .send()
            .await
            .map_err(|e| StoreError::NetworkError(e.to_string()))?;

        check_status(response).await
    }

    async fn count(&self, filter: Option<(&str, &str)>) -> Result<i64, StoreError> {
        let mut params = vec![("select", "id"), ("limit", "1")];
        params.extend(filter);

        let response = self.get(&params, Some("count=exact")).await?;

        response
            .headers()
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range_total)
            .ok_or_else(|| StoreError::ParseError("missing Content-Range total".to_string()))
    }

    async fn list(&self, params: &[(&str, &str)]) -> Result<Vec<HistoryEntry>, StoreError> {
        let rows: Vec<HistoryRow> = self
            .get(params, None)
            .await?
            .json()
            .await
            .map_err(|e| StoreError::ParseError(e.to_string()))?;

        rows.into_iter().map(HistoryEntry::try_from).collect()
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let error_text = response.text().await.unwrap_or_default();
    Err(StoreError::ApiError(status.as_u16(), error_text))
}

#[async_trait]
impl AnalysisStore for SupabaseStore {
    fn kind(&self) -> BackendKind {
        BackendKind::Supabase
    }

    async fn save(
        &self,
        record: &AnalysisRecord,
        image_name: &str,
        image_url: Option<&str>,
    ) -> Result<i64, StoreError> {
        let row = RecordRow::new(record, image_name, image_url)?;
        let mut body = serde_json::to_value(&row)?;
        if let Value::Object(map) = &mut body {
            map.insert(
                "created_at".to_string(),
                Value::String(historify_common::time::to_storage_string(
                    &historify_common::time::now(),
                )),
            );
        }

        let response = self
            .http_client
            .post(&self.table_url)
            .header("Prefer", "return=representation")
            .json(&body)
            .send()
            .await
            .map_err(|e| StoreError::NetworkError(e.to_string()))?;

        let inserted: Vec<InsertedRow> = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| StoreError::ParseError(e.to_string()))?;

        inserted
            .first()
            .map(|row| row.id)
            .ok_or_else(|| StoreError::ParseError("insert returned no rows".to_string()))
    }

    async fn history(&self, limit: u32) -> Result<Vec<HistoryEntry>, StoreError> {
        let limit = limit.to_string();
        self.list(&[
            ("select", HISTORY_SELECT),
            ("order", "created_at.desc,id.desc"),
            ("limit", limit.as_str()),
        ])
        .await
    }

    async fn search(&self, query: &str, limit: u32) -> Result<Vec<HistoryEntry>, StoreError> {
        let limit = limit.to_string();
        let filter = search_filter(query);
        self.list(&[
            ("select", HISTORY_SELECT),
            ("or", filter.as_str()),
            ("order", "created_at.desc,id.desc"),
            ("limit", limit.as_str()),
        ])
        .await
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<AnalysisRecord>, StoreError> {
        let id_filter = format!("eq.{}", id);
        let rows: Vec<RawResultRow> = self
            .get(&[("id", id_filter.as_str()), ("select", "raw_result")], None)
            .await?
            .json()
            .await
            .map_err(|e| StoreError::ParseError(e.to_string()))?;

        let Some(row) = rows.into_iter().next() else {
            return Ok(None);
        };

        // Text columns hold the JSON as a string
        let raw = match row.raw_result {
            Value::String(text) => serde_json::from_str(&text)?,
            other => other,
        };

        Ok(Some(ResultValidator::validate(&raw)))
    }

    async fn stats(&self) -> Result<DatabaseStats, StoreError> {
        let total_records = self.count(None).await?;

        let threshold = format!("gt.{}", LIKELY_AI_THRESHOLD);
        let likely_ai_generated = self
            .count(Some(("ai_generated_probability", threshold.as_str())))
            .await?;

        let years: Vec<YearRow> = self
            .get(&[("select", "year"), ("year", "not.is.null")], None)
            .await?
            .json()
            .await
            .map_err(|e| StoreError::ParseError(e.to_string()))?;

        let mut counts: BTreeMap<i32, i64> = BTreeMap::new();
        for row in &years {
            if let Year::Known(year) = Year::from_value(&row.year) {
                *counts.entry(year).or_insert(0) += 1;
            }
        }

        Ok(DatabaseStats {
            database_type: self.kind().label().to_string(),
            total_records,
            records_by_year: most_recent_years(counts),
            likely_ai_generated,
        })
    }
}
