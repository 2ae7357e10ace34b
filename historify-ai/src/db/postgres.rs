//! PostgreSQL backend
//!
//! Selected when a `database_url` is configured and the connection plus
//! schema creation succeed.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use std::collections::BTreeMap;
use std::time::Duration;

use super::schema::{self, RecordRow};
use super::store::{AnalysisStore, BackendKind, StoreError};
use crate::models::history::{LIKELY_AI_THRESHOLD, STATS_YEAR_LIMIT};
use crate::models::{AnalysisRecord, DatabaseStats, HistoryEntry, Year};
use crate::validators::ResultValidator;

const MAX_CONNECTIONS: u32 = 5;
const ACQUIRE_TIMEOUT_SECS: u64 = 10;

pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Connect and create the schema if missing
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .acquire_timeout(Duration::from_secs(ACQUIRE_TIMEOUT_SECS))
            .connect(database_url)
            .await?;

        sqlx::query(schema::POSTGRES_CREATE_TABLE)
            .execute(&pool)
            .await?;
        sqlx::query(schema::POSTGRES_CREATE_INDEX)
            .execute(&pool)
            .await?;

        tracing::info!("PostgreSQL database initialized");

        Ok(Self { pool })
    }
}

fn history_entry(row: &PgRow) -> Result<HistoryEntry, StoreError> {
    let year: Option<i32> = row.try_get("year")?;
    let created_at: DateTime<Utc> = row.try_get("created_at")?;

    Ok(HistoryEntry {
        id: row.try_get("id")?,
        image_name: row.try_get("image_name")?,
        title: row.try_get("title")?,
        event: row.try_get("event")?,
        location_name: row.try_get("location_name")?,
        year: Year::from_column(year.map(i64::from)),
        exact_date: row.try_get("exact_date")?,
        ai_generated_probability: row.try_get("ai_generated_probability")?,
        created_at,
    })
}

#[async_trait]
impl AnalysisStore for PostgresStore {
    fn kind(&self) -> BackendKind {
        BackendKind::PostgreSql
    }

    async fn save(
        &self,
        record: &AnalysisRecord,
        image_name: &str,
        image_url: Option<&str>,
    ) -> Result<i64, StoreError> {
        let row = RecordRow::new(record, image_name, image_url)?;
        let placeholders = (1..=schema::INSERT_COLUMN_COUNT)
            .map(|i| format!("${}", i))
            .collect::<Vec<_>>()
            .join(", ");

        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING id",
            schema::TABLE_NAME,
            schema::INSERT_COLUMNS,
            placeholders
        );

        let id: i64 = sqlx::query_scalar(&sql)
            .bind(&row.image_name)
            .bind(&row.title)
            .bind(&row.event)
            .bind(&row.description)
            .bind(&row.location_name)
            .bind(row.gps_lat)
            .bind(row.gps_lon)
            .bind(row.year)
            .bind(&row.exact_date)
            .bind(row.ai_generated_probability)
            .bind(&row.ai_analysis)
            .bind(&row.extracted_text)
            .bind(&row.visual_elements)
            .bind(row.confidence_year)
            .bind(row.confidence_location)
            .bind(row.confidence_event)
            .bind(row.confidence_exact_date)
            .bind(&row.wikipedia_search_url)
            .bind(&row.wikipedia_direct_url)
            .bind(&row.image_url)
            .bind(&row.prompt)
            .bind(row.celebrity)
            .bind(&row.celebrity_name)
            .bind(Json(&row.raw_result))
            .fetch_one(&self.pool)
            .await?;

        Ok(id)
    }

    async fn history(&self, limit: u32) -> Result<Vec<HistoryEntry>, StoreError> {
        let sql = format!(
            "SELECT {} FROM {} ORDER BY created_at DESC, id DESC LIMIT $1",
            schema::HISTORY_COLUMNS,
            schema::TABLE_NAME
        );

        let rows = sqlx::query(&sql)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(history_entry).collect()
    }

    async fn search(&self, query: &str, limit: u32) -> Result<Vec<HistoryEntry>, StoreError> {
        let sql = format!(
            r#"SELECT {} FROM {}
               WHERE title ILIKE $1 ESCAPE '\'
                  OR event ILIKE $1 ESCAPE '\'
                  OR location_name ILIKE $1 ESCAPE '\'
               ORDER BY created_at DESC, id DESC
               LIMIT $2"#,
            schema::HISTORY_COLUMNS,
            schema::TABLE_NAME
        );

        let rows = sqlx::query(&sql)
            .bind(schema::like_pattern(query))
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(history_entry).collect()
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<AnalysisRecord>, StoreError> {
        let raw: Option<Json<Value>> =
            sqlx::query_scalar("SELECT raw_result FROM analysis_results WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(raw.map(|Json(value)| ResultValidator::validate(&value)))
    }

    async fn stats(&self) -> Result<DatabaseStats, StoreError> {
        let total_records: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM analysis_results")
            .fetch_one(&self.pool)
            .await?;

        let year_rows: Vec<(i32, i64)> = sqlx::query_as(
            "SELECT year, COUNT(*) FROM analysis_results WHERE year IS NOT NULL \
             GROUP BY year ORDER BY year DESC LIMIT $1",
        )
        .bind(STATS_YEAR_LIMIT as i64)
        .fetch_all(&self.pool)
        .await?;

        let likely_ai_generated: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM analysis_results WHERE ai_generated_probability > $1",
        )
        .bind(LIKELY_AI_THRESHOLD)
        .fetch_one(&self.pool)
        .await?;

        let records_by_year: BTreeMap<i32, i64> = year_rows.into_iter().collect();

        Ok(DatabaseStats {
            database_type: self.kind().label().to_string(),
            total_records,
            records_by_year,
            likely_ai_generated,
        })
    }
}
