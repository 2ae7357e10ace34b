//! SQLite backend
//!
//! Local file `<root_folder>/historical_analysis.db`. Always available, so it
//! is the last resort of backend selection.

use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use std::collections::BTreeMap;
use std::path::Path;

use super::schema::{self, RecordRow};
use super::store::{AnalysisStore, BackendKind, StoreError};
use crate::models::history::{LIKELY_AI_THRESHOLD, STATS_YEAR_LIMIT};
use crate::models::{AnalysisRecord, DatabaseStats, HistoryEntry, Year};
use crate::validators::ResultValidator;

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if needed) the database file and its schema
    pub async fn connect(db_path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Database(sqlx::Error::Io(e)))?;
        }

        let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
        tracing::debug!("Connecting to database: {}", db_url);

        let pool = SqlitePool::connect(&db_url).await?;
        Self::init_tables(&pool).await?;

        tracing::info!(path = %db_path.display(), "SQLite database initialized");

        Ok(Self { pool })
    }

    async fn init_tables(pool: &SqlitePool) -> Result<(), StoreError> {
        sqlx::query(schema::SQLITE_CREATE_TABLE).execute(pool).await?;
        sqlx::query(schema::SQLITE_CREATE_INDEX).execute(pool).await?;
        Ok(())
    }
}

fn history_entry(row: &SqliteRow) -> Result<HistoryEntry, StoreError> {
    let created_at: String = row.try_get("created_at")?;
    let created_at = historify_common::time::parse_timestamp(&created_at)
        .ok_or_else(|| StoreError::ParseError(format!("invalid created_at: {}", created_at)))?;

    Ok(HistoryEntry {
        id: row.try_get("id")?,
        image_name: row.try_get("image_name")?,
        title: row.try_get("title")?,
        event: row.try_get("event")?,
        location_name: row.try_get("location_name")?,
        year: Year::from_column(row.try_get("year")?),
        exact_date: row.try_get("exact_date")?,
        ai_generated_probability: row.try_get("ai_generated_probability")?,
        created_at,
    })
}

#[async_trait]
impl AnalysisStore for SqliteStore {
    fn kind(&self) -> BackendKind {
        BackendKind::Sqlite
    }

    async fn save(
        &self,
        record: &AnalysisRecord,
        image_name: &str,
        image_url: Option<&str>,
    ) -> Result<i64, StoreError> {
        let row = RecordRow::new(record, image_name, image_url)?;
        let created_at = historify_common::time::to_storage_string(&historify_common::time::now());
        let placeholders = vec!["?"; schema::INSERT_COLUMN_COUNT + 1].join(", ");

        let sql = format!(
            "INSERT INTO {} ({}, created_at) VALUES ({})",
            schema::TABLE_NAME,
            schema::INSERT_COLUMNS,
            placeholders
        );

        let result = sqlx::query(&sql)
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
            .bind(row.raw_result.to_string())
            .bind(created_at)
            .execute(&self.pool)
            .await?;

        Ok(result.last_insert_rowid())
    }

    async fn history(&self, limit: u32) -> Result<Vec<HistoryEntry>, StoreError> {
        let sql = format!(
            "SELECT {} FROM {} ORDER BY created_at DESC, id DESC LIMIT ?",
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
        let pattern = schema::like_pattern(query);
        let sql = format!(
            r#"SELECT {} FROM {}
               WHERE title LIKE ? ESCAPE '\'
                  OR event LIKE ? ESCAPE '\'
                  OR location_name LIKE ? ESCAPE '\'
               ORDER BY created_at DESC, id DESC
               LIMIT ?"#,
            schema::HISTORY_COLUMNS,
            schema::TABLE_NAME
        );

        let rows = sqlx::query(&sql)
            .bind(&pattern)
            .bind(&pattern)
            .bind(&pattern)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(history_entry).collect()
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<AnalysisRecord>, StoreError> {
        let raw: Option<String> =
            sqlx::query_scalar("SELECT raw_result FROM analysis_results WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        match raw {
            Some(text) => {
                let value: serde_json::Value = serde_json::from_str(&text)?;
                Ok(Some(ResultValidator::validate(&value)))
            }
            None => Ok(None),
        }
    }

    async fn stats(&self) -> Result<DatabaseStats, StoreError> {
        let total_records: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM analysis_results")
            .fetch_one(&self.pool)
            .await?;

        let year_rows: Vec<(i64, i64)> = sqlx::query_as(
            "SELECT year, COUNT(*) FROM analysis_results WHERE year IS NOT NULL \
             GROUP BY year ORDER BY year DESC LIMIT ?",
        )
        .bind(STATS_YEAR_LIMIT as i64)
        .fetch_all(&self.pool)
        .await?;

        let likely_ai_generated: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM analysis_results WHERE ai_generated_probability > ?",
        )
        .bind(LIKELY_AI_THRESHOLD)
        .fetch_one(&self.pool)
        .await?;

        let records_by_year: BTreeMap<i32, i64> = year_rows
            .into_iter()
            .map(|(year, count)| (year as i32, count))
            .collect();

        Ok(DatabaseStats {
            database_type: self.kind().label().to_string(),
            total_records,
            records_by_year,
            likely_ai_generated,
        })
    }
}
