//! Backend capability trait
//!
//! Each persistence backend implements [`AnalysisStore`] against its own
//! protocol. Errors are explicit here; [`super::PersistenceFacade`] is the
//! only place they are turned into empty results.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{AnalysisRecord, DatabaseStats, HistoryEntry};

/// Persistence errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("API error {0}: {1}")]
    ApiError(u16, String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Parse error: {0}")]
    ParseError(String),
}

/// Active persistence backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Supabase,
    PostgreSql,
    Sqlite,
}

impl BackendKind {
    /// Label reported as `database_type`
    pub fn label(&self) -> &'static str {
        match self {
            BackendKind::Supabase => "Supabase",
            BackendKind::PostgreSql => "PostgreSQL",
            BackendKind::Sqlite => "SQLite",
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Storage contract shared by all backends
#[async_trait]
pub trait AnalysisStore: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Insert one record and return its assigned id
    async fn save(
        &self,
        record: &AnalysisRecord,
        image_name: &str,
        image_url: Option<&str>,
    ) -> Result<i64, StoreError>;

    /// Most recent records first
    async fn history(&self, limit: u32) -> Result<Vec<HistoryEntry>, StoreError>;

    /// Case-insensitive substring match over title, event and location
    async fn search(&self, query: &str, limit: u32) -> Result<Vec<HistoryEntry>, StoreError>;

    async fn get_by_id(&self, id: i64) -> Result<Option<AnalysisRecord>, StoreError>;

    async fn stats(&self) -> Result<DatabaseStats, StoreError>;
}
