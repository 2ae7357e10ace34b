//! Persistence facade
//!
//! Chooses one backend at construction and never re-evaluates:
//! 1. Supabase, when URL and key are configured and the probe succeeds
//! 2. PostgreSQL, when `database_url` is configured (feature `postgres`)
//! 3. SQLite at `<root_folder>/historical_analysis.db`
//!
//! Backend errors are logged and converted to empty results here, so callers
//! only ever see `None` or `[]`.

use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use super::sqlite::SqliteStore;
use super::store::{AnalysisStore, BackendKind, StoreError};
use super::supabase::{SupabaseSettings, SupabaseStore};
use crate::models::{AnalysisRecord, DatabaseStats, HistoryEntry};

/// Inputs to backend selection
#[derive(Debug, Clone)]
pub struct PersistenceSettings {
    pub supabase: Option<SupabaseSettings>,
    pub database_url: Option<String>,
    pub sqlite_path: PathBuf,
}

#[derive(Clone)]
pub struct PersistenceFacade {
    store: Arc<dyn AnalysisStore>,
}

impl PersistenceFacade {
    /// Select the backend
    ///
    /// Only a SQLite failure is returned as an error.
    pub async fn connect(settings: &PersistenceSettings) -> Result<Self, StoreError> {
        if let Some(supabase) = &settings.supabase {
            match SupabaseStore::connect(supabase).await {
                Ok(store) => return Ok(Self::select(Arc::new(store))),
                Err(e) => warn!(error = %e, "Supabase unavailable, falling back"),
            }
        }

        if let Some(database_url) = &settings.database_url {
            #[cfg(feature = "postgres")]
            {
                match super::postgres::PostgresStore::connect(database_url).await {
                    Ok(store) => return Ok(Self::select(Arc::new(store))),
                    Err(e) => warn!(error = %e, "PostgreSQL unavailable, falling back to SQLite"),
                }
            }

            #[cfg(not(feature = "postgres"))]
            {
                let _ = database_url;
                warn!("database_url is set but PostgreSQL support is not compiled in");
            }
        }

        let store = SqliteStore::connect(&settings.sqlite_path).await?;
        Ok(Self::select(Arc::new(store)))
    }

    /// Wrap an already constructed backend
    pub fn from_store(store: Arc<dyn AnalysisStore>) -> Self {
        Self { store }
    }

    fn select(store: Arc<dyn AnalysisStore>) -> Self {
        info!(backend = %store.kind(), "Persistence backend selected");
        Self { store }
    }

    pub fn backend(&self) -> BackendKind {
        self.store.kind()
    }

    /// Assigned id, or `None` when the insert failed
    pub async fn save(
        &self,
        record: &AnalysisRecord,
        image_name: &str,
        image_url: Option<&str>,
    ) -> Option<i64> {
        match self.store.save(record, image_name, image_url).await {
            Ok(id) => {
                info!(id, image = %image_name, backend = %self.backend(), "Saved analysis result");
                Some(id)
            }
            Err(e) => {
                warn!(image = %image_name, error = %e, "Failed to save analysis result");
                None
            }
        }
    }

    pub async fn history(&self, limit: u32) -> Vec<HistoryEntry> {
        self.store.history(limit).await.unwrap_or_else(|e| {
            warn!(error = %e, "Failed to load analysis history");
            Vec::new()
        })
    }

    /// Blank queries match nothing
    pub async fn search(&self, query: &str, limit: u32) -> Vec<HistoryEntry> {
        if query.trim().is_empty() {
            return Vec::new();
        }

        self.store.search(query, limit).await.unwrap_or_else(|e| {
            warn!(query = %query, error = %e, "Search failed");
            Vec::new()
        })
    }

    pub async fn get_by_id(&self, id: i64) -> Option<AnalysisRecord> {
        self.store.get_by_id(id).await.unwrap_or_else(|e| {
            warn!(id, error = %e, "Failed to load analysis result");
            None
        })
    }

    pub async fn stats(&self) -> Option<DatabaseStats> {
        match self.store.stats().await {
            Ok(stats) => Some(stats),
            Err(e) => {
                warn!(error = %e, "Failed to compute database statistics");
                None
            }
        }
    }
}
