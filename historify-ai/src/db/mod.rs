//! Persistence for analysis results
//!
//! [`PersistenceFacade`] fronts one of three [`AnalysisStore`] backends.

pub mod facade;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod schema;
pub mod sqlite;
pub mod store;
pub mod supabase;

pub use facade::{PersistenceFacade, PersistenceSettings};
pub use sqlite::SqliteStore;
pub use store::{AnalysisStore, BackendKind, StoreError};
pub use supabase::{SupabaseSettings, SupabaseStore};
