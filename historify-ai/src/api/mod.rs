//! HTTP API handlers for historify-ai

pub mod analyze;
pub mod export;
pub mod health;
pub mod records;

pub use analyze::analyze_routes;
pub use export::export_routes;
pub use health::health_routes;
pub use records::record_routes;
