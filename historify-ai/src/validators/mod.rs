//! Validation layer for untrusted model output
//!
//! 1. **coerce** - lenient scalar coercion helpers
//! 2. **result_validator** - raw JSON → bounded `AnalysisRecord`

pub mod coerce;
pub mod result_validator;

pub use result_validator::ResultValidator;
