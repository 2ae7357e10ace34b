//! # Historify Common Library
//!
//! Shared code for the Historify crates:
//! - Error types
//! - TOML bootstrap configuration and root folder resolution
//! - Logging initialization

pub mod config;
pub mod error;
pub mod logging;
pub mod time;

pub use error::{Error, Result};
