//! Kinetrace Common Utilities
//!
//! Shared infrastructure for all Kinetrace crates:
//! - Error types and result aliases
//! - Time-unit parsing and conversion
//! - Tracing/logging initialization
//! - Configuration loading

pub mod config;
pub mod error;
pub mod logging;
pub mod time;

pub use config::*;
pub use error::*;
pub use time::*;
