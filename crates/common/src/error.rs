//! Error types shared across Kinetrace crates.

use std::path::PathBuf;

/// Top-level error type for Kinetrace operations outside the sequence model.
#[derive(Debug, thiserror::Error)]
pub enum KinetraceError {
    #[error("Processing error: {message}")]
    Processing { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid time unit: {unit}")]
    TimeUnit { unit: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Result type alias using KinetraceError.
pub type KinetraceResult<T> = Result<T, KinetraceError>;

impl KinetraceError {
    pub fn processing(msg: impl Into<String>) -> Self {
        Self::Processing {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn time_unit(unit: impl Into<String>) -> Self {
        Self::TimeUnit { unit: unit.into() }
    }
}
