//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::KinetraceResult;
use crate::time::TimeUnit;

/// Global application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Default pre-processing parameters.
    #[serde(default)]
    pub preprocessing: PreprocessingDefaults,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Unit in which the jitter window is expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowUnit {
    /// Window counted in poses.
    Poses,
    /// Window expressed as a duration.
    Time(TimeUnit),
}

/// Default pre-processing parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessingDefaults {
    /// Velocity over which a movement is considered aberrant (distance unit per second).
    pub velocity_threshold: f64,

    /// Maximum length of an aberrant movement.
    pub jitter_window: f64,

    /// Unit of `jitter_window`.
    pub jitter_window_unit: WindowUnit,

    /// Interpolation used to rewrite jitter spans ("default", "linear", "cubic", ...).
    pub jitter_method: String,

    /// Default resampling frequency (Hz).
    pub resample_frequency: f64,

    /// Default resampling interpolation method.
    pub resample_method: String,

    /// Resampling chunk size in input samples. `None` processes whole series.
    pub resample_window_size: Option<usize>,

    /// Overlap between consecutive resampling chunks, in `[0, 1)`.
    pub resample_overlap_ratio: f64,

    /// Interpolation used to fill zero runs.
    pub zero_correction_method: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "kinetrace=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for PreprocessingDefaults {
    fn default() -> Self {
        Self {
            velocity_threshold: 1.0,
            jitter_window: 3.0,
            jitter_window_unit: WindowUnit::Poses,
            jitter_method: "default".to_string(),
            resample_frequency: 50.0,
            resample_method: "cubic".to_string(),
            resample_window_size: None,
            resample_overlap_ratio: 0.5,
            zero_correction_method: "linear".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match Self::load_from(&config_path) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!("Failed to load config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Load config from an explicit path.
    pub fn load_from(path: impl AsRef<Path>) -> KinetraceResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Save config to the standard location.
    pub fn save(&self) -> KinetraceResult<()> {
        self.save_to(config_file_path())
    }

    /// Save config to an explicit path.
    pub fn save_to(&self, path: impl AsRef<Path>) -> KinetraceResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("kinetrace").join("config.json")
}
