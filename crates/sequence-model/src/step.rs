//! Processing provenance.
//!
//! Every transform appends one [`ProcessingStep`] to the history of the
//! sequence it returns, so a saved sequence records exactly how it was
//! derived from the raw recording.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SequenceError;

/// Interpolation scheme used by resampling and by gap filling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum InterpolationMethod {
    /// Piecewise linear between neighbouring samples.
    #[default]
    Linear,
    /// Natural cubic spline through every sample.
    Cubic,
    /// Monotone piecewise cubic Hermite (Fritsch–Carlson).
    Pchip,
    /// Value of the sample closest in time.
    Nearest,
}

impl InterpolationMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            InterpolationMethod::Linear => "linear",
            InterpolationMethod::Cubic => "cubic",
            InterpolationMethod::Pchip => "pchip",
            InterpolationMethod::Nearest => "nearest",
        }
    }
}

impl fmt::Display for InterpolationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InterpolationMethod {
    type Err = SequenceError;

    /// `"default"` is accepted as an alias of linear: the two-anchor
    /// correction used by jitter removal.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "default" | "linear" => Ok(InterpolationMethod::Linear),
            "cubic" | "spline" => Ok(InterpolationMethod::Cubic),
            "pchip" => Ok(InterpolationMethod::Pchip),
            "nearest" => Ok(InterpolationMethod::Nearest),
            other => Err(SequenceError::invalid_parameter(
                "method",
                format!("unknown interpolation method {other:?} (expected linear, cubic, pchip or nearest)"),
            )),
        }
    }
}

/// Length of the jitter detection window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "unit", content = "value", rename_all = "snake_case")]
pub enum JitterWindow {
    /// Number of poses after the anchor.
    Poses(usize),
    /// Duration after the anchor, converted to poses using actual timestamps.
    Seconds(f64),
}

/// What zero correction does with a dropout touching either end of the sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ZeroBoundary {
    /// Leave the run at the origin and flag it.
    #[default]
    Flag,
    /// Fail with a boundary interpolation error.
    Error,
}

/// One entry of a sequence's processing history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "processing_type", rename_all = "snake_case")]
pub enum ProcessingStep {
    ReReference {
        reference_joint_label: String,
        place_at_zero: bool,
    },
    Trim {
        start: f64,
        end: f64,
        use_relative_timestamps: bool,
    },
    TrimToAudio {
        delay: f64,
        audio_duration: f64,
    },
    Resample {
        frequency: f64,
        method: InterpolationMethod,
        window_size: Option<usize>,
        overlap_ratio: f64,
    },
    CorrectJitter {
        velocity_threshold: f64,
        window: JitterWindow,
        method: InterpolationMethod,
        correct_twitches: bool,
        correct_jumps: bool,
    },
    CorrectZeros {
        method: InterpolationMethod,
        boundary: ZeroBoundary,
    },
    FilterFrequencies {
        filter_below: Option<f64>,
        filter_over: Option<f64>,
    },
    AverageJoints {
        joint_labels: Vec<String>,
        new_joint_label: String,
        remove_averaged_joints: bool,
    },
    Concatenate {
        /// Name of the sequence appended after this one.
        other_name: String,
        /// Seconds between the last pose of this sequence and the first appended one.
        delay: f64,
    },
}

impl ProcessingStep {
    /// Name of the operation, as serialized in `processing_type`.
    pub fn operation(&self) -> &'static str {
        match self {
            ProcessingStep::ReReference { .. } => "re_reference",
            ProcessingStep::Trim { .. } => "trim",
            ProcessingStep::TrimToAudio { .. } => "trim_to_audio",
            ProcessingStep::Resample { .. } => "resample",
            ProcessingStep::CorrectJitter { .. } => "correct_jitter",
            ProcessingStep::CorrectZeros { .. } => "correct_zeros",
            ProcessingStep::FilterFrequencies { .. } => "filter_frequencies",
            ProcessingStep::AverageJoints { .. } => "average_joints",
            ProcessingStep::Concatenate { .. } => "concatenate",
        }
    }
}
