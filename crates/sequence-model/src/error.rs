//! Errors raised by sequence construction, queries, and transforms.
//!
//! Every error is terminal for the call that raised it. Transforms are
//! copy-on-write, so the source sequence is always left intact.

/// Errors that can occur when building or transforming a sequence.
#[derive(Debug, thiserror::Error)]
pub enum SequenceError {
    #[error("Invalid parameter `{parameter}`: {message}")]
    InvalidParameter { parameter: String, message: String },

    #[error("Unknown joint label: {label}")]
    UnknownJoint { label: String },

    #[error("{operation} would produce an empty sequence")]
    EmptyResult { operation: String },

    #[error("Cannot compute {measure}: the sampling rate is variable, resample the sequence first")]
    UndefinedDerivative { measure: String },

    #[error("{operation} requires a uniform sampling rate")]
    VariableSamplingRate { operation: String },

    #[error(
        "Joint {joint}: poses {start}..={end} touch the sequence boundary and have no anchor to interpolate from"
    )]
    BoundaryInterpolation {
        joint: String,
        start: usize,
        end: usize,
    },

    #[error("{operation} needs at least {required} samples, got {actual}")]
    TooFewSamples {
        operation: String,
        required: usize,
        actual: usize,
    },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Result type alias using SequenceError.
pub type SequenceResult<T> = Result<T, SequenceError>;

impl SequenceError {
    pub fn invalid_parameter(parameter: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            parameter: parameter.into(),
            message: message.into(),
        }
    }

    pub fn unknown_joint(label: impl Into<String>) -> Self {
        Self::UnknownJoint {
            label: label.into(),
        }
    }

    pub fn empty_result(operation: impl Into<String>) -> Self {
        Self::EmptyResult {
            operation: operation.into(),
        }
    }

    pub fn variable_rate(operation: impl Into<String>) -> Self {
        Self::VariableSamplingRate {
            operation: operation.into(),
        }
    }

    pub fn too_few_samples(operation: impl Into<String>, required: usize, actual: usize) -> Self {
        Self::TooFewSamples {
            operation: operation.into(),
            required,
            actual,
        }
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: msg.into(),
        }
    }
}
