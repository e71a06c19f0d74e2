//! Kinetrace Processing Core
//!
//! Pre-processing of motion-capture sequences:
//! - **Jitter correction:** detect and flatten twitches and jumps
//! - **Resampling:** convert variable-rate recordings to a uniform frequency
//! - **Zero correction:** refill joints the tracker lost
//! - **Frequency filtering:** Butterworth low-, high- and band-pass
//!
//! This crate is pure computation. No I/O: sequences in, sequences out.
//! Every operation is also available on `Sequence` through the
//! [`SequenceProcessing`] extension trait.

pub mod ext;
pub mod filter;
pub mod interpolate;
pub mod jitter;
pub mod resample;
pub mod zeros;

pub use ext::SequenceProcessing;
pub use filter::{Biquad, FilterParams, FrequencyFilter};
pub use interpolate::Interpolator;
pub use jitter::{JitterCorrector, JitterParams, JitterReport, JointJitterStats};
pub use resample::{output_timestamps, resample_series, ResampleParams, Resampler};
pub use zeros::{ZeroCorrector, ZeroParams, ZeroReport};
