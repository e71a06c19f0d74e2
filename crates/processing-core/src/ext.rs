//! Processing operations available directly on [`Sequence`].

use kinetrace_sequence_model::{Sequence, SequenceResult};

use crate::filter::{FilterParams, FrequencyFilter};
use crate::jitter::{JitterCorrector, JitterParams, JitterReport};
use crate::resample::{ResampleParams, Resampler};
use crate::zeros::{ZeroCorrector, ZeroParams};

/// Signal-processing transforms of a sequence.
///
/// Each call returns a new sequence named `"<name> +<suffix>"` with one more
/// processing step; the receiver is never modified.
pub trait SequenceProcessing {
    /// Remove twitches and jumps (suffix `+CJ`).
    fn correct_jitter(&self, params: &JitterParams) -> SequenceResult<Sequence>;

    /// Like [`correct_jitter`](Self::correct_jitter), also returning what was found.
    fn correct_jitter_with_report(
        &self,
        params: &JitterParams,
    ) -> SequenceResult<(Sequence, JitterReport)>;

    /// Resample to a uniform frequency (suffix `+RS<frequency>`).
    fn resample(&self, params: &ResampleParams) -> SequenceResult<Sequence>;

    /// Refill tracker dropouts reported at the origin (suffix `+CZ`).
    fn correct_zeros(&self, params: &ZeroParams) -> SequenceResult<Sequence>;

    /// Butterworth low-, high- or band-pass filtering (suffix `+FF`).
    fn filter_frequencies(&self, params: &FilterParams) -> SequenceResult<Sequence>;
}

impl SequenceProcessing for Sequence {
    fn correct_jitter(&self, params: &JitterParams) -> SequenceResult<Sequence> {
        self.correct_jitter_with_report(params)
            .map(|(sequence, _)| sequence)
    }

    fn correct_jitter_with_report(
        &self,
        params: &JitterParams,
    ) -> SequenceResult<(Sequence, JitterReport)> {
        JitterCorrector::new(params.clone())?.correct(self)
    }

    fn resample(&self, params: &ResampleParams) -> SequenceResult<Sequence> {
        Resampler::new(params.clone())?.resample(self)
    }

    fn correct_zeros(&self, params: &ZeroParams) -> SequenceResult<Sequence> {
        ZeroCorrector::new(*params)
            .correct(self)
            .map(|(sequence, _)| sequence)
    }

    fn filter_frequencies(&self, params: &FilterParams) -> SequenceResult<Sequence> {
        FrequencyFilter::new(*params)?.apply(self)
    }
}
