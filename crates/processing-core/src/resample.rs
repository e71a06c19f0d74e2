//! Resampling to a uniform frequency.
//!
//! Input may be variable-rate. Output timestamps are `t0 + k / f` for every
//! `k` with `t0 + k / f <= t_last`. Long recordings can be processed in
//! overlapping windows; each output sample is taken from the window whose
//! core (between the midpoints of its overlaps with its neighbours)
//! contains it.

use kinetrace_common::PreprocessingDefaults;
use kinetrace_sequence_model::{
    Axis, InterpolationMethod, Joint, Position, ProcessingStep, Sequence, SequenceError,
    SequenceResult,
};
use rayon::prelude::*;
use tracing::{debug, info};

use crate::interpolate::Interpolator;

/// Slack on the last output timestamp.
const END_TOLERANCE: f64 = 1e-6;

/// Resampling parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ResampleParams {
    /// Target frequency in Hz.
    pub frequency: f64,
    pub method: InterpolationMethod,
    /// Input samples per window. `None` interpolates the whole series at once.
    pub window_size: Option<usize>,
    /// Fraction of each window shared with the next one, in `[0, 1)`.
    pub overlap_ratio: f64,
}

impl ResampleParams {
    /// Cubic, unwindowed resampling at `frequency` Hz.
    pub fn new(frequency: f64) -> Self {
        Self {
            frequency,
            method: InterpolationMethod::Cubic,
            window_size: None,
            overlap_ratio: 0.5,
        }
    }

    pub fn with_method(mut self, method: InterpolationMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_window(mut self, window_size: usize, overlap_ratio: f64) -> Self {
        self.window_size = Some(window_size);
        self.overlap_ratio = overlap_ratio;
        self
    }

    /// Build parameters from configured defaults.
    pub fn from_defaults(defaults: &PreprocessingDefaults) -> SequenceResult<Self> {
        Ok(Self {
            frequency: defaults.resample_frequency,
            method: defaults.resample_method.parse()?,
            window_size: defaults.resample_window_size,
            overlap_ratio: defaults.resample_overlap_ratio,
        })
    }

    fn validate(&self) -> SequenceResult<()> {
        if !self.frequency.is_finite() || self.frequency <= 0.0 {
            return Err(SequenceError::invalid_parameter(
                "frequency",
                format!("target frequency must be positive, got {}", self.frequency),
            ));
        }
        if let Some(window_size) = self.window_size {
            plan_overlap(window_size, self.overlap_ratio)?;
        }
        Ok(())
    }
}

/// Uniform resampling engine.
pub struct Resampler {
    params: ResampleParams,
}

impl Resampler {
    /// Create a resampler, rejecting invalid parameters up front.
    pub fn new(params: ResampleParams) -> SequenceResult<Self> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn params(&self) -> &ResampleParams {
        &self.params
    }

    /// Resample every joint of a sequence.
    ///
    /// Resampled joints carry no status flags: every output sample is newly
    /// interpolated.
    pub fn resample(&self, sequence: &Sequence) -> SequenceResult<Sequence> {
        let timestamps = sequence.timestamps(false);
        if timestamps.len() < 2 {
            return Err(SequenceError::too_few_samples(
                "resampling",
                2,
                timestamps.len(),
            ));
        }

        let out_times = output_timestamps(&timestamps, self.params.frequency);
        let windows = self.plan(&timestamps)?;

        let tracks = (0..sequence.joint_count())
            .into_par_iter()
            .map(|j| {
                let positions: Vec<Position> =
                    sequence.track(j).iter().map(|joint| joint.position).collect();
                self.resample_positions(&timestamps, &positions, &out_times, &windows)
            })
            .collect::<SequenceResult<Vec<Vec<Joint>>>>()?;

        info!(
            sequence = sequence.name(),
            input_poses = timestamps.len(),
            output_poses = out_times.len(),
            frequency = self.params.frequency,
            method = %self.params.method,
            windows = windows.len(),
            "Resampled sequence"
        );

        sequence.derive(
            sequence.derived_name(&format!("+RS{}", self.params.frequency)),
            out_times,
            tracks,
            ProcessingStep::Resample {
                frequency: self.params.frequency,
                method: self.params.method,
                window_size: self.params.window_size,
                overlap_ratio: self.params.overlap_ratio,
            },
        )
    }

    /// Resample one scalar series. Returns `(values, timestamps)`.
    pub fn resample_series(
        &self,
        values: &[f64],
        timestamps: &[f64],
    ) -> SequenceResult<(Vec<f64>, Vec<f64>)> {
        if values.len() != timestamps.len() {
            return Err(SequenceError::invalid_input(format!(
                "{} values but {} timestamps",
                values.len(),
                timestamps.len()
            )));
        }
        if timestamps.len() < 2 {
            return Err(SequenceError::too_few_samples(
                "resampling",
                2,
                timestamps.len(),
            ));
        }

        let out_times = output_timestamps(timestamps, self.params.frequency);
        let windows = self.plan(timestamps)?;
        let out_values = self.resample_axis(timestamps, values, &out_times, &windows)?;
        Ok((out_values, out_times))
    }

    fn plan(&self, timestamps: &[f64]) -> SequenceResult<Vec<Window>> {
        match self.params.window_size {
            Some(window_size) => {
                let windows =
                    plan_windows(timestamps, window_size, self.params.overlap_ratio)?;
                debug!(count = windows.len(), window_size, "Planned resampling windows");
                Ok(windows)
            }
            None => Ok(vec![Window {
                start: 0,
                end: timestamps.len() - 1,
                cut: f64::INFINITY,
            }]),
        }
    }

    fn resample_positions(
        &self,
        timestamps: &[f64],
        positions: &[Position],
        out_times: &[f64],
        windows: &[Window],
    ) -> SequenceResult<Vec<Joint>> {
        let mut out = vec![Joint::default(); out_times.len()];
        for axis in Axis::ALL {
            let values: Vec<f64> = positions.iter().map(|p| p.axis(axis)).collect();
            let resampled = self.resample_axis(timestamps, &values, out_times, windows)?;
            for (joint, value) in out.iter_mut().zip(resampled) {
                joint.position.set_axis(axis, value);
            }
        }
        Ok(out)
    }

    fn resample_axis(
        &self,
        timestamps: &[f64],
        values: &[f64],
        out_times: &[f64],
        windows: &[Window],
    ) -> SequenceResult<Vec<f64>> {
        let mut out = Vec::with_capacity(out_times.len());
        let mut next = 0;
        let last = timestamps.len() - 1;
        for window in windows {
            // One extra knot on each side keeps the slopes at the window's
            // own ends identical to the whole-series ones.
            let knots = window.start.saturating_sub(1)..=(window.end + 1).min(last);
            let interpolator = Interpolator::new(
                self.params.method,
                timestamps[knots.clone()].to_vec(),
                values[knots].to_vec(),
            )?;
            while next < out_times.len() && out_times[next] < window.cut {
                out.push(interpolator.eval(out_times[next]));
                next += 1;
            }
        }
        Ok(out)
    }
}

/// Resample one scalar series without building a [`Resampler`] first.
pub fn resample_series(
    values: &[f64],
    timestamps: &[f64],
    frequency: f64,
    method: InterpolationMethod,
    window_size: Option<usize>,
    overlap_ratio: f64,
) -> SequenceResult<(Vec<f64>, Vec<f64>)> {
    Resampler::new(ResampleParams {
        frequency,
        method,
        window_size,
        overlap_ratio,
    })?
    .resample_series(values, timestamps)
}

/// Uniform output timestamps from the first input timestamp to the last.
pub fn output_timestamps(timestamps: &[f64], frequency: f64) -> Vec<f64> {
    let (Some(&t0), Some(&t_last)) = (timestamps.first(), timestamps.last()) else {
        return Vec::new();
    };
    let count = (((t_last - t0) + END_TOLERANCE) * frequency).floor() as usize + 1;
    (0..count).map(|k| t0 + k as f64 / frequency).collect()
}

/// A span of input samples, inclusive, and the time before which output
/// samples are evaluated from it.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Window {
    start: usize,
    end: usize,
    cut: f64,
}

/// Overlap in samples for a window size and ratio. Consecutive windows
/// always share at least one sample so that no output falls between them.
fn plan_overlap(window_size: usize, overlap_ratio: f64) -> SequenceResult<usize> {
    if window_size < 2 {
        return Err(SequenceError::invalid_parameter(
            "window_size",
            format!("window size must be at least 2 samples, got {window_size}"),
        ));
    }
    if !(0.0..1.0).contains(&overlap_ratio) {
        return Err(SequenceError::invalid_parameter(
            "overlap_ratio",
            format!("overlap ratio must be in [0, 1), got {overlap_ratio}"),
        ));
    }
    let overlap = ((overlap_ratio * window_size as f64).ceil() as usize).max(1);
    if overlap >= window_size {
        return Err(SequenceError::invalid_parameter(
            "window_size",
            format!("window size {window_size} must exceed its overlap of {overlap} samples"),
        ));
    }
    Ok(overlap)
}

fn plan_windows(
    timestamps: &[f64],
    window_size: usize,
    overlap_ratio: f64,
) -> SequenceResult<Vec<Window>> {
    let overlap = plan_overlap(window_size, overlap_ratio)?;
    let stride = window_size - overlap;
    let last = timestamps.len() - 1;

    let mut windows: Vec<Window> = Vec::new();
    let mut start = 0;
    loop {
        let end = (start + window_size - 1).min(last);
        if let Some(previous) = windows.last_mut() {
            previous.cut = (timestamps[start] + timestamps[previous.end]) / 2.0;
        }
        windows.push(Window {
            start,
            end,
            cut: f64::INFINITY,
        });
        if end == last {
            break;
        }
        start += stride;
    }
    Ok(windows)
}
