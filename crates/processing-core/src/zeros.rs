//! Zero correction.
//!
//! Trackers report a lost joint as the exact origin. Runs of such samples
//! inside a track are refilled from the valid samples around them. Runs that
//! touch either end of the sequence have nothing to interpolate from and
//! follow the [`ZeroBoundary`] policy.

use kinetrace_common::PreprocessingDefaults;
use kinetrace_sequence_model::{
    Axis, InterpolationMethod, Joint, JointStatus, Position, ProcessingStep, Sequence,
    SequenceError, SequenceResult, ZeroBoundary,
};
use rayon::prelude::*;
use tracing::{info, warn};

use crate::interpolate::Interpolator;

/// Zero correction parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ZeroParams {
    /// `Linear` uses the two valid neighbours of each run. Other methods
    /// use every valid sample of the joint as knots.
    pub method: InterpolationMethod,
    pub boundary: ZeroBoundary,
}

impl ZeroParams {
    /// Build parameters from configured defaults.
    pub fn from_defaults(defaults: &PreprocessingDefaults) -> SequenceResult<Self> {
        Ok(Self {
            method: defaults.zero_correction_method.parse()?,
            boundary: ZeroBoundary::default(),
        })
    }
}

/// Counts from a zero correction pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ZeroReport {
    pub interior_runs: usize,
    pub boundary_runs: usize,
    pub filled_samples: usize,
}

/// Dropout refilling engine.
pub struct ZeroCorrector {
    params: ZeroParams,
}

impl ZeroCorrector {
    pub fn new(params: ZeroParams) -> Self {
        Self { params }
    }

    /// Refill the zero runs of every joint.
    pub fn correct(&self, sequence: &Sequence) -> SequenceResult<(Sequence, ZeroReport)> {
        let timestamps = sequence.timestamps(false);

        let results = sequence
            .joint_labels()
            .par_iter()
            .enumerate()
            .map(|(j, label)| self.correct_track(label, &timestamps, sequence.track(j)))
            .collect::<SequenceResult<Vec<(Vec<Joint>, ZeroReport)>>>()?;

        let mut report = ZeroReport::default();
        let mut tracks = Vec::with_capacity(results.len());
        for (track, counts) in results {
            report.interior_runs += counts.interior_runs;
            report.boundary_runs += counts.boundary_runs;
            report.filled_samples += counts.filled_samples;
            tracks.push(track);
        }

        info!(
            sequence = sequence.name(),
            interior_runs = report.interior_runs,
            boundary_runs = report.boundary_runs,
            filled_samples = report.filled_samples,
            "Zero correction complete"
        );

        let corrected = sequence.derive(
            sequence.derived_name("+CZ"),
            timestamps,
            tracks,
            ProcessingStep::CorrectZeros {
                method: self.params.method,
                boundary: self.params.boundary,
            },
        )?;
        Ok((corrected, report))
    }

    fn correct_track(
        &self,
        label: &str,
        timestamps: &[f64],
        mut track: Vec<Joint>,
    ) -> SequenceResult<(Vec<Joint>, ZeroReport)> {
        let runs = zero_runs(&track);
        let mut report = ZeroReport::default();
        if runs.is_empty() {
            return Ok((track, report));
        }

        let last = track.len() - 1;
        let interpolator = self.knot_interpolator(timestamps, &track)?;

        for (start, end) in runs {
            if start == 0 || end == last {
                match self.params.boundary {
                    ZeroBoundary::Error => {
                        return Err(SequenceError::BoundaryInterpolation {
                            joint: label.to_string(),
                            start,
                            end,
                        })
                    }
                    ZeroBoundary::Flag => {
                        warn!(
                            joint = label,
                            start, end, "Zero run touches the sequence boundary, left as zero"
                        );
                        for joint in &mut track[start..=end] {
                            joint.status.insert(JointStatus::ZERO);
                        }
                        report.boundary_runs += 1;
                        continue;
                    }
                }
            }

            let before = track[start - 1].position;
            let after = track[end + 1].position;
            let span = timestamps[end + 1] - timestamps[start - 1];
            for k in start..=end {
                let position = match &interpolator {
                    Some(axes) => Position::new(
                        axes[0].eval(timestamps[k]),
                        axes[1].eval(timestamps[k]),
                        axes[2].eval(timestamps[k]),
                    ),
                    None => {
                        let fraction = (timestamps[k] - timestamps[start - 1]) / span;
                        Position::lerp(&before, &after, fraction)
                    }
                };
                track[k] = track[k].moved_to(
                    position,
                    JointStatus::INTERPOLATED.union(JointStatus::ZERO),
                );
            }
            report.interior_runs += 1;
            report.filled_samples += end - start + 1;
        }

        Ok((track, report))
    }

    /// Per-axis interpolators over every valid sample, for non-linear methods.
    ///
    /// `None` for linear, and for tracks with fewer than two valid samples
    /// (every run of such a track touches a boundary).
    fn knot_interpolator(
        &self,
        timestamps: &[f64],
        track: &[Joint],
    ) -> SequenceResult<Option<[Interpolator; 3]>> {
        if self.params.method == InterpolationMethod::Linear {
            return Ok(None);
        }
        let valid: Vec<usize> = (0..track.len())
            .filter(|&k| !track[k].position.is_origin())
            .collect();
        if valid.len() < 2 {
            return Ok(None);
        }

        let times: Vec<f64> = valid.iter().map(|&k| timestamps[k]).collect();
        let axis = |axis: Axis| {
            Interpolator::new(
                self.params.method,
                times.clone(),
                valid.iter().map(|&k| track[k].position.axis(axis)).collect(),
            )
        };
        Ok(Some([axis(Axis::X)?, axis(Axis::Y)?, axis(Axis::Z)?]))
    }
}

/// Inclusive index ranges of consecutive samples at the origin.
fn zero_runs(track: &[Joint]) -> Vec<(usize, usize)> {
    let mut runs = Vec::new();
    let mut start = None;
    for (k, joint) in track.iter().enumerate() {
        match (joint.position.is_origin(), start) {
            (true, None) => start = Some(k),
            (false, Some(s)) => {
                runs.push((s, k - 1));
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        runs.push((s, track.len() - 1));
    }
    runs
}

#[cfg(test)]
mod tests {
    use super::*;
    use kinetrace_sequence_model::PoseRecord;

    fn make_track(points: &[(f64, f64, f64)]) -> Sequence {
        let poses = points
            .iter()
            .enumerate()
            .map(|(i, &(x, y, z))| {
                PoseRecord::new(
                    i as f64 / 30.0,
                    vec![("Knee".to_string(), Position::new(x, y, z))],
                )
            })
            .collect();
        Sequence::new("zeros", poses).unwrap()
    }

    #[test]
    fn test_zero_runs() {
        let joints: Vec<Joint> = [1.0, 0.0, 0.0, 2.0, 0.0]
            .iter()
            .map(|&x| Joint::new(x, 0.0, 0.0))
            .collect();
        assert_eq!(zero_runs(&joints), vec![(1, 2), (4, 4)]);
    }

    #[test]
    fn test_interior_run_is_interpolated() {
        let sequence = make_track(&[
            (1.0, 1.0, 1.0),
            (0.0, 0.0, 0.0),
            (0.0, 0.0, 0.0),
            (4.0, 1.0, 1.0),
        ]);
        let (out, report) = ZeroCorrector::new(ZeroParams::default())
            .correct(&sequence)
            .unwrap();

        let track = out.track(0);
        assert!((track[1].x() - 2.0).abs() < 1e-9);
        assert!((track[2].x() - 3.0).abs() < 1e-9);
        assert!((track[2].y() - 1.0).abs() < 1e-9);
        assert!(track[1].is_interpolated() && track[1].is_zero());
        assert!(!track[0].is_zero());
        assert_eq!(report.interior_runs, 1);
        assert_eq!(report.filled_samples, 2);
        assert_eq!(out.name(), "zeros +CZ");
    }

    #[test]
    fn test_boundary_run_is_flagged_by_default() {
        let sequence = make_track(&[(0.0, 0.0, 0.0), (1.0, 1.0, 1.0), (2.0, 1.0, 1.0)]);
        let (out, report) = ZeroCorrector::new(ZeroParams::default())
            .correct(&sequence)
            .unwrap();

        let first = out.track(0)[0];
        assert_eq!(first.position, Position::ORIGIN);
        assert!(first.is_zero());
        assert!(!first.is_interpolated());
        assert_eq!(report.boundary_runs, 1);
    }

    #[test]
    fn test_boundary_run_fails_under_strict_policy() {
        let sequence = make_track(&[(1.0, 1.0, 1.0), (2.0, 1.0, 1.0), (0.0, 0.0, 0.0)]);
        let params = ZeroParams {
            boundary: ZeroBoundary::Error,
            ..ZeroParams::default()
        };
        let err = ZeroCorrector::new(params).correct(&sequence).unwrap_err();
        assert!(matches!(
            err,
            SequenceError::BoundaryInterpolation { start: 2, end: 2, .. }
        ));
    }

    #[test]
    fn test_cubic_method_uses_all_valid_samples() {
        let points: Vec<(f64, f64, f64)> = (0..8)
            .map(|i| {
                if i == 4 {
                    (0.0, 0.0, 0.0)
                } else {
                    (0.5 * i as f64 + 1.0, 1.0, 1.0)
                }
            })
            .collect();
        let sequence = make_track(&points);
        let params = ZeroParams {
            method: InterpolationMethod::Cubic,
            ..ZeroParams::default()
        };
        let (out, _) = ZeroCorrector::new(params).correct(&sequence).unwrap();
        assert!((out.track(0)[4].x() - 3.0).abs() < 1e-9);
    }
}
