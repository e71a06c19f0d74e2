//! Jitter correction: detection and removal of twitches and jumps.
//!
//! A joint whose velocity towards the next sample reaches the threshold
//! anchors a candidate. If the joint comes back within the window (its
//! distance to the anchor drops below what the threshold allows for the
//! elapsed time) the excursion is a **twitch** and the samples in between are
//! rewritten. If it never comes back the movement is a **jump**, and the
//! window is rewritten as a ramp from the anchor to the sample closing the
//! window.
//!
//! Each joint is scanned once, left to right, independently of the others.

use kinetrace_common::{PreprocessingDefaults, WindowUnit};
use kinetrace_sequence_model::{
    Axis, InterpolationMethod, Joint, JointStatus, JitterWindow, Position, ProcessingStep,
    Sequence, SequenceError, SequenceResult,
};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

use crate::interpolate::Interpolator;

/// Jitter correction parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct JitterParams {
    /// Velocity, in distance units per second, from which a movement is suspect.
    pub velocity_threshold: f64,
    /// How far ahead of the anchor a twitch may return.
    pub window: JitterWindow,
    /// `Linear` ramps between the two anchors. Other methods refill the
    /// corrected samples from every uncorrected sample of the joint.
    pub method: InterpolationMethod,
    pub correct_twitches: bool,
    pub correct_jumps: bool,
}

impl JitterParams {
    pub fn new(velocity_threshold: f64, window: JitterWindow) -> Self {
        Self {
            velocity_threshold,
            window,
            method: InterpolationMethod::Linear,
            correct_twitches: true,
            correct_jumps: true,
        }
    }

    pub fn with_method(mut self, method: InterpolationMethod) -> Self {
        self.method = method;
        self
    }

    /// Build parameters from configured defaults.
    pub fn from_defaults(defaults: &PreprocessingDefaults) -> SequenceResult<Self> {
        let window = match defaults.jitter_window_unit {
            WindowUnit::Poses => {
                if !defaults.jitter_window.is_finite() || defaults.jitter_window < 1.0 {
                    return Err(SequenceError::invalid_parameter(
                        "jitter_window",
                        format!("window must be at least one pose, got {}", defaults.jitter_window),
                    ));
                }
                JitterWindow::Poses(defaults.jitter_window.round() as usize)
            }
            WindowUnit::Time(unit) => JitterWindow::Seconds(unit.to_seconds(defaults.jitter_window)),
        };
        Ok(Self::new(defaults.velocity_threshold, window)
            .with_method(defaults.jitter_method.parse()?))
    }

    fn validate(&self) -> SequenceResult<()> {
        if !self.velocity_threshold.is_finite() || self.velocity_threshold <= 0.0 {
            return Err(SequenceError::invalid_parameter(
                "velocity_threshold",
                format!("threshold must be positive, got {}", self.velocity_threshold),
            ));
        }
        match self.window {
            JitterWindow::Poses(0) => Err(SequenceError::invalid_parameter(
                "window",
                "window must span at least one pose",
            )),
            JitterWindow::Seconds(s) if !s.is_finite() || s <= 0.0 => {
                Err(SequenceError::invalid_parameter(
                    "window",
                    format!("window duration must be positive, got {s}"),
                ))
            }
            _ => Ok(()),
        }
    }
}

/// What a jitter pass found and changed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct JitterReport {
    pub twitches: usize,
    pub jumps: usize,
    pub corrected_samples: usize,
    pub joints: Vec<JointJitterStats>,
}

/// Per-joint counts of a jitter pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct JointJitterStats {
    pub label: String,
    pub twitches: usize,
    pub jumps: usize,
    pub corrected_samples: usize,
}

/// Twitch and jump correction engine.
pub struct JitterCorrector {
    params: JitterParams,
}

impl JitterCorrector {
    /// Create a corrector, rejecting invalid parameters up front.
    pub fn new(params: JitterParams) -> SequenceResult<Self> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn params(&self) -> &JitterParams {
        &self.params
    }

    /// Correct every joint of a sequence.
    pub fn correct(&self, sequence: &Sequence) -> SequenceResult<(Sequence, JitterReport)> {
        let timestamps = sequence.timestamps(false);

        let results = (0..sequence.joint_count())
            .into_par_iter()
            .map(|j| self.correct_track(&timestamps, &sequence.track(j)))
            .collect::<SequenceResult<Vec<(Vec<Joint>, TrackStats)>>>()?;

        let mut report = JitterReport::default();
        let mut tracks = Vec::with_capacity(results.len());
        for (label, (track, stats)) in sequence.joint_labels().iter().zip(results) {
            report.twitches += stats.twitches;
            report.jumps += stats.jumps;
            report.corrected_samples += stats.corrected_samples;
            if stats.twitches + stats.jumps > 0 {
                debug!(
                    joint = %label,
                    twitches = stats.twitches,
                    jumps = stats.jumps,
                    corrected = stats.corrected_samples,
                    "Jitter detected"
                );
            }
            report.joints.push(JointJitterStats {
                label: label.clone(),
                twitches: stats.twitches,
                jumps: stats.jumps,
                corrected_samples: stats.corrected_samples,
            });
            tracks.push(track);
        }

        info!(
            sequence = sequence.name(),
            twitches = report.twitches,
            jumps = report.jumps,
            corrected_samples = report.corrected_samples,
            "Jitter correction complete"
        );

        let corrected = sequence.derive(
            sequence.derived_name("+CJ"),
            timestamps,
            tracks,
            ProcessingStep::CorrectJitter {
                velocity_threshold: self.params.velocity_threshold,
                window: self.params.window,
                method: self.params.method,
                correct_twitches: self.params.correct_twitches,
                correct_jumps: self.params.correct_jumps,
            },
        )?;
        Ok((corrected, report))
    }

    /// Scan one joint track.
    fn correct_track(
        &self,
        timestamps: &[f64],
        track: &[Joint],
    ) -> SequenceResult<(Vec<Joint>, TrackStats)> {
        let n = track.len();
        let threshold = self.params.velocity_threshold;
        let mut out = track.to_vec();
        let mut corrected: Vec<bool> = track.iter().map(Joint::is_corrected).collect();
        let mut rewritten: Vec<usize> = Vec::new();
        let mut stats = TrackStats::default();

        let mut p = 0;
        while p + 1 < n {
            if corrected[p] || corrected[p + 1] {
                p += 1;
                continue;
            }

            let anchor = out[p].position;
            let velocity =
                anchor.distance_to(&out[p + 1].position) / (timestamps[p + 1] - timestamps[p]);
            if velocity < threshold {
                p += 1;
                continue;
            }
            out[p].status.insert(JointStatus::OVER_THRESHOLD);

            // Corrected samples cannot take part: the window stops before them.
            let mut last = (p + self.window_poses(timestamps, p)).min(n - 1);
            if let Some(k) = (p + 1..=last).find(|&k| corrected[k]) {
                last = k - 1;
            }
            if last <= p + 1 {
                p += 1;
                continue;
            }

            let returned = (2..=last - p).find(|&i| {
                anchor.distance_to(&out[p + i].position)
                    < threshold * (timestamps[p + i] - timestamps[p])
            });
            let (end, write) = match returned {
                Some(i) => {
                    stats.twitches += 1;
                    (p + i, self.params.correct_twitches)
                }
                None => {
                    stats.jumps += 1;
                    (last, self.params.correct_jumps)
                }
            };

            if write {
                let target = out[end].position;
                let span = timestamps[end] - timestamps[p];
                for k in p + 1..end {
                    let fraction = (timestamps[k] - timestamps[p]) / span;
                    out[k] = out[k]
                        .moved_to(Position::lerp(&anchor, &target, fraction), JointStatus::CORRECTED);
                    corrected[k] = true;
                    rewritten.push(k);
                }
            }
            p = end;
        }

        stats.corrected_samples = rewritten.len();
        if self.params.method != InterpolationMethod::Linear && !rewritten.is_empty() {
            self.refill(timestamps, &mut out, &corrected, &rewritten)?;
        }
        Ok((out, stats))
    }

    /// Re-evaluate rewritten samples from every uncorrected sample of the track.
    fn refill(
        &self,
        timestamps: &[f64],
        track: &mut [Joint],
        corrected: &[bool],
        rewritten: &[usize],
    ) -> SequenceResult<()> {
        let knots: Vec<usize> = (0..track.len()).filter(|&k| !corrected[k]).collect();
        let knot_times: Vec<f64> = knots.iter().map(|&k| timestamps[k]).collect();

        for axis in Axis::ALL {
            let interpolator = Interpolator::new(
                self.params.method,
                knot_times.clone(),
                knots.iter().map(|&k| track[k].position.axis(axis)).collect(),
            )?;
            for &k in rewritten {
                track[k].position.set_axis(axis, interpolator.eval(timestamps[k]));
            }
        }
        Ok(())
    }

    /// Window length in poses for the candidate anchored at `p`.
    ///
    /// A duration is converted with the actual timestamps following the
    /// anchor: the pose count whose elapsed time is closest to it.
    fn window_poses(&self, timestamps: &[f64], p: usize) -> usize {
        match self.params.window {
            JitterWindow::Poses(w) => w,
            JitterWindow::Seconds(duration) => {
                let mut k = 1;
                while p + k < timestamps.len() {
                    let elapsed = timestamps[p + k] - timestamps[p];
                    if elapsed >= duration {
                        let previous = timestamps[p + k - 1] - timestamps[p];
                        if k > 1 && duration - previous < elapsed - duration {
                            return k - 1;
                        }
                        return k;
                    }
                    k += 1;
                }
                // Fewer poses left than the duration asks for.
                k - 1
            }
        }
    }
}

#[derive(Debug, Default)]
struct TrackStats {
    twitches: usize,
    jumps: usize,
    corrected_samples: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use kinetrace_sequence_model::PoseRecord;

    /// One joint on the x axis, sampled at 10 Hz.
    fn make_track(xs: &[f64]) -> Sequence {
        let poses = xs
            .iter()
            .enumerate()
            .map(|(i, &x)| {
                PoseRecord::new(
                    i as f64 * 0.1,
                    vec![("Hand".to_string(), Position::new(x, 0.0, 0.0))],
                )
            })
            .collect();
        Sequence::new("track", poses).unwrap()
    }

    fn xs(sequence: &Sequence) -> Vec<f64> {
        sequence.positions("Hand").unwrap().iter().map(|p| p.x).collect()
    }

    fn corrector(window: usize) -> JitterCorrector {
        JitterCorrector::new(JitterParams::new(1.0, JitterWindow::Poses(window))).unwrap()
    }

    #[test]
    fn test_twitch_is_flattened() {
        let sequence = make_track(&[0.0, 0.0, 1.0, 0.0, 0.0]);
        let (out, report) = corrector(3).correct(&sequence).unwrap();

        let corrected = xs(&out);
        assert!((corrected[2] - 0.0).abs() < 1e-12);
        assert_eq!(report.twitches, 1);
        assert_eq!(report.jumps, 0);
        assert_eq!(report.corrected_samples, 1);

        let joints = out.track(0);
        assert!(joints[2].is_corrected());
        assert!(!joints[1].is_corrected());
        assert!(!joints[3].is_corrected());
        assert!(joints[1].status.contains(JointStatus::OVER_THRESHOLD));
    }

    #[test]
    fn test_jump_is_ramped() {
        let sequence = make_track(&[0.0, 0.0, 1.0, 1.0, 1.0, 1.0]);
        let (out, report) = corrector(3).correct(&sequence).unwrap();

        let corrected = xs(&out);
        assert_eq!(report.jumps, 1);
        assert_eq!(report.twitches, 0);
        assert!((corrected[2] - 1.0 / 3.0).abs() < 1e-9);
        assert!((corrected[3] - 2.0 / 3.0).abs() < 1e-9);
        assert!((corrected[4] - 1.0).abs() < 1e-12);
        assert!(!out.track(0)[4].is_corrected());
    }

    fn make_unit_track(xs: &[f64]) -> Sequence {
        let poses = xs
            .iter()
            .enumerate()
            .map(|(i, &x)| {
                PoseRecord::new(i as f64, vec![("Hand".to_string(), Position::new(x, 0.0, 0.0))])
            })
            .collect();
        Sequence::new("unit", poses).unwrap()
    }

    #[test]
    fn test_twitch_returning_near_anchor() {
        let sequence = make_unit_track(&[0.0, 2.0, 0.1, 0.0]);
        let (out, report) = corrector(2).correct(&sequence).unwrap();
        assert_eq!(report.twitches, 1);
        assert!((xs(&out)[1] - 0.05).abs() < 1e-12);
    }

    #[test]
    fn test_steady_climb_is_a_jump() {
        let sequence = make_unit_track(&[0.0, 2.0, 4.0, 6.0]);
        let (out, report) = corrector(2).correct(&sequence).unwrap();
        assert_eq!(report.jumps, 1);
        assert_eq!(report.twitches, 0);
        // Interpolated between poses 0 and 2, not pulled back to the origin.
        assert!((xs(&out)[1] - 2.0).abs() < 1e-12);
        assert!(out.track(0)[1].is_corrected());
    }

    #[test]
    fn test_gated_twitches_are_left_alone() {
        let sequence = make_track(&[0.0, 0.0, 1.0, 0.0, 0.0]);
        let mut params = JitterParams::new(1.0, JitterWindow::Poses(3));
        params.correct_twitches = false;
        let (out, report) = JitterCorrector::new(params).unwrap().correct(&sequence).unwrap();

        assert_eq!(xs(&out), xs(&sequence));
        assert_eq!(report.twitches, 1);
        assert_eq!(report.corrected_samples, 0);
    }

    #[test]
    fn test_gated_jumps_are_left_alone() {
        let sequence = make_track(&[0.0, 0.0, 1.0, 1.0, 1.0, 1.0]);
        let mut params = JitterParams::new(1.0, JitterWindow::Poses(3));
        params.correct_jumps = false;
        let (out, report) = JitterCorrector::new(params).unwrap().correct(&sequence).unwrap();

        assert_eq!(xs(&out), xs(&sequence));
        assert_eq!(report.jumps, 1);
        assert_eq!(report.corrected_samples, 0);
        assert!(out.track(0).iter().all(|joint| !joint.is_corrected()));
    }

    fn make_timed_track(times: &[f64], xs: &[f64]) -> Sequence {
        let poses = times
            .iter()
            .zip(xs)
            .map(|(&t, &x)| {
                PoseRecord::new(t, vec![("Hand".to_string(), Position::new(x, 0.0, 0.0))])
            })
            .collect();
        Sequence::new("uneven", poses).unwrap()
    }

    #[test]
    fn test_window_in_seconds_on_variable_rate_track() {
        // A burst of close samples, then a long gap before the hand comes back.
        let times = [0.0, 0.1, 0.12, 0.14, 0.16, 0.5, 0.6];
        let sequence = make_timed_track(&times, &[0.0, 0.0, 1.0, 1.0, 1.0, 0.0, 0.0]);
        assert!(!sequence.has_uniform_rate());

        // 0.35 s after the anchor reaches across the gap: the return is a twitch.
        let long = JitterCorrector::new(JitterParams::new(1.0, JitterWindow::Seconds(0.35)))
            .unwrap();
        let (out, report) = long.correct(&sequence).unwrap();
        assert_eq!(report.twitches, 1);
        assert_eq!(report.jumps, 0);
        assert_eq!(report.corrected_samples, 3);
        assert!(xs(&out)[2..5].iter().all(|x| x.abs() < 1e-12));

        // 0.055 s only covers the burst: the rise is ramped as a jump.
        let short = JitterCorrector::new(JitterParams::new(1.0, JitterWindow::Seconds(0.055)))
            .unwrap();
        let (out, report) = short.correct(&sequence).unwrap();
        assert_eq!(report.twitches, 0);
        assert_eq!(report.jumps, 1);
        let corrected = xs(&out);
        assert!((corrected[2] - 1.0 / 3.0).abs() < 1e-9);
        assert!((corrected[3] - 2.0 / 3.0).abs() < 1e-9);
        assert!((corrected[4] - 1.0).abs() < 1e-12);
        assert_eq!(out.timestamps(false), sequence.timestamps(false));
    }

    #[test]
    fn test_second_pass_is_a_no_op() {
        let sequence = make_track(&[0.0, 0.0, 1.0, 1.0, 1.0, 1.0, 0.2, 0.1, 0.0]);
        let corrector = corrector(3);
        let (once, _) = corrector.correct(&sequence).unwrap();
        let (twice, report) = corrector.correct(&once).unwrap();

        assert_eq!(xs(&once), xs(&twice));
        assert_eq!(report.corrected_samples, 0);
    }

    #[test]
    fn test_slow_motion_is_untouched() {
        let sequence = make_track(&[0.0, 0.05, 0.1, 0.15, 0.2]);
        let (out, report) = corrector(3).correct(&sequence).unwrap();
        assert_eq!(xs(&out), xs(&sequence));
        assert_eq!(
            report,
            JitterReport {
                joints: vec![JointJitterStats {
                    label: "Hand".to_string(),
                    ..Default::default()
                }],
                ..Default::default()
            }
        );
        assert_eq!(out.name(), "track +CJ");
    }

    #[test]
    fn test_window_in_seconds_uses_timestamps() {
        let sequence = make_track(&[0.0; 10]);
        let corrector =
            JitterCorrector::new(JitterParams::new(1.0, JitterWindow::Seconds(0.3))).unwrap();
        let timestamps = sequence.timestamps(false);
        assert_eq!(corrector.window_poses(&timestamps, 0), 3);
        assert_eq!(corrector.window_poses(&timestamps, 8), 1);
    }

    #[test]
    fn test_cubic_refill_passes_through_neighbours() {
        let sequence = make_track(&[0.0, 0.05, 0.1, 3.0, 0.2, 0.25, 0.3]);
        let params =
            JitterParams::new(1.0, JitterWindow::Poses(3)).with_method(InterpolationMethod::Cubic);
        let (out, report) = JitterCorrector::new(params).unwrap().correct(&sequence).unwrap();

        assert_eq!(report.twitches, 1);
        assert!((xs(&out)[3] - 0.15).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(JitterCorrector::new(JitterParams::new(0.0, JitterWindow::Poses(3))).is_err());
        assert!(JitterCorrector::new(JitterParams::new(1.0, JitterWindow::Poses(0))).is_err());
        assert!(JitterCorrector::new(JitterParams::new(1.0, JitterWindow::Seconds(-1.0))).is_err());
    }
}
