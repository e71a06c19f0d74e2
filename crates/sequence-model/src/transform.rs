//! Structural transforms hosted by [`Sequence`]: re-referencing and trimming.
//!
//! Signal-processing transforms (jitter, resampling, zeros, filtering) live in
//! `kinetrace-processing-core`.

use crate::error::{SequenceError, SequenceResult};
use crate::joint::{JointStatus, Position};
use crate::pose::Pose;
use crate::sequence::Sequence;
use crate::step::ProcessingStep;

/// Slack applied to trim bounds so that a bound computed from timestamps
/// still selects the pose it was computed from.
const TRIM_EPSILON: f64 = 1e-9;

/// Joints tried, in order, by [`Sequence::re_reference_auto`].
pub const AUTO_REFERENCE_JOINTS: [&str; 2] = ["SpineMid", "Chest"];

impl Sequence {
    /// Express every joint relative to a reference joint.
    ///
    /// With `place_at_zero`, the reference joint's position is subtracted from
    /// every joint of each pose, so the reference sits at the origin. Without
    /// it, only the reference's displacement since the first pose is removed,
    /// so the reference stays where it started.
    pub fn re_reference(
        &self,
        reference_joint_label: &str,
        place_at_zero: bool,
    ) -> SequenceResult<Sequence> {
        let reference = self.label_index(reference_joint_label)?;
        let first = self.poses()[0].joints()[reference].position;

        let poses = self
            .poses()
            .iter()
            .map(|pose| {
                let anchor = pose.joints()[reference].position;
                let offset = if place_at_zero { anchor } else { anchor - first };
                let joints = pose
                    .joints()
                    .iter()
                    .enumerate()
                    .map(|(j, joint)| {
                        // Exact zero for the reference, without rounding residue.
                        let position = if place_at_zero && j == reference {
                            Position::ORIGIN
                        } else {
                            joint.position - offset
                        };
                        joint.moved_to(position, JointStatus::RE_REFERENCED)
                    })
                    .collect();
                pose.with_joints(joints)
            })
            .collect();

        Ok(self.derived_with_poses(
            self.derived_name("+RF"),
            poses,
            ProcessingStep::ReReference {
                reference_joint_label: reference_joint_label.to_string(),
                place_at_zero,
            },
        ))
    }

    /// Re-reference on the first of `SpineMid` or `Chest` present.
    pub fn re_reference_auto(&self, place_at_zero: bool) -> SequenceResult<Sequence> {
        let label = AUTO_REFERENCE_JOINTS
            .iter()
            .find(|label| self.has_joint(label))
            .ok_or_else(|| {
                SequenceError::invalid_parameter(
                    "reference_joint_label",
                    format!(
                        "no default reference joint found (tried {})",
                        AUTO_REFERENCE_JOINTS.join(", ")
                    ),
                )
            })?;
        self.re_reference(label, place_at_zero)
    }

    /// Keep the poses whose timestamp lies in `[start, end]`, inclusive.
    ///
    /// `end = None` keeps everything from `start` to the last pose. Bounds
    /// are read as relative or absolute timestamps per `use_relative_timestamps`.
    pub fn trim(
        &self,
        start: f64,
        end: Option<f64>,
        use_relative_timestamps: bool,
    ) -> SequenceResult<Sequence> {
        let last = self
            .poses()
            .last()
            .map(|p| p.time(use_relative_timestamps))
            .unwrap_or(0.0);
        if !start.is_finite() || end.is_some_and(|end| !end.is_finite()) {
            return Err(SequenceError::invalid_parameter(
                "start/end",
                "trim bounds must be finite",
            ));
        }
        // Only an explicit end can invert the range.
        if let Some(end) = end.filter(|&end| start > end) {
            return Err(SequenceError::invalid_parameter(
                "start",
                format!("start ({start}) is after end ({end})"),
            ));
        }
        let end = end.unwrap_or(last);

        let poses: Vec<Pose> = self
            .poses()
            .iter()
            .filter(|pose| {
                let t = pose.time(use_relative_timestamps);
                t >= start - TRIM_EPSILON && t <= end + TRIM_EPSILON
            })
            .cloned()
            .collect();

        if poses.is_empty() {
            return Err(SequenceError::empty_result(format!(
                "trimming to [{start}, {end}]"
            )));
        }

        Ok(self.derived_with_poses(
            self.derived_name("+TR"),
            poses,
            ProcessingStep::Trim {
                start,
                end,
                use_relative_timestamps,
            },
        ))
    }

    /// Align the sequence with an audio recording that starts `delay`
    /// seconds after the first pose and lasts `audio_duration` seconds.
    pub fn trim_to_audio(&self, delay: f64, audio_duration: f64) -> SequenceResult<Sequence> {
        if !delay.is_finite() || delay < 0.0 {
            return Err(SequenceError::invalid_parameter(
                "delay",
                format!("delay must be zero or positive, got {delay}"),
            ));
        }
        if !audio_duration.is_finite() || audio_duration <= 0.0 {
            return Err(SequenceError::invalid_parameter(
                "audio_duration",
                format!("audio duration must be positive, got {audio_duration}"),
            ));
        }
        let end = delay + audio_duration;
        if end > self.duration() + TRIM_EPSILON {
            return Err(SequenceError::invalid_parameter(
                "audio_duration",
                format!(
                    "audio ends at {end:.3}s but the sequence lasts {:.3}s",
                    self.duration()
                ),
            ));
        }

        // Recorded as the audio alignment rather than the underlying trim.
        let poses = self.trim(delay, Some(end), true)?.poses().to_vec();
        Ok(self.derived_with_poses(
            self.derived_name("+TR"),
            poses,
            ProcessingStep::TrimToAudio {
                delay,
                audio_duration,
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use crate::joint::Position;
    use crate::record::PoseRecord;
    use crate::sequence::Sequence;
    use crate::step::ProcessingStep;
    use crate::SequenceError;

    fn make_walk(n: usize) -> Sequence {
        let poses = (0..n)
            .map(|i| {
                let x = 0.05 * i as f64;
                PoseRecord::new(
                    10.0 + i as f64 * 0.1,
                    vec![
                        ("Head".to_string(), Position::new(x, 1.7, 2.0)),
                        ("SpineMid".to_string(), Position::new(x, 1.2, 2.1)),
                        ("HandLeft".to_string(), Position::new(x - 0.3, 1.0, 1.9)),
                    ],
                )
            })
            .collect();
        Sequence::new("walk", poses).unwrap()
    }

    #[test]
    fn test_re_reference_places_reference_at_origin() {
        let sequence = make_walk(5);
        let out = sequence.re_reference("SpineMid", true).unwrap();

        for pose in out.poses() {
            assert_eq!(pose.position("SpineMid"), Some(Position::ORIGIN));
            let head = pose.position("Head").unwrap();
            assert!((head.y - 0.5).abs() < 1e-9);
            assert!(pose.iter().all(|(_, j)| j.is_re_referenced() && !j.is_corrected()));
        }
        assert_eq!(out.name(), "walk +RF");
        assert!(matches!(
            out.processing_steps().last(),
            Some(ProcessingStep::ReReference { place_at_zero: true, .. })
        ));

        // The source is left untouched.
        assert!(!sequence.poses()[0].joints()[0].is_re_referenced());
    }

    #[test]
    fn test_re_reference_keeps_initial_position() {
        let sequence = make_walk(5);
        let out = sequence.re_reference("SpineMid", false).unwrap();
        for pose in out.poses() {
            let spine = pose.position("SpineMid").unwrap();
            assert!(spine.distance_to(&Position::new(0.0, 1.2, 2.1)) < 1e-9);
        }
    }

    #[test]
    fn test_re_reference_unknown_joint() {
        let sequence = make_walk(3);
        assert!(matches!(
            sequence.re_reference("Tail", true),
            Err(SequenceError::UnknownJoint { .. })
        ));
    }

    #[test]
    fn test_re_reference_auto_prefers_spine_mid() {
        let sequence = make_walk(3);
        let out = sequence.re_reference_auto(true).unwrap();
        assert_eq!(out.poses()[2].position("SpineMid"), Some(Position::ORIGIN));

        let poses = vec![PoseRecord::new(0.0, vec![("Head".to_string(), Position::ORIGIN)])];
        let headless = Sequence::new("head only", poses).unwrap();
        assert!(matches!(
            headless.re_reference_auto(true),
            Err(SequenceError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_trim_inclusive_bounds() {
        let sequence = make_walk(11);
        let out = sequence.trim(0.2, Some(0.5), true).unwrap();
        assert_eq!(out.len(), 4);
        assert!((out.poses()[0].timestamp() - 10.2).abs() < 1e-9);
        assert!(out.poses()[0].relative_timestamp().abs() < 1e-12);
        assert!((out.duration() - 0.3).abs() < 1e-9);
        assert_eq!(out.name(), "walk +TR");
    }

    #[test]
    fn test_trim_absolute_timestamps_and_open_end() {
        let sequence = make_walk(11);
        let out = sequence.trim(10.8, None, false).unwrap();
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn test_trim_errors() {
        let sequence = make_walk(5);
        assert!(matches!(
            sequence.trim(0.3, Some(0.1), true),
            Err(SequenceError::InvalidParameter { .. })
        ));
        assert!(matches!(
            sequence.trim(0.11, Some(0.19), true),
            Err(SequenceError::EmptyResult { .. })
        ));
    }

    #[test]
    fn test_trim_outside_the_recording_is_empty() {
        let sequence = make_walk(5);
        for (start, end) in [(100.0, None), (1.0, Some(2.0)), (-5.0, Some(-1.0))] {
            assert!(
                matches!(
                    sequence.trim(start, end, true),
                    Err(SequenceError::EmptyResult { .. })
                ),
                "trim({start}, {end:?})"
            );
        }
        assert!(matches!(
            sequence.trim(20.0, None, false),
            Err(SequenceError::EmptyResult { .. })
        ));
    }

    #[test]
    fn test_trim_to_audio() {
        let sequence = make_walk(21);
        let out = sequence.trim_to_audio(0.5, 1.0).unwrap();
        assert_eq!(out.len(), 11);
        assert!((out.duration() - 1.0).abs() < 1e-9);
        assert_eq!(out.processing_steps().len(), 1);
        assert!(matches!(
            out.processing_steps()[0],
            ProcessingStep::TrimToAudio { .. }
        ));

        assert!(sequence.trim_to_audio(-0.1, 1.0).is_err());
        assert!(sequence.trim_to_audio(0.0, 0.0).is_err());
        assert!(sequence.trim_to_audio(1.5, 1.0).is_err());
    }
}
