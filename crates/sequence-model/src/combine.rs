//! Transforms that change the joint set or join recordings.

use std::sync::Arc;

use crate::error::{SequenceError, SequenceResult};
use crate::joint::{Joint, Position};
use crate::pose::Pose;
use crate::sequence::Sequence;
use crate::step::ProcessingStep;

impl Sequence {
    /// Add a joint at the mean position of `joint_labels`, appended after
    /// the existing joints.
    ///
    /// With `remove_averaged_joints`, the averaged joints are dropped. The
    /// name is kept: the joint set changes, not the recording.
    pub fn average_joints(
        &self,
        joint_labels: &[&str],
        new_joint_label: &str,
        remove_averaged_joints: bool,
    ) -> SequenceResult<Sequence> {
        if joint_labels.is_empty() {
            return Err(SequenceError::invalid_parameter(
                "joint_labels",
                "at least one joint is needed to average",
            ));
        }
        let mut averaged = Vec::with_capacity(joint_labels.len());
        for label in joint_labels {
            let index = self.label_index(label)?;
            if averaged.contains(&index) {
                return Err(SequenceError::invalid_parameter(
                    "joint_labels",
                    format!("{label:?} is listed twice"),
                ));
            }
            averaged.push(index);
        }

        let kept: Vec<usize> = (0..self.joint_count())
            .filter(|j| !(remove_averaged_joints && averaged.contains(j)))
            .collect();
        if kept.iter().any(|&j| self.joint_labels()[j] == new_joint_label) {
            return Err(SequenceError::invalid_parameter(
                "new_joint_label",
                format!("the sequence already has a joint {new_joint_label:?}"),
            ));
        }

        let labels: Arc<[String]> = kept
            .iter()
            .map(|&j| self.joint_labels()[j].clone())
            .chain(std::iter::once(new_joint_label.to_string()))
            .collect();

        let weight = 1.0 / averaged.len() as f64;
        let poses = self
            .poses()
            .iter()
            .map(|pose| {
                let sum = averaged
                    .iter()
                    .fold(Position::ORIGIN, |acc, &j| acc + pose.joints()[j].position);
                let joints = kept
                    .iter()
                    .map(|&j| pose.joints()[j])
                    .chain(std::iter::once(Joint::from_position(sum * weight)))
                    .collect();
                Pose::from_parts(
                    pose.timestamp(),
                    pose.relative_timestamp(),
                    Arc::clone(&labels),
                    joints,
                )
            })
            .collect();

        Ok(self.derived_with_layout(
            self.name(),
            labels,
            poses,
            ProcessingStep::AverageJoints {
                joint_labels: joint_labels.iter().map(|l| l.to_string()).collect(),
                new_joint_label: new_joint_label.to_string(),
                remove_averaged_joints,
            },
        ))
    }

    /// Append the poses of `other` after this sequence.
    ///
    /// `other` must carry the same joint labels, in any order. Its first pose
    /// lands `delay` seconds after the last pose of this sequence; `None`
    /// uses one sampling interval, which requires a uniform rate. The result
    /// keeps this sequence's metadata and history and is named after both
    /// sequences.
    pub fn concatenate(&self, other: &Sequence, delay: Option<f64>) -> SequenceResult<Sequence> {
        if other.joint_count() != self.joint_count() {
            return Err(SequenceError::invalid_parameter(
                "other",
                format!(
                    "{:?} has {} joints, expected {}",
                    other.name(),
                    other.joint_count(),
                    self.joint_count()
                ),
            ));
        }
        let order = self
            .joint_labels()
            .iter()
            .map(|label| other.label_index(label))
            .collect::<SequenceResult<Vec<usize>>>()?;

        let delay = match delay {
            Some(delay) => delay,
            None => 1.0 / self.sampling_rate()?,
        };
        if !delay.is_finite() || delay <= 0.0 {
            return Err(SequenceError::invalid_parameter(
                "delay",
                format!("delay must be positive, got {delay}"),
            ));
        }

        let labels = self.shared_labels();
        let offset = self.poses()[self.len() - 1].timestamp() + delay;
        let appended = other.poses().iter().map(|pose| {
            let joints = order.iter().map(|&j| pose.joints()[j]).collect();
            let t = offset + pose.relative_timestamp();
            Pose::from_parts(t, 0.0, Arc::clone(&labels), joints)
        });
        let poses: Vec<Pose> = self.poses().iter().cloned().chain(appended).collect();

        Ok(self.derived_with_poses(
            format!("{} {}", self.name(), other.name()),
            poses,
            ProcessingStep::Concatenate {
                other_name: other.name().to_string(),
                delay,
            },
        ))
    }
}
