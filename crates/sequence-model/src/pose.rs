//! Poses: the skeleton at one timestamp.

use std::sync::Arc;

use crate::joint::{Joint, Position};
use crate::record::{JointMap, PoseRecord};

/// All joints of the skeleton at one timestamp.
///
/// Joints are stored in the canonical label order of the owning sequence.
/// The label list itself is immutable and shared between the poses of a
/// sequence; joints are owned by each pose.
#[derive(Debug, Clone, PartialEq)]
pub struct Pose {
    timestamp: f64,
    relative_timestamp: f64,
    labels: Arc<[String]>,
    joints: Vec<Joint>,
}

impl Pose {
    pub(crate) fn from_parts(
        timestamp: f64,
        relative_timestamp: f64,
        labels: Arc<[String]>,
        joints: Vec<Joint>,
    ) -> Self {
        debug_assert_eq!(labels.len(), joints.len());
        Self {
            timestamp,
            relative_timestamp,
            labels,
            joints,
        }
    }

    /// Same timestamp and labels, different joints.
    pub(crate) fn with_joints(&self, joints: Vec<Joint>) -> Self {
        Self::from_parts(
            self.timestamp,
            self.relative_timestamp,
            Arc::clone(&self.labels),
            joints,
        )
    }

    /// Recompute the relative timestamp against a new first pose.
    pub(crate) fn rebased(mut self, origin: f64) -> Self {
        self.relative_timestamp = self.timestamp - origin;
        self
    }

    /// Absolute timestamp, in seconds.
    pub fn timestamp(&self) -> f64 {
        self.timestamp
    }

    /// Seconds elapsed since the first pose of the owning sequence.
    pub fn relative_timestamp(&self) -> f64 {
        self.relative_timestamp
    }

    /// Timestamp in the requested reference.
    pub fn time(&self, relative: bool) -> f64 {
        if relative {
            self.relative_timestamp
        } else {
            self.timestamp
        }
    }

    pub fn len(&self) -> usize {
        self.joints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joints.is_empty()
    }

    /// Joint labels in canonical order.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Joints in canonical order.
    pub fn joints(&self) -> &[Joint] {
        &self.joints
    }

    /// Joint at a canonical index.
    pub fn joint_at(&self, index: usize) -> Option<&Joint> {
        self.joints.get(index)
    }

    /// Joint by label.
    pub fn joint(&self, label: &str) -> Option<&Joint> {
        let index = self.labels.iter().position(|l| l == label)?;
        self.joints.get(index)
    }

    /// Position of a joint by label.
    pub fn position(&self, label: &str) -> Option<Position> {
        self.joint(label).map(|j| j.position)
    }

    /// Iterate `(label, joint)` pairs in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Joint)> {
        self.labels
            .iter()
            .map(String::as_str)
            .zip(self.joints.iter())
    }

    /// Interchange representation of this pose.
    pub fn to_record(&self, relative: bool) -> PoseRecord {
        PoseRecord {
            timestamp: self.time(relative),
            joints: JointMap(
                self.iter()
                    .map(|(label, joint)| (label.to_string(), joint.position))
                    .collect(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_pose() -> Pose {
        let labels: Arc<[String]> = vec!["Head".to_string(), "HandRight".to_string()].into();
        Pose::from_parts(
            10.5,
            0.5,
            labels,
            vec![Joint::new(0.0, 1.6, 2.0), Joint::new(0.4, 1.0, 1.9)],
        )
    }

    #[test]
    fn test_joint_lookup_by_label() {
        let pose = make_pose();
        assert_eq!(pose.position("HandRight"), Some(Position::new(0.4, 1.0, 1.9)));
        assert!(pose.joint("Pelvis").is_none());
        assert_eq!(pose.len(), 2);
    }

    #[test]
    fn test_iteration_follows_canonical_order() {
        let pose = make_pose();
        let labels: Vec<&str> = pose.iter().map(|(label, _)| label).collect();
        assert_eq!(labels, vec!["Head", "HandRight"]);
    }

    #[test]
    fn test_record_uses_requested_timestamp() {
        let pose = make_pose();
        assert!((pose.to_record(false).timestamp - 10.5).abs() < 1e-12);
        assert!((pose.to_record(true).timestamp - 0.5).abs() < 1e-12);
        assert_eq!(pose.to_record(true).joints.0.len(), 2);
    }
}
