//! Interchange shape exchanged with loaders and savers.
//!
//! File formats are decided outside this crate. What crosses the boundary is
//! a [`SequenceRecord`]: ordered timestamps, one label → `[x, y, z]` map per
//! pose, and the processing history. Per-pose maps keep the canonical joint
//! order in both directions.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::SequenceResult;
use crate::joint::Position;
use crate::sequence::Sequence;
use crate::step::ProcessingStep;

/// A whole sequence in interchange form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceRecord {
    /// Human-readable sequence name.
    pub name: String,

    /// Audio recorded alongside the motion, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_path: Option<PathBuf>,

    /// Wall-clock time of the recording (RFC 3339).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recorded_at: Option<DateTime<Utc>>,

    /// Canonical joint order. When empty, the order of the first pose is used.
    #[serde(default)]
    pub joint_labels: Vec<String>,

    /// Poses in chronological order.
    pub poses: Vec<PoseRecord>,

    /// Transforms already applied to this sequence.
    #[serde(default)]
    pub processing_steps: Vec<ProcessingStep>,
}

/// One pose in interchange form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseRecord {
    /// Timestamp in seconds.
    pub timestamp: f64,

    /// Joint positions keyed by label.
    pub joints: JointMap,
}

impl PoseRecord {
    pub fn new(timestamp: f64, joints: Vec<(String, Position)>) -> Self {
        Self {
            timestamp,
            joints: JointMap(joints),
        }
    }
}

/// Ordered label → position map.
///
/// Serialized as a JSON object whose keys appear in vector order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct JointMap(pub Vec<(String, Position)>);

impl Serialize for JointMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (label, position) in &self.0 {
            map.serialize_entry(label, position)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for JointMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct JointMapVisitor;

        impl<'de> Visitor<'de> for JointMapVisitor {
            type Value = JointMap;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of joint labels to [x, y, z] positions")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<JointMap, A::Error> {
                let mut joints = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((label, position)) = access.next_entry::<String, Position>()? {
                    joints.push((label, position));
                }
                Ok(JointMap(joints))
            }
        }

        deserializer.deserialize_map(JointMapVisitor)
    }
}

/// Parse a sequence from its JSON interchange form.
pub fn sequence_from_json(json: &str) -> SequenceResult<Sequence> {
    let record: SequenceRecord = serde_json::from_str(json)?;
    Sequence::from_record(record)
}

/// Serialize a sequence to its JSON interchange form.
pub fn sequence_to_json(sequence: &Sequence) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&sequence.to_record(false))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_joint_map_keeps_document_order() {
        let json = r#"{"timestamp":0.0,"joints":{"Head":[0,1,2],"Chest":[0,0.5,2],"Arm":[1,1,1]}}"#;
        let pose: PoseRecord = serde_json::from_str(json).unwrap();
        let labels: Vec<&str> = pose.joints.0.iter().map(|(l, _)| l.as_str()).collect();
        assert_eq!(labels, vec!["Head", "Chest", "Arm"]);

        let out = serde_json::to_string(&pose).unwrap();
        let head = out.find("Head").unwrap();
        let chest = out.find("Chest").unwrap();
        let arm = out.find("Arm").unwrap();
        assert!(head < chest && chest < arm);
    }

    #[test]
    fn test_record_defaults_for_minimal_documents() {
        let json = r#"{"name":"minimal","poses":[{"timestamp":0.0,"joints":{"Head":[0,0,1]}}]}"#;
        let record: SequenceRecord = serde_json::from_str(json).unwrap();
        assert!(record.audio_path.is_none());
        assert!(record.recorded_at.is_none());
        assert!(record.joint_labels.is_empty());
        assert!(record.processing_steps.is_empty());
    }

    #[test]
    fn test_json_roundtrip_through_sequence() {
        let json = r#"{
            "name": "subject_01",
            "recorded_at": "2024-03-01T10:00:00Z",
            "joint_labels": ["Head", "HandRight"],
            "poses": [
                {"timestamp": 1.0, "joints": {"HandRight": [0.4, 1.0, 1.9], "Head": [0.1, 1.6, 2.0]}},
                {"timestamp": 1.1, "joints": {"Head": [0.1, 1.6, 2.0], "HandRight": [0.5, 1.0, 1.9]}}
            ]
        }"#;

        let sequence = sequence_from_json(json).unwrap();
        assert_eq!(sequence.joint_labels(), ["Head", "HandRight"]);
        assert_eq!(sequence.len(), 2);

        let out = sequence_to_json(&sequence).unwrap();
        let again = sequence_from_json(&out).unwrap();
        assert_eq!(again.to_record(false), sequence.to_record(false));
        assert_eq!(again.recorded_at(), sequence.recorded_at());
    }
}
