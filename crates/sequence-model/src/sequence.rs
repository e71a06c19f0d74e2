//! Sequences: chronologically ordered poses with provenance.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{SequenceError, SequenceResult};
use crate::joint::{Axis, Joint, Position};
use crate::pose::Pose;
use crate::record::{PoseRecord, SequenceRecord};
use crate::step::ProcessingStep;

/// Relative tolerance used when comparing sampling rates.
pub const RATE_RTOL: f64 = 1e-5;
/// Absolute tolerance used when comparing sampling rates.
pub const RATE_ATOL: f64 = 1e-8;

/// An ordered, immutable collection of poses.
///
/// Invariants, checked on construction and preserved by every transform:
/// - at least one pose;
/// - timestamps are finite and strictly increasing;
/// - every pose carries the same joint labels, in the same canonical order;
/// - every coordinate is finite.
#[derive(Debug, Clone, PartialEq)]
pub struct Sequence {
    name: String,
    labels: Arc<[String]>,
    poses: Vec<Pose>,
    audio_path: Option<PathBuf>,
    recorded_at: Option<DateTime<Utc>>,
    processing_steps: Vec<ProcessingStep>,
}

/// Which pose to pick when a timestamp falls between two poses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampMatch {
    /// The pose closest in time (earlier pose on ties).
    Closest,
    /// The last pose at or before the timestamp.
    Below,
    /// The first pose at or after the timestamp.
    Above,
}

/// Per-joint quantity derived from positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Measure {
    X,
    Y,
    Z,
    /// Euclidean distance travelled between consecutive poses.
    Distance,
    DistanceX,
    DistanceY,
    DistanceZ,
    /// Distance per second. Requires a uniform sampling rate.
    Velocity,
    /// Change of velocity per second. Requires a uniform sampling rate.
    Acceleration,
}

impl Measure {
    pub fn as_str(self) -> &'static str {
        match self {
            Measure::X => "x",
            Measure::Y => "y",
            Measure::Z => "z",
            Measure::Distance => "distance",
            Measure::DistanceX => "distance_x",
            Measure::DistanceY => "distance_y",
            Measure::DistanceZ => "distance_z",
            Measure::Velocity => "velocity",
            Measure::Acceleration => "acceleration",
        }
    }
}

impl fmt::Display for Measure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Measure {
    type Err = SequenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "x" | "x_coord" | "coord_x" => Ok(Measure::X),
            "y" | "y_coord" | "coord_y" => Ok(Measure::Y),
            "z" | "z_coord" | "coord_z" => Ok(Measure::Z),
            "d" | "dist" | "distance" | "distances" => Ok(Measure::Distance),
            "dx" | "distance_x" | "dist_x" => Ok(Measure::DistanceX),
            "dy" | "distance_y" | "dist_y" => Ok(Measure::DistanceY),
            "dz" | "distance_z" | "dist_z" => Ok(Measure::DistanceZ),
            "v" | "vel" | "velocity" | "speed" => Ok(Measure::Velocity),
            "a" | "acc" | "acceleration" => Ok(Measure::Acceleration),
            other => Err(SequenceError::invalid_parameter(
                "measure",
                format!("unknown measure {other:?}"),
            )),
        }
    }
}

impl Sequence {
    /// Build a sequence from loaded poses.
    ///
    /// The first pose defines the canonical joint order; later poses may
    /// list the same labels in any order. Poses are neither sorted nor
    /// deduplicated: out-of-order or repeated timestamps are rejected.
    pub fn new(name: impl Into<String>, poses: Vec<PoseRecord>) -> SequenceResult<Self> {
        let Some(first) = poses.first() else {
            return Err(SequenceError::empty_result("loading a sequence"));
        };

        let labels: Vec<String> = first.joints.0.iter().map(|(l, _)| l.clone()).collect();
        Self::with_labels(name, labels, poses)
    }

    /// Build a sequence from a full interchange record, metadata included.
    pub fn from_record(record: SequenceRecord) -> SequenceResult<Self> {
        let SequenceRecord {
            name,
            audio_path,
            recorded_at,
            joint_labels,
            poses,
            processing_steps,
        } = record;

        let mut sequence = if joint_labels.is_empty() {
            Self::new(name, poses)?
        } else {
            Self::with_labels(name, joint_labels, poses)?
        };
        sequence.audio_path = audio_path;
        sequence.recorded_at = recorded_at;
        sequence.processing_steps = processing_steps;
        Ok(sequence)
    }

    fn with_labels(
        name: impl Into<String>,
        labels: Vec<String>,
        poses: Vec<PoseRecord>,
    ) -> SequenceResult<Self> {
        if poses.is_empty() {
            return Err(SequenceError::empty_result("loading a sequence"));
        }

        let mut index_of: HashMap<&str, usize> = HashMap::with_capacity(labels.len());
        for (i, label) in labels.iter().enumerate() {
            if index_of.insert(label.as_str(), i).is_some() {
                return Err(SequenceError::invalid_input(format!(
                    "duplicate joint label {label:?}"
                )));
            }
        }

        let mut timestamps = Vec::with_capacity(poses.len());
        let mut rows = Vec::with_capacity(poses.len());
        for (p, pose) in poses.iter().enumerate() {
            if !pose.timestamp.is_finite() {
                return Err(SequenceError::invalid_input(format!(
                    "pose {p} has a non-finite timestamp"
                )));
            }
            if pose.joints.0.len() != labels.len() {
                return Err(SequenceError::invalid_input(format!(
                    "pose {p} has {} joints, expected {}",
                    pose.joints.0.len(),
                    labels.len()
                )));
            }

            let mut row: Vec<Option<Joint>> = vec![None; labels.len()];
            for (label, position) in &pose.joints.0 {
                let Some(&i) = index_of.get(label.as_str()) else {
                    return Err(SequenceError::invalid_input(format!(
                        "pose {p} has joint {label:?} which is not in the label set"
                    )));
                };
                if row[i].is_some() {
                    return Err(SequenceError::invalid_input(format!(
                        "pose {p} lists joint {label:?} twice"
                    )));
                }
                if !position.is_finite() {
                    return Err(SequenceError::invalid_input(format!(
                        "pose {p}, joint {label:?} has non-finite coordinates"
                    )));
                }
                row[i] = Some(Joint::from_position(*position));
            }

            timestamps.push(pose.timestamp);
            // Every slot is filled: lengths match and no label repeats.
            rows.push(row.into_iter().flatten().collect::<Vec<Joint>>());
        }

        check_strictly_increasing(&timestamps)?;

        let labels: Arc<[String]> = labels.into();
        let first = timestamps[0];
        let poses = timestamps
            .into_iter()
            .zip(rows)
            .map(|(t, joints)| Pose::from_parts(t, t - first, Arc::clone(&labels), joints))
            .collect();

        Ok(Self {
            name: name.into(),
            labels,
            poses,
            audio_path: None,
            recorded_at: None,
            processing_steps: Vec::new(),
        })
    }

    /// Build a sequence derived from this one.
    ///
    /// `tracks` is joint-major: `tracks[j][p]` is joint `j` (canonical order)
    /// at `timestamps[p]`. Metadata is inherited and `step` is appended to the
    /// processing history.
    pub fn derive(
        &self,
        name: impl Into<String>,
        timestamps: Vec<f64>,
        tracks: Vec<Vec<Joint>>,
        step: ProcessingStep,
    ) -> SequenceResult<Sequence> {
        if timestamps.is_empty() {
            return Err(SequenceError::empty_result(step.operation()));
        }
        if tracks.len() != self.labels.len() {
            return Err(SequenceError::invalid_input(format!(
                "derived sequence has {} joint tracks, expected {}",
                tracks.len(),
                self.labels.len()
            )));
        }
        if let Some(bad) = tracks.iter().position(|t| t.len() != timestamps.len()) {
            return Err(SequenceError::invalid_input(format!(
                "joint track {} has {} samples, expected {}",
                self.labels[bad],
                tracks[bad].len(),
                timestamps.len()
            )));
        }
        check_strictly_increasing(&timestamps)?;

        let first = timestamps[0];
        let poses = timestamps
            .iter()
            .enumerate()
            .map(|(p, &t)| {
                let joints = tracks.iter().map(|track| track[p]).collect();
                Pose::from_parts(t, t - first, Arc::clone(&self.labels), joints)
            })
            .collect();

        Ok(self.derived_with_poses(name, poses, step))
    }

    /// Wrap already-built poses, inheriting metadata and appending `step`.
    ///
    /// Relative timestamps are recomputed from the first of `poses`.
    pub(crate) fn derived_with_poses(
        &self,
        name: impl Into<String>,
        poses: Vec<Pose>,
        step: ProcessingStep,
    ) -> Sequence {
        self.derived_with_layout(name, Arc::clone(&self.labels), poses, step)
    }

    /// Like [`Sequence::derived_with_poses`], for poses built over a
    /// different label set.
    pub(crate) fn derived_with_layout(
        &self,
        name: impl Into<String>,
        labels: Arc<[String]>,
        poses: Vec<Pose>,
        step: ProcessingStep,
    ) -> Sequence {
        let first = poses.first().map(Pose::timestamp).unwrap_or(0.0);
        let poses = poses.into_iter().map(|pose| pose.rebased(first)).collect();

        let mut processing_steps = self.processing_steps.clone();
        processing_steps.push(step);

        Sequence {
            name: name.into(),
            labels,
            poses,
            audio_path: self.audio_path.clone(),
            recorded_at: self.recorded_at,
            processing_steps,
        }
    }

    // === Metadata ===

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Same sequence under another name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Default name of a sequence derived from this one: `"<name> <suffix>"`.
    pub fn derived_name(&self, suffix: &str) -> String {
        format!("{} {suffix}", self.name)
    }

    pub fn audio_path(&self) -> Option<&Path> {
        self.audio_path.as_deref()
    }

    pub fn set_audio_path(&mut self, path: Option<PathBuf>) {
        self.audio_path = path;
    }

    pub fn recorded_at(&self) -> Option<DateTime<Utc>> {
        self.recorded_at
    }

    pub fn set_recorded_at(&mut self, recorded_at: Option<DateTime<Utc>>) {
        self.recorded_at = recorded_at;
    }

    /// Transforms applied to produce this sequence, oldest first.
    pub fn processing_steps(&self) -> &[ProcessingStep] {
        &self.processing_steps
    }

    // === Structure ===

    /// Number of poses.
    pub fn len(&self) -> usize {
        self.poses.len()
    }

    /// Always false: an empty sequence cannot be constructed.
    pub fn is_empty(&self) -> bool {
        self.poses.is_empty()
    }

    pub fn joint_labels(&self) -> &[String] {
        &self.labels
    }

    /// The label set shared by every pose.
    pub(crate) fn shared_labels(&self) -> Arc<[String]> {
        Arc::clone(&self.labels)
    }

    pub fn joint_count(&self) -> usize {
        self.labels.len()
    }

    /// Canonical index of a joint label.
    pub fn label_index(&self, label: &str) -> SequenceResult<usize> {
        self.labels
            .iter()
            .position(|l| l == label)
            .ok_or_else(|| SequenceError::unknown_joint(label))
    }

    pub fn has_joint(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }

    pub fn poses(&self) -> &[Pose] {
        &self.poses
    }

    pub fn pose(&self, index: usize) -> Option<&Pose> {
        self.poses.get(index)
    }

    /// One joint across every pose, in chronological order.
    pub fn track(&self, joint_index: usize) -> Vec<Joint> {
        self.poses
            .iter()
            .map(|pose| pose.joints()[joint_index])
            .collect()
    }

    /// Every joint track, joint-major.
    pub fn tracks(&self) -> Vec<Vec<Joint>> {
        (0..self.labels.len()).map(|j| self.track(j)).collect()
    }

    /// Positions of one joint across every pose.
    pub fn positions(&self, label: &str) -> SequenceResult<Vec<Position>> {
        let j = self.label_index(label)?;
        Ok(self.poses.iter().map(|p| p.joints()[j].position).collect())
    }

    // === Time ===

    /// Timestamps of every pose, absolute or relative to the first pose.
    pub fn timestamps(&self, relative: bool) -> Vec<f64> {
        self.poses.iter().map(|p| p.time(relative)).collect()
    }

    /// Seconds between the first and the last pose.
    pub fn duration(&self) -> f64 {
        self.poses.last().map(Pose::relative_timestamp).unwrap_or(0.0)
    }

    /// Seconds from pose `from` to pose `to` (negative if `to` is earlier).
    pub fn time_between_poses(&self, from: usize, to: usize) -> Option<f64> {
        Some(self.poses.get(to)?.timestamp() - self.poses.get(from)?.timestamp())
    }

    /// Index of the pose matching a timestamp.
    ///
    /// Returns `None` when `Below` is asked before the first pose or `Above`
    /// after the last one.
    pub fn pose_index_from_timestamp(
        &self,
        timestamp: f64,
        matching: TimestampMatch,
        relative: bool,
    ) -> Option<usize> {
        let above = self.poses.partition_point(|p| p.time(relative) < timestamp);
        let exact = above < self.poses.len() && self.poses[above].time(relative) == timestamp;

        match matching {
            TimestampMatch::Above => (above < self.poses.len()).then_some(above),
            TimestampMatch::Below if exact => Some(above),
            TimestampMatch::Below => above.checked_sub(1),
            TimestampMatch::Closest => {
                if above == 0 {
                    return Some(0);
                }
                if above == self.poses.len() {
                    return Some(above - 1);
                }
                let before = timestamp - self.poses[above - 1].time(relative);
                let after = self.poses[above].time(relative) - timestamp;
                Some(if after < before { above } else { above - 1 })
            }
        }
    }

    /// Per-interval sampling rates (Hz), one per consecutive pair of poses.
    pub fn sampling_rates(&self) -> Vec<f64> {
        self.poses
            .windows(2)
            .map(|w| 1.0 / (w[1].timestamp() - w[0].timestamp()))
            .collect()
    }

    /// True if every inter-pose interval has the same rate within tolerance.
    ///
    /// A sequence with a single pose has no rate and is not uniform.
    pub fn has_uniform_rate(&self) -> bool {
        let rates = self.sampling_rates();
        let Some(&reference) = rates.first() else {
            return false;
        };
        rates
            .iter()
            .all(|r| (r - reference).abs() <= RATE_ATOL + RATE_RTOL * reference.abs())
    }

    /// The sampling rate, if it is stable across the sequence.
    pub fn sampling_rate(&self) -> SequenceResult<f64> {
        if self.poses.len() < 2 {
            return Err(SequenceError::too_few_samples(
                "computing the sampling rate",
                2,
                self.poses.len(),
            ));
        }
        if !self.has_uniform_rate() {
            return Err(SequenceError::variable_rate("computing a single sampling rate"));
        }
        Ok(self.sampling_rates()[0])
    }

    // === Measures ===

    /// A positional or derived measure for one joint.
    ///
    /// Coordinates have one value per pose; distances and velocities one per
    /// consecutive pair; accelerations one per consecutive triple.
    pub fn measure(&self, label: &str, measure: Measure) -> SequenceResult<Vec<f64>> {
        let positions = self.positions(label)?;

        let axis_values =
            |axis: Axis| -> Vec<f64> { positions.iter().map(|p| p.axis(axis)).collect() };
        let axis_distances = |axis: Axis| -> Vec<f64> {
            positions
                .windows(2)
                .map(|w| (w[1].axis(axis) - w[0].axis(axis)).abs())
                .collect()
        };

        let needs_pairs = !matches!(measure, Measure::X | Measure::Y | Measure::Z);
        if needs_pairs && positions.len() < 2 {
            return Err(SequenceError::too_few_samples(
                format!("computing the {measure}"),
                2,
                positions.len(),
            ));
        }

        Ok(match measure {
            Measure::X => axis_values(Axis::X),
            Measure::Y => axis_values(Axis::Y),
            Measure::Z => axis_values(Axis::Z),
            Measure::Distance => distances(&positions),
            Measure::DistanceX => axis_distances(Axis::X),
            Measure::DistanceY => axis_distances(Axis::Y),
            Measure::DistanceZ => axis_distances(Axis::Z),
            Measure::Velocity => {
                let rate = self.rate_for_derivative(measure)?;
                distances(&positions).into_iter().map(|d| d * rate).collect()
            }
            Measure::Acceleration => {
                let rate = self.rate_for_derivative(measure)?;
                if positions.len() < 3 {
                    return Err(SequenceError::too_few_samples(
                        "computing the acceleration",
                        3,
                        positions.len(),
                    ));
                }
                let velocities: Vec<f64> =
                    distances(&positions).into_iter().map(|d| d * rate).collect();
                velocities
                    .windows(2)
                    .map(|w| (w[1] - w[0]) * rate)
                    .collect()
            }
        })
    }

    /// Velocity over each consecutive pair of poses, using that pair's own
    /// time delta. Defined for variable-rate sequences.
    pub fn interval_velocities(&self, label: &str) -> SequenceResult<Vec<f64>> {
        let positions = self.positions(label)?;
        if positions.len() < 2 {
            return Err(SequenceError::too_few_samples(
                "computing interval velocities",
                2,
                positions.len(),
            ));
        }
        Ok(positions
            .windows(2)
            .zip(self.poses.windows(2))
            .map(|(p, t)| p[0].distance_to(&p[1]) / (t[1].timestamp() - t[0].timestamp()))
            .collect())
    }

    fn rate_for_derivative(&self, measure: Measure) -> SequenceResult<f64> {
        if !self.has_uniform_rate() {
            return Err(SequenceError::UndefinedDerivative {
                measure: measure.to_string(),
            });
        }
        self.sampling_rate()
    }

    // === Interchange ===

    /// Interchange representation, with absolute or relative timestamps.
    pub fn to_record(&self, relative: bool) -> SequenceRecord {
        SequenceRecord {
            name: self.name.clone(),
            audio_path: self.audio_path.clone(),
            recorded_at: self.recorded_at,
            joint_labels: self.labels.to_vec(),
            poses: self.poses.iter().map(|p| p.to_record(relative)).collect(),
            processing_steps: self.processing_steps.clone(),
        }
    }
}

fn distances(positions: &[Position]) -> Vec<f64> {
    positions
        .windows(2)
        .map(|w| w[0].distance_to(&w[1]))
        .collect()
}

fn check_strictly_increasing(timestamps: &[f64]) -> SequenceResult<()> {
    if let Some(i) = timestamps.iter().position(|t| !t.is_finite()) {
        return Err(SequenceError::invalid_input(format!(
            "pose {i} has a non-finite timestamp"
        )));
    }
    if let Some(i) = timestamps.windows(2).position(|w| w[1] <= w[0]) {
        return Err(SequenceError::invalid_input(format!(
            "timestamps must be strictly increasing: pose {} at {} follows pose {} at {}",
            i + 1,
            timestamps[i + 1],
            i,
            timestamps[i]
        )));
    }
    Ok(())
}
