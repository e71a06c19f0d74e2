//! Summary statistics over a sequence: tracking fill level and measure
//! aggregates, per joint or across every joint.

use serde::Serialize;

use crate::error::SequenceResult;
use crate::sequence::{Measure, Sequence};

/// Smallest and largest value of a measure.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MeasureRange {
    pub min: f64,
    pub max: f64,
}

impl MeasureRange {
    fn of(values: &[f64]) -> Self {
        values.iter().fold(
            MeasureRange {
                min: f64::INFINITY,
                max: f64::NEG_INFINITY,
            },
            |range, &v| range.merge(MeasureRange { min: v, max: v }),
        )
    }

    fn merge(self, other: MeasureRange) -> Self {
        MeasureRange {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }
}

impl Sequence {
    /// Fraction of poses in which a joint was tracked, i.e. not reported at
    /// the origin. 1.0 means no dropout.
    pub fn fill_level(&self, label: &str) -> SequenceResult<f64> {
        let positions = self.positions(label)?;
        let tracked = positions.iter().filter(|p| !p.is_origin()).count();
        Ok(tracked as f64 / positions.len() as f64)
    }

    /// Fill level of every joint, in canonical order.
    pub fn fill_levels(&self) -> Vec<(String, f64)> {
        let n = self.len() as f64;
        (0..self.joint_count())
            .map(|j| {
                let tracked = self
                    .poses()
                    .iter()
                    .filter(|pose| !pose.joints()[j].position.is_origin())
                    .count();
                (self.joint_labels()[j].clone(), tracked as f64 / n)
            })
            .collect()
    }

    /// Minimum and maximum of a measure for one joint.
    pub fn measure_range(&self, label: &str, measure: Measure) -> SequenceResult<MeasureRange> {
        Ok(MeasureRange::of(&self.measure(label, measure)?))
    }

    /// Sum of a measure for one joint. For [`Measure::Distance`] this is the
    /// total path length.
    pub fn measure_sum(&self, label: &str, measure: Measure) -> SequenceResult<f64> {
        Ok(self.measure(label, measure)?.iter().sum())
    }

    /// [`Sequence::measure_range`] for every joint.
    pub fn measure_ranges(&self, measure: Measure) -> SequenceResult<Vec<(String, MeasureRange)>> {
        self.joint_labels()
            .iter()
            .map(|label| Ok((label.clone(), self.measure_range(label, measure)?)))
            .collect()
    }

    /// [`Sequence::measure_sum`] for every joint.
    pub fn measure_sums(&self, measure: Measure) -> SequenceResult<Vec<(String, f64)>> {
        self.joint_labels()
            .iter()
            .map(|label| Ok((label.clone(), self.measure_sum(label, measure)?)))
            .collect()
    }

    /// Extremes of a measure across every joint.
    pub fn overall_measure_range(&self, measure: Measure) -> SequenceResult<MeasureRange> {
        let ranges = self.measure_ranges(measure)?;
        Ok(ranges
            .into_iter()
            .map(|(_, range)| range)
            .fold(MeasureRange::of(&[]), MeasureRange::merge))
    }

    /// Sum of a measure across every joint.
    pub fn overall_measure_sum(&self, measure: Measure) -> SequenceResult<f64> {
        Ok(self
            .measure_sums(measure)?
            .into_iter()
            .map(|(_, sum)| sum)
            .sum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SequenceError;
    use crate::joint::Position;
    use crate::record::PoseRecord;

    /// Hand moves 1 unit per pose on x; Head stays put but drops out twice.
    fn make_sequence(times: &[f64]) -> Sequence {
        let poses = times
            .iter()
            .enumerate()
            .map(|(i, &t)| {
                let head = if i == 1 || i == 2 {
                    Position::ORIGIN
                } else {
                    Position::new(0.0, 1.7, 2.0)
                };
                PoseRecord::new(
                    t,
                    vec![
                        ("Head".to_string(), head),
                        ("Hand".to_string(), Position::new(i as f64, 1.0, 2.0)),
                    ],
                )
            })
            .collect();
        Sequence::new("stats", poses).unwrap()
    }

    #[test]
    fn test_fill_level_counts_origin_samples() {
        let sequence = make_sequence(&[0.0, 0.1, 0.2, 0.3, 0.4]);
        assert!((sequence.fill_level("Head").unwrap() - 0.6).abs() < 1e-12);
        assert_eq!(sequence.fill_level("Hand").unwrap(), 1.0);
        assert_eq!(
            sequence.fill_levels(),
            vec![("Head".to_string(), 0.6), ("Hand".to_string(), 1.0)]
        );
        assert!(matches!(
            sequence.fill_level("Tail"),
            Err(SequenceError::UnknownJoint { .. })
        ));
    }

    #[test]
    fn test_measure_aggregates_per_joint() {
        let sequence = make_sequence(&[0.0, 0.1, 0.2, 0.3, 0.4]);

        assert!((sequence.measure_sum("Hand", Measure::Distance).unwrap() - 4.0).abs() < 1e-12);
        let velocity = sequence.measure_range("Hand", Measure::Velocity).unwrap();
        assert!((velocity.min - 10.0).abs() < 1e-6);
        assert!((velocity.max - 10.0).abs() < 1e-6);

        let x = sequence.measure_range("Hand", Measure::X).unwrap();
        assert_eq!(x, MeasureRange { min: 0.0, max: 4.0 });

        let sums = sequence.measure_sums(Measure::DistanceX).unwrap();
        assert_eq!(sums[0], ("Head".to_string(), 0.0));
        assert!((sums[1].1 - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_measure_aggregates_across_joints() {
        let sequence = make_sequence(&[0.0, 0.1, 0.2, 0.3, 0.4]);

        // Head travels to the origin and back: 2 * |(0, 1.7, 2.0)|.
        let head_path = 2.0 * Position::new(0.0, 1.7, 2.0).distance_to(&Position::ORIGIN);
        let total = sequence.overall_measure_sum(Measure::Distance).unwrap();
        assert!((total - (head_path + 4.0)).abs() < 1e-9);

        let range = sequence.overall_measure_range(Measure::Y).unwrap();
        assert_eq!(range, MeasureRange { min: 0.0, max: 1.7 });
    }

    #[test]
    fn test_derivative_aggregates_need_a_uniform_rate() {
        let sequence = make_sequence(&[0.0, 0.1, 0.25, 0.3, 0.4]);
        assert!(matches!(
            sequence.overall_measure_range(Measure::Velocity),
            Err(SequenceError::UndefinedDerivative { .. })
        ));
        assert!(sequence.overall_measure_sum(Measure::Distance).is_ok());
    }
}
