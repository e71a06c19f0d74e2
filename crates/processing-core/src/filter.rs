//! Frequency filtering of joint trajectories.
//!
//! Butterworth filters of order 2, designed with the pre-warped bilinear
//! transform and run causally from a zero initial state. Low- and high-pass
//! filters are one second-order section; the band-pass is of order 4 and runs
//! as two sections.

use std::f64::consts::PI;

use kinetrace_sequence_model::{
    Axis, Joint, ProcessingStep, Sequence, SequenceError, SequenceResult,
};
use num_complex::Complex64;
use rayon::prelude::*;
use tracing::info;

/// Filter cut-offs, in Hz. A cut-off of `0` disables that side.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FilterParams {
    /// Frequencies below this are removed (high-pass).
    pub filter_below: Option<f64>,
    /// Frequencies above this are removed (low-pass).
    pub filter_over: Option<f64>,
}

/// Second-order IIR section, `a[0]` normalized to 1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Biquad {
    b: [f64; 3],
    a: [f64; 2],
}

impl Biquad {
    /// Butterworth low-pass with cut-off `cutoff` at sampling rate `rate`.
    pub fn low_pass(cutoff: f64, rate: f64) -> Self {
        let (k, norm, a) = Self::butterworth_poles(cutoff, rate);
        let b0 = k * k * norm;
        Self {
            b: [b0, 2.0 * b0, b0],
            a,
        }
    }

    /// Butterworth high-pass with cut-off `cutoff` at sampling rate `rate`.
    pub fn high_pass(cutoff: f64, rate: f64) -> Self {
        let (_, norm, a) = Self::butterworth_poles(cutoff, rate);
        Self {
            b: [norm, -2.0 * norm, norm],
            a,
        }
    }

    /// Butterworth band-pass passing `low..high` Hz, as two sections.
    ///
    /// The analog prototype's poles are shifted to the band and mapped with
    /// the bilinear transform; each conjugate pole pair makes one section,
    /// with one zero at DC and one at Nyquist.
    pub fn band_pass(low: f64, high: f64, rate: f64) -> [Biquad; 2] {
        // Pre-warped band edges, with the transform scaled to 4 (fs = 2).
        let warp = |f: f64| 4.0 * (PI * f / rate).tan();
        let (w1, w2) = (warp(low), warp(high));
        let bandwidth = w2 - w1;

        let prototype = Complex64::from_polar(bandwidth / 2.0, 3.0 * PI / 4.0);
        let shift = (prototype * prototype - w1 * w2).sqrt();
        let analog = [prototype + shift, prototype - shift];

        let denominator: Complex64 = analog
            .iter()
            .map(|&p| (4.0 - p) * (4.0 - p.conj()))
            .product();
        let gain = bandwidth * bandwidth * 16.0 / denominator.re;

        let section = |p: Complex64, gain: f64| {
            let z = (4.0 + p) / (4.0 - p);
            Biquad {
                b: [gain, 0.0, -gain],
                a: [-2.0 * z.re, z.norm_sqr()],
            }
        };
        [section(analog[0], gain), section(analog[1], 1.0)]
    }

    fn butterworth_poles(cutoff: f64, rate: f64) -> (f64, f64, [f64; 2]) {
        let q = std::f64::consts::FRAC_1_SQRT_2;
        let k = (PI * cutoff / rate).tan();
        let norm = 1.0 / (1.0 + k / q + k * k);
        let a1 = 2.0 * (k * k - 1.0) * norm;
        let a2 = (1.0 - k / q + k * k) * norm;
        (k, norm, [a1, a2])
    }

    /// Run the section over a signal (direct form I, zero initial state).
    pub fn apply(&self, input: &[f64]) -> Vec<f64> {
        let [b0, b1, b2] = self.b;
        let [a1, a2] = self.a;
        let (mut x1, mut x2, mut y1, mut y2) = (0.0, 0.0, 0.0, 0.0);
        input
            .iter()
            .map(|&x| {
                let y = b0 * x + b1 * x1 + b2 * x2 - a1 * y1 - a2 * y2;
                x2 = x1;
                x1 = x;
                y2 = y1;
                y1 = y;
                y
            })
            .collect()
    }
}

/// Butterworth filtering engine.
pub struct FrequencyFilter {
    params: FilterParams,
}

impl FrequencyFilter {
    /// Create a filter, rejecting negative or inverted cut-offs. Zero
    /// cut-offs are dropped.
    pub fn new(params: FilterParams) -> SequenceResult<Self> {
        for (name, cutoff) in [
            ("filter_below", params.filter_below),
            ("filter_over", params.filter_over),
        ] {
            if let Some(f) = cutoff {
                if !f.is_finite() || f < 0.0 {
                    return Err(SequenceError::invalid_parameter(
                        name,
                        format!("cut-off must be zero or positive, got {f}"),
                    ));
                }
            }
        }
        let params = FilterParams {
            filter_below: params.filter_below.filter(|&f| f > 0.0),
            filter_over: params.filter_over.filter(|&f| f > 0.0),
        };
        if let (Some(below), Some(over)) = (params.filter_below, params.filter_over) {
            if below >= over {
                return Err(SequenceError::invalid_parameter(
                    "filter_below",
                    format!("band-pass needs filter_below ({below}) under filter_over ({over})"),
                ));
            }
        }
        Ok(Self { params })
    }

    /// Sections to run, in order, for a sampling rate.
    pub fn sections(&self, rate: f64) -> SequenceResult<Vec<Biquad>> {
        let nyquist = rate / 2.0;
        if let Some(below) = self.params.filter_below {
            check_nyquist("filter_below", below, nyquist)?;
        }
        if let Some(over) = self.params.filter_over {
            check_nyquist("filter_over", over, nyquist)?;
        }
        Ok(match (self.params.filter_below, self.params.filter_over) {
            (Some(below), Some(over)) => Biquad::band_pass(below, over, rate).to_vec(),
            (Some(below), None) => vec![Biquad::high_pass(below, rate)],
            (None, Some(over)) => vec![Biquad::low_pass(over, rate)],
            (None, None) => Vec::new(),
        })
    }

    /// Filter every joint axis of a uniformly sampled sequence.
    pub fn apply(&self, sequence: &Sequence) -> SequenceResult<Sequence> {
        if sequence.len() < 2 {
            return Err(SequenceError::too_few_samples(
                "frequency filtering",
                2,
                sequence.len(),
            ));
        }
        if !sequence.has_uniform_rate() {
            return Err(SequenceError::variable_rate("frequency filtering"));
        }
        let rate = sequence.sampling_rate()?;
        let sections = self.sections(rate)?;

        let tracks: Vec<Vec<Joint>> = (0..sequence.joint_count())
            .into_par_iter()
            .map(|j| {
                let mut track = sequence.track(j);
                for axis in Axis::ALL {
                    let mut signal: Vec<f64> =
                        track.iter().map(|joint| joint.position.axis(axis)).collect();
                    for section in &sections {
                        signal = section.apply(&signal);
                    }
                    for (joint, value) in track.iter_mut().zip(signal) {
                        joint.position.set_axis(axis, value);
                    }
                }
                track
            })
            .collect();

        info!(
            sequence = sequence.name(),
            rate,
            filter_below = ?self.params.filter_below,
            filter_over = ?self.params.filter_over,
            "Filtered sequence"
        );

        sequence.derive(
            sequence.derived_name("+FF"),
            sequence.timestamps(false),
            tracks,
            ProcessingStep::FilterFrequencies {
                filter_below: self.params.filter_below,
                filter_over: self.params.filter_over,
            },
        )
    }
}

fn check_nyquist(name: &str, cutoff: f64, nyquist: f64) -> SequenceResult<()> {
    if cutoff >= nyquist {
        return Err(SequenceError::invalid_parameter(
            name,
            format!("cut-off {cutoff} Hz must be below the Nyquist frequency ({nyquist} Hz)"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use kinetrace_sequence_model::{Position, PoseRecord};

    fn sine(freq: f64, rate: f64, n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| (2.0 * PI * freq * i as f64 / rate).sin())
            .collect()
    }

    fn amplitude(signal: &[f64]) -> f64 {
        signal.iter().fold(0.0_f64, |m, v| m.max(v.abs()))
    }

    #[test]
    fn test_low_pass_keeps_dc_and_removes_high_frequencies() {
        let lp = Biquad::low_pass(5.0, 100.0);
        let dc = lp.apply(&vec![1.0; 400]);
        assert!((dc[399] - 1.0).abs() < 1e-6);

        let high = lp.apply(&sine(40.0, 100.0, 400));
        assert!(amplitude(&high[200..]) < 0.05);
    }

    #[test]
    fn test_high_pass_removes_offset() {
        let hp = Biquad::high_pass(2.0, 100.0);
        let out = hp.apply(&vec![3.0; 600]);
        assert!(out[599].abs() < 1e-3);

        let fast = hp.apply(&sine(30.0, 100.0, 600));
        assert!(amplitude(&fast[300..]) > 0.9);
    }

    #[test]
    fn test_band_pass_is_fourth_order() {
        let [first, second] = Biquad::band_pass(1.0, 5.0, 100.0);
        // One zero at DC and one at Nyquist per section.
        assert_eq!(first.b[0], -first.b[2]);
        assert_eq!(second.b, [1.0, 0.0, -1.0]);

        let run = |signal: Vec<f64>| second.apply(&first.apply(&signal));
        let dc = run(vec![3.0; 600]);
        assert!(dc[599].abs() < 1e-6);
        assert!(amplitude(&run(sine(2.0, 100.0, 600))[300..]) > 0.99);
        assert!(amplitude(&run(sine(40.0, 100.0, 600))[300..]) < 0.01);

        // Half power at both band edges.
        for edge in [1.0, 5.0] {
            let out = run(sine(edge, 100.0, 4000));
            assert!((amplitude(&out[2000..]) - std::f64::consts::FRAC_1_SQRT_2).abs() < 0.01);
        }
    }

    #[test]
    fn test_zero_cut_off_is_disabled() {
        let filter = FrequencyFilter::new(FilterParams {
            filter_below: Some(0.0),
            filter_over: Some(10.0),
        })
        .unwrap();
        assert_eq!(filter.sections(100.0).unwrap(), vec![Biquad::low_pass(10.0, 100.0)]);

        let both = FrequencyFilter::new(FilterParams {
            filter_below: Some(2.0),
            filter_over: Some(10.0),
        })
        .unwrap();
        assert_eq!(
            both.sections(100.0).unwrap(),
            Biquad::band_pass(2.0, 10.0, 100.0).to_vec()
        );
        assert!(FrequencyFilter::new(FilterParams {
            filter_below: Some(0.0),
            filter_over: Some(0.0),
        })
        .unwrap()
        .sections(100.0)
        .unwrap()
        .is_empty());
    }

    #[test]
    fn test_cut_offs_are_validated() {
        assert!(FrequencyFilter::new(FilterParams {
            filter_below: Some(-1.0),
            filter_over: None,
        })
        .is_err());
        assert!(FrequencyFilter::new(FilterParams {
            filter_below: Some(10.0),
            filter_over: Some(5.0),
        })
        .is_err());

        let filter = FrequencyFilter::new(FilterParams {
            filter_below: None,
            filter_over: Some(60.0),
        })
        .unwrap();
        assert!(matches!(
            filter.sections(100.0),
            Err(SequenceError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_variable_rate_is_rejected() {
        let poses = [0.0, 0.01, 0.03, 0.04]
            .iter()
            .map(|&t| PoseRecord::new(t, vec![("Head".to_string(), Position::ORIGIN)]))
            .collect();
        let sequence = Sequence::new("variable", poses).unwrap();
        let filter = FrequencyFilter::new(FilterParams {
            filter_below: None,
            filter_over: Some(10.0),
        })
        .unwrap();
        assert!(matches!(
            filter.apply(&sequence),
            Err(SequenceError::VariableSamplingRate { .. })
        ));
    }

    #[test]
    fn test_no_cut_off_copies_positions() {
        let poses = (0..5)
            .map(|i| {
                PoseRecord::new(
                    i as f64 * 0.01,
                    vec![("Head".to_string(), Position::new(i as f64, 1.0, 2.0))],
                )
            })
            .collect();
        let sequence = Sequence::new("copy", poses).unwrap();
        let out = FrequencyFilter::new(FilterParams::default())
            .unwrap()
            .apply(&sequence)
            .unwrap();
        assert_eq!(
            out.positions("Head").unwrap(),
            sequence.positions("Head").unwrap()
        );
        assert_eq!(out.name(), "copy +FF");
    }
}
