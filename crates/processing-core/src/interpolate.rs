//! One-dimensional interpolation over timestamped samples.
//!
//! Shared by resampling, jitter refilling, and zero correction. Knots must be
//! strictly increasing; evaluation outside the knot range extends the first
//! or last segment.

use kinetrace_sequence_model::{InterpolationMethod, SequenceError, SequenceResult};

/// Interpolating function built from `(x, y)` knots.
#[derive(Debug, Clone)]
pub struct Interpolator {
    xs: Vec<f64>,
    ys: Vec<f64>,
    kind: Kind,
}

#[derive(Debug, Clone)]
enum Kind {
    Linear,
    Nearest,
    /// Second derivatives at each knot.
    Cubic(Vec<f64>),
    /// First derivatives at each knot.
    Pchip(Vec<f64>),
}

impl Interpolator {
    /// Build an interpolator from at least two knots.
    pub fn new(method: InterpolationMethod, xs: Vec<f64>, ys: Vec<f64>) -> SequenceResult<Self> {
        if xs.len() != ys.len() {
            return Err(SequenceError::invalid_input(format!(
                "{} knot positions but {} values",
                xs.len(),
                ys.len()
            )));
        }
        if xs.len() < 2 {
            return Err(SequenceError::too_few_samples(
                format!("{method} interpolation"),
                2,
                xs.len(),
            ));
        }
        if xs.windows(2).any(|w| !(w[1] > w[0])) {
            return Err(SequenceError::invalid_input(
                "interpolation knots must be strictly increasing",
            ));
        }

        let kind = match method {
            InterpolationMethod::Linear => Kind::Linear,
            InterpolationMethod::Nearest => Kind::Nearest,
            InterpolationMethod::Cubic => Kind::Cubic(natural_spline_second_derivatives(&xs, &ys)),
            InterpolationMethod::Pchip => Kind::Pchip(pchip_slopes(&xs, &ys)),
        };

        Ok(Self { xs, ys, kind })
    }

    /// Value at `x`.
    pub fn eval(&self, x: f64) -> f64 {
        let k = self.segment(x);
        let (x0, x1) = (self.xs[k], self.xs[k + 1]);
        let (y0, y1) = (self.ys[k], self.ys[k + 1]);
        let h = x1 - x0;

        match &self.kind {
            Kind::Linear => y0 + (y1 - y0) * (x - x0) / h,
            Kind::Nearest => {
                // Ties go to the earlier sample.
                if x - x0 <= x1 - x {
                    y0
                } else {
                    y1
                }
            }
            Kind::Cubic(m) => {
                let a = x1 - x;
                let b = x - x0;
                m[k] * a.powi(3) / (6.0 * h)
                    + m[k + 1] * b.powi(3) / (6.0 * h)
                    + (y0 / h - m[k] * h / 6.0) * a
                    + (y1 / h - m[k + 1] * h / 6.0) * b
            }
            Kind::Pchip(d) => {
                let t = (x - x0) / h;
                let t2 = t * t;
                let t3 = t2 * t;
                let h00 = 2.0 * t3 - 3.0 * t2 + 1.0;
                let h10 = t3 - 2.0 * t2 + t;
                let h01 = -2.0 * t3 + 3.0 * t2;
                let h11 = t3 - t2;
                h00 * y0 + h10 * h * d[k] + h01 * y1 + h11 * h * d[k + 1]
            }
        }
    }

    /// Values at every `x` of `xs`.
    pub fn eval_many(&self, xs: &[f64]) -> Vec<f64> {
        xs.iter().map(|&x| self.eval(x)).collect()
    }

    /// Index `k` of the segment `[xs[k], xs[k + 1]]` used for `x`.
    fn segment(&self, x: f64) -> usize {
        let above = self.xs.partition_point(|&xi| xi <= x);
        above.saturating_sub(1).min(self.xs.len() - 2)
    }
}

/// Second derivatives of the natural cubic spline (zero at both ends),
/// solved with the Thomas algorithm.
fn natural_spline_second_derivatives(xs: &[f64], ys: &[f64]) -> Vec<f64> {
    let n = xs.len();
    let mut m = vec![0.0; n];
    if n < 3 {
        return m;
    }

    let h: Vec<f64> = xs.windows(2).map(|w| w[1] - w[0]).collect();

    // Tridiagonal system over the interior knots 1..n-1.
    let size = n - 2;
    let mut diag = vec![0.0; size];
    let mut upper = vec![0.0; size];
    let mut rhs = vec![0.0; size];
    for i in 0..size {
        let k = i + 1;
        diag[i] = 2.0 * (h[k - 1] + h[k]);
        upper[i] = h[k];
        rhs[i] = 6.0 * ((ys[k + 1] - ys[k]) / h[k] - (ys[k] - ys[k - 1]) / h[k - 1]);
    }

    for i in 1..size {
        let lower = h[i];
        let factor = lower / diag[i - 1];
        diag[i] -= factor * upper[i - 1];
        rhs[i] -= factor * rhs[i - 1];
    }

    m[size] = rhs[size - 1] / diag[size - 1];
    for i in (0..size - 1).rev() {
        m[i + 1] = (rhs[i] - upper[i] * m[i + 2]) / diag[i];
    }

    m
}

/// Knot slopes of the Fritsch–Carlson monotone cubic.
fn pchip_slopes(xs: &[f64], ys: &[f64]) -> Vec<f64> {
    let n = xs.len();
    let h: Vec<f64> = xs.windows(2).map(|w| w[1] - w[0]).collect();
    let delta: Vec<f64> = (0..n - 1).map(|k| (ys[k + 1] - ys[k]) / h[k]).collect();

    if n == 2 {
        return vec![delta[0], delta[0]];
    }

    let mut d = vec![0.0; n];
    for k in 1..n - 1 {
        if delta[k - 1] * delta[k] <= 0.0 {
            continue;
        }
        let w1 = 2.0 * h[k] + h[k - 1];
        let w2 = h[k] + 2.0 * h[k - 1];
        d[k] = (w1 + w2) / (w1 / delta[k - 1] + w2 / delta[k]);
    }

    d[0] = pchip_end_slope(h[0], h[1], delta[0], delta[1]);
    d[n - 1] = pchip_end_slope(h[n - 2], h[n - 3], delta[n - 2], delta[n - 3]);
    d
}

/// One-sided three-point end slope, kept shape-preserving.
fn pchip_end_slope(h0: f64, h1: f64, delta0: f64, delta1: f64) -> f64 {
    let d = ((2.0 * h0 + h1) * delta0 - h0 * delta1) / (h0 + h1);
    if d.signum() != delta0.signum() || delta0 == 0.0 {
        0.0
    } else if delta0.signum() != delta1.signum() && d.abs() > 3.0 * delta0.abs() {
        3.0 * delta0
    } else {
        d
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn knots() -> (Vec<f64>, Vec<f64>) {
        let xs = vec![0.0, 1.0, 2.0, 3.0, 4.0];
        let ys = vec![0.0, 1.0, 0.0, 1.0, 0.0];
        (xs, ys)
    }

    #[test]
    fn test_every_method_passes_through_knots() {
        let (xs, ys) = knots();
        for method in [
            InterpolationMethod::Linear,
            InterpolationMethod::Cubic,
            InterpolationMethod::Pchip,
            InterpolationMethod::Nearest,
        ] {
            let interp = Interpolator::new(method, xs.clone(), ys.clone()).unwrap();
            for (x, y) in xs.iter().zip(&ys) {
                assert!(
                    (interp.eval(*x) - y).abs() < 1e-9,
                    "{method} misses knot {x}"
                );
            }
        }
    }

    #[test]
    fn test_linear_midpoint() {
        let (xs, ys) = knots();
        let interp = Interpolator::new(InterpolationMethod::Linear, xs, ys).unwrap();
        assert!((interp.eval(0.25) - 0.25).abs() < 1e-12);
        assert!((interp.eval(1.5) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_linear_extends_end_segments() {
        let (xs, ys) = knots();
        let interp = Interpolator::new(InterpolationMethod::Linear, xs, ys).unwrap();
        // Not clamped to the end values.
        assert!((interp.eval(-0.5) + 0.5).abs() < 1e-12);
        assert!((interp.eval(4.5) + 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_nearest_ties_to_earlier_sample() {
        let interp =
            Interpolator::new(InterpolationMethod::Nearest, vec![0.0, 1.0], vec![3.0, 7.0])
                .unwrap();
        assert_eq!(interp.eval(0.5), 3.0);
        assert_eq!(interp.eval(0.51), 7.0);
    }

    #[test]
    fn test_cubic_reproduces_straight_line() {
        let xs: Vec<f64> = (0..6).map(|i| i as f64 * 0.3).collect();
        let ys: Vec<f64> = xs.iter().map(|x| 2.0 * x - 1.0).collect();
        let interp = Interpolator::new(InterpolationMethod::Cubic, xs, ys).unwrap();
        for x in [0.1, 0.45, 1.2, 1.4] {
            assert!((interp.eval(x) - (2.0 * x - 1.0)).abs() < 1e-9);
        }
    }

    #[test]
    fn test_pchip_does_not_overshoot_steps() {
        let xs = vec![0.0, 1.0, 2.0, 3.0];
        let ys = vec![0.0, 0.0, 1.0, 1.0];
        let interp = Interpolator::new(InterpolationMethod::Pchip, xs, ys).unwrap();
        for i in 0..=30 {
            let y = interp.eval(i as f64 * 0.1);
            assert!((-1e-12..=1.0 + 1e-12).contains(&y), "overshoot: {y}");
        }
    }

    #[test]
    fn test_rejects_too_few_or_unordered_knots() {
        assert!(matches!(
            Interpolator::new(InterpolationMethod::Linear, vec![0.0], vec![1.0]),
            Err(SequenceError::TooFewSamples { .. })
        ));
        assert!(matches!(
            Interpolator::new(InterpolationMethod::Linear, vec![1.0, 0.0], vec![1.0, 2.0]),
            Err(SequenceError::InvalidInput { .. })
        ));
    }
}
