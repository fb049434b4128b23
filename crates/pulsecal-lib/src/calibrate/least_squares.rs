use serde::{Deserialize, Serialize};

/// Ordinary least-squares line `y = a·x + b` over the accumulated pairs.
///
/// A fit over fewer than two pairs, or over pairs with no x-variance, is
/// degenerate: it reports `a = 0, b = 0` with the pair count and must not
/// be used for prediction display.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub a: f64,
    pub b: f64,
    pub n: usize,
    pub degenerate: bool,
}

impl LinearModel {
    fn degenerate(n: usize) -> Self {
        Self {
            a: 0.0,
            b: 0.0,
            n,
            degenerate: true,
        }
    }

    pub fn predict(&self, x: f64) -> f64 {
        self.a * x + self.b
    }
}

/// Accumulator for the closed-form normal equations.
#[derive(Debug, Clone, Copy, Default)]
pub struct LeastSquares {
    sum_x: f64,
    sum_y: f64,
    sum_xy: f64,
    sum_xx: f64,
    n: usize,
}

impl LeastSquares {
    pub fn add(&mut self, x: f64, y: f64) {
        self.sum_x += x;
        self.sum_y += y;
        self.sum_xy += x * y;
        self.sum_xx += x * x;
        self.n += 1;
    }

    pub fn len(&self) -> usize {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    pub fn fit(&self) -> LinearModel {
        if self.n < 2 {
            return LinearModel::degenerate(self.n);
        }
        let n = self.n as f64;
        let denom = n * self.sum_xx - self.sum_x * self.sum_x;
        if denom.abs() < f64::EPSILON {
            return LinearModel::degenerate(self.n);
        }
        let a = (n * self.sum_xy - self.sum_x * self.sum_y) / denom;
        let b = (self.sum_y - a * self.sum_x) / n;
        LinearModel {
            a,
            b,
            n: self.n,
            degenerate: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fits_an_exact_line() {
        let mut lsq = LeastSquares::default();
        lsq.add(0.0, 0.0);
        lsq.add(1.0, 2.0);
        lsq.add(2.0, 4.0);
        let model = lsq.fit();
        assert!(!model.degenerate);
        assert_eq!(model.n, 3);
        assert!((model.a - 2.0).abs() < 1e-12);
        assert!(model.b.abs() < 1e-12);
    }

    #[test]
    fn fits_an_offset_line() {
        let mut lsq = LeastSquares::default();
        for i in 0..10 {
            let x = i as f64 * 0.1;
            lsq.add(x, -3.0 * x + 80.0);
        }
        let model = lsq.fit();
        assert!((model.a + 3.0).abs() < 1e-9);
        assert!((model.b - 80.0).abs() < 1e-9);
    }

    #[test]
    fn too_few_pairs_is_degenerate() {
        let mut lsq = LeastSquares::default();
        assert!(lsq.fit().degenerate);
        lsq.add(0.2, 80.0);
        let model = lsq.fit();
        assert!(model.degenerate);
        assert_eq!(model.n, 1);
        assert_eq!(model.a, 0.0);
        assert_eq!(model.b, 0.0);
    }

    #[test]
    fn identical_x_values_are_degenerate() {
        let mut lsq = LeastSquares::default();
        lsq.add(0.25, 80.0);
        lsq.add(0.25, 120.0);
        lsq.add(0.25, 100.0);
        assert!(lsq.fit().degenerate);
    }

    #[test]
    fn predict_applies_slope_and_intercept() {
        let model = LinearModel {
            a: -50.0,
            b: 130.0,
            n: 5,
            degenerate: false,
        };
        assert!((model.predict(0.2) - 120.0).abs() < 1e-12);
    }
}
