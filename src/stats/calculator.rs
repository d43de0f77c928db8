//! Statistics Calculator Module
//! Quartile and interquartile-range computations for outlier filtering.

/// First and third quartiles of a sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quartiles {
    pub q1: f64,
    pub q3: f64,
}

impl Quartiles {
    /// Interquartile range `Q3 - Q1`.
    pub fn iqr(&self) -> f64 {
        self.q3 - self.q1
    }

    /// Inclusive bounds `[Q1 - k*IQR, Q3 + k*IQR]`.
    pub fn bounds(&self, k: f64) -> (f64, f64) {
        let iqr = self.iqr();
        (self.q1 - k * iqr, self.q3 + k * iqr)
    }
}

/// Handles the quantile statistics used by the preprocessor.
pub struct StatsCalculator;

impl StatsCalculator {
    /// Calculate percentile using linear interpolation (NumPy compatible).
    ///
    /// `sorted_values` must be sorted ascending.
    pub fn percentile(sorted_values: &[f64], p: f64) -> f64 {
        let n = sorted_values.len();
        if n == 0 {
            return f64::NAN;
        }
        if n == 1 {
            return sorted_values[0];
        }

        let rank = (p / 100.0) * (n - 1) as f64;
        let lower = rank.floor() as usize;
        let upper = (rank.ceil() as usize).min(n - 1);
        let frac = rank - lower as f64;

        if lower == upper {
            sorted_values[lower]
        } else {
            sorted_values[lower] * (1.0 - frac) + sorted_values[upper] * frac
        }
    }

    /// Compute Q1 and Q3, ignoring NaN. Returns `None` for an empty sample.
    pub fn quartiles(values: &[f64]) -> Option<Quartiles> {
        let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
        if sorted.is_empty() {
            return None;
        }
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        Some(Quartiles {
            q1: Self::percentile(&sorted, 25.0),
            q3: Self::percentile(&sorted, 75.0),
        })
    }

    /// Outlier bounds for a sample with IQR multiplier `k`.
    pub fn iqr_bounds(values: &[f64], k: f64) -> Option<(f64, f64)> {
        Self::quartiles(values).map(|q| q.bounds(k))
    }
}
