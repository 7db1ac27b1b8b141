use crate::analyzers::types::Spread;

/// z-score for a two-sided 95% interval.
pub const Z_95: f64 = 1.96;

/// Computes the arithmetic mean of a slice of values. Returns 0.0 for empty input.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Computes the sample standard deviation given a pre-computed mean.
/// Returns 0.0 for fewer than two values.
pub fn stddev(values: &[f64], mean: f64) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;

    variance.sqrt()
}

/// `part / total`, or 0.0 when `total` is zero.
pub fn proportion(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64
    }
}

/// Standard error of a proportion `p` observed over `n` trials.
pub fn proportion_std_error(p: f64, n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    (p * (1.0 - p) / n as f64).sqrt()
}

impl Spread {
    pub fn of(values: &[f64]) -> Self {
        let mean = mean(values);
        let std_dev = stddev(values, mean);
        let ci95 = if values.len() < 2 {
            0.0
        } else {
            Z_95 * std_dev / (values.len() as f64).sqrt()
        };
        Spread {
            mean,
            std_dev,
            ci95,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_and_stddev() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let m = mean(&values);
        assert_eq!(m, 5.0);
        assert!((stddev(&values, m) - 2.138_089_935).abs() < 1e-6);
    }

    #[test]
    fn test_empty_inputs() {
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(stddev(&[], 0.0), 0.0);
        assert_eq!(proportion(3, 0), 0.0);
        assert_eq!(proportion_std_error(0.5, 0), 0.0);
    }

    #[test]
    fn test_proportion() {
        assert_eq!(proportion(1, 4), 0.25);
        assert!((proportion_std_error(0.5, 100) - 0.05).abs() < 1e-12);
    }

    #[test]
    fn test_spread_single_value() {
        let s = Spread::of(&[3.0]);
        assert_eq!(s.mean, 3.0);
        assert_eq!(s.std_dev, 0.0);
        assert_eq!(s.ci95, 0.0);
    }
}
