//! Pearson correlation between record attributes and the no-show outcome.
//!
//! An undefined coefficient (fewer than two points, or a variable with zero
//! variance) is reported as NaN rather than treated as an error. A perfect
//! correlation reports `t_statistic` as `±f64::MAX` so that it stays a finite
//! JSON number, distinct from the `null` of an undefined value.

use std::fmt;

use crate::analyzers::types::{Correlation, GroupedStats, Variable};
use crate::analyzers::utility::{Z_95, mean};
use crate::record::Appointment;

impl Correlation {
    fn undefined(n: usize) -> Self {
        Correlation {
            n,
            r: f64::NAN,
            t_statistic: f64::NAN,
            ci_low: f64::NAN,
            ci_high: f64::NAN,
        }
    }

    pub fn is_defined(&self) -> bool {
        !self.r.is_nan()
    }
}

impl fmt::Display for Correlation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.is_defined() {
            return write!(f, "r = NaN (undefined, n = {})", self.n);
        }
        write!(
            f,
            "r = {:.4}, t = {:.3}, 95% CI [{:.4}, {:.4}], n = {}",
            self.r, self.t_statistic, self.ci_low, self.ci_high, self.n
        )
    }
}

/// Pearson correlation of paired samples. Extra values in the longer slice are ignored.
pub fn pearson(xs: &[f64], ys: &[f64]) -> Correlation {
    let n = xs.len().min(ys.len());
    if n < 2 {
        return Correlation::undefined(n);
    }
    let (xs, ys) = (&xs[..n], &ys[..n]);

    // Rounding in the mean leaves a tiny non-zero spread for constant input.
    if is_constant(xs) || is_constant(ys) {
        return Correlation::undefined(n);
    }

    let mx = mean(xs);
    let my = mean(ys);

    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (x, y) in xs.iter().zip(ys) {
        let (dx, dy) = (x - mx, y - my);
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }

    if sxx == 0.0 || syy == 0.0 {
        return Correlation::undefined(n);
    }

    let r = (sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0);
    let nf = n as f64;

    let t_statistic = if n > 2 {
        let t = r * ((nf - 2.0) / (1.0 - r * r)).sqrt();
        if t.is_finite() { t } else { f64::MAX.copysign(r) }
    } else {
        f64::NAN
    };

    // Fisher z-transform interval
    let (ci_low, ci_high) = if n > 3 {
        let z = r.atanh();
        let se = 1.0 / (nf - 3.0).sqrt();
        ((z - Z_95 * se).tanh(), (z + Z_95 * se).tanh())
    } else {
        (f64::NAN, f64::NAN)
    };

    Correlation {
        n,
        r,
        t_statistic,
        ci_low,
        ci_high,
    }
}

fn is_constant(values: &[f64]) -> bool {
    values.iter().all(|v| *v == values[0])
}

/// Point-biserial correlation between `variable` and the no-show indicator.
pub fn correlate_records(records: &[Appointment], variable: Variable) -> Correlation {
    let xs: Vec<f64> = records.iter().map(|r| variable.value(r)).collect();
    let ys: Vec<f64> = records.iter().map(Appointment::failure).collect();
    pearson(&xs, &ys)
}

/// Correlation between each group's key and its no-show rate.
pub fn correlate_groups(grouped: &GroupedStats) -> Correlation {
    let xs: Vec<f64> = grouped.groups.iter().map(|g| g.key as f64).collect();
    let ys: Vec<f64> = grouped.groups.iter().map(|g| g.rate).collect();
    pearson(&xs, &ys)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::aggregate::{GroupOptions, group_by};
    use crate::analyzers::types::GroupKey;
    use crate::record::tests::appointment;

    #[test]
    fn test_perfect_positive_correlation() {
        let c = pearson(&[1.0, 2.0, 3.0, 4.0, 5.0], &[2.0, 4.0, 6.0, 8.0, 10.0]);
        assert!((c.r - 1.0).abs() < 1e-12);
        assert_eq!(c.n, 5);
    }

    #[test]
    fn test_perfect_correlation_t_statistic_is_finite() {
        let up = pearson(&[1.0, 2.0, 3.0, 4.0, 5.0], &[2.0, 4.0, 6.0, 8.0, 10.0]);
        assert!(up.t_statistic.is_finite());
        assert!(up.t_statistic > 0.0);

        let down = pearson(&[1.0, 2.0, 3.0, 4.0], &[4.0, 3.0, 2.0, 1.0]);
        assert!(down.t_statistic.is_finite());
        assert!(down.t_statistic < 0.0);

        let json = serde_json::to_value(up).unwrap();
        assert!(json["t_statistic"].is_number());
    }

    #[test]
    fn test_negative_correlation_interval_contains_r() {
        let xs = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0];
        let ys = [9.0, 7.5, 7.0, 6.0, 4.0, 4.5, 2.0, 1.0];
        let c = pearson(&xs, &ys);

        assert!(c.r < -0.9);
        assert!(c.t_statistic < 0.0);
        assert!(c.ci_low <= c.r && c.r <= c.ci_high);
    }

    #[test]
    fn test_constant_variable_is_nan() {
        let c = pearson(&[1.0, 2.0, 3.0], &[0.0, 0.0, 0.0]);
        assert!(c.r.is_nan());
        assert!(!c.is_defined());
        assert_eq!(c.to_string(), "r = NaN (undefined, n = 3)");
    }

    #[test]
    fn test_constant_fractional_rates_are_nan() {
        let xs: Vec<f64> = (0..10).map(f64::from).collect();
        assert!(pearson(&xs, &[0.1; 10]).r.is_nan());
    }

    #[test]
    fn test_equal_group_rates_correlation_undefined() {
        // Ten ages with ten records each, exactly one no-show per age.
        let records: Vec<_> = (0..10)
            .flat_map(|a| (0..10).map(move |i| appointment(20 + a, i == 0)))
            .collect();

        let grouped = group_by(&records, GroupKey::Age, &GroupOptions::default());
        assert_eq!(grouped.groups.len(), 10);
        assert!(grouped.groups.iter().all(|g| g.rate == 0.1));

        let c = correlate_groups(&grouped);
        assert!(c.r.is_nan());
        assert!(c.t_statistic.is_nan());
    }

    #[test]
    fn test_too_few_points_is_nan() {
        assert!(pearson(&[1.0], &[1.0]).r.is_nan());
        assert!(pearson(&[], &[]).r.is_nan());
    }

    #[test]
    fn test_uniform_status_correlation_undefined() {
        let records: Vec<_> = (0..10).map(|i| appointment(20 + i, true)).collect();

        let c = correlate_records(&records, Variable::Age);
        assert!(c.r.is_nan());

        let grouped = group_by(&records, GroupKey::Age, &GroupOptions::default());
        assert_eq!(grouped.overall_rate, 1.0);
        assert!(correlate_groups(&grouped).r.is_nan());
    }

    #[test]
    fn test_correlate_records_age() {
        let records: Vec<_> = (0..6).map(|i| appointment(10 * i, i >= 3)).collect();
        let c = correlate_records(&records, Variable::Age);
        assert!(c.r > 0.8);
    }
}
