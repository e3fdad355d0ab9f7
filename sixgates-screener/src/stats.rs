//! Numeric helpers shared by the gates.
//!
//! Every helper is total: empty input or a zero denominator yields a safe
//! default instead of NaN or an error.

use statrs::statistics::Statistics;

/// Slope of the least-squares line through `values` against x = 0..n.
///
/// Returns 0.0 for fewer than two points.
pub fn linear_regression_slope(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }

    let n_f = n as f64;
    let (mut sum_x, mut sum_y, mut sum_xx, mut sum_xy) = (0.0, 0.0, 0.0, 0.0);
    for (i, y) in values.iter().enumerate() {
        let x = i as f64;
        sum_x += x;
        sum_y += y;
        sum_xx += x * x;
        sum_xy += x * y;
    }

    let denominator = n_f * sum_xx - sum_x * sum_x;
    if denominator == 0.0 {
        return 0.0;
    }

    (n_f * sum_xy - sum_x * sum_y) / denominator
}

/// Arithmetic mean, 0.0 for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().mean()
}

/// Population standard deviation, 0.0 for an empty slice.
pub fn population_std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().population_std_dev()
}

/// `numerator / denominator`, or `fallback` when the denominator is zero.
pub fn safe_div(numerator: f64, denominator: f64, fallback: f64) -> f64 {
    if denominator == 0.0 {
        fallback
    } else {
        numerator / denominator
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slope_of_rising_series() {
        let slope = linear_regression_slope(&[1.0, 2.0, 3.0, 4.0]);
        assert!((slope - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_slope_degenerate_inputs() {
        assert_eq!(linear_regression_slope(&[]), 0.0);
        assert_eq!(linear_regression_slope(&[5.0]), 0.0);
        assert!(linear_regression_slope(&[3.0, 3.0, 3.0]).abs() < 1e-12);
    }

    #[test]
    fn test_constant_series_has_zero_dispersion() {
        let eps = [6.13; 5];
        assert!(population_std_dev(&eps).abs() < 1e-12);
        assert!((mean(&eps) - 6.13).abs() < 1e-12);
    }

    #[test]
    fn test_population_std_dev() {
        let sd = population_std_dev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert!((sd - 2.0).abs() < 1e-12);
        assert_eq!(population_std_dev(&[]), 0.0);
    }

    #[test]
    fn test_safe_div() {
        assert_eq!(safe_div(1.0, 0.0, 100.0), 100.0);
        assert_eq!(safe_div(6.0, 3.0, 100.0), 2.0);
    }
}
