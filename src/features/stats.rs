//! Descriptive statistics over `f64` slices.
//!
//! Conventions: standard deviations are population (`ddof = 0`) unless the
//! name says otherwise, quantiles interpolate linearly between order
//! statistics, skewness and kurtosis are the biased moment estimators
//! (kurtosis is excess kurtosis). Degenerate inputs return `0.0` rather than
//! NaN.
//!
//! The location and dispersion helpers are thin wrappers over
//! [`statrs::statistics::Statistics`]; statrs yields NaN on empty input, the
//! wrappers return `0.0` instead.

use statrs::statistics::Statistics;

/// Arithmetic mean, `0.0` for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().mean()
}

/// Central moment of order `k`.
fn central_moment(values: &[f64], center: f64, k: i32) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().map(|v| (v - center).powi(k)).sum::<f64>() / values.len() as f64
}

pub fn population_variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().population_variance().max(0.0)
}

pub fn population_std(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().population_std_dev()
}

/// Unbiased variance, `0.0` with fewer than two values.
pub fn sample_variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    values.iter().variance().max(0.0)
}

pub fn min(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    Statistics::min(values.iter())
}

pub fn max(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    Statistics::max(values.iter())
}

/// Quantile `q ∈ [0, 1]` with linear interpolation.
pub fn quantile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * frac
}

pub fn median(values: &[f64]) -> f64 {
    quantile(values, 0.5)
}

/// Biased Fisher-Pearson skewness `m3 / m2^1.5`.
pub fn skewness(values: &[f64]) -> f64 {
    let m = mean(values);
    let m2 = central_moment(values, m, 2);
    if m2 <= 0.0 {
        return 0.0;
    }
    central_moment(values, m, 3) / m2.powf(1.5)
}

/// Biased excess kurtosis `m4 / m2² - 3`.
pub fn excess_kurtosis(values: &[f64]) -> f64 {
    let m = mean(values);
    let m2 = central_moment(values, m, 2);
    if m2 <= 0.0 {
        return 0.0;
    }
    central_moment(values, m, 4) / (m2 * m2) - 3.0
}

/// Pearson correlation, `0.0` when either side has no variance.
pub fn pearson(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len().min(y.len());
    if n < 2 {
        return 0.0;
    }
    let (x, y) = (&x[..n], &y[..n]);

    let sx = population_std(x);
    let sy = population_std(y);
    if sx <= 0.0 || sy <= 0.0 {
        return 0.0;
    }
    let r = x.iter().population_covariance(y.iter()) / (sx * sy);
    r.clamp(-1.0, 1.0)
}

/// Lag-1 autocorrelation (Pearson between `x[..n-1]` and `x[1..]`).
pub fn lag1_autocorr(values: &[f64]) -> f64 {
    if values.len() < 3 {
        return 0.0;
    }
    pearson(&values[..values.len() - 1], &values[1..])
}

/// `std / mean`, `0.0` when the mean is zero.
pub fn coefficient_of_variation(values: &[f64]) -> f64 {
    let m = mean(values);
    if m == 0.0 {
        return 0.0;
    }
    population_std(values) / m
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-12;

    #[test]
    fn test_basic_moments() {
        let v = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((mean(&v) - 5.0).abs() < EPSILON);
        assert!((population_std(&v) - 2.0).abs() < EPSILON);
        assert!((sample_variance(&v) - 32.0 / 7.0).abs() < EPSILON);
        assert_eq!(min(&v), 2.0);
        assert_eq!(max(&v), 9.0);
    }

    #[test]
    fn test_empty_inputs() {
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(population_std(&[]), 0.0);
        assert_eq!(min(&[]), 0.0);
        assert_eq!(quantile(&[], 0.5), 0.0);
        assert_eq!(coefficient_of_variation(&[]), 0.0);
    }

    #[test]
    fn test_quantiles_interpolate() {
        let v = [4.0, 1.0, 3.0, 2.0];
        assert!((median(&v) - 2.5).abs() < EPSILON);
        assert!((quantile(&v, 0.25) - 1.75).abs() < EPSILON);
        assert!((quantile(&v, 0.75) - 3.25).abs() < EPSILON);
        assert_eq!(quantile(&v, 0.0), 1.0);
        assert_eq!(quantile(&v, 1.0), 4.0);
    }

    #[test]
    fn test_shape_statistics() {
        let symmetric = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert!(skewness(&symmetric).abs() < EPSILON);
        // uniform-like discrete: excess kurtosis = 1.7 - 3
        assert!((excess_kurtosis(&symmetric) + 1.3).abs() < EPSILON);

        let right_tail = [1.0, 1.0, 1.0, 1.0, 10.0];
        assert!(skewness(&right_tail) > 1.0);

        assert_eq!(skewness(&[3.0, 3.0, 3.0]), 0.0);
        assert_eq!(excess_kurtosis(&[3.0, 3.0, 3.0]), 0.0);
    }

    #[test]
    fn test_correlations() {
        let x = [1.0, 2.0, 3.0, 4.0];
        assert!((pearson(&x, &[2.0, 4.0, 6.0, 8.0]) - 1.0).abs() < EPSILON);
        assert!((pearson(&x, &[8.0, 6.0, 4.0, 2.0]) + 1.0).abs() < EPSILON);
        assert_eq!(pearson(&x, &[1.0, 1.0, 1.0, 1.0]), 0.0);

        let alternating = [1.0, -1.0, 1.0, -1.0, 1.0, -1.0];
        assert!((lag1_autocorr(&alternating) + 1.0).abs() < EPSILON);
    }

    #[test]
    fn test_single_value_degenerate_cases() {
        assert_eq!(sample_variance(&[3.0]), 0.0);
        assert_eq!(population_variance(&[3.0]), 0.0);
        assert_eq!(population_std(&[3.0]), 0.0);
        assert_eq!(pearson(&[1.0], &[2.0]), 0.0);
        assert_eq!(min(&[-1.5]), -1.5);
        assert_eq!(max(&[-1.5]), -1.5);
    }

    #[test]
    fn test_pearson_uses_common_prefix() {
        let x = [1.0, 2.0, 3.0, 4.0, 100.0];
        let y = [3.0, 5.0, 7.0, 9.0];
        assert!((pearson(&x, &y) - 1.0).abs() < EPSILON);
    }

    #[test]
    fn test_coefficient_of_variation() {
        let v = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((coefficient_of_variation(&v) - 0.4).abs() < EPSILON);
        assert_eq!(coefficient_of_variation(&[0.0, 0.0]), 0.0);
    }
}
