//! Structural break detection over section durations.
//!
//! Under a stable volatility regime section durations fluctuate around a
//! constant level. A regime change shows up as a shift in that level, which
//! this module locates with two complementary statistics:
//!
//! - **CUSUM** of durations around their overall mean (returned for
//!   inspection),
//! - a sliding **Welch t-test** comparing the `w` durations before and after
//!   each split point, `w = max(min_window, count / window_divisor)`.
//!
//! Significant splits closer than `w` to the previously accepted break are
//! merged into it.

use crate::features::stats::{mean, population_std, sample_variance};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, StudentsT};

/// Parameters for duration break detection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BreakConfig {
    /// Two-sided p-value below which a split is significant.
    pub significance: f64,

    /// Lower bound on the comparison window.
    pub min_window: usize,

    /// Window is `count / window_divisor` when that exceeds `min_window`.
    pub window_divisor: usize,
}

impl Default for BreakConfig {
    fn default() -> Self {
        Self {
            significance: 0.01,
            min_window: 5,
            window_divisor: 10,
        }
    }
}

impl BreakConfig {
    /// Comparison window for a duration series of length `count`.
    pub fn window(&self, count: usize) -> usize {
        self.min_window.max(count / self.window_divisor.max(1))
    }
}

/// One detected shift in the duration level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DurationBreak {
    /// Index into the section list where the new regime starts.
    pub section_index: usize,
    pub p_value: f64,
    pub mean_before: f64,
    pub mean_after: f64,
    /// `mean_after / mean_before`.
    pub change_ratio: f64,
}

/// Result of break detection over one section list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BreakReport {
    pub breaks: Vec<DurationBreak>,
    pub cusum: Vec<f64>,
    pub mean_duration: f64,
    pub std_duration: f64,
}

impl BreakReport {
    pub fn break_count(&self) -> usize {
        self.breaks.len()
    }

    /// Largest absolute CUSUM excursion.
    pub fn max_abs_cusum(&self) -> f64 {
        self.cusum.iter().fold(0.0_f64, |acc, c| acc.max(c.abs()))
    }
}

/// Detect level shifts in a duration series.
pub fn detect_duration_breaks(durations: &[f64], config: &BreakConfig) -> BreakReport {
    if durations.is_empty() {
        return BreakReport::default();
    }

    let mean_duration = mean(durations);
    let std_duration = population_std(durations);

    let mut cusum = Vec::with_capacity(durations.len());
    let mut running = 0.0;
    for d in durations {
        running += d - mean_duration;
        cusum.push(running);
    }

    let count = durations.len();
    let window = config.window(count);
    let mut candidates = Vec::new();

    if count > 2 * window {
        for i in window..(count - window) {
            let before = &durations[i - window..i];
            let after = &durations[i..i + window];
            let Some(p_value) = welch_p_value(before, after) else {
                continue;
            };
            if p_value < config.significance {
                let mean_before = mean(before);
                let mean_after = mean(after);
                candidates.push(DurationBreak {
                    section_index: i,
                    p_value,
                    mean_before,
                    mean_after,
                    change_ratio: if mean_before > 0.0 {
                        mean_after / mean_before
                    } else {
                        0.0
                    },
                });
            }
        }
    }

    let mut breaks: Vec<DurationBreak> = Vec::new();
    for candidate in candidates {
        match breaks.last() {
            Some(last) if candidate.section_index - last.section_index <= window => {}
            _ => breaks.push(candidate),
        }
    }

    BreakReport {
        breaks,
        cusum,
        mean_duration,
        std_duration,
    }
}

/// Two-sided Welch t-test p-value, `None` when the test is undefined.
pub fn welch_p_value(a: &[f64], b: &[f64]) -> Option<f64> {
    if a.len() < 2 || b.len() < 2 {
        return None;
    }

    let (n1, n2) = (a.len() as f64, b.len() as f64);
    let (m1, m2) = (mean(a), mean(b));
    let (s1, s2) = (sample_variance(a) / n1, sample_variance(b) / n2);
    let se2 = s1 + s2;

    if se2 <= 0.0 {
        // both windows constant
        return if m1 == m2 { None } else { Some(0.0) };
    }

    let t = (m1 - m2) / se2.sqrt();
    let df = se2 * se2 / (s1 * s1 / (n1 - 1.0) + s2 * s2 / (n2 - 1.0));
    let dist = StudentsT::new(0.0, 1.0, df).ok()?;
    let p = 2.0 * dist.sf(t.abs());
    p.is_finite().then_some(p.clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step_durations() -> Vec<f64> {
        let mut d = Vec::new();
        for i in 0..40 {
            d.push(10.0 + (i % 3) as f64);
        }
        for i in 0..40 {
            d.push(3.0 + (i % 2) as f64);
        }
        d
    }

    #[test]
    fn test_window_sizing() {
        let config = BreakConfig::default();
        assert_eq!(config.window(20), 5);
        assert_eq!(config.window(200), 20);
    }

    #[test]
    fn test_detects_level_shift() {
        let durations = step_durations();
        let report = detect_duration_breaks(&durations, &BreakConfig::default());

        assert!(!report.breaks.is_empty(), "expected at least one break");
        let first = &report.breaks[0];
        assert!(
            (30..=40).contains(&first.section_index),
            "break at {} should be near 40",
            first.section_index
        );
        assert!(first.mean_after < first.mean_before);
        assert!(first.change_ratio < 1.0);
        assert!(first.p_value < 0.01);
    }

    #[test]
    fn test_accepted_breaks_are_separated() {
        let durations = step_durations();
        let config = BreakConfig::default();
        let report = detect_duration_breaks(&durations, &config);
        let window = config.window(durations.len());
        for pair in report.breaks.windows(2) {
            assert!(pair[1].section_index - pair[0].section_index > window);
        }
    }

    #[test]
    fn test_constant_durations_no_breaks() {
        let durations = vec![7.0; 50];
        let report = detect_duration_breaks(&durations, &BreakConfig::default());
        assert!(report.breaks.is_empty());
        assert_eq!(report.mean_duration, 7.0);
        assert_eq!(report.std_duration, 0.0);
        assert_eq!(report.max_abs_cusum(), 0.0);
    }

    #[test]
    fn test_cusum_ends_near_zero() {
        let durations = step_durations();
        let report = detect_duration_breaks(&durations, &BreakConfig::default());
        assert_eq!(report.cusum.len(), durations.len());
        assert!(report.cusum.last().unwrap().abs() < 1e-9);
        assert!(report.max_abs_cusum() > 100.0);
    }

    #[test]
    fn test_short_series_has_no_candidates() {
        let report = detect_duration_breaks(&[1.0, 5.0, 1.0, 5.0], &BreakConfig::default());
        assert!(report.breaks.is_empty());
        assert_eq!(report.cusum.len(), 4);

        assert_eq!(
            detect_duration_breaks(&[], &BreakConfig::default()),
            BreakReport::default()
        );
    }

    #[test]
    fn test_welch_constant_windows() {
        assert_eq!(welch_p_value(&[2.0, 2.0], &[2.0, 2.0]), None);
        assert_eq!(welch_p_value(&[2.0, 2.0], &[5.0, 5.0]), Some(0.0));
        assert_eq!(welch_p_value(&[2.0], &[5.0, 5.0]), None);
    }

    #[test]
    fn test_welch_identical_samples_not_significant() {
        let a = [1.0, 2.0, 3.0, 4.0, 5.0];
        let p = welch_p_value(&a, &a).unwrap();
        assert!((p - 1.0).abs() < 1e-9);
    }
}
