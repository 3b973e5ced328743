//! Per-scale section statistics.
//!
//! Turns the section list of one `(series, tau)` pair into a fixed block of
//! [`SCALE_FEATURE_COUNT`] values. The block layout never changes: an
//! invalid scale produces the same columns, zero-filled, with `valid = 0`.
//!
//! | Group | Columns |
//! |-------|---------|
//! | Validity | `valid`, `count` |
//! | Duration shape | `duration_mean` .. `duration_autocorr` |
//! | Return sums | `sum_mean` .. `norm_kurtosis` |
//! | Evolution | `trend`, `early_late_ratio`, `acceleration`, `max_change`, `change_position` |
//! | Clock | `trading_rate`, `break_count` |
//!
//! Every value passes through [`safe_value`], so the block never carries
//! NaN or infinity.

use super::stats;
use crate::preprocessing::safe_value;
use crate::sections::{self, detect_duration_breaks, BreakConfig, Section};
use serde::{Deserialize, Serialize};

/// Number of columns in one scale block.
pub const SCALE_FEATURE_COUNT: usize = 26;

/// Column names of one scale block, in order. Full names are
/// `{scale_label}_{name}`.
pub const SCALE_FEATURE_NAMES: [&str; SCALE_FEATURE_COUNT] = [
    "valid",
    "count",
    "duration_mean",
    "duration_std",
    "duration_cv",
    "duration_min",
    "duration_max",
    "duration_median",
    "duration_iqr",
    "q3q1_ratio",
    "duration_skew",
    "duration_kurtosis",
    "duration_autocorr",
    "sum_mean",
    "sum_std",
    "sum_norm_var",
    "sum_kurtosis",
    "sum_skew",
    "norm_kurtosis",
    "trend",
    "early_late_ratio",
    "acceleration",
    "max_change",
    "change_position",
    "trading_rate",
    "break_count",
];

/// Section counts above this enable the evolution statistics.
const EVOLUTION_MIN_COUNT: usize = 10;

/// Sections excluded at each end when scanning for the largest mean shift.
const CHANGE_MARGIN: usize = 3;

/// Statistics of one scale's sections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SectionStats {
    pub count: f64,
    pub duration_mean: f64,
    pub duration_std: f64,
    pub duration_cv: f64,
    pub duration_min: f64,
    pub duration_max: f64,
    pub duration_median: f64,
    pub duration_iqr: f64,
    /// Upper over lower duration quartile.
    pub q3q1_ratio: f64,
    pub duration_skew: f64,
    pub duration_kurtosis: f64,
    pub duration_autocorr: f64,
    pub sum_mean: f64,
    pub sum_std: f64,
    /// Variance of the return sums normalized by `tau`.
    pub sum_norm_var: f64,
    pub sum_kurtosis: f64,
    pub sum_skew: f64,
    /// Excess kurtosis of each return sum divided by the square root of the
    /// variance its section actually accumulated.
    pub norm_kurtosis: f64,
    /// Relative change between the mean of the last `k` and first `k`
    /// durations, `k = min(3, count / 2)`.
    pub trend: f64,
    pub early_late_ratio: f64,
    /// `(late - early) / middle` over the duration thirds.
    pub acceleration: f64,
    pub max_change: f64,
    /// Relative position in `[0, 1)` of the largest mean shift.
    pub change_position: f64,
    /// Clock budget consumed per observation, `tau / duration_mean`.
    pub trading_rate: f64,
    pub break_count: f64,
}

impl SectionStats {
    /// Compute statistics from a non-empty section list.
    pub fn from_sections(sections: &[Section], tau: f64, breaks: &BreakConfig) -> Self {
        if sections.is_empty() {
            return Self::default();
        }

        let durations = sections::durations(sections);
        let sums = sections::return_sums(sections);
        let count = durations.len();

        let duration_mean = stats::mean(&durations);
        let q1 = stats::quantile(&durations, 0.25);
        let q3 = stats::quantile(&durations, 0.75);
        let evolution = evolution(&durations);

        let computed = Self {
            count: count as f64,
            duration_mean,
            duration_std: stats::population_std(&durations),
            duration_cv: stats::coefficient_of_variation(&durations),
            duration_min: stats::min(&durations),
            duration_max: stats::max(&durations),
            duration_median: stats::median(&durations),
            duration_iqr: q3 - q1,
            q3q1_ratio: if q1 > 0.0 { q3 / q1 } else { 0.0 },
            duration_skew: stats::skewness(&durations),
            duration_kurtosis: stats::excess_kurtosis(&durations),
            duration_autocorr: if count > EVOLUTION_MIN_COUNT {
                stats::lag1_autocorr(&durations)
            } else {
                0.0
            },
            sum_mean: stats::mean(&sums),
            sum_std: stats::population_std(&sums),
            sum_norm_var: stats::population_variance(&sums) / tau,
            sum_kurtosis: stats::excess_kurtosis(&sums),
            sum_skew: stats::skewness(&sums),
            norm_kurtosis: stats::excess_kurtosis(&normalized_sums(sections, tau)),
            trend: trend(&durations),
            early_late_ratio: evolution.early_late_ratio,
            acceleration: evolution.acceleration,
            max_change: evolution.max_change,
            change_position: evolution.change_position,
            trading_rate: if duration_mean > 0.0 {
                tau / duration_mean
            } else {
                0.0
            },
            break_count: detect_duration_breaks(&durations, breaks).break_count() as f64,
        };

        computed.sanitized()
    }

    /// Values in [`SCALE_FEATURE_NAMES`] order, excluding the leading `valid`.
    pub fn values(&self) -> [f64; SCALE_FEATURE_COUNT - 1] {
        [
            self.count,
            self.duration_mean,
            self.duration_std,
            self.duration_cv,
            self.duration_min,
            self.duration_max,
            self.duration_median,
            self.duration_iqr,
            self.q3q1_ratio,
            self.duration_skew,
            self.duration_kurtosis,
            self.duration_autocorr,
            self.sum_mean,
            self.sum_std,
            self.sum_norm_var,
            self.sum_kurtosis,
            self.sum_skew,
            self.norm_kurtosis,
            self.trend,
            self.early_late_ratio,
            self.acceleration,
            self.max_change,
            self.change_position,
            self.trading_rate,
            self.break_count,
        ]
    }

    fn sanitized(mut self) -> Self {
        for field in [
            &mut self.count,
            &mut self.duration_mean,
            &mut self.duration_std,
            &mut self.duration_cv,
            &mut self.duration_min,
            &mut self.duration_max,
            &mut self.duration_median,
            &mut self.duration_iqr,
            &mut self.q3q1_ratio,
            &mut self.duration_skew,
            &mut self.duration_kurtosis,
            &mut self.duration_autocorr,
            &mut self.sum_mean,
            &mut self.sum_std,
            &mut self.sum_norm_var,
            &mut self.sum_kurtosis,
            &mut self.sum_skew,
            &mut self.norm_kurtosis,
            &mut self.trend,
            &mut self.early_late_ratio,
            &mut self.acceleration,
            &mut self.max_change,
            &mut self.change_position,
            &mut self.trading_rate,
            &mut self.break_count,
        ] {
            *field = safe_value(*field);
        }
        self
    }
}

/// `(mean(last k) - mean(first k)) / mean(first k)` with `k = min(3, n / 2)`.
fn trend(durations: &[f64]) -> f64 {
    let k = 3.min(durations.len() / 2);
    if k == 0 {
        return 0.0;
    }
    let first = stats::mean(&durations[..k]);
    let last = stats::mean(&durations[durations.len() - k..]);
    if first == 0.0 {
        return 0.0;
    }
    (last - first) / first
}

/// `S / sqrt(V)` per section, `V` being the section's accumulated variance
/// (`tau` when that is not positive).
fn normalized_sums(sections: &[Section], tau: f64) -> Vec<f64> {
    sections
        .iter()
        .map(|s| {
            let budget = if s.variance_sum > 0.0 { s.variance_sum } else { tau };
            s.return_sum / budget.sqrt()
        })
        .collect()
}

/// How durations move across the series.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Evolution {
    early_late_ratio: f64,
    acceleration: f64,
    max_change: f64,
    change_position: f64,
}

impl Default for Evolution {
    fn default() -> Self {
        Self {
            early_late_ratio: 1.0,
            acceleration: 0.0,
            max_change: 0.0,
            change_position: 0.5,
        }
    }
}

fn evolution(durations: &[f64]) -> Evolution {
    let n = durations.len();
    if n <= EVOLUTION_MIN_COUNT {
        return Evolution::default();
    }

    let third = n / 3;
    let early = stats::mean(&durations[..third]);
    let middle = stats::mean(&durations[third..2 * third]);
    let late = stats::mean(&durations[2 * third..]);
    let early_late_ratio = if early > 0.0 { late / early } else { 0.0 };
    let acceleration = if middle > 0.0 { (late - early) / middle } else { 0.0 };

    let mut max_change = 0.0;
    let mut change_position = 0.0;
    for i in CHANGE_MARGIN..n - CHANGE_MARGIN {
        let before = stats::mean(&durations[..i]);
        let after = stats::mean(&durations[i..]);
        if before <= 0.0 {
            continue;
        }
        let change = (after - before).abs() / before;
        if change > max_change {
            max_change = change;
            change_position = i as f64 / n as f64;
        }
    }

    Evolution {
        early_late_ratio,
        acceleration,
        max_change,
        change_position,
    }
}

/// Why a scale produced no statistics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ScaleStatus {
    Valid,

    /// Series shorter than `2q + 1`.
    InsufficientData { len: usize, required: usize },

    /// Fewer than `min_sections_per_scale` sections.
    Degenerate { sections: usize, required: usize },
}

impl ScaleStatus {
    #[inline]
    pub fn is_valid(&self) -> bool {
        matches!(self, ScaleStatus::Valid)
    }
}

/// Feature block for one configured scale of one series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScaleFeatureVector {
    pub label: String,
    pub tau: f64,
    pub half_window: usize,
    pub status: ScaleStatus,
    pub stats: SectionStats,
}

impl ScaleFeatureVector {
    pub fn valid(
        label: impl Into<String>,
        tau: f64,
        half_window: usize,
        sections: &[Section],
        breaks: &BreakConfig,
    ) -> Self {
        Self {
            label: label.into(),
            tau,
            half_window,
            status: ScaleStatus::Valid,
            stats: SectionStats::from_sections(sections, tau, breaks),
        }
    }

    /// Zero-filled block for a scale that could not be computed.
    pub fn invalid(
        label: impl Into<String>,
        tau: f64,
        half_window: usize,
        status: ScaleStatus,
    ) -> Self {
        Self {
            label: label.into(),
            tau,
            half_window,
            status,
            stats: SectionStats::default(),
        }
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.status.is_valid()
    }

    /// All block values, `valid` first.
    pub fn values(&self) -> Vec<f64> {
        let mut values = Vec::with_capacity(SCALE_FEATURE_COUNT);
        values.push(if self.is_valid() { 1.0 } else { 0.0 });
        values.extend_from_slice(&self.stats.values());
        values
    }

    /// Look up a value by its base name (e.g. `"duration_cv"`).
    pub fn get(&self, name: &str) -> Option<f64> {
        let index = SCALE_FEATURE_NAMES.iter().position(|n| *n == name)?;
        self.values().get(index).copied()
    }

    /// Full column names, `{label}_{name}`.
    pub fn feature_names(&self) -> Vec<String> {
        scale_feature_names(&self.label)
    }
}

/// Column names for a scale label.
pub fn scale_feature_names(label: &str) -> Vec<String> {
    SCALE_FEATURE_NAMES
        .iter()
        .map(|name| format!("{label}_{name}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sections_from(durations: &[usize], sums: &[f64], tau: f64) -> Vec<Section> {
        let mut start = 0;
        durations
            .iter()
            .zip(sums)
            .map(|(&duration, &return_sum)| {
                let s = Section {
                    start,
                    duration,
                    return_sum,
                    variance_sum: tau,
                    tau,
                };
                start += duration;
                s
            })
            .collect()
    }

    #[test]
    fn test_names_match_values_width() {
        let block = ScaleFeatureVector::invalid(
            "micro",
            0.001,
            20,
            ScaleStatus::InsufficientData {
                len: 10,
                required: 41,
            },
        );
        assert_eq!(block.values().len(), SCALE_FEATURE_COUNT);
        assert_eq!(block.feature_names().len(), SCALE_FEATURE_COUNT);
        assert_eq!(block.feature_names()[0], "micro_valid");
        assert!(block.values().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_base_statistics() {
        let sections = sections_from(&[2, 4, 4, 4, 5, 5, 7, 9], &[0.5; 8], 0.5);
        let stats = SectionStats::from_sections(&sections, 0.5, &BreakConfig::default());

        assert_eq!(stats.count, 8.0);
        assert!((stats.duration_mean - 5.0).abs() < 1e-12);
        assert!((stats.duration_std - 2.0).abs() < 1e-12);
        assert!((stats.duration_cv - 0.4).abs() < 1e-12);
        assert_eq!(stats.duration_min, 2.0);
        assert_eq!(stats.duration_max, 9.0);
        assert_eq!(stats.sum_mean, 0.5);
        assert_eq!(stats.sum_std, 0.0);
        assert!((stats.trading_rate - 0.1).abs() < 1e-12);
        // q1 = 4, q3 = 5.5
        assert!((stats.q3q1_ratio - 1.375).abs() < 1e-12);
        assert_eq!(stats.sum_skew, 0.0);

        // k = 3: first [2,4,4] mean 10/3, last [5,7,9] mean 7
        let expected_trend = (7.0 - 10.0 / 3.0) / (10.0 / 3.0);
        assert!((stats.trend - expected_trend).abs() < 1e-12);

        // short list keeps evolution defaults
        assert_eq!(stats.early_late_ratio, 1.0);
        assert_eq!(stats.acceleration, 0.0);
        assert_eq!(stats.max_change, 0.0);
        assert_eq!(stats.change_position, 0.5);
        assert_eq!(stats.duration_autocorr, 0.0);
    }

    #[test]
    fn test_trend_with_single_section() {
        let sections = sections_from(&[5], &[0.1], 1.0);
        let stats = SectionStats::from_sections(&sections, 1.0, &BreakConfig::default());
        assert_eq!(stats.trend, 0.0);
        assert_eq!(stats.count, 1.0);
    }

    #[test]
    fn test_evolution_locates_shift() {
        let mut durations = vec![10usize; 12];
        durations.extend(vec![4usize; 12]);
        let sums = vec![0.0; durations.len()];
        let sections = sections_from(&durations, &sums, 1.0);
        let stats = SectionStats::from_sections(&sections, 1.0, &BreakConfig::default());

        assert!((stats.early_late_ratio - 0.4).abs() < 1e-12);
        // thirds of 8: early 10, middle (4x10 + 4x4) / 8 = 7, late 4
        assert!((stats.acceleration + 6.0 / 7.0).abs() < 1e-12);
        assert!((stats.change_position - 0.5).abs() < 1e-12);
        assert!((stats.max_change - 0.6).abs() < 1e-12);
        assert!(stats.trend < 0.0);
    }

    #[test]
    fn test_sum_norm_var_scales_with_tau() {
        let sections = sections_from(&[3, 3, 3, 3], &[1.0, -1.0, 1.0, -1.0], 2.0);
        let stats = SectionStats::from_sections(&sections, 2.0, &BreakConfig::default());
        assert!((stats.sum_norm_var - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_return_sum_shape() {
        let sums = [0.1, 0.1, 0.1, 0.1, 1.0];
        let sections = sections_from(&[3; 5], &sums, 1.0);
        let stats = SectionStats::from_sections(&sections, 1.0, &BreakConfig::default());
        assert!(stats.sum_skew > 1.0);
        // variance_sum == tau == 1, so the normalization is the identity
        assert!((stats.norm_kurtosis - stats.sum_kurtosis).abs() < 1e-12);
    }

    #[test]
    fn test_norm_kurtosis_uses_accumulated_variance() {
        // Sums proportional to sqrt(V) standardize to a constant.
        let sections: Vec<Section> = [1.0, 4.0, 9.0, 16.0]
            .iter()
            .enumerate()
            .map(|(i, &v): (usize, &f64)| Section {
                start: i * 3,
                duration: 3,
                return_sum: 0.5 * v.sqrt(),
                variance_sum: v,
                tau: 1.0,
            })
            .collect();
        let stats = SectionStats::from_sections(&sections, 1.0, &BreakConfig::default());
        assert_eq!(stats.norm_kurtosis, 0.0);
        assert!(stats.sum_kurtosis != 0.0);
    }

    #[test]
    fn test_get_by_name() {
        let sections = sections_from(&[2, 4, 6], &[0.1, 0.2, 0.3], 1.0);
        let block = ScaleFeatureVector::valid("macro", 1.0, 5, &sections, &BreakConfig::default());
        assert_eq!(block.get("valid"), Some(1.0));
        assert_eq!(block.get("count"), Some(3.0));
        assert_eq!(block.get("duration_max"), Some(6.0));
        assert_eq!(block.get("unknown"), None);
    }

    #[test]
    fn test_empty_sections_zero_block() {
        let stats = SectionStats::from_sections(&[], 1.0, &BreakConfig::default());
        assert_eq!(stats, SectionStats::default());
    }
}
