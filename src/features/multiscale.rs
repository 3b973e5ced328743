//! Multi-scale orchestration.
//!
//! Runs the section pipeline for every configured scale of one series and
//! fuses the per-scale blocks with cross-scale interaction features into a
//! single fixed-width vector.
//!
//! ```text
//! ReturnSeries
//!     │ clean (coerce / drop)
//!     ▼
//! values ──► local_variance(q₁) ──┬─► sections(τ₁) ─► SectionStats ─┐
//!        │                        └─► sections(τ₂) ─► SectionStats ─┤
//!        └─► local_variance(q₂) ────► sections(τ₃) ─► SectionStats ─┤
//!                                                                   ▼
//!                                         CrossScaleFeatures ◄── blocks
//!                                                                   │
//!                                                                   ▼
//!                                                 MultiScaleFeatureVector
//! ```
//!
//! A variance buffer is computed at most once per distinct half-window per
//! call, and only when some scale actually needs to build sections (with a
//! warm [`SectionCache`] it is never computed).
//!
//! # Column Layout
//!
//! | Block | Columns |
//! |-------|---------|
//! | per scale, in configured order | `{label}_{name}` for [`SCALE_FEATURE_NAMES`] |
//! | cross-scale | `n_valid_scales`, `multiscale_consistency`, `scale_ratio_{a}_{b}` per adjacent pair, then the fixed tail |
//!
//! Width depends only on the configuration, never on validity.

use super::scale_stats::{
    scale_feature_names, ScaleFeatureVector, ScaleStatus, SCALE_FEATURE_NAMES,
};
use super::stats;
use crate::cache::{SectionCache, SectionKey, SectionSettings};
use crate::config::{ExtractorConfig, ScaleSpec};
use crate::error::{LevyError, Result};
use crate::preprocessing::{
    clean_returns, local_variance, required_length, safe_value, Cleaned, CleaningReport,
    VarianceConvention,
};
use crate::sections::{Section, SectionBuilder};
use crate::series::{Exclusion, ExclusionReason, ReturnSeries, SeriesId};
use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Cross-scale columns that do not depend on the number of scales.
pub const CROSS_FIXED_COUNT: usize = 9;

const CROSS_HEAD: [&str; 2] = ["n_valid_scales", "multiscale_consistency"];

const CROSS_TAIL: [&str; 7] = [
    "trend_inversion",
    "trend_spread",
    "scale_correlation",
    "extreme_scales_ratio",
    "cv_propagation",
    "section_ratio_mean",
    "section_ratio_std",
];

/// Interaction features across scales, computed over the valid subset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CrossScaleFeatures {
    pub n_valid_scales: f64,

    /// Std / mean of the valid scales' duration means.
    pub multiscale_consistency: f64,

    /// `duration_mean[b] / duration_mean[a]` per adjacent configured pair,
    /// 0.0 unless both are valid.
    pub scale_ratios: Vec<f64>,

    /// 1.0 when the smallest and largest valid scales trend in opposite
    /// directions.
    pub trend_inversion: f64,
    pub trend_spread: f64,

    /// Pearson correlation of valid-scale rank against duration mean.
    pub scale_correlation: f64,
    pub extreme_scales_ratio: f64,
    pub cv_propagation: f64,
    pub section_ratio_mean: f64,
    pub section_ratio_std: f64,
}

impl CrossScaleFeatures {
    pub fn from_scales(scales: &[ScaleFeatureVector]) -> Self {
        let valid: Vec<&ScaleFeatureVector> = scales.iter().filter(|s| s.is_valid()).collect();
        let means: Vec<f64> = valid.iter().map(|s| s.stats.duration_mean).collect();

        let scale_ratios = scales
            .windows(2)
            .map(|pair| {
                let (a, b) = (&pair[0], &pair[1]);
                if a.is_valid() && b.is_valid() && a.stats.duration_mean > 0.0 {
                    b.stats.duration_mean / a.stats.duration_mean
                } else {
                    0.0
                }
            })
            .collect();

        let section_ratios: Vec<f64> = scales
            .windows(2)
            .filter(|pair| pair[0].is_valid() && pair[1].is_valid() && pair[1].stats.count > 0.0)
            .map(|pair| pair[0].stats.count / pair[1].stats.count)
            .collect();

        let mut cross = Self {
            n_valid_scales: valid.len() as f64,
            scale_ratios,
            section_ratio_mean: stats::mean(&section_ratios),
            section_ratio_std: stats::population_std(&section_ratios),
            ..Default::default()
        };

        if let [first, .., last] = valid.as_slice() {
            cross.multiscale_consistency = stats::coefficient_of_variation(&means);

            let (t0, t1) = (first.stats.trend, last.stats.trend);
            cross.trend_inversion = if t0 * t1 < 0.0 { 1.0 } else { 0.0 };
            cross.trend_spread = t1 - t0;

            if first.stats.duration_mean > 0.0 {
                cross.extreme_scales_ratio = last.stats.duration_mean / first.stats.duration_mean;
            }
            cross.cv_propagation = last.stats.duration_cv - first.stats.duration_cv;
        }

        if valid.len() >= 3 {
            let ranks: Vec<f64> = (0..valid.len()).map(|i| i as f64).collect();
            cross.scale_correlation = stats::pearson(&ranks, &means);
        }

        cross.sanitized()
    }

    /// Values in column order.
    pub fn values(&self) -> Vec<f64> {
        let mut values = Vec::with_capacity(CROSS_FIXED_COUNT + self.scale_ratios.len());
        values.extend([self.n_valid_scales, self.multiscale_consistency]);
        values.extend_from_slice(&self.scale_ratios);
        values.extend([
            self.trend_inversion,
            self.trend_spread,
            self.scale_correlation,
            self.extreme_scales_ratio,
            self.cv_propagation,
            self.section_ratio_mean,
            self.section_ratio_std,
        ]);
        values
    }

    fn sanitized(mut self) -> Self {
        for value in self.scale_ratios.iter_mut() {
            *value = safe_value(*value);
        }
        for field in [
            &mut self.n_valid_scales,
            &mut self.multiscale_consistency,
            &mut self.trend_inversion,
            &mut self.trend_spread,
            &mut self.scale_correlation,
            &mut self.extreme_scales_ratio,
            &mut self.cv_propagation,
            &mut self.section_ratio_mean,
            &mut self.section_ratio_std,
        ] {
            *field = safe_value(*field);
        }
        self
    }
}

/// Cross-scale column names for a scale ladder.
pub fn cross_feature_names(scales: &[ScaleSpec]) -> Vec<String> {
    let mut names: Vec<String> = CROSS_HEAD.iter().map(|n| n.to_string()).collect();
    names.extend(
        scales
            .windows(2)
            .map(|pair| format!("scale_ratio_{}_{}", pair[0].label, pair[1].label)),
    );
    names.extend(CROSS_TAIL.iter().map(|n| n.to_string()));
    names
}

/// Every column name for a scale ladder, in row order.
pub fn feature_names(scales: &[ScaleSpec]) -> Vec<String> {
    let mut names = Vec::with_capacity(scales.len() * SCALE_FEATURE_NAMES.len() + CROSS_FIXED_COUNT);
    for scale in scales {
        names.extend(scale_feature_names(&scale.label));
    }
    names.extend(cross_feature_names(scales));
    names
}

/// Complete feature vector of one series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiScaleFeatureVector {
    pub series_id: SeriesId,
    pub scales: Vec<ScaleFeatureVector>,
    pub cross: CrossScaleFeatures,
    pub cleaning: CleaningReport,
}

impl MultiScaleFeatureVector {
    /// Flat row in [`feature_names`] order.
    pub fn to_row(&self) -> Vec<f64> {
        let mut row: Vec<f64> = self.scales.iter().flat_map(|s| s.values()).collect();
        row.extend(self.cross.values());
        row
    }

    pub fn feature_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.scales.iter().flat_map(|s| s.feature_names()).collect();
        let labels: Vec<ScaleSpec> = self
            .scales
            .iter()
            .map(|s| ScaleSpec::new(s.label.clone(), s.tau))
            .collect();
        names.extend(cross_feature_names(&labels));
        names
    }

    /// Look up a value by full column name.
    pub fn get(&self, name: &str) -> Option<f64> {
        let index = self.feature_names().iter().position(|n| n == name)?;
        self.to_row().get(index).copied()
    }

    pub fn scale(&self, label: &str) -> Option<&ScaleFeatureVector> {
        self.scales.iter().find(|s| s.label == label)
    }

    pub fn valid_scale_count(&self) -> usize {
        self.scales.iter().filter(|s| s.is_valid()).count()
    }
}

/// Multi-scale feature extractor.
///
/// Stateless apart from its configuration, so one instance can be shared
/// across threads.
#[derive(Debug, Clone)]
pub struct MultiScaleExtractor {
    config: ExtractorConfig,
    builders: Vec<SectionBuilder>,
}

impl MultiScaleExtractor {
    /// Validate `config` and prepare one section builder per scale.
    pub fn new(config: ExtractorConfig) -> Result<Self> {
        config.validate()?;
        let policy = config.section_policy();
        let builders = config
            .scales
            .iter()
            .map(|scale| SectionBuilder::new(scale.tau).map(|b| b.with_policy(policy)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { config, builders })
    }

    #[inline]
    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    pub fn feature_names(&self) -> Vec<String> {
        feature_names(&self.config.scales)
    }

    pub fn feature_count(&self) -> usize {
        self.config.feature_count()
    }

    /// Extract features for one series.
    pub fn extract(
        &self,
        series: &ReturnSeries,
    ) -> std::result::Result<MultiScaleFeatureVector, Exclusion> {
        self.extract_with(series, None)
    }

    /// Extract features, reusing and filling `cache`.
    pub fn extract_cached(
        &self,
        series: &ReturnSeries,
        cache: &SectionCache,
    ) -> std::result::Result<MultiScaleFeatureVector, Exclusion> {
        self.extract_with(series, Some(cache))
    }

    fn extract_with(
        &self,
        series: &ReturnSeries,
        cache: Option<&SectionCache>,
    ) -> std::result::Result<MultiScaleFeatureVector, Exclusion> {
        let (values, cleaning) = match clean_returns(&series.values, self.config.cleaning_policy()) {
            Cleaned::Accepted { values, report } => (values, report),
            Cleaned::TooShort { remaining, required } => {
                return Err(exclude(
                    &series.id,
                    ExclusionReason::TooShortAfterCleaning { remaining, required },
                ));
            }
        };
        if cleaning.coerced > 0 {
            log::warn!(
                "series {}: coerced {} non-finite values to 0.0",
                series.id,
                cleaning.coerced
            );
        }
        if cleaning.dropped > 0 {
            log::debug!("series {}: dropped {} non-finite values", series.id, cleaning.dropped);
        }

        let mut variances: AHashMap<(usize, VarianceConvention), Vec<f64>> = AHashMap::new();
        let mut scales = Vec::with_capacity(self.config.scales.len());

        for (spec, builder) in self.config.scales.iter().zip(&self.builders) {
            let q = self.config.half_window_for(spec);
            let built = self.scale_sections(series, &values, spec, builder, cache, &mut variances);

            let block = match built {
                Ok(sections) if sections.len() >= self.config.min_sections_per_scale => {
                    ScaleFeatureVector::valid(&spec.label, spec.tau, q, &sections, &self.config.breaks)
                }
                Ok(sections) => {
                    log::debug!(
                        "series {} scale {}: {} sections, need {}",
                        series.id,
                        spec.label,
                        sections.len(),
                        self.config.min_sections_per_scale
                    );
                    ScaleFeatureVector::invalid(
                        &spec.label,
                        spec.tau,
                        q,
                        ScaleStatus::Degenerate {
                            sections: sections.len(),
                            required: self.config.min_sections_per_scale,
                        },
                    )
                }
                Err(LevyError::InsufficientData { len, required, .. }) => {
                    log::debug!(
                        "series {} scale {}: {} values, need {}",
                        series.id,
                        spec.label,
                        len,
                        required
                    );
                    ScaleFeatureVector::invalid(
                        &spec.label,
                        spec.tau,
                        q,
                        ScaleStatus::InsufficientData { len, required },
                    )
                }
                Err(err) => {
                    return Err(exclude(&series.id, ExclusionReason::Failed(err.to_string())));
                }
            };
            scales.push(block);
        }

        if scales.iter().all(|s| !s.is_valid()) {
            let insufficient = scales
                .iter()
                .filter(|s| matches!(s.status, ScaleStatus::InsufficientData { .. }))
                .count();
            return Err(exclude(
                &series.id,
                ExclusionReason::AllScalesInvalid {
                    insufficient,
                    degenerate: scales.len() - insufficient,
                },
            ));
        }

        let cross = CrossScaleFeatures::from_scales(&scales);
        Ok(MultiScaleFeatureVector {
            series_id: series.id.clone(),
            scales,
            cross,
            cleaning,
        })
    }

    /// Sections of one scale, from the cache when possible.
    fn scale_sections(
        &self,
        series: &ReturnSeries,
        values: &[f64],
        spec: &ScaleSpec,
        builder: &SectionBuilder,
        cache: Option<&SectionCache>,
        variances: &mut AHashMap<(usize, VarianceConvention), Vec<f64>>,
    ) -> Result<Arc<Vec<Section>>> {
        let half_window = self.config.half_window_for(spec);
        let settings = SectionSettings::for_scale(&self.config, spec);
        let buffer = (half_window, settings.variance);
        let required = required_length(half_window);
        if values.len() < required {
            return Err(LevyError::InsufficientData {
                len: values.len(),
                required,
                half_window,
            });
        }

        let mut build = || -> Result<Vec<Section>> {
            if !variances.contains_key(&buffer) {
                let computed = local_variance(values, half_window, settings.variance)?;
                variances.insert(buffer, computed);
            }
            let variance = variances
                .get(&buffer)
                .map(Vec::as_slice)
                .unwrap_or_default();
            let aligned = &values[half_window..values.len() - half_window];
            Ok(builder.build(aligned, variance, half_window))
        };

        match cache {
            Some(cache) => {
                let key = SectionKey::new(series.id.clone(), half_window, builder.tau(), series.version)
                    .with_settings(settings);
                cache.get_or_build(key, build)
            }
            None => build().map(Arc::new),
        }
    }
}

fn exclude(series_id: &SeriesId, reason: ExclusionReason) -> Exclusion {
    let exclusion = Exclusion::new(series_id.clone(), reason);
    log::warn!("{exclusion}");
    exclusion
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::scale_stats::{SectionStats, SCALE_FEATURE_COUNT};

    fn alternating(n: usize, amplitude: f64) -> Vec<f64> {
        (0..n)
            .map(|i| if i % 2 == 0 { amplitude } else { -amplitude })
            .collect()
    }

    fn two_scale_config() -> ExtractorConfig {
        let mut config = ExtractorConfig::with_scales(vec![
            ScaleSpec::new("fast", 0.05),
            ScaleSpec::new("slow", 0.2),
        ]);
        config.half_window = 2;
        config.variance = crate::preprocessing::VarianceConvention::Population;
        config
    }

    fn block(label: &str, mean: f64, trend: f64, cv: f64, count: f64) -> ScaleFeatureVector {
        let mut b = ScaleFeatureVector::invalid(label, 1.0, 5, ScaleStatus::Valid);
        b.stats = SectionStats {
            duration_mean: mean,
            trend,
            duration_cv: cv,
            count,
            ..Default::default()
        };
        b
    }

    #[test]
    fn test_feature_names_width() {
        let config = ExtractorConfig::default();
        let names = feature_names(&config.scales);
        assert_eq!(names.len(), config.feature_count());
        assert_eq!(names.len(), 3 * SCALE_FEATURE_COUNT + CROSS_FIXED_COUNT + 2);
        assert!(names.contains(&"scale_ratio_micro_media".to_string()));
        assert!(names.contains(&"macro_duration_cv".to_string()));
    }

    #[test]
    fn test_constant_volatility_sections() {
        // population variance of ±0.1 over any 5-window is 0.0096
        let extractor = MultiScaleExtractor::new(two_scale_config()).unwrap();
        let series = ReturnSeries::new("alt", alternating(200, 0.1));
        let vector = extractor.extract(&series).unwrap();

        assert_eq!(vector.valid_scale_count(), 2);
        let fast = vector.scale("fast").unwrap();
        // ceil(0.05 / 0.0096) = 6 observations per section
        assert!((fast.stats.duration_mean - 6.0).abs() < 1e-9);
        assert_eq!(fast.stats.duration_std, 0.0);
        assert_eq!(vector.to_row().len(), extractor.feature_count());
        assert_eq!(vector.feature_names(), extractor.feature_names());
        assert_eq!(vector.get("n_valid_scales"), Some(2.0));
    }

    #[test]
    fn test_short_series_excluded() {
        let extractor = MultiScaleExtractor::new(two_scale_config()).unwrap();
        let series = ReturnSeries::new("tiny", alternating(4, 0.1));
        let exclusion = extractor.extract(&series).unwrap_err();
        assert_eq!(
            exclusion.reason,
            ExclusionReason::AllScalesInvalid {
                insufficient: 2,
                degenerate: 0
            }
        );
    }

    #[test]
    fn test_degenerate_scale_zero_filled() {
        let mut config = two_scale_config();
        config.scales[1].tau = 1.0;
        let extractor = MultiScaleExtractor::new(config).unwrap();
        let vector = extractor
            .extract(&ReturnSeries::new("alt", alternating(120, 0.1)))
            .unwrap();

        let slow = vector.scale("slow").unwrap();
        assert!(matches!(slow.status, ScaleStatus::Degenerate { .. }));
        assert!(slow.values().iter().all(|&v| v == 0.0));
        assert_eq!(vector.get("scale_ratio_fast_slow"), Some(0.0));
        assert_eq!(vector.to_row().len(), extractor.feature_count());
    }

    #[test]
    fn test_drop_policy_excludes_short_series() {
        let mut config = two_scale_config();
        config.min_clean_length = Some(50);
        let extractor = MultiScaleExtractor::new(config).unwrap();

        let mut values = alternating(60, 0.1);
        for v in values.iter_mut().take(20) {
            *v = f64::NAN;
        }
        let exclusion = extractor.extract(&ReturnSeries::new("gappy", values)).unwrap_err();
        assert_eq!(
            exclusion.reason,
            ExclusionReason::TooShortAfterCleaning {
                remaining: 40,
                required: 50
            }
        );
    }

    #[test]
    fn test_coerced_values_reported() {
        let extractor = MultiScaleExtractor::new(two_scale_config()).unwrap();
        let mut values = alternating(200, 0.1);
        values[50] = f64::INFINITY;
        values[51] = f64::NAN;
        let vector = extractor.extract(&ReturnSeries::new("dirty", values)).unwrap();
        assert_eq!(vector.cleaning.coerced, 2);
        assert!(vector.to_row().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_cached_extraction_matches_uncached() {
        let extractor = MultiScaleExtractor::new(two_scale_config()).unwrap();
        let cache = SectionCache::new();
        let series = ReturnSeries::new("alt", alternating(200, 0.1));

        let plain = extractor.extract(&series).unwrap();
        let cold = extractor.extract_cached(&series, &cache).unwrap();
        let warm = extractor.extract_cached(&series, &cache).unwrap();

        assert_eq!(plain, cold);
        assert_eq!(cold, warm);
        let stats = cache.stats();
        assert_eq!((stats.misses, stats.hits), (2, 2));
    }

    #[test]
    fn test_cross_scale_features() {
        let scales = vec![
            block("a", 4.0, 0.5, 0.2, 30.0),
            block("b", 8.0, 0.1, 0.3, 15.0),
            block("c", 16.0, -0.2, 0.5, 5.0),
        ];
        let cross = CrossScaleFeatures::from_scales(&scales);

        assert_eq!(cross.n_valid_scales, 3.0);
        assert_eq!(cross.scale_ratios, vec![2.0, 2.0]);
        assert_eq!(cross.trend_inversion, 1.0);
        assert!((cross.trend_spread + 0.7).abs() < 1e-12);
        assert_eq!(cross.extreme_scales_ratio, 4.0);
        assert!((cross.cv_propagation - 0.3).abs() < 1e-12);
        assert!(cross.scale_correlation > 0.95);
        // section ratios 2 and 3
        assert!((cross.section_ratio_mean - 2.5).abs() < 1e-12);
        assert!((cross.section_ratio_std - 0.5).abs() < 1e-12);
        assert!(cross.multiscale_consistency > 0.0);
    }

    #[test]
    fn test_cross_scale_skips_invalid() {
        let mut scales = vec![
            block("a", 4.0, 0.5, 0.2, 30.0),
            block("b", 8.0, 0.1, 0.3, 15.0),
            block("c", 16.0, 0.2, 0.5, 5.0),
        ];
        scales[1].status = ScaleStatus::Degenerate {
            sections: 1,
            required: 3,
        };
        let cross = CrossScaleFeatures::from_scales(&scales);

        assert_eq!(cross.n_valid_scales, 2.0);
        assert_eq!(cross.scale_ratios, vec![0.0, 0.0]);
        assert_eq!(cross.trend_inversion, 0.0);
        assert_eq!(cross.scale_correlation, 0.0);
        assert_eq!(cross.extreme_scales_ratio, 4.0);
        assert_eq!(cross.section_ratio_mean, 0.0);
        assert_eq!(cross.values().len(), CROSS_FIXED_COUNT + 2);
    }
}
