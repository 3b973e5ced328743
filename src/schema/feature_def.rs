//! Feature definitions and schema types.
//!
//! This module defines the core types for feature metadata:
//! - `FeatureCategory`: validity flags, per-scale statistics, cross-scale features
//! - `FeatureDef`: Metadata for a single column
//! - `FeatureSchema`: Ordered collection of feature definitions

use super::presets::Preset;
use crate::config::{ExtractorConfig, ScaleSpec};
use crate::features::multiscale::cross_feature_names;
use crate::features::scale_stats::SCALE_FEATURE_NAMES;
use ahash::AHashMap;
use serde::{Deserialize, Serialize};

/// Feature category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeatureCategory {
    /// `{scale}_valid` flags
    Validity,

    /// Section statistics of one scale
    PerScale,

    /// Interaction features across scales
    CrossScale,
}

impl FeatureCategory {
    /// Get all categories in standard order.
    pub fn all() -> &'static [FeatureCategory] {
        &[
            FeatureCategory::Validity,
            FeatureCategory::PerScale,
            FeatureCategory::CrossScale,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            FeatureCategory::Validity => "Validity",
            FeatureCategory::PerScale => "Per-Scale",
            FeatureCategory::CrossScale => "Cross-Scale",
        }
    }
}

/// Definition of a single feature column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureDef {
    /// Unique column name (e.g. "micro_duration_cv", "trend_inversion")
    pub name: String,

    /// Index in the feature vector
    pub index: usize,

    pub category: FeatureCategory,

    pub description: String,

    /// Owning scale label (None for cross-scale features)
    pub scale: Option<String>,

    /// Owning scale budget
    pub tau: Option<f64>,
}

impl FeatureDef {
    pub fn new(
        name: impl Into<String>,
        index: usize,
        category: FeatureCategory,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            index,
            category,
            description: description.into(),
            scale: None,
            tau: None,
        }
    }

    /// Attach the owning scale.
    pub fn with_scale(mut self, label: impl Into<String>, tau: f64) -> Self {
        self.scale = Some(label.into());
        self.tau = Some(tau);
        self
    }
}

/// Feature schema containing all column definitions.
///
/// The schema is versioned and built from an [`ExtractorConfig`] or a
/// [`Preset`]. Its column order is the row order of
/// [`MultiScaleFeatureVector::to_row`](crate::features::MultiScaleFeatureVector::to_row).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureSchema {
    /// Schema version
    pub version: String,

    features: Vec<FeatureDef>,

    #[serde(skip)]
    name_index: AHashMap<String, usize>,

    #[serde(skip)]
    category_indices: AHashMap<FeatureCategory, Vec<usize>>,

    /// Scale labels in column order
    pub scales: Vec<String>,
}

impl FeatureSchema {
    /// Create a new empty schema.
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            features: Vec::new(),
            name_index: AHashMap::new(),
            category_indices: AHashMap::new(),
            scales: Vec::new(),
        }
    }

    pub fn from_preset(preset: Preset) -> Self {
        preset.build_schema()
    }

    /// Schema for the scale ladder of `config`.
    pub fn from_config(config: &ExtractorConfig) -> Self {
        FeatureSchemaBuilder::new()
            .with_scales(&config.scales)
            .with_cross_scale(&config.scales)
            .build()
    }

    pub fn add_feature(&mut self, feature: FeatureDef) {
        let index = feature.index;
        let name = feature.name.clone();
        let category = feature.category;

        self.features.push(feature);
        self.name_index.insert(name, index);
        self.category_indices.entry(category).or_default().push(index);
    }

    pub fn total_count(&self) -> usize {
        self.features.len()
    }

    pub fn get_feature(&self, name: &str) -> Option<&FeatureDef> {
        self.name_index
            .get(name)
            .and_then(|&idx| self.get_feature_by_index(idx))
    }

    pub fn get_feature_by_index(&self, index: usize) -> Option<&FeatureDef> {
        self.features.get(index).filter(|f| f.index == index)
    }

    /// Column index of `name`.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.name_index.get(name).copied()
    }

    pub fn features_by_category(&self, category: FeatureCategory) -> Vec<&FeatureDef> {
        self.features
            .iter()
            .filter(|f| f.category == category)
            .collect()
    }

    pub fn indices_by_category(&self, category: FeatureCategory) -> &[usize] {
        self.category_indices
            .get(&category)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Columns belonging to one scale.
    pub fn features_by_scale(&self, label: &str) -> Vec<&FeatureDef> {
        self.features
            .iter()
            .filter(|f| f.scale.as_deref() == Some(label))
            .collect()
    }

    pub fn all_features(&self) -> &[FeatureDef] {
        &self.features
    }

    pub fn contains(&self, name: &str) -> bool {
        self.name_index.contains_key(name)
    }

    /// Column names in order.
    pub fn feature_names(&self) -> Vec<&str> {
        self.features.iter().map(|f| f.name.as_str()).collect()
    }

    /// Rebuild internal indices (call after deserialization).
    pub fn rebuild_indices(&mut self) {
        self.name_index.clear();
        self.category_indices.clear();

        for feature in &self.features {
            self.name_index.insert(feature.name.clone(), feature.index);
            self.category_indices
                .entry(feature.category)
                .or_default()
                .push(feature.index);
        }
    }
}

/// Short descriptions of the per-scale columns, keyed by base name.
fn scale_feature_description(name: &str) -> &'static str {
    match name {
        "valid" => "1 if the scale produced enough sections, else 0",
        "count" => "Number of sections",
        "duration_mean" => "Mean section duration",
        "duration_std" => "Population std of durations",
        "duration_cv" => "Duration std / mean",
        "duration_min" => "Shortest section",
        "duration_max" => "Longest section",
        "duration_median" => "Median duration",
        "duration_iqr" => "Duration interquartile range",
        "q3q1_ratio" => "Upper / lower duration quartile",
        "duration_skew" => "Duration skewness (biased)",
        "duration_kurtosis" => "Duration excess kurtosis (biased)",
        "duration_autocorr" => "Lag-1 autocorrelation of durations",
        "sum_mean" => "Mean section return sum",
        "sum_std" => "Population std of section return sums",
        "sum_norm_var" => "Variance of return sums / tau",
        "sum_kurtosis" => "Excess kurtosis of return sums",
        "sum_skew" => "Skewness of return sums (biased)",
        "norm_kurtosis" => "Excess kurtosis of sums / sqrt(accumulated variance)",
        "trend" => "Relative change of last vs first durations",
        "early_late_ratio" => "Late third / early third mean duration",
        "acceleration" => "(late third - early third) / middle third mean duration",
        "max_change" => "Largest relative before/after mean shift",
        "change_position" => "Relative position of the largest shift",
        "trading_rate" => "tau / mean duration",
        "break_count" => "Significant duration breaks",
        _ => "",
    }
}

fn cross_feature_description(name: &str) -> String {
    match name {
        "n_valid_scales" => "Number of valid scales".to_string(),
        "multiscale_consistency" => "Std / mean of valid duration means".to_string(),
        "trend_inversion" => "1 if smallest and largest valid trends differ in sign".to_string(),
        "trend_spread" => "Largest-scale trend - smallest-scale trend".to_string(),
        "scale_correlation" => "Correlation of scale rank with duration mean".to_string(),
        "extreme_scales_ratio" => "Largest / smallest valid duration mean".to_string(),
        "cv_propagation" => "Largest - smallest valid duration cv".to_string(),
        "section_ratio_mean" => "Mean section-count ratio of adjacent scales".to_string(),
        "section_ratio_std" => "Std of section-count ratios".to_string(),
        other => match other.strip_prefix("scale_ratio_") {
            Some(pair) => format!("Duration mean ratio for pair {pair}"),
            None => String::new(),
        },
    }
}

/// Builder for feature schemas.
pub struct FeatureSchemaBuilder {
    schema: FeatureSchema,
    next_index: usize,
}

impl Default for FeatureSchemaBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureSchemaBuilder {
    pub fn new() -> Self {
        Self {
            schema: FeatureSchema::new(super::SCHEMA_VERSION),
            next_index: 0,
        }
    }

    /// Add one scale block.
    pub fn with_scale(mut self, scale: &ScaleSpec) -> Self {
        for name in SCALE_FEATURE_NAMES {
            let category = if name == "valid" {
                FeatureCategory::Validity
            } else {
                FeatureCategory::PerScale
            };
            let feat = FeatureDef::new(
                format!("{}_{name}", scale.label),
                self.next_index,
                category,
                scale_feature_description(name),
            )
            .with_scale(scale.label.clone(), scale.tau);
            self.schema.add_feature(feat);
            self.next_index += 1;
        }
        self.schema.scales.push(scale.label.clone());
        self
    }

    pub fn with_scales(self, scales: &[ScaleSpec]) -> Self {
        scales.iter().fold(self, |builder, scale| builder.with_scale(scale))
    }

    /// Add the cross-scale block for a scale ladder.
    pub fn with_cross_scale(mut self, scales: &[ScaleSpec]) -> Self {
        for name in cross_feature_names(scales) {
            let description = cross_feature_description(&name);
            let feat = FeatureDef::new(name, self.next_index, FeatureCategory::CrossScale, description);
            self.schema.add_feature(feat);
            self.next_index += 1;
        }
        self
    }

    pub fn build(self) -> FeatureSchema {
        self.schema
    }
}
