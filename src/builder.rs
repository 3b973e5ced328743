//! Fluent builder for extractor configuration.
//!
//! # Quick Start
//!
//! ```
//! use levy_sections::ExtractorBuilder;
//!
//! let extractor = ExtractorBuilder::new()
//!     .scale("micro", 0.0002)
//!     .scale("macro", 0.005)
//!     .half_window(10)
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(extractor.config().scales.len(), 2);
//! ```
//!
//! # Presets Reference
//!
//! | Preset | Scales | Half-window | Columns |
//! |--------|--------|-------------|---------|
//! | `ThreeScale` | micro, media, macro | 20 | 89 |
//! | `FiveScale` | ultra_micro .. ultra_macro | 20 | 143 |
//! | `Classic` | fine, short, medium, long | 5 | 116 |
//!
//! # Common Configurations
//!
//! ## Preset with overrides
//!
//! ```ignore
//! let extractor = ExtractorBuilder::from_preset(Preset::FiveScale)
//!     .min_clean_length(500)
//!     .retain_trailing()
//!     .build()?;
//! ```

use crate::config::{ExperimentMetadata, ExtractorConfig, ScaleSpec};
use crate::error::Result;
use crate::features::MultiScaleExtractor;
use crate::preprocessing::VarianceConvention;
use crate::schema::Preset;
use crate::sections::{BreakConfig, ThresholdRule, TrailingPolicy};

/// Fluent builder for [`ExtractorConfig`] and [`MultiScaleExtractor`].
///
/// Starting from [`ExtractorBuilder::new`] the scale ladder is empty;
/// starting from a preset it holds the preset's ladder, and the first call
/// to [`scale`](Self::scale) replaces it.
#[derive(Debug, Clone)]
pub struct ExtractorBuilder {
    config: ExtractorConfig,
    replace_scales: bool,
}

impl Default for ExtractorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtractorBuilder {
    /// Empty ladder with default policies.
    pub fn new() -> Self {
        Self {
            config: ExtractorConfig::with_scales(Vec::new()),
            replace_scales: false,
        }
    }

    pub fn from_preset(preset: Preset) -> Self {
        Self {
            config: preset.config(),
            replace_scales: true,
        }
    }

    /// Start from an existing configuration.
    pub fn from_config(config: ExtractorConfig) -> Self {
        Self {
            config,
            replace_scales: false,
        }
    }

    // =========================================================================
    // Scales
    // =========================================================================

    /// Append a scale using the global half-window.
    pub fn scale(self, label: &str, tau: f64) -> Self {
        self.scale_spec(ScaleSpec::new(label, tau))
    }

    /// Append a scale with its own half-window.
    pub fn scale_with_window(self, label: &str, tau: f64, half_window: usize) -> Self {
        self.scale_spec(ScaleSpec::new(label, tau).with_half_window(half_window))
    }

    pub fn scale_spec(mut self, spec: ScaleSpec) -> Self {
        if self.replace_scales {
            self.config.scales.clear();
            self.replace_scales = false;
        }
        self.config.scales.push(spec);
        self
    }

    // =========================================================================
    // Volatility and sections
    // =========================================================================

    pub fn half_window(mut self, half_window: usize) -> Self {
        self.config.half_window = half_window;
        self
    }

    pub fn variance(mut self, convention: VarianceConvention) -> Self {
        self.config.variance = convention;
        self
    }

    pub fn strict_threshold(mut self) -> Self {
        self.config.threshold = ThresholdRule::Strict;
        self
    }

    /// Keep an unfinished trailing run as a short final section.
    pub fn retain_trailing(mut self) -> Self {
        self.config.trailing = TrailingPolicy::Retain;
        self
    }

    pub fn min_sections(mut self, min_sections: usize) -> Self {
        self.config.min_sections_per_scale = min_sections;
        self
    }

    /// Drop non-finite values and exclude series shorter than `len` afterwards.
    pub fn min_clean_length(mut self, len: usize) -> Self {
        self.config.min_clean_length = Some(len);
        self
    }

    pub fn breaks(mut self, breaks: BreakConfig) -> Self {
        self.config.breaks = breaks;
        self
    }

    pub fn break_significance(mut self, significance: f64) -> Self {
        self.config.breaks.significance = significance;
        self
    }

    // =========================================================================
    // Metadata
    // =========================================================================

    /// Set experiment metadata, stamped with the current time.
    pub fn experiment(mut self, name: &str, description: &str) -> Self {
        self.config.metadata = Some(ExperimentMetadata {
            name: name.to_string(),
            description: Some(description.to_string()),
            created_at: Some(chrono::Utc::now().to_rfc3339()),
            version: None,
            tags: None,
        });
        self
    }

    pub fn with_metadata(mut self, metadata: ExperimentMetadata) -> Self {
        self.config.metadata = Some(metadata);
        self
    }

    // =========================================================================
    // Build
    // =========================================================================

    /// Validate and return the configuration.
    pub fn build_config(self) -> Result<ExtractorConfig> {
        self.config.validate()?;
        Ok(self.config)
    }

    /// Validate and create the extractor.
    pub fn build(self) -> Result<MultiScaleExtractor> {
        MultiScaleExtractor::new(self.build_config()?)
    }

    pub fn feature_count(&self) -> usize {
        self.config.feature_count()
    }

    pub fn summary(&self) -> String {
        let scales: Vec<String> = self
            .config
            .scales
            .iter()
            .map(|s| format!("{}(tau={}, q={})", s.label, s.tau, self.config.half_window_for(s)))
            .collect();

        format!(
            "ExtractorBuilder Summary:\n\
             - Scales: {}\n\
             - Columns: {}\n\
             - Variance: {:?}, threshold: {:?}, trailing: {:?}\n\
             - Min sections: {}\n\
             - Cleaning: {:?}",
            scales.join(", "),
            self.feature_count(),
            self.config.variance,
            self.config.threshold,
            self.config.trailing,
            self.config.min_sections_per_scale,
            self.config.cleaning_policy(),
        )
    }
}
