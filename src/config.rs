//! Extractor configuration management.
//!
//! One [`ExtractorConfig`] drives the whole pipeline: the scale ladder, the
//! local-volatility window, section policies, break detection, and cleaning.
//! Configurations serialize to TOML or JSON for experiment reproducibility
//! and are validated on load.
//!
//! # Example
//!
//! ```toml
//! half_window = 20
//! min_sections_per_scale = 3
//! min_clean_length = 100
//! variance = "Sample"
//! threshold = "Inclusive"
//! trailing = "Discard"
//!
//! [[scales]]
//! label = "micro"
//! tau = 0.0002
//!
//! [[scales]]
//! label = "macro"
//! tau = 0.005
//! half_window = 40
//! variance = "MeanAbsSquared"
//! ```
//!
//! ```ignore
//! use levy_sections::config::ExtractorConfig;
//!
//! let config = ExtractorConfig::load_toml("experiment.toml")?;
//! config.save_json("experiment.json")?;
//! ```

use crate::error::{LevyError, Result};
use crate::features::scale_stats::SCALE_FEATURE_COUNT;
use crate::preprocessing::{CleaningPolicy, VarianceConvention};
use crate::schema::Preset;
use crate::sections::{BreakConfig, SectionPolicy, ThresholdRule, TrailingPolicy};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Default local-volatility half-window.
pub const DEFAULT_HALF_WINDOW: usize = 20;

/// Default minimum number of sections for a scale to count as valid.
pub const DEFAULT_MIN_SECTIONS: usize = 3;

/// One rung of the scale ladder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScaleSpec {
    /// Column prefix, `[a-z0-9_]+`.
    pub label: String,

    /// Variance budget per section.
    pub tau: f64,

    /// Per-scale override of the global half-window.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub half_window: Option<usize>,

    /// Per-scale override of the global variance convention.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variance: Option<VarianceConvention>,
}

impl ScaleSpec {
    pub fn new(label: impl Into<String>, tau: f64) -> Self {
        Self {
            label: label.into(),
            tau,
            half_window: None,
            variance: None,
        }
    }

    pub fn with_half_window(mut self, half_window: usize) -> Self {
        self.half_window = Some(half_window);
        self
    }

    pub fn with_variance(mut self, convention: VarianceConvention) -> Self {
        self.variance = Some(convention);
        self
    }
}

/// Complete extractor configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractorConfig {
    /// Global local-volatility half-window `q`.
    #[serde(default = "default_half_window")]
    pub half_window: usize,

    /// Fewer sections than this invalidate a scale.
    #[serde(default = "default_min_sections")]
    pub min_sections_per_scale: usize,

    /// When set, non-finite values are dropped instead of coerced and a
    /// series with fewer remaining values is excluded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_clean_length: Option<usize>,

    #[serde(default)]
    pub variance: VarianceConvention,

    #[serde(default)]
    pub threshold: ThresholdRule,

    #[serde(default)]
    pub trailing: TrailingPolicy,

    /// Scale ladder, strictly increasing in `tau`.
    pub scales: Vec<ScaleSpec>,

    #[serde(default)]
    pub breaks: BreakConfig,

    /// Experiment metadata (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ExperimentMetadata>,
}

fn default_half_window() -> usize {
    DEFAULT_HALF_WINDOW
}

fn default_min_sections() -> usize {
    DEFAULT_MIN_SECTIONS
}

/// Experiment metadata for tracking and reproducibility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentMetadata {
    /// Experiment name
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Creation timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,

    /// Version or git commit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

impl Default for ExtractorConfig {
    /// The three-scale ladder.
    fn default() -> Self {
        Preset::ThreeScale.config()
    }
}

impl ExtractorConfig {
    /// Configuration with the given scales and default everything else.
    pub fn with_scales(scales: Vec<ScaleSpec>) -> Self {
        Self {
            half_window: DEFAULT_HALF_WINDOW,
            min_sections_per_scale: DEFAULT_MIN_SECTIONS,
            min_clean_length: None,
            variance: VarianceConvention::default(),
            threshold: ThresholdRule::default(),
            trailing: TrailingPolicy::default(),
            scales,
            breaks: BreakConfig::default(),
            metadata: None,
        }
    }

    pub fn from_preset(preset: Preset) -> Self {
        preset.config()
    }

    pub fn with_metadata(mut self, metadata: ExperimentMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Half-window used for `scale`.
    #[inline]
    pub fn half_window_for(&self, scale: &ScaleSpec) -> usize {
        scale.half_window.unwrap_or(self.half_window)
    }

    /// Variance convention used for `scale`.
    #[inline]
    pub fn variance_for(&self, scale: &ScaleSpec) -> VarianceConvention {
        scale.variance.unwrap_or(self.variance)
    }

    /// Distinct half-windows in first-use order.
    pub fn distinct_half_windows(&self) -> Vec<usize> {
        let mut windows = Vec::new();
        for scale in &self.scales {
            let q = self.half_window_for(scale);
            if !windows.contains(&q) {
                windows.push(q);
            }
        }
        windows
    }

    pub fn section_policy(&self) -> SectionPolicy {
        SectionPolicy {
            threshold: self.threshold,
            trailing: self.trailing,
            min_sections: self.min_sections_per_scale,
        }
    }

    pub fn cleaning_policy(&self) -> CleaningPolicy {
        CleaningPolicy::from_min_clean_length(self.min_clean_length)
    }

    /// Number of scale blocks plus cross-scale columns.
    pub fn feature_count(&self) -> usize {
        let pairs = self.scales.len().saturating_sub(1);
        self.scales.len() * SCALE_FEATURE_COUNT + crate::features::multiscale::CROSS_FIXED_COUNT + pairs
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.scales.is_empty() {
            return Err(invalid("at least one scale is required"));
        }
        if self.half_window == 0 {
            return Err(invalid("half_window must be >= 1"));
        }
        if self.min_sections_per_scale == 0 {
            return Err(invalid("min_sections_per_scale must be >= 1"));
        }
        if let Some(0) = self.min_clean_length {
            return Err(invalid("min_clean_length must be >= 1 when set"));
        }
        if !(self.breaks.significance > 0.0 && self.breaks.significance < 1.0) {
            return Err(invalid(format!(
                "break significance must be in (0, 1), got {}",
                self.breaks.significance
            )));
        }
        if self.breaks.min_window < 2 || self.breaks.window_divisor == 0 {
            return Err(invalid("break min_window must be >= 2 and window_divisor >= 1"));
        }

        for (i, scale) in self.scales.iter().enumerate() {
            if !is_valid_label(&scale.label) {
                return Err(invalid(format!(
                    "scale label {:?} must be non-empty [a-z0-9_]",
                    scale.label
                )));
            }
            if !(scale.tau.is_finite() && scale.tau > 0.0) {
                return Err(invalid(format!(
                    "scale {} has tau {}, must be finite and > 0",
                    scale.label, scale.tau
                )));
            }
            if scale.half_window == Some(0) {
                return Err(invalid(format!("scale {} has half_window 0", scale.label)));
            }
            if self.scales[..i].iter().any(|s| s.label == scale.label) {
                return Err(invalid(format!("duplicate scale label {}", scale.label)));
            }
            if i > 0 && scale.tau <= self.scales[i - 1].tau {
                return Err(invalid(format!(
                    "scales must be strictly increasing in tau: {} ({}) after {} ({})",
                    scale.label,
                    scale.tau,
                    self.scales[i - 1].label,
                    self.scales[i - 1].tau
                )));
            }
        }

        Ok(())
    }

    /// Save configuration to TOML file.
    pub fn save_toml<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_string = toml::to_string_pretty(self)?;
        fs::write(path, toml_string)?;
        Ok(())
    }

    /// Load and validate configuration from a TOML file.
    pub fn load_toml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: ExtractorConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to JSON file.
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json_string = serde_json::to_string_pretty(self)?;
        fs::write(path, json_string)?;
        Ok(())
    }

    /// Load and validate configuration from a JSON file.
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: ExtractorConfig = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }
}

fn is_valid_label(label: &str) -> bool {
    !label.is_empty()
        && label
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_')
}

fn invalid(msg: impl Into<String>) -> LevyError {
    LevyError::InvalidConfig(msg.into())
}
