//! Feature and section validation.
//!
//! Checks that catch malformed output before it reaches a training set.
//!
//! # Validation Categories
//!
//! 1. **Row Shape**: column count matches the schema, every value finite
//! 2. **Section Layout**: contiguous, ordered, non-empty sections inside the
//!    window-trimmed range
//! 3. **Vector Consistency**: validity flags are 0/1, invalid blocks are
//!    all-zero, `n_valid_scales` matches the flags
//!
//! # Usage
//!
//! ```
//! use levy_sections::validation::{validate_row, FeatureValidator};
//!
//! assert!(validate_row(&[0.0, 1.0, 2.5], 3).is_ok());
//! assert!(validate_row(&[0.0, f64::NAN, 2.5], 3).is_err());
//!
//! let result = FeatureValidator::new().validate_features(&[1.0, 2.0]);
//! assert!(result.is_valid());
//! ```

use crate::error::{LevyError, Result};
use crate::features::MultiScaleFeatureVector;
use crate::sections::Section;
use std::fmt;

/// Validation result for a single check.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationLevel {
    Valid,
    /// Suspicious but usable.
    Warning(String),
    /// Unusable.
    Error(String),
}

impl ValidationLevel {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationLevel::Valid)
    }

    pub fn is_warning(&self) -> bool {
        matches!(self, ValidationLevel::Warning(_))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ValidationLevel::Error(_))
    }
}

impl fmt::Display for ValidationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationLevel::Valid => write!(f, "Valid"),
            ValidationLevel::Warning(msg) => write!(f, "Warning: {msg}"),
            ValidationLevel::Error(msg) => write!(f, "Error: {msg}"),
        }
    }
}

/// Aggregated validation result.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    results: Vec<(String, ValidationLevel)>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, check_name: &str, level: ValidationLevel) {
        self.results.push((check_name.to_string(), level));
    }

    /// True when no check produced a warning or an error.
    pub fn is_valid(&self) -> bool {
        self.results.iter().all(|(_, level)| level.is_valid())
    }

    pub fn has_errors(&self) -> bool {
        self.results.iter().any(|(_, level)| level.is_error())
    }

    pub fn has_warnings(&self) -> bool {
        self.results.iter().any(|(_, level)| level.is_warning())
    }

    /// Warning messages, prefixed with the check name.
    pub fn warnings(&self) -> Vec<String> {
        self.results
            .iter()
            .filter_map(|(name, level)| match level {
                ValidationLevel::Warning(msg) => Some(format!("{name}: {msg}")),
                _ => None,
            })
            .collect()
    }

    /// Error messages, prefixed with the check name.
    pub fn errors(&self) -> Vec<String> {
        self.results
            .iter()
            .filter_map(|(name, level)| match level {
                ValidationLevel::Error(msg) => Some(format!("{name}: {msg}")),
                _ => None,
            })
            .collect()
    }

    pub fn all_results(&self) -> &[(String, ValidationLevel)] {
        &self.results
    }

    pub fn check_count(&self) -> usize {
        self.results.len()
    }

    pub fn passed_count(&self) -> usize {
        self.results.iter().filter(|(_, l)| l.is_valid()).count()
    }

    /// Merge another result into this one.
    pub fn extend(&mut self, other: ValidationResult) {
        self.results.extend(other.results);
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let passed = self.passed_count();
        let total = self.check_count();
        writeln!(f, "Validation: {passed}/{total} checks passed")?;

        for (name, level) in &self.results {
            if !level.is_valid() {
                writeln!(f, "  - {name}: {level}")?;
            }
        }

        Ok(())
    }
}

// ============================================================================
// Row checks
// ============================================================================

/// Check that a feature row has the expected width and only finite values.
///
/// # Errors
///
/// `SchemaMismatch` on a wrong width, `NonFiniteValue` on the first NaN or
/// infinite entry.
pub fn validate_row(row: &[f64], expected_width: usize) -> Result<()> {
    if row.len() != expected_width {
        return Err(LevyError::SchemaMismatch {
            expected: expected_width,
            actual: row.len(),
        });
    }
    if let Some((index, &value)) = row.iter().enumerate().find(|(_, v)| !v.is_finite()) {
        return Err(LevyError::NonFiniteValue { index, value });
    }
    Ok(())
}

// ============================================================================
// Section checks
// ============================================================================

/// Check the layout of one scale's sections.
///
/// `window_offset` is the half-window `q` and `aligned_len` the length of
/// the window-trimmed series, so every section must lie inside
/// `[window_offset, window_offset + aligned_len)`.
pub fn validate_sections(
    sections: &[Section],
    window_offset: usize,
    aligned_len: usize,
) -> ValidationResult {
    let mut result = ValidationResult::new();

    if sections.is_empty() {
        result.add(
            "sections",
            ValidationLevel::Warning("No sections to validate".to_string()),
        );
        return result;
    }

    if sections[0].start == window_offset {
        result.add("section_origin", ValidationLevel::Valid);
    } else {
        result.add(
            "section_origin",
            ValidationLevel::Error(format!(
                "First section starts at {}, expected {window_offset}",
                sections[0].start
            )),
        );
    }

    match sections.iter().position(|s| s.duration == 0) {
        None => result.add("section_duration", ValidationLevel::Valid),
        Some(i) => result.add(
            "section_duration",
            ValidationLevel::Error(format!("Empty section at position {i}")),
        ),
    }

    let gap = sections
        .windows(2)
        .position(|pair| pair[1].start != pair[0].end());
    match gap {
        None => result.add("section_contiguity", ValidationLevel::Valid),
        Some(i) => result.add(
            "section_contiguity",
            ValidationLevel::Error(format!(
                "Section {} starts at {}, previous ends at {}",
                i + 1,
                sections[i + 1].start,
                sections[i].end()
            )),
        ),
    }

    let limit = window_offset + aligned_len;
    let last_end = sections[sections.len() - 1].end();
    if last_end <= limit {
        result.add("section_coverage", ValidationLevel::Valid);
    } else {
        result.add(
            "section_coverage",
            ValidationLevel::Error(format!("Sections end at {last_end}, beyond {limit}")),
        );
    }

    // Only the last section may fall short of its budget.
    let short = sections[..sections.len() - 1]
        .iter()
        .position(|s| !s.is_complete());
    match short {
        None => result.add("section_budget", ValidationLevel::Valid),
        Some(i) => result.add(
            "section_budget",
            ValidationLevel::Error(format!("Section {i} closed below its budget")),
        ),
    }

    result
}

// ============================================================================
// Feature checks
// ============================================================================

/// Configuration for feature validation.
#[derive(Debug, Clone)]
pub struct ValidationConfig {
    /// Check for NaN/Inf values
    pub check_nan_inf: bool,

    /// Check that invalid scale blocks are all-zero
    pub check_invalid_blocks: bool,

    /// Warn when a valid scale has fewer sections than this
    pub min_section_warning: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            check_nan_inf: true,
            check_invalid_blocks: true,
            min_section_warning: 10,
        }
    }
}

/// Validator for extracted feature vectors.
#[derive(Debug, Clone, Default)]
pub struct FeatureValidator {
    config: ValidationConfig,
}

impl FeatureValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ValidationConfig) -> Self {
        Self { config }
    }

    /// Check a flat feature row for non-finite values.
    pub fn validate_features(&self, features: &[f64]) -> ValidationResult {
        let mut result = ValidationResult::new();

        if self.config.check_nan_inf {
            for (i, &f) in features.iter().enumerate() {
                if f.is_nan() {
                    result.add(
                        &format!("feature_{i}"),
                        ValidationLevel::Error(format!("NaN value at index {i}")),
                    );
                } else if f.is_infinite() {
                    result.add(
                        &format!("feature_{i}"),
                        ValidationLevel::Error(format!("Infinite value at index {i}")),
                    );
                }
            }
        }

        if result.is_valid() {
            result.add("nan_inf_check", ValidationLevel::Valid);
        }

        result
    }

    /// Check a complete multi-scale vector for internal consistency.
    pub fn validate_vector(&self, vector: &MultiScaleFeatureVector) -> ValidationResult {
        let mut result = self.validate_features(&vector.to_row());

        for scale in &vector.scales {
            let values = scale.values();
            let name = format!("{}_valid", scale.label);

            match values.first() {
                Some(&flag) if flag == 1.0 && scale.is_valid() => {
                    result.add(&name, ValidationLevel::Valid);
                }
                Some(&flag) if flag == 0.0 && !scale.is_valid() => {
                    result.add(&name, ValidationLevel::Valid);
                }
                other => result.add(
                    &name,
                    ValidationLevel::Error(format!(
                        "Flag {other:?} does not match status {:?}",
                        scale.status
                    )),
                ),
            }

            if self.config.check_invalid_blocks && !scale.is_valid() {
                let block = format!("{}_block", scale.label);
                if values.iter().all(|&v| v == 0.0) {
                    result.add(&block, ValidationLevel::Valid);
                } else {
                    result.add(
                        &block,
                        ValidationLevel::Error("Invalid scale carries non-zero values".to_string()),
                    );
                }
            }

            if scale.is_valid() && (scale.stats.count as usize) < self.config.min_section_warning {
                result.add(
                    &format!("{}_count", scale.label),
                    ValidationLevel::Warning(format!(
                        "Only {} sections; evolution features use defaults",
                        scale.stats.count
                    )),
                );
            }
        }

        let expected = vector.valid_scale_count() as f64;
        if vector.cross.n_valid_scales == expected {
            result.add("n_valid_scales", ValidationLevel::Valid);
        } else {
            result.add(
                "n_valid_scales",
                ValidationLevel::Error(format!(
                    "n_valid_scales is {}, flags count {expected}",
                    vector.cross.n_valid_scales
                )),
            );
        }

        result
    }
}
