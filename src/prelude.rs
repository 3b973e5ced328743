//! Prelude module for convenient imports.
//!
//! # Usage
//!
//! ```
//! use levy_sections::prelude::*;
//!
//! let extractor = ExtractorBuilder::from_preset(Preset::ThreeScale).build().unwrap();
//! assert_eq!(extractor.feature_count(), 89);
//! ```
//!
//! # What's Included
//!
//! ## Configuration
//! - [`ExtractorBuilder`], [`ExtractorConfig`], [`ScaleSpec`], [`Preset`]
//!
//! ## Extraction
//! - [`MultiScaleExtractor`] and its output [`MultiScaleFeatureVector`]
//! - [`ReturnSeries`], [`SeriesId`], [`Exclusion`]
//!
//! ## Batch
//! - [`BatchProcessor`], [`BatchConfig`], [`CancellationToken`]
//!
//! ## Export
//! - [`FeatureTable`], [`NumpyExporter`]

// ============================================================================
// Configuration
// ============================================================================

pub use crate::builder::ExtractorBuilder;
pub use crate::config::{ExperimentMetadata, ExtractorConfig, ScaleSpec};
pub use crate::preprocessing::{RawValue, VarianceConvention};
pub use crate::schema::{FeatureSchema, Preset};
pub use crate::sections::{BreakConfig, ThresholdRule, TrailingPolicy};

// ============================================================================
// Extraction
// ============================================================================

pub use crate::features::{
    MultiScaleExtractor, MultiScaleFeatureVector, ScaleFeatureVector, ScaleStatus,
};
pub use crate::sections::{Section, SectionBuilder};
pub use crate::series::{Exclusion, ExclusionReason, LabeledExample, ReturnSeries, SeriesId};

// ============================================================================
// Batch Processing
// ============================================================================

pub use crate::batch::{
    BatchConfig, BatchOutput, BatchProcessor, BatchSummary, CancellationToken, LogProgress,
    ProgressCallback, ProgressInfo,
};
pub use crate::cache::SectionCache;

// ============================================================================
// Export & Validation
// ============================================================================

pub use crate::export::{FeatureTable, NumpyExporter};
pub use crate::validation::{FeatureValidator, ValidationResult};

// ============================================================================
// Errors
// ============================================================================

pub use crate::error::{LevyError, Result};

/// One flat feature row.
pub type FeatureRow = Vec<f64>;
