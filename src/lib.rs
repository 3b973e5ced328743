//! Lévy Sections
//!
//! Volatility-clock feature extraction for structural-break detection in
//! return series.
//!
//! # Overview
//!
//! A return series is cut into *sections*: contiguous runs whose accumulated
//! local variance reaches a budget `tau`. In a stable regime section
//! durations are roughly constant; when volatility shifts, durations shift
//! with it. Running several budgets ("scales") over the same series and
//! summarising the duration and return-sum statistics of each gives a
//! fixed-width feature row per series for a downstream classifier.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         Lévy Sections                           │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  preprocessing/ - Safe numeric cleaning, rolling local variance │
//! │  sections/      - Volatility clock, section builder, breaks     │
//! │  features/      - Per-scale statistics, cross-scale fusion      │
//! │  schema/        - Column definitions and named presets          │
//! │  cache          - Shared section cache                          │
//! │  batch          - Parallel batch runner                         │
//! │  export/        - Feature table, NumPy / JSON export            │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use levy_sections::{ExtractorBuilder, ReturnSeries};
//!
//! let extractor = ExtractorBuilder::new()
//!     .scale("fast", 0.05)
//!     .scale("slow", 0.2)
//!     .half_window(2)
//!     .build()
//!     .unwrap();
//!
//! let values: Vec<f64> = (0..200).map(|i| if i % 2 == 0 { 0.1 } else { -0.1 }).collect();
//! let vector = extractor.extract(&ReturnSeries::new("s1", values)).unwrap();
//!
//! assert_eq!(vector.valid_scale_count(), 2);
//! assert_eq!(vector.to_row().len(), extractor.feature_count());
//! ```

pub mod batch;
pub mod builder;
pub mod cache;
pub mod config;
pub mod error;
pub mod export;
pub mod features;
pub mod prelude;
pub mod preprocessing;
pub mod schema;
pub mod sections;
pub mod series;
pub mod validation;

// Re-exports - Errors
pub use error::{LevyError, Result};

// Re-exports - Config
pub use builder::ExtractorBuilder;
pub use config::{ExperimentMetadata, ExtractorConfig, ScaleSpec};

// Re-exports - Schema
pub use schema::{FeatureCategory, FeatureDef, FeatureSchema, Preset};

// Re-exports - Series
pub use series::{Exclusion, ExclusionReason, LabeledExample, ReturnSeries, SeriesId};

// Re-exports - Preprocessing
pub use preprocessing::{
    clean_returns, local_variance, safe_float, CleaningPolicy, CleaningReport, RawValue,
    VarianceConvention,
};

// Re-exports - Sections
pub use sections::{
    detect_duration_breaks, BreakConfig, BreakReport, Section, SectionBuilder, SectionPolicy,
    ThresholdRule, TrailingPolicy,
};

// Re-exports - Features
pub use features::{
    CrossScaleFeatures, MultiScaleExtractor, MultiScaleFeatureVector, ScaleFeatureVector,
    ScaleStatus, SectionStats,
};

// Re-exports - Cache
pub use cache::{CacheStats, SectionCache, SectionKey, SectionSettings};

// Re-exports - Batch
pub use batch::{
    extract_batch, BatchConfig, BatchOutput, BatchProcessor, BatchSummary, CancellationToken,
    ProgressCallback, ProgressInfo,
};

// Re-exports - Export
pub use export::{ExportMetadata, FeatureTable, NumpyExporter};

// Re-exports - Validation
pub use validation::{
    validate_row, validate_sections, FeatureValidator, ValidationConfig, ValidationLevel,
    ValidationResult,
};
