//! Feature extraction from volatility-clock sections.
//!
//! # Architecture
//!
//! - `stats`: descriptive statistics shared by every extractor
//! - `scale_stats`: one fixed block of section statistics per `(series, tau)`
//! - `multiscale`: runs every configured scale and adds cross-scale features
//!
//! # Usage
//!
//! ```
//! use levy_sections::features::MultiScaleExtractor;
//! use levy_sections::{ExtractorConfig, ReturnSeries, ScaleSpec};
//!
//! let mut config = ExtractorConfig::with_scales(vec![
//!     ScaleSpec::new("fast", 0.05),
//!     ScaleSpec::new("slow", 0.2),
//! ]);
//! config.half_window = 2;
//!
//! let values: Vec<f64> = (0..200).map(|i| if i % 2 == 0 { 0.1 } else { -0.1 }).collect();
//! let extractor = MultiScaleExtractor::new(config).unwrap();
//! let vector = extractor.extract(&ReturnSeries::new("s1", values)).unwrap();
//!
//! assert_eq!(vector.to_row().len(), extractor.feature_count());
//! assert_eq!(vector.get("fast_valid"), Some(1.0));
//! ```

pub mod multiscale;
pub mod scale_stats;
pub mod stats;

pub use multiscale::{
    cross_feature_names, feature_names, CrossScaleFeatures, MultiScaleExtractor,
    MultiScaleFeatureVector, CROSS_FIXED_COUNT,
};
pub use scale_stats::{
    scale_feature_names, ScaleFeatureVector, ScaleStatus, SectionStats, SCALE_FEATURE_COUNT,
    SCALE_FEATURE_NAMES,
};
