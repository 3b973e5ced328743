//! Feature Schema Module
//!
//! Provides versioned, typed column definitions for reproducible experiments.
//!
//! # Design Philosophy
//!
//! - **Versioned**: Schema versions enable reproducibility across experiments
//! - **Fixed width**: Column count depends only on the scale ladder
//! - **Named ladders**: Presets fix a scale ladder by name
//!
//! # Example
//!
//! ```
//! use levy_sections::schema::{FeatureCategory, FeatureSchema, Preset};
//!
//! let schema = FeatureSchema::from_preset(Preset::ThreeScale);
//! assert_eq!(schema.total_count(), 89);
//!
//! let cv = schema.get_feature("macro_duration_cv").unwrap();
//! assert_eq!(cv.category, FeatureCategory::PerScale);
//! ```

mod feature_def;
mod presets;

pub use feature_def::{FeatureCategory, FeatureDef, FeatureSchema, FeatureSchemaBuilder};
pub use presets::{Preset, PresetInfo};

/// Current schema version
pub const SCHEMA_VERSION: &str = "1.0.0";
