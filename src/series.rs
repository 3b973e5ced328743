//! Input series and per-series outcomes.

use crate::features::MultiScaleFeatureVector;
use crate::preprocessing::RawValue;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque series identifier supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeriesId(String);

impl SeriesId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SeriesId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SeriesId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for SeriesId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<u64> for SeriesId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

/// A return series as handed over by the ingestion layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnSeries {
    pub id: SeriesId,
    pub values: Vec<f64>,

    /// Source-data version; part of the section cache key.
    #[serde(default)]
    pub version: u64,
}

impl ReturnSeries {
    pub fn new(id: impl Into<SeriesId>, values: Vec<f64>) -> Self {
        Self {
            id: id.into(),
            values,
            version: 0,
        }
    }

    pub fn with_version(mut self, version: u64) -> Self {
        self.version = version;
        self
    }

    /// Build from loosely typed cells.
    ///
    /// Unusable cells become NaN so the configured cleaning policy decides
    /// whether they are coerced to `0.0` or dropped.
    pub fn from_raw(id: impl Into<SeriesId>, cells: &[RawValue]) -> Self {
        let values = cells
            .iter()
            .map(|cell| cell.parse().unwrap_or(f64::NAN))
            .collect();
        Self::new(id, values)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Why a series produced no feature row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
pub enum ExclusionReason {
    #[error("only {remaining} values left after cleaning, need {required}")]
    TooShortAfterCleaning { remaining: usize, required: usize },

    #[error("no valid scale ({insufficient} too short, {degenerate} degenerate)")]
    AllScalesInvalid {
        insufficient: usize,
        degenerate: usize,
    },

    /// An unexpected engine error for this series.
    #[error("extraction failed: {0}")]
    Failed(String),
}

/// A series left out of the feature table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[error("series {series_id} excluded: {reason}")]
pub struct Exclusion {
    pub series_id: SeriesId,
    pub reason: ExclusionReason,
}

impl Exclusion {
    pub fn new(series_id: SeriesId, reason: ExclusionReason) -> Self {
        Self { series_id, reason }
    }
}

/// One feature row with its optional break label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledExample {
    pub series_id: SeriesId,
    pub features: MultiScaleFeatureVector,

    /// `Some(true)` when the series is known to contain a structural break.
    pub label: Option<bool>,
}

impl LabeledExample {
    pub fn new(features: MultiScaleFeatureVector, label: Option<bool>) -> Self {
        Self {
            series_id: features.series_id.clone(),
            features,
            label,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_raw_marks_unusable_cells() {
        let cells = vec![
            RawValue::Number(0.01),
            RawValue::Missing,
            RawValue::from("-0,02"),
            RawValue::from("null"),
        ];
        let series = ReturnSeries::from_raw("s1", &cells);
        assert_eq!(series.len(), 4);
        assert_eq!(series.values[0], 0.01);
        assert!(series.values[1].is_nan());
        assert_eq!(series.values[2], -0.02);
        assert!(series.values[3].is_nan());
    }

    #[test]
    fn test_series_id_conversions() {
        assert_eq!(SeriesId::from(42u64).as_str(), "42");
        assert_eq!(SeriesId::from("abc").to_string(), "abc");
        let json = serde_json::to_string(&SeriesId::new("x")).unwrap();
        assert_eq!(json, "\"x\"");
    }

    #[test]
    fn test_exclusion_message() {
        let exclusion = Exclusion::new(
            SeriesId::new("s7"),
            ExclusionReason::TooShortAfterCleaning {
                remaining: 12,
                required: 100,
            },
        );
        assert_eq!(
            exclusion.to_string(),
            "series s7 excluded: only 12 values left after cleaning, need 100"
        );
    }
}
