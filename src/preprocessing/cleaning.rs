//! Safe numeric conversion and series cleaning.
//!
//! Upstream collaborators hand over loosely typed cells: numbers, strings
//! with decimal commas, `"nan"`/`"null"` markers, or nothing at all. This
//! module turns them into finite `f64` values with one conversion rule:
//!
//! | Input | Output |
//! |-------|--------|
//! | missing, `""`, `"nan"`, `"none"`, `"null"` (any case) | `0.0` |
//! | `+inf`, `-inf`, NaN | `0.0` |
//! | `"3,14"` | `3.14` (comma normalized to dot) |
//! | unparsable text | `0.0` |
//! | anything else | parsed value |
//!
//! Series cleaning then either coerces non-finite entries to `0.0`
//! ([`CleaningPolicy::Coerce`]) or drops them and enforces a minimum
//! remaining length ([`CleaningPolicy::Drop`]).

use serde::{Deserialize, Serialize};

/// One uncleaned input cell.
///
/// Deserializes untagged, so JSON `null`, numbers and strings all map
/// directly onto a variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Missing,
    Number(f64),
    Text(String),
}

impl RawValue {
    /// Parse into a finite float, or `None` if the cell carries no usable value.
    pub fn parse(&self) -> Option<f64> {
        match self {
            RawValue::Missing => None,
            RawValue::Number(v) => finite(*v),
            RawValue::Text(s) => parse_text(s),
        }
    }
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        RawValue::Number(value)
    }
}

impl From<Option<f64>> for RawValue {
    fn from(value: Option<f64>) -> Self {
        value.map_or(RawValue::Missing, RawValue::Number)
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::Text(value.to_string())
    }
}

/// Convert a raw cell to `f64`, mapping every unusable value to `0.0`.
pub fn safe_float(value: &RawValue) -> f64 {
    value.parse().unwrap_or(0.0)
}

/// Replace NaN/Inf with `0.0`.
///
/// Every feature value passes through this before it leaves the engine.
#[inline]
pub fn safe_value(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

#[inline]
fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

fn parse_text(text: &str) -> Option<f64> {
    let normalized = text.trim().replace(',', ".");
    if normalized.is_empty() {
        return None;
    }
    match normalized.to_ascii_lowercase().as_str() {
        "nan" | "none" | "null" => None,
        _ => normalized.parse::<f64>().ok().and_then(finite),
    }
}

/// How non-finite values are handled before extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CleaningPolicy {
    /// Keep the series length; non-finite values become `0.0`.
    #[default]
    Coerce,

    /// Remove non-finite values; reject the series if fewer than
    /// `min_clean_length` values remain.
    Drop { min_clean_length: usize },
}

impl CleaningPolicy {
    /// Policy implied by an optional minimum clean length.
    pub fn from_min_clean_length(min_clean_length: Option<usize>) -> Self {
        match min_clean_length {
            Some(min_clean_length) => CleaningPolicy::Drop { min_clean_length },
            None => CleaningPolicy::Coerce,
        }
    }
}

/// Bookkeeping from one cleaning pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleaningReport {
    /// Values replaced by `0.0`.
    pub coerced: usize,
    /// Values removed from the series.
    pub dropped: usize,
}

impl CleaningReport {
    pub fn is_clean(&self) -> bool {
        self.coerced == 0 && self.dropped == 0
    }
}

/// Outcome of cleaning a series.
#[derive(Debug, Clone, PartialEq)]
pub enum Cleaned {
    Accepted {
        values: Vec<f64>,
        report: CleaningReport,
    },
    /// Fewer than `min_clean_length` finite values remained.
    TooShort { remaining: usize, required: usize },
}

/// Apply a cleaning policy to a return slice.
pub fn clean_returns(values: &[f64], policy: CleaningPolicy) -> Cleaned {
    match policy {
        CleaningPolicy::Coerce => {
            let mut report = CleaningReport::default();
            let cleaned = values
                .iter()
                .map(|&v| {
                    if v.is_finite() {
                        v
                    } else {
                        report.coerced += 1;
                        0.0
                    }
                })
                .collect();
            Cleaned::Accepted {
                values: cleaned,
                report,
            }
        }
        CleaningPolicy::Drop { min_clean_length } => {
            let cleaned: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
            let dropped = values.len() - cleaned.len();
            if cleaned.len() < min_clean_length {
                return Cleaned::TooShort {
                    remaining: cleaned.len(),
                    required: min_clean_length,
                };
            }
            Cleaned::Accepted {
                values: cleaned,
                report: CleaningReport {
                    coerced: 0,
                    dropped,
                },
            }
        }
    }
}
