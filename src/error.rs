//! Error types for section extraction.
//!
//! Per-scale failures (`InsufficientData`, `DegenerateScale`) are normally
//! caught by the multi-scale orchestrator and turned into validity flags;
//! they only surface as `Err` to callers that drive the lower-level
//! building blocks directly.

use thiserror::Error;

/// Errors produced by the section extraction engine.
#[derive(Debug, Error)]
pub enum LevyError {
    /// Series too short for the requested half-window (`n < 2q + 1`).
    #[error("insufficient data: {len} samples, need at least {required} for half-window {half_window}")]
    InsufficientData {
        len: usize,
        required: usize,
        half_window: usize,
    },

    /// Fewer sections than `min_sections_per_scale` were produced.
    #[error("degenerate scale tau={tau}: {sections} sections, need at least {required}")]
    DegenerateScale {
        tau: f64,
        sections: usize,
        required: usize,
    },

    /// A NaN or infinite value reached a routine that requires clean input.
    #[error("non-finite value {value} at index {index}")]
    NonFiniteValue { index: usize, value: f64 },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("schema mismatch: expected {expected} columns, got {actual}")]
    SchemaMismatch { expected: usize, actual: usize },

    #[error("export error: {0}")]
    Export(String),

    #[error("failed to create thread pool: {0}")]
    ThreadPool(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("toml parse error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("toml write error: {0}")]
    TomlSer(#[from] toml::ser::Error),
}

impl LevyError {
    /// True for the per-(series, scale) failures that only invalidate one scale.
    pub fn is_scale_local(&self) -> bool {
        matches!(
            self,
            LevyError::InsufficientData { .. } | LevyError::DegenerateScale { .. }
        )
    }
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, LevyError>;
