//! Volatility-clock sections.
//!
//! A section is a contiguous run of the (window-trimmed) series whose
//! accumulated local variance reaches the budget `tau`. Small `tau` gives
//! many short "micro" sections; large `tau` gives few long "macro" ones.
//!
//! ```text
//! series:   |q|============ window-aligned returns ============|q|
//! V:          v0 v1 v2 v3 v4 v5 v6 v7 v8 v9 ...
//! clock:      └──── Σ ≥ τ ───┘└─ Σ ≥ τ ─┘└──── Σ ≥ τ ────┘ (tail discarded)
//! sections:   [  section 0   ][section 1][   section 2    ]
//! ```
//!
//! - [`builder`]: greedy left-to-right builder and the prefix-sum variant
//! - [`breaks`]: CUSUM / Welch t-test break detection over durations

pub mod breaks;
pub mod builder;

pub use breaks::{detect_duration_breaks, BreakConfig, BreakReport, DurationBreak};
pub use builder::{SectionBuilder, SectionPolicy, ThresholdRule, TrailingPolicy};

use serde::{Deserialize, Serialize};

/// One volatility-clock section.
///
/// `start` is an index into the original series (window offset included);
/// the section covers the half-open range `[start, start + duration)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    /// First series index covered.
    pub start: usize,

    /// Number of observations, always >= 1.
    pub duration: usize,

    /// Sum of returns over the section.
    pub return_sum: f64,

    /// Accumulated local variance when the section closed.
    pub variance_sum: f64,

    /// Budget that produced the section.
    pub tau: f64,
}

impl Section {
    /// One past the last series index covered.
    #[inline]
    pub fn end(&self) -> usize {
        self.start + self.duration
    }

    /// Whether the section reached its full budget (false only for a
    /// retained trailing section).
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.variance_sum >= self.tau
    }
}

/// Durations of a section list, as `f64` for statistics.
pub fn durations(sections: &[Section]) -> Vec<f64> {
    sections.iter().map(|s| s.duration as f64).collect()
}

/// Return sums of a section list.
pub fn return_sums(sections: &[Section]) -> Vec<f64> {
    sections.iter().map(|s| s.return_sum).collect()
}

/// Total number of observations covered.
pub fn covered_length(sections: &[Section]) -> usize {
    sections.iter().map(|s| s.duration).sum()
}
