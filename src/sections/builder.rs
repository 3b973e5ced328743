//! Volatility clock and section builder.
//!
//! # Algorithm
//!
//! Scan the local variance `V` left to right, adding each value to a
//! running clock. When the clock first satisfies the threshold rule at index
//! `k`, the current section closes *including* `k`:
//!
//! ```text
//! duration   = k + 1 - section_start
//! return_sum = Σ R[section_start ..= k]     (window-aligned returns)
//! ```
//!
//! The clock resets and the next section starts at `k + 1`. The scan is
//! greedy and never backtracks, so identical inputs always give identical
//! boundaries. A run still below the budget at the end of input is
//! discarded by default ([`TrailingPolicy::Discard`]).
//!
//! # Prefix-Sum Variant
//!
//! [`SectionBuilder::build_bisect`] precomputes `P[i] = Σ V[..i]` and finds
//! each boundary with a binary search over `P`. On exactly representable
//! inputs it yields the same sections as the greedy scan; on general
//! floating-point data the two may disagree on a boundary that sits within
//! rounding error of `tau`.
//!
//! # Example
//!
//! ```
//! use levy_sections::sections::SectionBuilder;
//!
//! let returns = [0.1, -0.1, 0.2, 0.0, -0.2, 0.1, 0.1];
//! let variance = [0.5, 0.5, 0.25, 0.75, 1.0, 0.5, 0.25];
//!
//! let builder = SectionBuilder::new(1.0).unwrap();
//! let sections = builder.build(&returns, &variance, 0);
//!
//! let durations: Vec<usize> = sections.iter().map(|s| s.duration).collect();
//! assert_eq!(durations, vec![2, 2, 1]); // trailing [0.5, 0.25] discarded
//! ```

use super::Section;
use crate::error::{LevyError, Result};
use crate::preprocessing::{local_variance, VarianceConvention};
use serde::{Deserialize, Serialize};

/// Comparison used to decide that the clock reached `tau`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ThresholdRule {
    /// Close when `clock >= tau`.
    #[default]
    Inclusive,

    /// Close when `clock > tau`.
    Strict,
}

impl ThresholdRule {
    #[inline]
    pub fn reached(self, clock: f64, tau: f64) -> bool {
        match self {
            ThresholdRule::Inclusive => clock >= tau,
            ThresholdRule::Strict => clock > tau,
        }
    }
}

/// What happens to a trailing run that never reaches `tau`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TrailingPolicy {
    #[default]
    Discard,

    /// Keep it as a short final section.
    Retain,
}

/// Boundary and validity rules shared by every scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SectionPolicy {
    pub threshold: ThresholdRule,
    pub trailing: TrailingPolicy,

    /// Fewer sections than this make the scale degenerate.
    pub min_sections: usize,
}

impl Default for SectionPolicy {
    fn default() -> Self {
        Self {
            threshold: ThresholdRule::Inclusive,
            trailing: TrailingPolicy::Discard,
            min_sections: 3,
        }
    }
}

/// Builds sections for one `tau`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SectionBuilder {
    tau: f64,
    policy: SectionPolicy,
}

impl SectionBuilder {
    /// Create a builder with the default policy.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` unless `tau` is finite and strictly positive.
    pub fn new(tau: f64) -> Result<Self> {
        if !(tau.is_finite() && tau > 0.0) {
            return Err(LevyError::InvalidConfig(format!(
                "tau must be finite and > 0, got {tau}"
            )));
        }
        Ok(Self {
            tau,
            policy: SectionPolicy::default(),
        })
    }

    pub fn with_policy(mut self, policy: SectionPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[inline]
    pub fn tau(&self) -> f64 {
        self.tau
    }

    #[inline]
    pub fn policy(&self) -> &SectionPolicy {
        &self.policy
    }

    /// Greedy left-to-right section scan.
    ///
    /// `returns` and `variance` must be window-aligned (same length, entry
    /// `k` of both belonging to series index `k + window_offset`).
    pub fn build(&self, returns: &[f64], variance: &[f64], window_offset: usize) -> Vec<Section> {
        debug_assert_eq!(returns.len(), variance.len(), "inputs must be window-aligned");
        let n = returns.len().min(variance.len());

        let mut sections = Vec::new();
        let mut start = 0;
        let mut clock = 0.0;

        for (k, &v) in variance[..n].iter().enumerate() {
            clock += v;
            if self.policy.threshold.reached(clock, self.tau) {
                sections.push(self.section(returns, start, k + 1, clock, window_offset));
                start = k + 1;
                clock = 0.0;
            }
        }

        if start < n && self.policy.trailing == TrailingPolicy::Retain {
            sections.push(self.section(returns, start, n, clock, window_offset));
        }

        sections
    }

    /// Prefix-sum section search.
    ///
    /// Requires `variance` to be non-negative (true for every output of
    /// [`local_variance`]) so that the prefix sums are monotone.
    pub fn build_bisect(
        &self,
        returns: &[f64],
        variance: &[f64],
        window_offset: usize,
    ) -> Vec<Section> {
        debug_assert_eq!(returns.len(), variance.len(), "inputs must be window-aligned");
        let n = returns.len().min(variance.len());

        let mut prefix = Vec::with_capacity(n + 1);
        prefix.push(0.0);
        let mut running = 0.0;
        for &v in &variance[..n] {
            running += v;
            prefix.push(running);
        }

        let mut sections = Vec::new();
        let mut start = 0;
        while start < n {
            let base = prefix[start];
            let tail = &prefix[start + 1..];
            let offset = tail.partition_point(|&p| !self.policy.threshold.reached(p - base, self.tau));

            if offset == tail.len() {
                if self.policy.trailing == TrailingPolicy::Retain {
                    let clock = prefix[n] - base;
                    sections.push(self.section(returns, start, n, clock, window_offset));
                }
                break;
            }

            let end = start + offset + 1;
            let clock = prefix[end] - base;
            sections.push(self.section(returns, start, end, clock, window_offset));
            start = end;
        }

        sections
    }

    /// Greedy scan plus the minimum-section rule.
    ///
    /// # Errors
    ///
    /// `DegenerateScale` when fewer than `policy.min_sections` sections result.
    pub fn build_validated(
        &self,
        returns: &[f64],
        variance: &[f64],
        window_offset: usize,
    ) -> Result<Vec<Section>> {
        let sections = self.build(returns, variance, window_offset);
        self.check_count(sections)
    }

    /// Compute local variance for a raw series and build validated sections.
    ///
    /// # Errors
    ///
    /// Propagates `InsufficientData` / `NonFiniteValue` from the estimator and
    /// `DegenerateScale` from the section count check.
    pub fn build_from_returns(
        &self,
        returns: &[f64],
        half_window: usize,
        convention: VarianceConvention,
    ) -> Result<Vec<Section>> {
        let variance = local_variance(returns, half_window, convention)?;
        let aligned = &returns[half_window..returns.len() - half_window];
        self.build_validated(aligned, &variance, half_window)
    }

    /// Apply the minimum-section rule to an already built list.
    pub fn check_count(&self, sections: Vec<Section>) -> Result<Vec<Section>> {
        if sections.len() < self.policy.min_sections {
            return Err(LevyError::DegenerateScale {
                tau: self.tau,
                sections: sections.len(),
                required: self.policy.min_sections,
            });
        }
        Ok(sections)
    }

    fn section(
        &self,
        returns: &[f64],
        start: usize,
        end: usize,
        clock: f64,
        window_offset: usize,
    ) -> Section {
        Section {
            start: start + window_offset,
            duration: end - start,
            return_sum: returns[start..end].iter().sum(),
            variance_sum: clock,
            tau: self.tau,
        }
    }
}
