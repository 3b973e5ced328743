//! Local Volatility Estimation
//!
//! Windowed variance of a return series, the "clock" that drives section
//! building. For a half-window `q` every interior point `i` gets the variance
//! of the `2q + 1` returns centred on it:
//!
//! ```text
//! V[i - q] = var(R[i - q ..= i + q])      for q <= i < n - q
//! ```
//!
//! The output therefore has `n - 2q` entries and index `k` of `V` lines up
//! with series index `k + q` (the *window offset*).
//!
//! # Numerical Method
//!
//! A fixed-size window slides one step at a time. Running statistics are
//! kept with Welford's update and its inverse:
//!
//! ```text
//! add x:     n += 1; d = x - mean; mean += d / n; M2 += d × (x - mean)
//! remove x:  mean' = (n·mean - x) / (n - 1); M2 -= (x - mean) × (x - mean'); n -= 1
//! ```
//!
//! so the whole pass is O(n) and never forms the catastrophic
//! `Σx² - (Σx)²/n` difference.
//!
//! # Conventions
//!
//! | Convention | Formula |
//! |------------|---------|
//! | `Sample` (default) | `M2 / (n - 1)` |
//! | `Population` | `M2 / n` |
//! | `Uncentered` | `Σx² / n` |
//! | `MeanAbsSquared` | `(Σ\|x\| / n)²` |
//!
//! `MeanAbsSquared` squares the mean absolute return. It reacts less to a
//! single outlier than the squared-return estimators and suits the coarser
//! scales.
//!
//! # Example
//!
//! ```
//! use levy_sections::preprocessing::{local_variance, VarianceConvention};
//!
//! let returns = [0.01, -0.02, 0.015, -0.005, 0.02, -0.01, 0.0];
//! let v = local_variance(&returns, 2, VarianceConvention::Sample).unwrap();
//! assert_eq!(v.len(), returns.len() - 4);
//! assert!(v.iter().all(|x| *x >= 0.0));
//! ```

use crate::error::{LevyError, Result};
use serde::{Deserialize, Serialize};

/// Which variance estimator the volatility clock uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum VarianceConvention {
    /// Unbiased sample variance (`ddof = 1`).
    #[default]
    Sample,

    /// Population variance (`ddof = 0`).
    Population,

    /// Mean of squared returns, no centring.
    Uncentered,

    /// Square of the mean absolute return.
    MeanAbsSquared,
}

/// Running moments over a sliding window (Welford's algorithm with removal).
#[derive(Debug, Clone, Default)]
pub struct RollingMoments {
    count: usize,
    mean: f64,
    m2: f64,
    sum_sq: f64,
    sum_abs: f64,
}

impl RollingMoments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a value to the window statistics.
    #[inline]
    pub fn add(&mut self, value: f64) {
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        let delta2 = value - self.mean;
        self.m2 += delta * delta2;
        self.sum_sq += value * value;
        self.sum_abs += value.abs();
    }

    /// Remove a value previously added (inverse Welford step).
    #[inline]
    pub fn remove(&mut self, value: f64) {
        match self.count {
            0 => {}
            1 => *self = Self::default(),
            _ => {
                let delta = value - self.mean;
                self.mean = (self.count as f64 * self.mean - value) / (self.count - 1) as f64;
                let delta2 = value - self.mean;
                self.m2 -= delta * delta2;
                self.sum_sq -= value * value;
                self.sum_abs -= value.abs();
                self.count -= 1;

                // floating point drift
                if self.m2 < 0.0 {
                    self.m2 = 0.0;
                }
                if self.sum_sq < 0.0 {
                    self.sum_sq = 0.0;
                }
                if self.sum_abs < 0.0 {
                    self.sum_abs = 0.0;
                }
            }
        }
    }

    #[inline]
    pub fn count(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Variance under the given convention, `None` if undefined for the count.
    pub fn variance(&self, convention: VarianceConvention) -> Option<f64> {
        let n = self.count as f64;
        let value = match convention {
            VarianceConvention::Sample if self.count >= 2 => self.m2 / (n - 1.0),
            VarianceConvention::Population if self.count >= 1 => self.m2 / n,
            VarianceConvention::Uncentered if self.count >= 1 => self.sum_sq / n,
            VarianceConvention::MeanAbsSquared if self.count >= 1 => (self.sum_abs / n).powi(2),
            _ => return None,
        };
        Some(value.max(0.0))
    }
}

/// Smallest series length that admits a half-window `q`.
#[inline]
pub fn required_length(half_window: usize) -> usize {
    2 * half_window + 1
}

/// Windowed variance of `returns` with half-window `half_window`.
///
/// Returns `n - 2q` values; entry `k` belongs to series index `k + q`.
///
/// # Errors
///
/// - `InvalidConfig` if `half_window == 0`
/// - `InsufficientData` if `returns.len() < 2q + 1`
/// - `NonFiniteValue` if any return is NaN or infinite
pub fn local_variance(
    returns: &[f64],
    half_window: usize,
    convention: VarianceConvention,
) -> Result<Vec<f64>> {
    if half_window == 0 {
        return Err(LevyError::InvalidConfig(
            "half_window must be >= 1".to_string(),
        ));
    }

    let n = returns.len();
    let width = required_length(half_window);
    if n < width {
        return Err(LevyError::InsufficientData {
            len: n,
            required: width,
            half_window,
        });
    }

    if let Some((index, &value)) = returns.iter().enumerate().find(|(_, v)| !v.is_finite()) {
        return Err(LevyError::NonFiniteValue { index, value });
    }

    let mut moments = RollingMoments::new();
    for &r in &returns[..width] {
        moments.add(r);
    }

    let mut out = Vec::with_capacity(n - width + 1);
    out.push(moments.variance(convention).unwrap_or(0.0));

    for start in 1..=(n - width) {
        moments.remove(returns[start - 1]);
        moments.add(returns[start + width - 1]);
        out.push(moments.variance(convention).unwrap_or(0.0));
    }

    Ok(out)
}
