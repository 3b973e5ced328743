//! Input preprocessing ahead of section building.
//!
//! - **Cleaning**: one safe-numeric-conversion rule for loosely typed
//!   input cells, plus coerce-or-drop handling of non-finite returns.
//! - **Local volatility**: windowed variance over `2q + 1` returns, the
//!   clock that the section builder integrates.
//!
//! # Example
//!
//! ```
//! use levy_sections::preprocessing::{
//!     clean_returns, local_variance, Cleaned, CleaningPolicy, VarianceConvention,
//! };
//!
//! let raw = [0.01, f64::NAN, -0.02, 0.015, -0.01, 0.005, 0.02];
//! let Cleaned::Accepted { values, report } = clean_returns(&raw, CleaningPolicy::Coerce) else {
//!     unreachable!()
//! };
//! assert_eq!(report.coerced, 1);
//!
//! let v = local_variance(&values, 1, VarianceConvention::Sample).unwrap();
//! assert_eq!(v.len(), values.len() - 2);
//! ```

pub mod cleaning;
pub mod volatility;

pub use cleaning::{
    clean_returns, safe_float, safe_value, Cleaned, CleaningPolicy, CleaningReport, RawValue,
};
pub use volatility::{local_variance, required_length, RollingMoments, VarianceConvention};
