//! Significance of count discrepancies under a Poisson model.
//!
//! Everything needed to turn an observed count and its expectation into a
//! signed number of standard deviations:
//!
//! - [`poisson_p_value`]: exact one-sided Poisson tail, expectation known.
//! - [`poisson_gamma_p_value`]: one-sided tail of the Poisson-Gamma mixture,
//!   used when the expectation carries a variance.
//! - [`to_significance`]: p-value plus excess/deficit flag to a signed z-value.
//! - [`normal_quantile`]: the inverse standard normal CDF behind the conversion.
//! - [`pulls`]: tests that a sample of z-values behaves like N(0, 1).
//!
//! All functions are pure. Invalid inputs come back as [`InvalidParameter`];
//! callers that prefer to degrade to a neutral answer substitute
//! [`NEUTRAL_P_VALUE`] / [`NEUTRAL_SIGNIFICANCE`] themselves.
//!
//! ```
//! use histsig_stats::{Tail, poisson_p_value, to_significance};
//!
//! let p = poisson_p_value(150, 100.0).unwrap();
//! let z = to_significance(p, Tail::of(150, 100.0).is_excess()).unwrap();
//! assert!(z > 3.0);
//! ```

pub mod poisson;
pub mod poisson_gamma;
pub mod pulls;
pub mod quantile;
pub mod significance;

use serde::Serialize;
use thiserror::Error;

pub use poisson::poisson_p_value;
pub use poisson_gamma::{Accumulation, GammaPrior, LOG_SPACE_SHAPE, poisson_gamma_p_value};
pub use pulls::{TestResult, validate_pulls};
pub use quantile::{P_HIGH, P_LOW, checked_normal_quantile, normal_quantile};
pub use significance::to_significance;

/// p-value returned when the data carry no information (zero expectation),
/// and the fallback for non-strict callers on invalid input.
pub const NEUTRAL_P_VALUE: f64 = 0.5;

/// z-value fallback for non-strict callers on invalid input.
pub const NEUTRAL_SIGNIFICANCE: f64 = 0.0;

/// Input outside the domain of a p-value or significance computation.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum InvalidParameter {
    #[error("invalid expectation {0}: must be finite and non-negative")]
    Expectation(f64),

    #[error("expectation ({mean}) and variance ({variance}) must both be finite and positive")]
    Moments { mean: f64, variance: f64 },

    #[error("p-value must belong to [0,1] but input value is {0}")]
    PValue(f64),
}

/// Direction of a discrepancy.
///
/// An observation strictly above the expectation is an excess; everything
/// else, including equality, is a deficit. The p-value of an excess is the
/// right tail `P(n >= obs)`, that of a deficit the left tail `P(n <= obs)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tail {
    Excess,
    Deficit,
}

impl Tail {
    pub fn of(n_obs: u64, expected: f64) -> Self {
        if n_obs as f64 > expected {
            Self::Excess
        } else {
            Self::Deficit
        }
    }

    pub fn is_excess(self) -> bool {
        self == Self::Excess
    }
}
