//! Poisson p-value when the expectation itself is uncertain.
//!
//! The uncertain rate is given a Gamma prior whose mean and variance match the
//! supplied expectation `E` and variance `V` (rate `b = E/V`, shape `a = E b`).
//! Integrating the Poisson over that prior gives the marginal
//!
//! ```text
//!              b^a  Γ(n + a) / Γ(a)
//!   P(n) = ---------------------------
//!            n!  (1 + b)^(n + a)
//! ```
//!
//! whose terms obey `P(0) = (b / (1 + b))^a` and
//! `P(n) = P(n - 1) (a + n - 1) / (n (1 + b))`. The p-value is a partial sum
//! of that recurrence, the same excess/deficit split as the plain Poisson case.

use log::debug;

use crate::{InvalidParameter, Tail};

/// Shape parameter above which the recurrence is accumulated in log space.
pub const LOG_SPACE_SHAPE: f64 = 100.0;

/// Gamma density matched to a mean and a variance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GammaPrior {
    /// Shape `a` (dimensionless).
    pub shape: f64,
    /// Rate `b` (inverse of the count scale).
    pub rate: f64,
}

impl GammaPrior {
    /// Method-of-moments fit: `b = mean / variance`, `a = mean * b`.
    pub fn from_moments(mean: f64, variance: f64) -> Result<Self, InvalidParameter> {
        let valid = mean.is_finite() && variance.is_finite() && mean > 0.0 && variance > 0.0;
        if !valid {
            return Err(InvalidParameter::Moments { mean, variance });
        }
        let rate = mean / variance;
        Ok(Self {
            shape: mean * rate,
            rate,
        })
    }

    pub fn mean(&self) -> f64 {
        self.shape / self.rate
    }

    pub fn variance(&self) -> f64 {
        self.shape / (self.rate * self.rate)
    }

    /// `ln P(0) = a ln(b / (1 + b)) = -a ln(1 + 1/b)`.
    fn ln_p0(&self) -> f64 {
        -self.shape * self.rate.recip().ln_1p()
    }

    /// Ratio `P(n) / P(n - 1)` for `n >= 1`.
    fn step(&self, n: u64) -> f64 {
        let n = n as f64;
        (self.shape + n - 1.0) / (n * (1.0 + self.rate))
    }
}

/// How the partial sum of the mixture PMF is accumulated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accumulation {
    /// Multiply the terms directly.
    Linear,
    /// Track `ln P(n)` and exponentiate each term before adding it.
    Logarithmic,
}

impl Accumulation {
    /// Logarithmic for large shapes, where `(b/(1+b))^a` and the running
    /// products leave the range of `f64`. A base term that underflows in
    /// linear space forces the logarithmic path as well.
    pub fn select(prior: &GammaPrior) -> Self {
        if prior.shape > LOG_SPACE_SHAPE {
            return Self::Logarithmic;
        }
        let p0 = (prior.rate / (1.0 + prior.rate)).powf(prior.shape);
        if p0.is_normal() {
            Self::Linear
        } else {
            Self::Logarithmic
        }
    }

    /// `P(0) + P(1) + ... + P(last)`.
    fn partial_sum(self, prior: &GammaPrior, last: u64) -> f64 {
        match self {
            Self::Linear => {
                let mut term = (prior.rate / (1.0 + prior.rate)).powf(prior.shape);
                let mut sum = term;
                for n in 1..=last {
                    term *= prior.step(n);
                    sum += term;
                }
                sum
            }
            Self::Logarithmic => {
                let mut ln_term = prior.ln_p0();
                let mut sum = ln_term.exp();
                for n in 1..=last {
                    ln_term += prior.step(n).ln();
                    sum += ln_term.exp();
                }
                sum
            }
        }
    }
}

/// One-sided p-value of observing `n_obs` counts when the expectation has
/// mean `expected` and variance `variance`.
///
/// - excess (`n_obs > expected`): `1 - [P(0) + ... + P(n_obs - 1)]`;
/// - deficit (`n_obs <= expected`): `P(0) + ... + P(n_obs)`.
///
/// Both moments must be finite and strictly positive.
pub fn poisson_gamma_p_value(
    n_obs: u64,
    expected: f64,
    variance: f64,
) -> Result<f64, InvalidParameter> {
    let prior = GammaPrior::from_moments(expected, variance)?;
    let tail = Tail::of(n_obs, expected);
    let accumulation = Accumulation::select(&prior);
    debug!(
        "poisson-gamma n_obs={n_obs} E={expected} V={variance} shape={:.4} rate={:.4} {accumulation:?}",
        prior.shape, prior.rate
    );

    let p = match tail {
        // n_obs > expected > 0, hence n_obs >= 1.
        Tail::Excess => 1.0 - accumulation.partial_sum(&prior, n_obs - 1),
        Tail::Deficit => accumulation.partial_sum(&prior, n_obs),
    };
    Ok(p.clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::poisson_p_value;

    #[test]
    fn test_moment_matching() {
        let prior = GammaPrior::from_moments(100.0, 400.0).unwrap();
        assert!((prior.rate - 0.25).abs() < 1e-15);
        assert!((prior.shape - 25.0).abs() < 1e-12);
        assert!((prior.mean() - 100.0).abs() < 1e-9);
        assert!((prior.variance() - 400.0).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_moments() {
        for (e, v) in [(0.0, 1.0), (-1.0, 1.0), (1.0, 0.0), (1.0, -2.0), (f64::NAN, 1.0)] {
            assert!(
                matches!(
                    poisson_gamma_p_value(3, e, v),
                    Err(InvalidParameter::Moments { .. })
                ),
                "E={e} V={v}"
            );
        }
    }

    #[test]
    fn test_regime_selection() {
        let small = GammaPrior::from_moments(100.0, 400.0).unwrap();
        assert_eq!(Accumulation::select(&small), Accumulation::Linear);
        let large = GammaPrior::from_moments(100.0, 1.0).unwrap();
        assert_eq!(Accumulation::select(&large), Accumulation::Logarithmic);
        // a = 100 is still linear.
        let edge = GammaPrior::from_moments(100.0, 100.0).unwrap();
        assert_eq!(Accumulation::select(&edge), Accumulation::Linear);
        // a = 100, b = 1e-4: (b/(1+b))^a underflows.
        let tiny_rate = GammaPrior::from_moments(1e6, 1e10).unwrap();
        assert_eq!(Accumulation::select(&tiny_rate), Accumulation::Logarithmic);
    }

    #[test]
    fn test_regimes_agree() {
        // Shape 64: both accumulations are well conditioned.
        let prior = GammaPrior::from_moments(32.0, 16.0).unwrap();
        for last in [0u64, 5, 30, 60] {
            let lin = Accumulation::Linear.partial_sum(&prior, last);
            let log = Accumulation::Logarithmic.partial_sum(&prior, last);
            assert!((lin - log).abs() < 1e-12, "last={last}: {lin} vs {log}");
        }
    }

    #[test]
    fn test_known_values() {
        // b = 2, a = 4: P(0) = (2/3)^4, P(n) = P(n-1) (3 + n) / (3 n).
        let p = poisson_gamma_p_value(1, 2.0, 1.0).unwrap();
        let p0 = (2.0f64 / 3.0).powi(4);
        let p1 = p0 * 4.0 / 3.0;
        assert!((p - (p0 + p1)).abs() < 1e-14);
        let p = poisson_gamma_p_value(3, 2.0, 1.0).unwrap();
        assert!((p - (1.0 - p0 - p1 - p1 * 5.0 / 6.0)).abs() < 1e-14);
    }

    #[test]
    fn test_zero_observed() {
        // Deficit with n_obs = 0 is just P(0).
        let p = poisson_gamma_p_value(0, 4.0, 2.0).unwrap();
        assert!((p - (2.0f64 / 3.0).powi(8)).abs() < 1e-14);
    }

    #[test]
    fn test_vanishing_variance_recovers_poisson() {
        for &(n_obs, e) in &[(120u64, 100.0), (80, 100.0), (100, 100.0), (3, 7.5), (15, 7.5)] {
            let mixed = poisson_gamma_p_value(n_obs, e, 1e-6).unwrap();
            let plain = poisson_p_value(n_obs, e).unwrap();
            assert!((mixed - plain).abs() < 1e-6, "({n_obs}, {e}): {mixed} vs {plain}");
        }
    }

    #[test]
    fn test_uncertainty_inflates_p_value() {
        let certain = poisson_p_value(120, 100.0).unwrap();
        let uncertain = poisson_gamma_p_value(120, 100.0, 400.0).unwrap();
        assert!(uncertain > certain);
        let certain = poisson_p_value(80, 100.0).unwrap();
        let uncertain = poisson_gamma_p_value(80, 100.0, 400.0).unwrap();
        assert!(uncertain > certain);
    }

    #[test]
    fn test_range_and_clamp() {
        for n_obs in [0u64, 1, 10, 100, 400] {
            for (e, v) in [(1.0, 1.0), (50.0, 10.0), (50.0, 1e4), (200.0, 0.5)] {
                let p = poisson_gamma_p_value(n_obs, e, v).unwrap();
                assert!((0.0..=1.0).contains(&p), "({n_obs}, {e}, {v}) -> {p}");
            }
        }
    }
}
