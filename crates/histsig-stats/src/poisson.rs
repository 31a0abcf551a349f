//! Poisson p-value for an exactly known expectation.

use statrs::function::gamma::{gamma_lr, gamma_ur};

use crate::{InvalidParameter, NEUTRAL_P_VALUE, Tail};

/// One-sided p-value of observing `n_obs` counts from Poisson(`n_exp`).
///
/// - excess (`n_obs > n_exp`): `P(n >= n_obs) = P(n_obs, n_exp)`, the
///   regularized lower incomplete gamma function;
/// - deficit (`n_obs <= n_exp`): `P(n <= n_obs) = Q(n_obs + 1, n_exp)`, the
///   regularized upper incomplete gamma function.
///
/// A zero expectation carries no information and yields [`NEUTRAL_P_VALUE`].
/// Negative, NaN or infinite expectations are rejected.
pub fn poisson_p_value(n_obs: u64, n_exp: f64) -> Result<f64, InvalidParameter> {
    if !n_exp.is_finite() || n_exp < 0.0 {
        return Err(InvalidParameter::Expectation(n_exp));
    }
    if n_exp == 0.0 {
        return Ok(NEUTRAL_P_VALUE);
    }

    let n = n_obs as f64;
    let p = match Tail::of(n_obs, n_exp) {
        // n_obs > n_exp > 0, so the shape is at least 1.
        Tail::Excess => gamma_lr(n, n_exp),
        Tail::Deficit => gamma_ur(n + 1.0, n_exp),
    };
    Ok(p.clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use statrs::distribution::{DiscreteCDF, Poisson};

    #[test]
    fn test_zero_expectation_is_neutral() {
        assert_eq!(poisson_p_value(0, 0.0).unwrap(), 0.5);
        assert_eq!(poisson_p_value(17, 0.0).unwrap(), 0.5);
    }

    #[test]
    fn test_invalid_expectation() {
        assert_eq!(
            poisson_p_value(3, -1.0),
            Err(InvalidParameter::Expectation(-1.0))
        );
        assert!(poisson_p_value(3, f64::NAN).is_err());
        assert!(poisson_p_value(3, f64::INFINITY).is_err());
    }

    #[test]
    fn test_zero_observed_is_exp_minus_lambda() {
        for &lambda in &[0.1, 1.0, 3.7, 25.0, 200.0] {
            let p = poisson_p_value(0, lambda).unwrap();
            assert!(
                (p - (-lambda).exp()).abs() < 1e-10 * (-lambda).exp(),
                "lambda={lambda}: {p}"
            );
        }
    }

    #[test]
    fn test_matches_explicit_tail_sums() {
        for &(n_obs, lambda) in &[(0u64, 2.5), (3, 2.5), (7, 2.5), (12, 10.0), (5, 10.0)] {
            let pois = Poisson::new(lambda).unwrap();
            let expected = if n_obs as f64 > lambda {
                pois.sf(n_obs - 1)
            } else {
                pois.cdf(n_obs)
            };
            let p = poisson_p_value(n_obs, lambda).unwrap();
            assert!((p - expected).abs() < 1e-10, "({n_obs}, {lambda}): {p} vs {expected}");
        }
    }

    #[test]
    fn test_equality_routes_to_deficit() {
        // P(n <= 100 | 100) is slightly above one half.
        let p = poisson_p_value(100, 100.0).unwrap();
        assert!(p > 0.5 && p < 0.56, "p={p}");
    }

    #[test]
    fn test_range() {
        for n_obs in [0u64, 1, 5, 50, 500] {
            for lambda in [0.01, 0.5, 4.0, 60.0, 480.0] {
                let p = poisson_p_value(n_obs, lambda).unwrap();
                assert!((0.0..=1.0).contains(&p));
            }
        }
    }

    #[test]
    fn test_large_excess_is_small() {
        let p = poisson_p_value(150, 100.0).unwrap();
        assert!(p > 0.0 && p < 1e-5, "p={p}");
    }
}
