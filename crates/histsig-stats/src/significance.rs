//! p-value to signed significance.

use crate::InvalidParameter;
use crate::quantile::normal_quantile;

/// Smallest p-value handed to the quantile. An exact 0 (total loss of
/// precision in `1 - sum`) saturates here instead of hitting the undefined
/// boundary of the quantile.
const P_FLOOR: f64 = f64::MIN_POSITIVE;

/// Largest double below 1.
const P_CEIL: f64 = 1.0 - f64::EPSILON / 2.0;

/// Convert a one-sided p-value into a number of Gaussian standard deviations.
///
/// An excess maps to `Φ⁻¹(1 - p)` (right tail: smaller p, larger positive z),
/// a deficit to `Φ⁻¹(p)` (left tail: smaller p, larger negative z). The
/// excess branch is evaluated as `-Φ⁻¹(p)`, which is the same value without
/// the cancellation in `1 - p`.
///
/// p-values outside [0, 1], NaN included, are rejected.
pub fn to_significance(p: f64, excess: bool) -> Result<f64, InvalidParameter> {
    if !(0.0..=1.0).contains(&p) {
        return Err(InvalidParameter::PValue(p));
    }
    let p = p.clamp(P_FLOOR, P_CEIL);
    if excess {
        Ok(-normal_quantile(p))
    } else {
        Ok(normal_quantile(p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_half_is_zero() {
        assert!(to_significance(0.5, true).unwrap().abs() < 1e-12);
        assert!(to_significance(0.5, false).unwrap().abs() < 1e-12);
    }

    #[test]
    fn test_out_of_range_rejected() {
        assert_eq!(
            to_significance(-0.01, true),
            Err(InvalidParameter::PValue(-0.01))
        );
        assert_eq!(
            to_significance(1.01, false),
            Err(InvalidParameter::PValue(1.01))
        );
        assert!(to_significance(f64::NAN, true).is_err());
    }

    #[test]
    fn test_signs() {
        assert!(to_significance(0.01, true).unwrap() > 2.3);
        assert!(to_significance(0.01, false).unwrap() < -2.3);
    }

    #[test]
    fn test_matches_quantile_of_complement() {
        for &p in &[0.001, 0.02, 0.1, 0.3, 0.45, 0.7] {
            let z = to_significance(p, true).unwrap();
            assert!((z - normal_quantile(1.0 - p)).abs() < 1e-9, "p={p}");
        }
    }

    #[test]
    fn test_excess_decreasing_deficit_increasing() {
        let ps: Vec<f64> = (1..100).map(|i| i as f64 / 100.0).collect();
        for w in ps.windows(2) {
            assert!(to_significance(w[0], true).unwrap() > to_significance(w[1], true).unwrap());
            assert!(to_significance(w[0], false).unwrap() < to_significance(w[1], false).unwrap());
        }
    }

    #[test]
    fn test_boundaries_saturate() {
        let z = to_significance(0.0, true).unwrap();
        assert!(z.is_finite() && z > 37.0);
        let z = to_significance(0.0, false).unwrap();
        assert!(z.is_finite() && z < -37.0);
        assert!(to_significance(1.0, false).unwrap().is_finite());
        assert!(to_significance(1.0, true).unwrap().is_finite());
    }

    #[test]
    fn test_tiny_p_keeps_precision() {
        // 1 - 1e-20 == 1 in f64; the symmetric form still resolves it.
        let z = to_significance(1e-20, true).unwrap();
        assert!((z - 9.262340089798408).abs() < 1e-6, "z={z}");
    }
}
