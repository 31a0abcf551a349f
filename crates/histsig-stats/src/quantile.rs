//! Inverse of the standard normal CDF.
//!
//! Peter J. Acklam's rational approximation: three regions split at
//! [`P_LOW`] and [`P_HIGH`], each a ratio of polynomials evaluated in Horner
//! form. The relative error `|x_approx - x| / |x|` is at most 1.15e-9 over
//! the whole open interval (0, 1).

// Central region, numerator (in r = (p - 0.5)^2, multiplied by p - 0.5).
const A: [f64; 6] = [
    -3.969683028665376e+01,
    2.209460984245205e+02,
    -2.759285104469687e+02,
    1.383577518672690e+02,
    -3.066479806614716e+01,
    2.506628277459239e+00,
];

// Central region, denominator (constant term 1).
const B: [f64; 5] = [
    -5.447609879822406e+01,
    1.615858368580409e+02,
    -1.556989798598866e+02,
    6.680131188771972e+01,
    -1.328068155288572e+01,
];

// Tails, numerator (in q = sqrt(-2 ln p)).
const C: [f64; 6] = [
    -7.784894002430293e-03,
    -3.223964580411365e-01,
    -2.400758277161838e+00,
    -2.549732539343734e+00,
    4.374664141464968e+00,
    2.938163982698783e+00,
];

// Tails, denominator (constant term 1).
const D: [f64; 4] = [
    7.784695709041462e-03,
    3.224671290700398e-01,
    2.445134137142996e+00,
    3.754408661907416e+00,
];

/// Lower break-point between the lower tail and the central region.
pub const P_LOW: f64 = 0.02425;

/// Upper break-point between the central region and the upper tail.
pub const P_HIGH: f64 = 1.0 - P_LOW;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Region {
    Lower,
    Central,
    Upper,
}

impl Region {
    /// `None` outside the open interval (0, 1), NaN included.
    fn of(p: f64) -> Option<Self> {
        if !(p > 0.0 && p < 1.0) {
            return None;
        }
        if p < P_LOW {
            Some(Self::Lower)
        } else if p <= P_HIGH {
            Some(Self::Central)
        } else {
            Some(Self::Upper)
        }
    }
}

fn tail(q: f64) -> f64 {
    (((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
        / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
}

fn central(q: f64) -> f64 {
    let r = q * q;
    (((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q
        / (((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0)
}

/// Standard normal quantile, or `None` when `p` is not in the open interval (0, 1).
pub fn checked_normal_quantile(p: f64) -> Option<f64> {
    let x = match Region::of(p)? {
        Region::Lower => tail((-2.0 * p.ln()).sqrt()),
        Region::Central => central(p - 0.5),
        // ln(1 - p) through ln_1p keeps the digits that 1 - p would lose.
        Region::Upper => -tail((-2.0 * (-p).ln_1p()).sqrt()),
    };
    Some(x)
}

/// Standard normal quantile.
///
/// The boundaries 0 and 1 (and anything outside them) have no finite
/// quantile; this returns 0.0 there. Callers must guard against such inputs
/// or use [`checked_normal_quantile`].
pub fn normal_quantile(p: f64) -> f64 {
    checked_normal_quantile(p).unwrap_or(0.0)
}
