//! Tests that a pull sample follows a standard normal distribution.
//!
//! When the statistical model is right, the unfiltered z-values of many bins
//! are distributed as N(0, 1). Each test here returns a [`TestResult`] with a
//! p-value, a pass/fail determination and a letter grade (A through F).

use serde::Serialize;
use statrs::distribution::{ChiSquared, ContinuousCDF, Normal};
use statrs::function::erf::erfc;

/// Minimum number of pulls for the battery to say anything.
pub const MIN_PULLS: usize = 20;

// ═══════════════════════════════════════════════════════════════════════════════
// Core types
// ═══════════════════════════════════════════════════════════════════════════════

/// Result of a single normality test.
#[derive(Debug, Clone, Serialize)]
pub struct TestResult {
    pub name: String,
    pub passed: bool,
    pub p_value: Option<f64>,
    pub statistic: f64,
    pub details: String,
    pub grade: char,
}

impl TestResult {
    /// Assign a letter grade based on p-value.
    ///
    /// - A: p >= 0.1
    /// - B: p >= 0.01
    /// - C: p >= 0.001
    /// - D: p >= 0.0001
    /// - F: otherwise or None
    pub fn grade_from_p(p: Option<f64>) -> char {
        match p {
            Some(p) if p >= 0.1 => 'A',
            Some(p) if p >= 0.01 => 'B',
            Some(p) if p >= 0.001 => 'C',
            Some(p) if p >= 0.0001 => 'D',
            _ => 'F',
        }
    }

    /// Determine pass/fail from p-value against a threshold (default 0.01).
    pub fn pass_from_p(p: Option<f64>, threshold: f64) -> bool {
        match p {
            Some(p) => p >= threshold,
            None => false,
        }
    }

    fn from_p(name: &str, p: f64, statistic: f64, details: String) -> Self {
        Self {
            name: name.to_string(),
            passed: Self::pass_from_p(Some(p), 0.01),
            p_value: Some(p),
            statistic,
            details,
            grade: Self::grade_from_p(Some(p)),
        }
    }
}

/// Return a failing `TestResult` when the sample is too short.
fn insufficient(name: &str, needed: usize, got: usize) -> TestResult {
    TestResult {
        name: name.to_string(),
        passed: false,
        p_value: None,
        statistic: 0.0,
        details: format!("Insufficient data: need {needed}, got {got}"),
        grade: 'F',
    }
}

/// Finite pulls only; a NaN would poison every moment below.
fn finite(pulls: &[f64]) -> Vec<f64> {
    pulls.iter().copied().filter(|z| z.is_finite()).collect()
}

fn mean(xs: &[f64]) -> f64 {
    xs.iter().sum::<f64>() / xs.len() as f64
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

/// Mean z-test: the sample mean of N(0, 1) pulls is N(0, 1/n).
pub fn mean_test(pulls: &[f64]) -> TestResult {
    let name = "Pull Mean";
    let xs = finite(pulls);
    let n = xs.len();
    if n < MIN_PULLS {
        return insufficient(name, MIN_PULLS, n);
    }
    let m = mean(&xs);
    let z = m * (n as f64).sqrt();
    let p = erfc(z.abs() / 2.0_f64.sqrt());
    TestResult::from_p(name, p, z, format!("mean={m:.4}, n={n}"))
}

/// Variance chi-squared test: `(n - 1) s^2` is chi-squared with `n - 1` dof
/// when the pulls have unit variance. Two-sided.
pub fn variance_test(pulls: &[f64]) -> TestResult {
    let name = "Pull Variance";
    let xs = finite(pulls);
    let n = xs.len();
    if n < MIN_PULLS {
        return insufficient(name, MIN_PULLS, n);
    }
    let m = mean(&xs);
    let ss: f64 = xs.iter().map(|x| (x - m) * (x - m)).sum();
    let dof = (n - 1) as f64;
    let variance = ss / dof;
    let Ok(dist) = ChiSquared::new(dof) else {
        return insufficient(name, MIN_PULLS, n);
    };
    let p = (2.0 * dist.cdf(ss).min(dist.sf(ss))).min(1.0);
    TestResult::from_p(
        name,
        p,
        ss,
        format!("variance={variance:.4} (exp 1.0), dof={dof:.0}"),
    )
}

/// Kolmogorov-Smirnov test against the standard normal CDF.
pub fn ks_normal_test(pulls: &[f64]) -> TestResult {
    let name = "Kolmogorov-Smirnov N(0,1)";
    let mut xs = finite(pulls);
    let n = xs.len();
    if n < MIN_PULLS {
        return insufficient(name, MIN_PULLS, n);
    }
    xs.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let norm = Normal::standard();
    let nf = n as f64;
    let mut d_max = 0.0f64;
    for (i, &x) in xs.iter().enumerate() {
        let f_x = norm.cdf(x);
        let d1 = ((i + 1) as f64 / nf - f_x).abs();
        let d2 = (i as f64 / nf - f_x).abs();
        d_max = d_max.max(d1).max(d2);
    }

    // Asymptotic Kolmogorov distribution with Stephens' small-sample correction.
    let sqrt_n = nf.sqrt();
    let lambda = (sqrt_n + 0.12 + 0.11 / sqrt_n) * d_max;
    let mut p = 0.0;
    for k in 1..=100i32 {
        let sign = if k % 2 == 0 { -1.0 } else { 1.0 };
        p += sign * (-2.0 * (k as f64 * lambda).powi(2)).exp();
    }
    p = (2.0 * p).clamp(0.0, 1.0);
    // The alternating series does not converge for lambda -> 0.
    if lambda < 0.3 {
        p = 1.0;
    }

    TestResult::from_p(name, p, d_max, format!("D={d_max:.6}, n={n}"))
}

/// Run the full normality battery on a pull sample.
pub fn validate_pulls(pulls: &[f64]) -> Vec<TestResult> {
    vec![
        mean_test(pulls),
        variance_test(pulls),
        ks_normal_test(pulls),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normal_quantile;

    /// Deterministic N(0,1)-like sample: quantiles of a shuffled uniform grid.
    fn normal_grid(n: usize) -> Vec<f64> {
        let mut state: u64 = 0xDEAD_BEEF_CAFE_BABE;
        let mut idx: Vec<usize> = (0..n).collect();
        for i in (1..n).rev() {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            idx.swap(i, (state >> 33) as usize % (i + 1));
        }
        idx.iter()
            .map(|&i| normal_quantile((i as f64 + 0.5) / n as f64))
            .collect()
    }

    #[test]
    fn test_grade_from_p() {
        assert_eq!(TestResult::grade_from_p(Some(0.5)), 'A');
        assert_eq!(TestResult::grade_from_p(Some(0.05)), 'B');
        assert_eq!(TestResult::grade_from_p(Some(0.005)), 'C');
        assert_eq!(TestResult::grade_from_p(Some(0.0005)), 'D');
        assert_eq!(TestResult::grade_from_p(Some(0.00000001)), 'F');
        assert_eq!(TestResult::grade_from_p(None), 'F');
    }

    #[test]
    fn test_pass_from_p() {
        assert!(TestResult::pass_from_p(Some(0.05), 0.01));
        assert!(!TestResult::pass_from_p(Some(0.005), 0.01));
        assert!(!TestResult::pass_from_p(None, 0.01));
    }

    #[test]
    fn test_insufficient_data() {
        let results = validate_pulls(&[0.1, -0.3, 1.2]);
        assert_eq!(results.len(), 3);
        for r in &results {
            assert!(!r.passed);
            assert!(r.details.contains("Insufficient"));
        }
    }

    #[test]
    fn test_normal_sample_passes() {
        let pulls = normal_grid(2000);
        for r in validate_pulls(&pulls) {
            assert!(r.passed, "{} failed: {}", r.name, r.details);
            assert_eq!(r.grade, 'A', "{}: {}", r.name, r.details);
        }
    }

    #[test]
    fn test_shifted_sample_fails_mean() {
        let pulls: Vec<f64> = normal_grid(2000).iter().map(|z| z + 0.5).collect();
        assert!(!mean_test(&pulls).passed);
        assert!(!ks_normal_test(&pulls).passed);
        assert!(variance_test(&pulls).passed);
    }

    #[test]
    fn test_wide_sample_fails_variance() {
        let pulls: Vec<f64> = normal_grid(2000).iter().map(|z| z * 1.5).collect();
        assert!(!variance_test(&pulls).passed);
        assert!(mean_test(&pulls).passed);
    }

    #[test]
    fn test_nan_pulls_ignored() {
        let mut pulls = normal_grid(500);
        pulls.push(f64::NAN);
        let r = mean_test(&pulls);
        assert!(r.details.contains("n=500"));
    }
}
