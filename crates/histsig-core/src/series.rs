//! Bin-aligned input and output sequences.
//!
//! The histogram collaborator strips underflow/overflow bins before building
//! these; index `i` here is the `i`-th physical bin.

use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::{CompareError, Result};

// ---------------------------------------------------------------------------
// Observed counts
// ---------------------------------------------------------------------------

/// Observed counts, one per bin.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CountSeries(Vec<u64>);

impl CountSeries {
    pub fn new(counts: Vec<u64>) -> Self {
        Self(counts)
    }

    /// Build from real-valued bin contents, truncating toward zero.
    ///
    /// A content of 7.9 is 7 counts, not 8. Negative, NaN, infinite and
    /// contents of 2^64 or more cannot be counts and become 0, with a warning.
    pub fn from_contents(contents: &[f64]) -> Self {
        let counts = contents
            .iter()
            .enumerate()
            .map(|(bin, &c)| {
                content_to_count(c).unwrap_or_else(|| {
                    warn!("bin {bin}: observed content {c} is not a count, using 0");
                    0
                })
            })
            .collect();
        Self(counts)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[u64] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = u64> + '_ {
        self.0.iter().copied()
    }

    pub fn total(&self) -> u64 {
        self.0.iter().sum()
    }
}

/// Truncated count for a content in `[0, 2^64)`, `None` otherwise.
fn content_to_count(content: f64) -> Option<u64> {
    // u64::MAX rounds up to 2^64 as f64.
    if content.is_nan() || content < 0.0 || content >= u64::MAX as f64 {
        return None;
    }
    Some(content.trunc() as u64)
}

impl From<Vec<u64>> for CountSeries {
    fn from(counts: Vec<u64>) -> Self {
        Self(counts)
    }
}

// ---------------------------------------------------------------------------
// Expectations
// ---------------------------------------------------------------------------

/// Expected count of one bin and, optionally, the variance of that expectation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Expectation {
    pub mean: f64,
    /// `None` or `Some(0.0)`: the expectation is known exactly.
    pub variance: Option<f64>,
}

impl Expectation {
    pub fn exact(mean: f64) -> Self {
        Self {
            mean,
            variance: None,
        }
    }

    pub fn with_variance(mean: f64, variance: f64) -> Self {
        Self {
            mean,
            variance: Some(variance),
        }
    }

    /// Positive variance, if any uncertainty is modelled for this bin.
    pub fn uncertainty(&self) -> Option<f64> {
        self.variance.filter(|&v| v > 0.0)
    }
}

/// Expectations, one per bin, aligned with a [`CountSeries`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ExpectationSeries(Vec<Expectation>);

impl ExpectationSeries {
    /// Expectations known exactly.
    pub fn without_uncertainty(means: &[f64]) -> Self {
        Self(means.iter().map(|&m| Expectation::exact(m)).collect())
    }

    /// Expectations with per-bin variances.
    pub fn from_variances(means: &[f64], variances: &[f64]) -> Result<Self> {
        if means.len() != variances.len() {
            return Err(CompareError::UncertaintyLength {
                means: means.len(),
                uncertainties: variances.len(),
            });
        }
        means
            .iter()
            .zip(variances)
            .enumerate()
            .map(|(bin, (&mean, &variance))| {
                if variance.is_nan() || variance < 0.0 {
                    return Err(CompareError::InvalidVariance { bin, variance });
                }
                Ok(Expectation::with_variance(mean, variance))
            })
            .collect::<Result<Vec<_>>>()
            .map(Self)
    }

    /// Expectations with per-bin standard deviations ("bin errors").
    /// The variance is the square of the error.
    pub fn from_errors(means: &[f64], errors: &[f64]) -> Result<Self> {
        if let Some((bin, &e)) = errors
            .iter()
            .enumerate()
            .find(|(_, e)| e.is_nan() || **e < 0.0)
        {
            return Err(CompareError::InvalidVariance { bin, variance: e });
        }
        let variances: Vec<f64> = errors.iter().map(|e| e * e).collect();
        Self::from_variances(means, &variances)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[Expectation] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &Expectation> + '_ {
        self.0.iter()
    }

    /// True when at least one bin carries a positive variance.
    pub fn has_uncertainty(&self) -> bool {
        self.0.iter().any(|e| e.uncertainty().is_some())
    }
}

impl From<Vec<Expectation>> for ExpectationSeries {
    fn from(expectations: Vec<Expectation>) -> Self {
        Self(expectations)
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// Signed significance per bin: positive for an excess, negative for a
/// deficit, exactly 0 for bins below the reporting threshold.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct SignificanceSeries(Vec<f64>);

impl SignificanceSeries {
    pub fn new(values: Vec<f64>) -> Self {
        Self(values)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.0.iter().copied()
    }

    /// Largest `|z|` in the profile, 0 when empty.
    pub fn max_abs(&self) -> f64 {
        self.0.iter().fold(0.0f64, |acc, z| acc.max(z.abs()))
    }
}

impl std::ops::Index<usize> for SignificanceSeries {
    type Output = f64;

    fn index(&self, index: usize) -> &f64 {
        &self.0[index]
    }
}

// ---------------------------------------------------------------------------
// Loosely specified input
// ---------------------------------------------------------------------------

/// Comparison input as it arrives from a file or command line: every field
/// optional, contents real-valued.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ComparisonRequest {
    pub observed: Option<Vec<f64>>,
    pub expected: Option<Vec<f64>>,
    /// Variances of the expectations.
    pub variances: Option<Vec<f64>>,
    /// Standard deviations of the expectations; squared into variances.
    pub errors: Option<Vec<f64>>,
}

impl ComparisonRequest {
    /// Validate and convert into aligned series.
    ///
    /// Observed and expected are both required. At most one of variances or
    /// errors may be given. Infinite observed contents, and contents too large
    /// for a count, are rejected.
    pub fn into_series(self) -> Result<(CountSeries, ExpectationSeries)> {
        let observed = self.observed.ok_or(CompareError::NullInput { what: "observed" })?;
        let means = self.expected.ok_or(CompareError::NullInput { what: "expected" })?;
        let expected = match (self.variances, self.errors) {
            (Some(_), Some(_)) => return Err(CompareError::ConflictingUncertainty),
            (Some(v), None) => ExpectationSeries::from_variances(&means, &v)?,
            (None, Some(e)) => ExpectationSeries::from_errors(&means, &e)?,
            (None, None) => ExpectationSeries::without_uncertainty(&means),
        };
        if observed.len() != expected.len() {
            return Err(CompareError::LengthMismatch {
                observed: observed.len(),
                expected: expected.len(),
            });
        }
        if let Some((bin, &content)) = observed
            .iter()
            .enumerate()
            .find(|(_, c)| c.is_infinite() || **c >= u64::MAX as f64)
        {
            return Err(CompareError::InvalidCount { bin, content });
        }
        Ok((CountSeries::from_contents(&observed), expected))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_contents_truncates() {
        let counts = CountSeries::from_contents(&[0.0, 7.9, 3.2, 10.0, 0.999]);
        assert_eq!(counts.as_slice(), &[0, 7, 3, 10, 0]);
        assert_eq!(counts.total(), 20);
    }

    #[test]
    fn test_from_contents_rejects_negative() {
        let counts = CountSeries::from_contents(&[-3.0, f64::NAN, 2.0]);
        assert_eq!(counts.as_slice(), &[0, 0, 2]);
    }

    #[test]
    fn test_from_contents_rejects_unrepresentable() {
        let counts =
            CountSeries::from_contents(&[f64::INFINITY, 1e30, 18_446_744_073_709_551_616.0, 5.5]);
        assert_eq!(counts.as_slice(), &[0, 0, 0, 5]);
        let big = CountSeries::from_contents(&[9.0e18]);
        assert_eq!(big.as_slice(), &[9_000_000_000_000_000_000]);
    }

    #[test]
    fn test_request_rejects_infinite_observed() {
        let req = ComparisonRequest {
            observed: Some(vec![3.0, f64::INFINITY]),
            expected: Some(vec![100.0, 100.0]),
            errors: Some(vec![20.0, 20.0]),
            ..Default::default()
        };
        assert_eq!(
            req.into_series().unwrap_err(),
            CompareError::InvalidCount {
                bin: 1,
                content: f64::INFINITY
            }
        );
        let req = ComparisonRequest {
            observed: Some(vec![1e300]),
            expected: Some(vec![100.0]),
            ..Default::default()
        };
        assert!(matches!(
            req.into_series(),
            Err(CompareError::InvalidCount { bin: 0, .. })
        ));
    }

    #[test]
    fn test_errors_are_squared() {
        let exp = ExpectationSeries::from_errors(&[100.0, 50.0], &[20.0, 0.0]).unwrap();
        assert_eq!(exp.as_slice()[0].variance, Some(400.0));
        assert_eq!(exp.as_slice()[1].uncertainty(), None);
        assert!(exp.has_uncertainty());
    }

    #[test]
    fn test_negative_variance_rejected() {
        let err = ExpectationSeries::from_variances(&[1.0, 2.0], &[1.0, -1.0]).unwrap_err();
        assert_eq!(
            err,
            CompareError::InvalidVariance {
                bin: 1,
                variance: -1.0
            }
        );
        assert!(ExpectationSeries::from_errors(&[1.0], &[f64::NAN]).is_err());
    }

    #[test]
    fn test_uncertainty_length_mismatch() {
        let err = ExpectationSeries::from_variances(&[1.0, 2.0], &[1.0]).unwrap_err();
        assert_eq!(
            err,
            CompareError::UncertaintyLength {
                means: 2,
                uncertainties: 1
            }
        );
    }

    #[test]
    fn test_request_missing_inputs() {
        let req = ComparisonRequest {
            expected: Some(vec![1.0]),
            ..Default::default()
        };
        assert_eq!(
            req.into_series().unwrap_err(),
            CompareError::NullInput { what: "observed" }
        );
        let req = ComparisonRequest {
            observed: Some(vec![1.0]),
            ..Default::default()
        };
        assert_eq!(
            req.into_series().unwrap_err(),
            CompareError::NullInput { what: "expected" }
        );
    }

    #[test]
    fn test_request_length_mismatch() {
        let req = ComparisonRequest {
            observed: Some(vec![1.0; 10]),
            expected: Some(vec![1.0; 9]),
            ..Default::default()
        };
        assert_eq!(
            req.into_series().unwrap_err(),
            CompareError::LengthMismatch {
                observed: 10,
                expected: 9
            }
        );
    }

    #[test]
    fn test_request_from_json() {
        let req: ComparisonRequest =
            serde_json::from_str(r#"{"observed":[12.0,3.0],"expected":[10.0,5.0],"errors":[2.0,1.0]}"#)
                .unwrap();
        let (obs, exp) = req.into_series().unwrap();
        assert_eq!(obs.as_slice(), &[12, 3]);
        assert_eq!(exp.as_slice()[0].variance, Some(4.0));
    }

    #[test]
    fn test_significance_max_abs() {
        let s = SignificanceSeries::new(vec![0.0, -3.5, 2.0]);
        assert_eq!(s.max_abs(), 3.5);
        assert_eq!(s[1], -3.5);
        assert_eq!(SignificanceSeries::default().max_abs(), 0.0);
    }
}
