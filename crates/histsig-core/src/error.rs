//! Errors raised while assembling inputs or comparing histograms.

use histsig_stats::InvalidParameter;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompareError {
    /// Observed and expected sequences do not describe the same bins.
    #[error("observed has {observed} bins but expected has {expected}")]
    LengthMismatch { observed: usize, expected: usize },

    /// Per-bin uncertainties do not line up with the expectations.
    #[error("{uncertainties} uncertainties given for {means} expected bins")]
    UncertaintyLength { means: usize, uncertainties: usize },

    /// Both variances and bin errors were supplied for the expectation.
    #[error("variances and errors are mutually exclusive")]
    ConflictingUncertainty,

    /// A required input sequence was not supplied.
    #[error("missing input: {what}")]
    NullInput { what: &'static str },

    /// A bin's p-value or significance could not be computed (strict policy).
    #[error("bin {bin}: {source}")]
    InvalidParameter {
        bin: usize,
        #[source]
        source: InvalidParameter,
    },

    /// Variance (or bin error) that is negative or not a number.
    #[error("bin {bin}: invalid variance {variance}")]
    InvalidVariance { bin: usize, variance: f64 },

    /// Observed content that is infinite or too large to be a count.
    #[error("bin {bin}: observed content {content} is not a representable count")]
    InvalidCount { bin: usize, content: f64 },

    /// Pull histogram binning with no bins or an empty range.
    #[error("invalid pull binning: {bins} bins over [{low}, {high})")]
    InvalidBinning { bins: usize, low: f64, high: f64 },
}

pub type Result<T> = std::result::Result<T, CompareError>;
