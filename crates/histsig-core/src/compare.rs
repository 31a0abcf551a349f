//! Bin-by-bin comparison of observed counts against expectations.
//!
//! Per bin the comparator picks a statistical model (plain Poisson, or the
//! Poisson-Gamma mixture when the expectation carries a variance), computes
//! the one-sided p-value, converts it to a signed z-value and applies the
//! reporting threshold. Every raw z-value goes to the pull sink; only bins
//! with `p < threshold` keep their z-value in the output profile.

use histsig_stats::{
    InvalidParameter, NEUTRAL_P_VALUE, NEUTRAL_SIGNIFICANCE, Tail, poisson_gamma_p_value,
    poisson_p_value, to_significance,
};
use log::{debug, warn};
use serde::Serialize;

use crate::error::{CompareError, Result};
use crate::pulls::{PullSample, PullSink};
use crate::series::{CountSeries, Expectation, ExpectationSeries, SignificanceSeries};

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// What to do with a bin whose p-value or significance cannot be computed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterPolicy {
    /// Warn, use p = 0.5 and z = 0, and list the bin in `degraded_bins`.
    #[default]
    Neutral,
    /// Abort the comparison on the first invalid bin.
    Strict,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CompareOptions {
    /// Use the plain Poisson model even where a variance is given.
    pub ignore_uncertainty: bool,
    pub policy: ParameterPolicy,
    /// Bins with `p >= significance_threshold` are reported as 0.
    pub significance_threshold: f64,
}

impl Default for CompareOptions {
    fn default() -> Self {
        Self {
            ignore_uncertainty: false,
            policy: ParameterPolicy::Neutral,
            significance_threshold: 0.5,
        }
    }
}

impl CompareOptions {
    pub fn ignoring_uncertainty() -> Self {
        Self {
            ignore_uncertainty: true,
            ..Self::default()
        }
    }

    pub fn strict() -> Self {
        Self {
            policy: ParameterPolicy::Strict,
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Statistical model used for one bin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UncertaintyModel {
    Poisson,
    PoissonGamma,
}

/// Everything computed for one bin.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BinSignificance {
    /// 0-based position among the physical bins.
    pub index: usize,
    pub observed: u64,
    pub expected: f64,
    pub variance: Option<f64>,
    pub p_value: f64,
    /// Raw signed z-value, recorded as a pull whatever the threshold.
    pub z_value: f64,
    pub excess: bool,
    pub model: UncertaintyModel,
    /// Value in the significance profile: `z_value`, or 0 below threshold.
    pub reported: f64,
}

/// Outcome of a comparison call.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Comparison {
    pub bins: Vec<BinSignificance>,
    /// Bins that fell back to the neutral value under [`ParameterPolicy::Neutral`].
    pub degraded_bins: Vec<usize>,
}

impl Comparison {
    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    /// The thresholded significance profile.
    pub fn significances(&self) -> SignificanceSeries {
        SignificanceSeries::new(self.bins.iter().map(|b| b.reported).collect())
    }

    /// Unfiltered z-values of every bin.
    pub fn pulls(&self) -> PullSample {
        PullSample::from(self.raw_z())
    }

    fn raw_z(&self) -> Vec<f64> {
        self.bins.iter().map(|b| b.z_value).collect()
    }

    fn record_pulls(&self, sink: Option<&mut dyn PullSink>) {
        if let Some(sink) = sink {
            sink.record_all(&self.raw_z());
        }
    }
}

// ---------------------------------------------------------------------------
// Per-bin evaluation
// ---------------------------------------------------------------------------

struct BinOutcome {
    bin: BinSignificance,
    degraded: bool,
}

fn p_and_z(
    observed: u64,
    mean: f64,
    variance: Option<f64>,
    excess: bool,
) -> std::result::Result<(f64, f64), InvalidParameter> {
    let p = match variance {
        Some(v) => poisson_gamma_p_value(observed, mean, v)?,
        None => poisson_p_value(observed, mean)?,
    };
    Ok((p, to_significance(p, excess)?))
}

fn evaluate_bin(
    index: usize,
    observed: u64,
    expectation: &Expectation,
    options: &CompareOptions,
) -> Result<BinOutcome> {
    let variance = expectation.uncertainty().filter(|_| !options.ignore_uncertainty);
    let model = match variance {
        Some(_) => UncertaintyModel::PoissonGamma,
        None => UncertaintyModel::Poisson,
    };
    let excess = Tail::of(observed, expectation.mean).is_excess();

    let (p_value, z_value, degraded) = match p_and_z(observed, expectation.mean, variance, excess) {
        Ok((p, z)) => (p, z, false),
        Err(source) => match options.policy {
            ParameterPolicy::Strict => {
                return Err(CompareError::InvalidParameter { bin: index, source });
            }
            ParameterPolicy::Neutral => {
                warn!("bin {index}: {source}; using p = {NEUTRAL_P_VALUE}");
                (NEUTRAL_P_VALUE, NEUTRAL_SIGNIFICANCE, true)
            }
        },
    };

    let reported = if p_value < options.significance_threshold {
        z_value
    } else {
        0.0
    };

    Ok(BinOutcome {
        bin: BinSignificance {
            index,
            observed,
            expected: expectation.mean,
            variance: expectation.variance,
            p_value,
            z_value,
            excess,
            model,
            reported,
        },
        degraded,
    })
}

/// Evaluate a contiguous run of bins starting at `offset`.
fn evaluate_range(
    offset: usize,
    observed: &[u64],
    expected: &[Expectation],
    options: &CompareOptions,
) -> Result<Comparison> {
    let mut out = Comparison {
        bins: Vec::with_capacity(observed.len()),
        degraded_bins: Vec::new(),
    };
    for (i, (&n, e)) in observed.iter().zip(expected).enumerate() {
        let outcome = evaluate_bin(offset + i, n, e, options)?;
        if outcome.degraded {
            out.degraded_bins.push(outcome.bin.index);
        }
        out.bins.push(outcome.bin);
    }
    Ok(out)
}

fn check_lengths(observed: &CountSeries, expected: &ExpectationSeries) -> Result<()> {
    if observed.len() != expected.len() {
        return Err(CompareError::LengthMismatch {
            observed: observed.len(),
            expected: expected.len(),
        });
    }
    Ok(())
}

fn log_outcome(result: &Comparison) {
    debug!(
        "compared {} bins, {} reported, {} degraded",
        result.len(),
        result.bins.iter().filter(|b| b.reported != 0.0).count(),
        result.degraded_bins.len()
    );
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Compare observed counts with expectations, bin by bin.
///
/// Returns one record per bin. The pull sink, if given, receives every raw
/// z-value, but only once the whole call has succeeded: a failed comparison
/// leaves it untouched.
pub fn compare_detailed(
    observed: &CountSeries,
    expected: &ExpectationSeries,
    options: &CompareOptions,
    pulls: Option<&mut dyn PullSink>,
) -> Result<Comparison> {
    check_lengths(observed, expected)?;
    let result = evaluate_range(0, observed.as_slice(), expected.as_slice(), options)?;
    log_outcome(&result);
    result.record_pulls(pulls);
    Ok(result)
}

/// Thresholded significance profile of `observed` against `expected`.
///
/// ```
/// use histsig_core::{CompareOptions, CountSeries, ExpectationSeries, compare};
///
/// let observed = CountSeries::new(vec![150, 100]);
/// let expected = ExpectationSeries::without_uncertainty(&[100.0, 100.0]);
/// let mut pulls: Vec<f64> = Vec::new();
/// let z = compare(&observed, &expected, &CompareOptions::default(), Some(&mut pulls)).unwrap();
/// assert!(z[0] > 3.0);
/// assert_eq!(z[1], 0.0);
/// assert_eq!(pulls.len(), 2);
/// ```
pub fn compare(
    observed: &CountSeries,
    expected: &ExpectationSeries,
    options: &CompareOptions,
    pulls: Option<&mut dyn PullSink>,
) -> Result<SignificanceSeries> {
    compare_detailed(observed, expected, options, pulls).map(|c| c.significances())
}

/// Same result as [`compare_detailed`], with the bins split into contiguous
/// chunks evaluated on `workers` scoped threads.
///
/// Each worker fills its own buffer; buffers are concatenated in bin order
/// after join. Under the strict policy the reported error is the one for the
/// lowest failing bin, as in the sequential version.
pub fn compare_parallel(
    observed: &CountSeries,
    expected: &ExpectationSeries,
    options: &CompareOptions,
    workers: usize,
    pulls: Option<&mut dyn PullSink>,
) -> Result<Comparison> {
    check_lengths(observed, expected)?;
    let n = observed.len();
    let workers = workers.clamp(1, n.max(1));
    let chunk = n.div_ceil(workers).max(1);

    let partials: Vec<Result<Comparison>> = std::thread::scope(|s| {
        let handles: Vec<_> = observed
            .as_slice()
            .chunks(chunk)
            .zip(expected.as_slice().chunks(chunk))
            .enumerate()
            .map(|(k, (obs, exp))| s.spawn(move || evaluate_range(k * chunk, obs, exp, options)))
            .collect();

        handles
            .into_iter()
            .map(|handle| match handle.join() {
                Ok(partial) => partial,
                Err(panic) => std::panic::resume_unwind(panic),
            })
            .collect()
    });

    let mut result = Comparison {
        bins: Vec::with_capacity(n),
        degraded_bins: Vec::new(),
    };
    for partial in partials {
        let partial = partial?;
        result.bins.extend(partial.bins);
        result.degraded_bins.extend(partial.degraded_bins);
    }
    debug!("parallel comparison on {workers} workers, chunk size {chunk}");
    log_outcome(&result);
    result.record_pulls(pulls);
    Ok(result)
}
