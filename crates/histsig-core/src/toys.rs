//! No-signal toy studies.
//!
//! Observed counts are drawn from Poisson(λ) with λ equal to the expectation
//! itself, then compared with uncertainty ignored. The model is exactly right,
//! so the pull sample should come out close to N(0, 1).

use histsig_stats::TestResult;
use log::{debug, warn};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Poisson};
use serde::Serialize;

use crate::compare::{CompareOptions, Comparison, compare_detailed};
use crate::error::Result;
use crate::pulls::{PullBinning, PullHistogram, PullSample, PullSummary};
use crate::series::{CountSeries, ExpectationSeries};

/// Seed used when none is given.
pub const DEFAULT_SEED: u64 = 4357;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ToyConfig {
    pub bins: usize,
    /// Expectation of every bin.
    pub expected: f64,
    pub seed: u64,
    pub binning: PullBinning,
}

impl Default for ToyConfig {
    fn default() -> Self {
        Self {
            bins: 1000,
            expected: 10_000.0,
            seed: DEFAULT_SEED,
            binning: PullBinning::default(),
        }
    }
}

/// Draw one Poisson-fluctuated count per expectation.
///
/// Deterministic for a given seed. Zero, negative and non-finite expectations
/// yield 0 counts.
pub fn poisson_toy(expected: &[f64], seed: u64) -> CountSeries {
    let mut rng = StdRng::seed_from_u64(seed);
    let counts = expected
        .iter()
        .enumerate()
        .map(|(bin, &lambda)| {
            if !lambda.is_finite() || lambda <= 0.0 {
                return 0;
            }
            match Poisson::new(lambda) {
                Ok(pois) => {
                    let n: f64 = pois.sample(&mut rng);
                    n as u64
                }
                Err(e) => {
                    warn!("bin {bin}: cannot sample Poisson({lambda}): {e}");
                    0
                }
            }
        })
        .collect();
    CountSeries::new(counts)
}

/// Everything a no-signal study produces.
#[derive(Debug, Clone, Serialize)]
pub struct NoSignalStudy {
    pub config: ToyConfig,
    pub observed: CountSeries,
    pub comparison: Comparison,
    pub pulls: PullSample,
    pub histogram: PullHistogram,
    pub summary: Option<PullSummary>,
    pub validation: Vec<TestResult>,
}

/// Generate a toy dataset from `config`, compare it with its own expectation
/// and analyse the resulting pulls.
pub fn no_signal_study(config: &ToyConfig) -> Result<NoSignalStudy> {
    let means = vec![config.expected; config.bins];
    let observed = poisson_toy(&means, config.seed);
    let expected = ExpectationSeries::without_uncertainty(&means);
    let mut histogram = PullHistogram::new(config.binning)?;

    let comparison = compare_detailed(
        &observed,
        &expected,
        &CompareOptions::ignoring_uncertainty(),
        Some(&mut histogram),
    )?;
    let pulls = comparison.pulls();
    let summary = pulls.summary();
    let validation = pulls.validate();

    if let Some(s) = &summary {
        debug!(
            "no-signal study: {} bins, pull mean {:.4}, std {:.4}",
            s.count, s.mean, s.std_dev
        );
    }

    Ok(NoSignalStudy {
        config: *config,
        observed,
        comparison,
        pulls,
        histogram,
        summary,
        validation,
    })
}
