//! Pull collection: every raw z-value, unfiltered by the reporting threshold.
//!
//! With the right statistical model the pulls of many bins follow a standard
//! normal distribution. [`PullSample`] keeps them all; [`PullHistogram`]
//! bins them the way they are usually inspected (20 bins over [-5, 5]).

use histsig_stats::TestResult;
use serde::Serialize;

use crate::error::{CompareError, Result};

/// Destination for raw z-values during a comparison.
///
/// Order carries no meaning: the pulls are analysed as a distribution.
pub trait PullSink {
    fn record(&mut self, z: f64);

    fn record_all(&mut self, pulls: &[f64]) {
        for &z in pulls {
            self.record(z);
        }
    }
}

impl PullSink for Vec<f64> {
    fn record(&mut self, z: f64) {
        self.push(z);
    }

    fn record_all(&mut self, pulls: &[f64]) {
        self.extend_from_slice(pulls);
    }
}

// ---------------------------------------------------------------------------
// Unbinned sample
// ---------------------------------------------------------------------------

/// Multiset of pulls.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct PullSample(Vec<f64>);

/// Moments and range of a pull sample: the parameters a Gaussian fit to the
/// pull distribution would estimate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PullSummary {
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation (n - 1 denominator).
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
}

impl PullSample {
    pub fn new() -> Self {
        Self::default()
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

    /// Moments over the finite pulls; `None` when there are none.
    pub fn summary(&self) -> Option<PullSummary> {
        let xs: Vec<f64> = self.0.iter().copied().filter(|z| z.is_finite()).collect();
        if xs.is_empty() {
            return None;
        }
        let n = xs.len() as f64;
        let mean = xs.iter().sum::<f64>() / n;
        let std_dev = if xs.len() > 1 {
            (xs.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0)).sqrt()
        } else {
            0.0
        };
        let min = xs.iter().copied().fold(f64::INFINITY, f64::min);
        let max = xs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Some(PullSummary {
            count: xs.len(),
            mean,
            std_dev,
            min,
            max,
        })
    }

    /// Normality battery: mean, variance and Kolmogorov-Smirnov against N(0, 1).
    pub fn validate(&self) -> Vec<TestResult> {
        histsig_stats::validate_pulls(&self.0)
    }
}

impl PullSink for PullSample {
    fn record(&mut self, z: f64) {
        self.0.push(z);
    }

    fn record_all(&mut self, pulls: &[f64]) {
        self.0.extend_from_slice(pulls);
    }
}

impl From<Vec<f64>> for PullSample {
    fn from(pulls: Vec<f64>) -> Self {
        Self(pulls)
    }
}

// ---------------------------------------------------------------------------
// Binned histogram
// ---------------------------------------------------------------------------

/// Fixed binning over `[low, high)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PullBinning {
    pub bins: usize,
    pub low: f64,
    pub high: f64,
}

impl Default for PullBinning {
    fn default() -> Self {
        Self {
            bins: 20,
            low: -5.0,
            high: 5.0,
        }
    }
}

impl PullBinning {
    pub fn new(bins: usize, low: f64, high: f64) -> Result<Self> {
        let binning = Self { bins, low, high };
        binning.check()?;
        Ok(binning)
    }

    fn check(&self) -> Result<()> {
        let valid = self.bins > 0 && self.low.is_finite() && self.high.is_finite() && self.high > self.low;
        if valid {
            Ok(())
        } else {
            Err(CompareError::InvalidBinning {
                bins: self.bins,
                low: self.low,
                high: self.high,
            })
        }
    }

    pub fn width(&self) -> f64 {
        (self.high - self.low) / self.bins as f64
    }

    pub fn center(&self, bin: usize) -> f64 {
        self.low + (bin as f64 + 0.5) * self.width()
    }
}

/// Pulls counted into fixed bins, with underflow and overflow.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PullHistogram {
    pub binning: PullBinning,
    pub counts: Vec<u64>,
    pub underflow: u64,
    pub overflow: u64,
}

impl Default for PullHistogram {
    fn default() -> Self {
        let binning = PullBinning::default();
        Self {
            counts: vec![0; binning.bins],
            binning,
            underflow: 0,
            overflow: 0,
        }
    }
}

impl PullHistogram {
    pub fn new(binning: PullBinning) -> Result<Self> {
        binning.check()?;
        Ok(Self {
            counts: vec![0; binning.bins],
            binning,
            underflow: 0,
            overflow: 0,
        })
    }

    pub fn from_pulls(binning: PullBinning, pulls: &[f64]) -> Result<Self> {
        let mut hist = Self::new(binning)?;
        hist.record_all(pulls);
        Ok(hist)
    }

    /// Entries inside the binned range.
    pub fn in_range(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// All filled entries, underflow and overflow included.
    pub fn entries(&self) -> u64 {
        self.in_range() + self.underflow + self.overflow
    }

    fn fill(&mut self, z: f64) {
        let b = &self.binning;
        if z.is_nan() {
            return;
        }
        if z < b.low {
            self.underflow += 1;
        } else if z >= b.high {
            self.overflow += 1;
        } else {
            let idx = ((z - b.low) / b.width()) as usize;
            self.counts[idx.min(b.bins - 1)] += 1;
        }
    }
}

impl PullSink for PullHistogram {
    fn record(&mut self, z: f64) {
        self.fill(z);
    }
}
