//! # histsig-core
//!
//! Bin-by-bin significance of an observed histogram against an expectation.
//!
//! The caller hands over two aligned sequences (observed counts, expected
//! counts with optional variances) with the underflow and overflow bins
//! already stripped. The comparator returns a signed significance per bin
//! and, on request, feeds every raw z-value into a pull sink.
//!
//! ```
//! use histsig_core::{CompareOptions, CountSeries, ExpectationSeries, PullSample, compare};
//!
//! let observed = CountSeries::from_contents(&[120.0, 80.0, 101.0]);
//! let expected = ExpectationSeries::from_errors(&[100.0, 100.0, 100.0], &[20.0, 20.0, 0.0]).unwrap();
//!
//! let mut pulls = PullSample::new();
//! let z = compare(&observed, &expected, &CompareOptions::default(), Some(&mut pulls)).unwrap();
//! assert_eq!(z.len(), 3);
//! assert!(z[0] > 0.0 && z[1] < 0.0);
//! assert_eq!(pulls.len(), 3);
//! ```
//!
//! ## Architecture
//!
//! series → compare (per bin: model → p-value → z-value → threshold) → profile + pulls
//!
//! The numerics live in [`histsig_stats`]; this crate owns the data model,
//! the orchestration, pull collection and toy studies.

pub mod compare;
pub mod error;
pub mod pulls;
pub mod series;
pub mod toys;

pub use compare::{
    BinSignificance, CompareOptions, Comparison, ParameterPolicy, UncertaintyModel, compare,
    compare_detailed, compare_parallel,
};
pub use error::{CompareError, Result};
pub use pulls::{PullBinning, PullHistogram, PullSample, PullSink, PullSummary};
pub use series::{
    ComparisonRequest, CountSeries, Expectation, ExpectationSeries, SignificanceSeries,
};
pub use toys::{DEFAULT_SEED, NoSignalStudy, ToyConfig, no_signal_study, poisson_toy};

/// Library version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
