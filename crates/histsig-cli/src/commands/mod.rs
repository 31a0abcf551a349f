pub mod compare;
pub mod pulls;
pub mod pvalue;
pub mod toys;

use std::fmt::Display;

use histsig_core::{PullBinning, PullHistogram, PullSample, PullSummary, Result};
use histsig_stats::TestResult;
use serde::Serialize;

/// Output format of a subcommand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Bare numbers, one per line.
    Plain,
    Json,
    /// Aligned columns for reading.
    Table,
}

/// Parse an output format string into the enum.
pub fn parse_format(s: &str) -> OutputFormat {
    match s {
        "plain" | "text" => OutputFormat::Plain,
        "json" => OutputFormat::Json,
        "table" => OutputFormat::Table,
        _ => {
            eprintln!("Unknown format '{s}', using plain");
            OutputFormat::Plain
        }
    }
}

/// Parse a comma- and/or whitespace-separated list of numbers.
pub fn parse_list(s: &str) -> std::result::Result<Vec<f64>, String> {
    s.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|t| !t.is_empty())
        .map(|t| {
            t.parse::<f64>()
                .map_err(|_| format!("invalid number '{t}'"))
        })
        .collect()
}

/// Print an error and exit with status 1.
pub fn fail(msg: impl Display) -> ! {
    eprintln!("error: {msg}");
    std::process::exit(1)
}

/// Pretty JSON, or exit on a serialization failure.
pub fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| fail(format!("cannot serialize output: {e}")))
}

/// Write `text` to `path`, or to stdout when no path is given.
pub fn emit(text: &str, path: Option<&str>) {
    match path {
        Some(path) => {
            if let Err(e) = std::fs::write(path, text) {
                fail(format!("failed to write {path}: {e}"));
            }
            eprintln!("Results written to {path}");
        }
        None => print!("{text}"),
    }
}

// ---------------------------------------------------------------------------
// Pull report, shared by compare --pulls, toys and pulls
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct PullReport {
    pub summary: Option<PullSummary>,
    pub histogram: PullHistogram,
    pub validation: Vec<TestResult>,
}

impl PullReport {
    pub fn new(sample: &PullSample, binning: PullBinning) -> Result<Self> {
        Ok(Self {
            summary: sample.summary(),
            histogram: PullHistogram::from_pulls(binning, sample.as_slice())?,
            validation: sample.validate(),
        })
    }

    /// Human-readable rendering; every line starts with `prefix`.
    pub fn render_text(&self, prefix: &str) -> String {
        let mut out = String::new();
        match &self.summary {
            Some(s) => out.push_str(&format!(
                "{prefix}pulls: n={} mean={:.4} std={:.4} min={:.3} max={:.3}\n",
                s.count, s.mean, s.std_dev, s.min, s.max
            )),
            None => out.push_str(&format!("{prefix}pulls: none\n")),
        }

        let h = &self.histogram;
        let peak = h.counts.iter().copied().max().unwrap_or(0).max(1);
        out.push_str(&format!("{prefix}{:>8} {:>7}\n", "center", "count"));
        for (i, &count) in h.counts.iter().enumerate() {
            let width = (count * 40).div_ceil(peak) as usize;
            out.push_str(&format!(
                "{prefix}{:>8.3} {:>7} {}\n",
                h.binning.center(i),
                count,
                "█".repeat(width)
            ));
        }
        out.push_str(&format!(
            "{prefix}underflow={} overflow={}\n",
            h.underflow, h.overflow
        ));

        for r in &self.validation {
            let p = r
                .p_value
                .map_or_else(|| "-".to_string(), |p| format!("{p:.4}"));
            out.push_str(&format!(
                "{prefix}{:<28} {} {} p={p}  {}\n",
                r.name,
                if r.passed { "PASS" } else { "FAIL" },
                r.grade,
                r.details
            ));
        }
        out
    }
}
