use histsig_core::{
    CompareOptions, Comparison, ComparisonRequest, ParameterPolicy, PullBinning, compare_detailed,
    compare_parallel,
};

use super::{OutputFormat, PullReport};

pub struct CompareCommandConfig<'a> {
    pub observed: Option<&'a str>,
    pub expected: Option<&'a str>,
    pub errors: Option<&'a str>,
    pub variances: Option<&'a str>,
    pub input_path: Option<&'a str>,
    pub ignore_uncertainty: bool,
    pub strict: bool,
    pub threshold: f64,
    pub workers: usize,
    pub format: &'a str,
    pub output_path: Option<&'a str>,
    pub include_pulls: bool,
}

pub fn run(cfg: CompareCommandConfig<'_>) {
    let format = super::parse_format(cfg.format);
    let threshold = check_threshold(cfg.threshold).unwrap_or_else(|e| super::fail(e));
    let request = build_request(&cfg).unwrap_or_else(|e| super::fail(e));
    let (observed, expected) = request.into_series().unwrap_or_else(|e| super::fail(e));

    let options = CompareOptions {
        ignore_uncertainty: cfg.ignore_uncertainty,
        policy: if cfg.strict {
            ParameterPolicy::Strict
        } else {
            ParameterPolicy::Neutral
        },
        significance_threshold: threshold,
    };

    let result = if cfg.workers > 1 {
        compare_parallel(&observed, &expected, &options, cfg.workers, None)
    } else {
        compare_detailed(&observed, &expected, &options, None)
    };
    let comparison = result.unwrap_or_else(|e| super::fail(e));

    if !comparison.degraded_bins.is_empty() {
        eprintln!(
            "Warning: {} bin(s) had invalid parameters and were reported as 0: {:?}",
            comparison.degraded_bins.len(),
            comparison.degraded_bins
        );
    }

    let pulls = if cfg.include_pulls {
        let report = PullReport::new(&comparison.pulls(), PullBinning::default())
            .unwrap_or_else(|e| super::fail(e));
        Some(report)
    } else {
        None
    };

    let text = render(&comparison, pulls.as_ref(), format);
    super::emit(&text, cfg.output_path);
}

/// The threshold is a cut on p, so it must be a probability.
fn check_threshold(threshold: f64) -> Result<f64, String> {
    if (0.0..=1.0).contains(&threshold) {
        Ok(threshold)
    } else {
        Err(format!("--threshold must lie in [0, 1], got {threshold}"))
    }
}

/// Assemble the request from a JSON file or from the list flags.
fn build_request(cfg: &CompareCommandConfig<'_>) -> Result<ComparisonRequest, String> {
    if let Some(path) = cfg.input_path {
        let raw = std::fs::read_to_string(path).map_err(|e| format!("failed to read {path}: {e}"))?;
        return serde_json::from_str(&raw).map_err(|e| format!("invalid input file {path}: {e}"));
    }
    let list = |s: Option<&str>| s.map(super::parse_list).transpose();
    Ok(ComparisonRequest {
        observed: list(cfg.observed)?,
        expected: list(cfg.expected)?,
        variances: list(cfg.variances)?,
        errors: list(cfg.errors)?,
    })
}

fn render(comparison: &Comparison, pulls: Option<&PullReport>, format: OutputFormat) -> String {
    match format {
        OutputFormat::Plain => {
            let mut out: String = comparison
                .bins
                .iter()
                .map(|b| format!("{}\n", b.reported))
                .collect();
            if let Some(report) = pulls {
                out.push_str(&report.render_text("# "));
            }
            out
        }
        OutputFormat::Json => {
            let json = serde_json::json!({
                "significances": comparison.significances(),
                "bins": &comparison.bins,
                "degraded_bins": &comparison.degraded_bins,
                "pulls": pulls,
            });
            let mut out = super::to_json(&json);
            out.push('\n');
            out
        }
        OutputFormat::Table => {
            let mut out = format!(
                "{:>5} {:>10} {:>12} {:>10} {:>12} {:>9} {:>9}  {}\n",
                "bin", "observed", "expected", "variance", "p-value", "z", "reported", "model"
            );
            for b in &comparison.bins {
                let variance = b.variance.map_or_else(|| "-".to_string(), |v| format!("{v:.4}"));
                out.push_str(&format!(
                    "{:>5} {:>10} {:>12.4} {:>10} {:>12.4e} {:>9.4} {:>9.4}  {:?}\n",
                    b.index, b.observed, b.expected, variance, b.p_value, b.z_value, b.reported, b.model
                ));
            }
            if let Some(report) = pulls {
                out.push('\n');
                out.push_str(&report.render_text(""));
            }
            out
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use histsig_core::{CountSeries, ExpectationSeries};

    fn config<'a>() -> CompareCommandConfig<'a> {
        CompareCommandConfig {
            observed: None,
            expected: None,
            errors: None,
            variances: None,
            input_path: None,
            ignore_uncertainty: false,
            strict: false,
            threshold: 0.5,
            workers: 1,
            format: "plain",
            output_path: None,
            include_pulls: false,
        }
    }

    fn sample() -> Comparison {
        let observed = CountSeries::new(vec![100, 150]);
        let expected = ExpectationSeries::without_uncertainty(&[100.0, 100.0]);
        compare_detailed(&observed, &expected, &CompareOptions::default(), None).unwrap()
    }

    #[test]
    fn test_request_from_flags() {
        let cfg = CompareCommandConfig {
            observed: Some("1,2,3"),
            expected: Some("1 2 3"),
            errors: Some("0.5,0.5,0.5"),
            ..config()
        };
        let req = build_request(&cfg).unwrap();
        assert_eq!(req.observed, Some(vec![1.0, 2.0, 3.0]));
        assert_eq!(req.errors, Some(vec![0.5; 3]));
        assert!(req.variances.is_none());
    }

    #[test]
    fn test_request_bad_number() {
        let cfg = CompareCommandConfig {
            observed: Some("1,x"),
            expected: Some("1,2"),
            ..config()
        };
        assert!(build_request(&cfg).is_err());
    }

    #[test]
    fn test_threshold_must_be_probability() {
        assert_eq!(check_threshold(0.5), Ok(0.5));
        assert_eq!(check_threshold(0.0), Ok(0.0));
        assert_eq!(check_threshold(1.0), Ok(1.0));
        for bad in [f64::NAN, -0.1, 1.5, f64::INFINITY] {
            let err = check_threshold(bad).unwrap_err();
            assert!(err.contains("--threshold"), "{err}");
        }
    }

    #[test]
    fn test_render_plain() {
        let text = render(&sample(), None, OutputFormat::Plain);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "0");
        assert!(lines[1].parse::<f64>().unwrap() > 3.0);
    }

    #[test]
    fn test_render_json() {
        let text = render(&sample(), None, OutputFormat::Json);
        let v: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(v["significances"].as_array().unwrap().len(), 2);
        assert_eq!(v["bins"][1]["model"], "poisson");
        assert!(v["pulls"].is_null());
    }

    #[test]
    fn test_render_table_with_pulls() {
        let c = sample();
        let report = PullReport::new(&c.pulls(), PullBinning::default()).unwrap();
        let text = render(&c, Some(&report), OutputFormat::Table);
        assert!(text.starts_with("  bin"));
        assert!(text.contains("Poisson"));
        assert!(text.contains("underflow="));
    }
}
