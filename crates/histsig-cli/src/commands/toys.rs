use histsig_core::{NoSignalStudy, ToyConfig, no_signal_study};

use super::{OutputFormat, PullReport};

pub struct ToysCommandConfig<'a> {
    pub bins: usize,
    pub expected: f64,
    pub seed: u64,
    pub format: &'a str,
    pub output_path: Option<&'a str>,
}

pub fn run(cfg: ToysCommandConfig<'_>) {
    let format = super::parse_format(cfg.format);
    if cfg.bins == 0 {
        super::fail("--bins must be at least 1");
    }
    if !cfg.expected.is_finite() || cfg.expected <= 0.0 {
        super::fail(format!("--expected must be positive, got {}", cfg.expected));
    }

    let config = ToyConfig {
        bins: cfg.bins,
        expected: cfg.expected,
        seed: cfg.seed,
        ..ToyConfig::default()
    };
    let study = no_signal_study(&config).unwrap_or_else(|e| super::fail(e));
    super::emit(&render(&study, format), cfg.output_path);
}

fn report(study: &NoSignalStudy) -> PullReport {
    PullReport {
        summary: study.summary,
        histogram: study.histogram.clone(),
        validation: study.validation.clone(),
    }
}

fn render(study: &NoSignalStudy, format: OutputFormat) -> String {
    let c = &study.config;
    match format {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "config": c,
                "pulls": report(study),
            });
            let mut out = super::to_json(&json);
            out.push('\n');
            out
        }
        OutputFormat::Plain => study
            .pulls
            .as_slice()
            .iter()
            .map(|z| format!("{z}\n"))
            .collect(),
        OutputFormat::Table => {
            let mut out = format!(
                "No-signal study: {} bins, expectation {}, seed {}\n\n",
                c.bins, c.expected, c.seed
            );
            out.push_str(&report(study).render_text(""));
            out
        }
    }
}
