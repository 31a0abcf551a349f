use histsig_core::{PullBinning, PullSample};

use super::{OutputFormat, PullReport};

pub struct PullsCommandConfig<'a> {
    pub values: Option<&'a str>,
    pub input_path: Option<&'a str>,
    pub bins: usize,
    pub low: f64,
    pub high: f64,
    pub format: &'a str,
}

pub fn run(cfg: PullsCommandConfig<'_>) {
    let format = super::parse_format(cfg.format);
    let raw = match (cfg.values, cfg.input_path) {
        (Some(values), _) => values.to_string(),
        (None, Some(path)) => std::fs::read_to_string(path)
            .unwrap_or_else(|e| super::fail(format!("failed to read {path}: {e}"))),
        (None, None) => super::fail("either --values or --input is required"),
    };
    let pulls = super::parse_list(&raw).unwrap_or_else(|e| super::fail(e));
    let binning = PullBinning::new(cfg.bins, cfg.low, cfg.high).unwrap_or_else(|e| super::fail(e));
    let report = PullReport::new(&PullSample::from(pulls), binning).unwrap_or_else(|e| super::fail(e));

    let text = match format {
        OutputFormat::Json => {
            let mut out = super::to_json(&report);
            out.push('\n');
            out
        }
        OutputFormat::Plain | OutputFormat::Table => report.render_text(""),
    };
    super::emit(&text, None);
}
