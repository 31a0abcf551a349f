use histsig_core::{
    BinSignificance, CompareOptions, CountSeries, ExpectationSeries, Result, compare_detailed,
};

use super::OutputFormat;

pub struct PvalueCommandConfig<'a> {
    pub observed: u64,
    pub expected: f64,
    pub variance: Option<f64>,
    pub error: Option<f64>,
    pub format: &'a str,
}

pub fn run(cfg: PvalueCommandConfig<'_>) {
    let format = super::parse_format(cfg.format);
    let bin = evaluate(&cfg).unwrap_or_else(|e| super::fail(e));
    super::emit(&render(&bin, format), None);
}

/// One-bin strict comparison: invalid parameters are an error here, not a 0.
fn evaluate(cfg: &PvalueCommandConfig<'_>) -> Result<BinSignificance> {
    let observed = CountSeries::new(vec![cfg.observed]);
    let means = [cfg.expected];
    let expected = match (cfg.variance, cfg.error) {
        (Some(v), _) => ExpectationSeries::from_variances(&means, &[v])?,
        (None, Some(e)) => ExpectationSeries::from_errors(&means, &[e])?,
        (None, None) => ExpectationSeries::without_uncertainty(&means),
    };
    let mut comparison = compare_detailed(&observed, &expected, &CompareOptions::strict(), None)?;
    // One bin in, one bin out.
    Ok(comparison.bins.swap_remove(0))
}

fn render(bin: &BinSignificance, format: OutputFormat) -> String {
    match format {
        OutputFormat::Plain => format!("{} {}\n", bin.p_value, bin.z_value),
        OutputFormat::Json => {
            let mut out = super::to_json(bin);
            out.push('\n');
            out
        }
        OutputFormat::Table => {
            let variance = bin.variance.map_or_else(|| "-".to_string(), |v| v.to_string());
            format!(
                "observed:     {}\nexpected:     {}\nvariance:     {variance}\nmodel:        {:?}\ntail:         {}\np-value:      {:.6e}\nsignificance: {:.4}\n",
                bin.observed,
                bin.expected,
                bin.model,
                if bin.excess { "excess" } else { "deficit" },
                bin.p_value,
                bin.z_value
            )
        }
    }
}
