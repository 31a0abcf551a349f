//! CLI for histsig: bin-by-bin significance of observed counts against an expectation.

mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "histsig")]
#[command(about = "histsig: how surprising is each bin of a histogram, in standard deviations")]
#[command(version = histsig_core::VERSION)]
struct Cli {
    /// Log at debug level (regime selection, per-call summaries)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare observed counts with expected counts, bin by bin.
    /// Prints one significance per bin (0 for bins with p >= threshold).
    Compare {
        /// Observed counts, comma- or whitespace-separated (fractions are truncated)
        #[arg(long, allow_hyphen_values = true)]
        observed: Option<String>,

        /// Expected counts, same number of bins as --observed
        #[arg(long, allow_hyphen_values = true)]
        expected: Option<String>,

        /// Standard deviations of the expected counts (squared into variances)
        #[arg(long, conflicts_with = "variances", allow_hyphen_values = true)]
        errors: Option<String>,

        /// Variances of the expected counts
        #[arg(long, allow_hyphen_values = true)]
        variances: Option<String>,

        /// Read {"observed", "expected", "variances"|"errors"} from a JSON file
        #[arg(long, conflicts_with_all = ["observed", "expected", "errors", "variances"])]
        input: Option<String>,

        /// Use the plain Poisson model even where uncertainties are given
        #[arg(long)]
        ignore_uncertainty: bool,

        /// Fail on the first bin with invalid parameters instead of reporting 0
        #[arg(long)]
        strict: bool,

        /// Report bins with p-value below this threshold, in [0, 1]
        #[arg(long, default_value = "0.5", allow_hyphen_values = true)]
        threshold: f64,

        /// Worker threads for the per-bin loop
        #[arg(long, default_value = "1")]
        workers: usize,

        /// Output format
        #[arg(long, default_value = "plain", value_parser = ["plain", "json", "table"])]
        format: String,

        /// Write the output to a file instead of stdout
        #[arg(long)]
        output: Option<String>,

        /// Append the pull histogram and the N(0,1) validation battery
        #[arg(long)]
        pulls: bool,
    },

    /// p-value and signed significance of a single bin
    Pvalue {
        /// Observed count
        #[arg(long)]
        observed: u64,

        /// Expected count
        #[arg(long, allow_hyphen_values = true)]
        expected: f64,

        /// Variance of the expected count
        #[arg(long, conflicts_with = "error", allow_hyphen_values = true)]
        variance: Option<f64>,

        /// Standard deviation of the expected count
        #[arg(long, allow_hyphen_values = true)]
        error: Option<f64>,

        /// Output format
        #[arg(long, default_value = "plain", value_parser = ["plain", "json", "table"])]
        format: String,
    },

    /// No-signal toy study: Poisson-fluctuated bins compared with their own expectation
    Toys {
        /// Number of bins
        #[arg(long, default_value = "1000")]
        bins: usize,

        /// Expected count of every bin
        #[arg(long, default_value = "10000")]
        expected: f64,

        /// Random seed
        #[arg(long, default_value = "4357")]
        seed: u64,

        /// Output format
        #[arg(long, default_value = "table", value_parser = ["plain", "json", "table"])]
        format: String,

        /// Write the output to a file instead of stdout
        #[arg(long)]
        output: Option<String>,
    },

    /// Histogram a list of pulls and test it against N(0,1)
    Pulls {
        /// Pull values, comma- or whitespace-separated
        #[arg(long, allow_hyphen_values = true)]
        values: Option<String>,

        /// Read pull values from a text file
        #[arg(long, conflicts_with = "values")]
        input: Option<String>,

        /// Number of histogram bins
        #[arg(long, default_value = "20")]
        bins: usize,

        /// Lower edge of the histogram
        #[arg(long, default_value = "-5", allow_hyphen_values = true)]
        low: f64,

        /// Upper edge of the histogram
        #[arg(long, default_value = "5", allow_hyphen_values = true)]
        high: f64,

        /// Output format
        #[arg(long, default_value = "table", value_parser = ["plain", "json", "table"])]
        format: String,
    },
}

fn init_logging(verbose: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Compare {
            observed,
            expected,
            errors,
            variances,
            input,
            ignore_uncertainty,
            strict,
            threshold,
            workers,
            format,
            output,
            pulls,
        } => commands::compare::run(commands::compare::CompareCommandConfig {
            observed: observed.as_deref(),
            expected: expected.as_deref(),
            errors: errors.as_deref(),
            variances: variances.as_deref(),
            input_path: input.as_deref(),
            ignore_uncertainty,
            strict,
            threshold,
            workers,
            format: &format,
            output_path: output.as_deref(),
            include_pulls: pulls,
        }),
        Commands::Pvalue {
            observed,
            expected,
            variance,
            error,
            format,
        } => commands::pvalue::run(commands::pvalue::PvalueCommandConfig {
            observed,
            expected,
            variance,
            error,
            format: &format,
        }),
        Commands::Toys {
            bins,
            expected,
            seed,
            format,
            output,
        } => commands::toys::run(commands::toys::ToysCommandConfig {
            bins,
            expected,
            seed,
            format: &format,
            output_path: output.as_deref(),
        }),
        Commands::Pulls {
            values,
            input,
            bins,
            low,
            high,
            format,
        } => commands::pulls::run(commands::pulls::PullsCommandConfig {
            values: values.as_deref(),
            input_path: input.as_deref(),
            bins,
            low,
            high,
            format: &format,
        }),
    }
}
