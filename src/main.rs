use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

mod config;
mod error;
mod format;
mod html;
mod obstacle;
mod pipeline;
mod processor;
mod raw;
mod reconcile;
mod reshape;
mod session;
mod source;
#[cfg(test)]
mod testing;
mod types;
mod workbook;

use config::{RunConfig, Timing, DEFAULT_INPUT, DEFAULT_LIMIT, PORTAL_URL};

#[derive(Parser)]
#[command(name = "ruc-events")]
#[command(about = "Fetch DU-E event histories from Siscomex for each RUC in a spreadsheet")]
struct Cli {
    /// Only log warnings and errors (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Query the portal for every RUC and write the merged, styled sheet
    Run(RunArgs),
    /// Rebuild the output sheet from a raw CSV dump, without the portal
    Merge {
        /// Spreadsheet whose first column holds the RUCs
        #[arg(short, long, default_value = DEFAULT_INPUT)]
        input: PathBuf,
        /// Raw dump written by `run --raw-csv`
        #[arg(short, long)]
        raw_csv: PathBuf,
        /// Output spreadsheet (defaults to overwriting the input)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Alternate-row tint bound
        #[arg(short, long, default_value_t = DEFAULT_LIMIT)]
        limit: usize,
    },
    /// Apply the header/row/border theme to an existing spreadsheet
    Format {
        #[arg(value_name = "XLSX")]
        path: PathBuf,
        /// Write here instead of overwriting the file
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Alternate-row tint bound
        #[arg(short, long, default_value_t = DEFAULT_LIMIT)]
        limit: usize,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Spreadsheet whose first column holds the RUCs
    #[arg(short, long, default_value = DEFAULT_INPUT)]
    input: PathBuf,
    /// Output spreadsheet (defaults to overwriting the input)
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Number of rows to query
    #[arg(short, long, default_value_t = DEFAULT_LIMIT)]
    limit: usize,
    /// Run Chrome without a window (CAPTCHAs cannot be solved this way)
    #[arg(long)]
    headless: bool,
    #[arg(long, default_value = PORTAL_URL)]
    portal_url: String,
    /// Also dump the long-form events as CSV (timestamped name if no path)
    #[arg(long, value_name = "CSV")]
    raw_csv: Option<Option<PathBuf>>,
    /// Seconds to wait for the results table
    #[arg(long, value_name = "SECS")]
    results_timeout: Option<u64>,
    /// Seconds to wait for the DU-E detail table
    #[arg(long, value_name = "SECS")]
    detail_timeout: Option<u64>,
    /// Seconds to wait for the portal to load
    #[arg(long, value_name = "SECS")]
    navigation_timeout: Option<u64>,
}

impl RunArgs {
    fn into_config(self) -> RunConfig {
        let mut timing = Timing::default();
        if let Some(secs) = self.results_timeout {
            timing.results_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = self.detail_timeout {
            timing.detail_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = self.navigation_timeout {
            timing.navigation_timeout = Duration::from_secs(secs);
        }

        let mut config = RunConfig::new(self.input);
        if let Some(output) = self.output {
            config.output = output;
        }
        config.portal_url = self.portal_url;
        config.limit = self.limit;
        config.headless = self.headless;
        config.timing = timing;
        config.raw_csv = self
            .raw_csv
            .map(|path| path.unwrap_or_else(config::default_raw_csv_path));
        config
    }
}

fn init_logging(quiet: bool) {
    let default_level = if quiet { "warn" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.quiet);

    match cli.command {
        Commands::Run(args) => pipeline::run(&args.into_config()),
        Commands::Merge {
            input,
            raw_csv,
            output,
            limit,
        } => {
            let output = output.unwrap_or_else(|| input.clone());
            pipeline::run_merge(&input, &raw_csv, &output, limit)
        }
        Commands::Format {
            path,
            output,
            limit,
        } => {
            let output = output.unwrap_or_else(|| path.clone());
            pipeline::run_format(&path, &output, limit)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_args_defaults() {
        let cli = Cli::parse_from(["ruc-events", "run"]);
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        let config = args.into_config();
        assert_eq!(config.input, PathBuf::from(DEFAULT_INPUT));
        assert_eq!(config.output, config.input);
        assert_eq!(config.limit, DEFAULT_LIMIT);
        assert_eq!(config.portal_url, PORTAL_URL);
        assert!(config.raw_csv.is_none());
    }

    #[test]
    fn test_run_args_overrides() {
        let cli = Cli::parse_from([
            "ruc-events",
            "run",
            "--input",
            "ruc.xlsx",
            "--output",
            "out.xlsx",
            "--limit",
            "5",
            "--results-timeout",
            "9",
            "--raw-csv",
            "dump.csv",
        ]);
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        let config = args.into_config();
        assert_eq!(config.output, PathBuf::from("out.xlsx"));
        assert_eq!(config.limit, 5);
        assert_eq!(config.timing.results_timeout, Duration::from_secs(9));
        assert_eq!(config.timing.detail_timeout, config::DETAIL_TIMEOUT);
        assert_eq!(config.raw_csv, Some(PathBuf::from("dump.csv")));
    }

    #[test]
    fn test_raw_csv_without_value() {
        let cli = Cli::parse_from(["ruc-events", "run", "--raw-csv"]);
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        let path = args.into_config().raw_csv.unwrap();
        assert!(path.to_string_lossy().starts_with("raw-extraction-"));
    }
}
