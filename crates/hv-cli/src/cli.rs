//! CLI argument definitions.

use chrono::NaiveDate;
use clap::{ArgAction, Parser, ValueEnum};
use hv_data::SourceKind;
use std::path::PathBuf;

/// Historical Value-at-Risk and Expected Shortfall for a portfolio of stocks
#[derive(Parser, Debug)]
#[command(name = "histvar")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "Example:\n  histvar --tickers tickers.csv --alpha 0.95 --lookback 365")]
pub struct Cli {
    /// CSV file with tickers in the first column and optional weights in the second
    #[arg(long)]
    pub tickers: PathBuf,

    /// VaR confidence level
    #[arg(long, default_value_t = 0.95)]
    pub alpha: f64,

    /// Lookback window (in days) for the historical simulation
    #[arg(long, default_value_t = 365)]
    pub lookback: u32,

    /// Price source (defaults to HISTVAR_SOURCE, then yahoo)
    #[arg(long, value_enum)]
    pub source: Option<SourceArg>,

    /// Directory of <TICKER>.csv files for the csv source
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Network timeout in seconds for the yahoo source
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,

    /// Last day of the lookback window (YYYY-MM-DD), defaults to today
    #[arg(long)]
    pub as_of: Option<NaiveDate>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Append a histogram of the return distribution
    #[arg(long)]
    pub histogram: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

/// Price sources selectable from the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SourceArg {
    /// Yahoo Finance chart API
    Yahoo,
    /// Local CSV files
    Csv,
    /// Deterministic synthetic prices
    Sample,
}

impl From<SourceArg> for SourceKind {
    fn from(arg: SourceArg) -> Self {
        match arg {
            SourceArg::Yahoo => SourceKind::Yahoo,
            SourceArg::Csv => SourceKind::Csv,
            SourceArg::Sample => SourceKind::Sample,
        }
    }
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable summary
    #[default]
    Text,
    /// JSON report
    Json,
}
