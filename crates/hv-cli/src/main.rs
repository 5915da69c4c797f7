//! HistVaR CLI - historical Value-at-Risk and Expected Shortfall for a
//! portfolio of stocks.
//!
//! # Usage
//!
//! ```bash
//! # Equally weighted or custom weights, read from the tickers file
//! histvar --tickers tickers.csv --alpha 0.95 --lookback 365
//!
//! # Offline run against local CSV prices, with a JSON report
//! histvar --tickers tickers.csv --source csv --data-dir ./prices --format json
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use hv_data::{PriceSource, PriceSourceConfig, ENV_DATA_DIR, ENV_SOURCE, ENV_TIMEOUT_SECS};
use hv_risk::{bins_for_lookback, Portfolio, RiskMeasures, RiskReport};
use hv_types::{ConfidenceLevel, HvError, HvResult, LookbackWindow};

mod cli;
mod input;
mod output;

use cli::{Cli, OutputFormat};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::debug!("run failed: {:?}", err);
            eprintln!("Error: {:#}", err);
            ExitCode::from(exit_code(&err))
        }
    }
}

fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        _ => EnvFilter::new("debug"),
    };

    // stdout carries the report
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let confidence_level = ConfidenceLevel::new(cli.alpha)?;
    let lookback_window = LookbackWindow::new(cli.lookback)?;

    let file = input::read_tickers_file(&cli.tickers)
        .with_context(|| format!("Failed to read tickers file {}", cli.tickers.display()))?;
    if file.weights.is_none() {
        let notice = "No portfolio weights detected, proceeding with equally-weighted portfolio...";
        match cli.format {
            OutputFormat::Text => println!("{}", notice),
            OutputFormat::Json => eprintln!("{}", notice),
        }
    }

    let source = source_config(&cli, |key| std::env::var(key).ok())?.build()?;

    let mut portfolio = Portfolio::new(file.tickers, lookback_window, file.weights)?;
    portfolio.set_as_of(cli.as_of);

    let (start, end) = portfolio.date_range()?;
    tracing::info!(
        "Computing risk for {} tickers from {} to {} using {} source",
        portfolio.tickers().len(),
        start,
        end,
        source.name()
    );

    let measures = RiskMeasures::from_portfolio(&mut portfolio, source.as_ref(), confidence_level).await?;
    let report = RiskReport::build(&portfolio, &measures)?;
    tracing::info!("{} return observations", report.observations);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    output::write_report(&mut out, &report, cli.format)?;
    if cli.histogram {
        let histogram = measures.histogram(bins_for_lookback(lookback_window))?;
        output::write_histogram(&mut out, &histogram)?;
    }
    out.flush()?;

    Ok(())
}

/// Environment settings overridden by flags. Variables shadowed by a flag
/// are never read, so a malformed one cannot fail the run.
fn source_config<F>(cli: &Cli, lookup: F) -> HvResult<PriceSourceConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = PriceSourceConfig::from_lookup(|key| match key {
        ENV_SOURCE if cli.source.is_some() => None,
        ENV_DATA_DIR if cli.data_dir.is_some() => None,
        ENV_TIMEOUT_SECS if cli.timeout.is_some() => None,
        _ => lookup(key),
    })?;

    if let Some(source) = cli.source {
        config.kind = source.into();
    }
    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }
    if let Some(secs) = cli.timeout {
        config.timeout_secs = secs;
    }
    Ok(config)
}

/// Process exit status for a failed run.
fn exit_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<HvError>() {
        Some(e) if e.is_validation() => 2,
        Some(e) if e.is_data_unavailable() => 3,
        Some(e) if e.is_insufficient_data() => 4,
        _ => 1,
    }
}
