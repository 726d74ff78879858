//! # FOMC Speeches
//!
//! Harvests the Federal Reserve's speech archive into a tabular corpus
//! (date, speaker, title, link, full text) for sentiment scoring and
//! correlation against bond-market indicators.
//!
//! ## Usage
//!
//! ```sh
//! fomc_speeches harvest -o ./corpus --start-year 2012 --end-year 2024
//! fomc_speeches export -i ./corpus/speeches.json -o speeches.csv --clean
//! ```
//!
//! ## Architecture
//!
//! The harvest is a pipeline:
//! 1. **Paths**: name one listing page per year ([`scrapers::urls`])
//! 2. **Indexing**: scrape each listing page into rows ([`corpus`])
//! 3. **Fetching**: download each speech's text ([`materialize`])
//! 4. **Output**: snapshot, CSV, report and checkpoint ([`outputs`])
//!
//! Listing pages and documents are fetched concurrently (bounded, throttled,
//! retried with backoff). Ctrl-C stops the harvest and saves what is done.

use clap::Parser;
use std::error::Error;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod config;
mod corpus;
mod errors;
mod harvest;
mod http;
mod materialize;
mod models;
mod outputs;
mod scrapers;
#[cfg(test)]
mod testing;
mod utils;

use cli::{Cli, Command, ExportArgs, HarvestArgs};
use config::HarvestConfig;
use http::{HttpFetcher, RetryFetch};
use outputs::{delimited, json};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = Instant::now();
    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    let result = match args.command {
        Command::Harvest(args) => harvest_command(args).await,
        Command::Export(args) => export_command(args).await,
    };
    if let Err(ref e) = result {
        error!(error = %e, "Command failed");
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );
    result
}

async fn harvest_command(args: HarvestArgs) -> Result<(), Box<dyn Error>> {
    let mut config = match &args.config {
        Some(path) => HarvestConfig::load(path).await?,
        None => HarvestConfig::default(),
    };
    args.apply(&mut config);
    config.validate()?;
    debug!(?config, "Effective configuration");

    let fetcher = RetryFetch::new(
        HttpFetcher::new(&config.user_agent, config.timeout())?,
        config.max_retries,
        config.base_delay(),
    )
    .with_max_delay(config.max_delay())
    .with_jitter_ms(config.jitter_ms)
    .with_request_interval(config.request_interval());

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Received interrupt; finishing up and saving partial corpus");
            on_signal.cancel();
        }
    });

    let report = harvest::run_harvest(&fetcher, &config, &args.output_dir, args.resume, &cancel).await?;
    if !report.failures.is_empty() {
        warn!(
            failures = report.failures.len(),
            "Harvest finished with gaps; see report.json"
        );
    }
    Ok(())
}

async fn export_command(args: ExportArgs) -> Result<(), Box<dyn Error>> {
    let corpus = json::read_corpus(&args.input).await?;
    delimited::write_csv(&corpus, &args.output, args.clean).await?;
    info!(rows = corpus.len(), path = %args.output.display(), "Exported corpus");
    Ok(())
}
