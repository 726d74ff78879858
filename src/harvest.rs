//! End-to-end harvest: listing pages → corpus table → document texts → files.
//!
//! Partial results are always persisted. A run that loses listing pages or
//! documents still writes a consistent snapshot plus a report saying what is
//! missing, and an interrupted run writes whatever it has, in order.

use crate::config::HarvestConfig;
use crate::corpus::{ListingOptions, create_speech_table};
use crate::errors::HarvestError;
use crate::http::FetchPage;
use crate::materialize::{Materialized, retrieve_docs};
use crate::models::HarvestReport;
use crate::outputs::checkpoint::{CheckpointWriter, load_checkpoint};
use crate::outputs::{CHECKPOINT_FILE, CSV_FILE, delimited, json};
use crate::utils::ensure_writable_dir;
use std::collections::HashMap;
use std::path::Path;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

/// Run a full harvest and persist the results under `output_dir`.
///
/// With `resume`, documents already in the checkpoint are reused and new ones
/// are appended to it; otherwise the checkpoint starts empty.
///
/// # Errors
///
/// Only run-level failures: an unusable output directory, a malformed row
/// under the `abort` policy, or a failed write of the final files.
#[instrument(level = "info", skip_all, fields(host = %config.host, output_dir = %output_dir.display(), resume = resume))]
pub async fn run_harvest<F: FetchPage>(
    fetcher: &F,
    config: &HarvestConfig,
    output_dir: &Path,
    resume: bool,
    cancel: &CancellationToken,
) -> Result<HarvestReport, HarvestError> {
    ensure_writable_dir(output_dir).await?;

    let checkpoint_path = output_dir.join(CHECKPOINT_FILE);
    let (done, mut checkpoint) = if resume {
        (
            load_checkpoint(&checkpoint_path).await?,
            CheckpointWriter::open(&checkpoint_path).await?,
        )
    } else {
        (HashMap::new(), CheckpointWriter::create(&checkpoint_path).await?)
    };

    let paths = config.listing_paths();
    info!(
        start_year = config.start_year,
        end_year = config.end_year,
        pages = paths.len(),
        checkpoint = %checkpoint.path().display(),
        "Starting harvest"
    );
    let options = ListingOptions {
        concurrency: config.concurrency,
        diagnostics: config.diagnostics,
        malformed: config.malformed,
    };
    let table = create_speech_table(fetcher, &config.host, &paths, &options, cancel).await?;
    let mut report = table.report;

    let materialized = if report.interrupted {
        Materialized {
            corpus: table.rows,
            interrupted: true,
            ..Default::default()
        }
    } else {
        retrieve_docs(
            fetcher,
            &config.host,
            table.rows,
            config.concurrency,
            &done,
            Some(&mut checkpoint),
            cancel,
        )
        .await
    };

    report.interrupted |= materialized.interrupted;
    report.documents_resumed = materialized.resumed;
    report.checkpoint_failures = materialized.checkpoint_failures;
    report.failures.extend(materialized.failures);
    report.tally_documents(&materialized.corpus);

    let corpus = materialized.corpus;
    json::write_corpus(&corpus, output_dir).await?;
    delimited::write_csv(&corpus, &output_dir.join(CSV_FILE), false).await?;
    json::write_report(&report, output_dir).await?;

    if report.interrupted {
        warn!(
            fetched = report.documents_fetched,
            pending = report.documents_pending,
            "Harvest interrupted; partial corpus saved"
        );
    }
    info!(
        pages_ok = report.pages_ok,
        pages_failed = report.pages_failed,
        documents_fetched = report.documents_fetched,
        documents_resumed = report.documents_resumed,
        documents_failed = report.documents_failed,
        documents_pending = report.documents_pending,
        checkpoint_failures = report.checkpoint_failures,
        "Harvest complete"
    );

    Ok(report)
}
