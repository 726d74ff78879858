//! Document text population for the corpus table.
//!
//! Every pending row's document is fetched with bounded concurrency. Results
//! are keyed by row index and merged into a fresh vector, so the corpus keeps
//! the table's order no matter which fetch finishes first.
//!
//! # Failure policy
//!
//! A row whose fetch fails is kept as a tombstone (`status = failed`, empty
//! text) and a [`FailureRecord`] is added. Rows left unfetched by an
//! interrupt stay `pending`. A document that cannot be appended to the
//! checkpoint keeps its text in the corpus but gets a
//! [`FailureStage::Checkpoint`] record, since a crash would lose it.

use crate::errors::HarvestError;
use crate::http::FetchPage;
use crate::models::{Corpus, CorpusRow, FailureRecord, FailureStage};
use crate::outputs::checkpoint::CheckpointWriter;
use crate::scrapers::document::get_one_doc;
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

/// Result of [`retrieve_docs`].
#[derive(Debug, Default)]
pub struct Materialized {
    /// Every input row, in input order.
    pub corpus: Corpus,
    pub failures: Vec<FailureRecord>,
    /// Rows filled from a previous run's checkpoint.
    pub resumed: usize,
    /// Fetched documents whose checkpoint append failed.
    pub checkpoint_failures: usize,
    /// The cancellation token fired before every row was attempted.
    pub interrupted: bool,
}

/// Fetch the text of every row and return the populated corpus.
///
/// Rows whose link appears in `resume` are filled from it without a request.
/// Each newly fetched document is appended to `checkpoint` as soon as it
/// arrives.
///
/// # Arguments
/// * `fetcher` - Source of document pages
/// * `host` - Host the row links are resolved against
/// * `rows` - Pending rows in corpus order
/// * `concurrency` - Maximum documents fetched at once
/// * `resume` - `link -> text` from a previous run's checkpoint
/// * `checkpoint` - Where newly fetched documents are appended
/// * `cancel` - Stops the fetch loop; unattempted rows stay `pending`
///
/// # Returns
/// All input rows in input order, plus failure records and counts.
#[instrument(level = "info", skip_all, fields(%host, rows = rows.len(), concurrency = concurrency))]
pub async fn retrieve_docs<F: FetchPage>(
    fetcher: &F,
    host: &str,
    rows: Vec<CorpusRow>,
    concurrency: usize,
    resume: &HashMap<String, String>,
    mut checkpoint: Option<&mut CheckpointWriter>,
    cancel: &CancellationToken,
) -> Materialized {
    let total = rows.len();
    let mut out = Materialized::default();
    let mut slots: Vec<Option<CorpusRow>> = vec![None; total];
    let mut to_fetch = Vec::with_capacity(total);

    for (i, row) in rows.iter().enumerate() {
        match resume.get(&row.link) {
            Some(text) => {
                slots[i] = Some(row.with_text(text.clone()));
                out.resumed += 1;
            }
            None => to_fetch.push(i),
        }
    }
    if out.resumed > 0 {
        info!(resumed = out.resumed, "Filled rows from checkpoint");
    }

    let rows_ref = &rows;
    let mut results = stream::iter(to_fetch)
        .map(|i| async move { (i, get_one_doc(fetcher, host, &rows_ref[i].link).await) })
        .buffer_unordered(concurrency.max(1));

    let mut done = out.resumed;
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!(done, total, "Harvest interrupted while fetching documents");
                out.interrupted = true;
                break;
            }
            next = results.next() => {
                let Some((i, outcome)) = next else { break };
                let row = &rows[i];
                done += 1;
                match outcome {
                    Ok(text) => {
                        info!(index = i, done, total, link = %row.link, "Scraped document text");
                        if let Some(cp) = checkpoint.as_mut() {
                            if let Err(e) = cp.append(&row.link, &text).await {
                                warn!(link = %row.link, error = %e, "Failed to append checkpoint");
                                out.checkpoint_failures += 1;
                                out.failures
                                    .push(FailureRecord::from_error(FailureStage::Checkpoint, &row.link, &e));
                            }
                        }
                        slots[i] = Some(row.with_text(text));
                    }
                    Err(e) => {
                        if matches!(e, HarvestError::Parse { .. }) {
                            error!(index = i, link = %row.link, error = %e, "Document markup not recognized");
                        } else {
                            warn!(index = i, link = %row.link, error = %e, "Document fetch failed");
                        }
                        out.failures
                            .push(FailureRecord::from_error(FailureStage::Document, &row.link, &e));
                        slots[i] = Some(row.failed());
                    }
                }
            }
        }
    }
    drop(results);

    out.corpus = rows
        .into_iter()
        .zip(slots)
        .map(|(row, slot)| slot.unwrap_or(row))
        .collect();
    out
}
