//! Corpus table construction from yearly listing pages.
//!
//! Pages are fetched with bounded concurrency but reassembled by index, so the
//! table is always in listing-path order, then in-page row order. A page that
//! fails contributes no rows and one [`FailureRecord`]; it never stops the
//! other pages.

use crate::config::MalformedPolicy;
use crate::errors::{HarvestError, MalformedEntry};
use crate::http::FetchPage;
use crate::models::{CorpusRow, FailureRecord, FailureStage, HarvestReport, ListingEntry, TokenGroup};
use crate::scrapers::listing::{ListingPage, find_speeches_by_year};
use chrono::NaiveDate;
use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// Links starting with this prefix are working papers, not speeches.
pub const NON_SPEECH_PREFIX: &str = "/pubs/feds";

/// Date layouts seen on listing pages across the years.
const DATE_FORMATS: &[&str] = &["%m/%d/%Y", "%B %d, %Y", "%b %d, %Y", "%Y-%m-%d"];

/// How [`create_speech_table`] fetches and validates listing pages.
#[derive(Debug, Clone)]
pub struct ListingOptions {
    /// Listing pages fetched at once.
    pub concurrency: usize,
    /// Log list lengths for every page.
    pub diagnostics: bool,
    /// Skip or abort on rows whose date cannot be parsed.
    pub malformed: MalformedPolicy,
}

/// Output of [`create_speech_table`]: pending rows plus the listing half of
/// the run report.
#[derive(Debug, Default)]
pub struct SpeechTable {
    pub rows: Vec<CorpusRow>,
    pub report: HarvestReport,
}

/// Rows built from already-scraped pages.
#[derive(Debug, Default)]
pub struct RowBuild {
    pub rows: Vec<CorpusRow>,
    pub malformed: Vec<MalformedEntry>,
    /// Rows dropped because their link points at a non-speech document.
    pub non_speech: usize,
}

/// Whether `link` points at a working paper rather than a speech.
pub fn is_non_speech(link: &str) -> bool {
    link.starts_with(NON_SPEECH_PREFIX)
}

/// Parse a listing date token.
pub fn parse_date(token: &str) -> Option<NaiveDate> {
    let token = token.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(token, fmt).ok())
}

fn resolve_entry(
    page: &str,
    row: usize,
    dates: &TokenGroup,
    speakers: &TokenGroup,
    titles: &TokenGroup,
    link: &str,
) -> Result<ListingEntry, MalformedEntry> {
    let malformed = |reason: String| MalformedEntry {
        page: page.to_string(),
        row,
        dates: dates.tokens().to_vec(),
        speakers: speakers.tokens().to_vec(),
        titles: titles.tokens().to_vec(),
        link: link.to_string(),
        reason,
    };

    let token = dates
        .resolve()
        .ok_or_else(|| malformed("missing date".to_string()))?;
    let date = parse_date(token).ok_or_else(|| malformed(format!("unparseable date {token:?}")))?;

    Ok(ListingEntry {
        date,
        speaker: speakers.resolve().unwrap_or_default().to_string(),
        title: titles.resolve().unwrap_or_default().to_string(),
        link: link.to_string(),
    })
}

/// Turn scraped pages into pending corpus rows.
///
/// Each field keeps its first token, the date is parsed, and rows linking
/// to non-speech documents are dropped before any date parsing happens.
pub fn build_rows(pages: &[ListingPage]) -> RowBuild {
    let mut build = RowBuild::default();

    for page in pages {
        for (row, (dates, speakers, titles, link)) in page.rows().enumerate() {
            if is_non_speech(link) {
                debug!(%link, "Dropping non-speech document");
                build.non_speech += 1;
                continue;
            }
            match resolve_entry(&page.path, row, dates, speakers, titles, link) {
                Ok(entry) => build.rows.push(CorpusRow::pending(entry)),
                Err(bad) => {
                    warn!(page = %bad.page, row = bad.row, link = %bad.link, reason = %bad.reason, "Malformed listing row");
                    build.malformed.push(bad);
                }
            }
        }
    }

    build
}

/// Scrape every listing path and build the pending corpus table.
///
/// # Arguments
/// * `fetcher` - Source of listing pages
/// * `host` - Host the listing paths live on
/// * `paths` - Listing paths, oldest year first
/// * `options` - Concurrency, diagnostics and malformed-row policy
/// * `cancel` - Stops the fetch loop; unattempted pages contribute nothing
///
/// # Returns
/// Pending rows in path order, then in-page order, plus the listing half of
/// the report.
///
/// # Errors
///
/// Only under [`MalformedPolicy::Abort`], with the first malformed row.
/// Page failures are recorded in the report instead.
#[instrument(level = "info", skip_all, fields(%host, pages = paths.len()))]
pub async fn create_speech_table<F: FetchPage>(
    fetcher: &F,
    host: &str,
    paths: &[String],
    options: &ListingOptions,
    cancel: &CancellationToken,
) -> Result<SpeechTable, HarvestError> {
    let mut report = HarvestReport {
        pages_total: paths.len(),
        ..Default::default()
    };
    let mut slots: Vec<Option<Result<ListingPage, HarvestError>>> =
        (0..paths.len()).map(|_| None).collect();

    let mut results = stream::iter(paths.iter().enumerate())
        .map(|(i, path)| async move {
            (i, find_speeches_by_year(fetcher, host, path, options.diagnostics).await)
        })
        .buffer_unordered(options.concurrency.max(1));

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!("Harvest interrupted while indexing listing pages");
                report.interrupted = true;
                break;
            }
            next = results.next() => match next {
                Some((i, outcome)) => slots[i] = Some(outcome),
                None => break,
            }
        }
    }
    drop(results);

    let mut pages = Vec::new();
    for (path, slot) in paths.iter().zip(slots) {
        match slot {
            Some(Ok(page)) => {
                report.pages_ok += 1;
                pages.push(page);
            }
            Some(Err(e)) => {
                report.pages_failed += 1;
                if matches!(e, HarvestError::Parse { .. }) {
                    error!(%path, error = %e, "Listing page markup not recognized");
                } else {
                    warn!(%path, error = %e, "Listing page skipped");
                }
                report
                    .failures
                    .push(FailureRecord::from_error(FailureStage::ListingPage, path, &e));
            }
            None => debug!(%path, "Listing page not attempted"),
        }
    }

    let build = build_rows(&pages);
    if options.malformed == MalformedPolicy::Abort {
        if let Some(first) = build.malformed.into_iter().next() {
            error!(page = %first.page, row = first.row, "Aborting on malformed listing row");
            return Err(HarvestError::MalformedEntry(Box::new(first)));
        }
    } else {
        for bad in build.malformed {
            let target = format!("{}#{}", bad.page, bad.row);
            report.failures.push(FailureRecord::from_error(
                FailureStage::ListingRow,
                &target,
                &HarvestError::MalformedEntry(Box::new(bad)),
            ));
            report.rows_malformed += 1;
        }
    }
    report.rows_non_speech = build.non_speech;

    info!(
        pages_ok = report.pages_ok,
        pages_failed = report.pages_failed,
        rows = build.rows.len(),
        non_speech = report.rows_non_speech,
        malformed = report.rows_malformed,
        "Built speech table"
    );

    Ok(SpeechTable {
        rows: build.rows,
        report,
    })
}
