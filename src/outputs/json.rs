//! JSON snapshot and report files.
//!
//! Both files are written to a `.tmp` sibling and renamed into place, so a
//! reader never sees a half-written snapshot.

use crate::errors::HarvestError;
use crate::models::{Corpus, CorpusRow, HarvestReport};
use crate::outputs::{REPORT_FILE, SNAPSHOT_FILE};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{error, info, instrument};

async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), HarvestError> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, bytes).await?;
    if let Err(e) = fs::rename(&tmp, path).await {
        error!(path = %path.display(), error = %e, "Failed to move file into place");
        return Err(e.into());
    }
    Ok(())
}

async fn write_json<T: Serialize + ?Sized>(value: &T, path: &Path) -> Result<(), HarvestError> {
    let json = serde_json::to_vec_pretty(value)?;
    write_atomic(path, &json).await?;
    info!(path = %path.display(), bytes = json.len(), "Wrote JSON file");
    Ok(())
}

/// Write the corpus snapshot to `{output_dir}/speeches.json`.
#[instrument(level = "info", skip_all, fields(output_dir = %output_dir.display(), rows = corpus.len()))]
pub async fn write_corpus(corpus: &[CorpusRow], output_dir: &Path) -> Result<PathBuf, HarvestError> {
    let path = output_dir.join(SNAPSHOT_FILE);
    write_json(corpus, &path).await?;
    Ok(path)
}

/// Write the run report to `{output_dir}/report.json`.
#[instrument(level = "info", skip_all, fields(output_dir = %output_dir.display()))]
pub async fn write_report(report: &HarvestReport, output_dir: &Path) -> Result<PathBuf, HarvestError> {
    let path = output_dir.join(REPORT_FILE);
    write_json(report, &path).await?;
    Ok(path)
}

/// Read a snapshot written by [`write_corpus`].
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn read_corpus(path: &Path) -> Result<Corpus, HarvestError> {
    let bytes = fs::read(path).await?;
    let corpus: Corpus = serde_json::from_slice(&bytes)?;
    info!(rows = corpus.len(), "Read corpus snapshot");
    Ok(corpus)
}
