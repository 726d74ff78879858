//! Append-only checkpoint of fetched documents.
//!
//! One JSON object per line. Lines are flushed as they are written, so after
//! a crash the file holds every document completed before it. A torn last
//! line is ignored on load.

use crate::errors::HarvestError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{info, instrument, warn};

#[derive(Serialize)]
struct CheckpointLineRef<'a> {
    link: &'a str,
    text: &'a str,
}

#[derive(Deserialize)]
struct CheckpointLine {
    link: String,
    text: String,
}

/// Appends `{link, text}` lines to the checkpoint file of one run.
#[derive(Debug)]
pub struct CheckpointWriter {
    file: File,
    path: PathBuf,
}

impl CheckpointWriter {
    /// Open `path` for appending, creating it if needed.
    pub async fn open(path: &Path) -> Result<Self, HarvestError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    /// Truncate any previous checkpoint at `path` and open it for appending.
    pub async fn create(path: &Path) -> Result<Self, HarvestError> {
        File::create(path).await?;
        Self::open(path).await
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write one document and flush it to disk before returning.
    pub async fn append(&mut self, link: &str, text: &str) -> Result<(), HarvestError> {
        let mut line = serde_json::to_string(&CheckpointLineRef { link, text })?;
        line.push('\n');
        self.file.write_all(line.as_bytes()).await?;
        self.file.flush().await?;
        Ok(())
    }
}

/// Load a checkpoint into a `link -> text` map.
///
/// A missing file is an empty checkpoint.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn load_checkpoint(path: &Path) -> Result<HashMap<String, String>, HarvestError> {
    let contents = match fs::read_to_string(path).await {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HashMap::new()),
        Err(e) => return Err(e.into()),
    };

    let mut done = HashMap::new();
    for (lineno, line) in contents.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<CheckpointLine>(line) {
            Ok(entry) => {
                done.insert(entry.link, entry.text);
            }
            Err(e) => warn!(line = lineno + 1, error = %e, "Ignoring unreadable checkpoint line"),
        }
    }
    info!(documents = done.len(), "Loaded checkpoint");
    Ok(done)
}
