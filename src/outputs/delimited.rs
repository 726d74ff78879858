//! Delimited export of the corpus.
//!
//! Columns are `date,speaker,title,link,text,status`, plus `clean_text` when
//! cleaning is requested. Dates are ISO `YYYY-MM-DD`.

use crate::errors::HarvestError;
use crate::models::CorpusRow;
use crate::utils::clean_text;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

const COLUMNS: [&str; 6] = ["date", "speaker", "title", "link", "text", "status"];

/// Render rows as CSV bytes.
pub fn corpus_to_csv(rows: &[CorpusRow], clean: bool) -> Result<Vec<u8>, HarvestError> {
    let mut wtr = csv::Writer::from_writer(Vec::new());

    let mut header = COLUMNS.to_vec();
    if clean {
        header.push("clean_text");
    }
    wtr.write_record(&header)?;

    for row in rows {
        let mut record = vec![
            row.date.format("%Y-%m-%d").to_string(),
            row.speaker.clone(),
            row.title.clone(),
            row.link.clone(),
            row.text.clone(),
            row.status.to_string(),
        ];
        if clean {
            record.push(clean_text(&row.text));
        }
        wtr.write_record(&record)?;
    }

    wtr.into_inner()
        .map_err(|e| HarvestError::Io(e.into_error()))
}

/// Write rows as CSV to `path`.
#[instrument(level = "info", skip_all, fields(path = %path.display(), rows = rows.len(), clean = clean))]
pub async fn write_csv(rows: &[CorpusRow], path: &Path, clean: bool) -> Result<(), HarvestError> {
    let bytes = corpus_to_csv(rows, clean)?;
    fs::write(path, &bytes).await?;
    info!(bytes = bytes.len(), "Wrote CSV");
    Ok(())
}
