//! Data models for listing rows, corpus rows and the run report.
//!
//! - [`TokenGroup`]: raw tokens scraped for one field of one listing row
//! - [`ListingEntry`]: a resolved listing row (date, speaker, title, link)
//! - [`CorpusRow`]: a listing entry plus the document text and fetch status
//! - [`HarvestReport`]: counts and the structured failure log of one run

use crate::errors::{FailureKind, HarvestError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// All tokens a listing row produced for a single field.
///
/// Listing pages occasionally render two `<time>` or `<em>` elements inside
/// one row. The rule applied everywhere is **first token wins**: see
/// [`TokenGroup::resolve`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenGroup(pub Vec<String>);

impl TokenGroup {
    /// Resolve the group to a single value using the first-token-wins rule.
    ///
    /// Returns `None` for an empty group. Extra tokens are dropped and logged
    /// at debug level so the loss is visible when tracing is turned up.
    pub fn resolve(&self) -> Option<&str> {
        if self.0.len() > 1 {
            debug!(
                kept = %self.0[0],
                dropped = self.0.len() - 1,
                "Multiple tokens in group; first token wins"
            );
        }
        self.0.first().map(String::as_str)
    }

    pub fn tokens(&self) -> &[String] {
        &self.0
    }
}

impl From<Vec<String>> for TokenGroup {
    fn from(tokens: Vec<String>) -> Self {
        TokenGroup(tokens)
    }
}

/// One speech as announced on a yearly listing page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingEntry {
    pub date: NaiveDate,
    pub speaker: String,
    pub title: String,
    /// Host-relative path of the document page.
    pub link: String,
}

/// Where a row is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextStatus {
    /// Not fetched yet (or the run was interrupted before reaching it).
    #[default]
    Pending,
    Fetched,
    /// Fetch failed; `text` is empty and a failure record explains why.
    Failed,
}

impl std::fmt::Display for TextStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TextStatus::Pending => "pending",
            TextStatus::Fetched => "fetched",
            TextStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// A row of the corpus table.
///
/// Rows are values: filling in the text builds a new row with
/// [`CorpusRow::with_text`] or [`CorpusRow::failed`] instead of mutating a
/// row that an iterator may still be looking at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusRow {
    pub date: NaiveDate,
    pub speaker: String,
    pub title: String,
    pub link: String,
    pub text: String,
    #[serde(default)]
    pub status: TextStatus,
}

impl CorpusRow {
    /// A row with no text yet.
    pub fn pending(entry: ListingEntry) -> Self {
        CorpusRow {
            date: entry.date,
            speaker: entry.speaker,
            title: entry.title,
            link: entry.link,
            text: String::new(),
            status: TextStatus::Pending,
        }
    }

    pub fn with_text(&self, text: String) -> Self {
        CorpusRow {
            text,
            status: TextStatus::Fetched,
            ..self.clone()
        }
    }

    pub fn failed(&self) -> Self {
        CorpusRow {
            text: String::new(),
            status: TextStatus::Failed,
            ..self.clone()
        }
    }
}

/// Ordered corpus: listing-page order, then in-page row order.
pub type Corpus = Vec<CorpusRow>;

/// Pipeline stage a failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    ListingPage,
    ListingRow,
    Document,
    /// A fetched document could not be appended to the checkpoint.
    Checkpoint,
}

/// One line of the structured failure log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub stage: FailureStage,
    /// Listing path or document link that failed.
    pub target: String,
    pub kind: FailureKind,
    pub message: String,
}

impl FailureRecord {
    pub fn from_error(stage: FailureStage, target: &str, error: &HarvestError) -> Self {
        FailureRecord {
            stage,
            target: target.to_string(),
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

/// Summary of one harvest, written next to the snapshot as `report.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarvestReport {
    pub interrupted: bool,
    pub pages_total: usize,
    pub pages_ok: usize,
    pub pages_failed: usize,
    pub rows_non_speech: usize,
    pub rows_malformed: usize,
    pub documents_total: usize,
    pub documents_fetched: usize,
    pub documents_resumed: usize,
    pub documents_failed: usize,
    pub documents_pending: usize,
    /// Fetched documents missing from the checkpoint after a failed append.
    pub checkpoint_failures: usize,
    pub failures: Vec<FailureRecord>,
}

impl HarvestReport {
    /// Recount the document figures from the final corpus.
    pub fn tally_documents(&mut self, corpus: &[CorpusRow]) {
        self.documents_total = corpus.len();
        self.documents_fetched = corpus
            .iter()
            .filter(|r| r.status == TextStatus::Fetched)
            .count();
        self.documents_failed = corpus
            .iter()
            .filter(|r| r.status == TextStatus::Failed)
            .count();
        self.documents_pending = corpus
            .iter()
            .filter(|r| r.status == TextStatus::Pending)
            .count();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> ListingEntry {
        ListingEntry {
            date: NaiveDate::from_ymd_opt(2020, 3, 1).unwrap(),
            speaker: "Jane Doe".to_string(),
            title: "On Policy".to_string(),
            link: "/newsevents/speech/2020/doe20200301a.htm".to_string(),
        }
    }

    #[test]
    fn test_first_token_wins() {
        let group = TokenGroup(vec!["3/1/2020".to_string(), "3/2/2020".to_string()]);
        assert_eq!(group.resolve(), Some("3/1/2020"));
        assert_eq!(TokenGroup::default().resolve(), None);
    }

    #[test]
    fn test_with_text_builds_new_row() {
        let row = CorpusRow::pending(entry());
        let filled = row.with_text("Good morning.".to_string());
        assert_eq!(row.status, TextStatus::Pending);
        assert!(row.text.is_empty());
        assert_eq!(filled.status, TextStatus::Fetched);
        assert_eq!(filled.text, "Good morning.");
        assert_eq!(filled.link, row.link);
    }

    #[test]
    fn test_failed_row_is_tombstoned() {
        let row = CorpusRow::pending(entry()).with_text("x".to_string());
        let failed = row.failed();
        assert_eq!(failed.status, TextStatus::Failed);
        assert!(failed.text.is_empty());
    }

    #[test]
    fn test_corpus_row_serialization() {
        let row = CorpusRow::pending(entry());
        let json = serde_json::to_string(&row).unwrap();
        assert!(json.contains("\"date\":\"2020-03-01\""));
        assert!(json.contains("\"status\":\"pending\""));

        let back: CorpusRow = serde_json::from_str(&json).unwrap();
        assert_eq!(back, row);
    }

    #[test]
    fn test_tally_documents() {
        let base = CorpusRow::pending(entry());
        let corpus = vec![
            base.with_text("a".to_string()),
            base.failed(),
            base.clone(),
            base.with_text("b".to_string()),
        ];
        let mut report = HarvestReport::default();
        report.tally_documents(&corpus);
        assert_eq!(report.documents_total, 4);
        assert_eq!(report.documents_fetched, 2);
        assert_eq!(report.documents_failed, 1);
        assert_eq!(report.documents_pending, 1);
    }
}
