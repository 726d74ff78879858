//! Error taxonomy for the harvester.
//!
//! Failures fall into three recoverable families and a handful of fatal ones:
//!
//! | Variant | Scope | Policy |
//! |---------|-------|--------|
//! | [`HarvestError::Transport`] | one page or document | retried with backoff, then recorded as a gap |
//! | [`HarvestError::Parse`] | one page or document | recorded, logged at `error` (markup drift) |
//! | [`HarvestError::MalformedEntry`] | one listing row | skipped and recorded unless `--strict` |
//! | everything else | whole run | returned to `main` |

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Raw fields of a listing row that could not be turned into a corpus row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MalformedEntry {
    /// Listing page the row came from.
    pub page: String,
    /// Zero-based row position within that page.
    pub row: usize,
    pub dates: Vec<String>,
    pub speakers: Vec<String>,
    pub titles: Vec<String>,
    pub link: String,
    /// Why the row was rejected.
    pub reason: String,
}

/// Every failure the harvester can report.
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("transport error for {url}: {message}")]
    Transport {
        url: String,
        /// HTTP status when the server answered, `None` for network failures.
        status: Option<u16>,
        message: String,
    },

    #[error("parse error in {target}: {detail}")]
    Parse { target: String, detail: String },

    #[error("malformed entry on {} row {}: {}", .0.page, .0.row, .0.reason)]
    MalformedEntry(Box<MalformedEntry>),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

/// Coarse classification written to the failure log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Transport,
    Parse,
    MalformedEntry,
    Other,
}

impl HarvestError {
    /// Shorthand for [`HarvestError::Parse`].
    pub fn parse(target: impl Into<String>, detail: impl Into<String>) -> Self {
        HarvestError::Parse {
            target: target.into(),
            detail: detail.into(),
        }
    }

    /// Classification used in [`crate::models::FailureRecord`].
    pub fn kind(&self) -> FailureKind {
        match self {
            HarvestError::Transport { .. } => FailureKind::Transport,
            HarvestError::Parse { .. } => FailureKind::Parse,
            HarvestError::MalformedEntry(_) => FailureKind::MalformedEntry,
            _ => FailureKind::Other,
        }
    }

    /// Whether another attempt could plausibly succeed.
    ///
    /// Network failures, `429 Too Many Requests` and `5xx` answers are
    /// retryable. Any other status (a `404` for a missing year, say) is not.
    pub fn is_retryable(&self) -> bool {
        match self {
            HarvestError::Transport { status: None, .. } => true,
            HarvestError::Transport {
                status: Some(code), ..
            } => *code == 429 || (500..600).contains(code),
            _ => false,
        }
    }
}

impl From<reqwest::Error> for HarvestError {
    fn from(e: reqwest::Error) -> Self {
        HarvestError::Transport {
            url: e.url().map(|u| u.to_string()).unwrap_or_default(),
            status: e.status().map(|s| s.as_u16()),
            message: e.to_string(),
        }
    }
}
