//! Text helpers and file-system checks.
//!
//! - [`clean_text`]: normalization applied to speech text before scoring
//! - [`truncate_for_log`]: keep long values out of log lines
//! - [`ensure_writable_dir`]: fail fast on an unusable output directory

use crate::errors::HarvestError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs as stdfs;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

static URLS_AND_EMAILS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"http\S+|www\S+|@\S+").expect("static regex"));
static HTML_TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"<.*?>").expect("static regex"));
static NON_LETTERS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-zA-Z\s]").expect("static regex"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("static regex"));

/// Normalize speech text for the sentiment classifier.
///
/// Lowercases, then strips URLs and email-like tokens, HTML tags, and every
/// character that is neither an ASCII letter nor whitespace, and finally
/// collapses whitespace runs to one space.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(clean_text("See www.fed.gov, <b>NOW</b>!"), "see now");
/// ```
pub fn clean_text(text: &str) -> String {
    let text = text.to_lowercase();
    let text = URLS_AND_EMAILS.replace_all(&text, "");
    let text = HTML_TAGS.replace_all(&text, "");
    let text = NON_LETTERS.replace_all(&text, "");
    WHITESPACE.replace_all(&text, " ").trim().to_string()
}

/// Truncate a string for logging purposes.
///
/// Strings longer than `max` bytes are cut at the nearest character boundary
/// at or below `max`, with `"…(+N bytes)"` appended.
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if needed, then creates and removes a probe file.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn ensure_writable_dir(path: &Path) -> Result<(), HarvestError> {
    fs::create_dir_all(path).await?;
    // sync probe: simpler error surface
    let probe_path = path.join("..__probe_write__");
    stdfs::File::create(&probe_path)?;
    let _ = stdfs::remove_file(&probe_path);
    info!("Output directory is writable");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_text() {
        assert_eq!(
            clean_text("See https://www.federalreserve.gov/x.htm or email me@fed.gov."),
            "see or email me"
        );
        assert_eq!(clean_text("<p>Inflation</p>  is 2.5%\n\tin 2024"), "inflation is in");
        assert_eq!(clean_text("   "), "");
    }

    #[test]
    fn test_truncate_for_log_short_string() {
        assert_eq!(truncate_for_log("Hello, world!", 100), "Hello, world!");
    }

    #[test]
    fn test_truncate_for_log_long_string() {
        let s = "a".repeat(500);
        let result = truncate_for_log(&s, 100);
        assert!(result.starts_with(&"a".repeat(100)));
        assert!(result.contains("…(+400 bytes)"));
    }

    #[test]
    fn test_truncate_for_log_respects_char_boundary() {
        let s = "é".repeat(10);
        let result = truncate_for_log(&s, 5);
        assert!(result.starts_with("éé…"));
        assert!(result.contains("(+16 bytes)"));
    }

    #[tokio::test]
    async fn test_ensure_writable_dir_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("out/corpus");
        ensure_writable_dir(&nested).await.unwrap();
        assert!(nested.is_dir());
        assert!(!nested.join("..__probe_write__").exists());
    }
}
