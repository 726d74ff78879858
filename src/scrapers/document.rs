//! Speech document scraper.
//!
//! The body of a speech lives in the page's main content column,
//! `div.col-xs-12.col-sm-8.col-md-8`. The document text is the text of every
//! `<p>` inside that column, in document order, joined with no separator.

use crate::errors::HarvestError;
use crate::http::FetchPage;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use tracing::{debug, info, instrument};
use url::Url;

static CONTENT: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("div.col-xs-12.col-sm-8.col-md-8").expect("static selector")
});
static PARAGRAPH: Lazy<Selector> = Lazy::new(|| Selector::parse("p").expect("static selector"));

/// Resolve a host-relative document link to an absolute `https` URL.
pub fn document_url(host: &str, link: &str) -> Result<Url, HarvestError> {
    let base = Url::parse(&format!("https://{host}"))
        .map_err(|e| HarvestError::Config(format!("invalid host {host:?}: {e}")))?;
    base.join(link)
        .map_err(|e| HarvestError::parse(link, format!("cannot resolve link: {e}")))
}

/// Extract the flat speech text from a document page.
///
/// Only text nodes are collected, so the result never contains markup.
///
/// # Errors
///
/// [`HarvestError::Parse`] when the content column is missing. A column with
/// no paragraphs is a legitimate empty document and returns `""`.
pub fn extract_text(target: &str, html: &str) -> Result<String, HarvestError> {
    let document = Html::parse_document(html);
    let article = document
        .select(&CONTENT)
        .next()
        .ok_or_else(|| HarvestError::parse(target, "content container not found"))?;

    let text: String = article
        .select(&PARAGRAPH)
        .flat_map(|p| p.text())
        .collect();

    Ok(text)
}

/// Fetch one speech and return its concatenated paragraph text.
#[instrument(level = "info", skip_all, fields(%link))]
pub async fn get_one_doc<F: FetchPage>(
    fetcher: &F,
    host: &str,
    link: &str,
) -> Result<String, HarvestError> {
    let url = document_url(host, link)?;
    let body = fetcher.fetch(url.as_str()).await?;
    let text = extract_text(link, &body)?;
    if text.is_empty() {
        info!(%url, "Document container has no paragraphs");
    } else {
        debug!(%url, bytes = text.len(), "Parsed document");
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{StubFetcher, StubResponse, document_html};

    const HOST: &str = "www.example.com";
    const LINK: &str = "/newsevents/speech/2020/doe20200301a.htm";

    #[test]
    fn test_document_url() {
        assert_eq!(
            document_url(HOST, LINK).unwrap().as_str(),
            "https://www.example.com/newsevents/speech/2020/doe20200301a.htm"
        );
    }

    #[test]
    fn test_paragraphs_concatenated_without_separator() {
        let html = document_html(&["Thank you.", " It is a pleasure.", "Inflation <b>remains</b> elevated."]);
        let text = extract_text(LINK, &html).unwrap();
        assert_eq!(text, "Thank you. It is a pleasure.Inflation remains elevated.");
        assert!(!text.contains("Sidebar"));
        assert!(!text.contains('<'));
    }

    #[test]
    fn test_text_outside_paragraphs_is_ignored() {
        let html = r#"<div class="col-xs-12 col-sm-8 col-md-8">
            <h3>Title</h3><p>Body.</p><ul><li>Footnote</li></ul></div>"#;
        assert_eq!(extract_text(LINK, html).unwrap(), "Body.");
    }

    #[test]
    fn test_empty_container_is_empty_text() {
        let html = r#"<div class="col-xs-12 col-sm-8 col-md-8"><h3>Video only</h3></div>"#;
        assert_eq!(extract_text(LINK, html).unwrap(), "");
    }

    #[test]
    fn test_missing_container_is_parse_error() {
        let html = r#"<div class="col-md-12"><p>Moved</p></div>"#;
        assert!(matches!(
            extract_text(LINK, html),
            Err(HarvestError::Parse { .. })
        ));
    }

    #[tokio::test]
    async fn test_refetch_is_byte_identical() {
        let url = format!("https://{HOST}{LINK}");
        let stub = StubFetcher::new().with_page(
            &url,
            StubResponse::Body(document_html(&["Good afternoon.", "Rates ¶ remain steady."])),
        );

        let first = get_one_doc(&stub, HOST, LINK).await.unwrap();
        let second = get_one_doc(&stub, HOST, LINK).await.unwrap();
        assert_eq!(first.as_bytes(), second.as_bytes());
        assert_eq!(stub.call_count(&url), 2);
    }
}
