//! Yearly listing-page scraper.
//!
//! A listing page holds a single `div.row.eventlist` container. Inside it,
//! every `div.row` announces one speech:
//!
//! ```text
//! <div class="row eventlist">
//!   <div class="row">
//!     <time>3/1/2020</time>
//!     <a href="/newsevents/speech/2020/doe20200301a.htm"><em>On Policy</em></a>
//!     <p class="news__speaker">Jane Doe</p>
//!   </div>
//!   ...
//! ```
//!
//! Dates, speakers and titles are collected per row as [`TokenGroup`]s. Links
//! come from a separate pass over the container that skips `watchLive`
//! (video-only) anchors.

use crate::errors::HarvestError;
use crate::http::FetchPage;
use crate::models::TokenGroup;
use itertools::izip;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, instrument, warn};

static EVENT_LIST: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.row.eventlist").expect("static selector"));
static ROW: Lazy<Selector> = Lazy::new(|| Selector::parse("div.row").expect("static selector"));
static TIME: Lazy<Selector> = Lazy::new(|| Selector::parse("time").expect("static selector"));
static SPEAKER: Lazy<Selector> =
    Lazy::new(|| Selector::parse("p.news__speaker").expect("static selector"));
static TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse("em").expect("static selector"));
static LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").expect("static selector"));

/// Class marking a "watch live" video anchor.
pub const VIDEO_LINK_CLASS: &str = "watchLive";

/// Everything scraped from one listing page, as parallel lists.
///
/// `dates[i]`, `speakers[i]`, `titles[i]` and `links[i]` describe the same
/// speech.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingPage {
    /// Listing path the page was fetched from.
    pub path: String,
    pub dates: Vec<TokenGroup>,
    pub speakers: Vec<TokenGroup>,
    pub titles: Vec<TokenGroup>,
    pub links: Vec<String>,
}

impl ListingPage {
    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Iterate rows as `(dates, speakers, titles, link)`.
    pub fn rows(&self) -> impl Iterator<Item = (&TokenGroup, &TokenGroup, &TokenGroup, &String)> {
        izip!(&self.dates, &self.speakers, &self.titles, &self.links)
    }
}

fn texts(row: ElementRef<'_>, selector: &Selector) -> TokenGroup {
    row.select(selector)
        .map(|el| el.text().collect::<String>().trim().to_string())
        .collect::<Vec<_>>()
        .into()
}

fn is_video_link(anchor: ElementRef<'_>) -> bool {
    anchor.value().classes().any(|c| c == VIDEO_LINK_CLASS)
}

fn speech_links(scope: ElementRef<'_>) -> impl Iterator<Item = ElementRef<'_>> {
    scope.select(&LINK).filter(|anchor| !is_video_link(*anchor))
}

/// Zero-based rows that do not hold exactly one non-video anchor.
fn rows_with_stray_links(event_list: ElementRef<'_>) -> Vec<usize> {
    event_list
        .select(&ROW)
        .enumerate()
        .filter(|(_, row)| speech_links(*row).count() != 1)
        .map(|(i, _)| i)
        .collect()
}

/// Parse the HTML of one listing page.
///
/// # Errors
///
/// [`HarvestError::Parse`] when the `eventlist` container is missing, or when
/// the link pass and the row pass disagree on the number of speeches.
pub fn parse_listing(path: &str, html: &str, diagnostics: bool) -> Result<ListingPage, HarvestError> {
    let document = Html::parse_document(html);
    let event_list = document
        .select(&EVENT_LIST)
        .next()
        .ok_or_else(|| HarvestError::parse(path, "listing container div.row.eventlist not found"))?;

    let mut page = ListingPage {
        path: path.to_string(),
        ..Default::default()
    };

    for row in event_list.select(&ROW) {
        page.dates.push(texts(row, &TIME));
        page.speakers.push(texts(row, &SPEAKER));
        page.titles.push(texts(row, &TITLE));
    }

    for anchor in event_list.select(&LINK) {
        if is_video_link(anchor) {
            debug!(path, "Skipping video link");
            continue;
        }
        if let Some(href) = anchor.value().attr("href") {
            page.links.push(href.to_string());
        }
    }

    if diagnostics {
        info!(
            path,
            dates = page.dates.len(),
            speakers = page.speakers.len(),
            titles = page.titles.len(),
            links = page.links.len(),
            "Listing page list lengths"
        );
    }

    if page.links.len() != page.dates.len() {
        let stray = rows_with_stray_links(event_list);
        warn!(
            path,
            rows = page.dates.len(),
            links = page.links.len(),
            ?stray,
            "Listing rows without exactly one speech link"
        );
        return Err(HarvestError::parse(
            path,
            format!(
                "{} rows but {} links; cannot align listing fields (stray anchors in rows {:?})",
                page.dates.len(),
                page.links.len(),
                stray
            ),
        ));
    }

    Ok(page)
}

/// Fetch and parse the listing page at `https://{host}{path}`.
///
/// Transport failures are returned to the caller, which records them and
/// carries on with the remaining pages.
#[instrument(level = "info", skip_all, fields(%path))]
pub async fn find_speeches_by_year<F: FetchPage>(
    fetcher: &F,
    host: &str,
    path: &str,
    diagnostics: bool,
) -> Result<ListingPage, HarvestError> {
    let url = format!("https://{host}{path}");
    let body = fetcher.fetch(&url).await.inspect_err(|e| {
        warn!(%url, error = %e, "Listing page fetch failed");
    })?;

    let page = parse_listing(path, &body, diagnostics)?;
    if page.is_empty() {
        warn!("Listing page has no rows");
    } else {
        info!(count = page.len(), "Indexed listing page");
    }
    Ok(page)
}
