//! In-memory [`FetchPage`] used by unit tests.

use crate::errors::HarvestError;
use crate::http::FetchPage;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// What a stubbed URL answers with.
#[derive(Debug, Clone)]
pub enum StubResponse {
    Body(String),
    Status(u16),
    /// Body returned after sleeping, to shuffle completion order.
    Delayed(Duration, String),
}

/// Canned responses keyed by absolute URL.
///
/// A URL configured with a sequence answers with each response in turn and
/// then keeps repeating the last one. Unknown URLs answer `404`. The stub
/// also tracks how many fetches were in flight at once.
#[derive(Debug, Default)]
pub struct StubFetcher {
    pages: Mutex<HashMap<String, VecDeque<StubResponse>>>,
    calls: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl StubFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(self, url: &str, response: StubResponse) -> Self {
        self.with_sequence(url, vec![response])
    }

    pub fn with_sequence(self, url: &str, responses: Vec<StubResponse>) -> Self {
        self.pages
            .lock()
            .unwrap()
            .insert(url.to_string(), responses.into());
        self
    }

    pub fn call_count(&self, url: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|u| *u == url).count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Highest number of fetches that were running at the same time.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn next_response(&self, url: &str) -> StubResponse {
        let mut pages = self.pages.lock().unwrap();
        match pages.get_mut(url) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some(queue) => queue.front().cloned().unwrap_or(StubResponse::Status(404)),
            None => StubResponse::Status(404),
        }
    }
}

impl FetchPage for StubFetcher {
    async fn fetch(&self, url: &str) -> Result<String, HarvestError> {
        self.calls.lock().unwrap().push(url.to_string());
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(running, Ordering::SeqCst);

        let response = self.next_response(url);
        if let StubResponse::Delayed(delay, _) = &response {
            tokio::time::sleep(*delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match response {
            StubResponse::Body(body) | StubResponse::Delayed(_, body) => Ok(body),
            StubResponse::Status(code) => Err(HarvestError::Transport {
                url: url.to_string(),
                status: Some(code),
                message: format!("HTTP {code}"),
            }),
        }
    }
}

/// Minimal yearly listing page in the source site's markup.
///
/// Each row is `(date, speaker, title, link)`.
pub fn listing_html(rows: &[(&str, &str, &str, &str)]) -> String {
    let mut html = String::from(
        "<html><body><div class=\"row eventlist\"><div class=\"col-xs-12\">",
    );
    for (date, speaker, title, link) in rows {
        html.push_str(&format!(
            "<div class=\"row\">\
               <div class=\"col-xs-3 eventlist__time\"><time>{date}</time></div>\
               <div class=\"col-xs-9 eventlist__event\">\
                 <p><a href=\"{link}\"><em>{title}</em></a></p>\
                 <p class=\"news__speaker\">{speaker}</p>\
               </div>\
             </div>"
        ));
    }
    html.push_str("</div></div></body></html>");
    html
}

/// Minimal document page with the given paragraphs inside the content column.
pub fn document_html(paragraphs: &[&str]) -> String {
    let mut html = String::from(
        "<html><body><div class=\"col-xs-12 col-sm-8 col-md-8\">",
    );
    for p in paragraphs {
        html.push_str(&format!("<p>{p}</p>"));
    }
    html.push_str("</div><div class=\"col-xs-12 col-sm-4\"><p>Sidebar</p></div></body></html>");
    html
}
