//! HTTP access to the source site with throttling and exponential backoff.
//!
//! # Architecture
//!
//! - [`FetchPage`]: core trait, "give me the body of this URL"
//! - [`HttpFetcher`]: `reqwest`-backed implementation
//! - [`RetryFetch`]: decorator adding request pacing (a `governor` rate
//!   limiter) and retry logic to any [`FetchPage`] implementation
//!
//! Scrapers are generic over [`FetchPage`], so tests substitute canned pages
//! without a network.
//!
//! # Retry Strategy
//!
//! Only failures classified by [`HarvestError::is_retryable`] are retried.
//! The delay before retry `n` is
//! ```text
//! delay = min(base_delay * 2^(n-1), max_delay) + random_jitter(0..=jitter)
//! ```

use crate::errors::HarvestError;
use crate::utils::truncate_for_log;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use rand::{Rng, rng};
use std::fmt;
use std::time::Duration;
use tokio::time::{Instant, sleep};
use tracing::{debug, error, instrument, warn};

/// Something that can fetch a page body by absolute URL.
pub trait FetchPage {
    /// Fetch `url` and return its body.
    ///
    /// A non-success HTTP status must surface as
    /// [`HarvestError::Transport`] carrying the status code.
    async fn fetch(&self, url: &str) -> Result<String, HarvestError>;
}

/// Plain `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Build a client sending `user_agent` and giving up on a request after
    /// `timeout`.
    ///
    /// # Errors
    /// [`HarvestError::Transport`] if the TLS backend cannot be initialized.
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, HarvestError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

impl FetchPage for HttpFetcher {
    #[instrument(level = "debug", skip_all, fields(%url))]
    async fn fetch(&self, url: &str) -> Result<String, HarvestError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let preview = response.text().await.unwrap_or_default();
            return Err(HarvestError::Transport {
                url: url.to_string(),
                status: Some(status.as_u16()),
                message: format!("HTTP {status}: {}", truncate_for_log(preview.trim(), 200)),
            });
        }
        let body = response.text().await?;
        debug!(bytes = body.len(), "Fetched page");
        Ok(body)
    }
}

/// Wrapper that paces requests and retries retryable failures.
///
/// Every attempt, retries included, waits for a permit from one shared rate
/// limiter, so request starts are spaced by at least the configured interval
/// however many fetches are in flight.
pub struct RetryFetch<T> {
    /// The underlying fetcher.
    inner: T,
    /// `None` when the request interval is zero.
    limiter: Option<DefaultDirectRateLimiter>,
    request_interval: Duration,
    /// Retries after the first attempt.
    max_retries: usize,
    /// Initial delay between retries (doubles with each attempt).
    base_delay: Duration,
    max_delay: Duration,
    /// Upper bound of the random jitter added to each delay, in milliseconds.
    jitter_ms: u64,
}

impl<T> RetryFetch<T>
where
    T: FetchPage,
{
    /// Wrap `inner` with retries and no request pacing.
    ///
    /// # Arguments
    /// * `inner` - The fetcher doing the actual requests
    /// * `max_retries` - Retries after the first attempt
    /// * `base_delay` - Delay before the first retry
    pub fn new(inner: T, max_retries: usize, base_delay: Duration) -> Self {
        Self {
            inner,
            limiter: None,
            request_interval: Duration::ZERO,
            max_retries,
            base_delay,
            max_delay: Duration::from_secs(30),
            jitter_ms: 250,
        }
    }

    /// Cap on a single backoff delay, before jitter.
    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Space request starts at least `interval` apart. A zero interval
    /// disables pacing.
    pub fn with_request_interval(mut self, interval: Duration) -> Self {
        self.limiter = Quota::with_period(interval).map(RateLimiter::direct);
        self.request_interval = interval;
        self
    }

    /// Upper bound of the random jitter added to each backoff delay.
    pub fn with_jitter_ms(mut self, jitter_ms: u64) -> Self {
        self.jitter_ms = jitter_ms;
        self
    }

    fn backoff(&self, attempt: usize) -> Duration {
        let shift = (attempt.saturating_sub(1)).min(16) as u32;
        let delay = self
            .base_delay
            .saturating_mul(1u32 << shift)
            .min(self.max_delay);
        let jitter_ms: u64 = rng().random_range(0..=self.jitter_ms);
        delay + Duration::from_millis(jitter_ms)
    }
}

impl<T> fmt::Debug for RetryFetch<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryFetch")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .field("request_interval", &self.request_interval)
            .field("jitter_ms", &self.jitter_ms)
            .finish()
    }
}

impl<T> FetchPage for RetryFetch<T>
where
    T: FetchPage,
{
    #[instrument(level = "debug", skip_all, fields(%url))]
    async fn fetch(&self, url: &str) -> Result<String, HarvestError> {
        let started = Instant::now();
        let mut attempt = 0usize;

        loop {
            if let Some(limiter) = &self.limiter {
                limiter.until_ready().await;
            }
            match self.inner.fetch(url).await {
                Ok(body) => return Ok(body),
                Err(e) => {
                    attempt += 1;
                    let elapsed_ms = started.elapsed().as_millis() as u64;

                    if !e.is_retryable() {
                        debug!(error = %e, "Non-retryable fetch failure");
                        return Err(e);
                    }
                    if attempt > self.max_retries {
                        error!(
                            attempt,
                            max = self.max_retries,
                            elapsed_ms,
                            error = %e,
                            "fetch() exhausted retries"
                        );
                        return Err(e);
                    }

                    let delay = self.backoff(attempt);
                    warn!(
                        attempt,
                        max = self.max_retries,
                        elapsed_ms,
                        ?delay,
                        error = %e,
                        "fetch() attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{StubFetcher, StubResponse};

    const URL: &str = "https://www.example.com/page.htm";

    #[tokio::test]
    async fn test_retry_recovers_after_transient_failures() {
        let stub = StubFetcher::new().with_sequence(
            URL,
            vec![
                StubResponse::Status(503),
                StubResponse::Status(429),
                StubResponse::Body("<p>ok</p>".to_string()),
            ],
        );
        let fetcher = RetryFetch::new(stub, 3, Duration::from_millis(1)).with_jitter_ms(0);

        let body = fetcher.fetch(URL).await.unwrap();
        assert_eq!(body, "<p>ok</p>");
        assert_eq!(fetcher.inner.call_count(URL), 3);
    }

    #[tokio::test]
    async fn test_retry_gives_up_after_max_retries() {
        let stub = StubFetcher::new().with_page(URL, StubResponse::Status(500));
        let fetcher = RetryFetch::new(stub, 2, Duration::from_millis(1)).with_jitter_ms(0);

        let err = fetcher.fetch(URL).await.unwrap_err();
        assert!(matches!(
            err,
            HarvestError::Transport {
                status: Some(500),
                ..
            }
        ));
        assert_eq!(fetcher.inner.call_count(URL), 3);
    }

    #[tokio::test]
    async fn test_not_found_is_not_retried() {
        let stub = StubFetcher::new().with_page(URL, StubResponse::Status(404));
        let fetcher = RetryFetch::new(stub, 5, Duration::from_millis(1)).with_jitter_ms(0);

        assert!(fetcher.fetch(URL).await.is_err());
        assert_eq!(fetcher.inner.call_count(URL), 1);
    }

    #[test]
    fn test_backoff_is_capped() {
        let fetcher = RetryFetch::new(StubFetcher::new(), 10, Duration::from_secs(1))
            .with_max_delay(Duration::from_secs(5))
            .with_jitter_ms(0);
        assert_eq!(fetcher.backoff(1), Duration::from_secs(1));
        assert_eq!(fetcher.backoff(2), Duration::from_secs(2));
        assert_eq!(fetcher.backoff(3), Duration::from_secs(4));
        assert_eq!(fetcher.backoff(4), Duration::from_secs(5));
        assert_eq!(fetcher.backoff(40), Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_request_interval_spaces_requests() {
        let stub = StubFetcher::new().with_page(URL, StubResponse::Body("ok".to_string()));
        let fetcher = RetryFetch::new(stub, 0, Duration::from_millis(1))
            .with_request_interval(Duration::from_millis(25));

        let t0 = Instant::now();
        for _ in 0..3 {
            fetcher.fetch(URL).await.unwrap();
        }
        assert!(t0.elapsed() >= Duration::from_millis(45));
        assert_eq!(fetcher.inner.call_count(URL), 3);
    }

    #[tokio::test]
    async fn test_request_interval_applies_across_concurrent_fetches() {
        let stub = StubFetcher::new().with_page(URL, StubResponse::Body("ok".to_string()));
        let fetcher = RetryFetch::new(stub, 0, Duration::from_millis(1))
            .with_request_interval(Duration::from_millis(25));

        let t0 = Instant::now();
        let (a, b, c) = tokio::join!(fetcher.fetch(URL), fetcher.fetch(URL), fetcher.fetch(URL));
        assert!(a.is_ok() && b.is_ok() && c.is_ok());
        assert!(t0.elapsed() >= Duration::from_millis(45));
    }

    #[test]
    fn test_zero_interval_disables_pacing() {
        let fetcher = RetryFetch::new(StubFetcher::new(), 0, Duration::from_millis(1))
            .with_request_interval(Duration::ZERO);
        assert!(fetcher.limiter.is_none());
    }
}
