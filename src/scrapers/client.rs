//! HTTP retrieval of feed documents with exponential backoff retry logic.
//!
//! The module uses a trait-based design:
//! - [`FeedClient`]: core trait, fetch one document by URL
//! - [`HttpFeedClient`]: `reqwest` implementation with timeout and user agent
//! - [`RetryFetch`]: decorator that adds retries to any [`FeedClient`]
//!
//! The delay between retries follows:
//! ```text
//! delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
//! ```

use crate::config::FetchSettings;
use crate::errors::FetchError;
use rand::{Rng, rng};
use std::fmt;
use std::time::{Duration as StdDuration, Instant};
use tokio::time::sleep;
use tracing::{debug, error, instrument, warn};

/// Retrieve the raw body of a feed.
pub trait FeedClient {
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

#[derive(Debug, Clone)]
pub struct HttpFeedClient {
    client: reqwest::Client,
}

impl HttpFeedClient {
    pub fn new(settings: &FetchSettings) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(StdDuration::from_secs(settings.timeout_secs))
            .user_agent(settings.user_agent.clone())
            .build()?;
        Ok(Self { client })
    }
}

impl FeedClient for HttpFeedClient {
    #[instrument(level = "debug", skip(self))]
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let t0 = Instant::now();
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        let body = response.text().await?;
        debug!(
            bytes = body.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Fetched feed"
        );
        Ok(body)
    }
}

/// Wraps a [`FeedClient`] and retries failed fetches with backoff and jitter.
pub struct RetryFetch<T> {
    inner: T,
    /// Retries after the first attempt.
    max_retries: usize,
    /// Doubles with each attempt.
    base_delay: StdDuration,
    max_delay: StdDuration,
}

impl<T> RetryFetch<T>
where
    T: FeedClient,
{
    pub fn new(inner: T, max_retries: usize, base_delay: StdDuration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: StdDuration::from_secs(30),
        }
    }

    pub fn from_settings(inner: T, settings: &FetchSettings) -> Self {
        Self::new(
            inner,
            settings.max_retries,
            StdDuration::from_millis(settings.base_delay_ms),
        )
    }

    fn backoff(&self, attempt: usize) -> StdDuration {
        let shift = u32::try_from(attempt.saturating_sub(1)).unwrap_or(u32::MAX).min(16);
        let delay = self.base_delay.saturating_mul(1 << shift).min(self.max_delay);
        let jitter_ms: u64 = rng().random_range(0..=250);
        delay + StdDuration::from_millis(jitter_ms)
    }
}

impl<T> fmt::Debug for RetryFetch<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryFetch")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T> FeedClient for RetryFetch<T>
where
    T: FeedClient,
{
    #[instrument(level = "info", skip(self))]
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            match self.inner.fetch(url).await {
                Ok(body) => return Ok(body),
                Err(e) => {
                    attempt += 1;
                    let total_dt = total_t0.elapsed();

                    if attempt > self.max_retries {
                        error!(
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_total = total_dt.as_millis() as u64,
                            error = %e,
                            "fetch() exhausted retries"
                        );
                        return Err(e);
                    }

                    let delay = self.backoff(attempt);
                    warn!(
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_total = total_dt.as_millis() as u64,
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
pub(crate) mod tests {
    use super::*;
    use std::cell::Cell;
    use std::collections::HashMap;

    /// Serves canned bodies; fails the first `failures` calls.
    #[derive(Debug, Default)]
    pub(crate) struct MockClient {
        pub bodies: HashMap<String, String>,
        pub failures: Cell<usize>,
        pub calls: Cell<usize>,
    }

    impl MockClient {
        pub(crate) fn with_feed(mut self, url: &str, body: &str) -> Self {
            self.bodies.insert(url.to_string(), body.to_string());
            self
        }
    }

    impl FeedClient for MockClient {
        async fn fetch(&self, url: &str) -> Result<String, FetchError> {
            self.calls.set(self.calls.get() + 1);
            if self.failures.get() > 0 {
                self.failures.set(self.failures.get() - 1);
                return Err(FetchError::Status(503));
            }
            self.bodies.get(url).cloned().ok_or(FetchError::Status(404))
        }
    }

    #[tokio::test]
    async fn test_retry_recovers_after_transient_failures() {
        let mock = MockClient::default().with_feed("https://feeds.example.com/a", "<rss/>");
        mock.failures.set(2);
        let client = RetryFetch::new(mock, 3, StdDuration::from_millis(1));
        let body = client.fetch("https://feeds.example.com/a").await.unwrap();
        assert_eq!(body, "<rss/>");
        assert_eq!(client.inner.calls.get(), 3);
    }

    #[tokio::test]
    async fn test_retry_gives_up() {
        let mock = MockClient::default();
        mock.failures.set(10);
        let client = RetryFetch::new(mock, 2, StdDuration::from_millis(1));
        let err = client.fetch("https://feeds.example.com/a").await.unwrap_err();
        assert!(matches!(err, FetchError::Status(503)));
        assert_eq!(client.inner.calls.get(), 3);
    }

    #[test]
    fn test_backoff_is_capped() {
        let client = RetryFetch::new(MockClient::default(), 3, StdDuration::from_secs(1));
        let first = client.backoff(1);
        assert!(first >= StdDuration::from_secs(1) && first <= StdDuration::from_millis(1250));
        let late = client.backoff(40);
        assert!(late <= StdDuration::from_millis(30_250));
    }
}
