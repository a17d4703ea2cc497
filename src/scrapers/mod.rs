//! Feed retrieval: download every configured feed and parse its items.
//!
//! Retrieval happens in two steps per feed:
//!
//! 1. **Fetching**: download the document through a [`FeedClient`], retrying
//!    transient failures with backoff ([`client::RetryFetch`])
//! 2. **Parsing**: read RSS `<item>` or Atom `<entry>` elements ([`rss`])
//!
//! Feeds are fetched concurrently with `futures::stream`, at most
//! `max_concurrent_fetches` at a time, and results keep the configured feed
//! order. A failing feed is recorded in [`FetchOutcome::feed_errors`] and
//! never stops the others.

pub mod client;
pub mod rss;

use crate::config::{FeedSource, FetchSettings};
use crate::errors::FetchError;
use crate::models::{FeedFailure, RawArticle};
use crate::pipeline::FetchOutcome;
use chrono::{DateTime, Utc};
use client::{FeedClient, HttpFeedClient, RetryFetch};
use futures::stream::{self, StreamExt};
use tracing::{error, info, instrument};

/// Fetch all `sources` over HTTP. Items published before `since` are skipped;
/// undated items are kept.
#[instrument(level = "info", skip_all, fields(feeds = sources.len()))]
pub async fn fetch_articles(
    sources: &[FeedSource],
    since: DateTime<Utc>,
    settings: &FetchSettings,
) -> Result<FetchOutcome, FetchError> {
    let client = RetryFetch::from_settings(HttpFeedClient::new(settings)?, settings);
    Ok(fetch_with(&client, sources, since, settings.max_concurrent_fetches).await)
}

/// Fetch all `sources` through `client`.
pub async fn fetch_with<C: FeedClient>(
    client: &C,
    sources: &[FeedSource],
    since: DateTime<Utc>,
    max_concurrent: usize,
) -> FetchOutcome {
    let results: Vec<(&FeedSource, Result<Vec<RawArticle>, FetchError>)> = stream::iter(sources)
        .map(|source| async move {
            let parsed = match client.fetch(&source.url).await {
                Ok(body) => rss::parse_feed(&body, source),
                Err(e) => Err(e),
            };
            (source, parsed)
        })
        .buffered(max_concurrent.max(1))
        .collect()
        .await;

    let mut outcome = FetchOutcome {
        feeds_attempted: sources.len(),
        ..FetchOutcome::default()
    };
    for (source, result) in results {
        match result {
            Ok(items) => {
                let before = items.len();
                outcome.articles.extend(
                    items
                        .into_iter()
                        .filter(|a| a.published_at.is_none_or(|at| at >= since)),
                );
                info!(
                    url = %source.url,
                    category = %source.category,
                    items = before,
                    "Fetched feed"
                );
            }
            Err(e) => {
                error!(url = %source.url, error = %e, "Feed failed");
                outcome.feed_errors.push(FeedFailure {
                    url: source.url.clone(),
                    error: e.to_string(),
                });
            }
        }
    }

    info!(
        articles = outcome.articles.len(),
        failed = outcome.feed_errors.len(),
        attempted = outcome.feeds_attempted,
        "Feed retrieval complete"
    );
    outcome
}
