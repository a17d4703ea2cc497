//! # Pegasus News
//!
//! A news intelligence pipeline that fetches public RSS and Atom feeds,
//! classifies every article into a topic category, detects trending keywords
//! and phrases across the batch, labels impact and sentiment, and exports the
//! enriched result.
//!
//! ## Features
//!
//! - Concurrent feed retrieval with retry, backoff and jitter
//! - Keyword classification with sensitive-topic alerts (health, military, economy)
//! - Batch-local trending keywords and phrases with a mention threshold
//! - Lexicon impact and sentiment labels plus gazetteer entity mentions
//! - Extractive summaries and one-line insights
//! - JSON, CSV and Markdown exports
//!
//! ## Usage
//!
//! ```sh
//! pegasus_news --config config.yaml --hours 24 --threshold 3
//! ```
//!
//! ## Architecture
//!
//! 1. **Fetching**: download every configured feed (4 at a time)
//! 2. **Analysis**: deduplicate, classify, extract trends, analyze context, summarize
//! 3. **Output**: write the report in each configured format

use chrono::{Duration, Utc};
use clap::Parser;
use std::error::Error;
use std::path::Path;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod analysis;
mod cli;
mod config;
mod errors;
mod models;
mod outputs;
mod pipeline;
mod scrapers;
mod utils;

use cli::Cli;
use config::load_config;
use models::{Report, RunStatus};
use outputs::export_all;
use pipeline::run_with_fetch;
use scrapers::fetch_articles;
use utils::ensure_writable_dir;

const SUMMARY_KEYWORDS: usize = 10;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("pegasus_news starting up");

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    // ---- Configuration (fatal on error) ----
    let app_config = load_config(args.config.as_deref())?.with_overrides(args.hours, args.threshold);
    let analysis_config = match app_config.analysis_config() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration; aborting before any processing");
            return Err(e.into());
        }
    };
    info!(
        categories = analysis_config.registry.categories.len(),
        window_hours = analysis_config.trend.window_hours,
        threshold = analysis_config.trend.threshold,
        policy = ?analysis_config.registry.policy,
        "Configuration ready"
    );

    // Early check: ensure the export dir is writable before spending time on feeds
    let output_dir = args
        .output_dir
        .clone()
        .unwrap_or_else(|| app_config.export.output_dir.clone());
    if !args.no_export {
        if let Err(e) = ensure_writable_dir(&output_dir).await {
            error!(
                path = %output_dir,
                error = %e,
                "Output directory is not writable (fix perms or choose a different path)"
            );
            return Err(e);
        }
    }

    // ---- Fetch ----
    let now = Utc::now();
    let since = now - Duration::hours(i64::from(analysis_config.trend.window_hours));
    let outcome = fetch_articles(&app_config.feeds, since, &app_config.fetch).await?;

    // ---- Analyze ----
    let mut report = run_with_fetch(outcome, &analysis_config, now);
    log_run_summary(&report);

    if let Some(category) = args.category.as_deref() {
        let category = category.trim().to_lowercase();
        report.articles = report.articles_in(&category).cloned().collect();
        info!(%category, kept = report.articles.len(), "Filtered articles for export");
    }

    // ---- Export ----
    if args.no_export {
        info!("Export disabled");
    } else {
        let formats = if args.formats.is_empty() {
            app_config.export.formats.clone()
        } else {
            args.formats.clone()
        };
        let written = export_all(&report, &analysis_config.trend, Path::new(&output_dir), &formats).await;
        for (format, path) in &written {
            info!(%format, path = %path.display(), "Exported");
        }
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        status = %report.status,
        "Execution complete"
    );

    if report.status == RunStatus::Error {
        return Err("every configured feed failed; nothing to analyze".into());
    }
    Ok(())
}

fn log_run_summary(report: &Report) {
    info!(
        status = %report.status,
        articles = report.articles.len(),
        sensitive = report.category_stats.sensitive_count,
        multi_category = report.category_stats.multi_category_count,
        high_impact = report.analysis.high_impact_count,
        negative = report.analysis.negative_sentiment_count,
        partial = report.partial_count(),
        trending_keywords = report.trending.top_keywords.len(),
        trending_phrases = report.trending.top_phrases.len(),
        "Run summary"
    );
    for (category, count) in &report.category_stats.by_category {
        info!(%category, count, "Articles by category");
    }
    for t in report.trending.leading_keywords(SUMMARY_KEYWORDS) {
        info!(term = %t.term, mentions = t.count, "Trending");
    }
    for failure in &report.feed_errors {
        warn!(url = %failure.url, error = %failure.error, "Feed unavailable");
    }
    for article in report.articles.iter().filter(|a| a.is_sensitive()) {
        warn!(
            title = %utils::truncate_for_log(&article.title, 120),
            category = %article.primary_category(),
            topics = ?article.sensitive_topics(),
            "Sensitive article"
        );
    }
}
