//! Batch orchestration: ingest, deduplicate, then run every analysis stage
//! over the batch and assemble the [`Report`].
//!
//! Each stage is total over the batch. An article that fails validation is
//! kept, marked [`ArticleStatus::Partial`](crate::models::ArticleStatus), and
//! carries neutral defaults through the remaining stages.

use crate::analysis::{classifier, context, summarizer, trending};
use crate::config::AnalysisConfig;
use crate::errors::AnalysisError;
use crate::models::{
    Article, ArticleBatch, FeedFailure, RawArticle, Report, RunStatus, Stage,
};
use chrono::{DateTime, Duration, Utc};
use itertools::Itertools;
use tracing::{info, instrument, warn};

/// What the feed collaborator hands over: items from every feed that
/// answered, plus one entry per feed that did not.
#[derive(Debug, Clone, Default)]
pub struct FetchOutcome {
    pub articles: Vec<RawArticle>,
    pub feed_errors: Vec<FeedFailure>,
    pub feeds_attempted: usize,
}

impl FetchOutcome {
    #[cfg(test)]
    pub fn from_articles(articles: Vec<RawArticle>) -> Self {
        Self {
            articles,
            ..Self::default()
        }
    }

    /// Every feed was tried and none answered.
    pub fn all_feeds_failed(&self) -> bool {
        self.feeds_attempted > 0 && self.feed_errors.len() >= self.feeds_attempted
    }
}

/// Run the analysis over already ingested items, timestamped against now.
/// The binary goes through [`run_with_fetch`] so feed failures reach the report.
#[cfg(test)]
pub fn run_pipeline(raw_articles: Vec<RawArticle>, config: &AnalysisConfig) -> Report {
    run_with_fetch(FetchOutcome::from_articles(raw_articles), config, Utc::now())
}

/// Run the analysis over a fetch outcome. `now` anchors the time window and
/// stands in for missing publication times.
#[instrument(level = "info", skip_all, fields(raw = outcome.articles.len(), feeds = outcome.feeds_attempted))]
pub fn run_with_fetch(outcome: FetchOutcome, config: &AnalysisConfig, now: DateTime<Utc>) -> Report {
    let started_at = Utc::now();
    let all_feeds_failed = outcome.all_feeds_failed();
    let FetchOutcome {
        articles: raw,
        feed_errors,
        ..
    } = outcome;

    let batch: ArticleBatch = raw
        .into_iter()
        .map(|r| Article::from_raw(r, now))
        .collect();
    log_stage(Stage::Ingested, &batch);

    let batch = deduplicate(batch, now, config.trend.window_hours);
    log_stage(Stage::Deduplicated, &batch);

    let batch = classifier::classify_batch(batch, &config.registry);
    log_stage(Stage::Classified, &batch);

    let trending = trending::detect_trending(&batch, &config.trend);
    let batch: ArticleBatch = batch
        .into_iter()
        .map(|article| {
            let score = if article.is_partial() {
                0.0
            } else {
                trending::article_trending_score(&article, &trending, &config.trend)
            };
            article.with_trending_score(score)
        })
        .collect();
    log_stage(Stage::TrendAnalyzed, &batch);

    let batch = context::analyze_batch(batch, &config.context);
    log_stage(Stage::ContextAnalyzed, &batch);

    let batch = summarizer::summarize_batch(batch, &config.summary);
    log_stage(Stage::Summarized, &batch);

    let partial = batch.iter().filter(|a| a.is_partial()).count();
    let status = if batch.is_empty() && all_feeds_failed {
        RunStatus::Error
    } else if partial > 0 {
        RunStatus::PartialSuccess
    } else {
        RunStatus::Success
    };

    let report = Report {
        started_at,
        completed_at: Utc::now(),
        status,
        category_stats: classifier::category_stats(&batch),
        analysis: context::summarize_analysis(&batch),
        trending,
        articles: batch,
        feed_errors,
    };
    info!(
        stage = %Stage::Assembled,
        %status,
        articles = report.articles.len(),
        partial,
        feed_errors = report.feed_errors.len(),
        "Report assembled"
    );
    report
}

fn log_stage(stage: Stage, batch: &ArticleBatch) {
    info!(%stage, articles = batch.len(), "Stage complete");
}

/// Drop repeated links (first occurrence wins) and articles older than the
/// window, then validate what is left.
fn deduplicate(batch: ArticleBatch, now: DateTime<Utc>, window_hours: u32) -> ArticleBatch {
    let before = batch.len();
    let cutoff = now - Duration::hours(i64::from(window_hours));

    // Articles without a link can't be told apart, so each is its own key.
    let unique: ArticleBatch = batch
        .into_iter()
        .enumerate()
        .unique_by(|(i, a)| (a.link.clone(), a.link.is_empty().then_some(*i)))
        .map(|(_, a)| a)
        .collect();
    let duplicates = before - unique.len();

    let fresh: ArticleBatch = unique
        .into_iter()
        .filter(|a| a.published_at >= cutoff)
        .collect();
    let stale = before - duplicates - fresh.len();
    if duplicates > 0 || stale > 0 {
        info!(duplicates, stale, window_hours, "Dropped articles");
    }

    fresh
        .into_iter()
        .map(|article| match validate(&article) {
            Ok(()) => article,
            Err(e) => {
                warn!(title = %article.title, error = %e, "Article kept as partial");
                article.mark_partial(Stage::Deduplicated, e.to_string())
            }
        })
        .collect()
}

fn validate(article: &Article) -> Result<(), AnalysisError> {
    if article.link.is_empty() {
        return Err(AnalysisError::MissingLink);
    }
    if article.title.is_empty() && article.summary_text.is_empty() {
        return Err(AnalysisError::EmptyText {
            link: article.link.clone(),
        });
    }
    Ok(())
}
