//! CSV export: one row per article, list fields joined with `; `.

use crate::errors::ExportError;
use crate::models::{Article, ArticleStatus};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument, warn};

const HEADERS: [&str; 19] = [
    "title",
    "link",
    "source",
    "published_at",
    "origin_category",
    "primary_category",
    "secondary_categories",
    "is_sensitive",
    "sensitive_topics",
    "impact_level",
    "sentiment",
    "countries",
    "organizations",
    "locations",
    "trending_score",
    "summary",
    "insight",
    "status",
    "status_reason",
];

/// Flat view of an [`Article`]; field order matches [`HEADERS`].
#[derive(Debug, Serialize)]
struct ArticleRow<'a> {
    title: &'a str,
    link: &'a str,
    source: &'a str,
    published_at: String,
    origin_category: &'a str,
    primary_category: &'a str,
    secondary_categories: String,
    is_sensitive: bool,
    sensitive_topics: String,
    impact_level: String,
    sentiment: String,
    countries: String,
    organizations: String,
    locations: String,
    trending_score: f64,
    summary: &'a str,
    insight: &'a str,
    status: &'static str,
    status_reason: String,
}

impl<'a> From<&'a Article> for ArticleRow<'a> {
    fn from(a: &'a Article) -> Self {
        let entities = a.entities();
        let list = |items: Option<&Vec<String>>| items.map(|v| v.join("; ")).unwrap_or_default();
        let (status, status_reason) = match &a.status {
            ArticleStatus::Complete => ("complete", String::new()),
            ArticleStatus::Partial { stage, reason } => ("partial", format!("{stage}: {reason}")),
        };
        Self {
            title: &a.title,
            link: &a.link,
            source: &a.source,
            published_at: a.published_at.to_rfc3339(),
            origin_category: &a.origin_category,
            primary_category: a.primary_category(),
            secondary_categories: a.secondary_categories().join("; "),
            is_sensitive: a.is_sensitive(),
            sensitive_topics: a.sensitive_topics().join("; "),
            impact_level: a.impact_level().to_string(),
            sentiment: a.sentiment().to_string(),
            countries: list(entities.map(|e| &e.countries)),
            organizations: list(entities.map(|e| &e.organizations)),
            locations: list(entities.map(|e| &e.locations)),
            trending_score: a.trending_score,
            summary: a.summary(),
            insight: a.insight(),
            status,
            status_reason,
        }
    }
}

/// Write `articles` to `{dir}/{stem}.csv`. The header row is written even
/// when there are no articles.
#[instrument(level = "info", skip_all, fields(dir = %dir.display(), %stem, articles = articles.len()))]
pub async fn write_articles(articles: &[Article], dir: &Path, stem: &str) -> Result<PathBuf, ExportError> {
    if articles.is_empty() {
        warn!("No articles to export; writing header only");
    }
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(HEADERS)?;
    for article in articles {
        writer.serialize(ArticleRow::from(article))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| ExportError::Io(e.into_error()))?;

    let path = dir.join(format!("{stem}.csv"));
    fs::write(&path, bytes).await?;
    info!(path = %path.display(), "Wrote CSV export");
    Ok(path)
}
