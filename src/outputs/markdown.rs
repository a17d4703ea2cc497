//! Markdown rendering of the run report and the trending report.
//!
//! Articles are grouped by primary category (alphabetically), each section
//! opening with its [`CategoryDigest`](crate::models::CategoryDigest).

use crate::analysis::summarizer::category_digest;
use crate::config::TrendConfig;
use crate::errors::ExportError;
use crate::models::{Article, CategoryDigest, ImpactLevel, Report, TermCount, TrendingReport};
use crate::utils::{slugify_title, upcase};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt::{self, Write};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument};

const TOP_KEYWORDS: usize = 10;
const TOP_PHRASES: usize = 5;
const TOP_PER_CATEGORY: usize = 5;
const ENTITIES_PER_KIND: usize = 3;

fn impact_marker(level: ImpactLevel) -> &'static str {
    match level {
        ImpactLevel::High => "🔴",
        ImpactLevel::Medium => "🟡",
        ImpactLevel::Low => "🟢",
    }
}

fn title_case(term: &str) -> String {
    term.split(' ').map(upcase).collect::<Vec<_>>().join(" ")
}

/// Render the articles of `report` grouped by category.
pub fn report_to_markdown(report: &Report, trend: &TrendConfig) -> String {
    let mut md = String::new();
    // writing into a String cannot fail
    let _ = write_report(&mut md, report, trend);
    md
}

fn write_report(md: &mut String, report: &Report, trend: &TrendConfig) -> fmt::Result {
    writeln!(md, "# Pegasus News Report\n")?;
    writeln!(md, "**Generated:** {}  ", report.completed_at.format("%Y-%m-%d %H:%M:%S UTC"))?;
    writeln!(md, "**Status:** {}  ", report.status)?;
    writeln!(md, "**Total Articles:** {}", report.articles.len())?;
    if !report.feed_errors.is_empty() {
        writeln!(md, "\n**Unavailable feeds:**\n")?;
        for failure in &report.feed_errors {
            writeln!(md, "- {} ({})", failure.url, failure.error)?;
        }
    }
    writeln!(md, "\n---")?;

    let mut by_category: BTreeMap<&str, Vec<&Article>> = BTreeMap::new();
    for article in &report.articles {
        by_category.entry(article.primary_category()).or_default().push(article);
    }

    for (category, articles) in by_category {
        let digest = category_digest(&report.articles, category, trend);
        write_digest(md, &digest)?;
        for (i, article) in articles.iter().enumerate() {
            write_article(md, i + 1, article)?;
        }
    }
    Ok(())
}

fn write_digest(md: &mut String, digest: &CategoryDigest) -> fmt::Result {
    writeln!(md, "\n## {}\n", upcase(&digest.category))?;
    writeln!(md, "**Total Articles:** {}  ", digest.total_articles)?;
    writeln!(md, "**High Impact:** {}  ", digest.high_impact)?;
    writeln!(md, "**Medium Impact:** {}  ", digest.medium_impact)?;
    writeln!(md, "**Low Impact:** {}", digest.low_impact)?;
    if !digest.top_topics.is_empty() {
        writeln!(md, "\n**Top Topics:**\n")?;
        for topic in &digest.top_topics {
            writeln!(md, "- {}: {} mentions", upcase(&topic.term), topic.count)?;
        }
    }
    writeln!(md, "\n---")
}

fn write_article(md: &mut String, index: usize, article: &Article) -> fmt::Result {
    let title = if article.title.is_empty() { "No Title" } else { article.title.as_str() };
    writeln!(md, "\n### {index}. {title}\n")?;
    writeln!(md, "<a id=\"{}\"></a>\n", slugify_title(title))?;
    writeln!(md, "**Source:** {}  ", article.source)?;
    writeln!(md, "**Date:** {}  ", article.published_at.to_rfc3339())?;
    if !article.link.is_empty() {
        writeln!(md, "**Link:** {}  ", article.link)?;
    }
    let secondary = article.secondary_categories();
    if !secondary.is_empty() {
        let names: Vec<String> = secondary.iter().map(|c| upcase(c)).collect();
        writeln!(md, "**Also:** {}  ", names.join(", "))?;
    }
    let impact = article.impact_level();
    writeln!(md, "**Impact:** {} {}  ", impact_marker(impact), upcase(&impact.to_string()))?;
    writeln!(md, "**Sentiment:** {}  ", upcase(&article.sentiment().to_string()))?;
    if article.is_sensitive() {
        writeln!(
            md,
            "**Status:** ⚠️ SENSITIVE ({})  ",
            article.sensitive_topics().join(", ")
        )?;
    }
    if article.is_partial() {
        writeln!(md, "**Note:** analysis incomplete for this article  ")?;
    }

    let summary = if article.summary().is_empty() { "No summary" } else { article.summary() };
    writeln!(md, "\n**Summary:**\n{summary}")?;
    if !article.insight().is_empty() {
        writeln!(md, "\n**Insight:**\n{}", article.insight())?;
    }

    if let Some(entities) = article.entities().filter(|e| !e.is_empty()) {
        let listed: Vec<String> = entities
            .by_kind()
            .into_iter()
            .filter(|(_, names)| !names.is_empty())
            .map(|(kind, names)| {
                let shown = &names[..names.len().min(ENTITIES_PER_KIND)];
                format!("{}: {}", upcase(kind), shown.join(", "))
            })
            .collect();
        if !listed.is_empty() {
            writeln!(md, "\n**Entities:** {}", listed.join("; "))?;
        }
    }
    writeln!(md, "\n---")
}

/// Render the trending report: top keywords, top phrases and the leaders of
/// each category.
pub fn trending_to_markdown(trending: &TrendingReport, generated: DateTime<Utc>) -> String {
    let mut md = String::new();
    let _ = write_trending(&mut md, trending, generated);
    md
}

fn write_terms(md: &mut String, terms: &[TermCount]) -> fmt::Result {
    for t in terms {
        writeln!(md, "- **{}**: {} mentions", title_case(&t.term), t.count)?;
    }
    Ok(())
}

fn write_trending(md: &mut String, trending: &TrendingReport, generated: DateTime<Utc>) -> fmt::Result {
    writeln!(md, "# Trending Topics Report\n")?;
    writeln!(md, "**Generated:** {}  ", generated.format("%Y-%m-%d %H:%M:%S UTC"))?;
    writeln!(md, "**Time Window:** Last {} hours  ", trending.window_hours)?;
    writeln!(md, "**Articles Analyzed:** {}  ", trending.articles_analyzed)?;
    writeln!(md, "**Threshold:** {} mentions", trending.threshold)?;
    writeln!(md, "\n---")?;

    if trending.top_keywords.is_empty() && trending.top_phrases.is_empty() {
        writeln!(md, "\nNo trending topics in this window.")?;
        return Ok(());
    }
    if !trending.top_keywords.is_empty() {
        writeln!(md, "\n## Top Trending Keywords\n")?;
        write_terms(md, trending.leading_keywords(TOP_KEYWORDS))?;
    }
    if !trending.top_phrases.is_empty() {
        writeln!(md, "\n## Top Trending Phrases\n")?;
        write_terms(md, trending.leading_phrases(TOP_PHRASES))?;
    }
    if trending.per_category.values().any(|items| !items.is_empty()) {
        writeln!(md, "\n## Trending by Category")?;
        for (category, items) in &trending.per_category {
            if items.is_empty() {
                continue;
            }
            writeln!(md, "\n### {}\n", upcase(category))?;
            write_terms(md, &items[..items.len().min(TOP_PER_CATEGORY)])?;
        }
    }
    Ok(())
}

/// Write `content` to `{dir}/{stem}.md`.
#[instrument(level = "info", skip_all, fields(dir = %dir.display(), %stem))]
pub async fn write_markdown(content: &str, dir: &Path, stem: &str) -> Result<PathBuf, ExportError> {
    let path = dir.join(format!("{stem}.md"));
    fs::write(&path, content).await?;
    info!(path = %path.display(), bytes = content.len(), "Wrote Markdown");
    Ok(path)
}
