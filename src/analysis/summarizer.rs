//! Extractive summaries, one-line insights and category digests.

use super::text::sentence_spans;
use super::trending::extract_keywords;
use crate::config::{SummaryConfig, TrendConfig};
use crate::models::{
    Article, ArticleBatch, CategoryDigest, ImpactLevel, Sentiment, SummaryResult, TermCount,
};
use std::collections::HashMap;
use tracing::{info, instrument};

const DIGEST_TOPICS: usize = 5;
const INSIGHT_COUNTRIES: usize = 2;

pub fn summarize(article: &Article, config: &SummaryConfig) -> SummaryResult {
    SummaryResult {
        summary: extract_summary(&article.summary_text, config),
        insight: insight(article),
    }
}

/// Lead sentence of `text`, plus the next one while the lead is shorter than
/// `min_length`, bounded by `max_length` characters.
pub fn extract_summary(text: &str, config: &SummaryConfig) -> String {
    let spans = sentence_spans(text);
    let Some(&(start, lead_end)) = spans.first() else {
        return String::new();
    };
    let mut end = lead_end;
    if text[start..end].chars().count() < config.min_length {
        if let Some(&(_, second_end)) = spans.get(1) {
            end = second_end;
        }
    }
    truncate_summary(&text[start..end], config.max_length)
}

/// Cut `text` to at most `max` characters, preferring the last sentence end
/// inside the limit and then the last word break. No ellipsis is added.
pub fn truncate_summary(text: &str, max: usize) -> String {
    let Some((limit, _)) = text.char_indices().nth(max) else {
        return text.to_string();
    };
    let window = &text[..limit];

    let sentence_end = window
        .char_indices()
        .filter(|&(i, c)| {
            matches!(c, '.' | '!' | '?')
                && text[i + c.len_utf8()..]
                    .chars()
                    .next()
                    .is_none_or(char::is_whitespace)
        })
        .map(|(i, c)| i + c.len_utf8())
        .last();
    if let Some(end) = sentence_end {
        return window[..end].to_string();
    }

    if text[limit..].starts_with(char::is_whitespace) && !window.trim_end().is_empty() {
        return window.trim_end().to_string();
    }
    match window.rfind(char::is_whitespace) {
        Some(ws) if !window[..ws].trim_end().is_empty() => window[..ws].trim_end().to_string(),
        _ => window.to_string(),
    }
}

/// One line: a headline chosen by sensitivity and impact, a tone clause and
/// up to two affected countries.
pub fn insight(article: &Article) -> String {
    let category = article.primary_category();
    let impact = article.impact_level();
    let mut line = match (article.is_sensitive(), impact) {
        (true, ImpactLevel::High) => {
            format!("SENSITIVE: This {category} news requires immediate attention.")
        }
        (true, _) => format!("SENSITIVE: This {category} news requires attention."),
        (false, level) => format!("{} impact {category} update.", level.to_string().to_uppercase()),
    };

    line.push_str(match article.sentiment() {
        Sentiment::Positive => " Positive developments indicated.",
        Sentiment::Negative => " Concerning trend noted.",
        Sentiment::Neutral => " Neutral information.",
    });

    if let Some(entities) = article.entities() {
        if !entities.countries.is_empty() {
            let countries: Vec<&str> = entities
                .countries
                .iter()
                .take(INSIGHT_COUNTRIES)
                .map(String::as_str)
                .collect();
            line.push_str(&format!(" Affects {}.", countries.join(", ")));
        }
    }
    line
}

/// Partial articles get an empty summary and insight.
#[instrument(level = "info", skip_all, fields(articles = articles.len()))]
pub fn summarize_batch(articles: ArticleBatch, config: &SummaryConfig) -> ArticleBatch {
    let summarized: ArticleBatch = articles
        .into_iter()
        .map(|article| {
            let result = if article.is_partial() {
                SummaryResult::default()
            } else {
                summarize(&article, config)
            };
            article.with_summary(result)
        })
        .collect();
    info!(count = summarized.len(), "Generated summaries");
    summarized
}

/// Impact counts and most mentioned keywords for articles whose primary
/// category is `category`.
pub fn category_digest(articles: &[Article], category: &str, trend: &TrendConfig) -> CategoryDigest {
    let mut digest = CategoryDigest {
        category: category.to_string(),
        ..CategoryDigest::default()
    };
    let mut counts: HashMap<String, usize> = HashMap::new();

    for article in articles.iter().filter(|a| a.primary_category() == category) {
        digest.total_articles += 1;
        match article.impact_level() {
            ImpactLevel::High => digest.high_impact += 1,
            ImpactLevel::Medium => digest.medium_impact += 1,
            ImpactLevel::Low => digest.low_impact += 1,
        }
        for keyword in extract_keywords(&article.text(), trend) {
            *counts.entry(keyword).or_default() += 1;
        }
    }

    let mut topics: Vec<TermCount> = counts
        .into_iter()
        .map(|(term, n)| TermCount::new(term, n))
        .collect();
    topics.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.term.cmp(&b.term)));
    topics.truncate(DIGEST_TOPICS);
    digest.top_topics = topics;
    digest
}
