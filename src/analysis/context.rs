//! Impact, sentiment and entity analysis.
//!
//! Everything here is lexicon driven and deterministic: the same article and
//! configuration always produce the same [`AnalysisResult`].

use super::text::{count_distinct, normalize};
use crate::config::{ContextConfig, Gazetteer};
use crate::models::{
    AnalysisResult, AnalysisSummary, Article, ArticleBatch, Entities, ImpactLevel, Sentiment,
    TermCount,
};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, HashMap};
use tracing::{info, instrument};

/// Runs of capitalized words, e.g. "New York" or "WHO".
static CAPITALIZED_RUN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\p{Lu}[\p{L}\p{N}'’.-]*(?:[ \t]+\p{Lu}[\p{L}\p{N}'’.-]*)*").unwrap()
});

const TOP_ENTITIES: usize = 10;

pub fn analyze(article: &Article, config: &ContextConfig) -> AnalysisResult {
    let text = article.text();
    let lower = normalize(&text);
    AnalysisResult {
        impact_level: impact_level(&lower, article.is_sensitive(), config),
        sentiment: sentiment(&lower, config),
        entities: extract_entities(&text, &config.gazetteer),
    }
}

/// Sensitivity and the high tier together give `High`; either alone gives
/// `Medium`. Without both, enough distinct medium-tier terms still give `Medium`.
pub fn impact_level(lower: &str, is_sensitive: bool, config: &ContextConfig) -> ImpactLevel {
    let high_tier = count_distinct(lower, &config.high_impact, config.policy) > 0;
    match (is_sensitive, high_tier) {
        (true, true) => ImpactLevel::High,
        (true, false) | (false, true) => ImpactLevel::Medium,
        (false, false) => {
            if count_distinct(lower, &config.medium_impact, config.policy)
                >= config.medium_tier_min_hits
            {
                ImpactLevel::Medium
            } else {
                ImpactLevel::Low
            }
        }
    }
}

pub fn sentiment(lower: &str, config: &ContextConfig) -> Sentiment {
    let positive = count_distinct(lower, &config.positive, config.policy);
    let negative = count_distinct(lower, &config.negative, config.policy);
    match positive.cmp(&negative) {
        std::cmp::Ordering::Greater => Sentiment::Positive,
        std::cmp::Ordering::Less => Sentiment::Negative,
        std::cmp::Ordering::Equal => Sentiment::Neutral,
    }
}

#[derive(Clone, Copy)]
enum Kind {
    Country,
    Organization,
    Location,
}

fn clean_token(token: &str) -> &str {
    let token = token.trim_end_matches(['.', '\'', '’']);
    token
        .strip_suffix("'s")
        .or_else(|| token.strip_suffix("’s"))
        .unwrap_or(token)
}

/// Gazetteer names found in capitalized word runs of `text`, longest match first.
pub fn extract_entities(text: &str, gazetteer: &Gazetteer) -> Entities {
    let mut lookup: HashMap<&str, Kind> = HashMap::new();
    for (names, kind) in [
        (&gazetteer.locations, Kind::Location),
        (&gazetteer.organizations, Kind::Organization),
        (&gazetteer.countries, Kind::Country),
    ] {
        // later inserts win, so countries take precedence over the others
        for name in names {
            lookup.insert(name.as_str(), kind);
        }
    }

    let mut entities = Entities::default();
    for run in CAPITALIZED_RUN_RE.find_iter(text) {
        let tokens: Vec<&str> = run.as_str().split_whitespace().collect();
        let mut i = 0;
        while i < tokens.len() {
            let found = (i + 1..=tokens.len()).rev().find_map(|j| {
                let mut candidate = tokens[i..j].join(" ");
                candidate.truncate(candidate.len() - tokens[j - 1].len());
                candidate.push_str(clean_token(tokens[j - 1]));
                lookup.get(candidate.as_str()).map(|&kind| (j, kind, candidate))
            });
            match found {
                Some((end, kind, name)) => {
                    let list = match kind {
                        Kind::Country => &mut entities.countries,
                        Kind::Organization => &mut entities.organizations,
                        Kind::Location => &mut entities.locations,
                    };
                    if !list.contains(&name) {
                        list.push(name);
                    }
                    i = end;
                }
                None => i += 1,
            }
        }
    }
    entities
}

/// Attach an analysis result to every article and log the distributions.
/// Partial articles get the neutral default.
#[instrument(level = "info", skip_all, fields(articles = articles.len()))]
pub fn analyze_batch(articles: ArticleBatch, config: &ContextConfig) -> ArticleBatch {
    let analyzed: ArticleBatch = articles
        .into_iter()
        .map(|article| {
            let result = if article.is_partial() {
                AnalysisResult::default()
            } else {
                analyze(&article, config)
            };
            article.with_analysis(result)
        })
        .collect();

    let summary = summarize_analysis(&analyzed);
    for (level, count) in &summary.impact_distribution {
        info!(impact = %level, count, "Impact distribution");
    }
    for (sentiment, count) in &summary.sentiment_distribution {
        info!(%sentiment, count, "Sentiment distribution");
    }
    analyzed
}

/// Roll up impact, sentiment and entity mentions over a batch.
pub fn summarize_analysis(articles: &[Article]) -> AnalysisSummary {
    let mut impact_distribution: BTreeMap<ImpactLevel, usize> = BTreeMap::new();
    let mut sentiment_distribution: BTreeMap<Sentiment, usize> = BTreeMap::new();
    let mut mentions: BTreeMap<&str, HashMap<&str, usize>> = BTreeMap::new();

    for article in articles {
        *impact_distribution.entry(article.impact_level()).or_default() += 1;
        *sentiment_distribution.entry(article.sentiment()).or_default() += 1;
        if let Some(entities) = article.entities() {
            for (kind, names) in entities.by_kind() {
                let counts = mentions.entry(kind).or_default();
                for name in names {
                    *counts.entry(name.as_str()).or_default() += 1;
                }
            }
        }
    }

    let top_entities = mentions
        .into_iter()
        .map(|(kind, counts)| {
            let mut items: Vec<TermCount> = counts
                .into_iter()
                .map(|(name, n)| TermCount::new(name, n))
                .collect();
            items.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.term.cmp(&b.term)));
            items.truncate(TOP_ENTITIES);
            (kind.to_string(), items)
        })
        .filter(|(_, items)| !items.is_empty())
        .collect();

    AnalysisSummary {
        total_articles: articles.len(),
        high_impact_count: impact_distribution.get(&ImpactLevel::High).copied().unwrap_or(0),
        negative_sentiment_count: sentiment_distribution
            .get(&Sentiment::Negative)
            .copied()
            .unwrap_or(0),
        partial_count: articles.iter().filter(|a| a.is_partial()).count(),
        impact_distribution,
        sentiment_distribution,
        top_entities,
    }
}
