//! Topic classification against the keyword registry.
//!
//! Each category is scored by the number of its distinct keywords present in
//! the article text. The best score wins; ties go to the higher
//! [`KeywordRegistry::priority`]. Articles that match nothing fall into `general`.

use super::text::{count_distinct, matched_terms, normalize};
use crate::config::KeywordRegistry;
use crate::models::{Article, ArticleBatch, CategoryStats, ClassificationResult};
use std::cmp::Reverse;
use std::collections::BTreeMap;
use tracing::{info, instrument};

/// Classify one article. Pure; empty text yields `general`, not sensitive.
pub fn classify(article: &Article, registry: &KeywordRegistry) -> ClassificationResult {
    classify_text(&article.text(), registry)
}

pub fn classify_text(text: &str, registry: &KeywordRegistry) -> ClassificationResult {
    let text = normalize(text);
    let category_scores: Vec<(String, usize)> = registry
        .categories
        .iter()
        .map(|c| (c.name.clone(), count_distinct(&text, &c.keywords, registry.policy)))
        .collect();

    let mut ranked: Vec<usize> = (0..category_scores.len())
        .filter(|&i| category_scores[i].1 > 0)
        .collect();
    ranked.sort_by_key(|&i| {
        let (name, score) = &category_scores[i];
        (Reverse(*score), registry.priority(name))
    });

    let Some((&first, rest)) = ranked.split_first() else {
        return ClassificationResult {
            category_scores,
            ..ClassificationResult::general()
        };
    };

    let primary_category = category_scores[first].0.clone();
    let secondary_categories: Vec<String> =
        rest.iter().map(|&i| category_scores[i].0.clone()).collect();
    let sensitive_topics: Vec<String> = registry
        .get(&primary_category)
        .map(|def| {
            matched_terms(&text, &def.sensitive_keywords, registry.policy)
                .into_iter()
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    ClassificationResult {
        primary_category,
        secondary_categories,
        category_scores,
        is_sensitive: !sensitive_topics.is_empty(),
        sensitive_topics,
    }
}

/// Attach a classification to every article and log the category distribution.
/// Partial articles get the `general` result.
#[instrument(level = "info", skip_all, fields(articles = articles.len()))]
pub fn classify_batch(articles: ArticleBatch, registry: &KeywordRegistry) -> ArticleBatch {
    let classified: ArticleBatch = articles
        .into_iter()
        .map(|article| {
            let result = if article.is_partial() {
                ClassificationResult::general()
            } else {
                classify(&article, registry)
            };
            article.with_classification(result)
        })
        .collect();

    let stats = category_stats(&classified);
    info!(
        total = stats.total,
        sensitive = stats.sensitive_count,
        multi_category = stats.multi_category_count,
        "Classified articles"
    );
    for (category, count) in &stats.by_category {
        info!(%category, count, "Category distribution");
    }
    classified
}

pub fn category_stats(articles: &[Article]) -> CategoryStats {
    let mut by_category: BTreeMap<String, usize> = BTreeMap::new();
    for article in articles {
        *by_category
            .entry(article.primary_category().to_string())
            .or_default() += 1;
    }
    CategoryStats {
        total: articles.len(),
        by_category,
        sensitive_count: articles.iter().filter(|a| a.is_sensitive()).count(),
        multi_category_count: articles
            .iter()
            .filter(|a| !a.secondary_categories().is_empty())
            .count(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AnalysisConfig, CategoryConfig, MatchPolicy};
    use crate::models::RawArticle;
    use chrono::Utc;

    fn registry() -> KeywordRegistry {
        AnalysisConfig::default().registry
    }

    fn article(title: &str, summary: &str) -> Article {
        Article::from_raw(
            RawArticle {
                title: title.to_string(),
                link: format!("https://example.com/{}", title.len()),
                summary_text: summary.to_string(),
                published_at: None,
                source: "example.com".to_string(),
                origin_category: None,
            },
            Utc::now(),
        )
    }

    #[test]
    fn test_no_matches_is_general_and_not_sensitive() {
        let result = classify(&article("Local bakery opens", "Fresh bread daily."), &registry());
        assert_eq!(result.primary_category, "general");
        assert!(!result.is_sensitive);
        assert!(result.sensitive_topics.is_empty());
        assert!(result.secondary_categories.is_empty());
    }

    #[test]
    fn test_empty_text_is_general() {
        let result = classify(&article("", ""), &registry());
        assert_eq!(result, ClassificationResult {
            category_scores: result.category_scores.clone(),
            ..ClassificationResult::general()
        });
    }

    #[test]
    fn test_health_outbreak_is_sensitive() {
        let result = classify(
            &article(
                "WHO declares new pandemic outbreak",
                "Officials say the outbreak is spreading quickly.",
            ),
            &registry(),
        );
        assert_eq!(result.primary_category, "health");
        assert!(result.is_sensitive);
        assert!(result.sensitive_topics.contains(&"outbreak".to_string()));
        assert_eq!(result.sensitive_topics, vec!["pandemic", "outbreak"]);
    }

    #[test]
    fn test_economy_article_not_sensitive() {
        let result = classify(&article("Stock market rallies amid bank earnings", ""), &registry());
        assert_eq!(result.primary_category, "economy");
        assert!(!result.is_sensitive);
    }

    #[test]
    fn test_tie_prefers_health_over_economy() {
        // one health keyword and one economy keyword
        let a = article("Hospital budget approved", "");
        for _ in 0..5 {
            let result = classify(&a, &registry());
            assert_eq!(result.primary_category, "health");
            assert_eq!(result.secondary_categories, vec!["economy"]);
        }
    }

    #[test]
    fn test_tie_break_ignores_declaration_order() {
        let category = |name: &str, keyword: &str| CategoryConfig {
            name: name.to_string(),
            keywords: vec![keyword.to_string()],
            sensitive_keywords: vec![],
        };
        let registry = KeywordRegistry::from_config(
            &[
                category("sports", "match"),
                category("economy", "budget"),
                category("health", "hospital"),
            ],
            MatchPolicy::WordBoundary,
        )
        .unwrap();

        let result = classify_text("Hospital budget approved", &registry);
        assert_eq!(result.primary_category, "health");
        assert_eq!(result.secondary_categories, vec!["economy"]);

        let result = classify_text("Budget match approved", &registry);
        assert_eq!(result.primary_category, "economy");
        assert_eq!(result.secondary_categories, vec!["sports"]);
    }

    #[test]
    fn test_secondary_ordered_by_count_then_priority() {
        // economy: stock, market, bank; military: army; health: vaccine
        let result = classify(
            &article("Stock market and bank shares", "Army to fund vaccine drive"),
            &registry(),
        );
        assert_eq!(result.primary_category, "economy");
        assert_eq!(result.secondary_categories, vec!["health", "military"]);
    }

    #[test]
    fn test_sensitivity_uses_primary_category_only() {
        // "crisis" is an economy sensitive term but health dominates
        let result = classify(
            &article("Hospital crisis as virus and flu cases climb", ""),
            &registry(),
        );
        assert_eq!(result.primary_category, "health");
        assert!(!result.is_sensitive);
    }

    #[test]
    fn test_word_boundary_avoids_false_positive() {
        let registry = KeywordRegistry::from_config(
            &[CategoryConfig {
                name: "military".to_string(),
                keywords: vec!["war".to_string()],
                sensitive_keywords: vec![],
            }],
            MatchPolicy::WordBoundary,
        )
        .unwrap();
        assert_eq!(classify_text("A warm spring day", &registry).primary_category, "general");

        let substring = KeywordRegistry {
            policy: MatchPolicy::Substring,
            ..registry
        };
        assert_eq!(classify_text("A warm spring day", &substring).primary_category, "military");
    }

    #[test]
    fn test_classify_batch_and_stats() {
        let batch = vec![
            article("WHO declares new pandemic outbreak", ""),
            article("Stock market rallies amid bank earnings", ""),
            article("Local bakery opens", ""),
            article("Hospital budget approved", ""),
        ];
        let classified = classify_batch(batch, &registry());
        assert!(classified.iter().all(|a| a.classification.is_some()));

        let stats = category_stats(&classified);
        assert_eq!(stats.total, 4);
        assert_eq!(stats.by_category.get("health"), Some(&2));
        assert_eq!(stats.by_category.get("economy"), Some(&1));
        assert_eq!(stats.by_category.get("general"), Some(&1));
        assert_eq!(stats.sensitive_count, 1);
        assert_eq!(stats.multi_category_count, 1);
    }
}
