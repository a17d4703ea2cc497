//! Trending keyword and phrase detection over one batch.
//!
//! Counts come only from the articles passed in; there is no memory of earlier
//! runs. A term trends when its batch-wide count reaches the threshold.

use super::text::{STOPWORDS, split_sentences, words};
use crate::config::TrendConfig;
use crate::models::{Article, TermCount, TrendingReport};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, info, instrument};

/// Keywords and phrases of one article, in order of appearance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArticleTerms {
    pub keywords: Vec<String>,
    pub phrases: Vec<String>,
    /// All word tokens of the article, stopwords included.
    pub token_count: usize,
}

fn is_stopword(word: &str, config: &TrendConfig) -> bool {
    STOPWORDS.contains(word) || config.extra_stopwords.iter().any(|s| s == word)
}

/// Lowercased words with stopwords and short tokens removed.
pub fn extract_keywords(text: &str, config: &TrendConfig) -> Vec<String> {
    words(text)
        .into_iter()
        .filter(|w| w.chars().count() >= config.min_keyword_length && !is_stopword(w, config))
        .collect()
}

/// Contiguous n-grams of keywords, never spanning two segments.
pub fn extract_phrases(segments: &[&str], config: &TrendConfig) -> Vec<String> {
    segments
        .iter()
        .flat_map(|segment| {
            extract_keywords(segment, config)
                .windows(config.phrase_length)
                .map(|w| w.join(" "))
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Title plus each summary sentence, the units phrases are built within.
fn segments(article: &Article) -> Vec<&str> {
    let mut segments = vec![article.title.as_str()];
    segments.extend(split_sentences(&article.summary_text));
    segments
}

pub fn article_terms(article: &Article, config: &TrendConfig) -> ArticleTerms {
    let segments = segments(article);
    ArticleTerms {
        keywords: segments
            .iter()
            .flat_map(|s| extract_keywords(s, config))
            .collect(),
        phrases: extract_phrases(&segments, config),
        token_count: words(&article.text()).len(),
    }
}

fn count<'a>(terms: impl IntoIterator<Item = &'a String>) -> HashMap<&'a str, usize> {
    let mut counts = HashMap::new();
    for term in terms {
        *counts.entry(term.as_str()).or_default() += 1;
    }
    counts
}

/// Terms at or above `threshold`, by descending count then alphabetically.
fn trending(counts: HashMap<&str, usize>, threshold: u32) -> Vec<TermCount> {
    let mut items: Vec<TermCount> = counts
        .into_iter()
        .filter(|&(_, n)| n >= threshold as usize)
        .map(|(term, n)| TermCount::new(term, n))
        .collect();
    items.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.term.cmp(&b.term)));
    items
}

/// Build the trending report for `batch`. An empty batch yields an empty report.
#[instrument(level = "info", skip_all, fields(articles = batch.len(), threshold = config.threshold))]
pub fn detect_trending(batch: &[Article], config: &TrendConfig) -> TrendingReport {
    if batch.is_empty() {
        info!("No articles to analyze for trending topics");
        return TrendingReport::empty(config.window_hours, config.threshold);
    }

    let terms: Vec<ArticleTerms> = batch.iter().map(|a| article_terms(a, config)).collect();

    let top_keywords = trending(count(terms.iter().flat_map(|t| &t.keywords)), config.threshold);
    let top_phrases = trending(count(terms.iter().flat_map(|t| &t.phrases)), config.threshold);

    let mut by_category: BTreeMap<&str, Vec<&String>> = BTreeMap::new();
    for (article, t) in batch.iter().zip(&terms) {
        by_category
            .entry(article.primary_category())
            .or_default()
            .extend(&t.keywords);
    }
    let per_category: BTreeMap<String, Vec<TermCount>> = by_category
        .into_iter()
        .map(|(category, keywords)| {
            (category.to_string(), trending(count(keywords), config.threshold))
        })
        .collect();

    let report = TrendingReport {
        top_keywords,
        top_phrases,
        per_category,
        window_hours: config.window_hours,
        articles_analyzed: batch.len(),
        threshold: config.threshold,
    };
    log_report(&report);
    report
}

fn log_report(report: &TrendingReport) {
    info!(
        window_hours = report.window_hours,
        articles = report.articles_analyzed,
        threshold = report.threshold,
        keywords = report.top_keywords.len(),
        phrases = report.top_phrases.len(),
        "Trending detection complete"
    );
    for t in report.leading_keywords(5) {
        info!(term = %t.term, mentions = t.count, "Trending keyword");
    }
    for (category, items) in &report.per_category {
        if !items.is_empty() {
            debug!(%category, topics = items.len(), "Trending by category");
        }
    }
}

/// Sum of report counts for each distinct trending keyword or phrase the
/// article contains, divided by its token count. `0.0` when nothing matches.
pub fn article_trending_score(article: &Article, report: &TrendingReport, config: &TrendConfig) -> f64 {
    let terms = article_terms(article, config);
    if terms.token_count == 0 {
        return 0.0;
    }
    let keywords: HashSet<&str> = terms.keywords.iter().map(String::as_str).collect();
    let phrases: HashSet<&str> = terms.phrases.iter().map(String::as_str).collect();

    let total: usize = keywords
        .into_iter()
        .filter_map(|k| report.keyword_count(k))
        .chain(phrases.into_iter().filter_map(|p| report.phrase_count(p)))
        .sum();

    if total == 0 {
        0.0
    } else {
        total as f64 / terms.token_count as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ClassificationResult, RawArticle};
    use chrono::Utc;

    fn article(link: &str, title: &str, summary: &str) -> Article {
        Article::from_raw(
            RawArticle {
                title: title.to_string(),
                link: link.to_string(),
                summary_text: summary.to_string(),
                published_at: None,
                source: "example.com".to_string(),
                origin_category: None,
            },
            Utc::now(),
        )
    }

    fn with_category(a: Article, category: &str) -> Article {
        a.with_classification(ClassificationResult {
            primary_category: category.to_string(),
            ..ClassificationResult::general()
        })
    }

    fn config(threshold: i64) -> TrendConfig {
        TrendConfig::new(threshold)
    }

    #[test]
    fn test_extract_keywords_filters_stopwords_and_short_tokens() {
        let kws = extract_keywords("The WHO says it will fight the new virus, and it is spreading.", &config(3));
        assert_eq!(kws, vec!["fight", "virus", "spreading"]);
    }

    #[test]
    fn test_min_keyword_length_is_configurable() {
        let mut cfg = config(3);
        cfg.min_keyword_length = 6;
        assert_eq!(extract_keywords("virus spreading fast", &cfg), vec!["spreading"]);
    }

    #[test]
    fn test_extra_stopwords() {
        let mut cfg = config(3);
        cfg.extra_stopwords = vec!["reuters".to_string()];
        assert_eq!(extract_keywords("Reuters reports floods", &cfg), vec!["reports", "floods"]);
    }

    #[test]
    fn test_phrases_do_not_cross_sentences() {
        let joined = extract_phrases(&["Vaccine rollout begins. Hospitals prepare"], &config(3));
        assert!(joined.contains(&"begins hospitals".to_string()));

        let split = split_sentences("Vaccine rollout begins. Hospitals prepare");
        let phrases = extract_phrases(&split, &config(3));
        assert_eq!(phrases, vec!["vaccine rollout", "rollout begins", "hospitals prepare"]);
    }

    #[test]
    fn test_empty_batch() {
        let report = detect_trending(&[], &config(3));
        assert!(report.top_keywords.is_empty());
        assert!(report.top_phrases.is_empty());
        assert!(report.per_category.is_empty());
        assert_eq!(report.articles_analyzed, 0);
        assert_eq!(report.threshold, 3);
    }

    #[test]
    fn test_threshold_boundary() {
        let below = vec![
            article("a", "Flood warning issued", ""),
            article("b", "Flood waters rise", ""),
        ];
        let report = detect_trending(&below, &config(3));
        assert_eq!(report.keyword_count("flood"), None);

        let mut at = below.clone();
        at.push(article("c", "Flood damage assessed", ""));
        let report = detect_trending(&at, &config(3));
        assert_eq!(report.keyword_count("flood"), Some(3));
    }

    #[test]
    fn test_sorted_by_count_then_alphabetically() {
        let batch = vec![
            article("a", "zebra apple mango", ""),
            article("b", "zebra apple mango", ""),
            article("c", "zebra apple", ""),
        ];
        let report = detect_trending(&batch, &config(2));
        let terms: Vec<(&str, usize)> = report
            .top_keywords
            .iter()
            .map(|t| (t.term.as_str(), t.count))
            .collect();
        assert_eq!(terms, vec![("apple", 3), ("zebra", 3), ("mango", 2)]);

        let phrases: Vec<(&str, usize)> = report
            .top_phrases
            .iter()
            .map(|t| (t.term.as_str(), t.count))
            .collect();
        assert_eq!(phrases, vec![("zebra apple", 3), ("apple mango", 2)]);
    }

    #[test]
    fn test_single_article_outbreak_counted_twice() {
        let a = article(
            "a",
            "WHO declares new pandemic outbreak",
            "Health officials are tracking the outbreak across several regions.",
        );
        let report = detect_trending(&[a], &config(2));
        assert_eq!(report.keyword_count("outbreak"), Some(2));
        assert_eq!(report.articles_analyzed, 1);
    }

    #[test]
    fn test_per_category_restricted_to_primary_category() {
        let batch = vec![
            with_category(article("a", "Vaccine supply grows", ""), "health"),
            with_category(article("b", "Vaccine trial results", ""), "health"),
            with_category(article("c", "Vaccine stocks slump", ""), "economy"),
        ];
        let report = detect_trending(&batch, &config(2));
        assert_eq!(report.keyword_count("vaccine"), Some(3));
        assert_eq!(report.per_category["health"], vec![TermCount::new("vaccine", 2)]);
        assert!(report.per_category["economy"].is_empty());
    }

    #[test]
    fn test_article_trending_score() {
        let batch = vec![
            article("a", "Flood warning issued", ""),
            article("b", "Flood warning extended", ""),
            article("c", "Election results announced", ""),
        ];
        let cfg = config(2);
        let report = detect_trending(&batch, &cfg);
        // flood (2) + warning (2) + "flood warning" (2) over 3 tokens
        let score = article_trending_score(&batch[0], &report, &cfg);
        assert!((score - 2.0).abs() < f64::EPSILON);
        assert_eq!(article_trending_score(&batch[2], &report, &cfg), 0.0);
    }

    #[test]
    fn test_trending_score_empty_article() {
        let report = TrendingReport::empty(24, 3);
        let a = article("a", "", "");
        assert_eq!(article_trending_score(&a, &report, &config(3)), 0.0);
    }
}
