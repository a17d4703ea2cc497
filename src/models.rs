//! Data models for ingested articles, their enrichment, and the run report.
//!
//! This module defines the structures that flow through the pipeline:
//! - [`RawArticle`]: an item as delivered by the feed collaborator
//! - [`Article`]: a batch member, enriched stage by stage
//! - [`ClassificationResult`], [`AnalysisResult`], [`SummaryResult`]: per-stage outputs
//! - [`TrendingReport`]: batch-wide keyword and phrase frequencies
//! - [`Report`]: the assembled result handed to the export collaborator
//!
//! Stages never rewrite each other's output. An [`Article`] gains exactly one
//! result per stage through its `with_*` builder methods.

use crate::config::GENERAL_CATEGORY;
use crate::utils::sanitize_text;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A news item as produced by the feed collaborator, before any analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawArticle {
    pub title: String,
    /// Identity key of the article within a batch.
    pub link: String,
    pub summary_text: String,
    /// Missing timestamps are treated as "now" by the orchestrator.
    pub published_at: Option<DateTime<Utc>>,
    pub source: String,
    /// Category hint from the originating feed.
    pub origin_category: Option<String>,
}

/// Coarse severity of an article.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImpactLevel {
    #[default]
    Low,
    Medium,
    High,
}

impl fmt::Display for ImpactLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImpactLevel::Low => write!(f, "low"),
            ImpactLevel::Medium => write!(f, "medium"),
            ImpactLevel::High => write!(f, "high"),
        }
    }
}

/// Lexicon-based polarity of an article.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    #[default]
    Neutral,
    Negative,
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sentiment::Positive => write!(f, "positive"),
            Sentiment::Neutral => write!(f, "neutral"),
            Sentiment::Negative => write!(f, "negative"),
        }
    }
}

/// Gazetteer matches, each list deduplicated in order of first mention.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entities {
    pub locations: Vec<String>,
    pub organizations: Vec<String>,
    pub countries: Vec<String>,
}

impl Entities {
    pub fn is_empty(&self) -> bool {
        self.locations.is_empty() && self.organizations.is_empty() && self.countries.is_empty()
    }

    /// `(kind, values)` pairs in a fixed order, for reporting.
    pub fn by_kind(&self) -> [(&'static str, &[String]); 3] {
        [
            ("locations", &self.locations),
            ("organizations", &self.organizations),
            ("countries", &self.countries),
        ]
    }
}

/// Classifier output for one article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub primary_category: String,
    /// Other matching categories, by descending match count then priority.
    pub secondary_categories: Vec<String>,
    /// Distinct keyword matches per configured category, in declaration order.
    pub category_scores: Vec<(String, usize)>,
    pub is_sensitive: bool,
    pub sensitive_topics: Vec<String>,
}

impl ClassificationResult {
    /// The result for text that matched nothing.
    pub fn general() -> Self {
        Self {
            primary_category: GENERAL_CATEGORY.to_string(),
            secondary_categories: Vec::new(),
            category_scores: Vec::new(),
            is_sensitive: false,
            sensitive_topics: Vec::new(),
        }
    }
}

/// Context analyzer output for one article.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub impact_level: ImpactLevel,
    pub sentiment: Sentiment,
    pub entities: Entities,
}

/// Summarizer output for one article.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryResult {
    pub summary: String,
    pub insight: String,
}

/// States of the pipeline, in transition order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Ingested,
    Deduplicated,
    Classified,
    TrendAnalyzed,
    ContextAnalyzed,
    Summarized,
    Assembled,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Ingested => "ingested",
            Stage::Deduplicated => "deduplicated",
            Stage::Classified => "classified",
            Stage::TrendAnalyzed => "trend_analyzed",
            Stage::ContextAnalyzed => "context_analyzed",
            Stage::Summarized => "summarized",
            Stage::Assembled => "assembled",
        };
        f.write_str(name)
    }
}

/// Whether an article went through every stage cleanly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ArticleStatus {
    #[default]
    Complete,
    /// Analysis failed at `stage`; downstream fields hold neutral defaults.
    Partial { stage: Stage, reason: String },
}

/// One member of the batch under analysis.
///
/// The raw fields are fixed at ingestion. Each stage attaches its own result
/// and leaves the others untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    pub summary_text: String,
    pub link: String,
    pub source: String,
    pub published_at: DateTime<Utc>,
    pub origin_category: String,
    pub classification: Option<ClassificationResult>,
    pub analysis: Option<AnalysisResult>,
    pub summary: Option<SummaryResult>,
    /// Relative to the batch it was computed from; never compare across runs.
    pub trending_score: f64,
    pub status: ArticleStatus,
}

/// Articles of one run, in ingestion order, unique by link.
pub type ArticleBatch = Vec<Article>;

impl Article {
    /// Ingest a raw item. Text is sanitized; a missing timestamp becomes `now`.
    pub fn from_raw(raw: RawArticle, now: DateTime<Utc>) -> Self {
        let origin_category = raw
            .origin_category
            .map(|c| c.trim().to_lowercase())
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| GENERAL_CATEGORY.to_string());
        Self {
            title: sanitize_text(&raw.title),
            summary_text: sanitize_text(&raw.summary_text),
            link: raw.link.trim().to_string(),
            source: raw.source,
            published_at: raw.published_at.unwrap_or(now),
            origin_category,
            classification: None,
            analysis: None,
            summary: None,
            trending_score: 0.0,
            status: ArticleStatus::Complete,
        }
    }

    /// `title` and `summary_text` joined, the text every stage analyzes.
    pub fn text(&self) -> String {
        format!("{} {}", self.title, self.summary_text)
    }

    pub fn with_classification(mut self, classification: ClassificationResult) -> Self {
        self.classification = Some(classification);
        self
    }

    pub fn with_analysis(mut self, analysis: AnalysisResult) -> Self {
        self.analysis = Some(analysis);
        self
    }

    pub fn with_summary(mut self, summary: SummaryResult) -> Self {
        self.summary = Some(summary);
        self
    }

    pub fn with_trending_score(mut self, score: f64) -> Self {
        self.trending_score = score;
        self
    }

    /// Record a recovered failure. The first failure wins.
    pub fn mark_partial(mut self, stage: Stage, reason: impl Into<String>) -> Self {
        if self.status == ArticleStatus::Complete {
            self.status = ArticleStatus::Partial {
                stage,
                reason: reason.into(),
            };
        }
        self
    }

    pub fn is_partial(&self) -> bool {
        matches!(self.status, ArticleStatus::Partial { .. })
    }

    pub fn primary_category(&self) -> &str {
        self.classification
            .as_ref()
            .map(|c| c.primary_category.as_str())
            .unwrap_or(GENERAL_CATEGORY)
    }

    pub fn secondary_categories(&self) -> &[String] {
        self.classification
            .as_ref()
            .map(|c| c.secondary_categories.as_slice())
            .unwrap_or_default()
    }

    pub fn is_sensitive(&self) -> bool {
        self.classification.as_ref().is_some_and(|c| c.is_sensitive)
    }

    pub fn sensitive_topics(&self) -> &[String] {
        self.classification
            .as_ref()
            .map(|c| c.sensitive_topics.as_slice())
            .unwrap_or_default()
    }

    pub fn impact_level(&self) -> ImpactLevel {
        self.analysis.as_ref().map(|a| a.impact_level).unwrap_or_default()
    }

    pub fn sentiment(&self) -> Sentiment {
        self.analysis.as_ref().map(|a| a.sentiment).unwrap_or_default()
    }

    pub fn entities(&self) -> Option<&Entities> {
        self.analysis.as_ref().map(|a| &a.entities)
    }

    pub fn summary(&self) -> &str {
        self.summary.as_ref().map(|s| s.summary.as_str()).unwrap_or_default()
    }

    pub fn insight(&self) -> &str {
        self.summary.as_ref().map(|s| s.insight.as_str()).unwrap_or_default()
    }
}

/// A keyword or phrase with its batch-wide mention count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermCount {
    pub term: String,
    pub count: usize,
}

impl TermCount {
    pub fn new(term: impl Into<String>, count: usize) -> Self {
        Self {
            term: term.into(),
            count,
        }
    }
}

/// Trending keywords and phrases of one batch.
///
/// Lists hold only terms at or above `threshold`, sorted by descending count
/// and alphabetically on ties. Built fresh every run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendingReport {
    pub top_keywords: Vec<TermCount>,
    pub top_phrases: Vec<TermCount>,
    pub per_category: BTreeMap<String, Vec<TermCount>>,
    pub window_hours: u32,
    pub articles_analyzed: usize,
    pub threshold: u32,
}

impl TrendingReport {
    pub fn empty(window_hours: u32, threshold: u32) -> Self {
        Self {
            top_keywords: Vec::new(),
            top_phrases: Vec::new(),
            per_category: BTreeMap::new(),
            window_hours,
            articles_analyzed: 0,
            threshold,
        }
    }

    pub fn keyword_count(&self, term: &str) -> Option<usize> {
        self.top_keywords.iter().find(|t| t.term == term).map(|t| t.count)
    }

    pub fn phrase_count(&self, term: &str) -> Option<usize> {
        self.top_phrases.iter().find(|t| t.term == term).map(|t| t.count)
    }

    /// Leading `n` keywords, for presentation.
    pub fn leading_keywords(&self, n: usize) -> &[TermCount] {
        &self.top_keywords[..n.min(self.top_keywords.len())]
    }

    pub fn leading_phrases(&self, n: usize) -> &[TermCount] {
        &self.top_phrases[..n.min(self.top_phrases.len())]
    }
}

/// Classification rollup over a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryStats {
    pub total: usize,
    pub by_category: BTreeMap<String, usize>,
    pub sensitive_count: usize,
    pub multi_category_count: usize,
}

/// Impact, sentiment and entity rollup over a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub total_articles: usize,
    pub impact_distribution: BTreeMap<ImpactLevel, usize>,
    pub sentiment_distribution: BTreeMap<Sentiment, usize>,
    /// Entity kind → most mentioned names, descending.
    pub top_entities: BTreeMap<String, Vec<TermCount>>,
    pub high_impact_count: usize,
    pub negative_sentiment_count: usize,
    pub partial_count: usize,
}

/// Per-category rollup shown at the head of each Markdown section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryDigest {
    pub category: String,
    pub total_articles: usize,
    pub high_impact: usize,
    pub medium_impact: usize,
    pub low_impact: usize,
    /// Most mentioned keywords in the category, descending.
    pub top_topics: Vec<TermCount>,
}

/// Overall outcome of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Success,
    PartialSuccess,
    Error,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Success => write!(f, "success"),
            RunStatus::PartialSuccess => write!(f, "partial_success"),
            RunStatus::Error => write!(f, "error"),
        }
    }
}

/// A feed that could not be retrieved during ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedFailure {
    pub url: String,
    pub error: String,
}

/// The assembled result of one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub status: RunStatus,
    pub articles: ArticleBatch,
    pub trending: TrendingReport,
    pub analysis: AnalysisSummary,
    pub category_stats: CategoryStats,
    pub feed_errors: Vec<FeedFailure>,
}

impl Report {
    pub fn partial_count(&self) -> usize {
        self.articles.iter().filter(|a| a.is_partial()).count()
    }

    /// Articles whose primary category is `category`.
    pub fn articles_in(&self, category: &str) -> impl Iterator<Item = &Article> {
        self.articles
            .iter()
            .filter(move |a| a.primary_category() == category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn raw() -> RawArticle {
        RawArticle {
            title: "  WHO   declares outbreak ".to_string(),
            link: " https://example.com/a ".to_string(),
            summary_text: "Details at https://example.com/more here.".to_string(),
            published_at: None,
            source: "example.com".to_string(),
            origin_category: Some("Health".to_string()),
        }
    }

    #[test]
    fn test_from_raw_sanitizes_and_defaults_timestamp() {
        let now = Utc.with_ymd_and_hms(2025, 5, 6, 12, 0, 0).unwrap();
        let article = Article::from_raw(raw(), now);
        assert_eq!(article.title, "WHO declares outbreak");
        assert_eq!(article.summary_text, "Details at here.");
        assert_eq!(article.link, "https://example.com/a");
        assert_eq!(article.published_at, now);
        assert_eq!(article.origin_category, "health");
        assert_eq!(article.status, ArticleStatus::Complete);
    }

    #[test]
    fn test_missing_origin_category_is_general() {
        let mut r = raw();
        r.origin_category = Some("   ".to_string());
        let article = Article::from_raw(r, Utc::now());
        assert_eq!(article.origin_category, "general");
    }

    #[test]
    fn test_unclassified_accessors_fall_back() {
        let article = Article::from_raw(raw(), Utc::now());
        assert_eq!(article.primary_category(), "general");
        assert!(!article.is_sensitive());
        assert_eq!(article.impact_level(), ImpactLevel::Low);
        assert_eq!(article.sentiment(), Sentiment::Neutral);
        assert_eq!(article.summary(), "");
        assert!(article.secondary_categories().is_empty());
    }

    #[test]
    fn test_mark_partial_keeps_first_failure() {
        let article = Article::from_raw(raw(), Utc::now())
            .mark_partial(Stage::Deduplicated, "first")
            .mark_partial(Stage::Classified, "second");
        assert_eq!(
            article.status,
            ArticleStatus::Partial {
                stage: Stage::Deduplicated,
                reason: "first".to_string()
            }
        );
        assert!(article.is_partial());
    }

    #[test]
    fn test_status_serialization() {
        let status = ArticleStatus::Partial {
            stage: Stage::TrendAnalyzed,
            reason: "boom".to_string(),
        };
        let json = serde_json::to_string(&status).unwrap();
        assert_eq!(json, r#"{"state":"partial","stage":"trend_analyzed","reason":"boom"}"#);
        assert_eq!(serde_json::to_string(&ArticleStatus::Complete).unwrap(), r#"{"state":"complete"}"#);
    }

    #[test]
    fn test_impact_and_sentiment_serialize_lowercase() {
        assert_eq!(serde_json::to_string(&ImpactLevel::High).unwrap(), "\"high\"");
        assert_eq!(serde_json::to_string(&Sentiment::Negative).unwrap(), "\"negative\"");
        assert_eq!(serde_json::to_string(&RunStatus::PartialSuccess).unwrap(), "\"partial_success\"");
    }

    #[test]
    fn test_trending_report_leading_slices() {
        let mut report = TrendingReport::empty(24, 3);
        report.top_keywords = vec![TermCount::new("outbreak", 5), TermCount::new("vaccine", 3)];
        assert_eq!(report.leading_keywords(1).len(), 1);
        assert_eq!(report.leading_keywords(10).len(), 2);
        assert_eq!(report.keyword_count("vaccine"), Some(3));
        assert_eq!(report.keyword_count("missing"), None);
        assert!(report.leading_phrases(5).is_empty());
    }
}
