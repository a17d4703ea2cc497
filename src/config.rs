//! Run configuration.
//!
//! The on-disk shape is [`AppConfig`], a YAML document where every section is
//! optional and falls back to the built-in defaults. It is validated once into
//! an [`AnalysisConfig`], the immutable value handed by reference to every
//! analysis stage. Nothing in the analysis core reads global state.

use crate::errors::ConfigError;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::fs;
use tracing::{info, instrument, warn};

/// Category used when no configured category matches an article.
pub const GENERAL_CATEGORY: &str = "general";

pub const DEFAULT_TRENDING_THRESHOLD: u32 = 3;
pub const DEFAULT_WINDOW_HOURS: u32 = 24;
pub const DEFAULT_MIN_KEYWORD_LENGTH: usize = 3;
pub const DEFAULT_PHRASE_LENGTH: usize = 2;
pub const DEFAULT_SUMMARY_MIN_LENGTH: usize = 150;
pub const DEFAULT_SUMMARY_MAX_LENGTH: usize = 500;

/// How a configured term is located inside normalized article text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPolicy {
    /// Term must start and end on a word boundary. A plain inflection suffix
    /// (`s`, `es`, `ed`, `ing`) is tolerated before the closing boundary.
    #[default]
    WordBoundary,
    /// Raw substring containment: "war" matches "warm".
    Substring,
}

/// One RSS/Atom feed and the category hint attached to its articles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedSource {
    pub url: String,
    #[serde(default = "general_category")]
    pub category: String,
}

fn general_category() -> String {
    GENERAL_CATEGORY.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryConfig {
    pub name: String,
    pub keywords: Vec<String>,
    #[serde(default)]
    pub sensitive_keywords: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendingSettings {
    /// Minimum batch-wide mentions. Non-positive values fall back to the default.
    pub threshold: i64,
    pub window_hours: i64,
    pub min_keyword_length: usize,
    pub phrase_length: usize,
    pub extra_stopwords: Vec<String>,
}

impl Default for TrendingSettings {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_TRENDING_THRESHOLD as i64,
            window_hours: DEFAULT_WINDOW_HOURS as i64,
            min_keyword_length: DEFAULT_MIN_KEYWORD_LENGTH,
            phrase_length: DEFAULT_PHRASE_LENGTH,
            extra_stopwords: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SummarySettings {
    pub min_length: usize,
    pub max_length: usize,
}

impl Default for SummarySettings {
    fn default() -> Self {
        Self {
            min_length: DEFAULT_SUMMARY_MIN_LENGTH,
            max_length: DEFAULT_SUMMARY_MAX_LENGTH,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImpactLexicon {
    pub high: Vec<String>,
    pub medium: Vec<String>,
    /// Distinct medium-tier hits needed to lift an otherwise low article to medium.
    pub medium_tier_min_hits: usize,
}

impl Default for ImpactLexicon {
    fn default() -> Self {
        Self {
            high: strings(&[
                "crisis", "emergency", "disaster", "deadly", "fatal", "severe", "collapse",
                "critical", "urgent", "warning", "threat", "attack",
            ]),
            medium: strings(&[
                "significant", "major", "important", "serious", "concern", "issue", "problem",
                "challenge", "risk", "developing",
            ]),
            medium_tier_min_hits: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SentimentLexicon {
    pub positive: Vec<String>,
    pub negative: Vec<String>,
}

impl Default for SentimentLexicon {
    fn default() -> Self {
        Self {
            positive: strings(&[
                "improvement", "growth", "success", "positive", "benefit", "recovery",
                "increase", "boost", "advantage", "gain", "rally",
            ]),
            negative: strings(&[
                "decline", "loss", "crisis", "failure", "negative", "decrease", "fall", "threat",
                "risk", "danger", "concern",
            ]),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Gazetteer {
    pub countries: Vec<String>,
    pub organizations: Vec<String>,
    pub locations: Vec<String>,
}

impl Default for Gazetteer {
    fn default() -> Self {
        Self {
            countries: strings(&[
                "Afghanistan", "Albania", "Algeria", "Argentina", "Australia", "Austria",
                "Bangladesh", "Belgium", "Brazil", "Bulgaria", "Canada", "Chile", "China",
                "Colombia", "Croatia", "Cuba", "Czech Republic", "Denmark", "Egypt", "Estonia",
                "Finland", "France", "Germany", "Greece", "Hungary", "Iceland", "India",
                "Indonesia", "Iran", "Iraq", "Ireland", "Israel", "Italy", "Japan", "Jordan",
                "Kazakhstan", "Kenya", "Kuwait", "Latvia", "Lebanon", "Lithuania", "Luxembourg",
                "Malaysia", "Mexico", "Morocco", "Myanmar", "Netherlands", "New Zealand",
                "Nigeria", "North Korea", "Norway", "Pakistan", "Peru", "Philippines", "Poland",
                "Portugal", "Qatar", "Romania", "Russia", "Saudi Arabia", "Serbia", "Singapore",
                "Slovakia", "Slovenia", "South Africa", "South Korea", "Spain", "Sweden",
                "Switzerland", "Syria", "Taiwan", "Thailand", "Turkey", "Ukraine",
                "United Arab Emirates", "United Kingdom", "UK", "United States", "USA",
                "Vietnam", "Yemen",
            ]),
            organizations: strings(&[
                "WHO", "CDC", "FDA", "United Nations", "NATO", "World Bank", "IMF",
                "Federal Reserve", "European Central Bank", "World Health Organization",
            ]),
            locations: strings(&[
                "New York", "Washington", "London", "Paris", "Tokyo", "Beijing", "Moscow",
                "Berlin", "Rome", "California", "Texas", "Florida", "Southeast Asia",
            ]),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    pub max_retries: usize,
    pub base_delay_ms: u64,
    pub timeout_secs: u64,
    pub max_concurrent_fetches: usize,
    pub user_agent: String,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1000,
            timeout_secs: 30,
            max_concurrent_fetches: 4,
            user_agent: format!("pegasus_news/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    pub output_dir: String,
    pub formats: Vec<String>,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            output_dir: "exports".to_string(),
            formats: strings(&["json", "csv", "markdown"]),
        }
    }
}

/// Configuration file shape. Every section may be omitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub feeds: Vec<FeedSource>,
    pub categories: Vec<CategoryConfig>,
    pub match_policy: MatchPolicy,
    pub trending: TrendingSettings,
    pub summary: SummarySettings,
    pub impact: ImpactLexicon,
    pub sentiment: SentimentLexicon,
    pub gazetteer: Gazetteer,
    pub fetch: FetchSettings,
    pub export: ExportSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            feeds: default_feeds(),
            categories: default_categories(),
            match_policy: MatchPolicy::default(),
            trending: TrendingSettings::default(),
            summary: SummarySettings::default(),
            impact: ImpactLexicon::default(),
            sentiment: SentimentLexicon::default(),
            gazetteer: Gazetteer::default(),
            fetch: FetchSettings::default(),
            export: ExportSettings::default(),
        }
    }
}

fn default_feeds() -> Vec<FeedSource> {
    let feed = |url: &str, category: &str| FeedSource {
        url: url.to_string(),
        category: category.to_string(),
    };
    vec![
        feed("https://www.who.int/rss-feeds/news-english.xml", "health"),
        feed("https://www.cdc.gov/api/v2/resources/rss/742226", "health"),
        feed("http://feeds.feedburner.com/healthcentral/News", "health"),
        feed("https://feeds.feedburner.com/WarNewsUpdates", "military"),
        feed("http://feeds.feedburner.com/DefenseNews", "military"),
        feed("https://feeds.finance.yahoo.com/rss/2.0/headline", "economy"),
        feed("http://feeds.reuters.com/news/wealth", "economy"),
        feed("http://feeds.bbci.co.uk/news/rss.xml", "general"),
        feed("https://feeds.npr.org/1001/rss.xml", "general"),
        feed("http://feeds.reuters.com/reuters/topNews", "general"),
    ]
}

fn default_categories() -> Vec<CategoryConfig> {
    vec![
        CategoryConfig {
            name: "health".to_string(),
            keywords: strings(&[
                "who", "outbreak", "virus", "vaccine", "hospital", "disease", "epidemic",
                "pandemic", "health", "medical", "doctor", "patient", "symptom", "treatment",
                "drug", "medicine", "covid", "flu", "infection", "contagious", "quarantine", "cdc",
                "fda", "clinic", "emergency", "public health", "mortality", "morbidity",
            ]),
            sensitive_keywords: strings(&[
                "outbreak", "epidemic", "pandemic", "new virus", "contagious",
            ]),
        },
        CategoryConfig {
            name: "military".to_string(),
            keywords: strings(&[
                "missile", "army", "drone", "navy", "defense", "military", "conflict", "war",
                "weapon", "tank", "soldier", "troops", "air force", "marine", "combat", "attack",
                "invasion", "exercise", "security", "battle", "strike", "bombing", "artillery",
                "helicopter", "jet", "submarine", "aircraft carrier", "peacekeeping", "ceasefire",
                "treaty",
            ]),
            sensitive_keywords: strings(&[
                "nuclear", "war declaration", "invasion", "attack", "conflict escalation",
            ]),
        },
        CategoryConfig {
            name: "economy".to_string(),
            keywords: strings(&[
                "inflation", "bitcoin", "bank", "dollar", "market", "stock", "crypto", "currency",
                "economy", "economic", "finance", "financial", "investment", "trading",
                "exchange", "rate", "interest rate", "central bank", "recession", "growth", "gdp",
                "fund", "price", "cost", "tax", "budget", "debt", "credit", "loan", "earnings",
            ]),
            sensitive_keywords: strings(&[
                "crisis", "collapse", "recession", "crash", "bankruptcy", "default",
            ]),
        },
    ]
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Lowercase, trim, drop empties and duplicates while keeping declaration order.
fn normalize_terms(terms: &[String]) -> Vec<String> {
    terms
        .iter()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .unique()
        .collect()
}

/// Load configuration from a YAML file, or the built-in defaults when `path` is `None`.
#[instrument(level = "info")]
pub fn load_config(path: Option<&str>) -> Result<AppConfig, ConfigError> {
    let Some(path) = path else {
        info!("No config file given; using built-in defaults");
        return Ok(AppConfig::default());
    };

    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_string(),
        source,
    })?;
    let config = parse_config(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_string(),
        source,
    })?;
    info!(
        path,
        feeds = config.feeds.len(),
        categories = config.categories.len(),
        "Loaded configuration"
    );
    Ok(config)
}

pub fn parse_config(raw: &str) -> Result<AppConfig, serde_yaml::Error> {
    serde_yaml::from_str(raw)
}

impl AppConfig {
    /// Apply command-line overrides on top of the file values.
    pub fn with_overrides(mut self, window_hours: Option<i64>, threshold: Option<i64>) -> Self {
        if let Some(hours) = window_hours {
            self.trending.window_hours = hours;
        }
        if let Some(threshold) = threshold {
            self.trending.threshold = threshold;
        }
        self
    }

    /// Validate and freeze the settings the analysis core consumes.
    pub fn analysis_config(&self) -> Result<AnalysisConfig, ConfigError> {
        let registry = KeywordRegistry::from_config(&self.categories, self.match_policy)?;

        let window_hours = match u32::try_from(self.trending.window_hours) {
            Ok(hours) if hours > 0 => hours,
            _ => {
                return Err(ConfigError::InvalidValue {
                    field: "trending.window_hours",
                    reason: format!("must be a positive hour count, got {}", self.trending.window_hours),
                });
            }
        };
        if self.trending.min_keyword_length == 0 {
            return Err(ConfigError::InvalidValue {
                field: "trending.min_keyword_length",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.trending.phrase_length < 2 {
            return Err(ConfigError::InvalidValue {
                field: "trending.phrase_length",
                reason: format!("must be at least 2, got {}", self.trending.phrase_length),
            });
        }
        if self.summary.max_length == 0 || self.summary.min_length > self.summary.max_length {
            return Err(ConfigError::InvalidValue {
                field: "summary",
                reason: format!(
                    "need max_length > 0 and min_length <= max_length, got min {} max {}",
                    self.summary.min_length, self.summary.max_length
                ),
            });
        }

        let mut trend = TrendConfig::new(self.trending.threshold);
        trend.window_hours = window_hours;
        trend.min_keyword_length = self.trending.min_keyword_length;
        trend.phrase_length = self.trending.phrase_length;
        trend.extra_stopwords = normalize_terms(&self.trending.extra_stopwords);

        Ok(AnalysisConfig {
            registry,
            trend,
            context: ContextConfig {
                policy: self.match_policy,
                high_impact: normalize_terms(&self.impact.high),
                medium_impact: normalize_terms(&self.impact.medium),
                medium_tier_min_hits: self.impact.medium_tier_min_hits.max(1),
                positive: normalize_terms(&self.sentiment.positive),
                negative: normalize_terms(&self.sentiment.negative),
                gazetteer: self.gazetteer.clone(),
            },
            summary: SummaryConfig {
                min_length: self.summary.min_length,
                max_length: self.summary.max_length,
            },
        })
    }
}

/// One topical category with normalized keyword sets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryDefinition {
    pub name: String,
    pub keywords: Vec<String>,
    pub sensitive_keywords: Vec<String>,
}

/// Categories that always win score ties, strongest first.
pub const PRIORITY_CATEGORIES: [&str; 3] = ["health", "military", "economy"];

/// Ordered category definitions. Ties rank [`PRIORITY_CATEGORIES`] first,
/// then other categories in declaration order, then `general`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordRegistry {
    pub categories: Vec<CategoryDefinition>,
    pub policy: MatchPolicy,
}

impl KeywordRegistry {
    pub fn from_config(
        categories: &[CategoryConfig],
        policy: MatchPolicy,
    ) -> Result<Self, ConfigError> {
        if categories.is_empty() {
            return Err(ConfigError::EmptyRegistry);
        }
        let mut definitions: Vec<CategoryDefinition> = Vec::with_capacity(categories.len());
        for category in categories {
            let name = category.name.trim().to_lowercase();
            if definitions.iter().any(|d| d.name == name) {
                return Err(ConfigError::DuplicateCategory(name));
            }
            let keywords = normalize_terms(&category.keywords);
            if keywords.is_empty() {
                return Err(ConfigError::EmptyCategory(name));
            }
            definitions.push(CategoryDefinition {
                name,
                keywords,
                sensitive_keywords: normalize_terms(&category.sensitive_keywords),
            });
        }
        Ok(Self {
            categories: definitions,
            policy,
        })
    }

    pub fn get(&self, name: &str) -> Option<&CategoryDefinition> {
        self.categories.iter().find(|c| c.name == name)
    }

    /// Priority rank of a category; lower wins ties. Unknown names rank after
    /// every declared category, `general` ranks last.
    pub fn priority(&self, name: &str) -> usize {
        if let Some(rank) = PRIORITY_CATEGORIES.iter().position(|c| *c == name) {
            return rank;
        }
        if name == GENERAL_CATEGORY {
            return usize::MAX;
        }
        PRIORITY_CATEGORIES.len()
            + self
                .categories
                .iter()
                .position(|c| c.name == name)
                .unwrap_or(self.categories.len())
    }
}

/// Trend extraction settings after validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrendConfig {
    pub threshold: u32,
    pub window_hours: u32,
    pub min_keyword_length: usize,
    pub phrase_length: usize,
    pub extra_stopwords: Vec<String>,
}

impl TrendConfig {
    /// Build with the given threshold; zero or negative values are rejected
    /// and replaced by [`DEFAULT_TRENDING_THRESHOLD`].
    pub fn new(threshold: i64) -> Self {
        let threshold = if threshold <= 0 {
            warn!(
                threshold,
                fallback = DEFAULT_TRENDING_THRESHOLD,
                "Invalid trending threshold; using default"
            );
            DEFAULT_TRENDING_THRESHOLD
        } else {
            u32::try_from(threshold).unwrap_or(u32::MAX)
        };
        Self {
            threshold,
            ..Self::default()
        }
    }
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_TRENDING_THRESHOLD,
            window_hours: DEFAULT_WINDOW_HOURS,
            min_keyword_length: DEFAULT_MIN_KEYWORD_LENGTH,
            phrase_length: DEFAULT_PHRASE_LENGTH,
            extra_stopwords: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextConfig {
    pub policy: MatchPolicy,
    pub high_impact: Vec<String>,
    pub medium_impact: Vec<String>,
    pub medium_tier_min_hits: usize,
    pub positive: Vec<String>,
    pub negative: Vec<String>,
    pub gazetteer: Gazetteer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SummaryConfig {
    pub min_length: usize,
    pub max_length: usize,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            min_length: DEFAULT_SUMMARY_MIN_LENGTH,
            max_length: DEFAULT_SUMMARY_MAX_LENGTH,
        }
    }
}

/// Everything the analysis core needs, validated and immutable for the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisConfig {
    pub registry: KeywordRegistry,
    pub trend: TrendConfig,
    pub context: ContextConfig,
    pub summary: SummaryConfig,
}

#[cfg(test)]
impl Default for AnalysisConfig {
    fn default() -> Self {
        AppConfig::default()
            .analysis_config()
            .expect("built-in defaults are valid")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = AnalysisConfig::default();
        let names: Vec<&str> = config
            .registry
            .categories
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(names, vec!["health", "military", "economy"]);
        assert_eq!(config.trend.threshold, 3);
        assert_eq!(config.trend.window_hours, 24);
        assert_eq!(config.summary.max_length, 500);
    }

    #[test]
    fn test_registry_priority_is_fixed_then_declared() {
        let config = AnalysisConfig::default();
        assert!(config.registry.priority("health") < config.registry.priority("military"));
        assert!(config.registry.priority("military") < config.registry.priority("economy"));
        assert!(config.registry.priority("economy") < config.registry.priority(GENERAL_CATEGORY));

        let reordered = KeywordRegistry {
            categories: config.registry.categories.iter().rev().cloned().collect(),
            policy: config.registry.policy,
        };
        assert_eq!(reordered.priority("health"), 0);
        assert_eq!(reordered.priority("economy"), 2);
        assert!(reordered.priority("unlisted") < reordered.priority(GENERAL_CATEGORY));
    }

    #[test]
    fn test_normalize_terms_dedupes_in_order() {
        let terms = strings(&["Conflict", "war", " conflict ", "", "WAR", "battle"]);
        assert_eq!(normalize_terms(&terms), strings(&["conflict", "war", "battle"]));
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let raw = r#"
trending:
  threshold: 5
match_policy: substring
"#;
        let config = parse_config(raw).unwrap();
        assert_eq!(config.trending.threshold, 5);
        assert_eq!(config.trending.window_hours, 24);
        assert_eq!(config.match_policy, MatchPolicy::Substring);
        assert_eq!(config.categories.len(), 3);
        assert!(!config.feeds.is_empty());
    }

    #[test]
    fn test_non_positive_threshold_falls_back() {
        assert_eq!(TrendConfig::new(0).threshold, DEFAULT_TRENDING_THRESHOLD);
        assert_eq!(TrendConfig::new(-4).threshold, DEFAULT_TRENDING_THRESHOLD);
        assert_eq!(TrendConfig::new(7).threshold, 7);
    }

    #[test]
    fn test_empty_registry_is_fatal() {
        let config = AppConfig {
            categories: vec![],
            ..AppConfig::default()
        };
        assert!(matches!(
            config.analysis_config(),
            Err(ConfigError::EmptyRegistry)
        ));
    }

    #[test]
    fn test_category_without_keywords_is_fatal() {
        let config = AppConfig {
            categories: vec![CategoryConfig {
                name: "health".to_string(),
                keywords: strings(&["  "]),
                sensitive_keywords: vec![],
            }],
            ..AppConfig::default()
        };
        assert!(matches!(
            config.analysis_config(),
            Err(ConfigError::EmptyCategory(name)) if name == "health"
        ));
    }

    #[test]
    fn test_duplicate_category_is_fatal() {
        let mut categories = default_categories();
        categories.push(categories[0].clone());
        let config = AppConfig {
            categories,
            ..AppConfig::default()
        };
        assert!(matches!(
            config.analysis_config(),
            Err(ConfigError::DuplicateCategory(_))
        ));
    }

    #[test]
    fn test_invalid_window_is_fatal() {
        let config = AppConfig::default().with_overrides(Some(0), None);
        assert!(matches!(
            config.analysis_config(),
            Err(ConfigError::InvalidValue { field: "trending.window_hours", .. })
        ));
    }

    #[test]
    fn test_invalid_summary_bounds_are_fatal() {
        let mut config = AppConfig::default();
        config.summary.min_length = 600;
        assert!(config.analysis_config().is_err());

        config.summary.min_length = 0;
        assert_eq!(config.analysis_config().unwrap().summary.min_length, 0);

        config.summary.max_length = 0;
        let err = config.analysis_config().unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid setting `summary`: need max_length > 0 and min_length <= max_length, got min 0 max 0"
        );
    }

    #[test]
    fn test_overrides_apply() {
        let config = AppConfig::default().with_overrides(Some(48), Some(2));
        let analysis = config.analysis_config().unwrap();
        assert_eq!(analysis.trend.window_hours, 48);
        assert_eq!(analysis.trend.threshold, 2);
    }

    #[test]
    fn test_load_config_missing_file() {
        let err = load_config(Some("/nonexistent/pegasus.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
