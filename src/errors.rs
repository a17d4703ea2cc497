//! Error taxonomy for the news pipeline.
//!
//! Only [`ConfigError`] is fatal: it aborts the run before any article is
//! processed. [`FetchError`] is recorded per feed, [`AnalysisError`] per
//! article, and [`ExportError`] per output format. None of them stop the
//! batch.

use thiserror::Error;

/// Invalid or missing configuration. Fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("keyword registry is empty: at least one category must be configured")]
    EmptyRegistry,

    #[error("category `{0}` has no keywords")]
    EmptyCategory(String),

    #[error("category `{0}` is declared more than once")]
    DuplicateCategory(String),

    #[error("invalid setting `{field}`: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// Failure to retrieve or parse one feed.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("feed returned HTTP status {0}")]
    Status(u16),

    #[error("XML parsing failed: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("document is neither RSS nor Atom")]
    UnknownFormat,
}

/// Per-article analysis failure. Recovered locally by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalysisError {
    #[error("article has no link")]
    MissingLink,

    #[error("article {link} has neither title nor summary text")]
    EmptyText { link: String },
}

/// Failure to write one export format.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV serialization failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("unknown export format `{0}`")]
    UnknownFormat(String),
}
