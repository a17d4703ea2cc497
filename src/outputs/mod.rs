//! Export of the assembled report to JSON, CSV and Markdown.
//!
//! # Submodules
//!
//! - [`json`]: full report and trending report as pretty JSON
//! - [`csv`]: one row per article
//! - [`markdown`]: articles grouped by category, plus the trending report
//!
//! # Output Structure
//!
//! ```text
//! output_dir/
//! ├── news_20250506_143000.json
//! ├── news_20250506_143000.csv
//! ├── news_20250506_143000.md
//! ├── trending_20250506_143000.json
//! └── trending_20250506_143000.md
//! ```
//!
//! A failing format is logged and the remaining formats are still written.

pub mod csv;
pub mod json;
pub mod markdown;

use crate::config::TrendConfig;
use crate::errors::ExportError;
use crate::models::Report;
use crate::utils::file_timestamp;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{error, info, instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ExportFormat {
    Json,
    Csv,
    Markdown,
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            "markdown" | "md" => Ok(ExportFormat::Markdown),
            other => Err(ExportError::UnknownFormat(other.to_string())),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportFormat::Json => write!(f, "json"),
            ExportFormat::Csv => write!(f, "csv"),
            ExportFormat::Markdown => write!(f, "markdown"),
        }
    }
}

/// Write `report` in each requested format. Returns the files written, by
/// format; unknown or failing formats are logged and skipped. The trending
/// report is written alongside as `trending_<ts>.json` and `trending_<ts>.md`.
#[instrument(level = "info", skip_all, fields(dir = %dir.display(), formats = ?formats))]
pub async fn export_all(
    report: &Report,
    trend: &TrendConfig,
    dir: &Path,
    formats: &[String],
) -> BTreeMap<String, PathBuf> {
    let stamp = file_timestamp(report.completed_at);
    let news_stem = format!("news_{stamp}");
    let trending_stem = format!("trending_{stamp}");
    let mut written = BTreeMap::new();

    for name in formats {
        let format = match name.parse::<ExportFormat>() {
            Ok(format) => format,
            Err(e) => {
                error!(error = %e, "Skipping export format");
                continue;
            }
        };
        let result = match format {
            ExportFormat::Json => json::write_report(report, dir, &news_stem).await,
            ExportFormat::Csv => csv::write_articles(&report.articles, dir, &news_stem).await,
            ExportFormat::Markdown => {
                let md = markdown::report_to_markdown(report, trend);
                markdown::write_markdown(&md, dir, &news_stem).await
            }
        };
        record(&mut written, format.to_string(), result);
    }

    record(
        &mut written,
        "trending_json".to_string(),
        json::write_trending(&report.trending, dir, &trending_stem).await,
    );
    let md = markdown::trending_to_markdown(&report.trending, report.completed_at);
    record(
        &mut written,
        "trending_markdown".to_string(),
        markdown::write_markdown(&md, dir, &trending_stem).await,
    );

    info!(files = written.len(), "Export complete");
    written
}

fn record(
    written: &mut BTreeMap<String, PathBuf>,
    key: String,
    result: Result<PathBuf, ExportError>,
) {
    match result {
        Ok(path) => {
            written.insert(key, path);
        }
        Err(e) => error!(format = %key, error = %e, "Export failed"),
    }
}
