//! JSON export of the run report and the trending report.
//!
//! # Output Structure
//!
//! ```text
//! output_dir/
//! ├── news_20250506_143000.json      # full report with metadata header
//! └── trending_20250506_143000.json  # trending report only
//! ```

use crate::errors::ExportError;
use crate::models::{Report, RunStatus, TrendingReport};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument};

#[derive(Debug, Serialize)]
struct Metadata {
    exported_at: DateTime<Utc>,
    total_articles: usize,
    status: RunStatus,
    format: &'static str,
}

#[derive(Debug, Serialize)]
struct ReportDocument<'a> {
    metadata: Metadata,
    #[serde(flatten)]
    report: &'a Report,
}

/// Write the full [`Report`] to `{dir}/{stem}.json`, pretty printed.
#[instrument(level = "info", skip_all, fields(dir = %dir.display(), %stem))]
pub async fn write_report(report: &Report, dir: &Path, stem: &str) -> Result<PathBuf, ExportError> {
    let document = ReportDocument {
        metadata: Metadata {
            exported_at: Utc::now(),
            total_articles: report.articles.len(),
            status: report.status,
            format: "json",
        },
        report,
    };
    let json = serde_json::to_string_pretty(&document)?;

    let path = dir.join(format!("{stem}.json"));
    fs::write(&path, json).await?;
    info!(path = %path.display(), articles = report.articles.len(), "Wrote JSON report");
    Ok(path)
}

/// Write the [`TrendingReport`] alone to `{dir}/{stem}.json`.
#[instrument(level = "info", skip_all, fields(dir = %dir.display(), %stem))]
pub async fn write_trending(
    trending: &TrendingReport,
    dir: &Path,
    stem: &str,
) -> Result<PathBuf, ExportError> {
    let json = serde_json::to_string_pretty(trending)?;
    let path = dir.join(format!("{stem}.json"));
    fs::write(&path, json).await?;
    info!(path = %path.display(), keywords = trending.top_keywords.len(), "Wrote trending JSON");
    Ok(path)
}
