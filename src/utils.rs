//! Utility functions for text cleanup, string formatting, and file system checks.
//!
//! This module provides helpers used throughout the application:
//! - Text sanitation applied to every ingested article
//! - String truncation, slugification and capitalization for logs and Markdown
//! - Domain extraction for articles whose feed names no source
//! - File system validation for the export directory

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fs as stdfs;
use tokio::fs;
use tracing::{info, instrument};

static URL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"https?://\S+").unwrap());
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Remove URLs and collapse runs of whitespace.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(sanitize_text("see https://x.org  now"), "see now");
/// ```
pub fn sanitize_text(text: &str) -> String {
    let without_urls = URL_RE.replace_all(text, "");
    WHITESPACE_RE.replace_all(&without_urls, " ").trim().to_string()
}

/// Truncate a string for logging purposes.
///
/// Long strings are cut to `max` characters with an ellipsis and the number
/// of dropped bytes appended. Never splits a UTF-8 character.
pub fn truncate_for_log(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        None => s.to_string(),
        Some((cut, _)) => format!("{}…(+{} bytes)", &s[..cut], s.len() - cut),
    }
}

/// Convert a title to a URL-friendly slug for Markdown anchors.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(slugify_title("Hello World"), "hello-world");
/// ```
pub fn slugify_title(title: &str) -> String {
    title
        .to_lowercase()
        .replace(|c: char| !c.is_alphanumeric() && c != ' ' && c != '-', "")
        .replace(' ', "-")
}

/// Capitalize the first character of a string ("health" -> "Health").
pub fn upcase(s: &str) -> String {
    let mut c = s.chars();
    match c.next() {
        None => String::new(),
        Some(f) => f.to_uppercase().collect::<String>() + c.as_str(),
    }
}

/// Host of a URL without a leading `www.`, e.g. `https://www.bbc.co.uk/x` -> `bbc.co.uk`.
pub fn domain_of(link: &str) -> Option<String> {
    let parsed = url::Url::parse(link).ok()?;
    let host = parsed.host_str()?;
    Some(host.strip_prefix("www.").unwrap_or(host).to_string())
}

/// Timestamp used in export file names, e.g. `20250506_143000`.
pub fn file_timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y%m%d_%H%M%S").to_string()
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if needed, then writes and removes a probe file.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or is not writable.
#[instrument(level = "info", skip_all, fields(path = %path))]
pub async fn ensure_writable_dir(path: &str) -> Result<(), Box<dyn Error>> {
    if let Err(e) = fs::create_dir_all(path).await {
        return Err(Box::new(e));
    }
    let probe_path = format!("{}/..__probe_write__", path.trim_end_matches('/'));
    match stdfs::File::create(&probe_path) {
        Ok(_) => {
            let _ = stdfs::remove_file(&probe_path);
            info!("Output directory is writable");
            Ok(())
        }
        Err(e) => Err(Box::new(e)),
    }
}
