//! Command-line interface definitions for Pegasus News.
//!
//! All options can be given as flags or environment variables. Values given
//! here override the configuration file.

use clap::Parser;

/// Command-line arguments for one pipeline run.
///
/// # Examples
///
/// ```sh
/// # Defaults: built-in feeds and keywords, export to ./exports
/// pegasus_news
///
/// # Custom config, last 12 hours, trending threshold 2
/// pegasus_news --config config.yaml --hours 12 --threshold 2
///
/// # Health articles only, JSON and Markdown
/// pegasus_news --category health --format json --format markdown
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to a YAML configuration file
    #[arg(short, long, env = "PEGASUS_CONFIG")]
    pub config: Option<String>,

    /// Directory for export files (overrides `export.output_dir`)
    #[arg(short, long, env = "PEGASUS_OUTPUT_DIR")]
    pub output_dir: Option<String>,

    /// Only analyze articles published in the last N hours
    #[arg(long, allow_negative_numbers = true)]
    pub hours: Option<i64>,

    /// Minimum mentions for a keyword or phrase to trend
    #[arg(short, long, allow_negative_numbers = true)]
    pub threshold: Option<i64>,

    /// Export format (json, csv, markdown); repeat for several
    #[arg(short, long = "format")]
    pub formats: Vec<String>,

    /// Only export articles whose primary category matches
    #[arg(long)]
    pub category: Option<String>,

    /// Run the analysis and log the summary without writing files
    #[arg(long)]
    pub no_export: bool,
}
