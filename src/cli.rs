//! Command-line interface definitions.
//!
//! Every option can also come from the YAML file passed with `--config`;
//! flags given here take precedence over the file.

use chrono::NaiveDate;
use clap::Parser;

/// Command-line arguments for a crawl run.
///
/// # Examples
///
/// ```sh
/// # Crawl a category listing for everything published in 2024
/// listing_harvest --base-url https://news.example.com/category/local/ \
///     --start-date 2024-01-01 --end-date 2024-12-31
///
/// # Settings from a file, with a hard deadline of ten minutes
/// listing_harvest -c crawl.yaml --deadline-secs 600
/// ```
#[derive(Parser, Debug, Default)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to a YAML settings file
    #[arg(short, long)]
    pub config: Option<String>,

    /// First listing page to crawl
    #[arg(short, long, env = "LISTING_BASE_URL")]
    pub base_url: Option<String>,

    /// Earliest publication date to keep (YYYY-MM-DD)
    #[arg(short, long)]
    pub start_date: Option<NaiveDate>,

    /// Latest publication date to keep (YYYY-MM-DD, defaults to today)
    #[arg(short, long)]
    pub end_date: Option<NaiveDate>,

    /// Maximum number of listing pages to fetch
    #[arg(long)]
    pub max_pages: Option<u32>,

    /// Attempts per page before giving up
    #[arg(long)]
    pub max_retries: Option<u32>,

    /// Where to write the CSV output
    #[arg(long)]
    pub csv_output: Option<String>,

    /// Where to write the JSON output
    #[arg(long)]
    pub json_output: Option<String>,

    /// Where to save the raw HTML of the first page
    #[arg(long)]
    pub debug_html: Option<String>,

    /// Abort the crawl (keeping partial results) after this many seconds
    #[arg(long)]
    pub deadline_secs: Option<u64>,
}
