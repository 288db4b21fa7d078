//! # Listing Harvest
//!
//! Crawls a paginated listing website, heuristically picks article summaries
//! out of each page, keeps those published inside a date window and saves
//! them as CSV and JSON.
//!
//! ## Features
//!
//! - Tolerates unknown and shifting markup: containers are found by a cascade
//!   of selector patterns with a generic fallback
//! - Follows pagination through `rel="next"` links, "next" anchors, numbered
//!   page lists or `/page/<n>` URLs, with a page ceiling and cycle guard
//! - Retries blocked or failing requests with linear backoff, rotating user
//!   agents and randomised pauses
//! - Hands whatever was collected to the output files even when the crawl is
//!   cut short by errors, Ctrl-C or a deadline
//!
//! ## Usage
//!
//! ```sh
//! listing_harvest -b https://news.example.com/category/local/ -s 2024-01-01
//! listing_harvest -c crawl.yaml --max-pages 10 --deadline-secs 600
//! ```
//!
//! ## Architecture
//!
//! 1. **Configuration**: defaults, then an optional YAML file, then CLI flags
//! 2. **Crawling**: fetch, extract, dedupe and filter page after page
//! 3. **Output**: write the accumulated records to CSV and JSON once

use clap::Parser;
use std::error::Error;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod config;
mod crawler;
mod dates;
mod dedupe;
mod error;
mod extract;
mod fetcher;
mod models;
mod outputs;
mod pacing;
mod pagination;
#[cfg(test)]
mod testing;
mod utils;

use cli::Cli;
use config::CrawlConfig;
use crawler::Crawler;
use fetcher::{Fetcher, ReqwestTransport};
use outputs::csv::CsvSink;
use outputs::json::JsonSink;
use outputs::raw::DebugHtmlFile;
use pacing::JitterPacer;
use utils::ensure_writable_parent;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("listing_harvest starting up");

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    let config = match CrawlConfig::load(&args) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return Err(e.into());
        }
    };
    info!(
        base_url = %config.base_url,
        start_date = %config.window.start,
        end_date = %config.window.end,
        max_pages = config.max_pages,
        "Loaded configuration"
    );

    // Early check: output locations must be writable before hours of crawling
    for path in [&config.output.csv_path, &config.output.json_path] {
        if let Err(e) = ensure_writable_parent(path).await {
            error!(
                path = %path,
                error = %e,
                "Output directory is not writable (fix perms or choose a different path)"
            );
            return Err(e);
        }
    }

    let cancel = CancellationToken::new();
    spawn_cancellation(cancel.clone(), args.deadline_secs.map(Duration::from_secs));

    let transport = ReqwestTransport::new(config.request_timeout)?;
    let mut fetcher = Fetcher::new(transport, JitterPacer::from_config(&config), &config, cancel.clone());
    if let Some(path) = &config.output.debug_html_path {
        fetcher = fetcher.with_raw_sink(Box::new(DebugHtmlFile::new(path.clone())));
    }

    let mut sinks = (
        CsvSink::new(config.output.csv_path.clone()),
        JsonSink::new(config.output.json_path.clone()),
    );
    let report = Crawler::new(&config, fetcher, cancel).run(&mut sinks).await;

    let elapsed = start_time.elapsed();
    info!(
        elapsed_secs = elapsed.as_secs_f64(),
        pages = report.pages_fetched,
        articles = report.records_found,
        stop = %report.stop,
        "Scraping completed"
    );

    if report.stop.is_partial() {
        warn!(
            articles = report.records_found,
            "Results are partial; the crawl did not reach the end of the listing"
        );
    }
    if report.succeeded() {
        return Ok(());
    }
    let reason = match &report.handoff_error {
        Some(e) => format!("failed to save results: {e}"),
        None => format!("crawl failed: {}", report.stop),
    };
    Err(reason.into())
}

/// Cancel `token` on Ctrl-C, and after `deadline` when one is given.
fn spawn_cancellation(token: CancellationToken, deadline: Option<Duration>) {
    let on_signal = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping after the current step");
            on_signal.cancel();
        }
    });

    if let Some(deadline) = deadline {
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(deadline) => {
                    warn!(?deadline, "Deadline reached, stopping crawl");
                    token.cancel();
                }
            }
        });
    }
}
