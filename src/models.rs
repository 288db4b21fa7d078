//! Data models produced by a crawl.
//!
//! - [`ArticleRecord`]: one article summary found on a listing page
//! - [`StopReason`]: why the page loop ended
//! - [`CrawlReport`]: what a finished run hands back to `main`

use crate::error::SinkError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An article summary extracted from a listing page.
///
/// Records reaching the result set always have a title of at least the
/// configured minimum length, and a `published_date` (when present) inside the
/// crawl's date window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleRecord {
    /// Headline text, whitespace collapsed.
    pub title: String,
    /// Absolute link to the article, when one could be resolved.
    pub url: Option<String>,
    /// Publication date, when a parseable one was found near the record.
    pub published_date: Option<NaiveDate>,
    /// The text the date was (or was last attempted to be) parsed from.
    pub date_raw_text: Option<String>,
    /// Short summary, capped in length.
    pub excerpt: String,
}

/// Why the crawl loop stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// The last page had no link to a further page.
    NoNextPage,
    /// The server said the page does not exist; the listing has ended.
    NotFound(String),
    /// The next link pointed back at a page already fetched.
    CycleDetected(String),
    /// The configured page ceiling was reached.
    PageLimit(u32),
    /// A 200 response could not be turned into a document.
    FetchFailed { url: String, reason: String },
    /// Every attempt to fetch the page failed.
    RetriesExhausted { url: String, reason: String },
    /// An external cancellation or deadline fired.
    Cancelled,
    /// Page processing failed unexpectedly.
    Internal(String),
}

impl StopReason {
    /// Stops that should be reported as a failed run.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            StopReason::FetchFailed { .. } | StopReason::RetriesExhausted { .. } | StopReason::Internal(_)
        )
    }

    /// Stops after which the results are known to be incomplete.
    pub fn is_partial(&self) -> bool {
        self.is_failure() || matches!(self, StopReason::Cancelled)
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::NoNextPage => write!(f, "no next page"),
            StopReason::NotFound(url) => write!(f, "page not found: {url}"),
            StopReason::CycleDetected(url) => write!(f, "next page already visited: {url}"),
            StopReason::PageLimit(n) => write!(f, "page limit of {n} reached"),
            StopReason::FetchFailed { url, reason } => write!(f, "failed to fetch {url}: {reason}"),
            StopReason::RetriesExhausted { url, reason } => {
                write!(f, "gave up on {url} after retries: {reason}")
            }
            StopReason::Cancelled => write!(f, "cancelled"),
            StopReason::Internal(msg) => write!(f, "internal failure: {msg}"),
        }
    }
}

/// Summary of a finished crawl. The records themselves have already been
/// handed to the record sink.
#[derive(Debug)]
pub struct CrawlReport {
    pub pages_fetched: u32,
    pub records_found: usize,
    pub stop: StopReason,
    /// Set when the record sink failed to persist the results.
    pub handoff_error: Option<SinkError>,
}

impl CrawlReport {
    pub fn succeeded(&self) -> bool {
        !self.stop.is_failure() && self.handoff_error.is_none()
    }
}
