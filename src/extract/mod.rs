//! Heuristic extraction of article summaries from listing pages.
//!
//! The markup of the target site is unknown and changes without notice, so
//! containers are located by an ordered cascade of selector patterns:
//!
//! 1. **Structured patterns** ([`CONTAINER_PATTERNS`]): every pattern that
//!    matches contributes candidates; patterns are not exclusive.
//! 2. **Generic fallback**: only when no structured pattern produced a
//!    record, any `div` with a class attribute that holds a heading and enough
//!    text is tried.
//!
//! Each container is then handed to [`fields::extract_record`]. Rejected
//! containers are logged and skipped; extraction itself never fails.
//! Duplicates are left in place for [`crate::dedupe`] to collapse.

pub mod fields;

use crate::config::CrawlConfig;
use crate::dates::DateWindow;
use crate::error::ExtractionError;
use crate::models::ArticleRecord;
use crate::utils::element_text;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Container patterns, most specific first.
pub const CONTAINER_PATTERNS: [&str; 10] = [
    ".post",
    "article",
    ".entry",
    ".news-item",
    ".card",
    "div.content > div",
    "div.main > div",
    ".main-content > div",
    ".post-box",
    ".article-box",
];

static CONTAINERS: Lazy<Vec<(&'static str, Selector)>> = Lazy::new(|| compile(&CONTAINER_PATTERNS));
static GENERIC_BLOCK: Lazy<Vec<(&'static str, Selector)>> = Lazy::new(|| compile(&["div[class]"]));
static HEADING: Lazy<Vec<(&'static str, Selector)>> = Lazy::new(|| compile(&["h1, h2, h3, h4"]));

/// Compile selector patterns, dropping (and logging) any that do not parse.
pub(crate) fn compile(patterns: &[&'static str]) -> Vec<(&'static str, Selector)> {
    patterns
        .iter()
        .filter_map(|pattern| match Selector::parse(pattern) {
            Ok(selector) => Some((*pattern, selector)),
            Err(e) => {
                warn!(pattern, error = ?e, "Skipping unparseable selector");
                None
            }
        })
        .collect()
}

/// Turns listing pages into candidate [`ArticleRecord`]s.
#[derive(Debug, Clone)]
pub struct Extractor {
    pub(crate) base_url: Url,
    pub(crate) window: DateWindow,
    pub(crate) excerpt_max_chars: usize,
    pub(crate) min_title_chars: usize,
    pub(crate) min_generic_text_chars: usize,
}

impl Extractor {
    pub fn from_config(config: &CrawlConfig) -> Self {
        Self {
            base_url: config.base_url.clone(),
            window: config.window,
            excerpt_max_chars: config.excerpt_max_chars,
            min_title_chars: config.min_title_chars,
            min_generic_text_chars: config.min_generic_text_chars,
        }
    }

    /// All candidate records on the page, in document order per pattern.
    #[instrument(level = "debug", skip_all)]
    pub fn extract(&self, document: &Html) -> Vec<ArticleRecord> {
        log_page_structure(document);

        let mut found = Vec::new();
        for (pattern, selector) in CONTAINERS.iter() {
            let before = found.len();
            let mut containers = 0usize;
            for container in document.select(selector) {
                containers += 1;
                if let Some(record) = self.candidate(container) {
                    found.push(record);
                }
            }
            if containers > 0 {
                debug!(
                    pattern,
                    containers,
                    records = found.len() - before,
                    "Matched article containers"
                );
            }
        }

        if found.is_empty() {
            info!("No articles found with specific selectors, trying general approach");
            found = self.extract_generic(document);
        }

        debug!(count = found.len(), "Candidate records on page");
        found
    }

    fn extract_generic(&self, document: &Html) -> Vec<ArticleRecord> {
        let mut found = Vec::new();
        for (_, selector) in GENERIC_BLOCK.iter() {
            for block in document.select(selector) {
                if self.looks_like_article(block) {
                    if let Some(record) = self.candidate(block) {
                        found.push(record);
                    }
                }
            }
        }
        found
    }

    /// A block qualifies for the generic pass if it has a heading and more
    /// text than navigation or footer chrome usually carries.
    fn looks_like_article(&self, block: ElementRef<'_>) -> bool {
        let has_heading = HEADING.iter().any(|(_, sel)| block.select(sel).next().is_some());
        has_heading && element_text(block).chars().count() > self.min_generic_text_chars
    }

    fn candidate(&self, container: ElementRef<'_>) -> Option<ArticleRecord> {
        match fields::extract_record(container, self) {
            Ok(record) => {
                debug!(title = %record.title, "Extracted article");
                Some(record)
            }
            Err(e @ ExtractionError::OutsideWindow { .. }) => {
                info!(reason = %e, "Skipping article outside date range");
                None
            }
            Err(e) => {
                debug!(reason = %e, "Skipping candidate");
                None
            }
        }
    }
}

/// Log the rough shape of a page: title, headings, likely containers and
/// pagination. Only runs when debug logging is on.
pub fn log_page_structure(document: &Html) {
    if !tracing::enabled!(tracing::Level::DEBUG) {
        return;
    }
    static STRUCTURE: Lazy<Vec<(&'static str, Selector)>> = Lazy::new(|| {
        compile(&[
            "title",
            "h1, h2, h3",
            ".post",
            ".article",
            ".entry",
            ".news-item",
            ".pagination, .nav-links, .page-numbers",
        ])
    });

    for (pattern, selector) in STRUCTURE.iter() {
        let matches: Vec<ElementRef<'_>> = document.select(selector).collect();
        match *pattern {
            "title" => {
                let title = matches.first().map(|t| element_text(*t)).unwrap_or_default();
                debug!(%title, "Page title");
            }
            "h1, h2, h3" => {
                let first: Vec<String> = matches.iter().take(5).map(|h| element_text(*h)).collect();
                debug!(count = matches.len(), ?first, "Page headings");
            }
            _ if !matches.is_empty() => {
                debug!(pattern, count = matches.len(), "Structural elements present");
            }
            _ => {}
        }
    }
}
