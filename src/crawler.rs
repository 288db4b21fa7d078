//! The page-by-page crawl loop.
//!
//! Each iteration fetches one listing page, extracts candidates, drops
//! duplicates and out-of-window records, appends the rest to the results and
//! looks for the next page. The loop ends when:
//!
//! - the fetch does not succeed (not found, failed, retries exhausted)
//! - there is no next page, or it points at a page already visited
//! - the page ceiling is reached
//! - cancellation fires (checked at the top of every iteration and during
//!   every wait)
//! - page processing panics
//!
//! Whatever the reason, the accumulated results are handed to the record sink
//! exactly once.

use crate::config::CrawlConfig;
use crate::dedupe::Deduplicator;
use crate::extract::Extractor;
use crate::fetcher::{FetchOutcome, Fetcher, Transport};
use crate::models::{ArticleRecord, CrawlReport, StopReason};
use crate::outputs::RecordSink;
use crate::pacing::{Pacer, Pause, wait};
use crate::pagination::{NextPage, PaginationResolver};
use scraper::Html;
use std::any::Any;
use std::collections::HashSet;
use std::panic::{AssertUnwindSafe, catch_unwind};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};
use url::Url;

/// Mutable state of one run, owned by the crawler.
#[derive(Debug)]
struct CrawlState {
    current_page_url: Url,
    /// 1-based index of the page being processed.
    page_index: u32,
    pages_fetched: u32,
    visited_urls: HashSet<String>,
    results: Vec<ArticleRecord>,
    dedupe: Deduplicator,
}

impl CrawlState {
    fn new(start: Url) -> Self {
        Self {
            current_page_url: start,
            page_index: 0,
            pages_fetched: 0,
            visited_urls: HashSet::new(),
            results: Vec::new(),
            dedupe: Deduplicator::new(),
        }
    }
}

pub struct Crawler<'a, T, P> {
    config: &'a CrawlConfig,
    fetcher: Fetcher<T, P>,
    extractor: Extractor,
    pagination: PaginationResolver,
    cancel: CancellationToken,
}

impl<'a, T: Transport, P: Pacer> Crawler<'a, T, P> {
    pub fn new(config: &'a CrawlConfig, fetcher: Fetcher<T, P>, cancel: CancellationToken) -> Self {
        Self {
            config,
            fetcher,
            extractor: Extractor::from_config(config),
            pagination: PaginationResolver::new(config.base_url.clone()),
            cancel,
        }
    }

    /// Crawl from the configured base URL and hand the results to `sink`.
    #[instrument(level = "info", skip_all, fields(start = %self.config.base_url))]
    pub async fn run(mut self, sink: &mut impl RecordSink) -> CrawlReport {
        let mut state = CrawlState::new(self.config.base_url.clone());
        let stop = self.crawl(&mut state).await;
        info!(reason = %stop, pages = state.pages_fetched, "Crawl stopped");
        hand_off(state, stop, sink).await
    }

    async fn crawl(&mut self, state: &mut CrawlState) -> StopReason {
        loop {
            if self.cancel.is_cancelled() {
                return StopReason::Cancelled;
            }

            state.page_index += 1;
            let url = state.current_page_url.to_string();
            info!(page = state.page_index, url = %url, "Processing page");
            state.visited_urls.insert(url.clone());

            let next = match self.fetcher.fetch(&url, self.config.max_retries).await {
                FetchOutcome::Success(document) => {
                    state.pages_fetched += 1;
                    match catch_unwind(AssertUnwindSafe(|| self.process_page(&document, state))) {
                        Ok(next) => next,
                        Err(payload) => {
                            let message = panic_message(payload.as_ref());
                            error!(page = state.page_index, %message, "Page processing failed");
                            return StopReason::Internal(message);
                        }
                    }
                }
                FetchOutcome::NotFound => return StopReason::NotFound(url),
                FetchOutcome::TransientFailure(reason) => return StopReason::FetchFailed { url, reason },
                FetchOutcome::ExhaustedRetries(reason) => return StopReason::RetriesExhausted { url, reason },
                FetchOutcome::Cancelled => return StopReason::Cancelled,
            };

            let next = match next {
                NextPage::Found(_, next) => next,
                NextPage::AlreadyVisited(next) => {
                    warn!(next = %next, "Next page was already visited, ending crawl");
                    return StopReason::CycleDetected(next);
                }
                NextPage::Absent => {
                    info!("No next page found, ending crawl");
                    return StopReason::NoNextPage;
                }
            };
            if state.page_index >= self.config.max_pages {
                info!(max_pages = self.config.max_pages, "Reached page limit");
                return StopReason::PageLimit(self.config.max_pages);
            }
            let next_url = match Url::parse(&next) {
                Ok(u) => u,
                Err(e) => return StopReason::Internal(format!("invalid next page URL {next}: {e}")),
            };

            let delay = self.fetcher.pacer().delay_for(Pause::BetweenPages);
            info!(?delay, "Waiting before next page");
            if !wait(delay, &self.cancel).await {
                return StopReason::Cancelled;
            }
            state.current_page_url = next_url;
        }
    }

    /// Extract, dedupe and filter one page's records into `state`, then find
    /// the next page.
    fn process_page(&self, document: &Html, state: &mut CrawlState) -> NextPage {
        let candidates = self.extractor.extract(document);
        let found = candidates.len();
        let window = self.config.window;
        let fresh: Vec<ArticleRecord> = state
            .dedupe
            .admit(candidates)
            .into_iter()
            .filter(|r| window.admits(r.published_date))
            .collect();

        info!(
            page = state.page_index,
            candidates = found,
            new = fresh.len(),
            total = state.results.len() + fresh.len(),
            "Page processed"
        );
        state.results.extend(fresh);

        self.pagination
            .find_next(document, &state.current_page_url, &state.visited_urls)
    }
}

async fn hand_off(state: CrawlState, stop: StopReason, sink: &mut impl RecordSink) -> CrawlReport {
    let records_found = state.results.len();
    if stop.is_partial() {
        warn!(records = records_found, reason = %stop, "Crawl ended early; saving partial results");
    }
    info!(records = records_found, "Total articles found");

    let handoff_error = match sink.accept(&state.results).await {
        Ok(written) => {
            info!(written, "Results handed off");
            None
        }
        Err(e) => {
            error!(error = %e, "Failed to save results");
            Some(e)
        }
    };

    CrawlReport {
        pages_fetched: state.pages_fetched,
        records_found,
        stop,
        handoff_error,
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
