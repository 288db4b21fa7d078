//! Fetching listing pages with retry, backoff and user-agent rotation.
//!
//! # Retry policy
//!
//! | Response | Outcome |
//! |----------|---------|
//! | 200 | parse and return [`FetchOutcome::Success`] |
//! | 200, body unreadable | [`FetchOutcome::TransientFailure`] |
//! | 404 | [`FetchOutcome::NotFound`], no retry |
//! | 403, 409, 500, anything else | log, back off `attempt × step`, retry |
//! | timeout / connection error | log, back off, retry |
//!
//! After `max_retries` failed attempts the result is
//! [`FetchOutcome::ExhaustedRetries`]. Every attempt is preceded by a short
//! randomised pause and a freshly picked user agent.

use crate::config::CrawlConfig;
use crate::error::TransportError;
use crate::outputs::RawPageSink;
use crate::pacing::{Pacer, Pause, wait};
use crate::utils::truncate_for_log;
use rand::{Rng, rng};
use reqwest::header::{self, HeaderMap, HeaderValue};
use scraper::Html;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// Status code and body of one HTTP exchange.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

/// Performs a single GET. Implementations do not retry.
pub trait Transport {
    async fn get(&self, url: &str, user_agent: &str) -> Result<HttpResponse, TransportError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    async fn get(&self, url: &str, user_agent: &str) -> Result<HttpResponse, TransportError> {
        (**self).get(url, user_agent).await
    }
}

/// [`Transport`] over a single pooled `reqwest::Client`, so sequential
/// requests reuse connections.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
        );
        headers.insert(header::ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;
        Ok(Self { client })
    }
}

impl Transport for ReqwestTransport {
    async fn get(&self, url: &str, user_agent: &str) -> Result<HttpResponse, TransportError> {
        let response = self
            .client
            .get(url)
            .header(header::USER_AGENT, user_agent)
            .send()
            .await?;
        let status = response.status().as_u16();
        let body = if response.status().is_success() {
            response.text().await.map_err(|e| TransportError::Body(e.to_string()))?
        } else {
            // error pages are only logged, a broken one is not worth failing over
            response.text().await.unwrap_or_default()
        };
        Ok(HttpResponse { status, body })
    }
}

/// Result of fetching one page, consumed immediately by the crawler.
#[derive(Debug)]
pub enum FetchOutcome {
    Success(Html),
    /// The page does not exist; retrying would not help.
    NotFound,
    /// The server answered but the page could not be used.
    TransientFailure(String),
    /// Every attempt failed; carries the last failure.
    ExhaustedRetries(String),
    /// Cancellation fired while waiting between attempts.
    Cancelled,
}

pub struct Fetcher<T, P> {
    transport: T,
    pacer: P,
    user_agents: Vec<String>,
    start_url: String,
    raw_sink: Option<Box<dyn RawPageSink>>,
    raw_saved: bool,
    cancel: CancellationToken,
}

impl<T: Transport, P: Pacer> Fetcher<T, P> {
    pub fn new(transport: T, pacer: P, config: &CrawlConfig, cancel: CancellationToken) -> Self {
        Self {
            transport,
            pacer,
            user_agents: config.user_agents.clone(),
            start_url: config.base_url.to_string(),
            raw_sink: None,
            raw_saved: false,
            cancel,
        }
    }

    /// Save the start page's body through `sink` the first time it is fetched.
    pub fn with_raw_sink(mut self, sink: Box<dyn RawPageSink>) -> Self {
        self.raw_sink = Some(sink);
        self
    }

    #[cfg(test)]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn pacer(&self) -> &P {
        &self.pacer
    }

    fn pick_user_agent(&self) -> &str {
        if self.user_agents.is_empty() {
            return "";
        }
        let idx = rng().random_range(0..self.user_agents.len());
        &self.user_agents[idx]
    }

    async fn save_raw(&mut self, url: &str, body: &str) {
        if self.raw_saved || url != self.start_url {
            return;
        }
        self.raw_saved = true;
        if let Some(sink) = self.raw_sink.as_mut() {
            if let Err(e) = sink.save(url, body).await {
                warn!(error = %e, "Failed to save debug HTML; continuing");
            }
        }
    }

    /// Fetch `url`, making at most `max_retries` attempts.
    #[instrument(level = "info", skip(self), fields(%url))]
    pub async fn fetch(&mut self, url: &str, max_retries: u32) -> FetchOutcome {
        let mut last_failure = String::from("no attempt made");

        for attempt in 1..=max_retries {
            if !wait(self.pacer.delay_for(Pause::BeforeAttempt), &self.cancel).await {
                return FetchOutcome::Cancelled;
            }

            let user_agent = self.pick_user_agent();
            info!(attempt, max = max_retries, "Fetching URL");
            debug!(%user_agent, "Using user agent");

            let response = self.transport.get(url, user_agent).await;
            match response {
                Ok(HttpResponse { status: 200, body }) => {
                    info!(status = 200, bytes = body.len(), "Page fetched");
                    self.save_raw(url, &body).await;
                    return FetchOutcome::Success(Html::parse_document(&body));
                }
                Ok(HttpResponse { status: 404, .. }) => {
                    warn!(status = 404, "Page not found");
                    return FetchOutcome::NotFound;
                }
                Ok(HttpResponse { status, body }) => {
                    match status {
                        403 | 409 => warn!(status, "Access forbidden; the site may have anti-scraping measures"),
                        500 => warn!(status, "Server error"),
                        _ => warn!(status, "Unexpected status code"),
                    }
                    debug!(body = %truncate_for_log(&body, 300), "Error response body");
                    last_failure = format!("HTTP {status}");
                }
                Err(TransportError::Body(reason)) => {
                    warn!(%reason, "Response body could not be read");
                    return FetchOutcome::TransientFailure(reason);
                }
                Err(e) => {
                    warn!(error = %e, "Request error");
                    last_failure = e.to_string();
                }
            }

            if attempt < max_retries {
                let delay = self.pacer.delay_for(Pause::Backoff { attempt });
                info!(?delay, "Waiting before retry");
                if !wait(delay, &self.cancel).await {
                    return FetchOutcome::Cancelled;
                }
            }
        }

        error!(attempts = max_retries, reason = %last_failure, "Failed to fetch page after all attempts");
        FetchOutcome::ExhaustedRetries(last_failure)
    }
}
