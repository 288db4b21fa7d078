//! Raw HTML of the start page, kept for working out why selectors miss.

use super::{RawPageSink, SaveFuture};
use crate::error::SinkError;
use tokio::fs;
use tracing::{info, instrument};

#[derive(Debug, Clone)]
pub struct DebugHtmlFile {
    path: String,
}

impl DebugHtmlFile {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    /// Write `body` to the configured path, replacing any earlier file.
    ///
    /// # Arguments
    ///
    /// * `url` - Where the page came from, for the log line only
    /// * `body` - The page's HTML as received
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::Io`] if the file cannot be written.
    #[instrument(level = "info", skip_all, fields(path = %self.path))]
    pub async fn write(&self, url: &str, body: &str) -> Result<(), SinkError> {
        fs::write(&self.path, body).await.map_err(|source| SinkError::Io {
            path: self.path.clone(),
            source,
        })?;
        info!(%url, bytes = body.len(), "Saved debug HTML");
        Ok(())
    }
}

impl RawPageSink for DebugHtmlFile {
    fn save<'a>(&'a mut self, url: &'a str, body: &'a str) -> SaveFuture<'a> {
        Box::pin(self.write(url, body))
    }
}
