//! JSON output.
//!
//! Records are written as a pretty-printed array using the same flat shape
//! as the CSV file, so absent dates appear as `""` rather than `null`.

use super::{RecordRow, RecordSink};
use crate::error::SinkError;
use crate::models::ArticleRecord;
use tokio::fs;
use tracing::{error, info, instrument};

#[derive(Debug, Clone)]
pub struct JsonSink {
    path: String,
}

impl JsonSink {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

impl RecordSink for JsonSink {
    /// Write `records` to the configured JSON file as one array.
    ///
    /// # Arguments
    ///
    /// * `records` - The crawl results, in the order they were found
    ///
    /// # Returns
    ///
    /// The number of records written, or `Ok(0)` without touching the file
    /// when there is nothing to save.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::Json`] if serialization fails and
    /// [`SinkError::Io`] if the file cannot be written.
    #[instrument(level = "info", skip_all, fields(path = %self.path))]
    async fn accept(&mut self, records: &[ArticleRecord]) -> Result<usize, SinkError> {
        if records.is_empty() {
            info!("No data to save");
            return Ok(0);
        }

        let rows: Vec<RecordRow<'_>> = records.iter().map(RecordRow::from).collect();
        let json = serde_json::to_string_pretty(&rows).map_err(|source| SinkError::Json {
            path: self.path.clone(),
            source,
        })?;

        info!(path = %self.path, "Writing JSON");
        if let Err(e) = fs::write(&self.path, json).await {
            error!(error = %e, "Failed to write JSON file");
            return Err(SinkError::Io {
                path: self.path.clone(),
                source: e,
            });
        }

        info!(count = rows.len(), "Data also saved to JSON");
        Ok(rows.len())
    }
}
