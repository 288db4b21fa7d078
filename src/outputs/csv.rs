//! CSV output.
//!
//! Columns: `title,url,date,date_text,excerpt`. Missing URLs and dates are
//! written as empty cells. The file is replaced on every run.

use super::{RecordRow, RecordSink};
use crate::error::SinkError;
use crate::models::ArticleRecord;
use tokio::fs;
use tracing::{error, info, instrument};

#[derive(Debug, Clone)]
pub struct CsvSink {
    path: String,
}

impl CsvSink {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    fn io_error(&self, source: std::io::Error) -> SinkError {
        SinkError::Io {
            path: self.path.clone(),
            source,
        }
    }

    /// Render `records` as CSV text, header first.
    fn render(&self, records: &[ArticleRecord]) -> Result<Vec<u8>, SinkError> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        for record in records {
            writer
                .serialize(RecordRow::from(record))
                .map_err(|source| SinkError::Csv {
                    path: self.path.clone(),
                    source,
                })?;
        }
        writer.into_inner().map_err(|e| self.io_error(e.into_error()))
    }
}

impl RecordSink for CsvSink {
    /// Write `records` to the configured CSV file.
    ///
    /// # Arguments
    ///
    /// * `records` - The crawl results, in the order they were found
    ///
    /// # Returns
    ///
    /// The number of rows written, or `Ok(0)` without touching the file when
    /// there is nothing to save.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::Csv`] if a row cannot be serialized and
    /// [`SinkError::Io`] if the file cannot be written.
    #[instrument(level = "info", skip_all, fields(path = %self.path))]
    async fn accept(&mut self, records: &[ArticleRecord]) -> Result<usize, SinkError> {
        if records.is_empty() {
            info!("No data to save");
            return Ok(0);
        }

        let bytes = self.render(records)?;
        if let Err(e) = fs::write(&self.path, bytes).await {
            error!(error = %e, "Failed to write CSV file");
            return Err(self.io_error(e));
        }

        info!(count = records.len(), "Data saved to CSV");
        Ok(records.len())
    }
}
