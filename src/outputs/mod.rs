//! Where crawl results go.
//!
//! The crawler hands its records to a [`RecordSink`] exactly once, at the
//! end of a run (including runs cut short by errors), and may hand the raw
//! start page to a [`RawPageSink`] for later inspection.
//!
//! # Submodules
//!
//! - [`csv`]: tabular output, one row per record
//! - [`json`]: pretty-printed JSON array with the same columns
//! - [`raw`]: saves the first listing page's HTML to disk
//!
//! A `(first, second)` pair of record sinks is itself a record sink, which
//! is how `main` writes CSV and JSON from one hand-off.

pub mod csv;
pub mod json;
pub mod raw;

use crate::error::SinkError;
use crate::models::ArticleRecord;
use serde::Serialize;
use std::future::Future;
use std::pin::Pin;

/// Receives the final, ordered records of a crawl.
pub trait RecordSink {
    /// Persist `records`.
    ///
    /// # Returns
    ///
    /// How many records were written. An empty slice writes nothing and
    /// returns `Ok(0)`.
    ///
    /// # Errors
    ///
    /// Returns a [`SinkError`] if the destination cannot be created or written.
    async fn accept(&mut self, records: &[ArticleRecord]) -> Result<usize, SinkError>;
}

/// Future returned by [`RawPageSink::save`].
pub type SaveFuture<'a> = Pin<Box<dyn Future<Output = Result<(), SinkError>> + 'a>>;

/// Receives the raw body of the start page, at most once per run.
///
/// The fetcher holds this as a trait object, so `save` returns a boxed future.
pub trait RawPageSink {
    fn save<'a>(&'a mut self, url: &'a str, body: &'a str) -> SaveFuture<'a>;
}

impl<A: RecordSink, B: RecordSink> RecordSink for (A, B) {
    /// Both sinks are always attempted; the first error is returned.
    async fn accept(&mut self, records: &[ArticleRecord]) -> Result<usize, SinkError> {
        let first = self.0.accept(records).await;
        let second = self.1.accept(records).await;
        let written = first?;
        second?;
        Ok(written)
    }
}

impl<S: RecordSink> RecordSink for &mut S {
    async fn accept(&mut self, records: &[ArticleRecord]) -> Result<usize, SinkError> {
        (**self).accept(records).await
    }
}

/// Flat, write-ready view of a record. Absent values become empty strings.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct RecordRow<'a> {
    pub title: &'a str,
    pub url: &'a str,
    pub date: String,
    pub date_text: &'a str,
    pub excerpt: &'a str,
}

impl<'a> From<&'a ArticleRecord> for RecordRow<'a> {
    fn from(record: &'a ArticleRecord) -> Self {
        Self {
            title: &record.title,
            url: record.url.as_deref().unwrap_or_default(),
            date: record
                .published_date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            date_text: record.date_raw_text.as_deref().unwrap_or_default(),
            excerpt: &record.excerpt,
        }
    }
}
