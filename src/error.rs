//! Error types shared across the crawler.
//!
//! Each layer gets its own enum so callers can decide what is fatal:
//! - [`ConfigError`]: bad settings, detected before any request is made
//! - [`TransportError`]: a single HTTP attempt failed below the status-code level
//! - [`ExtractionError`]: one candidate block was rejected; never escapes a page
//! - [`SinkError`]: persisting records or the debug page failed

use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("no base URL configured (use --base-url or `base_url` in the config file)")]
    MissingBaseUrl,

    #[error("no start date configured (use --start-date or `start_date` in the config file)")]
    MissingStartDate,

    #[error("invalid base URL {url}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("invalid setting `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Failure of a single HTTP attempt that never produced a usable status.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("request failed: {0}")]
    Request(String),

    /// The server answered but the body could not be read or decoded.
    #[error("failed to read response body: {0}")]
    Body(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout
        } else if err.is_body() || err.is_decode() {
            TransportError::Body(err.to_string())
        } else {
            TransportError::Request(err.to_string())
        }
    }
}

/// Why a candidate block did not become a record.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("no title found")]
    MissingTitle,

    #[error("title too short ({chars} chars): {title:?}")]
    TitleTooShort { title: String, chars: usize },

    #[error("dated {date}, outside {start}..={end}")]
    OutsideWindow {
        date: NaiveDate,
        start: NaiveDate,
        end: NaiveDate,
    },
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("I/O error writing {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error writing {path}: {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },

    #[error("JSON error writing {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}
