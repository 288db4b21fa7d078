//! Loose date parsing for listing pages.
//!
//! Two shapes are recognised, tried in this order:
//! - numeric day-first dates: `15/01/2024`, `5-1-2024`
//! - month-name dates: `January 15, 2024` (case-insensitive)
//!
//! The first shape whose pattern matches anywhere in the text decides the
//! result; the month-name pattern is only tried when no numeric date is
//! present. A match that does not form a real calendar day yields `None`.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

static NUMERIC_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{1,2})[-/](\d{1,2})[-/](\d{4})").expect("numeric date regex"));

static MONTH_NAME_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\w+)\s+(\d{1,2}),\s+(\d{4})").expect("month-name date regex"));

const MONTHS: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

/// Parse the first recognisable date in `text`.
pub fn parse(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Some(caps) = NUMERIC_DATE.captures(text) {
        let day = caps[1].parse().ok()?;
        let month = caps[2].parse().ok()?;
        let year = caps[3].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    if let Some(caps) = MONTH_NAME_DATE.captures(text) {
        let month = month_number(&caps[1]);
        let day = caps[2].parse().ok()?;
        let year = caps[3].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    None
}

/// Look through free text for a date, returning it with the matched snippet.
///
/// Each pattern is searched in turn and the first snippet that parses wins,
/// so a bogus numeric match (`45/99/2024`) does not hide a later
/// `March 3, 2024`.
pub fn scan(text: &str) -> Option<(NaiveDate, String)> {
    [&*NUMERIC_DATE, &*MONTH_NAME_DATE].into_iter().find_map(|re| {
        let snippet = re.find(text)?.as_str();
        parse(snippet).map(|date| (date, snippet.to_string()))
    })
}

/// Month number for an English month name. Unknown names fall back to
/// January.
fn month_number(name: &str) -> u32 {
    let lower = name.to_lowercase();
    match MONTHS.iter().position(|m| *m == lower) {
        Some(idx) => idx as u32 + 1,
        None => {
            debug!(month = %name, "Unrecognised month name, assuming January");
            1
        }
    }
}

/// Inclusive `[start, end]` range of publication dates to keep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Undated records are always admitted.
    pub fn admits(&self, date: Option<NaiveDate>) -> bool {
        date.is_none_or(|d| self.contains(d))
    }
}
