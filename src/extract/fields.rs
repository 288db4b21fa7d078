//! Per-container field extraction.
//!
//! Every field is found the same way: walk an ordered list of sub-selectors
//! and keep the first one that yields a usable value.

use super::{Extractor, compile};
use crate::dates;
use crate::error::ExtractionError;
use crate::models::ArticleRecord;
use crate::utils::{element_text, resolve_href, truncate_chars};
use chrono::NaiveDate;
use itertools::Itertools;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Selector};
use url::Url;

type Patterns = Lazy<Vec<(&'static str, Selector)>>;

static TITLE: Patterns = Lazy::new(|| {
    compile(&[
        "h2",
        ".entry-title",
        ".post-title",
        "h3 a",
        "h2 a",
        "h3",
        "h4 a",
        "h4",
        "a.title",
        "h1, h2, h3, h4, h5",
    ])
});

static LINK: Patterns = Lazy::new(|| {
    compile(&["a", "h2 a", ".entry-title a", ".post-title a", "h3 a", "h4 a"])
});

static DATE: Patterns = Lazy::new(|| {
    compile(&[
        ".date",
        ".entry-date",
        ".post-date",
        ".time",
        "time",
        ".meta",
        ".posted-on",
        ".post-meta",
    ])
});

static EXCERPT: Patterns = Lazy::new(|| {
    compile(&[".excerpt", ".entry-summary", ".post-excerpt", ".summary", "p"])
});

/// Build a record from one container, or say why it is not one.
pub fn extract_record(container: ElementRef<'_>, rules: &Extractor) -> Result<ArticleRecord, ExtractionError> {
    let title = title(container).ok_or(ExtractionError::MissingTitle)?;
    let chars = title.chars().count();
    if chars < rules.min_title_chars {
        return Err(ExtractionError::TitleTooShort { title, chars });
    }

    let url = link(container, &rules.base_url);
    let (published_date, date_raw_text) = date(container);
    let excerpt = excerpt(container, rules.excerpt_max_chars);

    if let Some(date) = published_date {
        if !rules.window.contains(date) {
            return Err(ExtractionError::OutsideWindow {
                date,
                start: rules.window.start,
                end: rules.window.end,
            });
        }
    }

    Ok(ArticleRecord {
        title,
        url,
        published_date,
        date_raw_text,
        excerpt,
    })
}

/// First non-empty headline-like text.
pub fn title(container: ElementRef<'_>) -> Option<String> {
    TITLE.iter().find_map(|(_, sel)| {
        container
            .select(sel)
            .next()
            .map(element_text)
            .filter(|t| !t.is_empty())
    })
}

/// First resolvable link, checking the container itself before its
/// descendants.
pub fn link(container: ElementRef<'_>, base: &Url) -> Option<String> {
    if container.value().name() == "a" {
        if let Some(url) = container.value().attr("href").and_then(|h| resolve_href(base, h)) {
            return Some(url);
        }
    }
    LINK.iter().find_map(|(_, sel)| {
        container
            .select(sel)
            .find_map(|a| a.value().attr("href").and_then(|h| resolve_href(base, h)))
    })
}

/// Publication date and the text it came from.
///
/// Date-bearing sub-elements are tried first; failing those, the whole
/// container text is scanned. When nothing parses, the last text tried is
/// still returned for diagnostics.
pub fn date(container: ElementRef<'_>) -> (Option<NaiveDate>, Option<String>) {
    let mut last_tried = None;
    for (_, sel) in DATE.iter() {
        if let Some(el) = container.select(sel).next() {
            let text = element_text(el);
            if let Some(date) = dates::parse(&text) {
                return (Some(date), Some(text));
            }
            last_tried = Some(text);
        }
    }

    match dates::scan(&element_text(container)) {
        Some((date, snippet)) => (Some(date), Some(snippet)),
        None => (None, last_tried.filter(|t| !t.is_empty())),
    }
}

/// Summary text, capped at `max_chars`.
///
/// Uses the first two matches of the first excerpt-like selector that has
/// any text. Plain paragraphs come last in that list; failing them, the
/// container's own text is used.
pub fn excerpt(container: ElementRef<'_>, max_chars: usize) -> String {
    let from_selectors = EXCERPT.iter().find_map(|(_, sel)| {
        let joined = container
            .select(sel)
            .take(2)
            .map(element_text)
            .filter(|t| !t.is_empty())
            .join(" ");
        (!joined.is_empty()).then_some(joined)
    });

    let text = from_selectors.unwrap_or_else(|| element_text(container));

    truncate_chars(&text, max_chars)
}
