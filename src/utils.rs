//! Small helpers for text cleanup, URL resolution and output-path checks.

use scraper::ElementRef;
use std::error::Error;
use std::fs as stdfs;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};
use url::Url;

/// Marker appended to text cut short by [`truncate_chars`].
pub const TRUNCATION_MARKER: &str = "...";

/// Truncate a string for logging purposes.
///
/// Long strings are cut at a char boundary no later than `max` bytes with an
/// ellipsis and the number of dropped bytes appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
}

/// Collapse every run of whitespace into a single space and trim the ends.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Concatenated text content of an element, whitespace collapsed.
pub fn element_text(element: ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<String>())
}

/// Cap `s` at `max_chars` characters.
///
/// When the text is longer, the result is the first `max_chars - 3`
/// characters followed by [`TRUNCATION_MARKER`], so the output never exceeds
/// `max_chars`.
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let keep = max_chars.saturating_sub(TRUNCATION_MARKER.len());
    let mut out: String = s.chars().take(keep).collect();
    out.push_str(TRUNCATION_MARKER);
    out
}

/// Resolve an `href` found on a page into an absolute URL.
///
/// Absolute links are returned as-is. Anything else is joined against `base`,
/// so root-relative links (`/2024/01/story`) land on the base URL's origin.
/// Empty and fragment-only links resolve to nothing.
pub fn resolve_href(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }
    if let Ok(absolute) = Url::parse(href) {
        return Some(absolute.to_string());
    }
    base.join(href).ok().map(|u| u.to_string())
}

/// Ensure the directory that will hold `file_path` exists and is writable.
///
/// Creates the directory if needed, then writes and removes a scratch file.
/// A bare file name (no parent component) checks the working directory.
#[instrument(level = "info", skip_all, fields(path = %file_path))]
pub async fn ensure_writable_parent(file_path: &str) -> Result<(), Box<dyn Error>> {
    let dir = match Path::new(file_path).parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => Path::new(".").to_path_buf(),
    };
    fs::create_dir_all(&dir).await?;
    let scratch_path = dir.join("..__write_check__");
    match stdfs::File::create(&scratch_path) {
        Ok(_) => {
            let _ = stdfs::remove_file(&scratch_path);
            info!(dir = %dir.display(), "Output directory is writable");
            Ok(())
        }
        Err(e) => Err(Box::new(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::{Html, Selector};

    #[test]
    fn test_truncate_for_log_short_string() {
        assert_eq!(truncate_for_log("Hello, world!", 100), "Hello, world!");
    }

    #[test]
    fn test_truncate_for_log_long_string() {
        let s = "a".repeat(500);
        let result = truncate_for_log(&s, 100);
        assert!(result.starts_with(&"a".repeat(100)));
        assert!(result.contains("…(+400 bytes)"));
    }

    #[test]
    fn test_truncate_for_log_respects_char_boundaries() {
        // each 'ಟ' is three bytes
        let s = "ಟ".repeat(10);
        let result = truncate_for_log(&s, 4);
        assert!(result.starts_with('ಟ'));
        assert!(result.contains("(+27 bytes)"));
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  a \n\t b   c "), "a b c");
        assert_eq!(collapse_whitespace("   "), "");
    }

    #[test]
    fn test_element_text_joins_inline_nodes() {
        let doc = Html::parse_fragment("<p>  January <b>15</b>, 2024\n </p>");
        let p = Selector::parse("p").unwrap();
        let el = doc.select(&p).next().unwrap();
        assert_eq!(element_text(el), "January 15, 2024");
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("short", 200), "short");
        let long = "x".repeat(250);
        let cut = truncate_chars(&long, 200);
        assert_eq!(cut.chars().count(), 200);
        assert!(cut.ends_with("..."));
        assert_eq!(&cut[..197], "x".repeat(197));
    }

    #[test]
    fn test_truncate_chars_counts_chars_not_bytes() {
        let long = "ಕ".repeat(300);
        let cut = truncate_chars(&long, 200);
        assert_eq!(cut.chars().count(), 200);
    }

    #[test]
    fn test_resolve_href() {
        let base = Url::parse("https://news.example.com/category/local/").unwrap();
        assert_eq!(
            resolve_href(&base, "/2024/01/story").as_deref(),
            Some("https://news.example.com/2024/01/story")
        );
        assert_eq!(
            resolve_href(&base, "page/2/").as_deref(),
            Some("https://news.example.com/category/local/page/2/")
        );
        assert_eq!(
            resolve_href(&base, "https://other.example.org/x").as_deref(),
            Some("https://other.example.org/x")
        );
        assert_eq!(resolve_href(&base, "#top"), None);
        assert_eq!(resolve_href(&base, "  "), None);
    }

    #[tokio::test]
    async fn test_ensure_writable_parent_creates_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("nested/out/articles.csv");
        ensure_writable_parent(target.to_str().unwrap()).await.unwrap();
        assert!(tmp.path().join("nested/out").is_dir());
    }
}
