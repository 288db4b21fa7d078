//! Finding the next listing page.
//!
//! Three strategies are tried in order and the first hit wins:
//!
//! 1. explicit "next" links: `rel="next"`, the usual pagination class names,
//!    and anchors whose text says "next" or carries a `»` glyph
//! 2. numbered pagination: the first link after the element marked `current`
//! 3. any link shaped like `.../page/<n>`
//!
//! Every candidate is resolved against the base URL. Links that read as
//! "previous" are passed over, and so are links back to the current page or
//! to a page already visited, so that broad selectors such as
//! `.pagination a` still move forward. When nothing but seen pages is left,
//! the resolver says so instead of reporting no link at all.

use crate::extract::compile;
use crate::utils::{element_text, resolve_href};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use tracing::{debug, info};
use url::Url;

static NEXT_LINKS: Lazy<Vec<(&'static str, Selector)>> = Lazy::new(|| {
    compile(&[
        ".next",
        ".pagination a",
        "a.next",
        r#"a[rel="next"]"#,
        ".nav-previous a",
        ".nav-links a",
        ".page-numbers.next",
    ])
});
static ANCHORS: Lazy<Vec<(&'static str, Selector)>> = Lazy::new(|| compile(&["a[href]"]));
static PAGE_NUMBERS: Lazy<Vec<(&'static str, Selector)>> = Lazy::new(|| compile(&[".page-numbers, .pagination a"]));
static PAGE_LINKS: Lazy<Vec<(&'static str, Selector)>> = Lazy::new(|| compile(&[r#"a[href*="page/"]"#]));
static PAGE_PATH: Lazy<Regex> = Lazy::new(|| Regex::new(r"page/(\d+)").expect("page path regex"));

/// Which strategy produced the next-page link. Logged, and handy in tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    NextLink,
    NextText,
    PageNumbers,
    PagePath,
}

/// What the resolver made of a page's pagination links.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextPage {
    /// A link to a page not seen yet.
    Found(Strategy, String),
    /// The only next link points at the current page or one already visited.
    AlreadyVisited(String),
    Absent,
}

#[derive(Debug, Clone)]
pub struct PaginationResolver {
    base_url: Url,
}

impl PaginationResolver {
    pub fn new(base_url: Url) -> Self {
        Self { base_url }
    }

    /// Resolve the page after `current`.
    ///
    /// # Arguments
    ///
    /// * `document` - The parsed listing page
    /// * `current` - URL the document was fetched from
    /// * `visited` - Every listing URL fetched so far in this run
    ///
    /// # Returns
    ///
    /// [`NextPage::Found`] with the first unseen link the strategies turn up.
    /// When every candidate leads back to `current` or into `visited`, the
    /// link the strategies would otherwise have followed comes back as
    /// [`NextPage::AlreadyVisited`] so the caller can stop on the cycle.
    pub fn find_next(&self, document: &Html, current: &Url, visited: &HashSet<String>) -> NextPage {
        let unseen = |url: &str| {
            let seen = url == current.as_str() || visited.contains(url);
            if seen {
                debug!(url = %url, "Ignoring pagination link to a page already seen");
            }
            !seen
        };
        if let Some((strategy, next)) = self.cascade(document, unseen) {
            info!(?strategy, next = %next, "Found next page");
            return NextPage::Found(strategy, next);
        }
        match self.cascade(document, |_| true) {
            Some((_, next)) => NextPage::AlreadyVisited(next),
            None => NextPage::Absent,
        }
    }

    /// Run the strategies in order over links whose resolved URL `accept` allows.
    fn cascade(&self, document: &Html, accept: impl Fn(&str) -> bool) -> Option<(Strategy, String)> {
        let usable = |href: &str| -> Option<String> {
            let url = resolve_href(&self.base_url, href)?;
            accept(&url).then_some(url)
        };

        self.explicit_link(document, &usable)
            .map(|u| (Strategy::NextLink, u))
            .or_else(|| next_by_text(document, &usable).map(|u| (Strategy::NextText, u)))
            .or_else(|| after_current(document, &usable).map(|u| (Strategy::PageNumbers, u)))
            .or_else(|| page_path(document, &usable).map(|u| (Strategy::PagePath, u)))
    }

    fn explicit_link(&self, document: &Html, usable: &impl Fn(&str) -> Option<String>) -> Option<String> {
        for (pattern, selector) in NEXT_LINKS.iter() {
            for element in document.select(selector) {
                let Some(anchor) = anchor_of(element) else {
                    continue;
                };
                let Some(href) = anchor.value().attr("href") else {
                    continue;
                };
                if is_previous(anchor) || !reads_as_next(anchor, href) {
                    continue;
                }
                if let Some(url) = usable(href) {
                    debug!(pattern, href, "Next link matched selector");
                    return Some(url);
                }
            }
        }
        None
    }
}

fn next_by_text(document: &Html, usable: &impl Fn(&str) -> Option<String>) -> Option<String> {
    for (_, selector) in ANCHORS.iter() {
        for anchor in document.select(selector) {
            let text = element_text(anchor).to_lowercase();
            if !(text.contains("next") || text.contains('»')) || is_previous(anchor) {
                continue;
            }
            if let Some(url) = anchor.value().attr("href").and_then(usable) {
                return Some(url);
            }
        }
    }
    None
}

/// The first usable link after the element whose class marks the current
/// page number.
fn after_current(document: &Html, usable: &impl Fn(&str) -> Option<String>) -> Option<String> {
    for (_, selector) in PAGE_NUMBERS.iter() {
        let mut seen_current = false;
        for element in document.select(selector) {
            if element.value().classes().any(|c| c == "current") {
                seen_current = true;
                continue;
            }
            if !seen_current {
                continue;
            }
            if let Some(url) = element.value().attr("href").and_then(usable) {
                return Some(url);
            }
        }
    }
    None
}

fn page_path(document: &Html, usable: &impl Fn(&str) -> Option<String>) -> Option<String> {
    for (_, selector) in PAGE_LINKS.iter() {
        for anchor in document.select(selector) {
            let Some(href) = anchor.value().attr("href") else {
                continue;
            };
            if !PAGE_PATH.is_match(href) {
                continue;
            }
            if let Some(url) = usable(href) {
                return Some(url);
            }
        }
    }
    None
}

/// The element itself when it is a link, otherwise its first link with an href.
fn anchor_of(element: ElementRef<'_>) -> Option<ElementRef<'_>> {
    if element.value().name() == "a" {
        return Some(element);
    }
    ANCHORS
        .iter()
        .find_map(|(_, selector)| element.select(selector).next())
}

fn reads_as_next(anchor: ElementRef<'_>, href: &str) -> bool {
    let text = element_text(anchor).to_lowercase();
    text.contains("next") || text.contains('»') || text.contains('>') || href.contains("page")
}

fn is_previous(anchor: ElementRef<'_>) -> bool {
    let rel_prev = anchor
        .value()
        .attr("rel")
        .is_some_and(|rel| rel.split_whitespace().any(|r| r.eq_ignore_ascii_case("prev")));
    let text = element_text(anchor).to_lowercase();
    rel_prev || text.contains("prev") || text.contains('«')
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://news.example.com/category/local/";

    fn resolver() -> PaginationResolver {
        PaginationResolver::new(Url::parse(BASE).unwrap())
    }

    fn next(html: &str, current: &str, visited: &[&str]) -> NextPage {
        let visited: HashSet<String> = visited.iter().map(|s| s.to_string()).collect();
        resolver().find_next(&Html::parse_document(html), &Url::parse(current).unwrap(), &visited)
    }

    fn found_url(next: NextPage) -> Option<String> {
        match next {
            NextPage::Found(_, url) => Some(url),
            _ => None,
        }
    }

    #[test]
    fn test_rel_next() {
        let html = r#"<div><a rel="next" href="/category/local/page/2/">Older</a></div>"#;
        assert_eq!(
            next(html, BASE, &[]),
            NextPage::Found(
                Strategy::NextLink,
                "https://news.example.com/category/local/page/2/".to_string()
            )
        );
    }

    #[test]
    fn test_next_class_on_wrapper_uses_inner_link() {
        let html = r#"<li class="next"><a href="?p=3">Next &raquo;</a></li>"#;
        assert_eq!(
            found_url(next(html, BASE, &[])),
            Some("https://news.example.com/category/local/?p=3".to_string())
        );
    }

    #[test]
    fn test_pagination_links_skip_previous_and_visited() {
        let html = r#"
            <div class="pagination">
              <a href="/category/local/page/1/">&laquo; Prev</a>
              <a href="/category/local/page/2/">2</a>
              <a href="/category/local/page/3/">3</a>
            </div>
        "#;
        let current = "https://news.example.com/category/local/page/2/";
        assert_eq!(
            found_url(next(html, current, &[BASE, current])),
            Some("https://news.example.com/category/local/page/3/".to_string())
        );
    }

    #[test]
    fn test_selector_match_needs_next_signal() {
        // `.nav-links a` matches, but neither text nor href reads as "next"
        let html = r#"<nav class="nav-links"><a href="/about">About us</a></nav>"#;
        assert_eq!(next(html, BASE, &[]), NextPage::Absent);
    }

    #[test]
    fn test_anchor_text_next() {
        let html = r#"<p><a href="/listing?offset=20">Next Page</a></p>"#;
        assert_eq!(
            next(html, BASE, &[]),
            NextPage::Found(Strategy::NextText, "https://news.example.com/listing?offset=20".to_string())
        );
    }

    #[test]
    fn test_after_current_page_number() {
        let html = r#"
            <div class="paging">
              <a class="page-numbers" href="/list?p=1">1</a>
              <span class="page-numbers current">2</span>
              <a class="page-numbers" href="/list?p=3">3</a>
              <a class="page-numbers" href="/list?p=4">4</a>
            </div>
        "#;
        assert_eq!(
            next(html, "https://news.example.com/list?p=2", &[]),
            NextPage::Found(Strategy::PageNumbers, "https://news.example.com/list?p=3".to_string())
        );
    }

    #[test]
    fn test_page_path_fallback() {
        let html = r#"<footer><a href="/tag/x">Tag</a><a href="/category/local/page/7">More stories</a></footer>"#;
        assert_eq!(
            next(html, BASE, &[]),
            NextPage::Found(
                Strategy::PagePath,
                "https://news.example.com/category/local/page/7".to_string()
            )
        );
    }

    #[test]
    fn test_never_returns_current_page() {
        let current = "https://news.example.com/category/local/page/2/";
        let html = r#"<a rel="next" href="/category/local/page/2/">Next</a>"#;
        assert_eq!(next(html, current, &[]), NextPage::AlreadyVisited(current.to_string()));
    }

    #[test]
    fn test_back_link_to_visited_page_is_reported() {
        let html = r#"<a rel="next" href="/category/local/page/2/">Next</a>"#;
        let visited = "https://news.example.com/category/local/page/2/";
        assert_eq!(
            next(html, "https://news.example.com/category/local/page/3/", &[BASE, visited]),
            NextPage::AlreadyVisited(visited.to_string())
        );
    }

    #[test]
    fn test_unseen_link_preferred_over_visited_one() {
        let html = r#"
            <a rel="next" href="/category/local/page/2/">Next</a>
            <a href="/category/local/page/4/">Next page</a>
        "#;
        let current = "https://news.example.com/category/local/page/3/";
        let visited = "https://news.example.com/category/local/page/2/";
        assert_eq!(
            next(html, current, &[BASE, visited, current]),
            NextPage::Found(
                Strategy::NextText,
                "https://news.example.com/category/local/page/4/".to_string()
            )
        );
    }

    #[test]
    fn test_current_marker_is_an_exact_class() {
        // `current-menu-item` is navigation styling, not the pagination marker
        let html = r#"
            <ul class="menu"><li class="page-numbers current-menu-item"><a href="/about">About</a></li></ul>
            <div class="paging">
              <a class="page-numbers" href="/list?p=1">1</a>
              <span class="page-numbers current">2</span>
              <a class="page-numbers" href="/list?p=3">3</a>
            </div>
        "#;
        assert_eq!(
            next(html, "https://news.example.com/list?p=2", &[]),
            NextPage::Found(Strategy::PageNumbers, "https://news.example.com/list?p=3".to_string())
        );
    }

    #[test]
    fn test_no_pagination() {
        let html = r#"<div class="post"><h2>Only page</h2></div>"#;
        assert_eq!(next(html, BASE, &[]), NextPage::Absent);
    }

    #[test]
    fn test_fragment_links_are_ignored() {
        let html = r##"<a class="next" href="#">Next</a>"##;
        assert_eq!(next(html, BASE, &[]), NextPage::Absent);
    }
}
