//! Collapsing duplicate records.
//!
//! Within one batch ([`dedupe`]) two seen-sets are kept:
//! - a record with an unseen URL is kept and its URL marked seen
//! - a record with no URL, or a URL already seen, is kept only if its title
//!   is unseen, and then its title is marked seen
//!
//! A title is only marked by the second branch, so a URL-less record is not
//! shadowed by an earlier record that merely shares its headline. Order is
//! preserved and the first occurrence wins.
//!
//! Across the pages of a crawl ([`Deduplicator`]) identity is the URL when
//! there is one and the title otherwise.

use crate::models::ArticleRecord;
use std::collections::HashSet;

/// Deduplicate a single batch.
pub fn dedupe(candidates: Vec<ArticleRecord>) -> Vec<ArticleRecord> {
    let mut seen_urls: HashSet<String> = HashSet::new();
    let mut seen_titles: HashSet<String> = HashSet::new();
    candidates
        .into_iter()
        .filter(|candidate| match &candidate.url {
            Some(url) if !seen_urls.contains(url) => {
                seen_urls.insert(url.clone());
                true
            }
            _ => seen_titles.insert(candidate.title.clone()),
        })
        .collect()
}

/// Remembers what earlier pages contributed, so one instance can
/// deduplicate a whole crawl page by page.
#[derive(Debug, Default, Clone)]
pub struct Deduplicator {
    harvested_urls: HashSet<String>,
    harvested_titles: HashSet<String>,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deduplicate one page's candidates against each other and against
    /// every earlier page.
    ///
    /// # Arguments
    ///
    /// * `candidates` - Records extracted from the page, in document order
    ///
    /// # Returns
    ///
    /// The records not seen before, in their original order. Records with a
    /// URL an earlier page already produced are dropped, as are URL-less
    /// records whose title an earlier URL-less record already used.
    pub fn admit(&mut self, candidates: Vec<ArticleRecord>) -> Vec<ArticleRecord> {
        let fresh: Vec<ArticleRecord> = dedupe(candidates)
            .into_iter()
            .filter(|c| !self.harvested(c))
            .collect();
        for record in &fresh {
            match &record.url {
                Some(url) => self.harvested_urls.insert(url.clone()),
                None => self.harvested_titles.insert(record.title.clone()),
            };
        }
        fresh
    }

    fn harvested(&self, candidate: &ArticleRecord) -> bool {
        match &candidate.url {
            Some(url) => self.harvested_urls.contains(url),
            None => self.harvested_titles.contains(&candidate.title),
        }
    }
}
