//! Link selection and the per-crawl visited set
//!
//! Every fetch in a crawl claims its URL from a [`VisitedSet`] first, so no
//! URL is fetched twice and the per-level caps count only new URLs.

use crate::url::same_host;
use std::collections::HashSet;
use url::Url;

/// Path keywords marking a content sub-page
pub const CONTENT_PATTERNS: &[&str] = &[
    "pric", "blog", "about", "feature", "product", "solution", "plans",
];

/// Path keywords marking a careers/jobs page
pub const JOB_PATTERNS: &[&str] = &["career", "jobs", "hiring", "openings", "positions"];

/// URLs already fetched (or claimed for fetching) during one crawl
#[derive(Debug, Default, Clone)]
pub struct VisitedSet {
    urls: HashSet<String>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims a URL, returning false if it was already present
    pub fn insert(&mut self, url: &Url) -> bool {
        self.urls.insert(visit_key(url))
    }

    pub fn contains(&self, url: &Url) -> bool {
        self.urls.contains(&visit_key(url))
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}

/// Visited-set key: the URL without its fragment
fn visit_key(url: &Url) -> String {
    let mut url = url.clone();
    url.set_fragment(None);
    url.to_string()
}

/// Returns true if the URL path contains any of the keywords
/// (case-insensitive)
pub fn path_matches(url: &Url, patterns: &[&str]) -> bool {
    let path = url.path().to_lowercase();
    patterns.iter().any(|pattern| path.contains(pattern))
}

/// Picks up to `limit` same-host links and claims them in `visited`
///
/// Links are considered in order. A link is taken when it parses, is on
/// `host`, matches one of `patterns` (an empty pattern list accepts any
/// path), and has not been visited yet. Taken links are inserted into
/// `visited` before returning.
///
/// # Arguments
///
/// * `links` - Candidate links, absolute
/// * `host` - The seed host; other hosts are never selected
/// * `patterns` - Path keywords, or empty for no path filter
/// * `limit` - Maximum number of links to return
/// * `visited` - The crawl's visited set
pub fn select_links(
    links: &[String],
    host: &str,
    patterns: &[&str],
    limit: usize,
    visited: &mut VisitedSet,
) -> Vec<Url> {
    let mut selected = Vec::new();

    for link in links {
        if selected.len() >= limit {
            break;
        }

        let Ok(url) = Url::parse(link) else {
            continue;
        };

        if !same_host(&url, host) {
            continue;
        }

        if !patterns.is_empty() && !path_matches(&url, patterns) {
            continue;
        }

        if visited.insert(&url) {
            selected.push(url);
        }
    }

    selected
}
