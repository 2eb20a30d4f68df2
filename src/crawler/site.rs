//! Site crawler - bounded-depth traversal of one company website
//!
//! A crawl fetches the seed page, then same-host content pages, then deeper
//! frontier levels, then careers pages. Only the seed fetch can fail the
//! crawl; every other page either contributes or is skipped.

use crate::config::{Config, CrawlerConfig};
use crate::crawler::fetcher::PageFetcher;
use crate::crawler::frontier::{select_links, VisitedSet, CONTENT_PATTERNS, JOB_PATTERNS};
use crate::crawler::parser::ScrapedPage;
use crate::crawler::social::{extract_social_profiles, SocialProfile};
use crate::safety::SafetyValidator;
use crate::url::strip_www;
use crate::{MarketLensError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use url::Url;

/// Characters that separate a company name from the rest of a page title
const TITLE_SEPARATORS: &[char] = &['|', '-', '–', '—'];

/// Everything collected from one crawl of a company website
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapedSite {
    /// Inferred company name
    pub name: String,

    /// Normalized seed URL
    pub url: String,

    pub description: String,

    /// Always empty after a crawl; filled in downstream if at all
    pub industry: String,

    pub main_page: ScrapedPage,
    pub sub_pages: Vec<ScrapedPage>,
    pub job_pages: Vec<ScrapedPage>,
    pub social_profiles: Vec<SocialProfile>,
    pub thumbnail_url: Option<String>,
}

impl ScrapedSite {
    /// Main page followed by content sub-pages
    pub fn content_pages(&self) -> impl Iterator<Item = &ScrapedPage> {
        std::iter::once(&self.main_page).chain(self.sub_pages.iter())
    }

    /// Total number of pages fetched
    pub fn page_count(&self) -> usize {
        1 + self.sub_pages.len() + self.job_pages.len()
    }

    /// Every page URL in the result, in fetch order
    pub fn page_urls(&self) -> Vec<&str> {
        self.content_pages()
            .chain(self.job_pages.iter())
            .map(|page| page.url.as_str())
            .collect()
    }
}

/// Crawls company websites
#[derive(Debug, Clone)]
pub struct SiteCrawler {
    fetcher: PageFetcher,
    validator: Arc<SafetyValidator>,
    config: CrawlerConfig,
}

impl SiteCrawler {
    /// Creates a crawler that validates with `validator`
    ///
    /// # Arguments
    ///
    /// * `config` - Full configuration; the fetcher and crawler sections are used
    /// * `validator` - Applied to the seed and to every fetch hop
    pub fn new(config: &Config, validator: Arc<SafetyValidator>) -> Result<Self> {
        let fetcher = PageFetcher::new(config.fetcher.clone(), Arc::clone(&validator))?;
        Ok(Self {
            fetcher,
            validator,
            config: config.crawler.clone(),
        })
    }

    /// Creates a crawler whose validator is built from the `[safety]` section
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(config, Arc::new(SafetyValidator::new(&config.safety)))
    }

    /// Brings a requested depth into `1..=max-depth`
    pub fn clamp_depth(&self, depth: u32) -> u32 {
        let clamped = depth.clamp(1, self.config.max_depth.max(1));
        if clamped != depth {
            tracing::warn!(
                "Crawl depth {} out of range, using {} (allowed 1..={})",
                depth,
                clamped,
                self.config.max_depth
            );
        }
        clamped
    }

    /// Crawls a site from a user-supplied seed URL
    ///
    /// The seed is validated and normalized first. The whole crawl is bounded
    /// by `crawl-deadline-secs` and aborts as soon as `cancel` fires; in both
    /// cases nothing collected so far is returned.
    ///
    /// # Arguments
    ///
    /// * `seed` - Raw seed URL as the user typed it
    /// * `depth` - Traversal depth, clamped into `1..=max-depth`
    /// * `cancel` - Aborts pending fetches when cancelled
    ///
    /// # Returns
    ///
    /// * `Ok(ScrapedSite)` - Crawl completed
    /// * `Err(MarketLensError)` - Seed rejected, seed fetch failed, deadline
    ///   exceeded, or cancelled
    pub async fn crawl(
        &self,
        seed: &str,
        depth: u32,
        cancel: &CancellationToken,
    ) -> Result<ScrapedSite> {
        let depth = self.clamp_depth(depth);
        let deadline = Duration::from_secs(self.config.crawl_deadline_secs);
        let started = Instant::now();

        let outcome = tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Crawl of {} cancelled", seed);
                return Err(MarketLensError::Cancelled {
                    url: seed.to_string(),
                });
            }
            outcome = tokio::time::timeout(deadline, self.run(seed, depth)) => outcome,
        };

        let site = outcome.map_err(|_| {
            tracing::warn!("Crawl of {} hit the {:?} deadline", seed, deadline);
            MarketLensError::DeadlineExceeded {
                url: seed.to_string(),
                seconds: self.config.crawl_deadline_secs,
            }
        })??;

        tracing::info!(
            "Crawled {}: {} pages ({} content, {} job), {} social profiles in {:.2}s",
            site.url,
            site.page_count(),
            site.sub_pages.len() + 1,
            site.job_pages.len(),
            site.social_profiles.len(),
            started.elapsed().as_secs_f64()
        );

        Ok(site)
    }

    async fn run(&self, seed: &str, depth: u32) -> Result<ScrapedSite> {
        let seed_url = self.validator.validate(seed).await?.url;

        let mut visited = VisitedSet::new();
        visited.insert(&seed_url);

        // The seed page is the only fetch allowed to fail the crawl. It may
        // redirect to another host (apex to www); that host is then the one
        // the crawl stays on.
        let main_page = self.fetcher.fetch(&seed_url).await?;
        let final_url = Url::parse(&main_page.url).unwrap_or_else(|_| seed_url.clone());
        visited.insert(&final_url);
        let host = final_url.host_str().unwrap_or_default().to_lowercase();

        let mut all_links = LinkSet::default();
        all_links.extend(&main_page.links);

        // Depth 1: keyword-matched content pages linked from the seed
        let content_urls = select_links(
            &main_page.links,
            &host,
            CONTENT_PATTERNS,
            self.config.sub_page_limit,
            &mut visited,
        );
        let mut sub_pages = Vec::new();
        let mut frontier = Vec::new();
        for url in content_urls {
            if let Some(page) = self.fetch_optional(&url, &host, &mut visited).await {
                frontier.extend(page.links.iter().cloned());
                sub_pages.push(page);
            }
        }
        all_links.extend(&frontier);

        // Deeper levels: any unvisited same-host link from the previous level
        for level in 2..=depth {
            if frontier.is_empty() {
                break;
            }

            let level_urls = select_links(
                &frontier,
                &host,
                &[],
                self.config.sub_page_limit,
                &mut visited,
            );
            tracing::debug!("Depth {}: fetching {} pages", level, level_urls.len());

            let mut next_frontier = Vec::new();
            for url in level_urls {
                if let Some(page) = self.fetch_optional(&url, &host, &mut visited).await {
                    next_frontier.extend(page.links.iter().cloned());
                    sub_pages.push(page);
                }
            }
            all_links.extend(&next_frontier);
            frontier = next_frontier;
        }

        // Careers pages from everything seen so far
        let job_urls = select_links(
            all_links.as_slice(),
            &host,
            JOB_PATTERNS,
            self.config.job_page_limit,
            &mut visited,
        );
        let mut job_pages = Vec::new();
        for url in job_urls {
            if let Some(page) = self.fetch_optional(&url, &host, &mut visited).await {
                all_links.extend(&page.links);
                job_pages.push(page);
            }
        }

        let social_profiles = extract_social_profiles(all_links.as_slice());
        let thumbnail_url = find_thumbnail(&main_page);
        let name = infer_company_name(&main_page.title, &host);

        Ok(ScrapedSite {
            name,
            url: seed_url.to_string(),
            description: main_page.description.clone(),
            industry: String::new(),
            main_page,
            sub_pages,
            job_pages,
            social_profiles,
            thumbnail_url,
        })
    }

    /// Fetches a non-seed page, logging and discarding any failure
    ///
    /// Redirects are confined to `host` and to URLs not yet in `visited`.
    async fn fetch_optional(
        &self,
        url: &Url,
        host: &str,
        visited: &mut VisitedSet,
    ) -> Option<ScrapedPage> {
        match self.fetcher.fetch_scoped(url, Some(host), visited).await {
            Ok(page) => Some(page),
            Err(e) if e.is_out_of_scope() => {
                tracing::debug!("Skipping {}: {}", url, e);
                None
            }
            Err(e) => {
                tracing::warn!("Skipping {}: {}", url, e);
                None
            }
        }
    }
}

/// Links in first-seen order without duplicates
#[derive(Debug, Default)]
struct LinkSet {
    links: Vec<String>,
    seen: HashSet<String>,
}

impl LinkSet {
    fn extend(&mut self, links: &[String]) {
        for link in links {
            if self.seen.insert(link.clone()) {
                self.links.push(link.clone());
            }
        }
    }

    fn as_slice(&self) -> &[String] {
        &self.links
    }
}

/// Picks the seed page's og:image, then twitter:image, as an absolute URL
fn find_thumbnail(page: &ScrapedPage) -> Option<String> {
    let raw = ["og:image", "twitter:image"]
        .iter()
        .filter_map(|key| page.metadata.get(*key))
        .map(|value| value.trim())
        .find(|value| !value.is_empty())?;

    match Url::parse(&page.url).and_then(|base| base.join(raw)) {
        Ok(absolute) => Some(absolute.to_string()),
        Err(_) => Some(raw.to_string()),
    }
}

/// Infers a company name from the seed page title
///
/// Takes the title up to the first separator (`|`, `-`, en or em dash),
/// falling back to the host without `www.`.
///
/// # Examples
///
/// ```
/// use marketlens::crawler::infer_company_name;
///
/// assert_eq!(infer_company_name("Acme | Widgets for teams", "acme.example"), "Acme");
/// assert_eq!(infer_company_name("", "www.acme.example"), "acme.example");
/// ```
pub fn infer_company_name(title: &str, host: &str) -> String {
    let first = title.split(TITLE_SEPARATORS).next().unwrap_or_default().trim();
    if first.is_empty() {
        strip_www(host).to_string()
    } else {
        first.to_string()
    }
}

/// Crawls a website with the default configuration
///
/// # Example
///
/// ```no_run
/// # async fn example() -> marketlens::Result<()> {
/// let site = marketlens::scrape_website("acme.example", 1).await?;
/// println!("{} ({} pages)", site.name, site.page_count());
/// # Ok(())
/// # }
/// ```
pub async fn scrape_website(url: &str, depth: u32) -> Result<ScrapedSite> {
    SiteCrawler::from_config(&Config::default())?
        .crawl(url, depth, &CancellationToken::new())
        .await
}
