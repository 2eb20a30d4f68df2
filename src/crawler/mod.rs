//! Crawler module for safe page fetching and site traversal
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with manual, re-validated redirects
//! - HTML parsing into page text, metadata and links
//! - Link selection against a per-crawl visited set
//! - Social profile detection
//! - Overall site crawl orchestration

mod fetcher;
mod frontier;
mod parser;
mod site;
mod social;

pub use fetcher::{build_http_client, FetchError, PageFetcher};
pub use frontier::{path_matches, select_links, VisitedSet, CONTENT_PATTERNS, JOB_PATTERNS};
pub use parser::{parse_page, ScrapedPage};
pub use site::{infer_company_name, scrape_website, ScrapedSite, SiteCrawler};
pub use social::{extract_social_profiles, SocialProfile};

pub(crate) use parser::truncate_chars;
