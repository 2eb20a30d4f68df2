//! End-to-end ingestion of one company website
//!
//! Ties the crawler, the extraction oracle and the graph store together:
//! crawl, extract, look up what is stored for the company, build the
//! replacement transaction list and apply it as one unit.

use crate::config::Config;
use crate::crawler::{ScrapedSite, SiteCrawler};
use crate::extraction::{job_text, site_text, ExtractedIntelBundle, ExtractionOracle, JobListing};
use crate::ingest::reconciler::{build_replace_company_intel_txns, ReplaceIntelParams};
use crate::ingest::transaction::{EntityKind, Transaction};
use crate::storage::{IntelStore, StorageError};
use crate::url::normalize_company_url;
use crate::{MarketLensError, Result};
use chrono::Utc;
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Outcome of one ingestion
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestionReport {
    pub company_id: String,
    /// Normalized company URL the company is keyed by
    pub url: String,
    /// True when a stored company was found and its intel replaced
    pub replaced_existing: bool,
    /// Pages fetched, job pages included
    pub pages: usize,
    pub transactions: usize,
    /// Records created, the company itself excluded
    pub created: usize,
    pub deleted: usize,
}

/// Ingests company websites into an [`IntelStore`]
pub struct IngestionService<S: IntelStore> {
    crawler: SiteCrawler,
    oracle: Arc<dyn ExtractionOracle>,
    store: Arc<Mutex<S>>,
    max_input_chars: usize,
}

impl<S: IntelStore> IngestionService<S> {
    /// Creates a service from a configuration
    ///
    /// # Arguments
    ///
    /// * `config` - Crawl, safety and extraction settings
    /// * `oracle` - Turns page text into records
    /// * `store` - Shared graph store
    pub fn new(config: &Config, oracle: Arc<dyn ExtractionOracle>, store: Arc<Mutex<S>>) -> Result<Self> {
        Ok(Self {
            crawler: SiteCrawler::from_config(config)?,
            oracle,
            store,
            max_input_chars: config.extraction.max_input_chars,
        })
    }

    /// Creates a service around an already built crawler
    pub fn with_crawler(
        crawler: SiteCrawler,
        oracle: Arc<dyn ExtractionOracle>,
        store: Arc<Mutex<S>>,
        max_input_chars: usize,
    ) -> Self {
        Self {
            crawler,
            oracle,
            store,
            max_input_chars,
        }
    }

    /// Shared handle to the underlying store
    pub fn store(&self) -> Arc<Mutex<S>> {
        Arc::clone(&self.store)
    }

    /// Crawls, extracts and replaces the stored intelligence for one company
    ///
    /// Nothing is written unless every step before `apply` succeeds, and
    /// `apply` itself is atomic.
    ///
    /// # Arguments
    ///
    /// * `raw_url` - Company URL as supplied by the user
    /// * `depth` - Crawl depth
    /// * `cancel` - Aborts the crawl and extraction when cancelled
    pub async fn ingest(&self, raw_url: &str, depth: u32, cancel: &CancellationToken) -> Result<IngestionReport> {
        let site = self.crawler.crawl(raw_url, depth, cancel).await?;

        let (extracted, jobs) = tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Ingestion of {} cancelled during extraction", site.url);
                return Err(MarketLensError::Cancelled { url: site.url.clone() });
            }
            outcome = self.extract(&site) => outcome?,
        };

        let url = normalize_company_url(&site.url);
        let mut store = self.lock_store()?;

        let existing = match store.find_company_by_url(&url)? {
            Some(id) => store.load_existing(&id)?,
            None => None,
        };
        let company_id = existing
            .as_ref()
            .map(|e| e.id.clone())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let txns = build_replace_company_intel_txns(&ReplaceIntelParams {
            company_id: &company_id,
            source_url: &url,
            scraped: &site,
            extracted: &extracted,
            jobs: &jobs,
            existing: existing.as_ref(),
            scraped_at: Utc::now(),
        });

        store.apply(&txns)?;

        let report = IngestionReport {
            company_id,
            url,
            replaced_existing: existing.is_some(),
            pages: site.page_count(),
            transactions: txns.len(),
            created: txns
                .iter()
                .filter(|t| matches!(t, Transaction::Update { kind, .. } if *kind != EntityKind::Company))
                .count(),
            deleted: txns.iter().filter(|t| t.is_delete()).count(),
        };

        tracing::info!(
            "Ingested {} as company {}: {} transactions ({} created, {} deleted)",
            report.url,
            report.company_id,
            report.transactions,
            report.created,
            report.deleted
        );

        Ok(report)
    }

    async fn extract(&self, site: &ScrapedSite) -> Result<(ExtractedIntelBundle, Vec<JobListing>)> {
        let intel_input = site_text(site, self.max_input_chars);
        let jobs_input = job_text(site, self.max_input_chars);

        let (extracted, jobs) = tokio::try_join!(
            self.oracle.extract_all(&intel_input),
            self.oracle.extract_job_listings(&jobs_input),
        )?;

        tracing::debug!(
            "Oracle returned {} records and {} job listings for {}",
            extracted.record_count(),
            jobs.len(),
            site.url
        );

        Ok((extracted, jobs))
    }

    fn lock_store(&self) -> Result<MutexGuard<'_, S>> {
        self.store
            .lock()
            .map_err(|e| StorageError::Database(format!("store lock poisoned: {}", e)).into())
    }
}
