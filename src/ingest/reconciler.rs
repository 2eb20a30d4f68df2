//! Builds the transaction that replaces a company's intelligence graph
//!
//! Replacement is delete-then-recreate: every previously linked record is
//! deleted and every surviving incoming record is created fresh with a new
//! id. The resulting list must be applied atomically.

use crate::crawler::ScrapedSite;
use crate::extraction::{ExtractedIntelBundle, JobListing};
use crate::ingest::dedup::dedupe;
use crate::ingest::transaction::{EntityKind, ExistingCompanyIntel, Fields, Transaction};
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Value};
use uuid::Uuid;

/// Inputs to [`build_replace_company_intel_txns`]
#[derive(Debug, Clone)]
pub struct ReplaceIntelParams<'a> {
    /// Id of the company entity (existing or freshly minted)
    pub company_id: &'a str,
    /// URL recorded on the company and on contacts
    pub source_url: &'a str,
    pub scraped: &'a ScrapedSite,
    pub extracted: &'a ExtractedIntelBundle,
    /// Listings from the separate job extraction
    pub jobs: &'a [JobListing],
    /// What is stored for this company today, if anything
    pub existing: Option<&'a ExistingCompanyIntel>,
    pub scraped_at: DateTime<Utc>,
}

/// Builds the full replacement transaction list for one company
///
/// Emission order:
/// 1. Company update (`is_mine` carried over from `existing`, else false)
/// 2. Deletes for every record linked in `existing`
/// 3. Create + link per deduplicated social profile, feature, pricing tier,
///    contact, blog post and event
/// 4. Marketing and product intel, one record each and only when non-blank
/// 5. Create + link per deduplicated job listing (bundle and separate job
///    extraction together)
///
/// Performs no I/O. New record ids are random v4 UUIDs.
pub fn build_replace_company_intel_txns(params: &ReplaceIntelParams<'_>) -> Vec<Transaction> {
    let ReplaceIntelParams {
        company_id,
        source_url,
        scraped,
        extracted,
        jobs,
        existing,
        scraped_at,
    } = params;

    let mut txns = Vec::new();

    txns.push(Transaction::update(
        EntityKind::Company,
        *company_id,
        fields([
            ("name", json!(scraped.name)),
            ("url", json!(source_url)),
            ("description", json!(scraped.description)),
            ("industry", json!(scraped.industry)),
            ("is_mine", json!(existing.map_or(false, |e| e.is_mine))),
            (
                "scraped_at",
                json!(scraped_at.to_rfc3339_opts(SecondsFormat::Millis, true)),
            ),
            (
                "thumbnail_url",
                json!(scraped.thumbnail_url.as_deref().unwrap_or_default()),
            ),
        ]),
    ));

    if let Some(existing) = existing {
        for kind in EntityKind::INTEL_KINDS {
            txns.extend(
                existing
                    .linked_ids(kind)
                    .iter()
                    .map(|id| Transaction::delete(kind, id.as_str())),
            );
        }
    }

    let mut records = RecordWriter {
        company_id: *company_id,
        txns: &mut txns,
    };

    for profile in dedupe(&scraped.social_profiles) {
        records.create(
            EntityKind::SocialProfile,
            fields([
                ("platform", json!(profile.platform)),
                ("url", json!(profile.url)),
                ("followers_count", json!(profile.followers_count.unwrap_or(0))),
            ]),
        );
    }

    for feature in dedupe(&extracted.features) {
        records.create(
            EntityKind::Feature,
            fields([
                ("name", json!(feature.name)),
                ("category", json!(feature.category)),
                ("description", json!(feature.description)),
            ]),
        );
    }

    for tier in dedupe(&extracted.pricing_tiers) {
        records.create(
            EntityKind::PricingTier,
            fields([
                ("name", json!(tier.name)),
                ("price", json!(tier.price)),
                ("billing_period", json!(tier.billing_period)),
                ("features_text", json!(tier.features_text)),
            ]),
        );
    }

    for contact in dedupe(&extracted.contacts) {
        records.create(
            EntityKind::Contact,
            fields([
                ("name", json!(contact.name)),
                ("title", json!(contact.title)),
                ("email", json!(contact.email)),
                ("phone", json!(contact.phone)),
                ("source_url", json!(source_url)),
            ]),
        );
    }

    for post in dedupe(&extracted.blog_posts) {
        records.create(
            EntityKind::BlogPost,
            fields([
                ("title", json!(post.title)),
                ("url", json!(post.url)),
                ("date", json!(post.date)),
                ("summary", json!(post.summary)),
            ]),
        );
    }

    for event in dedupe(&extracted.events) {
        records.create(
            EntityKind::Event,
            fields([
                ("name", json!(event.name)),
                ("date", json!(event.date)),
                ("location", json!(event.location)),
                ("url", json!(event.url)),
            ]),
        );
    }

    if let Some(marketing) = extracted.marketing.as_ref().filter(|m| m.has_signal()) {
        records.create(
            EntityKind::MarketingIntel,
            fields([
                ("value_props", json!(marketing.value_props)),
                ("target_personas", json!(marketing.target_personas)),
                ("key_messages", json!(marketing.key_messages)),
                ("differentiators", json!(marketing.differentiators)),
                ("pain_points", json!(marketing.pain_points)),
            ]),
        );
    }

    if let Some(product) = extracted.product.as_ref().filter(|p| p.has_signal()) {
        records.create(
            EntityKind::ProductIntel,
            fields([
                ("feature_summary", json!(product.feature_summary)),
                ("tech_stack", json!(product.tech_stack)),
                ("positioning", json!(product.positioning)),
            ]),
        );
    }

    for job in dedupe(extracted.job_listings.iter().chain(jobs.iter())) {
        records.create(
            EntityKind::JobListing,
            fields([
                ("title", json!(job.title)),
                ("location", json!(job.location)),
                ("department", json!(job.department)),
                ("url", json!(job.url)),
                ("posted_date", json!(job.posted_date)),
            ]),
        );
    }

    txns
}

/// Appends create + link pairs for one company
struct RecordWriter<'a> {
    company_id: &'a str,
    txns: &'a mut Vec<Transaction>,
}

impl RecordWriter<'_> {
    fn create(&mut self, kind: EntityKind, fields: Fields) {
        let id = Uuid::new_v4().to_string();
        self.txns.push(Transaction::update(kind, id.clone(), fields));
        self.txns
            .push(Transaction::link_company(self.company_id, kind, id));
    }
}

fn fields<const N: usize>(pairs: [(&str, Value); N]) -> Fields {
    pairs
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
}
