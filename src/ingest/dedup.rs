//! Per-kind deduplication keys
//!
//! A key is the record's identifying fields, each trimmed and lowercased,
//! joined with `::`. Records whose primary field is blank have no identity
//! and are dropped. Among records sharing a key the first one wins.

use crate::crawler::SocialProfile;
use crate::extraction::{BlogPost, Contact, EventIntel, Feature, JobListing, PricingTier};
use std::collections::HashSet;

/// A record that can be deduplicated within one ingestion batch
pub trait DedupKey {
    /// Fields forming the key, primary field first
    fn key_fields(&self) -> Vec<&str>;

    /// False if the record has nothing to be identified by
    fn is_identifiable(&self) -> bool {
        self.key_fields()
            .first()
            .map_or(false, |primary| !primary.trim().is_empty())
    }

    fn dedup_key(&self) -> String {
        self.key_fields()
            .iter()
            .map(|field| field.trim().to_lowercase())
            .collect::<Vec<_>>()
            .join("::")
    }
}

/// Drops unidentifiable records and all but the first of each key
///
/// # Examples
///
/// ```
/// use marketlens::extraction::Feature;
/// use marketlens::ingest::dedupe;
///
/// let features = vec![
///     Feature { name: "Export".into(), category: "Data".into(), ..Default::default() },
///     Feature { name: " export ".into(), category: "DATA".into(), ..Default::default() },
///     Feature { name: "".into(), category: "Data".into(), ..Default::default() },
/// ];
/// let kept = dedupe(&features);
/// assert_eq!(kept.len(), 1);
/// assert_eq!(kept[0].name, "Export");
/// ```
pub fn dedupe<'a, T, I>(items: I) -> Vec<&'a T>
where
    T: DedupKey + 'a,
    I: IntoIterator<Item = &'a T>,
{
    let mut seen: HashSet<String> = HashSet::new();

    items
        .into_iter()
        .filter(|item| item.is_identifiable())
        .filter(|item| seen.insert(item.dedup_key()))
        .collect()
}

impl DedupKey for SocialProfile {
    fn key_fields(&self) -> Vec<&str> {
        vec![self.platform.as_str(), self.url.as_str()]
    }

    /// Both platform and URL are required
    fn is_identifiable(&self) -> bool {
        !self.platform.trim().is_empty() && !self.url.trim().is_empty()
    }
}

impl DedupKey for Feature {
    fn key_fields(&self) -> Vec<&str> {
        vec![self.name.as_str(), self.category.as_str()]
    }
}

impl DedupKey for PricingTier {
    fn key_fields(&self) -> Vec<&str> {
        vec![self.name.as_str(), self.price.as_str(), self.billing_period.as_str()]
    }
}

impl DedupKey for Contact {
    fn key_fields(&self) -> Vec<&str> {
        vec![self.name.as_str(), self.email.as_str(), self.phone.as_str()]
    }
}

impl DedupKey for BlogPost {
    fn key_fields(&self) -> Vec<&str> {
        vec![self.title.as_str(), self.url.as_str()]
    }
}

impl DedupKey for EventIntel {
    fn key_fields(&self) -> Vec<&str> {
        vec![self.name.as_str(), self.date.as_str(), self.location.as_str()]
    }
}

impl DedupKey for JobListing {
    fn key_fields(&self) -> Vec<&str> {
        vec![self.title.as_str(), self.location.as_str(), self.url.as_str()]
    }
}
