//! Store-facing write operations and the existing-intel snapshot

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Field map written for one entity
pub type Fields = Map<String, Value>;

/// Entity kinds in the intelligence graph
///
/// Each kind serializes as its store name (`"pricing_tiers"`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityKind {
    #[serde(rename = "companies")]
    Company,
    #[serde(rename = "features")]
    Feature,
    #[serde(rename = "pricing_tiers")]
    PricingTier,
    #[serde(rename = "marketing_intel")]
    MarketingIntel,
    #[serde(rename = "product_intel")]
    ProductIntel,
    #[serde(rename = "blog_posts")]
    BlogPost,
    #[serde(rename = "events")]
    Event,
    #[serde(rename = "contacts")]
    Contact,
    #[serde(rename = "job_listings")]
    JobListing,
    #[serde(rename = "social_profiles")]
    SocialProfile,
}

impl EntityKind {
    /// The nine kinds linked from a company, in deletion order
    pub const INTEL_KINDS: [EntityKind; 9] = [
        EntityKind::Feature,
        EntityKind::PricingTier,
        EntityKind::MarketingIntel,
        EntityKind::ProductIntel,
        EntityKind::BlogPost,
        EntityKind::Event,
        EntityKind::Contact,
        EntityKind::JobListing,
        EntityKind::SocialProfile,
    ];

    /// Store name, also used as the relation name of company links
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Company => "companies",
            Self::Feature => "features",
            Self::PricingTier => "pricing_tiers",
            Self::MarketingIntel => "marketing_intel",
            Self::ProductIntel => "product_intel",
            Self::BlogPost => "blog_posts",
            Self::Event => "events",
            Self::Contact => "contacts",
            Self::JobListing => "job_listings",
            Self::SocialProfile => "social_profiles",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        std::iter::once(EntityKind::Company)
            .chain(EntityKind::INTEL_KINDS)
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown entity kind: {}", s))
    }
}

/// One write against the graph store
///
/// A list of transactions is meant to be applied as a single atomic unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Transaction {
    /// Create the entity or merge `fields` into it
    Update {
        kind: EntityKind,
        id: String,
        fields: Fields,
    },

    /// Remove the entity
    Delete { kind: EntityKind, id: String },

    /// Link `from` to the entity `to_id` under `relation`
    Link {
        from_kind: EntityKind,
        from_id: String,
        relation: String,
        to_id: String,
    },
}

impl Transaction {
    pub fn update(kind: EntityKind, id: impl Into<String>, fields: Fields) -> Self {
        Self::Update {
            kind,
            id: id.into(),
            fields,
        }
    }

    pub fn delete(kind: EntityKind, id: impl Into<String>) -> Self {
        Self::Delete {
            kind,
            id: id.into(),
        }
    }

    /// Links a company to one of its intel records
    pub fn link_company(company_id: impl Into<String>, kind: EntityKind, to_id: impl Into<String>) -> Self {
        Self::Link {
            from_kind: EntityKind::Company,
            from_id: company_id.into(),
            relation: kind.as_str().to_string(),
            to_id: to_id.into(),
        }
    }

    pub fn is_delete(&self) -> bool {
        matches!(self, Self::Delete { .. })
    }

    /// True for an update that creates a record of `kind`
    pub fn is_update_of(&self, kind: EntityKind) -> bool {
        matches!(self, Self::Update { kind: k, .. } if *k == kind)
    }
}

/// Ids of the records currently linked to a company
///
/// Read-only input to reconciliation; only used to know what to delete.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExistingCompanyIntel {
    pub id: String,
    pub url: String,
    pub is_mine: bool,
    pub linked: BTreeMap<EntityKind, Vec<String>>,
}

impl ExistingCompanyIntel {
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn with_is_mine(mut self, is_mine: bool) -> Self {
        self.is_mine = is_mine;
        self
    }

    pub fn with_linked<I, S>(mut self, kind: EntityKind, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.linked
            .entry(kind)
            .or_default()
            .extend(ids.into_iter().map(Into::into));
        self
    }

    pub fn linked_ids(&self, kind: EntityKind) -> &[String] {
        self.linked.get(&kind).map(Vec::as_slice).unwrap_or_default()
    }

    /// Number of linked records across all kinds
    pub fn linked_count(&self) -> usize {
        self.linked.values().map(Vec::len).sum()
    }
}
