use super::coerce::{lenient_list, lenient_object, lenient_string, lenient_strings};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A product feature
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Feature {
    #[serde(deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(deserialize_with = "lenient_string")]
    pub category: String,
    #[serde(deserialize_with = "lenient_string")]
    pub description: String,
}

/// One pricing plan
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingTier {
    #[serde(deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(deserialize_with = "lenient_string")]
    pub price: String,
    #[serde(deserialize_with = "lenient_string")]
    pub billing_period: String,
    /// Comma-separated feature list as shown on the pricing page
    #[serde(deserialize_with = "lenient_string")]
    pub features_text: String,
}

/// Marketing claims and targeting
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketingIntel {
    #[serde(deserialize_with = "lenient_strings")]
    pub value_props: Vec<String>,
    #[serde(deserialize_with = "lenient_strings")]
    pub target_personas: Vec<String>,
    #[serde(deserialize_with = "lenient_strings")]
    pub key_messages: Vec<String>,
    #[serde(deserialize_with = "lenient_strings")]
    pub differentiators: Vec<String>,
    #[serde(deserialize_with = "lenient_strings")]
    pub pain_points: Vec<String>,
}

impl MarketingIntel {
    /// True if any entry in any list is non-blank
    pub fn has_signal(&self) -> bool {
        [
            &self.value_props,
            &self.target_personas,
            &self.key_messages,
            &self.differentiators,
            &self.pain_points,
        ]
        .into_iter()
        .flatten()
        .any(|entry| !entry.trim().is_empty())
    }
}

/// Product summary
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductIntel {
    #[serde(deserialize_with = "lenient_string")]
    pub feature_summary: String,
    #[serde(deserialize_with = "lenient_string")]
    pub tech_stack: String,
    #[serde(deserialize_with = "lenient_string")]
    pub positioning: String,
}

impl ProductIntel {
    /// True if any field is non-blank
    pub fn has_signal(&self) -> bool {
        [&self.feature_summary, &self.tech_stack, &self.positioning]
            .into_iter()
            .any(|field| !field.trim().is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Contact {
    #[serde(deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(deserialize_with = "lenient_string")]
    pub title: String,
    #[serde(deserialize_with = "lenient_string")]
    pub email: String,
    #[serde(deserialize_with = "lenient_string")]
    pub phone: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlogPost {
    #[serde(deserialize_with = "lenient_string")]
    pub title: String,
    #[serde(deserialize_with = "lenient_string")]
    pub url: String,
    #[serde(deserialize_with = "lenient_string")]
    pub date: String,
    #[serde(deserialize_with = "lenient_string")]
    pub summary: String,
}

/// A webinar, conference or workshop
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventIntel {
    #[serde(deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(deserialize_with = "lenient_string")]
    pub date: String,
    #[serde(deserialize_with = "lenient_string")]
    pub location: String,
    #[serde(deserialize_with = "lenient_string")]
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobListing {
    #[serde(deserialize_with = "lenient_string")]
    pub title: String,
    #[serde(deserialize_with = "lenient_string")]
    pub location: String,
    #[serde(deserialize_with = "lenient_string")]
    pub department: String,
    #[serde(deserialize_with = "lenient_string")]
    pub url: String,
    #[serde(deserialize_with = "lenient_string")]
    pub posted_date: String,
}

/// Everything the oracle extracted from one crawl
///
/// Records carry no identity; ids are assigned when they are persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractedIntelBundle {
    #[serde(deserialize_with = "lenient_list")]
    pub features: Vec<Feature>,
    #[serde(deserialize_with = "lenient_list")]
    pub pricing_tiers: Vec<PricingTier>,
    #[serde(deserialize_with = "lenient_object")]
    pub marketing: Option<MarketingIntel>,
    #[serde(deserialize_with = "lenient_object")]
    pub product: Option<ProductIntel>,
    #[serde(deserialize_with = "lenient_list")]
    pub contacts: Vec<Contact>,
    #[serde(deserialize_with = "lenient_list")]
    pub blog_posts: Vec<BlogPost>,
    #[serde(deserialize_with = "lenient_list")]
    pub events: Vec<EventIntel>,
    #[serde(deserialize_with = "lenient_list")]
    pub job_listings: Vec<JobListing>,
}

impl ExtractedIntelBundle {
    /// Decodes an oracle response; a non-object gives an empty bundle
    pub fn from_value(value: Value) -> Self {
        if !value.is_object() {
            return Self::default();
        }
        serde_json::from_value(value).unwrap_or_default()
    }

    /// Total number of records across all kinds
    pub fn record_count(&self) -> usize {
        self.features.len()
            + self.pricing_tiers.len()
            + usize::from(self.marketing.is_some())
            + usize::from(self.product.is_some())
            + self.contacts.len()
            + self.blog_posts.len()
            + self.events.len()
            + self.job_listings.len()
    }
}
