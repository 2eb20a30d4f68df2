//! URL handling module for MarketLens
//!
//! This module provides URL normalization for user input and for company
//! matching, host extraction, and hostname pattern matching.

mod domain;
mod matcher;
mod normalize;

// Re-export main functions
pub use domain::{extract_domain, same_host, strip_www};
pub use matcher::{matches_any, matches_wildcard};
pub use normalize::{normalize_company_url, normalize_external_url};
