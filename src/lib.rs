//! MarketLens: competitive-intelligence ingestion core
//!
//! This crate fetches company websites safely (SSRF-checked on every hop),
//! crawls them to a bounded depth, hands the collected text to an extraction
//! oracle, and builds the atomic transaction that replaces a company's stored
//! intelligence graph.

pub mod config;
pub mod crawler;
pub mod extraction;
pub mod ingest;
pub mod safety;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for MarketLens operations
#[derive(Debug, Error)]
pub enum MarketLensError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("URL rejected: {0}")]
    Validation(#[from] safety::ValidationError),

    #[error("Fetch failed: {0}")]
    Fetch(#[from] crawler::FetchError),

    #[error("Extraction failed: {0}")]
    Extraction(#[from] extraction::ExtractionError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Crawl of {url} exceeded the {seconds}s deadline")]
    DeadlineExceeded { url: String, seconds: u64 },

    #[error("Crawl of {url} was cancelled")]
    Cancelled { url: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse classification of a failure, for choosing a remediation path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The caller supplied something that is not a usable URL
    BadInput,
    /// The URL is well-formed but points somewhere we refuse to go
    PolicyRejected,
    /// The host could not be resolved, reached, or answered with an error
    Unreachable,
    /// The caller cancelled the operation
    Cancelled,
    /// Anything on our side (config, storage, oracle)
    Internal,
}

impl MarketLensError {
    /// Classifies this error for the end caller
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Self::Validation(e) => e.failure_kind(),
            Self::Fetch(e) => e.failure_kind(),
            Self::DeadlineExceeded { .. } => FailureKind::Unreachable,
            Self::Cancelled { .. } => FailureKind::Cancelled,
            Self::Config(_)
            | Self::Extraction(_)
            | Self::Storage(_)
            | Self::Io(_) => FailureKind::Internal,
        }
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid host pattern: {0}")]
    InvalidPattern(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Valid URL required")]
    Empty,

    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,
}

/// Result type alias for MarketLens operations
pub type Result<T> = std::result::Result<T, MarketLensError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{scrape_website, ScrapedPage, ScrapedSite, SiteCrawler, SocialProfile};
pub use extraction::{ExtractedIntelBundle, ExtractionOracle};
pub use ingest::{build_replace_company_intel_txns, IngestionService, Transaction};
pub use safety::{validate_external_company_url, SafetyValidator, ValidatedUrl};
pub use url::{normalize_company_url, normalize_external_url};
