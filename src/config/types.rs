use serde::Deserialize;

/// Main configuration structure for MarketLens
///
/// Every section has defaults, so an empty TOML document is a valid
/// configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub fetcher: FetcherConfig,
    pub crawler: CrawlerConfig,
    pub safety: SafetyConfig,
    pub extraction: ExtractionConfig,
    pub output: OutputConfig,
}

/// Single-page fetch behaviour
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetcherConfig {
    /// User-Agent header sent with every request
    #[serde(rename = "user-agent")]
    pub user_agent: String,

    /// Per-request timeout (seconds)
    #[serde(rename = "timeout-secs")]
    pub timeout_secs: u64,

    /// Maximum number of requests issued for one fetch, redirects included
    #[serde(rename = "max-hops")]
    pub max_hops: u32,

    /// Response bodies are truncated beyond this many bytes
    #[serde(rename = "max-body-bytes")]
    pub max_body_bytes: usize,

    /// Page text is truncated beyond this many characters
    #[serde(rename = "max-text-chars")]
    pub max_text_chars: usize,

    /// Connect only to the addresses validated for each hop
    #[serde(rename = "pin-dns")]
    pub pin_dns: bool,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            user_agent: "MarketLens/1.0".to_string(),
            timeout_secs: 30,
            max_hops: 5,
            max_body_bytes: 5 * 1024 * 1024,
            max_text_chars: 50_000,
            pin_dns: false,
        }
    }
}

/// Site traversal behaviour
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Depth used when the caller does not pass one
    #[serde(rename = "default-depth")]
    pub default_depth: u32,

    /// Upper bound for requested depths
    #[serde(rename = "max-depth")]
    pub max_depth: u32,

    /// Content pages fetched from the seed, and per deeper level
    #[serde(rename = "sub-page-limit")]
    pub sub_page_limit: usize,

    /// Career/job pages fetched after traversal
    #[serde(rename = "job-page-limit")]
    pub job_page_limit: usize,

    /// Wall-clock budget for one whole crawl (seconds)
    #[serde(rename = "crawl-deadline-secs")]
    pub crawl_deadline_secs: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            default_depth: 1,
            max_depth: 5,
            sub_page_limit: 10,
            job_page_limit: 5,
            crawl_deadline_secs: 120,
        }
    }
}

/// SSRF policy additions on top of the built-in rules
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SafetyConfig {
    /// Extra hostname patterns to refuse (e.g. "*.internal")
    #[serde(rename = "blocked-hosts")]
    pub blocked_hosts: Vec<String>,

    /// Hosts that skip address checks entirely (exact match)
    #[serde(rename = "allowed-hosts")]
    pub allowed_hosts: Vec<String>,
}

/// Oracle input shaping
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Concatenated page text handed to the oracle is capped at this length
    #[serde(rename = "max-input-chars")]
    pub max_input_chars: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            max_input_chars: 40_000,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            database_path: "./marketlens.db".to_string(),
        }
    }
}
