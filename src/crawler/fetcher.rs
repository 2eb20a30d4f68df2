//! HTTP fetcher implementation
//!
//! This module handles every HTTP request the crawler makes:
//! - Building HTTP clients with the configured user agent and timeout
//! - Following redirects manually, re-validating each hop
//! - Optionally pinning each connection to the validated addresses
//! - Reading bodies up to a size cap
//! - Error classification

use crate::config::FetcherConfig;
use crate::crawler::frontier::VisitedSet;
use crate::crawler::parser::{parse_page, ScrapedPage};
use crate::safety::{SafetyValidator, ValidatedUrl, ValidationError};
use crate::url::same_host;
use crate::FailureKind;
use reqwest::header::LOCATION;
use reqwest::{redirect::Policy, Client, Response, StatusCode};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use url::{Host, Url};

/// Reasons a single page fetch fails
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("{url}: {source}")]
    Rejected {
        url: String,
        #[source]
        source: ValidationError,
    },

    #[error("{url}: more than {limit} requests in redirect chain")]
    TooManyRedirects { url: String, limit: u32 },

    #[error("{url}: redirect {status} without a Location header")]
    MissingLocation { url: String, status: u16 },

    #[error("{url}: redirect to unparseable location '{location}'")]
    InvalidLocation { url: String, location: String },

    #[error("{url}: redirect leaves {host}")]
    OffHost { url: String, host: String },

    #[error("{url}: already visited")]
    AlreadyVisited { url: String },

    #[error("{url}: HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("{url}: request timed out")]
    Timeout { url: String },

    #[error("{url}: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

impl FetchError {
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Self::Rejected { source, .. } => source.failure_kind(),
            Self::Client(_) => FailureKind::Internal,
            Self::OffHost { .. } | Self::AlreadyVisited { .. } => FailureKind::PolicyRejected,
            Self::TooManyRedirects { .. }
            | Self::MissingLocation { .. }
            | Self::InvalidLocation { .. }
            | Self::Status { .. }
            | Self::Timeout { .. }
            | Self::Http { .. } => FailureKind::Unreachable,
        }
    }

    /// True for redirects that leave the crawl's scope rather than fail
    pub fn is_out_of_scope(&self) -> bool {
        matches!(self, Self::OffHost { .. } | Self::AlreadyVisited { .. })
    }

    fn from_reqwest(url: &Url, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                url: url.to_string(),
            }
        } else {
            Self::Http {
                url: url.to_string(),
                source: err,
            }
        }
    }
}

/// Builds an HTTP client with proper configuration
///
/// Redirects are never followed by the client itself; [`PageFetcher`]
/// follows them so that every hop is validated.
///
/// # Example
///
/// ```
/// use marketlens::config::FetcherConfig;
/// use marketlens::crawler::build_http_client;
///
/// let client = build_http_client(&FetcherConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &FetcherConfig) -> Result<Client, reqwest::Error> {
    client_builder(config).build()
}

fn client_builder(config: &FetcherConfig) -> reqwest::ClientBuilder {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(config.timeout_secs.min(10)))
        .redirect(Policy::none()) // Handle redirects manually
        .gzip(true)
        .brotli(true)
}

/// Fetches single pages safely
#[derive(Debug, Clone)]
pub struct PageFetcher {
    client: Client,
    validator: Arc<SafetyValidator>,
    config: FetcherConfig,
}

impl PageFetcher {
    pub fn new(config: FetcherConfig, validator: Arc<SafetyValidator>) -> Result<Self, FetchError> {
        let client = build_http_client(&config).map_err(FetchError::Client)?;
        Ok(Self {
            client,
            validator,
            config,
        })
    }

    /// Fetches and parses one page
    ///
    /// # Request Flow
    ///
    /// For at most `max-hops` requests:
    /// 1. Validate the current URL (DNS is resolved afresh)
    /// 2. Send a GET with redirect-following disabled
    /// 3. On any 3xx other than 304, resolve `Location` against the current
    ///    URL and loop
    /// 4. On 2xx, read the body and parse it against the final URL
    ///
    /// Any other status, a rejected hop, a redirect without `Location`, or
    /// running out of hops fails the fetch.
    pub async fn fetch(&self, url: &Url) -> Result<ScrapedPage, FetchError> {
        self.fetch_inner(url, |_| Ok(())).await
    }

    /// Fetches a page without leaving one crawl's scope
    ///
    /// Every redirect target is claimed in `visited` before it is requested;
    /// a target that was already visited, or that is not on `host` when one
    /// is given, ends the fetch without a request. The page returned is
    /// therefore always on `host` and was never fetched before.
    pub async fn fetch_scoped(
        &self,
        url: &Url,
        host: Option<&str>,
        visited: &mut VisitedSet,
    ) -> Result<ScrapedPage, FetchError> {
        self.fetch_inner(url, |next| {
            if let Some(host) = host {
                if !same_host(next, host) {
                    return Err(FetchError::OffHost {
                        url: next.to_string(),
                        host: host.to_string(),
                    });
                }
            }
            if !visited.insert(next) {
                return Err(FetchError::AlreadyVisited {
                    url: next.to_string(),
                });
            }
            Ok(())
        })
        .await
    }

    async fn fetch_inner<F>(&self, url: &Url, mut on_redirect: F) -> Result<ScrapedPage, FetchError>
    where
        F: FnMut(&Url) -> Result<(), FetchError>,
    {
        let mut current = url.clone();

        for hop in 1..=self.config.max_hops {
            let validated = self
                .validator
                .check_url(&current)
                .await
                .map_err(|source| {
                    tracing::info!("Rejected {}: {}", current, source);
                    FetchError::Rejected {
                        url: current.to_string(),
                        source,
                    }
                })?;

            tracing::debug!("Fetching {} (hop {}/{})", current, hop, self.config.max_hops);

            let response = self
                .client_for(&validated)?
                .get(current.clone())
                .send()
                .await
                .map_err(|e| FetchError::from_reqwest(&current, e))?;

            let status = response.status();

            if status.is_redirection() && status != StatusCode::NOT_MODIFIED {
                let location = response
                    .headers()
                    .get(LOCATION)
                    .and_then(|v| v.to_str().ok())
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .ok_or_else(|| FetchError::MissingLocation {
                        url: current.to_string(),
                        status: status.as_u16(),
                    })?;

                let next = current
                    .join(location)
                    .map_err(|_| FetchError::InvalidLocation {
                        url: current.to_string(),
                        location: location.to_string(),
                    })?;

                tracing::debug!("Redirect {} {} -> {}", status.as_u16(), current, next);
                on_redirect(&next)?;
                current = next;
                continue;
            }

            if !status.is_success() {
                return Err(FetchError::Status {
                    url: current.to_string(),
                    status: status.as_u16(),
                });
            }

            let body = read_body(response, self.config.max_body_bytes)
                .await
                .map_err(|e| FetchError::from_reqwest(&current, e))?;

            return Ok(parse_page(&body, &current, self.config.max_text_chars));
        }

        Err(FetchError::TooManyRedirects {
            url: url.to_string(),
            limit: self.config.max_hops,
        })
    }

    /// Returns the client to use for one hop
    ///
    /// With `pin-dns` enabled, a domain host gets a one-off client that
    /// connects to the first validated address instead of resolving again.
    fn client_for(&self, validated: &ValidatedUrl) -> Result<Client, FetchError> {
        if !self.config.pin_dns {
            return Ok(self.client.clone());
        }

        let (Some(Host::Domain(host)), Some(&address)) =
            (validated.url.host(), validated.resolved_addresses.first())
        else {
            return Ok(self.client.clone());
        };

        let port = validated.url.port_or_known_default().unwrap_or(443);
        client_builder(&self.config)
            .resolve(host, SocketAddr::new(address, port))
            .build()
            .map_err(FetchError::Client)
    }
}

/// Reads the response body, dropping anything past `max_bytes`
async fn read_body(mut response: Response, max_bytes: usize) -> Result<String, reqwest::Error> {
    let mut body: Vec<u8> = Vec::new();

    while let Some(chunk) = response.chunk().await? {
        let remaining = max_bytes.saturating_sub(body.len());
        if chunk.len() >= remaining {
            body.extend_from_slice(&chunk[..remaining]);
            tracing::debug!("Body of {} truncated at {} bytes", response.url(), max_bytes);
            break;
        }
        body.extend_from_slice(&chunk);
    }

    Ok(String::from_utf8_lossy(&body).into_owned())
}
