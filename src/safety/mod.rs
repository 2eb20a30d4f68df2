//! URL safety validation (SSRF defense)
//!
//! Every URL the crawler touches passes through [`SafetyValidator`]:
//! - the user-supplied seed, via [`SafetyValidator::validate`], which also
//!   normalizes it
//! - every redirect hop, via [`SafetyValidator::check_url`], which checks the
//!   URL as-is
//!
//! Hostnames are resolved on every check and rejected if *any* resolved
//! address is non-public, so a name that rebinds between checks is caught at
//! the next hop.

mod ip;
mod resolver;

pub use ip::{classify_ip, is_private_or_local, AddressClass};
pub use resolver::{Resolve, StaticResolver, SystemResolver};

use crate::config::SafetyConfig;
use crate::url::{matches_any, normalize_external_url};
use crate::{FailureKind, UrlError};
use std::collections::HashSet;
use std::net::IpAddr;
use std::sync::Arc;
use thiserror::Error;
use url::{Host, Url};

/// Hostnames that always name the local machine or network
const BLOCKED_HOSTNAMES: &[&str] = &[
    "localhost",
    "localhost.localdomain",
    "ip6-localhost",
    "ip6-loopback",
    "*.localhost",
    "*.local",
];

/// Reasons a URL is refused
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Valid URL required: {0}")]
    InvalidUrl(String),

    #[error("Valid http/https URL required, got scheme '{0}'")]
    UnsupportedScheme(String),

    #[error("URL credentials are not allowed")]
    CredentialsNotAllowed,

    #[error("Private/local hostnames are not allowed: {0}")]
    BlockedHostname(String),

    #[error("Private/local IP addresses are not allowed: {address} ({class})")]
    PrivateAddress { address: IpAddr, class: AddressClass },

    #[error("Resolved host {host} points to a private/local IP: {address} ({class})")]
    ResolvesToPrivate {
        host: String,
        address: IpAddr,
        class: AddressClass,
    },

    #[error("Unable to resolve host {host}: {message}")]
    Resolution { host: String, message: String },

    #[error("Host {0} resolved to no addresses")]
    NoAddresses(String),
}

impl ValidationError {
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Self::InvalidUrl(_) | Self::UnsupportedScheme(_) => FailureKind::BadInput,
            Self::CredentialsNotAllowed
            | Self::BlockedHostname(_)
            | Self::PrivateAddress { .. }
            | Self::ResolvesToPrivate { .. } => FailureKind::PolicyRejected,
            Self::Resolution { .. } | Self::NoAddresses(_) => FailureKind::Unreachable,
        }
    }
}

impl From<UrlError> for ValidationError {
    fn from(err: UrlError) -> Self {
        match err {
            UrlError::InvalidScheme(scheme) => Self::UnsupportedScheme(scheme),
            other => Self::InvalidUrl(other.to_string()),
        }
    }
}

/// A URL that passed validation, with the addresses it was checked against
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedUrl {
    pub url: Url,
    pub resolved_addresses: Vec<IpAddr>,
}

impl ValidatedUrl {
    pub fn normalized_url(&self) -> &str {
        self.url.as_str()
    }
}

/// Vets URLs against SSRF vectors
#[derive(Clone)]
pub struct SafetyValidator {
    resolver: Arc<dyn Resolve>,
    blocked_hosts: Vec<String>,
    allowed_hosts: HashSet<String>,
}

impl std::fmt::Debug for SafetyValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SafetyValidator")
            .field("blocked_hosts", &self.blocked_hosts)
            .field("allowed_hosts", &self.allowed_hosts)
            .finish_non_exhaustive()
    }
}

impl Default for SafetyValidator {
    fn default() -> Self {
        Self::new(&SafetyConfig::default())
    }
}

impl SafetyValidator {
    /// Creates a validator using the system resolver
    pub fn new(config: &SafetyConfig) -> Self {
        let blocked_hosts = BLOCKED_HOSTNAMES
            .iter()
            .map(|h| h.to_string())
            .chain(config.blocked_hosts.iter().map(|h| h.to_lowercase()))
            .collect();

        let allowed_hosts = config
            .allowed_hosts
            .iter()
            .map(|h| allow_list_key(h))
            .collect();

        Self {
            resolver: Arc::new(SystemResolver),
            blocked_hosts,
            allowed_hosts,
        }
    }

    /// Replaces the resolver
    pub fn with_resolver(mut self, resolver: Arc<dyn Resolve>) -> Self {
        self.resolver = resolver;
        self
    }

    /// Normalizes and validates a user-supplied URL
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use marketlens::safety::SafetyValidator;
    ///
    /// # async fn example() {
    /// let validator = SafetyValidator::default();
    /// let validated = validator.validate("acme.example/about/").await.unwrap();
    /// assert_eq!(validated.normalized_url(), "https://acme.example/about");
    /// assert!(validator.validate("http://169.254.169.254/").await.is_err());
    /// # }
    /// ```
    pub async fn validate(&self, raw_url: &str) -> Result<ValidatedUrl, ValidationError> {
        let url = normalize_external_url(raw_url)?;
        self.check_url(&url).await
    }

    /// Validates an absolute URL without rewriting it
    ///
    /// Used on every redirect hop. DNS is resolved afresh on each call.
    pub async fn check_url(&self, url: &Url) -> Result<ValidatedUrl, ValidationError> {
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ValidationError::UnsupportedScheme(url.scheme().to_string()));
        }

        if !url.username().is_empty() || url.password().is_some() {
            return Err(ValidationError::CredentialsNotAllowed);
        }

        let host = url
            .host()
            .ok_or_else(|| ValidationError::InvalidUrl("missing host".to_string()))?;
        let port = url.port_or_known_default().unwrap_or(443);

        let host_key = allow_list_key(url.host_str().unwrap_or_default());
        if self.allowed_hosts.contains(&host_key) {
            tracing::debug!("Host {} is allow-listed, skipping address checks", host_key);
            let resolved_addresses = self.addresses_for(&host, port).await?;
            return Ok(ValidatedUrl {
                url: url.clone(),
                resolved_addresses,
            });
        }

        let resolved_addresses = match host {
            Host::Domain(name) => {
                let name = name.trim_end_matches('.').to_lowercase();
                if matches_any(&self.blocked_hosts, &name) {
                    return Err(ValidationError::BlockedHostname(name));
                }

                let addresses = self.resolve(&name, port).await?;
                if let Some(&address) = addresses.iter().find(|ip| is_private_or_local(**ip)) {
                    return Err(ValidationError::ResolvesToPrivate {
                        host: name,
                        address,
                        class: classify_ip(address),
                    });
                }
                addresses
            }
            Host::Ipv4(v4) => vec![check_literal(IpAddr::V4(v4))?],
            Host::Ipv6(v6) => vec![check_literal(IpAddr::V6(v6))?],
        };

        Ok(ValidatedUrl {
            url: url.clone(),
            resolved_addresses,
        })
    }

    async fn addresses_for(
        &self,
        host: &Host<&str>,
        port: u16,
    ) -> Result<Vec<IpAddr>, ValidationError> {
        match host {
            Host::Domain(name) => self.resolve(name, port).await,
            Host::Ipv4(v4) => Ok(vec![IpAddr::V4(*v4)]),
            Host::Ipv6(v6) => Ok(vec![IpAddr::V6(*v6)]),
        }
    }

    async fn resolve(&self, host: &str, port: u16) -> Result<Vec<IpAddr>, ValidationError> {
        let addresses = self
            .resolver
            .resolve(host, port)
            .await
            .map_err(|e| ValidationError::Resolution {
                host: host.to_string(),
                message: e.to_string(),
            })?;

        if addresses.is_empty() {
            return Err(ValidationError::NoAddresses(host.to_string()));
        }
        Ok(addresses)
    }
}

/// Allow-list form of a host: lowercase, no IPv6 brackets, no trailing dot
fn allow_list_key(host: &str) -> String {
    host.trim()
        .trim_start_matches('[')
        .trim_end_matches(']')
        .trim_end_matches('.')
        .to_lowercase()
}

fn check_literal(address: IpAddr) -> Result<IpAddr, ValidationError> {
    let class = classify_ip(address);
    if class.is_public() {
        Ok(address)
    } else {
        Err(ValidationError::PrivateAddress { address, class })
    }
}

/// Validates a user-supplied company URL with the default policy and the
/// system resolver
pub async fn validate_external_company_url(raw_url: &str) -> Result<ValidatedUrl, ValidationError> {
    SafetyValidator::default().validate(raw_url).await
}
