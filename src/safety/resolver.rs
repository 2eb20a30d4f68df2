//! Hostname resolution used by the safety validator
//!
//! Resolution sits behind the [`Resolve`] trait so the validator can be
//! exercised against fixed address tables.

use async_trait::async_trait;
use std::collections::HashMap;
use std::io;
use std::net::IpAddr;

/// Resolves a hostname to the addresses a connection would use
#[async_trait]
pub trait Resolve: Send + Sync {
    /// Returns every A and AAAA address for `host`, deduplicated, in
    /// resolver order
    async fn resolve(&self, host: &str, port: u16) -> io::Result<Vec<IpAddr>>;
}

/// Resolver backed by the operating system (`getaddrinfo` via tokio)
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemResolver;

#[async_trait]
impl Resolve for SystemResolver {
    async fn resolve(&self, host: &str, port: u16) -> io::Result<Vec<IpAddr>> {
        let mut addresses = Vec::new();
        for addr in tokio::net::lookup_host((host, port)).await? {
            if !addresses.contains(&addr.ip()) {
                addresses.push(addr.ip());
            }
        }
        Ok(addresses)
    }
}

/// Resolver answering from a fixed host table
///
/// Unknown hosts fail with `NotFound`, like an NXDOMAIN answer.
#[derive(Debug, Default, Clone)]
pub struct StaticResolver {
    entries: HashMap<String, Vec<IpAddr>>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) the addresses for a host
    pub fn with_host(mut self, host: &str, addresses: impl IntoIterator<Item = IpAddr>) -> Self {
        self.entries
            .insert(host.to_lowercase(), addresses.into_iter().collect());
        self
    }
}

#[async_trait]
impl Resolve for StaticResolver {
    async fn resolve(&self, host: &str, _port: u16) -> io::Result<Vec<IpAddr>> {
        self.entries
            .get(&host.to_lowercase())
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("no such host: {}", host)))
    }
}
