use url::Url;

/// Extracts the lowercase host from a URL
///
/// IPv6 hosts are returned in their bracketed form, as `Url::host_str` does.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use marketlens::url::extract_domain;
///
/// let url = Url::parse("https://Blog.Example.com/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("blog.example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Returns true when the URL's host equals `host` exactly (case-insensitive)
///
/// Subdomains do not count: `blog.acme.example` is a different host from
/// `acme.example`.
pub fn same_host(url: &Url, host: &str) -> bool {
    url.host_str()
        .map_or(false, |h| h.eq_ignore_ascii_case(host))
}

/// Strips one leading "www." from a hostname
pub fn strip_www(host: &str) -> &str {
    host.strip_prefix("www.").unwrap_or(host)
}
