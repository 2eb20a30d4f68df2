use crate::UrlError;
use url::Url;

/// Normalizes a user-supplied company URL into an absolute http(s) URL
///
/// # Normalization Steps
///
/// 1. Trim surrounding whitespace; reject if nothing is left
/// 2. Prepend `https://` when the input carries no `scheme://` prefix
/// 3. Parse the URL; reject if malformed
/// 4. Reject schemes other than http and https
/// 5. Remove fragment (everything after #)
/// 6. Remove trailing slashes from the path (except for root /)
///
/// The host is lowercased by the parser itself.
///
/// # Examples
///
/// ```
/// use marketlens::url::normalize_external_url;
///
/// let url = normalize_external_url("  Acme.Example/pricing/#plans ").unwrap();
/// assert_eq!(url.as_str(), "https://acme.example/pricing");
/// ```
pub fn normalize_external_url(raw: &str) -> Result<Url, UrlError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let candidate = if has_explicit_scheme(trimmed) {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };

    let mut url = Url::parse(&candidate).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingHost);
    }

    url.set_fragment(None);
    let path = strip_trailing_slashes(url.path());
    url.set_path(&path);

    Ok(url)
}

/// Normalizes a URL for matching against previously stored companies
///
/// Drops fragment and query and strips trailing slashes, so
/// `https://acme.example/?ref=x#top` and `https://acme.example` compare equal.
/// Input that does not parse is returned trimmed, unchanged otherwise.
///
/// # Examples
///
/// ```
/// use marketlens::url::normalize_company_url;
///
/// assert_eq!(
///     normalize_company_url("https://acme.example/about/?utm_source=x#team"),
///     "https://acme.example/about"
/// );
/// assert_eq!(normalize_company_url(" not a url "), "not a url");
/// ```
pub fn normalize_company_url(raw: &str) -> String {
    match Url::parse(raw.trim()) {
        Ok(mut url) => {
            url.set_fragment(None);
            url.set_query(None);
            let path = strip_trailing_slashes(url.path());
            url.set_path(&path);
            url.to_string()
        }
        Err(_) => raw.trim().to_string(),
    }
}

/// Returns true when the input starts with `scheme://`
fn has_explicit_scheme(input: &str) -> bool {
    let Some((scheme, _)) = input.split_once("://") else {
        return false;
    };

    let mut chars = scheme.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => chars
            .all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '-' || c == '.'),
        _ => false,
    }
}

/// Removes trailing slashes from a path, keeping a bare "/"
fn strip_trailing_slashes(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}
