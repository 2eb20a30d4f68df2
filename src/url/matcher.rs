/// Checks if a hostname matches a host pattern
///
/// Two pattern forms are supported:
/// 1. Exact: "localhost" matches only "localhost"
/// 2. Suffix: "*.local" matches "local" itself and any name ending in
///    ".local" ("printer.local", "a.b.local")
///
/// Both sides are expected to be lowercase already.
///
/// # Examples
///
/// ```
/// use marketlens::url::matches_wildcard;
///
/// assert!(matches_wildcard("localhost", "localhost"));
/// assert!(matches_wildcard("*.local", "nas.local"));
/// assert!(!matches_wildcard("*.local", "notlocal"));
/// ```
pub fn matches_wildcard(pattern: &str, candidate: &str) -> bool {
    match pattern.strip_prefix("*.") {
        Some(base) => {
            candidate == base
                || candidate
                    .strip_suffix(base)
                    .map_or(false, |head| head.ends_with('.'))
        }
        None => candidate == pattern,
    }
}

/// Returns true if the hostname matches any of the patterns
pub fn matches_any<S: AsRef<str>>(patterns: &[S], candidate: &str) -> bool {
    patterns
        .iter()
        .any(|p| matches_wildcard(p.as_ref(), candidate))
}
