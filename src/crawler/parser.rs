//! HTML parser for page text, metadata and links
//!
//! This module turns a fetched HTML document into a [`ScrapedPage`]:
//! - Title and description
//! - `<meta>` name/property pairs
//! - Whitespace-collapsed body text, with non-content markup skipped
//! - Outbound links, absolute and deduplicated in discovery order

use scraper::{ElementRef, Html, Node, Selector};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use url::Url;

/// Elements whose contents never count as page text
const SKIPPED_ELEMENTS: &[&str] = &["script", "style", "noscript", "iframe"];

/// Descriptions taken from the first paragraph are cut to this many characters
const DESCRIPTION_FALLBACK_CHARS: usize = 300;

/// One fetched and parsed page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapedPage {
    /// Final URL after redirects
    pub url: String,

    /// `<title>` text, or the first `<h1>`
    pub title: String,

    /// Meta description, og:description, or the start of the first paragraph
    pub description: String,

    /// Body text, whitespace-collapsed and length-capped
    pub text: String,

    /// Absolute http(s) links, fragment-free, in discovery order
    pub links: Vec<String>,

    /// `<meta>` content keyed by `name` or `property`
    pub metadata: BTreeMap<String, String>,
}

/// Parses HTML content into a [`ScrapedPage`]
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` anywhere in the document
///
/// **Exclude:**
/// - `<a href="..." download>`
/// - `javascript:`, `mailto:`, `tel:` links
/// - Data URIs
/// - Fragment-only links (same page anchors)
///
/// # Arguments
///
/// * `html` - The HTML content to parse
/// * `page_url` - The final (post-redirect) URL, used to resolve relative links
/// * `max_text_chars` - Body text is truncated to this many characters
///
/// # Example
///
/// ```
/// use marketlens::crawler::parse_page;
/// use url::Url;
///
/// let html = r#"<html><head><title>Acme | Widgets</title></head><body><a href="/pricing">Pricing</a></body></html>"#;
/// let page_url = Url::parse("https://acme.example/").unwrap();
/// let page = parse_page(html, &page_url, 50_000);
/// assert_eq!(page.title, "Acme | Widgets");
/// assert_eq!(page.links, vec!["https://acme.example/pricing".to_string()]);
/// ```
pub fn parse_page(html: &str, page_url: &Url, max_text_chars: usize) -> ScrapedPage {
    let document = Html::parse_document(html);

    let metadata = extract_metadata(&document);
    let title = extract_title(&document);
    let description = extract_description(&document, &metadata);
    let text = extract_text(&document, max_text_chars);
    let links = extract_links(&document, page_url);

    ScrapedPage {
        url: page_url.to_string(),
        title,
        description,
        text,
        links,
        metadata,
    }
}

/// Collects `<meta>` tags that have both a key and content
///
/// Later tags overwrite earlier ones with the same key.
fn extract_metadata(document: &Html) -> BTreeMap<String, String> {
    let mut metadata = BTreeMap::new();

    let Ok(meta_selector) = Selector::parse("meta") else {
        return metadata;
    };

    for element in document.select(&meta_selector) {
        let attrs = element.value();
        let key = attrs
            .attr("name")
            .filter(|s| !s.is_empty())
            .or_else(|| attrs.attr("property"))
            .unwrap_or_default();
        let content = attrs.attr("content").unwrap_or_default();

        if !key.is_empty() && !content.is_empty() {
            metadata.insert(key.to_string(), content.to_string());
        }
    }

    metadata
}

/// Extracts the page title, falling back to the first `<h1>`
fn extract_title(document: &Html) -> String {
    first_text(document, "title")
        .or_else(|| first_text(document, "h1"))
        .unwrap_or_default()
}

fn extract_description(document: &Html, metadata: &BTreeMap<String, String>) -> String {
    if let Some(description) = ["description", "og:description"]
        .iter()
        .filter_map(|key| metadata.get(*key))
        .find(|value| !value.is_empty())
    {
        return description.clone();
    }

    first_text(document, "p")
        .map(|text| truncate_chars(&text, DESCRIPTION_FALLBACK_CHARS))
        .unwrap_or_default()
}

/// Returns the trimmed text of the first element matching `selector`, if any
/// and non-empty
fn first_text(document: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    let element = document.select(&selector).next()?;

    let mut text = String::new();
    collect_text(element, &mut text);
    let text = text.trim().to_string();

    (!text.is_empty()).then_some(text)
}

/// Flattens the body to plain text
fn extract_text(document: &Html, max_chars: usize) -> String {
    let mut raw = String::new();

    match Selector::parse("body")
        .ok()
        .and_then(|body| document.select(&body).next())
    {
        Some(body) => collect_text(body, &mut raw),
        None => collect_text(document.root_element(), &mut raw),
    }

    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    truncate_chars(&collapsed, max_chars)
}

/// Appends the text under `element` to `out`, skipping non-content elements
fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) if SKIPPED_ELEMENTS.contains(&el.name()) => {}
            Node::Element(_) => {
                if let Some(child_element) = ElementRef::wrap(child) {
                    collect_text(child_element, out);
                }
            }
            _ => {}
        }
    }
}

/// Extracts all valid links from the HTML document
fn extract_links(document: &Html, page_url: &Url) -> Vec<String> {
    let mut links = Vec::new();
    let mut seen = HashSet::new();

    let Ok(a_selector) = Selector::parse("a[href]") else {
        return links;
    };

    for element in document.select(&a_selector) {
        // Skip if it has the download attribute
        if element.value().attr("download").is_some() {
            continue;
        }

        if let Some(absolute_url) = element
            .value()
            .attr("href")
            .and_then(|href| resolve_link(href, page_url))
        {
            if seen.insert(absolute_url.clone()) {
                links.push(absolute_url);
            }
        }
    }

    links
}

/// Resolves a link href to an absolute URL and validates it
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - Fragment-only hrefs
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lowered = href.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lowered.starts_with(scheme))
    {
        return None;
    }

    let mut absolute_url = base_url.join(href).ok()?;
    if absolute_url.scheme() != "http" && absolute_url.scheme() != "https" {
        return None;
    }

    absolute_url.set_fragment(None);
    Some(absolute_url.to_string())
}

/// Truncates to at most `max_chars` characters without splitting a character
pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => text[..byte_index].to_string(),
        None => text.to_string(),
    }
}
