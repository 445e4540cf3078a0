//! HTML parser and link discovery
//!
//! This module fetches target pages and extracts the links they point to:
//! - `<a href="...">` tags, resolved against the page URL
//! - duplicates removed, first occurrence kept
//! - page title, for logging

use crate::crawler::fetcher::Fetcher;
use crate::HarvestError;
use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Extracted information from an HTML page
#[derive(Debug, Clone)]
pub struct ParsedPage {
    /// The page title (from <title> tag)
    pub title: Option<String>,

    /// All links found on the page (absolute URLs, in document order)
    pub links: Vec<String>,
}

/// Parses HTML content and extracts links and the title
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` tags anywhere in the document, including ones carrying the
///   `download` attribute
///
/// **Exclude:**
/// - `javascript:`, `mailto:`, `tel:` links
/// - Data URIs
/// - Fragment-only links
/// - Anything that does not resolve to an http(s) URL
///
/// # Example
///
/// ```
/// use harvester::crawler::parse_html;
/// use url::Url;
///
/// let html = r#"<html><head><title>Reports</title></head><body><a href="q1.pdf">Q1</a></body></html>"#;
/// let base_url = Url::parse("https://example.com/reports/").unwrap();
/// let parsed = parse_html(html, &base_url);
/// assert_eq!(parsed.title, Some("Reports".to_string()));
/// assert_eq!(parsed.links, vec!["https://example.com/reports/q1.pdf"]);
/// ```
pub fn parse_html(html: &str, base_url: &Url) -> ParsedPage {
    let document = Html::parse_document(html);

    ParsedPage {
        title: extract_title(&document),
        links: extract_links(&document, base_url),
    }
}

/// Fetches a target page and returns the absolute links on it
///
/// Any failure to fetch the page is reported as [`HarvestError::PageFetch`]; the caller
/// skips the target and carries on.
pub async fn discover_links(
    fetcher: &mut Fetcher,
    page_url: &str,
) -> Result<ParsedPage, HarvestError> {
    let page = fetcher
        .fetch_page(page_url)
        .await
        .map_err(|e| HarvestError::PageFetch {
            url: page_url.to_string(),
            reason: e.to_string(),
        })?;

    Ok(parse_html(&page.body, &page.final_url))
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Extracts all valid, distinct links from the HTML document
fn extract_links(document: &Html, base_url: &Url) -> Vec<String> {
    let mut links = Vec::new();
    let mut seen = HashSet::new();

    let Ok(a_selector) = Selector::parse("a[href]") else {
        return links;
    };

    for element in document.select(&a_selector) {
        if let Some(absolute_url) = element
            .value()
            .attr("href")
            .and_then(|href| resolve_link(href, base_url))
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
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if lower.starts_with("javascript:")
        || lower.starts_with("mailto:")
        || lower.starts_with("tel:")
        || lower.starts_with("data:")
    {
        return None;
    }

    let absolute_url = base_url.join(href).ok()?;
    if absolute_url.scheme() == "http" || absolute_url.scheme() == "https" {
        Some(absolute_url.to_string())
    } else {
        None
    }
}
