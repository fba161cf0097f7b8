//! HTML parser for listing and detail pages
//!
//! This module handles parsing HTML content to extract:
//! - Item links from a listing page, in page order
//! - Descriptive fields and the magnet link from a detail page
//! - The item key from a detail URL

use crate::config::SourceConfig;
use crate::crawler::source::ItemDetail;
use crate::ConfigError;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Compiled CSS selectors for one listing site
#[derive(Debug, Clone)]
pub struct PageSelectors {
    pub item: Selector,
    pub title: Selector,
    pub size: Selector,
    pub category: Selector,
    pub magnet: Selector,
}

impl PageSelectors {
    /// Compiles the selectors named in the source configuration
    pub fn from_config(config: &SourceConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            item: compile(&config.item_selector)?,
            title: compile(&config.title_selector)?,
            size: compile(&config.size_selector)?,
            category: compile(&config.category_selector)?,
            magnet: compile(&config.magnet_selector)?,
        })
    }
}

fn compile(selector: &str) -> Result<Selector, ConfigError> {
    Selector::parse(selector)
        .map_err(|e| ConfigError::InvalidSelector(format!("'{}': {:?}", selector, e)))
}

/// Extracts item links from a listing page
///
/// Links are resolved against `base_url` and returned in document order.
/// A link repeated on the same page is kept once, at its first position.
///
/// # Example
///
/// ```
/// use page_harvester::config::SourceConfig;
/// use page_harvester::crawler::{parse_listing, PageSelectors};
/// use url::Url;
///
/// let selectors = PageSelectors::from_config(&SourceConfig::default()).unwrap();
/// let html = r#"<table><tr><td class="name"><a href="/torrent/1/a/">A</a></td></tr></table>"#;
/// let base = Url::parse("https://listing.example.com/user-torrents/1/").unwrap();
/// let links = parse_listing(html, &base, &selectors);
/// assert_eq!(links, vec!["https://listing.example.com/torrent/1/a/"]);
/// ```
pub fn parse_listing(html: &str, base_url: &Url, selectors: &PageSelectors) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for element in document.select(&selectors.item) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        if let Some(absolute) = resolve_link(href, base_url) {
            if seen.insert(absolute.clone()) {
                links.push(absolute);
            }
        }
    }

    links
}

/// Parses a detail page into its fields
///
/// # Arguments
///
/// * `html` - The detail page content
/// * `page_url` - URL the page was fetched from; the item key comes from it
/// * `selectors` - Compiled site selectors
///
/// # Returns
///
/// * `Ok(ItemDetail)` - Parsed fields; absent ones are `None`
/// * `Err(String)` - No item key could be derived from the URL
pub fn parse_detail(
    html: &str,
    page_url: &Url,
    selectors: &PageSelectors,
) -> Result<ItemDetail, String> {
    let item_key = extract_item_key(page_url)
        .ok_or_else(|| format!("no item key in {}", page_url))?;

    let document = Html::parse_document(html);

    let magnet_link = document
        .select(&selectors.magnet)
        .filter_map(|element| element.value().attr("href"))
        .map(str::trim)
        .find(|href| href.starts_with("magnet:"))
        .map(str::to_string);

    Ok(ItemDetail {
        item_key,
        title: first_text(&document, &selectors.title),
        size_label: first_text(&document, &selectors.size),
        category: first_text(&document, &selectors.category),
        magnet_link,
    })
}

/// Text of the first element matching `selector`, whitespace-collapsed
fn first_text(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .next()
        .map(element_text)
        .filter(|s| !s.is_empty())
}

fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Derives the item key from a detail URL
///
/// Uses the first all-digit path segment (`/torrent/4821/name/` gives
/// `4821`), falling back to the last non-empty segment.
pub fn extract_item_key(url: &Url) -> Option<String> {
    let segments: Vec<&str> = url
        .path_segments()?
        .filter(|segment| !segment.is_empty())
        .collect();

    segments
        .iter()
        .find(|segment| segment.chars().all(|c| c.is_ascii_digit()))
        .or_else(|| segments.last())
        .map(|segment| segment.to_string())
}

/// Resolves an href to an absolute http(s) URL
///
/// Returns None for fragments, `javascript:`/`mailto:` links and anything
/// that does not resolve to http or https.
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let resolved = base_url.join(href).ok()?;
    match resolved.scheme() {
        "http" | "https" => Some(resolved.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selectors() -> PageSelectors {
        PageSelectors::from_config(&SourceConfig::default()).unwrap()
    }

    const LISTING: &str = r#"
        <html><body><table class="table-list">
          <tr><td class="name">
            <a href="/sub/54/0/" class="icon"></a>
            <a href="/torrent/1001/First-Item/">First Item</a>
          </td></tr>
          <tr><td class="name"><a href="/torrent/1002/Second-Item/">Second Item</a></td></tr>
          <tr><td class="name"><a href="/torrent/1001/First-Item/">Again</a></td></tr>
          <tr><td class="coll-2"><a href="/torrent/9999/not-a-name-cell/">x</a></td></tr>
        </table></body></html>
    "#;

    const DETAIL: &str = r#"
        <html><body>
          <div class="box-info-heading"><h1>  Some   Title
          </h1></div>
          <ul class="list">
            <li><strong>Category</strong> <span>Movies</span></li>
            <li><strong>Type</strong> <span>HD</span></li>
            <li><strong>Language</strong> <span>English</span></li>
            <li><strong>Total size</strong> <span>1.4 GB</span></li>
          </ul>
          <a href="https://mirror.example.com/dl">Mirror</a>
          <a href="magnet:?xt=urn:btih:ABCDEF&amp;dn=Some+Title">Magnet Download</a>
        </body></html>
    "#;

    #[test]
    fn test_parse_listing_order_and_dedup() {
        let base = Url::parse("https://listing.example.com/user-torrents/3/").unwrap();
        let links = parse_listing(LISTING, &base, &selectors());

        assert_eq!(
            links,
            vec![
                "https://listing.example.com/torrent/1001/First-Item/",
                "https://listing.example.com/torrent/1002/Second-Item/",
            ]
        );
    }

    #[test]
    fn test_parse_listing_without_items() {
        let base = Url::parse("https://listing.example.com/").unwrap();
        let links = parse_listing("<html><body><p>Nothing</p></body></html>", &base, &selectors());
        assert!(links.is_empty());
    }

    #[test]
    fn test_parse_detail() {
        let url = Url::parse("https://listing.example.com/torrent/1001/First-Item/").unwrap();
        let detail = parse_detail(DETAIL, &url, &selectors()).unwrap();

        assert_eq!(detail.item_key, "1001");
        assert_eq!(detail.title.as_deref(), Some("Some Title"));
        assert_eq!(detail.category.as_deref(), Some("Movies"));
        assert_eq!(detail.size_label.as_deref(), Some("1.4 GB"));
        assert_eq!(
            detail.magnet_link.as_deref(),
            Some("magnet:?xt=urn:btih:ABCDEF&dn=Some+Title")
        );
    }

    #[test]
    fn test_parse_detail_missing_fields() {
        let url = Url::parse("https://listing.example.com/torrent/77/x/").unwrap();
        let detail = parse_detail("<html><body></body></html>", &url, &selectors()).unwrap();

        assert_eq!(detail.item_key, "77");
        assert_eq!(detail.title, None);
        assert_eq!(detail.magnet_link, None);
    }

    #[test]
    fn test_extract_item_key() {
        let numeric = Url::parse("https://a.example.com/torrent/4821/name/").unwrap();
        assert_eq!(extract_item_key(&numeric).as_deref(), Some("4821"));

        let slug = Url::parse("https://a.example.com/item/some-slug/").unwrap();
        assert_eq!(extract_item_key(&slug).as_deref(), Some("some-slug"));

        let root = Url::parse("https://a.example.com/").unwrap();
        assert_eq!(extract_item_key(&root), None);
    }

    #[test]
    fn test_resolve_link_filters_schemes() {
        let base = Url::parse("https://a.example.com/list/").unwrap();
        assert_eq!(resolve_link("#top", &base), None);
        assert_eq!(resolve_link("javascript:void(0)", &base), None);
        assert_eq!(resolve_link("mailto:x@example.com", &base), None);
        assert_eq!(
            resolve_link("../torrent/1/", &base).as_deref(),
            Some("https://a.example.com/torrent/1/")
        );
    }
}
