use std::collections::HashSet;

use scraper::{Html, Selector};
use url::Url;

use crate::config::SiteConfig;

/// Every `href` on the page, in document order, as written.
pub fn extract_hrefs(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };
    document
        .select(&selector)
        .filter_map(|a| a.value().attr("href"))
        .map(|href| href.trim().to_string())
        .collect()
}

/// Resolve an href against the origin (scheme, host and port) of `base`,
/// skipping in-page and non-navigational references. Any path on `base` is
/// ignored.
pub fn resolve_href(href: &str, base: &Url) -> Option<Url> {
    let trimmed = href.trim();
    if trimmed.is_empty() {
        return None;
    }
    let lower = trimmed.to_ascii_lowercase();
    if lower.starts_with('#')
        || lower.starts_with("javascript:")
        || lower.starts_with("mailto:")
        || lower.starts_with("tel:")
    {
        return None;
    }
    if let Ok(url) = Url::parse(trimmed) {
        return Some(url);
    }
    base.join("/").ok()?.join(trimmed).ok()
}

/// Article URLs linked from the site index.
///
/// Keeps internal links (same host as the site) whose path contains one of
/// the configured markers. Duplicates are kept unless the site asks for
/// deduplication; `limit` caps the result.
pub fn discover_article_urls(html: &str, site: &SiteConfig) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut urls = Vec::new();

    for href in extract_hrefs(html) {
        let Some(mut url) = resolve_href(&href, &site.base_url) else {
            continue;
        };
        if !matches!(url.scheme(), "http" | "https") || url.host() != site.base_url.host() {
            continue;
        }
        if !site
            .article_markers
            .iter()
            .any(|marker| url.path().contains(marker.as_str()))
        {
            continue;
        }

        url.set_fragment(None);
        let url = String::from(url);
        if site.dedupe && !seen.insert(url.clone()) {
            continue;
        }
        urls.push(url);
    }

    if let Some(limit) = site.limit {
        urls.truncate(limit);
    }
    urls
}
