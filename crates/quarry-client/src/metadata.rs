//! Page metadata and frame handling on parsed HTML.

use quarry_core::models::PageMetadata;
use scraper::{Html, Selector};
use url::Url;

/// Metadata keys that may carry the publication date, in priority order.
const DATE_KEYS: [&str; 3] = ["article:published_time", "date", "dc.date"];

/// Site-reported metadata of a page.
///
/// Collects `<title>` as `title` and every `<meta name|property content>`
/// under its lowercased name (first occurrence wins). `date` is derived from
/// the first date-like meta entry, falling back to the first
/// `<time datetime>`.
pub fn parse_metadata(html: &str) -> PageMetadata {
    let document = Html::parse_document(html);
    let mut metadata = PageMetadata::new();

    if let Ok(selector) = Selector::parse("title") {
        if let Some(title) = document.select(&selector).next() {
            let title = title.text().collect::<String>();
            let title = title.trim();
            if !title.is_empty() {
                metadata.insert("title".into(), title.to_string());
            }
        }
    }

    if let Ok(selector) = Selector::parse("meta[content]") {
        for meta in document.select(&selector) {
            let element = meta.value();
            let Some(key) = element.attr("name").or_else(|| element.attr("property")) else {
                continue;
            };
            let content = element.attr("content").unwrap_or_default().trim();
            if content.is_empty() {
                continue;
            }
            metadata
                .entry(key.trim().to_lowercase())
                .or_insert_with(|| content.to_string());
        }
    }

    let date = DATE_KEYS
        .iter()
        .find_map(|key| metadata.get(*key).cloned())
        .or_else(|| first_time_datetime(&document));
    if let Some(date) = date {
        metadata.insert("date".into(), date);
    }

    metadata
}

fn first_time_datetime(document: &Html) -> Option<String> {
    let selector = Selector::parse("time[datetime]").ok()?;
    document
        .select(&selector)
        .filter_map(|t| t.value().attr("datetime"))
        .map(str::trim)
        .find(|d| !d.is_empty())
        .map(str::to_string)
}

/// Absolute http(s) URLs of the page's `<iframe src>` documents.
pub fn frame_sources(html: &str, base: &Url) -> Vec<Url> {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse("iframe[src]") else {
        return Vec::new();
    };
    document
        .select(&selector)
        .filter_map(|f| f.value().attr("src"))
        .filter_map(|src| base.join(src.trim()).ok())
        .filter(|url| matches!(url.scheme(), "http" | "https"))
        .collect()
}

/// Inner HTML of a document's `<body>`, or the whole input if it has none.
pub fn body_html(html: &str) -> String {
    let document = Html::parse_document(html);
    Selector::parse("body")
        .ok()
        .and_then(|selector| document.select(&selector).next().map(|b| b.inner_html()))
        .unwrap_or_else(|| html.to_string())
}

/// Insert frame bodies just before the page's closing `</body>`.
pub fn inline_frames(html: &str, frames: &[String]) -> String {
    if frames.is_empty() {
        return html.to_string();
    }

    let inlined: String = frames
        .iter()
        .map(|body| format!("<div data-quarry-frame>{body}</div>"))
        .collect();

    match html.to_ascii_lowercase().rfind("</body>") {
        Some(pos) => format!("{}{inlined}{}", &html[..pos], &html[pos..]),
        None => format!("{html}{inlined}"),
    }
}
