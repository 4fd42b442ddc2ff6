use std::sync::Arc;

use htmd::HtmlToMarkdown;
use quarry_core::error::AppError;
use quarry_core::traits::Cleaner;

/// Elements that never carry article text.
const SKIPPED_TAGS: [&str; 10] = [
    "script", "style", "nav", "footer", "header", "aside", "noscript", "iframe", "svg", "form",
];

/// HTML-to-Markdown cleaner using htmd.
///
/// Produces the Markdown form stored in raw snapshots and sent to the
/// extractor. Page chrome is dropped; headings, lists, links and code blocks
/// survive.
#[derive(Clone)]
pub struct HtmdCleaner {
    converter: Arc<HtmlToMarkdown>,
}

impl HtmdCleaner {
    pub fn new() -> Self {
        let converter = HtmlToMarkdown::builder()
            .skip_tags(SKIPPED_TAGS.to_vec())
            .build();

        Self {
            converter: Arc::new(converter),
        }
    }
}

impl Default for HtmdCleaner {
    fn default() -> Self {
        Self::new()
    }
}

impl Cleaner for HtmdCleaner {
    fn clean(&self, html: &str) -> Result<String, AppError> {
        let markdown = self
            .converter
            .convert(html)
            .map_err(|e| AppError::CleanerError(e.to_string()))?;
        Ok(markdown.trim().to_string())
    }
}
