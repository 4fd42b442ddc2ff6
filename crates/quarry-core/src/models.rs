use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, TimeZone};
use serde::{Deserialize, Serialize};

/// Site-reported metadata (`title`, `description`, `date`, `og:*`, ...).
pub type PageMetadata = BTreeMap<String, String>;

/// Format used for capture timestamps and the file names derived from them.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Estimated technical complexity of an article.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TechnicalLevel {
    Basic,
    Intermediate,
    Advanced,
}

impl TechnicalLevel {
    pub const ALL: [TechnicalLevel; 3] = [
        TechnicalLevel::Basic,
        TechnicalLevel::Intermediate,
        TechnicalLevel::Advanced,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TechnicalLevel::Basic => "basic",
            TechnicalLevel::Intermediate => "intermediate",
            TechnicalLevel::Advanced => "advanced",
        }
    }
}

impl fmt::Display for TechnicalLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TechnicalLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "basic" => Ok(TechnicalLevel::Basic),
            "intermediate" => Ok(TechnicalLevel::Intermediate),
            "advanced" => Ok(TechnicalLevel::Advanced),
            _ => Err(format!("Unknown technical level: {}", s)),
        }
    }
}

/// Structured metadata the LLM extracts from one article.
///
/// `date_published` may be missing (the model could not infer it) and
/// `categories` defaults to empty; every other field is required.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleRecord {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub date_published: Option<String>,
    /// A concise summary of the main points.
    pub summary: String,
    /// Technical concepts discussed in the post.
    pub key_concepts: Vec<String>,
    pub technical_level: TechnicalLevel,
    /// Topic categories of the post.
    #[serde(default)]
    pub categories: Vec<String>,
    /// Whether the post primarily discusses Ethereum.
    pub ethereum_related: bool,
    /// Whether the post contains code examples.
    pub code_snippets_present: bool,
}

impl ArticleRecord {
    /// JSON keys owned by the record itself.
    pub const FIELDS: [&'static str; 9] = [
        "title",
        "url",
        "date_published",
        "summary",
        "key_concepts",
        "technical_level",
        "categories",
        "ethereum_related",
        "code_snippets_present",
    ];
}

/// A validated extraction: the typed record plus any keys the model added
/// beyond the schema.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedRecord {
    pub record: ArticleRecord,
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Capture time of an article, rendered as `YYYYMMDD_HHMMSS`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct CaptureTimestamp(String);

impl CaptureTimestamp {
    pub fn from_datetime<Tz>(at: &DateTime<Tz>) -> Self
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        Self(at.format(TIMESTAMP_FORMAT).to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CaptureTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How a page should be retrieved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FetchOptions {
    /// Inline the documents of embedded `<iframe>`s.
    pub render_frames: bool,
    /// Wait for images (and anything they trigger) before capturing.
    pub wait_for_images: bool,
    /// Ask every cache on the way to revalidate.
    pub cache_bypass: bool,
}

impl FetchOptions {
    /// Options for the site index: always fresh, no rendering extras.
    pub fn index() -> Self {
        Self {
            cache_bypass: true,
            ..Self::default()
        }
    }

    /// Options for an article: full rendering, default caching.
    pub fn article() -> Self {
        Self {
            render_frames: true,
            wait_for_images: true,
            cache_bypass: false,
        }
    }
}

/// What a fetch engine returns for a successfully retrieved page.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedPage {
    pub url: String,
    pub html: String,
    pub metadata: PageMetadata,
}

/// A fetched page after cleaning, stamped with its capture time.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedArticle {
    pub url: String,
    pub html: String,
    pub markdown: String,
    pub metadata: PageMetadata,
    pub crawl_date: CaptureTimestamp,
}

impl FetchedArticle {
    pub fn new(page: FetchedPage, markdown: String, crawl_date: CaptureTimestamp) -> Self {
        Self {
            url: page.url,
            html: page.html,
            markdown,
            metadata: page.metadata,
            crawl_date,
        }
    }

    pub fn snapshot(&self) -> RawSnapshot<'_> {
        RawSnapshot {
            url: &self.url,
            html: &self.html,
            markdown: &self.markdown,
            metadata: &self.metadata,
            crawl_date: &self.crawl_date,
        }
    }

    /// Non-empty metadata value for `key`.
    fn meta(&self, key: &str) -> Option<&str> {
        self.metadata
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }
}

/// Everything captured for an article, written whether or not extraction
/// succeeds.
#[derive(Debug, Clone, Serialize)]
pub struct RawSnapshot<'a> {
    pub url: &'a str,
    pub html: &'a str,
    pub markdown: &'a str,
    pub metadata: &'a PageMetadata,
    pub crawl_date: &'a CaptureTimestamp,
}

/// The extracted record merged with fetch-side facts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessedRecord {
    #[serde(flatten)]
    pub record: ArticleRecord,
    pub crawl_date: CaptureTimestamp,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ProcessedRecord {
    /// Merge an extraction with the article it came from.
    ///
    /// `url` always comes from the fetch. `title` and `date_published` come
    /// from the page metadata when it reports them, otherwise the values the
    /// model inferred are kept.
    pub fn from_extraction(extracted: ExtractedRecord, article: &FetchedArticle) -> Self {
        let ExtractedRecord { mut record, extra } = extracted;

        record.url = article.url.clone();
        if let Some(title) = article.meta("title") {
            record.title = title.to_string();
        }
        if let Some(date) = article.meta("date") {
            record.date_published = Some(date.to_string());
        }

        Self {
            record,
            crawl_date: article.crawl_date.clone(),
            extra,
        }
    }
}
