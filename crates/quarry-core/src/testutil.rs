//! Test utilities: mock implementations of all core traits.
//!
//! Handwritten mocks for dependency injection in unit tests. Shared state
//! lives behind `Arc<Mutex<_>>` so clones handed to the pipeline record into
//! the same place the test asserts on.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Local, TimeZone};

use crate::error::AppError;
use crate::models::{FetchOptions, FetchedPage, PageMetadata, ProcessedRecord, RawSnapshot};
use crate::report::{CrawlEvent, CrawlReporter};
use crate::traits::{Cleaner, Clock, Extractor, Fetcher, SnapshotStore};

// ---------------------------------------------------------------------------
// MockFetcher
// ---------------------------------------------------------------------------

/// Mock fetcher serving pages keyed by URL.
///
/// Unknown URLs fail with an HTTP 404 error. Errors registered with
/// [`MockFetcher::with_error`] are returned once.
#[derive(Clone, Default)]
pub struct MockFetcher {
    pages: Arc<Mutex<HashMap<String, FetchedPage>>>,
    errors: Arc<Mutex<HashMap<String, AppError>>>,
    calls: Arc<Mutex<Vec<(String, FetchOptions)>>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(self, url: &str, html: &str) -> Self {
        self.with_page_metadata(url, html, &[])
    }

    pub fn with_titled_page(self, url: &str, html: &str, title: &str) -> Self {
        self.with_page_metadata(url, html, &[("title", title)])
    }

    pub fn with_page_metadata(self, url: &str, html: &str, metadata: &[(&str, &str)]) -> Self {
        let metadata: PageMetadata = metadata
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self.pages.lock().unwrap().insert(
            url.to_string(),
            FetchedPage {
                url: url.to_string(),
                html: html.to_string(),
                metadata,
            },
        );
        self
    }

    pub fn with_error(self, url: &str, error: AppError) -> Self {
        self.errors.lock().unwrap().insert(url.to_string(), error);
        self
    }

    /// Every fetch made so far, in order.
    pub fn calls(&self) -> Vec<(String, FetchOptions)> {
        self.calls.lock().unwrap().clone()
    }
}

impl Fetcher for MockFetcher {
    async fn fetch(&self, url: &str, options: &FetchOptions) -> Result<FetchedPage, AppError> {
        self.calls
            .lock()
            .unwrap()
            .push((url.to_string(), *options));

        if let Some(e) = self.errors.lock().unwrap().remove(url) {
            return Err(e);
        }
        self.pages
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| AppError::HttpError(format!("HTTP 404 for {url}")))
    }
}

// ---------------------------------------------------------------------------
// MockCleaner
// ---------------------------------------------------------------------------

/// Mock cleaner that returns its input unchanged.
#[derive(Clone)]
pub struct MockCleaner {
    error: Arc<Mutex<Option<AppError>>>,
}

impl MockCleaner {
    pub fn passthrough() -> Self {
        Self {
            error: Arc::new(Mutex::new(None)),
        }
    }

    /// Fails the first call, then passes through.
    pub fn with_error(error: AppError) -> Self {
        Self {
            error: Arc::new(Mutex::new(Some(error))),
        }
    }
}

impl Cleaner for MockCleaner {
    fn clean(&self, html: &str) -> Result<String, AppError> {
        if let Some(e) = self.error.lock().unwrap().take() {
            return Err(e);
        }
        Ok(html.to_string())
    }
}

// ---------------------------------------------------------------------------
// MockExtractor
// ---------------------------------------------------------------------------

/// Mock extractor replaying queued replies.
///
/// Once the queue is drained every call returns `Ok(None)`.
#[derive(Clone)]
pub struct MockExtractor {
    responses: Arc<Mutex<Vec<Result<Option<String>, AppError>>>>,
    contents: Arc<Mutex<Vec<String>>>,
}

impl MockExtractor {
    pub fn new(payload: String) -> Self {
        Self::with_responses(vec![Ok(Some(payload))])
    }

    pub fn with_responses(responses: Vec<Result<Option<String>, AppError>>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            contents: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Content passed to every call so far.
    pub fn contents(&self) -> Vec<String> {
        self.contents.lock().unwrap().clone()
    }
}

impl Extractor for MockExtractor {
    async fn extract(
        &self,
        content: &str,
        _schema: &serde_json::Value,
        _instruction: &str,
    ) -> Result<Option<String>, AppError> {
        self.contents.lock().unwrap().push(content.to_string());

        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Ok(None)
        } else {
            responses.remove(0)
        }
    }
}

// ---------------------------------------------------------------------------
// MockStore
// ---------------------------------------------------------------------------

/// In-memory store recording what was saved.
#[derive(Clone, Default)]
pub struct MockStore {
    /// URLs of saved raw snapshots.
    pub raw_saved: Arc<Mutex<Vec<String>>>,
    pub processed_saved: Arc<Mutex<Vec<ProcessedRecord>>>,
    raw_error: Arc<Mutex<Option<AppError>>>,
}

impl MockStore {
    /// Fails the first raw save.
    pub fn with_raw_error(error: AppError) -> Self {
        Self {
            raw_error: Arc::new(Mutex::new(Some(error))),
            ..Self::default()
        }
    }
}

impl SnapshotStore for MockStore {
    async fn save_raw(&self, snapshot: &RawSnapshot<'_>) -> Result<PathBuf, AppError> {
        if let Some(e) = self.raw_error.lock().unwrap().take() {
            return Err(e);
        }
        self.raw_saved
            .lock()
            .unwrap()
            .push(snapshot.url.to_string());
        Ok(PathBuf::from(format!("raw/raw_{}.json", snapshot.crawl_date)))
    }

    async fn save_processed(&self, record: &ProcessedRecord) -> Result<PathBuf, AppError> {
        self.processed_saved.lock().unwrap().push(record.clone());
        Ok(PathBuf::from(format!(
            "processed/processed_{}.json",
            record.crawl_date
        )))
    }
}

// ---------------------------------------------------------------------------
// SteppingClock
// ---------------------------------------------------------------------------

/// Clock that advances one second per reading, so every capture in a test
/// gets its own timestamp.
pub struct SteppingClock {
    next: Mutex<DateTime<Local>>,
}

impl SteppingClock {
    pub fn new() -> Self {
        let start = Local
            .with_ymd_and_hms(2024, 1, 1, 12, 0, 0)
            .earliest()
            .unwrap();
        Self {
            next: Mutex::new(start),
        }
    }
}

impl Clock for SteppingClock {
    fn now(&self) -> DateTime<Local> {
        let mut next = self.next.lock().unwrap();
        let now = *next;
        *next = now + Duration::seconds(1);
        now
    }
}

// ---------------------------------------------------------------------------
// RecordingReporter
// ---------------------------------------------------------------------------

/// Reporter recording one `kind: detail` line per event.
#[derive(Default)]
pub struct RecordingReporter {
    events: Mutex<Vec<String>>,
}

impl RecordingReporter {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl CrawlReporter for RecordingReporter {
    fn report(&self, event: CrawlEvent<'_>) {
        let line = match event {
            CrawlEvent::DiscoveryStarted { site } => format!("discovery_started: {site}"),
            CrawlEvent::Discovered { count } => format!("discovered: {count}"),
            CrawlEvent::ArticleStarted { url, index, total } => {
                format!("article_started: {url} ({}/{total})", index + 1)
            }
            CrawlEvent::FetchFailed { url, error } => format!("fetch_failed: {url} {error}"),
            CrawlEvent::RawSaved { url, .. } => format!("raw_saved: {url}"),
            CrawlEvent::ExtractionFailed {
                url,
                reason,
                payload,
            } => format!(
                "extraction_failed: {url} {reason} {}",
                payload.unwrap_or_default()
            ),
            CrawlEvent::ProcessedSaved { url, .. } => format!("processed_saved: {url}"),
            CrawlEvent::PersistFailed { url, error } => format!("persist_failed: {url} {error}"),
            CrawlEvent::Waiting { delay } => format!("waiting: {}ms", delay.as_millis()),
            CrawlEvent::Finished { report } => format!("finished: {}", report.total()),
        };
        self.events.lock().unwrap().push(line);
    }
}

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

/// A reply that passes article validation.
pub fn valid_payload(title: &str) -> String {
    serde_json::json!({
        "title": title,
        "url": "https://blog.example/whatever",
        "date_published": null,
        "summary": "A post about rollups and data availability.",
        "key_concepts": ["rollups", "data availability"],
        "technical_level": "advanced",
        "categories": ["scaling"],
        "ethereum_related": true,
        "code_snippets_present": false
    })
    .to_string()
}
