use std::path::{Path, PathBuf};
use std::time::Duration;

/// Final state of one article after the pipeline is done with it.
#[derive(Debug, Clone, PartialEq)]
pub enum ArticleOutcome {
    /// Fetch failed; nothing was written.
    FetchFailed { url: String, error: String },
    /// Raw snapshot written, extraction unusable.
    ExtractionFailed {
        url: String,
        raw_path: PathBuf,
        reason: String,
    },
    /// Raw snapshot and processed record written.
    Extracted {
        url: String,
        raw_path: PathBuf,
        processed_path: PathBuf,
    },
    /// Writing a snapshot failed.
    PersistFailed { url: String, error: String },
}

impl ArticleOutcome {
    pub fn url(&self) -> &str {
        match self {
            ArticleOutcome::FetchFailed { url, .. }
            | ArticleOutcome::ExtractionFailed { url, .. }
            | ArticleOutcome::Extracted { url, .. }
            | ArticleOutcome::PersistFailed { url, .. } => url,
        }
    }

    pub fn raw_path(&self) -> Option<&Path> {
        match self {
            ArticleOutcome::ExtractionFailed { raw_path, .. }
            | ArticleOutcome::Extracted { raw_path, .. } => Some(raw_path),
            _ => None,
        }
    }

    pub fn processed_path(&self) -> Option<&Path> {
        match self {
            ArticleOutcome::Extracted { processed_path, .. } => Some(processed_path),
            _ => None,
        }
    }
}

/// Outcomes of a run, in processing order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CrawlReport {
    pub outcomes: Vec<ArticleOutcome>,
}

impl CrawlReport {
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    /// Articles with a raw snapshot on disk.
    pub fn fetched(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.raw_path().is_some())
            .count()
    }

    pub fn extracted(&self) -> usize {
        self.count(|o| matches!(o, ArticleOutcome::Extracted { .. }))
    }

    pub fn fetch_failed(&self) -> usize {
        self.count(|o| matches!(o, ArticleOutcome::FetchFailed { .. }))
    }

    pub fn extraction_failed(&self) -> usize {
        self.count(|o| matches!(o, ArticleOutcome::ExtractionFailed { .. }))
    }

    pub fn persist_failed(&self) -> usize {
        self.count(|o| matches!(o, ArticleOutcome::PersistFailed { .. }))
    }

    fn count(&self, pred: impl Fn(&ArticleOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(o)).count()
    }
}

/// Events emitted by the pipeline for progress reporting.
#[derive(Debug, Clone)]
pub enum CrawlEvent<'a> {
    DiscoveryStarted {
        site: &'a str,
    },
    Discovered {
        count: usize,
    },
    ArticleStarted {
        url: &'a str,
        index: usize,
        total: usize,
    },
    FetchFailed {
        url: &'a str,
        error: &'a str,
    },
    RawSaved {
        url: &'a str,
        path: &'a Path,
    },
    ExtractionFailed {
        url: &'a str,
        reason: &'a str,
        payload: Option<&'a str>,
    },
    ProcessedSaved {
        url: &'a str,
        path: &'a Path,
    },
    PersistFailed {
        url: &'a str,
        error: &'a str,
    },
    Waiting {
        delay: Duration,
    },
    Finished {
        report: &'a CrawlReport,
    },
}

/// Trait for receiving pipeline events (decoupled logging).
pub trait CrawlReporter: Send + Sync {
    fn report(&self, event: CrawlEvent<'_>) {
        let _ = event;
    }
}

/// Reporter that discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentReporter;

impl CrawlReporter for SilentReporter {}

/// Reporter that uses the `tracing` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingCrawlReporter;

impl CrawlReporter for TracingCrawlReporter {
    fn report(&self, event: CrawlEvent<'_>) {
        match event {
            CrawlEvent::DiscoveryStarted { site } => {
                tracing::info!(%site, "Discovering articles");
            }
            CrawlEvent::Discovered { count } => {
                tracing::info!(%count, "Found articles to process");
            }
            CrawlEvent::ArticleStarted { url, index, total } => {
                tracing::info!(%url, article = index + 1, %total, "Processing article");
            }
            CrawlEvent::FetchFailed { url, error } => {
                tracing::warn!(%url, %error, "Fetch failed, skipping");
            }
            CrawlEvent::RawSaved { url, path } => {
                tracing::info!(%url, path = %path.display(), "Saved raw content");
            }
            CrawlEvent::ExtractionFailed {
                url,
                reason,
                payload,
            } => {
                tracing::warn!(%url, %reason, ?payload, "Extraction failed");
            }
            CrawlEvent::ProcessedSaved { url, path } => {
                tracing::info!(%url, path = %path.display(), "Saved processed content");
            }
            CrawlEvent::PersistFailed { url, error } => {
                tracing::error!(%url, %error, "Failed to persist article");
            }
            CrawlEvent::Waiting { delay } => {
                tracing::debug!(delay_ms = %delay.as_millis(), "Waiting before next request");
            }
            CrawlEvent::Finished { report } => {
                tracing::info!(
                    total = report.total(),
                    extracted = report.extracted(),
                    fetch_failed = report.fetch_failed(),
                    extraction_failed = report.extraction_failed(),
                    persist_failed = report.persist_failed(),
                    "Crawling completed"
                );
            }
        }
    }
}
