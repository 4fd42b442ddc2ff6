use std::future::Future;
use std::path::PathBuf;

use chrono::{DateTime, Local};

use crate::error::AppError;
use crate::models::{FetchOptions, FetchedPage, ProcessedRecord, RawSnapshot};

/// Retrieves a rendered page and the metadata the site reports for it.
pub trait Fetcher: Send + Sync + Clone {
    fn fetch(
        &self,
        url: &str,
        options: &FetchOptions,
    ) -> impl Future<Output = Result<FetchedPage, AppError>> + Send;
}

/// Converts raw HTML into clean Markdown text.
pub trait Cleaner: Send + Sync + Clone {
    fn clean(&self, html: &str) -> Result<String, AppError>;
}

/// Extracts structured JSON from text content using an LLM.
///
/// Provider identity and chunking are properties of the implementation.
pub trait Extractor: Send + Sync + Clone {
    /// Returns the serialized payload, or `None` when extraction was skipped
    /// (nothing to extract, or the model replied with nothing).
    fn extract(
        &self,
        content: &str,
        schema: &serde_json::Value,
        instruction: &str,
    ) -> impl Future<Output = Result<Option<String>, AppError>> + Send;
}

/// Persists raw snapshots and processed records.
pub trait SnapshotStore: Send + Sync + Clone {
    /// Save a raw snapshot. Returns where it was written.
    fn save_raw(
        &self,
        snapshot: &RawSnapshot<'_>,
    ) -> impl Future<Output = Result<PathBuf, AppError>> + Send;

    /// Save a processed record. Returns where it was written.
    fn save_processed(
        &self,
        record: &ProcessedRecord,
    ) -> impl Future<Output = Result<PathBuf, AppError>> + Send;
}

/// Source of capture timestamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Local>;
}

/// Wall-clock time in the local timezone.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}
