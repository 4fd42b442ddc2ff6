use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tempfile::NamedTempFile;

use crate::error::AppError;
use crate::models::{CaptureTimestamp, ProcessedRecord, RawSnapshot};
use crate::traits::SnapshotStore;

pub const RAW_DIR: &str = "raw";
pub const PROCESSED_DIR: &str = "processed";

/// Writes snapshots as pretty-printed JSON files:
///
/// ```text
/// <base>/raw/raw_<YYYYMMDD_HHMMSS>.json
/// <base>/processed/processed_<YYYYMMDD_HHMMSS>.json
/// ```
///
/// File names are keyed only by capture second. An existing file is never
/// replaced: a second capture within the same second fails with a
/// `StorageError` instead of overwriting the first.
#[derive(Debug, Clone)]
pub struct FileStore {
    raw_dir: PathBuf,
    processed_dir: PathBuf,
}

impl FileStore {
    /// Create the store, creating both output directories (and any missing
    /// parents) up front.
    pub fn create(base_dir: impl AsRef<Path>) -> Result<Self, AppError> {
        let base_dir = base_dir.as_ref();
        let store = Self {
            raw_dir: base_dir.join(RAW_DIR),
            processed_dir: base_dir.join(PROCESSED_DIR),
        };
        for dir in [&store.raw_dir, &store.processed_dir] {
            ensure_dir(dir)?;
        }
        tracing::debug!(base_dir = %base_dir.display(), "Output directories ready");
        Ok(store)
    }

    pub fn raw_dir(&self) -> &Path {
        &self.raw_dir
    }

    pub fn processed_dir(&self) -> &Path {
        &self.processed_dir
    }

    pub fn raw_path(&self, crawl_date: &CaptureTimestamp) -> PathBuf {
        self.raw_dir.join(format!("raw_{crawl_date}.json"))
    }

    pub fn processed_path(&self, crawl_date: &CaptureTimestamp) -> PathBuf {
        self.processed_dir
            .join(format!("processed_{crawl_date}.json"))
    }
}

impl SnapshotStore for FileStore {
    async fn save_raw(&self, snapshot: &RawSnapshot<'_>) -> Result<PathBuf, AppError> {
        write_json(&self.raw_path(snapshot.crawl_date), snapshot)
    }

    async fn save_processed(&self, record: &ProcessedRecord) -> Result<PathBuf, AppError> {
        write_json(&self.processed_path(&record.crawl_date), record)
    }
}

fn ensure_dir(dir: &Path) -> Result<(), AppError> {
    if dir.exists() && !dir.is_dir() {
        return Err(AppError::StorageError(format!(
            "{} exists and is not a directory",
            dir.display()
        )));
    }
    fs::create_dir_all(dir).map_err(|e| {
        AppError::StorageError(format!("Failed to create {}: {e}", dir.display()))
    })
}

/// Write `value` to `target` via a temp file in the same directory, so a
/// reader never sees a half-written file. Fails if `target` already exists.
fn write_json<T: Serialize + ?Sized>(target: &Path, value: &T) -> Result<PathBuf, AppError> {
    // serde_json keeps non-ASCII characters literal and indents by two spaces.
    let json = serde_json::to_string_pretty(value)?;

    let dir = target
        .parent()
        .ok_or_else(|| AppError::StorageError(format!("No parent for {}", target.display())))?;
    ensure_dir(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(json.as_bytes())?;
    tmp.flush()?;
    tmp.persist_noclobber(target).map_err(|e| match e.error.kind() {
        std::io::ErrorKind::AlreadyExists => AppError::StorageError(format!(
            "{} already exists; another article was captured in the same second",
            target.display()
        )),
        _ => AppError::StorageError(format!("Failed to write {}: {}", target.display(), e.error)),
    })?;

    Ok(target.to_path_buf())
}
