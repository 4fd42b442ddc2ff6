pub mod chunk;
pub mod config;
pub mod discovery;
pub mod error;
pub mod models;
pub mod pacing;
pub mod pipeline;
pub mod report;
pub mod schema;
pub mod store;
pub mod traits;

#[cfg(test)]
mod testutil;

pub use config::{CrawlConfig, ExtractorConfig, JsonMode, Provider, SiteConfig};
pub use error::AppError;
pub use models::{
    ArticleRecord, CaptureTimestamp, FetchOptions, FetchedArticle, FetchedPage, PageMetadata,
    ProcessedRecord, RawSnapshot, TechnicalLevel,
};
pub use pacing::PacingConfig;
pub use pipeline::CrawlPipeline;
pub use report::{ArticleOutcome, CrawlEvent, CrawlReport, CrawlReporter, TracingCrawlReporter};
pub use schema::ArticleSchema;
pub use store::FileStore;
pub use traits::{Cleaner, Clock, Extractor, Fetcher, SnapshotStore, SystemClock};
