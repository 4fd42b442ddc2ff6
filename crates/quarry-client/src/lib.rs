pub mod cleaner;
pub mod fetcher;
pub mod llm;
pub mod metadata;

#[cfg(feature = "browser")]
pub mod browser_fetcher;

pub use cleaner::HtmdCleaner;
pub use fetcher::ReqwestFetcher;
pub use llm::OpenAiExtractor;

#[cfg(feature = "browser")]
pub use browser_fetcher::BrowserFetcher;
