use std::path::PathBuf;

use crate::config::CrawlConfig;
use crate::discovery::discover_article_urls;
use crate::error::AppError;
use crate::models::{CaptureTimestamp, FetchOptions, FetchedArticle, ProcessedRecord};
use crate::report::{ArticleOutcome, CrawlEvent, CrawlReport, CrawlReporter};
use crate::schema::ArticleSchema;
use crate::traits::{Cleaner, Clock, Extractor, Fetcher, SnapshotStore, SystemClock};

/// Where an article stands between fetch and persistence.
///
/// ```text
/// pending → Fetched → {Extracted | ExtractionFailed} → persisted
/// pending → FetchFailed → skipped
/// ```
#[derive(Debug)]
pub enum ArticleStage {
    Fetched(FetchedArticle),
    FetchFailed(AppError),
    Extracted {
        raw_path: PathBuf,
        record: ProcessedRecord,
    },
    ExtractionFailed {
        raw_path: PathBuf,
        reason: String,
        payload: Option<String>,
    },
}

/// Orchestrates a crawl: discover → (fetch → clean → extract → persist) per
/// article, pausing between articles.
///
/// Generic over all external dependencies via traits, so the driver can be
/// exercised without real HTTP, LLM calls, or wall-clock time.
pub struct CrawlPipeline<F, C, E, S, K = SystemClock>
where
    F: Fetcher,
    C: Cleaner,
    E: Extractor,
    S: SnapshotStore,
    K: Clock,
{
    fetcher: F,
    cleaner: C,
    extractor: E,
    store: S,
    clock: K,
    schema: ArticleSchema,
    config: CrawlConfig,
}

impl<F, C, E, S> CrawlPipeline<F, C, E, S, SystemClock>
where
    F: Fetcher,
    C: Cleaner,
    E: Extractor,
    S: SnapshotStore,
{
    pub fn new(
        fetcher: F,
        cleaner: C,
        extractor: E,
        store: S,
        config: CrawlConfig,
    ) -> Result<Self, AppError> {
        Ok(Self {
            fetcher,
            cleaner,
            extractor,
            store,
            clock: SystemClock,
            schema: ArticleSchema::new()?,
            config,
        })
    }
}

impl<F, C, E, S, K> CrawlPipeline<F, C, E, S, K>
where
    F: Fetcher,
    C: Cleaner,
    E: Extractor,
    S: SnapshotStore,
    K: Clock,
{
    /// Replace the clock used for capture timestamps.
    pub fn with_clock<K2: Clock>(self, clock: K2) -> CrawlPipeline<F, C, E, S, K2> {
        CrawlPipeline {
            fetcher: self.fetcher,
            cleaner: self.cleaner,
            extractor: self.extractor,
            store: self.store,
            clock,
            schema: self.schema,
            config: self.config,
        }
    }

    pub fn config(&self) -> &CrawlConfig {
        &self.config
    }

    /// Fetch the site index (bypassing caches) and list its article URLs.
    ///
    /// Unlike per-article work, a failure here is returned to the caller.
    pub async fn discover(&self) -> Result<Vec<String>, AppError> {
        let site = &self.config.site;
        let page = self
            .fetcher
            .fetch(site.base_url.as_str(), &FetchOptions::index())
            .await?;
        Ok(discover_article_urls(&page.html, site))
    }

    /// Discover articles and process every one of them.
    pub async fn run<R: CrawlReporter>(&self, reporter: &R) -> Result<CrawlReport, AppError> {
        reporter.report(CrawlEvent::DiscoveryStarted {
            site: self.config.site.base_url.as_str(),
        });
        let urls = self.discover().await?;
        reporter.report(CrawlEvent::Discovered { count: urls.len() });

        Ok(self.process_urls(&urls, reporter).await)
    }

    /// Process `urls` strictly one after another.
    ///
    /// Every article is followed by the configured pause, whatever its
    /// outcome. No article can abort the loop.
    pub async fn process_urls<R: CrawlReporter>(
        &self,
        urls: &[String],
        reporter: &R,
    ) -> CrawlReport {
        let mut report = CrawlReport::default();

        for (index, url) in urls.iter().enumerate() {
            reporter.report(CrawlEvent::ArticleStarted {
                url,
                index,
                total: urls.len(),
            });

            let outcome = self.process_article(url, reporter).await;
            report.outcomes.push(outcome);

            let delay = self.config.pacing.effective_delay();
            if !delay.is_zero() {
                reporter.report(CrawlEvent::Waiting { delay });
                tokio::time::sleep(delay).await;
            }
        }

        reporter.report(CrawlEvent::Finished { report: &report });
        report
    }

    /// Drive one article through its stages until it settles.
    pub async fn process_article<R: CrawlReporter>(
        &self,
        url: &str,
        reporter: &R,
    ) -> ArticleOutcome {
        let mut stage = self.fetch_stage(url).await;

        loop {
            stage = match stage {
                ArticleStage::FetchFailed(error) => {
                    tracing::debug!(%url, retryable = error.is_retryable(), "Fetch failed");
                    let error = error.to_string();
                    reporter.report(CrawlEvent::FetchFailed { url, error: &error });
                    return ArticleOutcome::FetchFailed {
                        url: url.to_string(),
                        error,
                    };
                }
                ArticleStage::Fetched(article) => {
                    let raw_path = match self.store.save_raw(&article.snapshot()).await {
                        Ok(path) => path,
                        Err(e) => return self.persist_failed(url, e, reporter),
                    };
                    reporter.report(CrawlEvent::RawSaved {
                        url,
                        path: &raw_path,
                    });
                    self.extract_stage(article, raw_path).await
                }
                ArticleStage::ExtractionFailed {
                    raw_path,
                    reason,
                    payload,
                } => {
                    reporter.report(CrawlEvent::ExtractionFailed {
                        url,
                        reason: &reason,
                        payload: payload.as_deref(),
                    });
                    return ArticleOutcome::ExtractionFailed {
                        url: url.to_string(),
                        raw_path,
                        reason,
                    };
                }
                ArticleStage::Extracted { raw_path, record } => {
                    return match self.store.save_processed(&record).await {
                        Ok(processed_path) => {
                            reporter.report(CrawlEvent::ProcessedSaved {
                                url,
                                path: &processed_path,
                            });
                            ArticleOutcome::Extracted {
                                url: url.to_string(),
                                raw_path,
                                processed_path,
                            }
                        }
                        Err(e) => self.persist_failed(url, e, reporter),
                    };
                }
            };
        }
    }

    /// `pending → Fetched | FetchFailed`
    async fn fetch_stage(&self, url: &str) -> ArticleStage {
        let page = match self.fetcher.fetch(url, &FetchOptions::article()).await {
            Ok(page) => page,
            Err(e) => return ArticleStage::FetchFailed(e),
        };
        tracing::debug!(%url, bytes = page.html.len(), "Fetched article");

        let markdown = match self.cleaner.clean(&page.html) {
            Ok(markdown) => markdown,
            Err(e) => return ArticleStage::FetchFailed(e),
        };

        let crawl_date = CaptureTimestamp::from_datetime(&self.clock.now());
        ArticleStage::Fetched(FetchedArticle::new(page, markdown, crawl_date))
    }

    /// `Fetched → Extracted | ExtractionFailed`
    async fn extract_stage(&self, article: FetchedArticle, raw_path: PathBuf) -> ArticleStage {
        let extracted = self
            .extractor
            .extract(
                &article.markdown,
                self.schema.llm_schema(),
                &self.config.instruction,
            )
            .await;

        let payload = match extracted {
            Ok(Some(payload)) if !payload.trim().is_empty() => payload,
            Ok(_) => {
                return ArticleStage::ExtractionFailed {
                    raw_path,
                    reason: "extractor returned no content".into(),
                    payload: None,
                };
            }
            Err(e) => {
                tracing::debug!(url = %article.url, retryable = e.is_retryable(), "Extractor failed");
                return ArticleStage::ExtractionFailed {
                    raw_path,
                    reason: e.to_string(),
                    payload: None,
                };
            }
        };

        match self.schema.parse_payload(&payload) {
            Ok(extracted) => ArticleStage::Extracted {
                raw_path,
                record: ProcessedRecord::from_extraction(extracted, &article),
            },
            Err(e) => ArticleStage::ExtractionFailed {
                raw_path,
                reason: e.to_string(),
                payload: Some(payload),
            },
        }
    }

    fn persist_failed<R: CrawlReporter>(
        &self,
        url: &str,
        error: AppError,
        reporter: &R,
    ) -> ArticleOutcome {
        let error = error.to_string();
        reporter.report(CrawlEvent::PersistFailed { url, error: &error });
        ArticleOutcome::PersistFailed {
            url: url.to_string(),
            error,
        }
    }
}
