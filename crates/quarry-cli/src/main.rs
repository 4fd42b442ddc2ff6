mod progress;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use quarry_client::{HtmdCleaner, OpenAiExtractor, ReqwestFetcher};
use quarry_core::config::{
    CrawlConfig, DEFAULT_CHUNK_TOKEN_THRESHOLD, DEFAULT_PROVIDER, DEFAULT_SITE_URL,
    ExtractorConfig, JsonMode, SiteConfig,
};
use quarry_core::discovery::discover_article_urls;
use quarry_core::models::FetchOptions;
use quarry_core::pacing::PacingConfig;
use quarry_core::pipeline::CrawlPipeline;
use quarry_core::report::{CrawlReport, TracingCrawlReporter};
use quarry_core::store::FileStore;
use quarry_core::traits::Fetcher;

use crate::progress::{ConsoleReporter, Progress};

#[derive(Parser)]
#[command(name = "quarry", version, about = "Blog article harvester with LLM extraction")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl every article on the site and extract structured records
    Crawl(CrawlArgs),

    /// List the article URLs found on the site index
    Discover {
        #[command(flatten)]
        site: SiteArgs,

        #[command(flatten)]
        fetch: FetchArgs,
    },
}

#[derive(Args, Debug, Clone)]
struct SiteArgs {
    /// Site index to crawl
    #[arg(long, default_value = DEFAULT_SITE_URL)]
    site: String,

    /// Drop repeated article links, keeping first-seen order
    #[arg(long, default_value_t = false)]
    dedupe: bool,

    /// Process at most this many articles
    #[arg(long)]
    limit: Option<usize>,
}

#[derive(Args, Debug, Clone)]
struct FetchArgs {
    /// Per-page fetch timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,

    /// Render pages in headless Chromium instead of a plain HTTP GET
    #[cfg(feature = "browser")]
    #[arg(long, default_value_t = false)]
    browser: bool,
}

#[derive(Args, Debug, Clone)]
struct CrawlArgs {
    #[command(flatten)]
    site: SiteArgs,

    #[command(flatten)]
    fetch: FetchArgs,

    /// Base output directory (raw/ and processed/ are created inside)
    #[arg(short, long, default_value = "vitalik_blog_data")]
    output_dir: PathBuf,

    /// LLM provider as vendor/model (e.g., "openai/gpt-4", "gemini/gemini-2.5-flash")
    #[arg(long, env = "QUARRY_PROVIDER", default_value = DEFAULT_PROVIDER)]
    provider: String,

    /// OpenAI-compatible API base URL (defaults to the vendor's endpoint)
    #[arg(long, env = "QUARRY_API_BASE")]
    api_base: Option<String>,

    /// API key (reads from OPENAI_API_KEY env var if not provided)
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// How JSON output is requested: json_schema, json_object or none
    /// (defaults to what the provider's model supports)
    #[arg(long, env = "QUARRY_RESPONSE_FORMAT")]
    response_format: Option<JsonMode>,

    /// Largest estimated token count sent to the model in one request
    #[arg(long, default_value_t = DEFAULT_CHUNK_TOKEN_THRESHOLD)]
    chunk_token_threshold: usize,

    /// LLM request timeout in seconds
    #[arg(long, default_value_t = 120)]
    llm_timeout_secs: u64,

    /// Pause after each article, in milliseconds
    #[arg(long, default_value_t = 2000)]
    delay_ms: u64,

    /// Maximum random extra pause after each article, in milliseconds
    #[arg(long, default_value_t = 1000)]
    jitter_ms: u64,

    /// Log progress on stderr instead of printing it to stdout
    #[arg(short, long, default_value_t = false)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("quarry=info".parse()?))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Crawl(args) => {
            let report = cmd_crawl(args).await?;
            if report.total() > 0 && report.fetched() == 0 {
                tracing::warn!("No article could be fetched");
            }
        }
        Commands::Discover { site, fetch } => {
            cmd_discover(&site, &fetch).await?;
        }
    }

    Ok(())
}

impl SiteArgs {
    fn to_config(&self) -> Result<SiteConfig> {
        Ok(SiteConfig::new(&self.site)?
            .with_dedupe(self.dedupe)
            .with_limit(self.limit))
    }
}

impl FetchArgs {
    fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    #[cfg(feature = "browser")]
    fn use_browser(&self) -> bool {
        self.browser
    }

    #[cfg(not(feature = "browser"))]
    fn use_browser(&self) -> bool {
        false
    }
}

async fn cmd_crawl(args: CrawlArgs) -> Result<CrawlReport> {
    // Validated first: a missing key must fail before any network or disk I/O.
    let mut extractor_config = ExtractorConfig::new(
        &args.provider,
        args.api_key.clone(),
        args.api_base.clone(),
    )?
    .with_chunk_token_threshold(args.chunk_token_threshold)
    .with_timeout(Duration::from_secs(args.llm_timeout_secs));
    if let Some(mode) = args.response_format {
        extractor_config = extractor_config.with_json_mode(mode);
    }

    let pacing = PacingConfig::new(Duration::from_millis(args.delay_ms))
        .with_jitter(Duration::from_millis(args.jitter_ms));
    let config = CrawlConfig::new(args.site.to_config()?).with_pacing(pacing);
    let extractor =
        OpenAiExtractor::new(&extractor_config).context("Failed to create LLM client")?;

    tracing::info!(
        provider = %extractor_config.provider,
        response_format = %extractor_config.json_mode,
        site = %config.site.base_url,
        output_dir = %args.output_dir.display(),
        "Starting crawl"
    );

    let progress = if args.quiet {
        Progress::Log(TracingCrawlReporter)
    } else {
        Progress::Console(ConsoleReporter)
    };

    if args.fetch.use_browser() {
        #[cfg(feature = "browser")]
        {
            let fetcher = quarry_client::BrowserFetcher::with_timeout(args.fetch.timeout())
                .await
                .context("Failed to launch browser")?;
            return crawl_with(fetcher, extractor, config, &args, &progress).await;
        }
    }

    let fetcher =
        ReqwestFetcher::with_timeout(args.fetch.timeout()).context("Failed to create HTTP client")?;
    crawl_with(fetcher, extractor, config, &args, &progress).await
}

async fn crawl_with<F: Fetcher>(
    fetcher: F,
    extractor: OpenAiExtractor,
    config: CrawlConfig,
    args: &CrawlArgs,
    progress: &Progress,
) -> Result<CrawlReport> {
    let store = FileStore::create(&args.output_dir).with_context(|| {
        format!(
            "Failed to create output directories under {}",
            args.output_dir.display()
        )
    })?;

    let pipeline = CrawlPipeline::new(fetcher, HtmdCleaner::new(), extractor, store, config)?;
    let report = pipeline
        .run(progress)
        .await
        .context("Failed to discover articles")?;

    if args.quiet {
        println!("{}", progress::summary(&report));
    }
    Ok(report)
}

async fn cmd_discover(site: &SiteArgs, fetch: &FetchArgs) -> Result<()> {
    let site = site.to_config()?;

    if fetch.use_browser() {
        #[cfg(feature = "browser")]
        {
            let fetcher = quarry_client::BrowserFetcher::with_timeout(fetch.timeout())
                .await
                .context("Failed to launch browser")?;
            return print_article_urls(&fetcher, &site).await;
        }
    }

    let fetcher =
        ReqwestFetcher::with_timeout(fetch.timeout()).context("Failed to create HTTP client")?;
    print_article_urls(&fetcher, &site).await
}

async fn print_article_urls<F: Fetcher>(fetcher: &F, site: &SiteConfig) -> Result<()> {
    let page = fetcher
        .fetch(site.base_url.as_str(), &FetchOptions::index())
        .await
        .with_context(|| format!("Failed to fetch {}", site.base_url))?;

    let urls = discover_article_urls(&page.html, site);
    for url in &urls {
        println!("{url}");
    }
    tracing::info!(count = urls.len(), "Discovery complete");
    Ok(())
}
