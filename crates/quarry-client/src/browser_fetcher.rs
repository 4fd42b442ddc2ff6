use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chromiumoxide::cdp::browser_protocol::network::SetCacheDisabledParams;
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use quarry_core::error::AppError;
use quarry_core::models::{FetchOptions, FetchedPage};
use quarry_core::traits::Fetcher;

use crate::metadata::{inline_frames, parse_metadata};

/// Resolves once every `<img>` has loaded or failed.
const WAIT_FOR_IMAGES_JS: &str = r#"Promise.all(
  Array.from(document.images)
    .filter((img) => !img.complete)
    .map((img) => new Promise((resolve) => { img.onload = img.onerror = resolve; }))
).then(() => true)"#;

/// Body HTML of every iframe whose document the page may read.
const FRAME_BODIES_JS: &str = r#"Array.from(document.querySelectorAll("iframe"))
  .map((frame) => { try { return frame.contentDocument && frame.contentDocument.body
      ? frame.contentDocument.body.innerHTML : null; } catch (e) { return null; } })
  .filter((body) => body !== null)"#;

/// Headless-browser fetcher using Chromium via the Chrome DevTools Protocol.
///
/// Renders JavaScript before capturing, waits for images when asked, and
/// inlines same-origin iframe documents. A single Chromium process is shared
/// across clones; every fetch uses its own tab.
///
/// # Example
///
/// ```rust,no_run
/// use quarry_client::BrowserFetcher;
/// use quarry_core::models::FetchOptions;
/// use quarry_core::traits::Fetcher;
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let fetcher = BrowserFetcher::new().await?;
/// let page = fetcher.fetch("https://vitalik.eth.limo/", &FetchOptions::index()).await?;
/// println!("{:?}", page.metadata.get("title"));
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct BrowserFetcher {
    browser: Arc<Browser>,
    timeout: Duration,
}

impl BrowserFetcher {
    /// Launches headless Chromium with a **30 s** page timeout.
    pub async fn new() -> Result<Self, AppError> {
        Self::with_timeout(Duration::from_secs(30)).await
    }

    /// Launches headless Chromium with a custom page timeout.
    pub async fn with_timeout(timeout: Duration) -> Result<Self, AppError> {
        let mut builder = BrowserConfig::builder().no_sandbox().disable_default_args();

        if let Some(bin) = Self::find_chrome_binary() {
            tracing::info!(binary = %bin.display(), "Using Chrome binary");
            builder = builder.chrome_executable(bin);
        }

        let config = builder
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--no-first-run")
            .build()
            .map_err(|e| AppError::Generic(format!("Browser config error: {e}")))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| AppError::Generic(format!("Failed to launch browser: {e}")))?;

        // The CDP handler must be polled for the connection to make progress.
        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::warn!(error = %e, "Browser CDP handler error");
                    break;
                }
            }
        });

        Ok(Self {
            browser: Arc::new(browser),
            timeout,
        })
    }

    /// `$CHROME_BIN`, else the first well-known install found. `None` lets
    /// chromiumoxide search on its own.
    ///
    /// The snap wrapper at `/snap/bin/chromium` drops unknown flags and
    /// breaks headless mode, so the binary inside the snap is tried first.
    fn find_chrome_binary() -> Option<PathBuf> {
        const CANDIDATES: [&str; 6] = [
            "/snap/chromium/current/usr/lib/chromium-browser/chrome",
            "/var/lib/flatpak/exports/bin/org.chromium.Chromium",
            "/usr/bin/google-chrome-stable",
            "/usr/bin/google-chrome",
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
        ];

        std::env::var_os("CHROME_BIN")
            .map(PathBuf::from)
            .filter(|p| p.exists())
            .or_else(|| CANDIDATES.iter().map(PathBuf::from).find(|p| p.exists()))
    }

    async fn render(&self, url: &str, options: &FetchOptions) -> Result<String, AppError> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| AppError::HttpError(format!("Failed to open tab: {e}")))?;

        let result = self.render_in(&page, url, options).await;
        let _ = page.close().await;
        result
    }

    async fn render_in(
        &self,
        page: &Page,
        url: &str,
        options: &FetchOptions,
    ) -> Result<String, AppError> {
        if options.cache_bypass {
            page.execute(SetCacheDisabledParams::new(true))
                .await
                .map_err(|e| AppError::HttpError(format!("Failed to disable cache: {e}")))?;
        }

        page.goto(url)
            .await
            .map_err(|e| AppError::HttpError(format!("Failed to navigate to {url}: {e}")))?;
        page.find_element("body")
            .await
            .map_err(|e| AppError::HttpError(format!("Page did not render body: {e}")))?;

        if options.wait_for_images {
            evaluate(page, WAIT_FOR_IMAGES_JS).await?;
        }

        let html = page
            .content()
            .await
            .map_err(|e| AppError::HttpError(format!("Failed to read page content: {e}")))?;

        if !options.render_frames {
            return Ok(html);
        }
        let frames: Vec<String> = evaluate(page, FRAME_BODIES_JS)
            .await?
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default();
        Ok(inline_frames(&html, &frames))
    }
}

async fn evaluate(page: &Page, script: &str) -> Result<Option<serde_json::Value>, AppError> {
    let params = EvaluateParams::builder()
        .expression(script)
        .await_promise(true)
        .return_by_value(true)
        .build()
        .map_err(|e| AppError::Generic(format!("Invalid script: {e}")))?;

    let result = page
        .evaluate_expression(params)
        .await
        .map_err(|e| AppError::HttpError(format!("Script failed: {e}")))?;
    Ok(result.value().cloned())
}

impl Fetcher for BrowserFetcher {
    async fn fetch(&self, url: &str, options: &FetchOptions) -> Result<FetchedPage, AppError> {
        let html = tokio::time::timeout(self.timeout, self.render(url, options))
            .await
            .map_err(|_| AppError::Timeout(self.timeout.as_secs()))??;

        Ok(FetchedPage {
            url: url.to_string(),
            metadata: parse_metadata(&html),
            html,
        })
    }
}
