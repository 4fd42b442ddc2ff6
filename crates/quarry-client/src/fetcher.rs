use std::time::Duration;

use quarry_core::error::AppError;
use quarry_core::models::{FetchOptions, FetchedPage};
use quarry_core::traits::Fetcher;
use reqwest::Client;
use reqwest::header::{CACHE_CONTROL, PRAGMA};
use url::Url;

use crate::metadata::{body_html, frame_sources, inline_frames, parse_metadata};

const USER_AGENT: &str = concat!("Quarry/", env!("CARGO_PKG_VERSION"), " (blog archiver)");

/// HTTP fetcher using reqwest.
///
/// Serves pages as the server sends them: no JavaScript runs, so
/// `wait_for_images` has nothing to wait for. With `render_frames` each
/// `<iframe>` document is fetched and its body inlined into the page; a
/// frame that fails to load is logged and left out.
#[derive(Clone)]
pub struct ReqwestFetcher {
    client: Client,
    timeout_secs: u64,
}

impl ReqwestFetcher {
    pub fn new() -> Result<Self, AppError> {
        Self::with_timeout(Duration::from_secs(30))
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, AppError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::HttpError(e.to_string()))?;

        Ok(Self {
            client,
            timeout_secs: timeout.as_secs(),
        })
    }

    async fn get_html(&self, url: &str, cache_bypass: bool) -> Result<String, AppError> {
        let mut request = self.client.get(url);
        if cache_bypass {
            request = request
                .header(CACHE_CONTROL, "no-cache")
                .header(PRAGMA, "no-cache");
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                AppError::Timeout(self.timeout_secs)
            } else if e.is_connect() {
                AppError::NetworkError(format!("Connection failed: {e}"))
            } else {
                AppError::HttpError(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::HttpError(format!(
                "HTTP {} for {}",
                status.as_u16(),
                url
            )));
        }

        response
            .text()
            .await
            .map_err(|e| AppError::HttpError(format!("Failed to read response body: {e}")))
    }

    async fn frame_bodies(&self, page_url: &str, html: &str, cache_bypass: bool) -> Vec<String> {
        let Ok(base) = Url::parse(page_url) else {
            return Vec::new();
        };

        let mut bodies = Vec::new();
        for frame in frame_sources(html, &base) {
            match self.get_html(frame.as_str(), cache_bypass).await {
                Ok(frame_html) => bodies.push(body_html(&frame_html)),
                Err(e) => tracing::warn!(frame = %frame, error = %e, "Skipping frame"),
            }
        }
        bodies
    }
}

impl Fetcher for ReqwestFetcher {
    async fn fetch(&self, url: &str, options: &FetchOptions) -> Result<FetchedPage, AppError> {
        let html = self.get_html(url, options.cache_bypass).await?;
        let metadata = parse_metadata(&html);

        let html = if options.render_frames {
            let frames = self.frame_bodies(url, &html, options.cache_bypass).await;
            inline_frames(&html, &frames)
        } else {
            html
        };

        Ok(FetchedPage {
            url: url.to_string(),
            html,
            metadata,
        })
    }
}
