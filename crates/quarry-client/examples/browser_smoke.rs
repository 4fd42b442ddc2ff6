/// Smoke test for `BrowserFetcher`.
///
/// Launches headless Chromium, renders a page the way an article is fetched
/// (frames inlined, images awaited) and prints what was captured.
///
/// Run with:
///   cargo run -p quarry-client --example browser_smoke --features browser -- [URL]
use quarry_client::{BrowserFetcher, HtmdCleaner};
use quarry_core::models::FetchOptions;
use quarry_core::traits::{Cleaner, Fetcher};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "https://vitalik.eth.limo/".to_string());

    println!("Launching headless browser...");
    let fetcher = BrowserFetcher::new().await?;

    println!("Fetching {url} ...");
    let page = fetcher.fetch(&url, &FetchOptions::article()).await?;
    let markdown = HtmdCleaner::new().clean(&page.html)?;

    anyhow::ensure!(
        page.html.len() > 500,
        "HTML suspiciously short ({} bytes)",
        page.html.len()
    );

    println!("Got {} bytes of rendered HTML", page.html.len());
    for (key, value) in &page.metadata {
        println!("  {key}: {value}");
    }
    println!("Markdown preview:\n{}", markdown.chars().take(300).collect::<String>());
    Ok(())
}
