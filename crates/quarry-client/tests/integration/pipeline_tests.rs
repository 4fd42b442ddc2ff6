use quarry_client::{HtmdCleaner, OpenAiExtractor, ReqwestFetcher};
use quarry_core::config::{CrawlConfig, SiteConfig};
use quarry_core::pacing::PacingConfig;
use quarry_core::pipeline::CrawlPipeline;
use quarry_core::report::{ArticleOutcome, TracingCrawlReporter};
use quarry_core::store::FileStore;
use tempfile::TempDir;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::integration::common::{
    SteppingClock, article_payload, chat_reply, extractor_config, json_files, mount_page,
};

const INDEX: &str = r#"<html><body>
    <a href="/posts/a">Post A</a>
    <a href="/general/b">Post B</a>
    <a href="/about">About</a>
</body></html>"#;

async fn mount_blog(server: &MockServer) {
    mount_page(server, "/", INDEX).await;
    mount_page(
        server,
        "/posts/a",
        r#"<html><head><title>Real Title A</title>
           <meta name="date" content="2021-01-05"></head>
           <body><p>Proof of stake alpha content</p></body></html>"#,
    )
    .await;
    mount_page(
        server,
        "/general/b",
        r#"<html><head><title>Real Title B</title></head>
           <body><p>Quadratic funding omega content</p></body></html>"#,
    )
    .await;
}

async fn mount_llm(server: &MockServer, marker: &str, content: &str) {
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_string_contains(marker))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_reply(Some(content))))
        .mount(server)
        .await;
}

fn pipeline(
    server: &MockServer,
    output: &TempDir,
) -> CrawlPipeline<ReqwestFetcher, HtmdCleaner, OpenAiExtractor, FileStore, SteppingClock> {
    let site = SiteConfig::new(&format!("{}/", server.uri())).unwrap();
    let config = CrawlConfig::new(site).with_pacing(PacingConfig::none());

    CrawlPipeline::new(
        ReqwestFetcher::new().unwrap(),
        HtmdCleaner::new(),
        OpenAiExtractor::new(&extractor_config(server)).unwrap(),
        FileStore::create(output.path()).unwrap(),
        config,
    )
    .unwrap()
    .with_clock(SteppingClock::new())
}

fn read_json(path: &std::path::Path) -> serde_json::Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

#[tokio::test]
async fn crawl_writes_raw_and_processed_files() {
    let server = MockServer::start().await;
    mount_blog(&server).await;
    mount_llm(&server, "alpha", &article_payload("Inferred A").to_string()).await;
    mount_llm(&server, "omega", &article_payload("Inferred B").to_string()).await;
    let output = TempDir::new().unwrap();

    let report = pipeline(&server, &output)
        .run(&TracingCrawlReporter)
        .await
        .unwrap();

    assert_eq!(report.total(), 2);
    assert_eq!(report.extracted(), 2);

    let raw = json_files(&output.path().join("raw"));
    let processed = json_files(&output.path().join("processed"));
    assert_eq!(raw.len(), 2);
    assert_eq!(processed.len(), 2);

    let first_raw = read_json(&raw[0]);
    assert_eq!(first_raw["url"], format!("{}/posts/a", server.uri()));
    assert!(
        first_raw["markdown"]
            .as_str()
            .unwrap()
            .contains("Proof of stake")
    );
    assert_eq!(first_raw["metadata"]["title"], "Real Title A");

    let a = read_json(&processed[0]);
    assert_eq!(a["url"], format!("{}/posts/a", server.uri()));
    assert_eq!(a["title"], "Real Title A");
    assert_eq!(a["date_published"], "2021-01-05");
    assert_eq!(a["crawl_date"], first_raw["crawl_date"]);

    let b = read_json(&processed[1]);
    assert_eq!(b["title"], "Real Title B");
    // No date in the page metadata: the model's value stands.
    assert_eq!(b["date_published"], serde_json::Value::Null);
}

#[tokio::test]
async fn bad_extraction_keeps_raw_snapshot_only() {
    let server = MockServer::start().await;
    mount_blog(&server).await;
    mount_llm(&server, "alpha", &article_payload("Inferred A").to_string()).await;
    mount_llm(&server, "omega", "this is not json").await;
    let output = TempDir::new().unwrap();

    let report = pipeline(&server, &output)
        .run(&TracingCrawlReporter)
        .await
        .unwrap();

    assert_eq!(report.extracted(), 1);
    assert_eq!(report.extraction_failed(), 1);
    assert!(matches!(
        &report.outcomes[1],
        ArticleOutcome::ExtractionFailed { url, .. } if url.ends_with("/general/b")
    ));
    assert_eq!(json_files(&output.path().join("raw")).len(), 2);
    assert_eq!(json_files(&output.path().join("processed")).len(), 1);
}

#[tokio::test]
async fn failed_article_fetch_is_skipped() {
    let server = MockServer::start().await;
    mount_page(&server, "/", INDEX).await;
    mount_page(
        &server,
        "/posts/a",
        "<html><body><p>alpha content</p></body></html>",
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/general/b"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    mount_llm(&server, "alpha", &article_payload("A").to_string()).await;
    let output = TempDir::new().unwrap();

    let report = pipeline(&server, &output)
        .run(&TracingCrawlReporter)
        .await
        .unwrap();

    assert_eq!(report.extracted(), 1);
    assert_eq!(report.fetch_failed(), 1);
    assert_eq!(json_files(&output.path().join("raw")).len(), 1);
    assert_eq!(json_files(&output.path().join("processed")).len(), 1);
}

#[tokio::test]
async fn unreachable_index_aborts_before_any_write() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    let output = TempDir::new().unwrap();

    let result = pipeline(&server, &output).run(&TracingCrawlReporter).await;

    assert!(result.is_err());
    assert!(json_files(&output.path().join("raw")).is_empty());
    assert!(json_files(&output.path().join("processed")).is_empty());
}
