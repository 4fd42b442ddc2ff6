use quarry_client::ReqwestFetcher;
use quarry_core::error::AppError;
use quarry_core::models::FetchOptions;
use quarry_core::traits::Fetcher;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::integration::common::{html, mount_page};

#[tokio::test]
async fn fetch_returns_html_and_metadata() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/posts/a",
        r#"<html><head><title>Post A</title>
           <meta name="description" content="About A">
           <meta property="article:published_time" content="2022-03-01">
           </head><body><p>Hello</p></body></html>"#,
    )
    .await;

    let fetcher = ReqwestFetcher::new().unwrap();
    let url = format!("{}/posts/a", server.uri());
    let page = fetcher.fetch(&url, &FetchOptions::default()).await.unwrap();

    assert_eq!(page.url, url);
    assert!(page.html.contains("<p>Hello</p>"));
    assert_eq!(page.metadata["title"], "Post A");
    assert_eq!(page.metadata["description"], "About A");
    assert_eq!(page.metadata["date"], "2022-03-01");
}

#[tokio::test]
async fn index_fetch_bypasses_caches() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .and(header("cache-control", "no-cache"))
        .and(header("pragma", "no-cache"))
        .respond_with(html("<a href=\"/posts/a\">A</a>"))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = ReqwestFetcher::new().unwrap();
    let page = fetcher
        .fetch(&format!("{}/", server.uri()), &FetchOptions::index())
        .await
        .unwrap();

    assert!(page.html.contains("/posts/a"));
}

#[tokio::test]
async fn article_fetch_uses_default_caching() {
    let server = MockServer::start().await;
    mount_page(&server, "/posts/a", "<p>A</p>").await;

    let fetcher = ReqwestFetcher::new().unwrap();
    fetcher
        .fetch(&format!("{}/posts/a", server.uri()), &FetchOptions::article())
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].headers.get("cache-control").is_none());
    assert!(requests[0].headers.get("pragma").is_none());
}

#[tokio::test]
async fn render_frames_inlines_frame_bodies() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/posts/a",
        r#"<html><body><p>main</p>
           <iframe src="/embed/chart"></iframe>
           <iframe src="/embed/missing"></iframe>
           </body></html>"#,
    )
    .await;
    mount_page(
        &server,
        "/embed/chart",
        "<html><body><table><tr><td>42</td></tr></table></body></html>",
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/embed/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let fetcher = ReqwestFetcher::new().unwrap();
    let url = format!("{}/posts/a", server.uri());

    let page = fetcher.fetch(&url, &FetchOptions::article()).await.unwrap();
    assert!(page.html.contains("<td>42</td>"));
    let frame_at = page.html.find("<td>42</td>").unwrap();
    let body_end = page.html.rfind("</body>").unwrap();
    assert!(frame_at < body_end);

    let plain = fetcher.fetch(&url, &FetchOptions::default()).await.unwrap();
    assert!(!plain.html.contains("<td>42</td>"));
}

#[tokio::test]
async fn non_success_status_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/posts/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let fetcher = ReqwestFetcher::new().unwrap();
    let err = fetcher
        .fetch(
            &format!("{}/posts/gone", server.uri()),
            &FetchOptions::article(),
        )
        .await
        .unwrap_err();

    match err {
        AppError::HttpError(msg) => assert!(msg.contains("HTTP 404"), "got: {msg}"),
        other => panic!("expected HttpError, got {other:?}"),
    }
}
