use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Local, TimeDelta};
use quarry_core::config::ExtractorConfig;
use quarry_core::traits::Clock;
use serde_json::{Value, json};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const API_KEY: &str = "sk-test";

/// Extractor settings pointing at the mock server's `/v1` endpoint.
pub fn extractor_config(server: &MockServer) -> ExtractorConfig {
    ExtractorConfig::new(
        "openai/gpt-4",
        Some(API_KEY.to_string()),
        Some(format!("{}/v1", server.uri())),
    )
    .unwrap()
}

/// A chat completions response whose first choice carries `content`.
pub fn chat_reply(content: Option<&str>) -> Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }]
    })
}

/// A valid article payload.
pub fn article_payload(title: &str) -> Value {
    json!({
        "title": title,
        "url": "https://ignored.example/",
        "date_published": null,
        "summary": "Explains why rollups need data availability.",
        "key_concepts": ["rollups"],
        "technical_level": "intermediate",
        "categories": ["scaling"],
        "ethereum_related": true,
        "code_snippets_present": false
    })
}

/// An HTML page served as `text/html`.
pub fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.to_string(), "text/html; charset=utf-8")
}

pub async fn mount_page(server: &MockServer, route: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(html(body))
        .mount(server)
        .await;
}

/// Clock advancing one second per reading, so captures never share a file name.
pub struct SteppingClock {
    next: Mutex<DateTime<Local>>,
}

impl SteppingClock {
    pub fn new() -> Self {
        Self {
            next: Mutex::new(Local::now()),
        }
    }
}

impl Clock for SteppingClock {
    fn now(&self) -> DateTime<Local> {
        let mut next = self.next.lock().unwrap();
        let now = *next;
        *next = now + TimeDelta::seconds(1);
        now
    }
}

pub fn json_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    files.sort();
    files
}
