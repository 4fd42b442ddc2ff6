use std::time::Duration;

use quarry_core::chunk::{merge_payloads, split_into_chunks};
use quarry_core::config::{ExtractorConfig, JsonMode};
use quarry_core::error::AppError;
use quarry_core::traits::Extractor;
use reqwest::Client;
use serde::{Deserialize, Serialize};

const DEFAULT_SYSTEM_PROMPT: &str = "You are a data extraction assistant. Extract the requested fields from the provided blog post. Respond ONLY with valid JSON matching the requested schema. Do not include explanations.";

/// OpenAI-compatible LLM client for structured article extraction.
///
/// Works with any OpenAI-compatible chat completions API, including:
/// - OpenAI directly (`https://api.openai.com/v1`)
/// - Gemini via compatibility layer (`https://generativelanguage.googleapis.com/v1beta/openai`)
///
/// Content longer than the configured token threshold is sent in chunks and
/// the per-chunk replies merged.
#[derive(Clone)]
pub struct OpenAiExtractor {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    chunk_token_threshold: usize,
    timeout_secs: u64,
    json_mode: JsonMode,
    system_prompt: String,
}

impl OpenAiExtractor {
    pub fn new(config: &ExtractorConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AppError::HttpError(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.provider.model.clone(),
            chunk_token_threshold: config.chunk_token_threshold,
            timeout_secs: config.timeout.as_secs(),
            json_mode: config.json_mode,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        })
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn json_mode(&self) -> JsonMode {
        self.json_mode
    }

    fn response_format(&self, schema: &serde_json::Value) -> Option<ResponseFormat> {
        match self.json_mode {
            JsonMode::Schema => Some(ResponseFormat {
                format_type: "json_schema".to_string(),
                json_schema: Some(JsonSchemaWrapper {
                    name: "article".to_string(),
                    strict: true,
                    schema: schema.clone(),
                }),
            }),
            JsonMode::Object => Some(ResponseFormat {
                format_type: "json_object".to_string(),
                json_schema: None,
            }),
            JsonMode::Off => None,
        }
    }

    /// One chat completion for one chunk. `None` when the model replied with
    /// no content.
    async fn complete(
        &self,
        chunk: &str,
        schema: &serde_json::Value,
        instruction: &str,
    ) -> Result<Option<String>, AppError> {
        let url = format!("{}/chat/completions", self.base_url);

        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                Message {
                    role: "system".to_string(),
                    content: self.system_prompt.clone(),
                },
                Message {
                    role: "user".to_string(),
                    content: format!(
                        "{}\n\nExtract data according to this JSON schema:\n```json\n{}\n```\n\nFrom the following blog post:\n\n{}",
                        instruction,
                        serde_json::to_string_pretty(schema)?,
                        chunk
                    ),
                },
            ],
            response_format: self.response_format(schema),
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
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
            let status_code = status.as_u16();
            if status_code == 429 {
                return Err(AppError::RateLimitExceeded);
            }

            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiError>(&body)
                .map(|e| e.error.message)
                .unwrap_or_else(|_| format!("HTTP {status_code}: {body}"));

            return Err(AppError::LlmError {
                message,
                status_code,
                retryable: status_code >= 500,
            });
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| AppError::HttpError(format!("Failed to parse LLM response: {e}")))?;

        Ok(chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty()))
    }
}

/// Combine per-chunk replies into one payload.
///
/// A single reply passes through untouched. Otherwise every reply that parses
/// as JSON is merged; when none does, the first reply is returned as-is so
/// the caller sees (and reports) the unparseable text.
fn combine_replies(replies: Vec<String>) -> Option<String> {
    if replies.len() <= 1 {
        return replies.into_iter().next();
    }

    let parsed: Vec<serde_json::Value> = replies
        .iter()
        .enumerate()
        .filter_map(|(i, reply)| match serde_json::from_str(reply.trim()) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(chunk = i, error = %e, "Skipping chunk with invalid JSON");
                None
            }
        })
        .collect();

    match merge_payloads(parsed) {
        Some(merged) => Some(merged.to_string()),
        None => replies.into_iter().next(),
    }
}

// ---- OpenAI API types ----

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    json_schema: Option<JsonSchemaWrapper>,
}

#[derive(Serialize)]
struct JsonSchemaWrapper {
    name: String,
    strict: bool,
    schema: serde_json::Value,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}

impl Extractor for OpenAiExtractor {
    async fn extract(
        &self,
        content: &str,
        schema: &serde_json::Value,
        instruction: &str,
    ) -> Result<Option<String>, AppError> {
        let chunks = split_into_chunks(content, self.chunk_token_threshold);
        if chunks.is_empty() {
            return Ok(None);
        }
        tracing::debug!(model = %self.model, chunks = chunks.len(), "Extracting");

        let mut replies = Vec::with_capacity(chunks.len());
        for chunk in &chunks {
            if let Some(reply) = self.complete(chunk, schema, instruction).await? {
                replies.push(reply);
            }
        }

        Ok(combine_replies(replies))
    }
}
