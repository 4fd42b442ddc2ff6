use thiserror::Error;

/// Application-wide error types for Quarry.
#[derive(Error, Debug)]
pub enum AppError {
    /// HTTP request failed (fetching a page).
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// LLM API call failed.
    #[error("LLM error (HTTP {status_code}): {message}")]
    LlmError {
        message: String,
        status_code: u16,
        retryable: bool,
    },

    /// HTML-to-Markdown conversion failed.
    #[error("Cleaner error: {0}")]
    CleanerError(String),

    /// Extracted JSON does not match the article schema.
    #[error("Schema validation error: {0}")]
    SchemaValidationError(String),

    /// JSON serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Request timed out.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// Rate limit exceeded.
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// Network/connection error.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Writing a snapshot to disk failed.
    #[error("Storage error: {0}")]
    StorageError(String),

    /// Missing or invalid configuration.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Generic error.
    #[error("{0}")]
    Generic(String),
}

impl AppError {
    /// Returns true if this error is transient and worth retrying.
    ///
    /// The pipeline never retries on its own; failures are logged with this
    /// flag so a flaky run can be told apart from a broken one.
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::NetworkError(_) | AppError::Timeout(_) | AppError::RateLimitExceeded => true,
            AppError::LlmError { retryable, .. } => *retryable,
            AppError::HttpError(msg) => {
                msg.contains("timeout") || msg.contains("connect") || msg.contains("reset")
            }
            _ => false,
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        AppError::StorageError(e.to_string())
    }
}
