use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use url::Url;

use crate::error::AppError;
use crate::pacing::PacingConfig;
use crate::schema::ARTICLE_INSTRUCTION;

pub const DEFAULT_SITE_URL: &str = "https://vitalik.eth.limo/";
pub const DEFAULT_ARTICLE_MARKERS: [&str; 2] = ["/posts/", "/general/"];
pub const DEFAULT_PROVIDER: &str = "openai/gpt-4";
pub const DEFAULT_CHUNK_TOKEN_THRESHOLD: usize = 3000;
pub const DEFAULT_LLM_TIMEOUT: Duration = Duration::from_secs(120);

/// The blog being crawled and how its article links are recognised.
#[derive(Debug, Clone)]
pub struct SiteConfig {
    /// Index page; also the origin relative links resolve against.
    pub base_url: Url,
    /// A link is an article when its path contains any of these.
    pub article_markers: Vec<String>,
    /// Drop repeated article URLs, keeping first-seen order.
    pub dedupe: bool,
    /// Process at most this many articles.
    pub limit: Option<usize>,
}

impl SiteConfig {
    pub fn new(base_url: &str) -> Result<Self, AppError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| AppError::ConfigError(format!("Invalid site URL '{base_url}': {e}")))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(AppError::ConfigError(format!(
                "Site URL must be http or https, got '{}'",
                base_url.scheme()
            )));
        }

        Ok(Self {
            base_url,
            article_markers: DEFAULT_ARTICLE_MARKERS.iter().map(|m| m.to_string()).collect(),
            dedupe: false,
            limit: None,
        })
    }

    pub fn with_article_markers(mut self, markers: Vec<String>) -> Self {
        self.article_markers = markers;
        self
    }

    pub fn with_dedupe(mut self, dedupe: bool) -> Self {
        self.dedupe = dedupe;
        self
    }

    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }
}

/// Everything the pipeline driver needs besides its collaborators.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    pub site: SiteConfig,
    pub pacing: PacingConfig,
    pub instruction: String,
}

impl CrawlConfig {
    pub fn new(site: SiteConfig) -> Self {
        Self {
            site,
            pacing: PacingConfig::default(),
            instruction: ARTICLE_INSTRUCTION.to_string(),
        }
    }

    pub fn with_pacing(mut self, pacing: PacingConfig) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn with_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instruction = instruction.into();
        self
    }
}

/// Provider identity in `vendor/model` form, e.g. `openai/gpt-4`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provider {
    pub vendor: String,
    pub model: String,
}

impl Provider {
    pub fn parse(s: &str) -> Result<Self, AppError> {
        let (vendor, model) = s.split_once('/').ok_or_else(|| {
            AppError::ConfigError(format!("Provider must be vendor/model, got '{s}'"))
        })?;
        if vendor.is_empty() || model.is_empty() {
            return Err(AppError::ConfigError(format!(
                "Provider must be vendor/model, got '{s}'"
            )));
        }

        Ok(Self {
            vendor: vendor.to_lowercase(),
            model: model.to_string(),
        })
    }

    /// OpenAI-compatible endpoint for vendors we know about.
    pub fn default_base_url(&self) -> Option<&'static str> {
        match self.vendor.as_str() {
            "openai" => Some("https://api.openai.com/v1"),
            "gemini" => Some("https://generativelanguage.googleapis.com/v1beta/openai"),
            _ => None,
        }
    }

    /// Best JSON mode the model is known to accept.
    ///
    /// Base `gpt-4` takes no `response_format` at all; `gpt-4-turbo` and
    /// `gpt-3.5-turbo` only take `json_object`. Everything else gets the
    /// strict schema.
    pub fn default_json_mode(&self) -> JsonMode {
        let model = self.model.to_lowercase();
        if self.vendor != "openai" {
            return JsonMode::Schema;
        }
        if model.starts_with("gpt-4-turbo")
            || model.starts_with("gpt-4-1106")
            || model.starts_with("gpt-4-0125")
            || model.starts_with("gpt-3.5-turbo")
        {
            JsonMode::Object
        } else if model == "gpt-4" || model.starts_with("gpt-4-") {
            JsonMode::Off
        } else {
            JsonMode::Schema
        }
    }
}

/// How the extractor asks the provider for JSON output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonMode {
    /// `response_format: json_schema` carrying the strict article schema.
    Schema,
    /// `response_format: json_object`; the schema is only in the prompt.
    Object,
    /// No `response_format`; the prompt alone asks for JSON.
    Off,
}

impl JsonMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            JsonMode::Schema => "json_schema",
            JsonMode::Object => "json_object",
            JsonMode::Off => "none",
        }
    }
}

impl fmt::Display for JsonMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JsonMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json_schema" => Ok(JsonMode::Schema),
            "json_object" => Ok(JsonMode::Object),
            "none" => Ok(JsonMode::Off),
            _ => Err(format!(
                "Unknown response format: {s} (expected json_schema, json_object or none)"
            )),
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.vendor, self.model)
    }
}

/// Configuration for the LLM extractor.
#[derive(Clone)]
pub struct ExtractorConfig {
    pub provider: Provider,
    pub api_key: String,
    pub base_url: String,
    pub chunk_token_threshold: usize,
    pub timeout: Duration,
    pub json_mode: JsonMode,
}

impl ExtractorConfig {
    /// Validate extractor settings.
    ///
    /// A missing or blank API key is a configuration error, reported before
    /// anything touches the network or the filesystem.
    pub fn new(
        provider: &str,
        api_key: Option<String>,
        base_url: Option<String>,
    ) -> Result<Self, AppError> {
        let api_key = api_key
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                AppError::ConfigError(
                    "OPENAI_API_KEY not set. Please set it with: export OPENAI_API_KEY='your-api-key'"
                        .into(),
                )
            })?;

        let provider = Provider::parse(provider)?;
        let base_url = match base_url.filter(|u| !u.trim().is_empty()) {
            Some(url) => url,
            None => provider
                .default_base_url()
                .ok_or_else(|| {
                    AppError::ConfigError(format!(
                        "No known API base for vendor '{}'; pass one explicitly",
                        provider.vendor
                    ))
                })?
                .to_string(),
        };

        Ok(Self {
            json_mode: provider.default_json_mode(),
            provider,
            api_key,
            base_url,
            chunk_token_threshold: DEFAULT_CHUNK_TOKEN_THRESHOLD,
            timeout: DEFAULT_LLM_TIMEOUT,
        })
    }

    pub fn with_chunk_token_threshold(mut self, threshold: usize) -> Self {
        self.chunk_token_threshold = threshold;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Override the JSON mode picked for the provider's model.
    pub fn with_json_mode(mut self, mode: JsonMode) -> Self {
        self.json_mode = mode;
        self
    }
}

impl fmt::Debug for ExtractorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractorConfig")
            .field("provider", &self.provider)
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("chunk_token_threshold", &self.chunk_token_threshold)
            .field("timeout", &self.timeout)
            .field("json_mode", &self.json_mode)
            .finish()
    }
}
