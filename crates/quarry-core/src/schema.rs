use jsonschema::Validator;
use serde_json::{Value, json};

use crate::chunk::merge_payloads;
use crate::error::AppError;
use crate::models::{ArticleRecord, ExtractedRecord, TechnicalLevel};

/// Instruction sent alongside every article.
pub const ARTICLE_INSTRUCTION: &str = "\
Analyze this blog post and extract key information:
1. Identify the main technical concepts and their complexity
2. Determine if it contains code examples
3. Categorize the content and its relation to Ethereum
4. Create a technical summary focused on the main arguments and insights
Be precise and focus on technical details rather than general descriptions.";

/// Keys the pipeline adds to a processed record; never taken from the model.
const RESERVED_KEYS: [&str; 1] = ["crawl_date"];

/// The article extraction schema.
///
/// Holds two views of the same definition: the strict schema sent to the
/// model (every property listed as required, no extra properties) and a
/// compiled validator for replies, which tolerates a missing
/// `date_published` or `categories` and unknown extra keys.
pub struct ArticleSchema {
    llm_schema: Value,
    validator: Validator,
}

impl ArticleSchema {
    pub fn new() -> Result<Self, AppError> {
        let llm_schema = article_llm_schema();
        let validation_schema = relax(&llm_schema);
        let validator = jsonschema::validator_for(&validation_schema)
            .map_err(|e| AppError::SchemaValidationError(format!("Invalid article schema: {e}")))?;

        Ok(Self {
            llm_schema,
            validator,
        })
    }

    /// Schema passed to the extractor.
    pub fn llm_schema(&self) -> &Value {
        &self.llm_schema
    }

    /// Parse and validate an extraction payload.
    ///
    /// Accepts a JSON object, or an array of per-chunk objects which are
    /// merged first. Anything missing a required field, carrying a wrong
    /// type, or with a blank summary is rejected as a whole.
    pub fn parse_payload(&self, payload: &str) -> Result<ExtractedRecord, AppError> {
        let value: Value = serde_json::from_str(payload.trim())?;

        let value = match value {
            Value::Array(items) => merge_payloads(items).ok_or_else(|| {
                AppError::SchemaValidationError("payload array holds no objects".into())
            })?,
            other => other,
        };

        let Value::Object(map) = &value else {
            return Err(AppError::SchemaValidationError(format!(
                "expected a JSON object, got {}",
                json_kind(&value)
            )));
        };

        let errors: Vec<String> = self
            .validator
            .iter_errors(&value)
            .map(|e| e.to_string())
            .collect();
        if !errors.is_empty() {
            return Err(AppError::SchemaValidationError(errors.join("; ")));
        }

        let extra: serde_json::Map<String, Value> = map
            .iter()
            .filter(|(k, _)| {
                !ArticleRecord::FIELDS.contains(&k.as_str()) && !RESERVED_KEYS.contains(&k.as_str())
            })
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let record: ArticleRecord = serde_json::from_value(value)?;
        if record.summary.trim().is_empty() {
            return Err(AppError::SchemaValidationError(
                "summary must not be empty".into(),
            ));
        }

        Ok(ExtractedRecord { record, extra })
    }
}

fn article_llm_schema() -> Value {
    let levels: Vec<&str> = TechnicalLevel::ALL.iter().map(|l| l.as_str()).collect();

    json!({
        "title": "BlogPost",
        "type": "object",
        "properties": {
            "title": {"type": "string"},
            "url": {"type": "string"},
            "date_published": {"type": ["string", "null"]},
            "summary": {
                "type": "string",
                "description": "A concise summary of the main points"
            },
            "key_concepts": {
                "type": "array",
                "items": {"type": "string"},
                "description": "Technical concepts discussed in the post"
            },
            "technical_level": {
                "type": "string",
                "enum": levels,
                "description": "Estimated technical complexity: basic, intermediate, or advanced"
            },
            "categories": {
                "type": "array",
                "items": {"type": "string"},
                "description": "Topic categories of the post"
            },
            "ethereum_related": {
                "type": "boolean",
                "description": "Whether the post primarily discusses Ethereum"
            },
            "code_snippets_present": {
                "type": "boolean",
                "description": "Whether the post contains code examples"
            }
        },
        "required": ArticleRecord::FIELDS,
        "additionalProperties": false
    })
}

/// Derive the reply-validation schema from the strict one.
fn relax(strict: &Value) -> Value {
    let mut schema = strict.clone();
    if let Some(obj) = schema.as_object_mut() {
        obj.remove("additionalProperties");
        if let Some(Value::Array(required)) = obj.get_mut("required") {
            required.retain(|k| k != "date_published" && k != "categories");
        }
    }
    schema
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
