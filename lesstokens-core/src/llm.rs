use std::fmt;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::LessTokensError;

pub const ROLE_SYSTEM: &str = "system";
pub const ROLE_USER: &str = "user";
pub const ROLE_ASSISTANT: &str = "assistant";

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(ROLE_SYSTEM, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(ROLE_USER, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(ROLE_ASSISTANT, content)
    }

    pub fn is_system(&self) -> bool {
        self.role.eq_ignore_ascii_case(ROLE_SYSTEM)
    }
}

/// Per-call backend configuration.
///
/// `api_key` and `model` are always required. Everything else lives in
/// `options` and is handed to the selected adapter, which remaps the keys it
/// knows and forwards the rest verbatim.
#[derive(Clone)]
pub struct LlmConfig {
    pub api_key: SecretString,
    pub model: String,
    pub base_url: Option<String>,
    pub options: Map<String, Value>,
}

impl fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("options", &self.options)
            .finish()
    }
}

impl LlmConfig {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::new(api_key.into()),
            model: model.into(),
            base_url: None,
            options: Map::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    pub fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }

    /// First non-null value stored under any of `aliases`, in alias order.
    pub fn option(&self, aliases: &[&str]) -> Option<&Value> {
        aliases
            .iter()
            .filter_map(|alias| self.options.get(*alias))
            .find(|value| !value.is_null())
    }

    /// Options whose keys are not in `recognized`, with nulls dropped.
    pub fn passthrough(&self, recognized: &[&str]) -> Map<String, Value> {
        self.options
            .iter()
            .filter(|(key, value)| !recognized.contains(&key.as_str()) && !value.is_null())
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }
}

impl TryFrom<Map<String, Value>> for LlmConfig {
    type Error = LessTokensError;

    fn try_from(mut map: Map<String, Value>) -> Result<Self, Self::Error> {
        let api_key = take_string(&mut map, "api_key")
            .ok_or_else(|| LessTokensError::validation("LLM API key is required and must be a non-empty string"))?;
        let model = take_string(&mut map, "model")
            .ok_or_else(|| LessTokensError::validation("Model is required and must be a non-empty string"))?;
        let base_url = take_string(&mut map, "base_url").or_else(|| take_string(&mut map, "baseURL"));

        Ok(Self {
            api_key: SecretString::new(api_key),
            model,
            base_url,
            options: map,
        })
    }
}

impl TryFrom<Value> for LlmConfig {
    type Error = LessTokensError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Self::try_from(map),
            other => Err(LessTokensError::validation(format!(
                "LLM configuration must be an object, got {other}"
            ))),
        }
    }
}

fn take_string(map: &mut Map<String, Value>, key: &str) -> Option<String> {
    match map.remove(key) {
        Some(Value::String(value)) => Some(value),
        _ => None,
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compressed_tokens: Option<u32>,
    /// Percentage saved by compression (0-100).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub savings: Option<f64>,
}

impl TokenUsage {
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens.saturating_add(completion_tokens),
            compressed_tokens: None,
            savings: None,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct ResponseMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    /// RFC 3339 timestamp of when the backend answered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compression_ratio: Option<f64>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct LlmResponse {
    pub content: String,
    pub usage: TokenUsage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ResponseMetadata>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct StreamChunk {
    pub content: String,
    pub done: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
}

impl StreamChunk {
    pub fn delta(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            done: false,
            usage: None,
        }
    }

    pub fn finish(usage: Option<TokenUsage>) -> Self {
        Self {
            content: String::new(),
            done: true,
            usage,
        }
    }
}
