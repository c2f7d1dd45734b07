use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use futures::stream::BoxStream;
use lesstokens_core::{ErrorKind, LessTokensError, LlmConfig, LlmResponse, Message, StreamChunk};
use reqwest::{Client, RequestBuilder};
use serde_json::Value;

/// Content deltas followed by exactly one terminal chunk (`done = true`).
pub type ProviderStream = BoxStream<'static, Result<StreamChunk, LessTokensError>>;

/// Uniform chat contract every backend adapter implements.
///
/// Implementations must not retry. Failures surface on first occurrence.
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync + 'static {
    fn name(&self) -> &str;

    async fn chat(
        &self,
        messages: Vec<Message>,
        config: &LlmConfig,
    ) -> Result<LlmResponse, LessTokensError>;

    /// Dropping the returned stream closes the underlying HTTP response.
    fn chat_stream(&self, messages: Vec<Message>, config: &LlmConfig) -> ProviderStream;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    OpenAi,
    Anthropic,
    Google,
    DeepSeek,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 4] = [
        ProviderKind::OpenAi,
        ProviderKind::Anthropic,
        ProviderKind::Google,
        ProviderKind::DeepSeek,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::Google => "google",
            ProviderKind::DeepSeek => "deepseek",
        }
    }

    /// Human-facing name used in error messages.
    pub fn display_name(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "OpenAI",
            ProviderKind::Anthropic => "Anthropic",
            ProviderKind::Google => "Google",
            ProviderKind::DeepSeek => "DeepSeek",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = LessTokensError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        ProviderKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| {
                let supported: Vec<&str> = ProviderKind::ALL.iter().map(|k| k.as_str()).collect();
                LessTokensError::invalid_provider(format!(
                    "Provider '{value}' is not supported. Supported providers: {}",
                    supported.join(", ")
                ))
            })
    }
}

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Transport settings shared by all adapters built from one SDK instance.
#[derive(Clone, Debug)]
pub struct ProviderOptions {
    /// Whole-request limit for `chat`. For `chat_stream` it bounds the wait
    /// for the response head and every gap between body reads.
    pub timeout: Option<Duration>,
    pub connect_timeout: Duration,
}

impl Default for ProviderOptions {
    fn default() -> Self {
        Self {
            timeout: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

impl ProviderOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub(crate) fn http_client(&self) -> Result<Client, LessTokensError> {
        Client::builder()
            .connect_timeout(self.connect_timeout)
            .build()
            .map_err(|err| {
                LessTokensError::new(
                    ErrorKind::NetworkError,
                    format!("Failed to build HTTP client: {err}"),
                )
                .with_source(err)
            })
    }

    pub(crate) fn apply_timeout(&self, request: RequestBuilder) -> RequestBuilder {
        match self.timeout {
            Some(timeout) => request.timeout(timeout),
            None => request,
        }
    }
}

/// Resolves the per-call base URL override against an adapter default.
pub(crate) fn base_url<'a>(config: &'a LlmConfig, default: &'a str) -> &'a str {
    config
        .base_url
        .as_deref()
        .filter(|url| !url.trim().is_empty())
        .unwrap_or(default)
        .trim_end_matches('/')
}

/// Stop option aliases accepted by backends that take a list of sequences.
pub(crate) const STOP_KEYS: &[&str] = &["stop", "stop_sequences", "stopSequences"];

/// A lone stop string becomes a one-element list.
pub(crate) fn stop_sequences(value: &Value) -> Value {
    match value {
        Value::Array(_) => value.clone(),
        other => Value::Array(vec![other.clone()]),
    }
}

pub(crate) fn now_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}
