//! Generic OpenAI-compatible chat client
//!
//! Shared by every backend speaking OpenAI's chat-completions format (OpenAI, DeepSeek).

use futures::stream::StreamExt;
use lesstokens_core::{
    LessTokensError, LlmConfig, LlmResponse, Message, ResponseMetadata, StreamChunk, TokenUsage,
};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;
use url::Url;

use crate::error::{decode_error, send, transport_error, within};
use crate::provider::{base_url, now_timestamp, ProviderOptions, ProviderStream};
use crate::{sse, ProviderKind};

/// Option keys this codec maps onto typed request fields.
const RECOGNIZED_OPTIONS: &[&str] = &[
    "temperature",
    "max_tokens",
    "maxTokens",
    "top_p",
    "topP",
    "frequency_penalty",
    "frequencyPenalty",
    "presence_penalty",
    "presencePenalty",
    "stop",
];

/// Request body for chat completions endpoint
#[derive(Serialize, Debug, Clone)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<Value>,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_options: Option<StreamOptions>,
    /// Backend-specific options forwarded verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Serialize, Debug, Clone)]
pub struct StreamOptions {
    pub include_usage: bool,
}

impl ChatCompletionRequest {
    pub fn from_config(messages: Vec<Message>, config: &LlmConfig, stream: bool) -> Self {
        let pick = |aliases: &[&str]| config.option(aliases).cloned();
        Self {
            model: config.model.clone(),
            messages,
            temperature: pick(&["temperature"]),
            max_tokens: pick(&["max_tokens", "maxTokens"]),
            top_p: pick(&["top_p", "topP"]),
            frequency_penalty: pick(&["frequency_penalty", "frequencyPenalty"]),
            presence_penalty: pick(&["presence_penalty", "presencePenalty"]),
            stop: pick(&["stop"]),
            stream,
            stream_options: stream.then_some(StreamOptions {
                include_usage: true,
            }),
            extra: config.passthrough(RECOGNIZED_OPTIONS),
        }
    }
}

/// Non-streaming response from chat completions
#[derive(Deserialize, Debug, Clone)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub choices: Vec<Choice>,
    pub usage: Option<Usage>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Choice {
    #[serde(default)]
    pub index: u32,
    pub message: ResponseMessage,
    pub finish_reason: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ResponseMessage {
    #[serde(default)]
    pub role: Option<String>,
    pub content: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Copy, Default)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

impl From<Usage> for TokenUsage {
    fn from(usage: Usage) -> Self {
        TokenUsage {
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
            total_tokens: usage.total_tokens,
            compressed_tokens: None,
            savings: None,
        }
    }
}

/// Streaming chunk (server-sent events)
#[derive(Deserialize, Debug, Clone)]
pub struct ChatCompletionChunk {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ChunkChoice {
    #[serde(default)]
    pub index: u32,
    #[serde(default)]
    pub delta: Delta,
    pub finish_reason: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct Delta {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Clone)]
pub struct OpenAiCompatibleClient {
    kind: ProviderKind,
    base_url: String,
    options: ProviderOptions,
    http: Client,
}

impl OpenAiCompatibleClient {
    pub fn builder(kind: ProviderKind) -> OpenAiCompatibleBuilder {
        OpenAiCompatibleBuilder {
            kind,
            base_url: None,
            options: ProviderOptions::default(),
        }
    }

    pub fn kind(&self) -> ProviderKind {
        self.kind
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, config: &LlmConfig) -> String {
        format!("{}/chat/completions", base_url(config, &self.base_url))
    }

    pub async fn chat(
        &self,
        messages: Vec<Message>,
        config: &LlmConfig,
    ) -> Result<LlmResponse, LessTokensError> {
        let kind = self.kind;
        let url = self.endpoint(config);
        let request = ChatCompletionRequest::from_config(messages, config, false);
        tracing::debug!(provider = %kind, model = %request.model, url = %url, "sending chat request");

        let http_request = self
            .http
            .post(&url)
            .bearer_auth(config.api_key())
            .json(&request);
        let response = send(kind, self.options.apply_timeout(http_request)).await?;
        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|err| transport_error(kind, err))?;

        let choice = completion.choices.into_iter().next().ok_or_else(|| {
            LessTokensError::llm_api(format!("No response from {}", kind.display_name()))
        })?;

        Ok(LlmResponse {
            content: choice.message.content.unwrap_or_default(),
            usage: completion.usage.unwrap_or_default().into(),
            metadata: Some(ResponseMetadata {
                model: completion.model.or_else(|| Some(request.model.clone())),
                provider: Some(kind.as_str().to_string()),
                timestamp: Some(now_timestamp()),
                compression_ratio: None,
            }),
        })
    }

    pub fn chat_stream(&self, messages: Vec<Message>, config: &LlmConfig) -> ProviderStream {
        let kind = self.kind;
        let url = self.endpoint(config);
        let request = ChatCompletionRequest::from_config(messages, config, true);
        let http_request = self
            .http
            .post(&url)
            .bearer_auth(config.api_key())
            .json(&request);
        tracing::debug!(provider = %kind, model = %request.model, url = %url, "opening chat stream");

        let idle = self.options.timeout;

        async_stream::try_stream! {
            let response = within(kind, idle, send(kind, http_request)).await?;
            let mut events = sse::data_lines(kind, response, idle);
            let mut usage = None;

            while let Some(data) = events.next().await {
                let data = data?;
                if data == "[DONE]" {
                    break;
                }

                let chunk: ChatCompletionChunk =
                    serde_json::from_str(&data).map_err(|err| decode_error(kind, &data, err))?;
                if let Some(reported) = chunk.usage {
                    usage = Some(TokenUsage::from(reported));
                }
                for choice in chunk.choices {
                    if let Some(content) = choice.delta.content.filter(|text| !text.is_empty()) {
                        yield StreamChunk::delta(content);
                    }
                }
            }

            yield StreamChunk::finish(usage);
        }
        .boxed()
    }
}

pub struct OpenAiCompatibleBuilder {
    kind: ProviderKind,
    base_url: Option<String>,
    options: ProviderOptions,
}

impl OpenAiCompatibleBuilder {
    pub fn base_url(mut self, base_url: &str) -> Result<Self, LessTokensError> {
        let parsed = Url::parse(base_url).map_err(|err| {
            LessTokensError::validation(format!("Invalid base URL '{base_url}': {err}"))
        })?;
        self.base_url = Some(parsed.as_str().trim_end_matches('/').to_string());
        Ok(self)
    }

    pub fn options(mut self, options: ProviderOptions) -> Self {
        self.options = options;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Result<OpenAiCompatibleClient, LessTokensError> {
        let base_url = self
            .base_url
            .ok_or_else(|| LessTokensError::validation("base_url is required"))?;
        Ok(OpenAiCompatibleClient {
            kind: self.kind,
            http: self.options.http_client()?,
            base_url,
            options: self.options,
        })
    }
}
