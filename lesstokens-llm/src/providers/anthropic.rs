//! Anthropic Messages API adapter
//!
//! Anthropic does not accept an inline `system` role: system turns are lifted
//! out of the conversation into the top-level `system` field.

use futures::stream::StreamExt;
use lesstokens_core::{
    LessTokensError, LlmConfig, LlmResponse, Message, ResponseMetadata, StreamChunk, TokenUsage,
};
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{decode_error, send, transport_error, within};
use crate::provider::{base_url, now_timestamp, stop_sequences, STOP_KEYS};
use crate::{sse, LlmProvider, ProviderKind, ProviderOptions, ProviderStream};

pub const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com/v1";
pub const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 1024;

const RECOGNIZED_OPTIONS: &[&str] = &[
    "temperature",
    "max_tokens",
    "maxTokens",
    "top_p",
    "topP",
    "top_k",
    "topK",
    "stop",
    "stop_sequences",
    "stopSequences",
];

#[derive(Clone)]
pub struct AnthropicProvider {
    options: ProviderOptions,
    http: Client,
}

impl AnthropicProvider {
    pub fn new(options: ProviderOptions) -> Result<Self, LessTokensError> {
        Ok(Self {
            http: options.http_client()?,
            options,
        })
    }

    fn request(&self, body: &MessagesRequest, config: &LlmConfig) -> RequestBuilder {
        let url = format!("{}/messages", base_url(config, ANTHROPIC_BASE_URL));
        tracing::debug!(provider = "anthropic", model = %body.model, url = %url, stream = body.stream, "sending messages request");
        self.http
            .post(url)
            .header("x-api-key", config.api_key())
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(body)
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: Value,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_k: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop_sequences: Option<Value>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    usage: AnthropicUsage,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text {
        text: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Default, Deserialize, Clone, Copy)]
struct AnthropicUsage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum StreamEvent {
    MessageStart {
        message: StartedMessage,
    },
    ContentBlockDelta {
        delta: BlockDelta,
    },
    MessageDelta {
        #[serde(default)]
        usage: Option<DeltaUsage>,
    },
    MessageStop,
    Error {
        error: Value,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct StartedMessage {
    #[serde(default)]
    usage: AnthropicUsage,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum BlockDelta {
    TextDelta {
        text: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct DeltaUsage {
    #[serde(default)]
    output_tokens: u32,
}

/// Splits system turns out of `messages`, joining them in order.
fn split_system(messages: Vec<Message>) -> (Option<String>, Vec<Message>) {
    let (system, turns): (Vec<Message>, Vec<Message>) =
        messages.into_iter().partition(Message::is_system);
    let system = (!system.is_empty()).then(|| {
        system
            .into_iter()
            .map(|message| message.content)
            .collect::<Vec<_>>()
            .join("\n\n")
    });
    (system, turns)
}

fn build_request(messages: Vec<Message>, config: &LlmConfig, stream: bool) -> MessagesRequest {
    let pick = |aliases: &[&str]| config.option(aliases).cloned();
    let (system, messages) = split_system(messages);
    MessagesRequest {
        model: config.model.clone(),
        max_tokens: pick(&["max_tokens", "maxTokens"]).unwrap_or(Value::from(DEFAULT_MAX_TOKENS)),
        messages,
        system,
        temperature: pick(&["temperature"]),
        top_p: pick(&["top_p", "topP"]),
        top_k: pick(&["top_k", "topK"]),
        stop_sequences: config.option(STOP_KEYS).map(stop_sequences),
        stream,
        extra: config.passthrough(RECOGNIZED_OPTIONS),
    }
}

#[async_trait::async_trait]
impl LlmProvider for AnthropicProvider {
    fn name(&self) -> &str {
        ProviderKind::Anthropic.as_str()
    }

    async fn chat(
        &self,
        messages: Vec<Message>,
        config: &LlmConfig,
    ) -> Result<LlmResponse, LessTokensError> {
        let kind = ProviderKind::Anthropic;
        let body = build_request(messages, config, false);
        let request = self.options.apply_timeout(self.request(&body, config));
        let response: MessagesResponse = send(kind, request)
            .await?
            .json()
            .await
            .map_err(|err| transport_error(kind, err))?;

        let content = response
            .content
            .into_iter()
            .find_map(|block| match block {
                ContentBlock::Text { text } => Some(text),
                ContentBlock::Other => None,
            })
            .unwrap_or_default();

        Ok(LlmResponse {
            content,
            usage: TokenUsage::new(response.usage.input_tokens, response.usage.output_tokens),
            metadata: Some(ResponseMetadata {
                model: response.model.or(Some(body.model)),
                provider: Some(kind.as_str().to_string()),
                timestamp: Some(now_timestamp()),
                compression_ratio: None,
            }),
        })
    }

    fn chat_stream(&self, messages: Vec<Message>, config: &LlmConfig) -> ProviderStream {
        let kind = ProviderKind::Anthropic;
        let body = build_request(messages, config, true);
        let request = self.request(&body, config);

        let idle = self.options.timeout;

        async_stream::try_stream! {
            let response = within(kind, idle, send(kind, request)).await?;
            let mut events = sse::data_lines(kind, response, idle);
            let mut usage: Option<AnthropicUsage> = None;

            while let Some(data) = events.next().await {
                let data = data?;
                let event: StreamEvent =
                    serde_json::from_str(&data).map_err(|err| decode_error(kind, &data, err))?;
                match event {
                    StreamEvent::MessageStart { message } => usage = Some(message.usage),
                    StreamEvent::ContentBlockDelta {
                        delta: BlockDelta::TextDelta { text },
                    } => {
                        if !text.is_empty() {
                            yield StreamChunk::delta(text);
                        }
                    }
                    StreamEvent::MessageDelta { usage: Some(delta) } => {
                        let current = usage.get_or_insert_with(AnthropicUsage::default);
                        current.output_tokens = delta.output_tokens;
                    }
                    StreamEvent::MessageStop => break,
                    StreamEvent::Error { error } => {
                        let message = error
                            .get("message")
                            .and_then(Value::as_str)
                            .unwrap_or("stream error")
                            .to_string();
                        Err::<(), _>(
                            LessTokensError::llm_api(format!("Anthropic API error: {message}"))
                                .with_details(error),
                        )?;
                    }
                    _ => {}
                }
            }

            yield StreamChunk::finish(
                usage.map(|usage| TokenUsage::new(usage.input_tokens, usage.output_tokens)),
            );
        }
        .boxed()
    }
}
