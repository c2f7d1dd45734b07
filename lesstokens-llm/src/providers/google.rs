//! Google Gemini API adapter

use futures::stream::StreamExt;
use lesstokens_core::{
    LessTokensError, LlmConfig, LlmResponse, Message, ResponseMetadata, StreamChunk, TokenUsage,
    ROLE_ASSISTANT,
};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{decode_error, send, transport_error, within};
use crate::provider::{base_url, now_timestamp, stop_sequences, STOP_KEYS};
use crate::{sse, LlmProvider, ProviderKind, ProviderOptions, ProviderStream};

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Option keys remapped into `generationConfig` under Gemini's names.
const GENERATION_KEYS: &[(&[&str], &str)] = &[
    (&["temperature"], "temperature"),
    (&["max_tokens", "maxTokens"], "maxOutputTokens"),
    (&["top_p", "topP"], "topP"),
    (&["top_k", "topK"], "topK"),
];

#[derive(Clone)]
pub struct GoogleProvider {
    options: ProviderOptions,
    http: Client,
}

impl GoogleProvider {
    pub fn new(options: ProviderOptions) -> Result<Self, LessTokensError> {
        Ok(Self {
            http: options.http_client()?,
            options,
        })
    }
}

fn model_name(model: &str) -> &str {
    let model = model.trim();
    model.strip_prefix("models/").unwrap_or(model)
}

fn generate_url(config: &LlmConfig) -> String {
    format!(
        "{}/v1beta/models/{}:generateContent",
        base_url(config, GEMINI_BASE_URL),
        model_name(&config.model)
    )
}

fn stream_url(config: &LlmConfig) -> String {
    format!(
        "{}/v1beta/models/{}:streamGenerateContent",
        base_url(config, GEMINI_BASE_URL),
        model_name(&config.model)
    )
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Map::is_empty")]
    generation_config: Map<String, Value>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
    #[serde(default)]
    model_version: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
    #[serde(default)]
    total_token_count: Option<u32>,
}

impl From<UsageMetadata> for TokenUsage {
    fn from(usage: UsageMetadata) -> Self {
        let mut mapped = TokenUsage::new(usage.prompt_token_count, usage.candidates_token_count);
        if let Some(total) = usage.total_token_count {
            mapped.total_tokens = total;
        }
        mapped
    }
}

fn text_part(text: String) -> Part {
    Part { text: Some(text) }
}

fn map_contents(messages: Vec<Message>) -> (Option<Content>, Vec<Content>) {
    let mut system_parts = Vec::new();
    let mut contents = Vec::new();

    for message in messages {
        if message.is_system() {
            system_parts.push(text_part(message.content));
            continue;
        }
        let role = if message.role.eq_ignore_ascii_case(ROLE_ASSISTANT) || message.role == "model" {
            "model"
        } else {
            "user"
        };
        contents.push(Content {
            role: Some(role.to_string()),
            parts: vec![text_part(message.content)],
        });
    }

    let system_instruction = (!system_parts.is_empty()).then(|| Content {
        role: None,
        parts: system_parts,
    });
    (system_instruction, contents)
}

fn generation_config(config: &LlmConfig) -> Map<String, Value> {
    let recognized: Vec<&str> = GENERATION_KEYS
        .iter()
        .flat_map(|(aliases, _)| aliases.iter().copied())
        .chain(STOP_KEYS.iter().copied())
        .collect();

    let mut generation = config.passthrough(&recognized);
    for (aliases, native) in GENERATION_KEYS {
        if let Some(value) = config.option(aliases) {
            generation.insert((*native).to_string(), value.clone());
        }
    }
    if let Some(stop) = config.option(STOP_KEYS) {
        generation.insert("stopSequences".to_string(), stop_sequences(stop));
    }
    generation
}

fn build_request(messages: Vec<Message>, config: &LlmConfig) -> GenerateContentRequest {
    let (system_instruction, contents) = map_contents(messages);
    GenerateContentRequest {
        contents,
        system_instruction,
        generation_config: generation_config(config),
    }
}

fn is_blocked_finish_reason(reason: &str) -> bool {
    matches!(reason, "SAFETY" | "RECITATION" | "BLOCKLIST")
}

fn candidate_text(content: Option<Content>) -> String {
    content
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect::<String>()
        })
        .unwrap_or_default()
}

#[async_trait::async_trait]
impl LlmProvider for GoogleProvider {
    fn name(&self) -> &str {
        ProviderKind::Google.as_str()
    }

    async fn chat(
        &self,
        messages: Vec<Message>,
        config: &LlmConfig,
    ) -> Result<LlmResponse, LessTokensError> {
        let kind = ProviderKind::Google;
        let url = generate_url(config);
        tracing::debug!(provider = %kind, model = %config.model, url = %url, "sending generateContent request");

        let request = self
            .http
            .post(&url)
            .query(&[("key", config.api_key())])
            .json(&build_request(messages, config));
        let response: GenerateContentResponse = send(kind, self.options.apply_timeout(request))
            .await?
            .json()
            .await
            .map_err(|err| transport_error(kind, err))?;

        let usage = response.usage_metadata.map(TokenUsage::from).unwrap_or_default();
        let candidate = response
            .candidates
            .and_then(|candidates| candidates.into_iter().next())
            .ok_or_else(|| LessTokensError::llm_api("Google API error: No candidates in response"))?;

        let finish_reason = candidate.finish_reason;
        let text = candidate_text(candidate.content);
        if text.is_empty() {
            if let Some(reason) = finish_reason.as_deref().filter(|r| is_blocked_finish_reason(r)) {
                return Err(LessTokensError::llm_api(format!(
                    "Google API error: Generation blocked: {reason}"
                )));
            }
        }

        Ok(LlmResponse {
            content: text,
            usage,
            metadata: Some(ResponseMetadata {
                model: response.model_version.or_else(|| Some(config.model.clone())),
                provider: Some(kind.as_str().to_string()),
                timestamp: Some(now_timestamp()),
                compression_ratio: None,
            }),
        })
    }

    fn chat_stream(&self, messages: Vec<Message>, config: &LlmConfig) -> ProviderStream {
        let kind = ProviderKind::Google;
        let url = stream_url(config);
        tracing::debug!(provider = %kind, model = %config.model, url = %url, "opening streamGenerateContent");

        let request = self
            .http
            .post(&url)
            .query(&[("alt", "sse"), ("key", config.api_key())])
            .json(&build_request(messages, config));

        let idle = self.options.timeout;

        async_stream::try_stream! {
            let response = within(kind, idle, send(kind, request)).await?;
            let mut events = sse::data_lines(kind, response, idle);
            let mut usage = None;

            while let Some(data) = events.next().await {
                let data = data?;
                if data == "[DONE]" {
                    break;
                }

                let chunk: GenerateContentResponse =
                    serde_json::from_str(&data).map_err(|err| decode_error(kind, &data, err))?;
                if let Some(reported) = chunk.usage_metadata {
                    usage = Some(TokenUsage::from(reported));
                }
                let text = chunk
                    .candidates
                    .and_then(|candidates| candidates.into_iter().next())
                    .map(|candidate| candidate_text(candidate.content))
                    .unwrap_or_default();
                if !text.is_empty() {
                    yield StreamChunk::delta(text);
                }
            }

            yield StreamChunk::finish(usage);
        }
        .boxed()
    }
}
