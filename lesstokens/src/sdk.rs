use std::fmt;
use std::sync::Arc;

use futures::stream::{self, BoxStream, StreamExt};
use lesstokens_core::validation::{
    validate_compression_options, validate_llm_config, validate_prompt,
};
use lesstokens_core::{
    CompressedPrompt, CompressionOptions, LessTokensError, LlmConfig, LlmResponse, Message,
    StreamChunk, TokenUsage, ROLE_USER,
};
use lesstokens_llm::{LlmProvider, Provider, ProviderOptions, ProviderStream};

use crate::compression::CompressionClient;
use crate::config::LessTokensConfig;

/// Text of the message appended after compression.
#[derive(Clone)]
pub enum MessageContent {
    Literal(String),
    /// Built from the compression result, typically to wrap the compressed text.
    Computed(Arc<dyn Fn(&CompressedPrompt) -> String + Send + Sync>),
}

impl MessageContent {
    pub fn computed<F>(f: F) -> Self
    where
        F: Fn(&CompressedPrompt) -> String + Send + Sync + 'static,
    {
        MessageContent::Computed(Arc::new(f))
    }

    pub fn resolve(&self, compressed: &CompressedPrompt) -> String {
        match self {
            MessageContent::Literal(text) => text.clone(),
            MessageContent::Computed(f) => f(compressed),
        }
    }
}

impl fmt::Debug for MessageContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageContent::Literal(text) => f.debug_tuple("Literal").field(text).finish(),
            MessageContent::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

impl From<String> for MessageContent {
    fn from(value: String) -> Self {
        MessageContent::Literal(value)
    }
}

impl From<&str> for MessageContent {
    fn from(value: &str) -> Self {
        MessageContent::Literal(value.to_string())
    }
}

#[derive(Clone, Debug)]
pub struct PromptRequest {
    pub prompt: String,
    pub llm_config: LlmConfig,
    pub compression_options: Option<CompressionOptions>,
    pub message_role: String,
    /// Defaults to the compressed prompt text.
    pub message_content: Option<MessageContent>,
    /// Prior conversation, sent ahead of the new message.
    pub messages: Vec<Message>,
}

impl PromptRequest {
    pub fn new(prompt: impl Into<String>, llm_config: LlmConfig) -> Self {
        Self {
            prompt: prompt.into(),
            llm_config,
            compression_options: None,
            message_role: ROLE_USER.to_string(),
            message_content: None,
            messages: Vec::new(),
        }
    }

    pub fn compression_options(mut self, options: CompressionOptions) -> Self {
        self.compression_options = Some(options);
        self
    }

    pub fn message_role(mut self, role: impl Into<String>) -> Self {
        self.message_role = role.into();
        self
    }

    pub fn message_content(mut self, content: impl Into<MessageContent>) -> Self {
        self.message_content = Some(content.into());
        self
    }

    pub fn messages(mut self, messages: Vec<Message>) -> Self {
        self.messages = messages;
        self
    }

    pub fn validate(&self) -> Result<(), LessTokensError> {
        validate_prompt(&self.prompt)?;
        validate_llm_config(&self.llm_config)?;
        if let Some(options) = &self.compression_options {
            validate_compression_options(options)?;
        }
        Ok(())
    }

    /// Prior messages in order, followed by the new turn.
    pub fn build_messages(&self, compressed: &CompressedPrompt) -> Vec<Message> {
        let content = match &self.message_content {
            Some(content) => content.resolve(compressed),
            None => compressed.compressed.clone(),
        };

        let mut messages = Vec::with_capacity(self.messages.len() + 1);
        messages.extend(self.messages.iter().cloned());
        let role = if self.message_role.trim().is_empty() {
            ROLE_USER.to_string()
        } else {
            self.message_role.clone()
        };
        messages.push(Message::new(role, content));
        messages
    }
}

/// Compression-stage metrics layered over the backend's token counts.
///
/// A backend that reports no usage gets prompt and total counted from the
/// compressed prompt, since that is the text it received. Completion stays 0.
fn merge_usage(usage: Option<TokenUsage>, compressed: &CompressedPrompt) -> TokenUsage {
    let mut usage = usage.unwrap_or_else(|| TokenUsage {
        prompt_tokens: compressed.compressed_tokens,
        completion_tokens: 0,
        total_tokens: compressed.compressed_tokens,
        compressed_tokens: None,
        savings: None,
    });
    usage.compressed_tokens = Some(compressed.compressed_tokens);
    usage.savings = Some(compressed.savings);
    usage
}

pub type PromptStream = BoxStream<'static, Result<StreamChunk, LessTokensError>>;

/// Compresses prompts and forwards them to the configured backend.
#[derive(Clone)]
pub struct LessTokensSdk {
    compression: CompressionClient,
    provider: Arc<dyn LlmProvider>,
}

impl fmt::Debug for LessTokensSdk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LessTokensSdk")
            .field("base_url", &self.compression.base_url())
            .field("provider", &self.provider.name())
            .finish()
    }
}

impl LessTokensSdk {
    pub fn new(config: LessTokensConfig) -> Result<Self, LessTokensError> {
        let kind = config.validate()?;
        let options = ProviderOptions::default().with_timeout(config.timeout());
        let provider = Provider::new(kind, &options)?;
        Ok(Self {
            compression: CompressionClient::from_config(&config)?,
            provider: Arc::new(provider),
        })
    }

    /// Uses `provider` instead of a built-in backend. `config.provider` is not consulted.
    pub fn with_provider(
        config: LessTokensConfig,
        provider: Arc<dyn LlmProvider>,
    ) -> Result<Self, LessTokensError> {
        config.validate_transport()?;
        Ok(Self {
            compression: CompressionClient::from_config(&config)?,
            provider,
        })
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub async fn process_prompt(&self, request: PromptRequest) -> Result<LlmResponse, LessTokensError> {
        request.validate()?;

        let compressed = self
            .compression
            .compress(&request.prompt, request.compression_options.as_ref())
            .await?;
        let messages = request.build_messages(&compressed);
        tracing::debug!(
            provider = self.provider.name(),
            model = %request.llm_config.model,
            messages = messages.len(),
            "dispatching compressed prompt"
        );

        let mut response = self.provider.chat(messages, &request.llm_config).await?;
        response.usage = merge_usage(Some(response.usage), &compressed);
        let metadata = response.metadata.get_or_insert_with(Default::default);
        metadata.compression_ratio = Some(compressed.ratio);
        if metadata.provider.is_none() {
            metadata.provider = Some(self.provider.name().to_string());
        }
        Ok(response)
    }

    /// Validates synchronously, then compresses and streams on first poll.
    ///
    /// Yields one chunk per backend delta and a final `done` chunk carrying the
    /// merged usage. Dropping the stream early closes the backend response.
    pub fn process_prompt_stream(&self, request: PromptRequest) -> Result<PromptStream, LessTokensError> {
        request.validate()?;

        enum StreamState {
            Idle(CompressionClient, Arc<dyn LlmProvider>, Box<PromptRequest>),
            Streaming(ProviderStream, CompressedPrompt),
            Done,
        }

        async fn advance(
            mut inner: ProviderStream,
            compressed: CompressedPrompt,
        ) -> Option<(Result<StreamChunk, LessTokensError>, StreamState)> {
            match inner.next().await {
                Some(Ok(chunk)) if chunk.done => {
                    tracing::debug!("backend stream finished");
                    let usage = merge_usage(chunk.usage, &compressed);
                    Some((Ok(StreamChunk::finish(Some(usage))), StreamState::Done))
                }
                Some(Ok(chunk)) => Some((Ok(chunk), StreamState::Streaming(inner, compressed))),
                Some(Err(err)) => Some((Err(err), StreamState::Done)),
                None => {
                    let usage = merge_usage(None, &compressed);
                    Some((Ok(StreamChunk::finish(Some(usage))), StreamState::Done))
                }
            }
        }

        let start = StreamState::Idle(
            self.compression.clone(),
            Arc::clone(&self.provider),
            Box::new(request),
        );

        let stream = stream::unfold(start, |state| async move {
            match state {
                StreamState::Idle(compression, provider, request) => {
                    let compressed = match compression
                        .compress(&request.prompt, request.compression_options.as_ref())
                        .await
                    {
                        Ok(compressed) => compressed,
                        Err(err) => return Some((Err(err), StreamState::Done)),
                    };
                    let messages = request.build_messages(&compressed);
                    tracing::debug!(
                        provider = provider.name(),
                        model = %request.llm_config.model,
                        messages = messages.len(),
                        "opening backend stream"
                    );
                    let inner = provider.chat_stream(messages, &request.llm_config);
                    advance(inner, compressed).await
                }
                StreamState::Streaming(inner, compressed) => advance(inner, compressed).await,
                StreamState::Done => None,
            }
        });

        Ok(stream.boxed())
    }

    /// Compression only, with no backend call.
    pub async fn compress_prompt(
        &self,
        prompt: &str,
        options: Option<&CompressionOptions>,
    ) -> Result<CompressedPrompt, LessTokensError> {
        validate_prompt(prompt)?;
        if let Some(options) = options {
            validate_compression_options(options)?;
        }
        self.compression.compress(prompt, options).await
    }
}
