//! OpenAI adapter

use crate::openai_compatible::OpenAiCompatibleClient;
use crate::{LlmProvider, ProviderKind, ProviderOptions, ProviderStream};
use lesstokens_core::{LessTokensError, LlmConfig, LlmResponse, Message};

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI chat-completions adapter
#[derive(Clone)]
pub struct OpenAiProvider(OpenAiCompatibleClient);

impl OpenAiProvider {
    pub fn new(options: ProviderOptions) -> Result<Self, LessTokensError> {
        Self::with_base_url(OPENAI_BASE_URL, options)
    }

    /// Point the adapter at another OpenAI-compatible deployment.
    pub fn with_base_url(base_url: &str, options: ProviderOptions) -> Result<Self, LessTokensError> {
        OpenAiCompatibleClient::builder(ProviderKind::OpenAi)
            .base_url(base_url)?
            .options(options)
            .build()
            .map(Self)
    }
}

#[async_trait::async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        ProviderKind::OpenAi.as_str()
    }

    async fn chat(
        &self,
        messages: Vec<Message>,
        config: &LlmConfig,
    ) -> Result<LlmResponse, LessTokensError> {
        self.0.chat(messages, config).await
    }

    fn chat_stream(&self, messages: Vec<Message>, config: &LlmConfig) -> ProviderStream {
        self.0.chat_stream(messages, config)
    }
}
