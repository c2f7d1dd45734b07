//! DeepSeek adapter (OpenAI-compatible API)

use crate::openai_compatible::OpenAiCompatibleClient;
use crate::{LlmProvider, ProviderKind, ProviderOptions, ProviderStream};
use lesstokens_core::{LessTokensError, LlmConfig, LlmResponse, Message};

pub const DEEPSEEK_BASE_URL: &str = "https://api.deepseek.com";

#[derive(Clone)]
pub struct DeepSeekProvider(OpenAiCompatibleClient);

impl DeepSeekProvider {
    pub fn new(options: ProviderOptions) -> Result<Self, LessTokensError> {
        OpenAiCompatibleClient::builder(ProviderKind::DeepSeek)
            .base_url(DEEPSEEK_BASE_URL)?
            .options(options)
            .build()
            .map(Self)
    }
}

#[async_trait::async_trait]
impl LlmProvider for DeepSeekProvider {
    fn name(&self) -> &str {
        ProviderKind::DeepSeek.as_str()
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
