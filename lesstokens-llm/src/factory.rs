use std::str::FromStr;

use lesstokens_core::{LessTokensError, LlmConfig, LlmResponse, Message};

use crate::providers::{
    anthropic::AnthropicProvider, deepseek::DeepSeekProvider, google::GoogleProvider,
    openai::OpenAiProvider,
};
use crate::{LlmProvider, ProviderKind, ProviderOptions, ProviderStream};

/// One of the built-in backend adapters, selected by name at runtime.
#[derive(Clone)]
pub enum Provider {
    OpenAi(OpenAiProvider),
    Anthropic(AnthropicProvider),
    Google(GoogleProvider),
    DeepSeek(DeepSeekProvider),
}

impl Provider {
    pub fn new(kind: ProviderKind, options: &ProviderOptions) -> Result<Self, LessTokensError> {
        let options = options.clone();
        Ok(match kind {
            ProviderKind::OpenAi => Provider::OpenAi(OpenAiProvider::new(options)?),
            ProviderKind::Anthropic => Provider::Anthropic(AnthropicProvider::new(options)?),
            ProviderKind::Google => Provider::Google(GoogleProvider::new(options)?),
            ProviderKind::DeepSeek => Provider::DeepSeek(DeepSeekProvider::new(options)?),
        })
    }

    pub fn kind(&self) -> ProviderKind {
        match self {
            Provider::OpenAi(_) => ProviderKind::OpenAi,
            Provider::Anthropic(_) => ProviderKind::Anthropic,
            Provider::Google(_) => ProviderKind::Google,
            Provider::DeepSeek(_) => ProviderKind::DeepSeek,
        }
    }

    fn inner(&self) -> &dyn LlmProvider {
        match self {
            Provider::OpenAi(provider) => provider,
            Provider::Anthropic(provider) => provider,
            Provider::Google(provider) => provider,
            Provider::DeepSeek(provider) => provider,
        }
    }
}

impl std::fmt::Debug for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Provider").field(&self.kind()).finish()
    }
}

#[async_trait::async_trait]
impl LlmProvider for Provider {
    fn name(&self) -> &str {
        self.kind().as_str()
    }

    async fn chat(
        &self,
        messages: Vec<Message>,
        config: &LlmConfig,
    ) -> Result<LlmResponse, LessTokensError> {
        self.inner().chat(messages, config).await
    }

    fn chat_stream(&self, messages: Vec<Message>, config: &LlmConfig) -> ProviderStream {
        self.inner().chat_stream(messages, config)
    }
}

/// Builds the adapter registered under `name` (case-insensitive).
///
/// Unknown names fail with `InvalidProvider` listing the supported set.
pub fn create_provider(name: &str, options: &ProviderOptions) -> Result<Provider, LessTokensError> {
    let kind = ProviderKind::from_str(name)?;
    tracing::debug!(provider = %kind, "creating provider adapter");
    Provider::new(kind, options)
}
