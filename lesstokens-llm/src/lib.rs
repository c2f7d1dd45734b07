//! Backend adapters for the LessTokens SDK.
//!
//! Every adapter implements [`LlmProvider`]: a buffered `chat` call and a
//! `chat_stream` call yielding text deltas followed by one terminal chunk.

mod error;
mod factory;
mod provider;

// OpenAI-compatible client shared by OpenAI and DeepSeek
pub mod openai_compatible;

pub mod providers;
pub mod sse;

pub use factory::{create_provider, Provider};
pub use provider::{LlmProvider, ProviderKind, ProviderOptions, ProviderStream};

pub use openai_compatible::{ChatCompletionRequest, OpenAiCompatibleBuilder, OpenAiCompatibleClient};
pub use providers::{
    anthropic::AnthropicProvider, deepseek::DeepSeekProvider, google::GoogleProvider,
    openai::OpenAiProvider,
};

pub use lesstokens_core::{LlmConfig, LlmResponse, Message, StreamChunk, TokenUsage};
