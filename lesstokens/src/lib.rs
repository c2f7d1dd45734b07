//! LessTokens SDK: compress a prompt through the LessTokens service, then send
//! it to OpenAI, Anthropic, Google or DeepSeek.
//!
//! ```no_run
//! use lesstokens::{LessTokensConfig, LessTokensSdk, LlmConfig, PromptRequest};
//!
//! # async fn run() -> Result<(), lesstokens::LessTokensError> {
//! let sdk = LessTokensSdk::new(LessTokensConfig::new("lt-key", "openai"))?;
//! let request = PromptRequest::new(
//!     "Explain the borrow checker in detail",
//!     LlmConfig::new("sk-key", "gpt-4o-mini"),
//! );
//! let response = sdk.process_prompt(request).await?;
//! println!("{} (saved {:?}%)", response.content, response.usage.savings);
//! # Ok(())
//! # }
//! ```

mod compression;
mod config;
mod sdk;

pub use compression::CompressionClient;
pub use config::{
    LessTokensConfig, DEFAULT_BASE_URL, DEFAULT_TIMEOUT_MS, ENV_API_KEY, ENV_BASE_URL,
    ENV_PROVIDER, ENV_TIMEOUT_MS,
};
pub use sdk::{LessTokensSdk, MessageContent, PromptRequest, PromptStream};

pub use lesstokens_core::{
    retry, validation, CompressedPrompt, CompressionOptions, ErrorKind, LessTokensError,
    LlmConfig, LlmResponse, Message, ResponseMetadata, RetryPolicy, StreamChunk, TokenUsage,
    ROLE_ASSISTANT, ROLE_SYSTEM, ROLE_USER,
};
pub use lesstokens_llm::{
    create_provider, LlmProvider, Provider, ProviderKind, ProviderOptions, ProviderStream,
};
