mod compression;
mod error;
mod llm;
pub mod retry;
pub mod validation;

pub use compression::{compression_ratio, savings_percent, CompressedPrompt, CompressionOptions};
pub use error::{ErrorKind, LessTokensError};
pub use llm::{
    LlmConfig, LlmResponse, Message, ResponseMetadata, StreamChunk, TokenUsage, ROLE_ASSISTANT,
    ROLE_SYSTEM, ROLE_USER,
};
pub use retry::{retry, RetryPolicy};
