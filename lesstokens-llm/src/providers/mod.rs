//! Provider-specific LLM adapters

pub mod anthropic;
pub mod deepseek;
pub mod google;
pub mod openai;
