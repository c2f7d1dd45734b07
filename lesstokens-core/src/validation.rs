//! Input checks run before any network activity.

use crate::{CompressionOptions, LessTokensError, LlmConfig};

pub const MIN_PROMPT_CHARS: usize = 1;
pub const MAX_PROMPT_CHARS: usize = 1_000_000;

pub fn validate_prompt(prompt: &str) -> Result<(), LessTokensError> {
    let length = prompt.chars().count();
    if length < MIN_PROMPT_CHARS {
        return Err(LessTokensError::validation(format!(
            "Prompt must be at least {MIN_PROMPT_CHARS} character long"
        )));
    }
    if length > MAX_PROMPT_CHARS {
        return Err(LessTokensError::validation(format!(
            "Prompt must not exceed {MAX_PROMPT_CHARS} characters"
        )));
    }
    Ok(())
}

pub fn validate_llm_config(config: &LlmConfig) -> Result<(), LessTokensError> {
    if config.api_key().trim().is_empty() {
        return Err(LessTokensError::validation(
            "LLM API key is required and must be a non-empty string",
        ));
    }
    if config.model.trim().is_empty() {
        return Err(LessTokensError::validation(
            "Model is required and must be a non-empty string",
        ));
    }
    Ok(())
}

pub fn validate_compression_options(options: &CompressionOptions) -> Result<(), LessTokensError> {
    if let Some(ratio) = options.target_ratio {
        if !(0.0..=1.0).contains(&ratio) {
            return Err(LessTokensError::validation(
                "target_ratio must be a number between 0.0 and 1.0",
            ));
        }
    }
    Ok(())
}
