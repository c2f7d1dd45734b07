//! Helpers shared by the demo binaries.

use anyhow::Context;
use lesstokens::LlmConfig;
use tracing_subscriber::EnvFilter;

/// Loads `.env` and installs a `RUST_LOG`-driven subscriber (default `info`).
pub fn init() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
}

/// Backend credentials from `LLM_API_KEY`, `LLM_MODEL` and optional `LLM_BASE_URL`.
pub fn llm_config_from_env() -> anyhow::Result<LlmConfig> {
    let api_key = std::env::var("LLM_API_KEY").context("LLM_API_KEY is not set")?;
    let model = std::env::var("LLM_MODEL").context("LLM_MODEL is not set")?;
    let mut config = LlmConfig::new(api_key, model);
    if let Ok(base_url) = std::env::var("LLM_BASE_URL") {
        config = config.with_base_url(base_url);
    }
    Ok(config)
}
