use std::io::Write;

use futures::StreamExt;
use lesstokens::{LessTokensConfig, LessTokensSdk, PromptRequest};
use lesstokens_demos::{init, llm_config_from_env};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init();

    let sdk = LessTokensSdk::new(LessTokensConfig::from_env()?)?;
    let request = PromptRequest::new(
        "Write a short story about a crab who learns to write Rust, keeping it under 200 words.",
        llm_config_from_env()?,
    );

    let mut stream = sdk.process_prompt_stream(request)?;
    let mut stdout = std::io::stdout();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if chunk.done {
            println!();
            if let Some(usage) = chunk.usage {
                tracing::info!(
                    total_tokens = usage.total_tokens,
                    compressed_tokens = ?usage.compressed_tokens,
                    savings = ?usage.savings,
                    "stream finished"
                );
            }
            break;
        }
        write!(stdout, "{}", chunk.content)?;
        stdout.flush()?;
    }
    Ok(())
}
