use lesstokens::{CompressionOptions, LessTokensConfig, LessTokensSdk, PromptRequest};
use lesstokens_demos::{init, llm_config_from_env};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init();

    let sdk = LessTokensSdk::new(LessTokensConfig::from_env()?)?;
    let llm_config = llm_config_from_env()?.with_option("temperature", 0.7);

    let request = PromptRequest::new(
        "I would really appreciate it if you could explain, in as much detail as you think \
         is reasonable, how ownership and borrowing work in Rust and why they matter.",
        llm_config,
    )
    .compression_options(CompressionOptions::new().target_ratio(0.5).preserve_context(true));

    let response = sdk.process_prompt(request).await?;

    println!("{}\n", response.content);
    println!("provider:          {}", sdk.provider_name());
    println!("prompt tokens:     {}", response.usage.prompt_tokens);
    println!("completion tokens: {}", response.usage.completion_tokens);
    if let Some(savings) = response.usage.savings {
        println!("tokens saved:      {savings:.2}%");
    }
    Ok(())
}
