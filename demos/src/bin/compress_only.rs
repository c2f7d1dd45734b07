use lesstokens::{CompressionOptions, LessTokensConfig, LessTokensSdk};
use lesstokens_demos::init;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init();

    let sdk = LessTokensSdk::new(LessTokensConfig::from_env()?)?;
    let prompt = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "Please could you kindly provide me with a summary of the following text".into());

    let options = CompressionOptions::new().aggressive(true);
    let result = sdk.compress_prompt(&prompt, Some(&options)).await?;

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
