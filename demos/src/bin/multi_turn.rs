use lesstokens::{LessTokensConfig, LessTokensSdk, Message, MessageContent, PromptRequest};
use lesstokens_demos::{init, llm_config_from_env};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init();

    let sdk = LessTokensSdk::new(LessTokensConfig::from_env()?)?;
    let llm_config = llm_config_from_env()?;

    let mut history = vec![Message::system("You are a patient Rust tutor. Answer briefly.")];
    let questions = [
        "Can you tell me what a lifetime annotation is and when I actually need to write one?",
        "And how does that interact with structs that hold references to other data?",
    ];

    for question in questions {
        let request = PromptRequest::new(question, llm_config.clone())
            .messages(history.clone())
            .message_content(MessageContent::computed(|compressed| {
                format!("Question (compressed): {}", compressed.compressed)
            }));
        let response = sdk.process_prompt(request).await?;

        println!("> {question}\n{}\n", response.content);
        history.push(Message::user(question));
        history.push(Message::assistant(response.content));
    }
    Ok(())
}
