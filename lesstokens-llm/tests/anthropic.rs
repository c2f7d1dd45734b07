use futures::StreamExt;
use httpmock::prelude::*;
use lesstokens_core::ErrorKind;
use lesstokens_llm::{AnthropicProvider, LlmConfig, LlmProvider, Message, ProviderOptions};
use serde_json::json;

fn provider() -> AnthropicProvider {
    AnthropicProvider::new(ProviderOptions::default()).expect("provider")
}

#[tokio::test]
async fn anthropic_chat_promotes_system_turns_and_defaults_max_tokens() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/messages")
            .header("x-api-key", "ak-test")
            .header("anthropic-version", "2023-06-01")
            .json_body(json!({
                "model": "claude-3-5-sonnet-latest",
                "max_tokens": 1024,
                "system": "You are concise.\n\nAnswer in English.",
                "messages": [
                    {"role": "user", "content": "hi"},
                    {"role": "assistant", "content": "hello"},
                    {"role": "user", "content": "summarize"}
                ]
            }));
        then.status(200).json_body(json!({
            "id": "msg_1",
            "model": "claude-3-5-sonnet-20241022",
            "content": [{"type": "text", "text": "done"}],
            "usage": {"input_tokens": 12, "output_tokens": 3}
        }));
    });

    let config = LlmConfig::new("ak-test", "claude-3-5-sonnet-latest").with_base_url(server.base_url());
    let messages = vec![
        Message::system("You are concise."),
        Message::system("Answer in English."),
        Message::user("hi"),
        Message::assistant("hello"),
        Message::user("summarize"),
    ];
    let response = provider().chat(messages, &config).await.expect("chat");

    assert_eq!(response.content, "done");
    assert_eq!(response.usage.prompt_tokens, 12);
    assert_eq!(response.usage.completion_tokens, 3);
    assert_eq!(response.usage.total_tokens, 15);
    assert_eq!(
        response.metadata.and_then(|m| m.provider).as_deref(),
        Some("anthropic")
    );
    mock.assert();
}

#[tokio::test]
async fn anthropic_chat_maps_sampling_options() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST).path("/messages").json_body(json!({
            "model": "claude-3-haiku",
            "max_tokens": 200,
            "messages": [{"role": "user", "content": "hi"}],
            "temperature": 0.5,
            "top_k": 40,
            "stop_sequences": ["END"],
            "metadata": {"user_id": "u-1"}
        }));
        then.status(200).json_body(json!({
            "content": [{"type": "text", "text": "ok"}],
            "usage": {"input_tokens": 1, "output_tokens": 1}
        }));
    });

    let config = LlmConfig::new("ak-test", "claude-3-haiku")
        .with_base_url(server.base_url())
        .with_option("maxTokens", 200)
        .with_option("temperature", 0.5)
        .with_option("topK", 40)
        .with_option("stop", "END")
        .with_option("metadata", json!({"user_id": "u-1"}));
    provider()
        .chat(vec![Message::user("hi")], &config)
        .await
        .expect("chat");
    mock.assert();
}

#[tokio::test]
async fn anthropic_chat_surfaces_api_error_message() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/messages");
        then.status(400).json_body(json!({
            "type": "error",
            "error": {"type": "invalid_request_error", "message": "max_tokens: too large"}
        }));
    });

    let config = LlmConfig::new("ak-test", "claude-3-haiku").with_base_url(server.base_url());
    let err = provider()
        .chat(vec![Message::user("hi")], &config)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::LlmApiError);
    assert_eq!(err.status(), Some(400));
    assert_eq!(err.message(), "Anthropic API error: max_tokens: too large");
}

#[tokio::test]
async fn anthropic_stream_emits_text_deltas_and_final_usage() {
    let server = MockServer::start();
    let body = concat!(
        "event: message_start\n",
        "data: {\"type\":\"message_start\",\"message\":{\"id\":\"msg_1\",\"usage\":{\"input_tokens\":9,\"output_tokens\":1}}}\n\n",
        "event: content_block_start\n",
        "data: {\"type\":\"content_block_start\",\"index\":0,\"content_block\":{\"type\":\"text\",\"text\":\"\"}}\n\n",
        "event: ping\n",
        "data: {\"type\":\"ping\"}\n\n",
        "event: content_block_delta\n",
        "data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"Hi\"}}\n\n",
        "event: content_block_delta\n",
        "data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\" there\"}}\n\n",
        "event: content_block_stop\n",
        "data: {\"type\":\"content_block_stop\",\"index\":0}\n\n",
        "event: message_delta\n",
        "data: {\"type\":\"message_delta\",\"delta\":{\"stop_reason\":\"end_turn\"},\"usage\":{\"output_tokens\":4}}\n\n",
        "event: message_stop\n",
        "data: {\"type\":\"message_stop\"}\n\n"
    );
    let mock = server.mock(|when, then| {
        when.method(POST).path("/messages").json_body(json!({
            "model": "claude-3-haiku",
            "max_tokens": 1024,
            "messages": [{"role": "user", "content": "hi"}],
            "stream": true
        }));
        then.status(200)
            .header("content-type", "text/event-stream")
            .body(body);
    });

    let config = LlmConfig::new("ak-test", "claude-3-haiku").with_base_url(server.base_url());
    let chunks: Vec<_> = provider()
        .chat_stream(vec![Message::user("hi")], &config)
        .map(|chunk| chunk.expect("chunk"))
        .collect()
        .await;

    let text: String = chunks.iter().map(|chunk| chunk.content.as_str()).collect();
    assert_eq!(text, "Hi there");
    assert_eq!(chunks.len(), 3);
    let last = chunks.last().expect("terminal chunk");
    assert!(last.done);
    let usage = last.usage.clone().expect("usage");
    assert_eq!((usage.prompt_tokens, usage.completion_tokens, usage.total_tokens), (9, 4, 13));
    mock.assert();
}

#[tokio::test]
async fn anthropic_stream_error_event_becomes_llm_api_error() {
    let server = MockServer::start();
    let body = concat!(
        "data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"par\"}}\n\n",
        "data: {\"type\":\"error\",\"error\":{\"type\":\"overloaded_error\",\"message\":\"Overloaded\"}}\n\n"
    );
    server.mock(|when, then| {
        when.method(POST).path("/messages");
        then.status(200)
            .header("content-type", "text/event-stream")
            .body(body);
    });

    let config = LlmConfig::new("ak-test", "claude-3-haiku").with_base_url(server.base_url());
    let items: Vec<_> = provider()
        .chat_stream(vec![Message::user("hi")], &config)
        .collect()
        .await;

    assert_eq!(items.len(), 2);
    assert_eq!(items[0].as_ref().expect("delta").content, "par");
    let err = items[1].as_ref().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::LlmApiError);
    assert_eq!(err.message(), "Anthropic API error: Overloaded");
}
