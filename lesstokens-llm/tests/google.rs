use futures::StreamExt;
use httpmock::prelude::*;
use lesstokens_core::ErrorKind;
use lesstokens_llm::{GoogleProvider, LlmConfig, LlmProvider, Message, ProviderOptions};
use serde_json::json;

fn provider() -> GoogleProvider {
    GoogleProvider::new(ProviderOptions::default()).expect("provider")
}

fn config(server: &MockServer) -> LlmConfig {
    LlmConfig::new("test-key", "gemini-1.5-flash").with_base_url(server.base_url())
}

#[tokio::test]
async fn google_chat_maps_text_and_usage_metadata() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/v1beta/models/gemini-1.5-flash:generateContent")
            .query_param("key", "test-key")
            .json_body(json!({
                "contents": [
                    {"role": "user", "parts": [{"text": "hi"}]}
                ]
            }));
        then.status(200).json_body(json!({
            "candidates": [
                {
                    "content": {"role": "model", "parts": [{"text": "hel"}, {"text": "lo"}]},
                    "finishReason": "STOP"
                }
            ],
            "usageMetadata": {"promptTokenCount": 4, "candidatesTokenCount": 2, "totalTokenCount": 6}
        }));
    });

    let response = provider()
        .chat(vec![Message::user("hi")], &config(&server))
        .await
        .expect("chat");

    assert_eq!(response.content, "hello");
    assert_eq!(response.usage.prompt_tokens, 4);
    assert_eq!(response.usage.completion_tokens, 2);
    assert_eq!(response.usage.total_tokens, 6);
    assert_eq!(
        response.metadata.and_then(|m| m.provider).as_deref(),
        Some("google")
    );
    mock.assert();
}

#[tokio::test]
async fn google_chat_builds_system_instruction_roles_and_generation_config() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/v1beta/models/gemini-1.5-pro:generateContent")
            .query_param("key", "test-key")
            .json_body(json!({
                "systemInstruction": {
                    "parts": [{"text": "You are concise."}]
                },
                "contents": [
                    {"role": "user", "parts": [{"text": "hi"}]},
                    {"role": "model", "parts": [{"text": "hello"}]},
                    {"role": "user", "parts": [{"text": "summarize"}]}
                ],
                "generationConfig": {
                    "temperature": 0.3,
                    "maxOutputTokens": 256,
                    "topP": 0.8,
                    "topK": 20,
                    "stopSequences": ["END"],
                    "candidateCount": 1
                }
            }));
        then.status(200).json_body(json!({
            "candidates": [{"content": {"parts": [{"text": "ok"}]}, "finishReason": "STOP"}]
        }));
    });

    let config = LlmConfig::new("test-key", "models/gemini-1.5-pro")
        .with_base_url(server.base_url())
        .with_option("temperature", 0.3)
        .with_option("max_tokens", 256)
        .with_option("topP", 0.8)
        .with_option("top_k", 20)
        .with_option("stop", json!(["END"]))
        .with_option("candidateCount", 1);
    let messages = vec![
        Message::system("You are concise."),
        Message::user("hi"),
        Message::assistant("hello"),
        Message::user("summarize"),
    ];
    let response = provider().chat(messages, &config).await.expect("chat");

    assert_eq!(response.content, "ok");
    mock.assert();
}

#[tokio::test]
async fn google_chat_rejects_blocked_candidate_without_text() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST)
            .path("/v1beta/models/gemini-1.5-flash:generateContent");
        then.status(200).json_body(json!({
            "candidates": [{"content": {"parts": []}, "finishReason": "SAFETY"}]
        }));
    });

    let err = provider()
        .chat(vec![Message::user("forbidden")], &config(&server))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::LlmApiError);
    assert!(err.message().contains("SAFETY"));
}

#[tokio::test]
async fn google_chat_keeps_partial_text_when_blocked() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST)
            .path("/v1beta/models/gemini-1.5-flash:generateContent");
        then.status(200).json_body(json!({
            "candidates": [{"content": {"parts": [{"text": "partial"}]}, "finishReason": "SAFETY"}]
        }));
    });

    let response = provider()
        .chat(vec![Message::user("forbidden")], &config(&server))
        .await
        .expect("chat");
    assert_eq!(response.content, "partial");
}

#[tokio::test]
async fn google_chat_without_candidates_is_an_error() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST)
            .path("/v1beta/models/gemini-1.5-flash:generateContent");
        then.status(200).json_body(json!({"promptFeedback": {"blockReason": "OTHER"}}));
    });

    let err = provider()
        .chat(vec![Message::user("hi")], &config(&server))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::LlmApiError);
    assert!(err.message().contains("No candidates"));
}

#[tokio::test]
async fn google_chat_surfaces_quota_error() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST)
            .path("/v1beta/models/gemini-1.5-flash:generateContent");
        then.status(429).json_body(json!({
            "error": {"code": 429, "message": "quota exceeded", "status": "RESOURCE_EXHAUSTED"}
        }));
    });

    let err = provider()
        .chat(vec![Message::user("hi")], &config(&server))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::LlmApiError);
    assert_eq!(err.status(), Some(429));
    assert_eq!(err.message(), "Google API error: quota exceeded");
}

#[tokio::test]
async fn google_stream_emits_text_chunks_and_last_usage() {
    let server = MockServer::start();
    let body = concat!(
        "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"Hel\"}]}}],\"usageMetadata\":{\"promptTokenCount\":3,\"candidatesTokenCount\":1,\"totalTokenCount\":4}}\n\n",
        "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"lo\"}]},\"finishReason\":\"STOP\"}],\"usageMetadata\":{\"promptTokenCount\":3,\"candidatesTokenCount\":2,\"totalTokenCount\":5}}\n\n"
    );
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/v1beta/models/gemini-1.5-flash:streamGenerateContent")
            .query_param("alt", "sse")
            .query_param("key", "test-key")
            .json_body(json!({
                "contents": [
                    {"role": "user", "parts": [{"text": "hi"}]}
                ]
            }));
        then.status(200)
            .header("content-type", "text/event-stream")
            .body(body);
    });

    let chunks: Vec<_> = provider()
        .chat_stream(vec![Message::user("hi")], &config(&server))
        .map(|chunk| chunk.expect("chunk"))
        .collect()
        .await;

    assert_eq!(chunks.len(), 3);
    assert_eq!(chunks[0].content, "Hel");
    assert_eq!(chunks[1].content, "lo");
    assert!(chunks[2].done);
    let usage = chunks[2].usage.clone().expect("usage");
    assert_eq!((usage.prompt_tokens, usage.completion_tokens, usage.total_tokens), (3, 2, 5));
    mock.assert();
}

#[tokio::test]
async fn google_stream_stops_at_done_marker() {
    let server = MockServer::start();
    let body = concat!(
        "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"only\"}]}}]}\n\n",
        "data: [DONE]\n\n",
        "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"ignored\"}]}}]}\n\n"
    );
    server.mock(|when, then| {
        when.method(POST)
            .path("/v1beta/models/gemini-1.5-flash:streamGenerateContent");
        then.status(200)
            .header("content-type", "text/event-stream")
            .body(body);
    });

    let chunks: Vec<_> = provider()
        .chat_stream(vec![Message::user("hi")], &config(&server))
        .map(|chunk| chunk.expect("chunk"))
        .collect()
        .await;

    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0].content, "only");
    assert!(chunks[1].done);
    assert!(chunks[1].usage.is_none());
}

#[tokio::test]
async fn google_chat_maps_stop_sequence_aliases_to_a_list() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/v1beta/models/gemini-1.5-flash:generateContent")
            .json_body(json!({
                "contents": [
                    {"role": "user", "parts": [{"text": "hi"}]}
                ],
                "generationConfig": {"stopSequences": ["STOP"]}
            }));
        then.status(200).json_body(json!({
            "candidates": [{"content": {"parts": [{"text": "ok"}]}, "finishReason": "STOP"}]
        }));
    });

    for key in ["stop", "stop_sequences", "stopSequences"] {
        let config = config(&server).with_option(key, "STOP");
        let response = provider()
            .chat(vec![Message::user("hi")], &config)
            .await
            .expect("chat");
        assert_eq!(response.content, "ok");
    }
    mock.assert_hits(3);
}
