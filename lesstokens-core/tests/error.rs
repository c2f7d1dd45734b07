use std::error::Error;

use lesstokens_core::{ErrorKind, LessTokensError};
use serde_json::json;

#[test]
fn error_display_uses_kind_code_and_message() {
    let err = LessTokensError::validation("Prompt is required");
    assert_eq!(format!("{err}"), "VALIDATION_ERROR: Prompt is required");
}

#[test]
fn error_kind_codes_are_stable() {
    let cases = [
        (ErrorKind::InvalidApiKey, "INVALID_API_KEY"),
        (ErrorKind::InvalidProvider, "INVALID_PROVIDER"),
        (ErrorKind::CompressionFailed, "COMPRESSION_FAILED"),
        (ErrorKind::LlmApiError, "LLM_API_ERROR"),
        (ErrorKind::Timeout, "TIMEOUT"),
        (ErrorKind::NetworkError, "NETWORK_ERROR"),
        (ErrorKind::ValidationError, "VALIDATION_ERROR"),
        (ErrorKind::RateLimit, "RATE_LIMIT"),
    ];
    for (kind, code) in cases {
        assert_eq!(kind.code(), code);
        assert_eq!(serde_json::to_value(kind).unwrap(), json!(code));
    }
}

#[test]
fn error_carries_status_and_details() {
    let err = LessTokensError::new(ErrorKind::CompressionFailed, "prompt rejected")
        .with_status(422)
        .with_details(json!({ "message": "prompt rejected" }));

    assert!(err.is(ErrorKind::CompressionFailed));
    assert_eq!(err.status(), Some(422));
    assert_eq!(err.details(), Some(&json!({ "message": "prompt rejected" })));
}

#[test]
fn error_exposes_source() {
    let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
    let err = LessTokensError::new(ErrorKind::NetworkError, "Network error: refused").with_source(io);

    let source = err.source().expect("source should be kept");
    assert_eq!(source.to_string(), "refused");
}
