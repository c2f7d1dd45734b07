//! HTTP client for the LessTokens compression service.

use std::time::Duration;

use lesstokens_core::{
    retry, CompressedPrompt, CompressionOptions, ErrorKind, LessTokensError, RetryPolicy,
};
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::LessTokensConfig;

const COMPRESS_PATH: &str = "/api/compress";

#[derive(Serialize)]
struct CompressRequest<'a> {
    prompt: &'a str,
    #[serde(flatten)]
    options: &'a CompressionOptions,
}

/// Counts the service may send as `null`; absent or null both read as zero.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CompressPayload {
    #[serde(default)]
    compressed: Option<String>,
    #[serde(default)]
    original_tokens: Option<u32>,
    #[serde(default)]
    compressed_tokens: Option<u32>,
}

#[derive(Clone)]
pub struct CompressionClient {
    api_key: SecretString,
    base_url: String,
    timeout: Duration,
    retry_policy: RetryPolicy,
    http: Client,
}

impl CompressionClient {
    pub fn new(
        api_key: SecretString,
        base_url: impl Into<String>,
        timeout: Duration,
        retry_policy: RetryPolicy,
    ) -> Result<Self, LessTokensError> {
        let http = Client::builder().timeout(timeout).build().map_err(|err| {
            LessTokensError::new(
                ErrorKind::NetworkError,
                format!("Failed to build HTTP client: {err}"),
            )
            .with_source(err)
        })?;

        Ok(Self {
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
            retry_policy,
            http,
        })
    }

    pub fn from_config(config: &LessTokensConfig) -> Result<Self, LessTokensError> {
        Self::new(
            config.api_key.clone(),
            config.base_url.clone(),
            config.timeout(),
            config.retry_policy.clone(),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    /// Compresses `prompt`, retrying transient failures per the retry policy.
    pub async fn compress(
        &self,
        prompt: &str,
        options: Option<&CompressionOptions>,
    ) -> Result<CompressedPrompt, LessTokensError> {
        let defaults = CompressionOptions::default();
        let body = CompressRequest {
            prompt,
            options: options.unwrap_or(&defaults),
        };

        let compressed = retry(&self.retry_policy, || self.compress_once(&body)).await?;
        tracing::debug!(
            original_tokens = compressed.original_tokens,
            compressed_tokens = compressed.compressed_tokens,
            savings = compressed.savings,
            "prompt compressed"
        );
        Ok(compressed)
    }

    async fn compress_once(
        &self,
        body: &CompressRequest<'_>,
    ) -> Result<CompressedPrompt, LessTokensError> {
        let url = format!("{}{COMPRESS_PATH}", self.base_url);
        tracing::debug!(url = %url, "sending compression request");

        let response = self
            .http
            .post(&url)
            .header("X-API-Key", self.api_key.expose_secret())
            .json(body)
            .send()
            .await
            .map_err(|err| self.transport_error(err))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|err| self.transport_error(err))?;

        if !status.is_success() {
            return Err(status_error(status, &text));
        }

        let payload = parse_payload(&text)
            .map_err(|err| invalid_response(err).with_status(status.as_u16()))?;

        Ok(CompressedPrompt::from_counts(
            payload
                .compressed
                .filter(|compressed| !compressed.is_empty())
                .unwrap_or_else(|| body.prompt.to_string()),
            payload.original_tokens.unwrap_or(0),
            payload.compressed_tokens.unwrap_or(0),
        ))
    }

    fn transport_error(&self, err: reqwest::Error) -> LessTokensError {
        if err.is_timeout() {
            return LessTokensError::new(
                ErrorKind::Timeout,
                format!("Request timeout after {}ms", self.timeout.as_millis()),
            )
            .with_source(err);
        }
        LessTokensError::new(ErrorKind::NetworkError, format!("Network error: {err}"))
            .with_source(err)
    }
}

/// The service answers either `{"data": {...}}` or the payload itself.
fn parse_payload(text: &str) -> Result<CompressPayload, serde_json::Error> {
    let value: Value = serde_json::from_str(text)?;
    let data = value.get("data").filter(|data| data.is_object()).cloned();
    serde_json::from_value(data.unwrap_or(value))
}

fn invalid_response(err: serde_json::Error) -> LessTokensError {
    LessTokensError::new(
        ErrorKind::CompressionFailed,
        format!("Invalid response from compression service: {err}"),
    )
    .with_source(err)
}

fn status_error(status: StatusCode, body: &str) -> LessTokensError {
    let details = serde_json::from_str::<Value>(body).ok();
    let server_message = details.as_ref().and_then(|value| {
        value
            .get("message")
            .or_else(|| value.get("error"))
            .and_then(Value::as_str)
            .map(str::to_string)
    });

    let (kind, message) = match status.as_u16() {
        401 | 403 => (ErrorKind::InvalidApiKey, "Invalid API key".to_string()),
        429 => (ErrorKind::RateLimit, "Rate limit exceeded".to_string()),
        code if code >= 500 => (
            ErrorKind::NetworkError,
            format!("Compression service unavailable (HTTP {code})"),
        ),
        code => (
            ErrorKind::CompressionFailed,
            server_message.unwrap_or_else(|| format!("Compression failed with HTTP {code}")),
        ),
    };

    let error = LessTokensError::new(kind, message).with_status(status.as_u16());
    match details {
        Some(details) => error.with_details(details),
        None if !body.trim().is_empty() => error.with_details(Value::String(body.to_string())),
        None => error,
    }
}
