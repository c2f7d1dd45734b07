use std::future::Future;
use std::time::Duration;

use lesstokens_core::{ErrorKind, LessTokensError};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde_json::Value;

use crate::ProviderKind;

/// Sends `request` and turns non-2xx answers into `LlmApiError`.
pub(crate) async fn send(
    provider: ProviderKind,
    request: RequestBuilder,
) -> Result<Response, LessTokensError> {
    let response = request
        .send()
        .await
        .map_err(|err| transport_error(provider, err))?;

    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(api_error(provider, status, &body))
}

/// Awaits `future`, failing with `Timeout` once `limit` elapses.
///
/// The future is dropped on expiry, which closes any connection it holds.
pub(crate) async fn within<T, F>(
    provider: ProviderKind,
    limit: Option<Duration>,
    future: F,
) -> Result<T, LessTokensError>
where
    F: Future<Output = Result<T, LessTokensError>>,
{
    match limit {
        Some(limit) => tokio::time::timeout(limit, future)
            .await
            .map_err(|_| timeout_error(provider, limit))?,
        None => future.await,
    }
}

pub(crate) fn timeout_error(provider: ProviderKind, limit: Duration) -> LessTokensError {
    LessTokensError::new(
        ErrorKind::Timeout,
        format!(
            "{} request timed out after {}ms",
            provider.display_name(),
            limit.as_millis()
        ),
    )
}

pub(crate) fn transport_error(provider: ProviderKind, err: reqwest::Error) -> LessTokensError {
    let name = provider.display_name();
    let (kind, message) = if err.is_timeout() {
        (ErrorKind::Timeout, format!("{name} request timed out: {err}"))
    } else if err.is_connect() || err.is_request() {
        (ErrorKind::NetworkError, format!("Network error: {err}"))
    } else {
        (ErrorKind::LlmApiError, format!("{name} API error: {err}"))
    };
    LessTokensError::new(kind, message).with_source(err)
}

pub(crate) fn api_error(provider: ProviderKind, status: StatusCode, body: &str) -> LessTokensError {
    let details = serde_json::from_str::<Value>(body).ok();
    let message = details
        .as_ref()
        .and_then(error_message)
        .unwrap_or_else(|| format!("HTTP {}: {}", status.as_u16(), body));

    LessTokensError::llm_api(format!("{} API error: {message}", provider.display_name()))
        .with_status(status.as_u16())
        .with_details(details.unwrap_or_else(|| Value::String(body.to_string())))
}

pub(crate) fn decode_error(provider: ProviderKind, payload: &str, err: serde_json::Error) -> LessTokensError {
    LessTokensError::llm_api(format!(
        "{} API error: unexpected payload: {err}",
        provider.display_name()
    ))
    .with_details(Value::String(payload.to_string()))
    .with_source(err)
}

/// `error.message` as used by OpenAI, Anthropic and Google, or a top-level `message`.
fn error_message(body: &Value) -> Option<String> {
    body.pointer("/error/message")
        .or_else(|| body.get("message"))
        .and_then(Value::as_str)
        .map(str::to_string)
}
