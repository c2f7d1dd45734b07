//! Line-buffered server-sent-events decoding shared by the streaming adapters.

use std::time::Duration;

use bytes::BytesMut;
use futures::stream::{BoxStream, StreamExt};
use lesstokens_core::{ErrorKind, LessTokensError};
use reqwest::Response;

use crate::error::timeout_error;
use crate::ProviderKind;

/// Payload of a `data:` line, if the line is one.
pub fn parse_sse_line(line: &str) -> Option<&str> {
    line.trim()
        .strip_prefix("data:")
        .map(str::trim_start)
        .filter(|data| !data.is_empty())
}

/// Yields the `data:` payloads of `response` in arrival order.
///
/// The response body is owned by the returned stream; dropping the stream
/// closes the connection. With `idle` set, a gap between body reads longer
/// than `idle` ends the stream with a `Timeout` error.
pub(crate) fn data_lines(
    provider: ProviderKind,
    response: Response,
    idle: Option<Duration>,
) -> BoxStream<'static, Result<String, LessTokensError>> {
    async_stream::try_stream! {
        let mut body = Box::pin(response.bytes_stream());
        let mut buffer = BytesMut::new();

        loop {
            let next = match idle {
                Some(limit) => tokio::time::timeout(limit, body.next())
                    .await
                    .map_err(|_| timeout_error(provider, limit))?,
                None => body.next().await,
            };
            let Some(chunk) = next else {
                break;
            };
            let bytes = chunk.map_err(|err| read_error(provider, err))?;
            buffer.extend_from_slice(&bytes);

            while let Some(pos) = buffer.iter().position(|&b| b == b'\n') {
                let line = buffer.split_to(pos + 1);
                let line = String::from_utf8_lossy(&line);
                if let Some(data) = parse_sse_line(&line) {
                    yield data.to_string();
                }
            }
        }

        let tail = String::from_utf8_lossy(&buffer);
        if let Some(data) = parse_sse_line(&tail) {
            yield data.to_string();
        }
    }
    .boxed()
}

fn read_error(provider: ProviderKind, err: reqwest::Error) -> LessTokensError {
    let kind = if err.is_timeout() {
        ErrorKind::Timeout
    } else {
        ErrorKind::LlmApiError
    };
    LessTokensError::new(
        kind,
        format!("{} API error: stream interrupted: {err}", provider.display_name()),
    )
    .with_source(err)
}
