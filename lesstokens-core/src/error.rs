use std::{error::Error as StdError, fmt};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

type BoxError = Box<dyn StdError + Send + Sync>;

/// Closed set of failure classifications shared by every stage of the pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    InvalidApiKey,
    InvalidProvider,
    CompressionFailed,
    LlmApiError,
    Timeout,
    NetworkError,
    ValidationError,
    RateLimit,
}

impl ErrorKind {
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::InvalidApiKey => "INVALID_API_KEY",
            ErrorKind::InvalidProvider => "INVALID_PROVIDER",
            ErrorKind::CompressionFailed => "COMPRESSION_FAILED",
            ErrorKind::LlmApiError => "LLM_API_ERROR",
            ErrorKind::Timeout => "TIMEOUT",
            ErrorKind::NetworkError => "NETWORK_ERROR",
            ErrorKind::ValidationError => "VALIDATION_ERROR",
            ErrorKind::RateLimit => "RATE_LIMIT",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct LessTokensError {
    kind: ErrorKind,
    message: String,
    status: Option<u16>,
    details: Option<Value>,
    #[source]
    source: Option<BoxError>,
}

impl LessTokensError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
            details: None,
            source: None,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ValidationError, message)
    }

    pub fn invalid_provider(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidProvider, message)
    }

    pub fn llm_api(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::LlmApiError, message)
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn with_source(mut self, source: impl Into<BoxError>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn status(&self) -> Option<u16> {
        self.status
    }

    pub fn details(&self) -> Option<&Value> {
        self.details.as_ref()
    }

    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind == kind
    }
}
