use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use lesstokens_core::{ErrorKind, LessTokensError, RetryPolicy};
use lesstokens_llm::ProviderKind;
use secrecy::{ExposeSecret, SecretString};
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://lesstokens.hive-hub.ai";
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

pub const ENV_API_KEY: &str = "LESSTOKENS_API_KEY";
pub const ENV_PROVIDER: &str = "LESSTOKENS_PROVIDER";
pub const ENV_BASE_URL: &str = "LESSTOKENS_BASE_URL";
pub const ENV_TIMEOUT_MS: &str = "LESSTOKENS_TIMEOUT_MS";

/// SDK-wide settings, fixed once the SDK is built.
#[derive(Clone)]
pub struct LessTokensConfig {
    pub api_key: SecretString,
    pub provider: String,
    pub base_url: String,
    pub timeout_ms: u64,
    pub retry_policy: RetryPolicy,
}

impl fmt::Debug for LessTokensConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LessTokensConfig")
            .field("api_key", &"<redacted>")
            .field("provider", &self.provider)
            .field("base_url", &self.base_url)
            .field("timeout_ms", &self.timeout_ms)
            .field("retry_policy", &self.retry_policy)
            .finish()
    }
}

impl LessTokensConfig {
    pub fn new(api_key: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::new(api_key.into()),
            provider: provider.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            retry_policy: RetryPolicy::default(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    /// Reads `LESSTOKENS_API_KEY`, `LESSTOKENS_PROVIDER` and the optional
    /// `LESSTOKENS_BASE_URL` / `LESSTOKENS_TIMEOUT_MS`.
    pub fn from_env() -> Result<Self, LessTokensError> {
        let api_key = std::env::var(ENV_API_KEY).map_err(|_| {
            LessTokensError::new(ErrorKind::InvalidApiKey, format!("{ENV_API_KEY} is not set"))
        })?;
        let provider = std::env::var(ENV_PROVIDER)
            .map_err(|_| LessTokensError::invalid_provider(format!("{ENV_PROVIDER} is not set")))?;

        let mut config = Self::new(api_key, provider);
        if let Ok(base_url) = std::env::var(ENV_BASE_URL) {
            config = config.with_base_url(base_url);
        }
        if let Ok(raw) = std::env::var(ENV_TIMEOUT_MS) {
            let timeout_ms = raw.trim().parse::<u64>().map_err(|err| {
                LessTokensError::validation(format!("{ENV_TIMEOUT_MS} must be a positive integer: {err}"))
            })?;
            config = config.with_timeout_ms(timeout_ms);
        }
        Ok(config)
    }

    pub fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Checks everything except the provider name.
    pub(crate) fn validate_transport(&self) -> Result<(), LessTokensError> {
        if self.api_key().trim().is_empty() {
            return Err(LessTokensError::new(
                ErrorKind::InvalidApiKey,
                "API key is required and must be a non-empty string",
            ));
        }
        if self.timeout_ms == 0 {
            return Err(LessTokensError::validation("Timeout must be greater than 0"));
        }
        Url::parse(&self.base_url).map_err(|err| {
            LessTokensError::validation(format!("Invalid base URL '{}': {err}", self.base_url))
        })?;
        Ok(())
    }

    /// Full check, resolving the provider name to a built-in backend.
    pub fn validate(&self) -> Result<ProviderKind, LessTokensError> {
        self.validate_transport()?;
        if self.provider.trim().is_empty() {
            return Err(LessTokensError::invalid_provider(
                "Provider is required and must be a non-empty string",
            ));
        }
        ProviderKind::from_str(&self.provider)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_hosted_service() {
        let config = LessTokensConfig::new("lt-key", "openai");
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert_eq!(config.retry_policy, RetryPolicy::default());
        assert_eq!(config.validate().expect("valid"), ProviderKind::OpenAi);
    }

    #[test]
    fn debug_output_redacts_api_key() {
        let rendered = format!("{:?}", LessTokensConfig::new("lt-secret", "openai"));
        assert!(!rendered.contains("lt-secret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn each_rule_reports_its_own_kind() {
        let blank_key = LessTokensConfig::new("  ", "openai").validate().unwrap_err();
        assert_eq!(blank_key.kind(), ErrorKind::InvalidApiKey);

        let blank_provider = LessTokensConfig::new("lt-key", "").validate().unwrap_err();
        assert_eq!(blank_provider.kind(), ErrorKind::InvalidProvider);

        let unknown = LessTokensConfig::new("lt-key", "unknown").validate().unwrap_err();
        assert_eq!(unknown.kind(), ErrorKind::InvalidProvider);

        let zero_timeout = LessTokensConfig::new("lt-key", "openai")
            .with_timeout_ms(0)
            .validate()
            .unwrap_err();
        assert_eq!(zero_timeout.kind(), ErrorKind::ValidationError);

        let bad_url = LessTokensConfig::new("lt-key", "openai")
            .with_base_url("not a url")
            .validate()
            .unwrap_err();
        assert_eq!(bad_url.kind(), ErrorKind::ValidationError);
    }
}
