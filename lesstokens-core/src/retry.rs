//! Exponential-backoff retry for idempotent async operations.

use std::collections::HashSet;
use std::future::Future;
use std::time::Duration;

use crate::{ErrorKind, LessTokensError};

#[derive(Clone, Debug, PartialEq)]
pub struct RetryPolicy {
    /// Additional attempts after the first one.
    pub max_retries: usize,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub retryable_kinds: HashSet<ErrorKind>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
            retryable_kinds: default_retryable_kinds(),
        }
    }
}

pub fn default_retryable_kinds() -> HashSet<ErrorKind> {
    HashSet::from([
        ErrorKind::Timeout,
        ErrorKind::NetworkError,
        ErrorKind::RateLimit,
    ])
}

impl RetryPolicy {
    pub fn new(max_retries: usize, initial_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_retries,
            initial_delay,
            max_delay,
            retryable_kinds: default_retryable_kinds(),
        }
    }

    /// A policy that runs the operation exactly once.
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    pub fn with_retryable_kinds(mut self, kinds: impl IntoIterator<Item = ErrorKind>) -> Self {
        self.retryable_kinds = kinds.into_iter().collect();
        self
    }

    pub fn is_retryable(&self, error: &LessTokensError) -> bool {
        self.retryable_kinds.contains(&error.kind())
    }

    /// Delay slept before `attempt` (1-based). The first attempt runs immediately.
    pub fn delay_before(&self, attempt: usize) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        let exponent = u32::try_from(attempt - 2).unwrap_or(u32::MAX);
        let factor = 2u32.checked_pow(exponent).unwrap_or(u32::MAX);
        self.initial_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    pub async fn run<F, Fut, T>(&self, operation: F) -> Result<T, LessTokensError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, LessTokensError>>,
    {
        retry(self, operation).await
    }
}

/// Runs `operation` up to `policy.max_retries + 1` times.
///
/// Errors whose kind is not in `policy.retryable_kinds` are returned at once.
/// When attempts run out the last error is returned as-is.
pub async fn retry<F, Fut, T>(policy: &RetryPolicy, mut operation: F) -> Result<T, LessTokensError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, LessTokensError>>,
{
    let max_attempts = policy.max_retries.saturating_add(1);
    let mut attempt = 1;

    loop {
        match operation().await {
            Ok(output) => return Ok(output),
            Err(error) => {
                if attempt >= max_attempts || !policy.is_retryable(&error) {
                    return Err(error);
                }

                attempt += 1;
                let delay = policy.delay_before(attempt);
                tracing::debug!(
                    kind = %error.kind(),
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    "retrying after retryable error: {}",
                    error.message()
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_matches_documented_values() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.initial_delay, Duration::from_secs(1));
        assert_eq!(policy.max_delay, Duration::from_secs(10));
        assert!(policy.retryable_kinds.contains(&ErrorKind::Timeout));
        assert!(policy.retryable_kinds.contains(&ErrorKind::NetworkError));
        assert!(policy.retryable_kinds.contains(&ErrorKind::RateLimit));
        assert!(!policy.retryable_kinds.contains(&ErrorKind::InvalidApiKey));
    }

    #[test]
    fn delay_doubles_from_the_second_attempt_and_caps() {
        let policy = RetryPolicy::new(10, Duration::from_millis(500), Duration::from_secs(5));

        assert_eq!(policy.delay_before(1), Duration::ZERO);
        assert_eq!(policy.delay_before(2), Duration::from_millis(500));
        assert_eq!(policy.delay_before(3), Duration::from_millis(1000));
        assert_eq!(policy.delay_before(4), Duration::from_millis(2000));
        assert_eq!(policy.delay_before(5), Duration::from_millis(4000));
        assert_eq!(policy.delay_before(6), Duration::from_secs(5));
        assert_eq!(policy.delay_before(200), Duration::from_secs(5));
    }
}
