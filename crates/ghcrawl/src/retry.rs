//! Bounded exponential backoff for network operations.
//!
//! Wraps every GraphQL request: transient failures (5xx, connection resets,
//! rate-limit rejections) are retried with exponential backoff, fatal ones
//! surface immediately. Rate-limit recovery is cooperative with the token
//! pool: the failing attempt marks its token exhausted, so the retried
//! operation leases a different token instead of waiting out the reset.

use std::future::Future;
use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};

use crate::github::GitHubError;

/// Initial backoff delay in milliseconds.
pub const INITIAL_BACKOFF_MS: u64 = 1_000;

/// Maximum backoff delay in milliseconds.
pub const MAX_BACKOFF_MS: u64 = 60_000;

/// Default maximum retry attempts, matching the crawler's `max_retries`.
pub const DEFAULT_MAX_RETRIES: usize = 3;

/// Configuration for retry operations.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Minimum delay between retries.
    pub min_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
    /// Maximum number of retry attempts.
    pub max_retries: usize,
    /// Whether to add jitter to delays.
    pub with_jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            min_delay: Duration::from_millis(INITIAL_BACKOFF_MS),
            max_delay: Duration::from_millis(MAX_BACKOFF_MS),
            max_retries: DEFAULT_MAX_RETRIES,
            with_jitter: true,
        }
    }
}

impl RetryConfig {
    /// Create a retry configuration with the given attempt bound.
    #[must_use]
    pub fn with_max_retries(max_retries: usize) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    /// Set whether to use jitter.
    #[must_use]
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.with_jitter = jitter;
        self
    }

    /// Build an exponential backoff strategy from this configuration.
    #[must_use]
    pub fn into_backoff(self) -> ExponentialBuilder {
        let mut builder = ExponentialBuilder::default()
            .with_min_delay(self.min_delay)
            .with_max_delay(self.max_delay)
            .with_max_times(self.max_retries);

        if self.with_jitter {
            builder = builder.with_jitter();
        }

        builder
    }
}

/// Execute one network operation with retry on transient failures.
///
/// The classification lives on [`GitHubError::is_retryable`]; exhausting the
/// attempt budget returns the final error, which the coordinator treats as
/// fatal for that unit of work only.
pub async fn execute<T, F, Fut>(config: &RetryConfig, operation: F) -> Result<T, GitHubError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, GitHubError>>,
{
    operation
        .retry(config.clone().into_backoff())
        .when(GitHubError::is_retryable)
        .notify(|err, dur| {
            tracing::debug!(
                delay_ms = dur.as_millis() as u64,
                error = %err,
                "transient failure, backing off before retry"
            );
        })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use reqwest::StatusCode;

    #[test]
    fn retry_config_default() {
        let config = RetryConfig::default();

        assert_eq!(config.min_delay, Duration::from_millis(INITIAL_BACKOFF_MS));
        assert_eq!(config.max_delay, Duration::from_millis(MAX_BACKOFF_MS));
        assert_eq!(config.max_retries, DEFAULT_MAX_RETRIES);
        assert!(config.with_jitter);
    }

    #[test]
    fn retry_config_custom_bound() {
        let config = RetryConfig::with_max_retries(7).with_jitter(false);
        assert_eq!(config.max_retries, 7);
        assert!(!config.with_jitter);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failures_are_retried_until_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls_capture = Arc::clone(&calls);

        let operation = move || {
            let calls_capture = Arc::clone(&calls_capture);
            async move {
                let n = calls_capture.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(GitHubError::Status {
                        status: StatusCode::BAD_GATEWAY,
                        body: "upstream hiccup".into(),
                    })
                } else {
                    Ok(42u32)
                }
            }
        };

        let advancer = tokio::spawn(async {
            for _ in 0..30 {
                tokio::time::advance(Duration::from_secs(60)).await;
                tokio::task::yield_now().await;
            }
        });

        let result = execute(&RetryConfig::default(), operation).await;
        advancer.await.expect("advancer task");

        assert_eq!(result.expect("should succeed on third attempt"), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn fatal_errors_are_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls_capture = Arc::clone(&calls);

        let operation = move || {
            let calls_capture = Arc::clone(&calls_capture);
            async move {
                calls_capture.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(GitHubError::Query("unknown field `bogus`".into()))
            }
        };

        let err = execute(&RetryConfig::default(), operation)
            .await
            .expect_err("fatal error should surface");

        assert!(matches!(err, GitHubError::Query(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_retries_surface_the_final_error() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls_capture = Arc::clone(&calls);

        let operation = move || {
            let calls_capture = Arc::clone(&calls_capture);
            async move {
                calls_capture.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(GitHubError::Status {
                    status: StatusCode::SERVICE_UNAVAILABLE,
                    body: String::new(),
                })
            }
        };

        let advancer = tokio::spawn(async {
            for _ in 0..30 {
                tokio::time::advance(Duration::from_secs(60)).await;
                tokio::task::yield_now().await;
            }
        });

        let config = RetryConfig::with_max_retries(3).with_jitter(false);
        let err = execute(&config, operation)
            .await
            .expect_err("retries should exhaust");
        advancer.await.expect("advancer task");

        assert!(err.is_retryable(), "final error keeps its classification");
        // Initial attempt plus three retries.
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }
}
