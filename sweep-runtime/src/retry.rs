//! Retry logic for failed trigger attempts

use std::future::Future;
use std::time::Duration;
use sweep_core::IteratorConfig;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Retry policy configuration
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts, first attempt included
    pub max_attempts: u32,

    /// Fixed delay between attempts
    pub interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            interval: Duration::from_secs(60),
        }
    }
}

/// Every attempt failed, or the run was cancelled between attempts
#[derive(Debug, Clone, PartialEq)]
pub struct RetryExhausted<E> {
    pub attempts: u32,
    pub last_error: E,
    pub cancelled: bool,
}

impl RetryPolicy {
    pub fn from_config(config: &IteratorConfig) -> Self {
        Self {
            max_attempts: config.attempt_limit,
            interval: config.attempt_interval(),
        }
    }

    /// Check if should retry after given attempt number
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    /// Run `operation` until it succeeds or the attempt budget is spent
    ///
    /// Sleeps `interval` between attempts. Cancellation is only observed
    /// while sleeping, so an attempt that has started always completes.
    pub async fn run<T, E, F, Fut>(
        &self,
        cancel: &CancellationToken,
        mut operation: F,
    ) -> Result<T, RetryExhausted<E>>
    where
        E: std::fmt::Display,
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let error = match operation(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) => e,
            };

            if !self.should_retry(attempt) {
                return Err(RetryExhausted {
                    attempts: attempt,
                    last_error: error,
                    cancelled: false,
                });
            }

            warn!(
                attempt,
                max_attempts = self.max_attempts,
                retry_in_secs = self.interval.as_secs(),
                error = %error,
                "Attempt failed, retrying"
            );

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Err(RetryExhausted {
                        attempts: attempt,
                        last_error: error,
                        cancelled: true,
                    });
                }
                _ = tokio::time::sleep(self.interval) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    fn policy(max_attempts: u32, secs: u64) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            interval: Duration::from_secs(secs),
        }
    }

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
    }

    #[test]
    fn test_should_retry() {
        let policy = RetryPolicy::default();
        assert!(policy.should_retry(0));
        assert!(policy.should_retry(2));
        assert!(!policy.should_retry(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_after_transient_failures() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result = policy(5, 10)
            .run(&CancellationToken::new(), |_| async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err("busy")
                } else {
                    Ok(7)
                }
            })
            .await;

        assert_eq!(result, Ok(7));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausts_attempts_with_fixed_spacing() {
        let started = Instant::now();
        let mut seen = Vec::new();

        let result: Result<(), _> = policy(3, 10)
            .run(&CancellationToken::new(), |attempt| {
                seen.push((attempt, started.elapsed()));
                async { Err("deployment busy") }
            })
            .await;

        let exhausted = result.unwrap_err();
        assert_eq!(exhausted.attempts, 3);
        assert_eq!(exhausted.last_error, "deployment busy");
        assert!(!exhausted.cancelled);

        assert_eq!(seen.len(), 3);
        for pair in seen.windows(2) {
            assert!(pair[1].1 - pair[0].1 >= Duration::from_secs(10));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_attempt_does_not_sleep() {
        let started = Instant::now();
        let result: Result<(), _> = policy(1, 60)
            .run(&CancellationToken::new(), |_| async { Err("nope") })
            .await;

        assert_eq!(result.unwrap_err().attempts, 1);
        assert!(started.elapsed() < Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_stops_backoff() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result: Result<(), _> = policy(5, 60).run(&cancel, |_| async { Err("nope") }).await;

        let exhausted = result.unwrap_err();
        assert!(exhausted.cancelled);
        assert_eq!(exhausted.attempts, 1);
    }
}
