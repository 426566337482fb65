//! Concurrency control for instance workflows

use crate::{Error, Result};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Counting admission gate for in-flight workflows
///
/// Permits are owned so they can move into the spawned workflow task; a
/// slot is released when the permit is dropped, whichever way the task ends.
pub struct ConcurrencyLimiter {
    semaphore: Arc<Semaphore>,
    max_in_flight: usize,
}

impl ConcurrencyLimiter {
    /// Create a new concurrency limiter
    pub fn new(max_in_flight: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_in_flight)),
            max_in_flight,
        }
    }

    /// Wait for a free slot
    #[tracing::instrument(
        name = "concurrency.acquire",
        skip(self),
        fields(
            max_in_flight = %self.max_in_flight,
            available_before = tracing::field::Empty,
            wait_duration_ms = tracing::field::Empty,
        )
    )]
    pub async fn acquire(&self) -> Result<OwnedSemaphorePermit> {
        let span = tracing::Span::current();
        span.record("available_before", self.semaphore.available_permits());

        let start = Instant::now();
        let permit = Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .map_err(|e| Error::Internal(format!("concurrency limiter closed: {}", e)))?;

        span.record("wait_duration_ms", start.elapsed().as_millis() as u64);
        Ok(permit)
    }

    /// Get the maximum number of in-flight workflows
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight
    }

    /// Get the current available slots
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Number of slots currently held
    pub fn in_flight(&self) -> usize {
        self.max_in_flight - self.available()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_concurrency_limiter() {
        let limiter = ConcurrencyLimiter::new(2);
        assert_eq!(limiter.available(), 2);

        let _permit1 = limiter.acquire().await.unwrap();
        assert_eq!(limiter.available(), 1);

        let _permit2 = limiter.acquire().await.unwrap();
        assert_eq!(limiter.available(), 0);
        assert_eq!(limiter.in_flight(), 2);
    }

    #[tokio::test]
    async fn test_dropping_permit_releases_slot() {
        let limiter = ConcurrencyLimiter::new(1);

        let permit = limiter.acquire().await.unwrap();
        assert_eq!(limiter.in_flight(), 1);

        drop(permit);
        assert_eq!(limiter.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_acquire_blocks_when_full() {
        let limiter = ConcurrencyLimiter::new(1);
        let _held = limiter.acquire().await.unwrap();

        let blocked = tokio::time::timeout(Duration::from_millis(20), limiter.acquire()).await;
        assert!(blocked.is_err(), "second acquire should wait for a free slot");
    }

    #[tokio::test]
    async fn test_permit_released_when_task_panics() {
        let limiter = ConcurrencyLimiter::new(1);
        let permit = limiter.acquire().await.unwrap();

        let handle = tokio::spawn(async move {
            let _permit = permit;
            panic!("workflow blew up");
        });
        assert!(handle.await.is_err());

        assert_eq!(limiter.available(), 1);
    }
}
