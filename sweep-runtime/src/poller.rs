//! Status polling for triggered tasks

use crate::status::StatusError;
use std::future::Future;
use std::time::Duration;
use sweep_core::{BoshOperation, BoshOperationType, IteratorConfig};
use tokio::time::{sleep, timeout, Instant};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// How a poll ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Succeeded,

    /// Task reached a failed terminal state; carries the task's description
    Failed(String),

    /// Deadline passed while the task was still running
    TimedOut(Duration),

    /// Run was cancelled while waiting for the next check
    Cancelled,
}

/// Polls a status check until it reports a terminal state
///
/// Stateless apart from its timings, so one poller is shared by every
/// workflow of a run.
#[derive(Debug, Clone)]
pub struct TaskPoller {
    polling_interval: Duration,
    request_timeout: Duration,
    deadline: Duration,
}

impl TaskPoller {
    pub fn new(polling_interval: Duration, request_timeout: Duration, deadline: Duration) -> Self {
        Self {
            polling_interval,
            request_timeout,
            deadline,
        }
    }

    pub fn from_config(config: &IteratorConfig) -> Self {
        Self::new(
            config.polling_interval(),
            config.request_timeout(),
            config.operation_timeout(),
        )
    }

    /// Poll until terminal, the deadline passes, or `cancel` fires
    ///
    /// The first check always runs. A failing check ends the poll
    /// immediately with its error; retrying is the caller's call.
    pub async fn poll<F, Fut>(
        &self,
        mut check: F,
        cancel: &CancellationToken,
    ) -> Result<PollOutcome, StatusError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<BoshOperation, StatusError>>,
    {
        let started = Instant::now();
        let mut checks = 0u32;

        loop {
            checks += 1;
            let operation = match timeout(self.request_timeout, check()).await {
                Ok(result) => result?,
                Err(_) => return Err(StatusError::RequestTimeout(self.request_timeout)),
            };

            debug!(
                checks,
                state = ?operation.kind,
                description = %operation.description,
                "Polled task status"
            );

            match operation.kind {
                BoshOperationType::Succeeded => return Ok(PollOutcome::Succeeded),
                BoshOperationType::Failed => return Ok(PollOutcome::Failed(operation.description)),
                BoshOperationType::Accepted => {}
            }

            let elapsed = started.elapsed();
            if elapsed >= self.deadline {
                return Ok(PollOutcome::TimedOut(self.deadline));
            }

            let wait = self.polling_interval.min(self.deadline - elapsed);
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(PollOutcome::Cancelled),
                _ = sleep(wait) => {}
            }
        }
    }
}
