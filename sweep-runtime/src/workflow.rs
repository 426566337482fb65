//! Per-instance workflow
//!
//! Drives one service instance through trigger, poll and the optional
//! post-deploy errand:
//!
//! ```text
//! Pending → Triggering → Polling ─┬─────────────────────────────────→ Succeeded
//!                                 └→ ErrandTriggering → ErrandPolling → Succeeded
//! (any non-terminal state) ───────────────────────────────────────────→ Failed
//! ```
//!
//! Trigger calls are retried per the [`RetryPolicy`]. A task that reaches a
//! failed terminal state is never retried: the director already ran the
//! operation to completion.

use crate::collaborators::{CollaboratorError, TaskTrigger};
use crate::metrics::{INSTANCE_DURATION, INSTANCE_OUTCOMES_TOTAL, TRIGGER_ATTEMPTS_TOTAL};
use crate::poller::{PollOutcome, TaskPoller};
use crate::reporter::Reporter;
use crate::retry::{RetryExhausted, RetryPolicy};
use crate::state_machine::{StateMachine, WorkflowState};
use crate::status::{StatusChecker, StatusError};
use crate::trigger::OperationTrigger;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use sweep_core::{InstanceResult, OperationData, OperationType, ServiceInstance};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// Why an instance's workflow failed
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("Operation type: {operation} failed for service instance {guid}: {source}")]
    Trigger {
        operation: OperationType,
        guid: String,
        source: CollaboratorError,
    },

    #[error("error retrieving tasks from bosh, for deployment '{deployment}': {source}")]
    ErrandTrigger {
        deployment: String,
        source: CollaboratorError,
    },

    #[error(transparent)]
    Status(#[from] StatusError),

    #[error("{0}")]
    TaskFailed(String),

    #[error("BOSH task ID {task_id} for service instance {guid} did not finish within {timeout:?}")]
    TimedOut {
        task_id: u64,
        guid: String,
        timeout: Duration,
    },

    #[error("processing of service instance {guid} was cancelled")]
    Cancelled { guid: String },

    #[error(transparent)]
    State(#[from] crate::Error),
}

/// Runs the bulk operation against one instance at a time
///
/// Holds only shared, stateless collaborators; each call to [`run`] owns
/// its own state machine, so one workflow value serves every instance.
///
/// [`run`]: InstanceWorkflow::run
pub struct InstanceWorkflow {
    trigger: OperationTrigger,
    director: Arc<dyn TaskTrigger>,
    status: Arc<dyn StatusChecker>,
    poller: TaskPoller,
    retry: RetryPolicy,
    reporter: Reporter,
    cancel: CancellationToken,
}

impl InstanceWorkflow {
    pub fn new(
        trigger: OperationTrigger,
        director: Arc<dyn TaskTrigger>,
        status: Arc<dyn StatusChecker>,
        poller: TaskPoller,
        retry: RetryPolicy,
        reporter: Reporter,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            trigger,
            director,
            status,
            poller,
            retry,
            reporter,
            cancel,
        }
    }

    pub fn operation(&self) -> OperationType {
        self.trigger.operation_type()
    }

    /// Process one instance to a terminal outcome
    #[instrument(
        skip(self, instance, post_deploy_errand),
        fields(instance = %instance.guid, operation = %self.operation())
    )]
    pub async fn run(
        &self,
        instance: ServiceInstance,
        post_deploy_errand: Option<String>,
    ) -> InstanceResult {
        let operation = self.operation();
        let timer = INSTANCE_DURATION
            .with_label_values(&[operation.as_str()])
            .start_timer();

        let mut state = StateMachine::new();
        let outcome = self
            .drive(&mut state, &instance, post_deploy_errand.as_deref())
            .await;
        timer.observe_duration();

        match outcome {
            Ok(()) => {
                INSTANCE_OUTCOMES_TOTAL
                    .with_label_values(&[operation.as_str(), "succeeded"])
                    .inc();
                info!("Service instance processed successfully");
                self.reporter.instance_succeeded(&instance.guid, operation);
                InstanceResult::succeeded(instance.guid)
            }
            Err(e) => {
                let failed_in = state.current_state();
                if let Err(transition) = state.transition(WorkflowState::Failed) {
                    warn!(error = %transition, "Could not record failed state");
                }
                INSTANCE_OUTCOMES_TOTAL
                    .with_label_values(&[operation.as_str(), "failed"])
                    .inc();
                error!(
                    instance = %instance.guid,
                    operation = %operation,
                    state = ?failed_in,
                    error = %e,
                    "Service instance operation failed"
                );
                self.reporter.instance_failed(&instance.guid, &e);
                InstanceResult::failed(instance.guid, e.to_string())
            }
        }
    }

    async fn drive(
        &self,
        state: &mut StateMachine,
        instance: &ServiceInstance,
        post_deploy_errand: Option<&str>,
    ) -> Result<(), WorkflowError> {
        state.transition(WorkflowState::Triggering)?;
        let data = self
            .retry
            .run(&self.cancel, |attempt| {
                self.attempt(attempt, self.trigger.trigger(self.director.as_ref(), instance))
            })
            .await
            .map_err(|e| self.trigger_failure(instance, e))?;

        state.transition(WorkflowState::Polling)?;
        self.await_task(instance, &data).await?;

        let errand = post_deploy_errand.filter(|_| self.trigger.runs_post_deploy_errand());
        if let Some(errand) = errand {
            state.transition(WorkflowState::ErrandTriggering)?;
            let data = self
                .retry
                .run(&self.cancel, |attempt| {
                    self.attempt(
                        attempt,
                        self.trigger.trigger_post_deploy_errand(
                            self.director.as_ref(),
                            instance,
                            errand,
                        ),
                    )
                })
                .await
                .map_err(|e| self.errand_trigger_failure(instance, e))?;

            state.transition(WorkflowState::ErrandPolling)?;
            self.await_task(instance, &data).await?;
        }

        state.transition(WorkflowState::Succeeded)?;
        Ok(())
    }

    async fn attempt<T>(
        &self,
        attempt: u32,
        trigger: impl Future<Output = Result<T, CollaboratorError>>,
    ) -> Result<T, CollaboratorError> {
        let result = trigger.await;
        let status = if result.is_ok() { "success" } else { "failure" };
        TRIGGER_ATTEMPTS_TOTAL
            .with_label_values(&[self.operation().as_str(), status])
            .inc();
        debug!(attempt, status, "Trigger attempt finished");
        result
    }

    async fn await_task(
        &self,
        instance: &ServiceInstance,
        data: &OperationData,
    ) -> Result<(), WorkflowError> {
        debug!(
            task_id = ?data.bosh_task_id,
            errand = ?data.errand,
            "Waiting for task"
        );

        let outcome = self
            .poller
            .poll(|| self.status.check(instance, data), &self.cancel)
            .await?;

        match outcome {
            PollOutcome::Succeeded => Ok(()),
            PollOutcome::Failed(description) => Err(WorkflowError::TaskFailed(description)),
            PollOutcome::TimedOut(timeout) => Err(WorkflowError::TimedOut {
                task_id: data.bosh_task_id.unwrap_or_default(),
                guid: instance.guid.clone(),
                timeout,
            }),
            PollOutcome::Cancelled => Err(WorkflowError::Cancelled {
                guid: instance.guid.clone(),
            }),
        }
    }

    fn trigger_failure(
        &self,
        instance: &ServiceInstance,
        exhausted: RetryExhausted<CollaboratorError>,
    ) -> WorkflowError {
        if exhausted.cancelled {
            return WorkflowError::Cancelled {
                guid: instance.guid.clone(),
            };
        }
        WorkflowError::Trigger {
            operation: self.operation(),
            guid: instance.guid.clone(),
            source: exhausted.last_error,
        }
    }

    fn errand_trigger_failure(
        &self,
        instance: &ServiceInstance,
        exhausted: RetryExhausted<CollaboratorError>,
    ) -> WorkflowError {
        if exhausted.cancelled {
            return WorkflowError::Cancelled {
                guid: instance.guid.clone(),
            };
        }
        WorkflowError::ErrandTrigger {
            deployment: instance.deployment_name(),
            source: exhausted.last_error,
        }
    }
}
