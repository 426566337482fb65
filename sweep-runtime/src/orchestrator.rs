//! Bulk operation orchestrator
//!
//! Enumerates every service instance of an offering once, dispatches one
//! [`InstanceWorkflow`] per instance through the [`ConcurrencyLimiter`] in
//! enumeration order, joins them all and reports the run's verdict.
//!
//! # Example
//!
//! ```no_run
//! use sweep_core::IteratorConfig;
//! use sweep_runtime::{BulkOperationOrchestrator, Collaborators, Reporter};
//!
//! # async fn example(collaborators: Collaborators) -> Result<(), Box<dyn std::error::Error>> {
//! let config = IteratorConfig::load("recreate-all.yml")?;
//! let orchestrator = BulkOperationOrchestrator::new(
//!     &config,
//!     collaborators,
//!     Reporter::stdout("recreate-all"),
//! );
//!
//! let report = orchestrator.run().await?;
//! std::process::exit(report.exit_code());
//! # }
//! ```

use crate::collaborators::{InstanceLister, TaskTrigger};
use crate::concurrency::ConcurrencyLimiter;
use crate::poller::TaskPoller;
use crate::reporter::Reporter;
use crate::retry::RetryPolicy;
use crate::status::StatusChecker;
use crate::trigger::OperationTrigger;
use crate::workflow::InstanceWorkflow;
use crate::{Error, Result};
use std::sync::Arc;
use sweep_core::{InstanceResult, IteratorConfig, Plan, RunSummary, ServiceInstance};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

/// External systems a run talks to
#[derive(Clone)]
pub struct Collaborators {
    pub inventory: Arc<dyn InstanceLister>,
    pub director: Arc<dyn TaskTrigger>,
    pub status: Arc<dyn StatusChecker>,
}

/// Everything a finished run produced
#[derive(Debug, Clone)]
pub struct RunReport {
    /// One result per enumerated instance, in enumeration order
    pub results: Vec<InstanceResult>,
    pub summary: RunSummary,
    pub cancelled: bool,
}

impl RunReport {
    /// Process exit status for the run
    ///
    /// A cancellation that lands after every instance already succeeded
    /// does not fail the run; undispatched instances are failures already.
    pub fn exit_code(&self) -> i32 {
        if self.summary.is_success() {
            0
        } else {
            1
        }
    }

    pub fn failed_guids(&self) -> Vec<&str> {
        self.results
            .iter()
            .filter(|r| !r.is_success())
            .map(|r| r.guid.as_str())
            .collect()
    }
}

enum Dispatch {
    Spawned {
        guid: String,
        handle: JoinHandle<InstanceResult>,
    },
    Skipped(InstanceResult),
}

/// Drives one bulk operation across every instance of an offering
pub struct BulkOperationOrchestrator {
    offering: String,
    plans: Vec<Plan>,
    trigger: OperationTrigger,
    poller: TaskPoller,
    retry: RetryPolicy,
    collaborators: Collaborators,
    limiter: ConcurrencyLimiter,
    reporter: Reporter,
    cancel: CancellationToken,
}

impl BulkOperationOrchestrator {
    pub fn new(config: &IteratorConfig, collaborators: Collaborators, reporter: Reporter) -> Self {
        Self {
            offering: config.service_offering.clone(),
            plans: config.plans.clone(),
            trigger: OperationTrigger::from_config(config),
            poller: TaskPoller::from_config(config),
            retry: RetryPolicy::from_config(config),
            collaborators,
            limiter: ConcurrencyLimiter::new(config.max_in_flight),
            reporter,
            cancel: CancellationToken::new(),
        }
    }

    /// Stop the run when `cancel` fires
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn limiter(&self) -> &ConcurrencyLimiter {
        &self.limiter
    }

    /// Run the bulk operation to completion
    ///
    /// Only enumeration failure is returned as an error; per-instance
    /// failures land in the report.
    #[instrument(
        skip(self),
        fields(
            offering = %self.offering,
            operation = %self.trigger.operation_type(),
            max_in_flight = self.limiter.max_in_flight(),
        )
    )]
    pub async fn run(&self) -> Result<RunReport> {
        let instances = match self
            .collaborators
            .inventory
            .list_instances(&self.offering)
            .await
        {
            Ok(instances) => instances,
            Err(e) => {
                let err = Error::Enumeration(e);
                error!(error = %err, "Failed to enumerate service instances");
                self.reporter.line(&err);
                return Err(err);
            }
        };

        let total = instances.len();
        info!(total, "Enumerated service instances");

        let workflow = Arc::new(InstanceWorkflow::new(
            self.trigger.clone(),
            Arc::clone(&self.collaborators.director),
            Arc::clone(&self.collaborators.status),
            self.poller.clone(),
            self.retry.clone(),
            self.reporter.clone(),
            self.cancel.clone(),
        ));

        let mut dispatched = Vec::with_capacity(total);
        for (index, instance) in instances.into_iter().enumerate() {
            if self.cancel.is_cancelled() {
                dispatched.push(Dispatch::Skipped(self.skip(instance)));
                continue;
            }

            self.reporter.starting(index + 1, total);

            let permit = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    dispatched.push(Dispatch::Skipped(self.skip(instance)));
                    continue;
                }
                permit = self.limiter.acquire() => permit?,
            };

            let errand = self.post_deploy_errand(&instance);
            let guid = instance.guid.clone();
            let workflow = Arc::clone(&workflow);
            let handle = tokio::spawn(async move {
                let _permit = permit;
                workflow.run(instance, errand).await
            });
            dispatched.push(Dispatch::Spawned { guid, handle });
        }

        let mut results = Vec::with_capacity(total);
        for dispatch in dispatched {
            let result = match dispatch {
                Dispatch::Skipped(result) => result,
                Dispatch::Spawned { guid, handle } => match handle.await {
                    Ok(result) => result,
                    Err(e) => {
                        let message = format!("workflow for service instance {} aborted: {}", guid, e);
                        error!(instance = %guid, error = %e, "Workflow task aborted");
                        self.reporter.instance_failed(&guid, &message);
                        InstanceResult::failed(guid, message)
                    }
                },
            };
            results.push(result);
        }

        let report = RunReport {
            summary: RunSummary::from_results(&results),
            results,
            cancelled: self.cancel.is_cancelled(),
        };

        self.reporter.finished(&report.summary, &report.failed_guids());
        info!(
            succeeded = report.summary.succeeded,
            failed = report.summary.failed,
            cancelled = report.cancelled,
            "Bulk operation finished"
        );

        Ok(report)
    }

    fn post_deploy_errand(&self, instance: &ServiceInstance) -> Option<String> {
        match self.plans.iter().find(|p| p.id == instance.plan_unique_id) {
            Some(plan) => plan.post_deploy_errand.clone(),
            None => {
                warn!(
                    instance = %instance.guid,
                    plan = %instance.plan_unique_id,
                    "Plan not configured, skipping post-deploy errand"
                );
                None
            }
        }
    }

    fn skip(&self, instance: ServiceInstance) -> InstanceResult {
        let message = format!(
            "run cancelled before service instance {} was processed",
            instance.guid
        );
        warn!(instance = %instance.guid, "Run cancelled, instance not dispatched");
        self.reporter.instance_failed(&instance.guid, &message);
        InstanceResult::failed(instance.guid, message)
    }
}
