//! Interfaces to the systems the engine drives
//!
//! The engine never talks HTTP itself. It consumes three collaborators
//! through these traits:
//!
//! - the platform inventory, which lists the instances of an offering
//! - the director, split into a trigger facet and a status facet
//! - the broker, whose last-operation endpoint can stand in for the
//!   director's status facet
//!
//! HTTP implementations live in `sweep-director`; in-memory fakes live in
//! `sweep-tests`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use sweep_core::{BoshTask, OperationData, ServiceInstance};

/// Errors returned by any collaborator
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CollaboratorError {
    #[error("unexpected status code: {status}. description: {description}")]
    UnexpectedStatus { status: u16, description: String },

    #[error("{0}")]
    Request(String),

    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),
}

/// Lists the service instances of an offering
#[async_trait]
pub trait InstanceLister: Send + Sync {
    /// Snapshot of every instance of `offering` at call time
    async fn list_instances(
        &self,
        offering: &str,
    ) -> Result<Vec<ServiceInstance>, CollaboratorError>;
}

/// Starts asynchronous work on the director
///
/// Every method issues a single request and returns the ID of the task the
/// director queued for it. `context_id` is attached to the request so the
/// resulting tasks can be looked up later by deployment and context.
#[async_trait]
pub trait TaskTrigger: Send + Sync {
    /// Recreate every VM of a deployment
    async fn recreate(&self, deployment: &str, context_id: &str)
        -> Result<u64, CollaboratorError>;

    /// Redeploy a deployment from its current manifest
    async fn upgrade(&self, deployment: &str, context_id: &str) -> Result<u64, CollaboratorError>;

    /// Run a named errand on a deployment
    async fn run_errand(
        &self,
        deployment: &str,
        errand: &str,
        context_id: &str,
    ) -> Result<u64, CollaboratorError>;
}

/// Reads task state from the director
#[async_trait]
pub trait TaskReporter: Send + Sync {
    async fn get_task(&self, task_id: u64) -> Result<BoshTask, CollaboratorError>;

    /// Tasks of a deployment tagged with `context_id`, newest first
    async fn get_normalised_tasks_by_context(
        &self,
        deployment: &str,
        context_id: &str,
    ) -> Result<Vec<BoshTask>, CollaboratorError>;
}

/// State of an operation as the broker reports it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastOperation {
    /// One of `in progress`, `succeeded` or `failed`
    pub state: String,

    #[serde(default)]
    pub description: String,
}

/// The broker's view of in-flight operations
#[async_trait]
pub trait BrokerServices: Send + Sync {
    async fn last_operation(
        &self,
        instance: &ServiceInstance,
        data: &OperationData,
    ) -> Result<LastOperation, CollaboratorError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unexpected_status_message() {
        let err = CollaboratorError::UnexpectedStatus {
            status: 500,
            description: "bosh recreate failed".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "unexpected status code: 500. description: bosh recreate failed"
        );
    }

    #[test]
    fn test_request_error_is_verbatim() {
        let err = CollaboratorError::Request("failed to get BOSH tasks".to_string());
        assert_eq!(err.to_string(), "failed to get BOSH tasks");
    }
}
