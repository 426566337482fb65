//! Status checks: project a task's state into a [`BoshOperation`]
//!
//! The poller calls a status check once per tick. Two sources are
//! supported: the director's task API and the broker's last-operation
//! endpoint.

use crate::collaborators::{BrokerServices, CollaboratorError, TaskReporter};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use sweep_core::{
    BoshOperation, BoshOperationType, BoshTask, BoshTaskState, OperationData, ServiceInstance,
};

/// Why a status check could not produce a [`BoshOperation`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StatusError {
    #[error("error retrieving tasks from bosh, for deployment '{deployment}': {source}")]
    Director {
        deployment: String,
        source: CollaboratorError,
    },

    #[error("error getting last operation: {0}")]
    LastOperation(CollaboratorError),

    #[error("unknown state from last operation: {0}")]
    UnknownState(String),

    #[error("no BOSH task ID recorded for deployment '{0}'")]
    MissingTask(String),

    #[error("status request timed out after {0:?}")]
    RequestTimeout(Duration),
}

/// One status query for a triggered operation
#[async_trait]
pub trait StatusChecker: Send + Sync {
    async fn check(
        &self,
        instance: &ServiceInstance,
        data: &OperationData,
    ) -> Result<BoshOperation, StatusError>;
}

/// Reads task state straight from the director
///
/// Operations tagged with a context ID are looked up by deployment and
/// context; errand runs are looked up by task ID.
pub struct DirectorStatusChecker {
    tasks: Arc<dyn TaskReporter>,
}

impl DirectorStatusChecker {
    pub fn new(tasks: Arc<dyn TaskReporter>) -> Self {
        Self { tasks }
    }

    async fn find_task(
        &self,
        deployment: &str,
        data: &OperationData,
    ) -> Result<Option<BoshTask>, CollaboratorError> {
        match (&data.errand, &data.bosh_context_id, data.bosh_task_id) {
            (None, Some(context_id), task_id) => {
                let tasks = self
                    .tasks
                    .get_normalised_tasks_by_context(deployment, context_id)
                    .await?;
                // newest first; a triggered task that is not listed yet is still pending
                Ok(match task_id {
                    Some(id) => tasks.into_iter().find(|t| t.id == id),
                    None => tasks.into_iter().next(),
                })
            }
            (_, _, Some(task_id)) => self.tasks.get_task(task_id).await.map(Some),
            _ => Ok(None),
        }
    }
}

#[async_trait]
impl StatusChecker for DirectorStatusChecker {
    async fn check(
        &self,
        instance: &ServiceInstance,
        data: &OperationData,
    ) -> Result<BoshOperation, StatusError> {
        let deployment = instance.deployment_name();

        let task = self
            .find_task(&deployment, data)
            .await
            .map_err(|source| StatusError::Director {
                deployment: deployment.clone(),
                source,
            })?;

        match task {
            Some(task) => Ok(task_operation(&task, instance, data)),
            None if data.bosh_context_id.is_some() && data.errand.is_none() => {
                let description = match data.bosh_task_id {
                    Some(id) => format!(
                        "BOSH task ID {} not listed yet for deployment '{}'",
                        id, deployment
                    ),
                    None => format!("no tasks found yet for deployment '{}'", deployment),
                };
                Ok(BoshOperation::new(data.clone(), BoshOperationType::Accepted, description))
            }
            None => Err(StatusError::MissingTask(deployment)),
        }
    }
}

/// Project a director task onto the broker-level operation states
pub fn task_operation(
    task: &BoshTask,
    instance: &ServiceInstance,
    data: &OperationData,
) -> BoshOperation {
    let kind = match task.state {
        BoshTaskState::Done => BoshOperationType::Succeeded,
        state if state.is_failure() => BoshOperationType::Failed,
        _ => BoshOperationType::Accepted,
    };

    let description = match kind {
        BoshOperationType::Failed => format!(
            "BOSH task ID {} status: {} {} deployment for instance {}: Description: {}",
            task.id, task.state, data.operation_type, instance.guid, task.description
        ),
        _ => format!("BOSH task ID {} status: {}", task.id, task.state),
    };

    let mut data = data.clone();
    data.bosh_task_id = Some(task.id);
    BoshOperation::new(data, kind, description)
}

/// Asks the broker for the instance's last operation
pub struct LastOperationChecker {
    broker: Arc<dyn BrokerServices>,
}

impl LastOperationChecker {
    pub fn new(broker: Arc<dyn BrokerServices>) -> Self {
        Self { broker }
    }
}

#[async_trait]
impl StatusChecker for LastOperationChecker {
    async fn check(
        &self,
        instance: &ServiceInstance,
        data: &OperationData,
    ) -> Result<BoshOperation, StatusError> {
        let last_operation = self
            .broker
            .last_operation(instance, data)
            .await
            .map_err(StatusError::LastOperation)?;

        let kind = match last_operation.state.as_str() {
            "failed" => BoshOperationType::Failed,
            "succeeded" => BoshOperationType::Succeeded,
            "in progress" => BoshOperationType::Accepted,
            other => return Err(StatusError::UnknownState(other.to_string())),
        };

        Ok(BoshOperation::new(data.clone(), kind, last_operation.description))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::LastOperation;
    use parking_lot::Mutex;
    use sweep_core::OperationType;

    struct StubTasks {
        by_context: Vec<BoshTask>,
        by_id: Option<BoshTask>,
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl TaskReporter for StubTasks {
        async fn get_task(&self, task_id: u64) -> Result<BoshTask, CollaboratorError> {
            self.calls.lock().push(format!("get_task {}", task_id));
            self.by_id
                .clone()
                .ok_or_else(|| CollaboratorError::Request("failed to get BOSH tasks".to_string()))
        }

        async fn get_normalised_tasks_by_context(
            &self,
            deployment: &str,
            context_id: &str,
        ) -> Result<Vec<BoshTask>, CollaboratorError> {
            self.calls
                .lock()
                .push(format!("by_context {} {}", deployment, context_id));
            Ok(self.by_context.clone())
        }
    }

    struct StubBroker(String);

    #[async_trait]
    impl BrokerServices for StubBroker {
        async fn last_operation(
            &self,
            _instance: &ServiceInstance,
            _data: &OperationData,
        ) -> Result<LastOperation, CollaboratorError> {
            Ok(LastOperation {
                state: self.0.clone(),
                description: "from broker".to_string(),
            })
        }
    }

    fn instance() -> ServiceInstance {
        ServiceInstance::new("service-1", "plan")
    }

    fn stub(by_context: Vec<BoshTask>, by_id: Option<BoshTask>) -> Arc<StubTasks> {
        Arc::new(StubTasks {
            by_context,
            by_id,
            calls: Mutex::new(Vec::new()),
        })
    }

    #[tokio::test]
    async fn test_context_lookup_picks_triggered_task() {
        let tasks = stub(
            vec![
                BoshTask::new(50, BoshTaskState::Processing),
                BoshTask::new(42, BoshTaskState::Done),
            ],
            None,
        );
        let checker = DirectorStatusChecker::new(tasks.clone());
        let data = OperationData::new(OperationType::Recreate)
            .with_task(42)
            .with_context("ctx");

        let operation = checker.check(&instance(), &data).await.unwrap();

        assert_eq!(operation.kind, BoshOperationType::Succeeded);
        assert_eq!(
            tasks.calls.lock().as_slice(),
            ["by_context service-instance_service-1 ctx"]
        );
    }

    #[tokio::test]
    async fn test_context_lookup_without_tasks_is_in_progress() {
        let checker = DirectorStatusChecker::new(stub(vec![], None));
        let data = OperationData::new(OperationType::Recreate).with_context("ctx");

        let operation = checker.check(&instance(), &data).await.unwrap();
        assert_eq!(operation.kind, BoshOperationType::Accepted);
    }

    #[tokio::test]
    async fn test_context_lookup_ignores_other_tasks() {
        let tasks = stub(vec![BoshTask::new(50, BoshTaskState::Error)], None);
        let checker = DirectorStatusChecker::new(tasks);
        let data = OperationData::new(OperationType::Recreate)
            .with_task(42)
            .with_context("ctx");

        let operation = checker.check(&instance(), &data).await.unwrap();
        assert_eq!(operation.kind, BoshOperationType::Accepted);
        assert_eq!(
            operation.description,
            "BOSH task ID 42 not listed yet for deployment 'service-instance_service-1'"
        );
    }

    #[tokio::test]
    async fn test_errand_failure_description() {
        let task = BoshTask::new(43, BoshTaskState::Error).with_description("broken");
        let checker = DirectorStatusChecker::new(stub(vec![], Some(task)));
        let data = OperationData::new(OperationType::Recreate)
            .with_task(43)
            .with_context("ctx")
            .with_errand("health-check");

        let operation = checker.check(&instance(), &data).await.unwrap();

        assert_eq!(operation.kind, BoshOperationType::Failed);
        assert_eq!(
            operation.description,
            "BOSH task ID 43 status: error recreate deployment for instance service-1: Description: broken"
        );
    }

    #[tokio::test]
    async fn test_director_error_names_deployment() {
        let checker = DirectorStatusChecker::new(stub(vec![], None));
        let data = OperationData::new(OperationType::Recreate)
            .with_task(43)
            .with_errand("health-check");

        let err = checker.check(&instance(), &data).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "error retrieving tasks from bosh, for deployment 'service-instance_service-1': failed to get BOSH tasks"
        );
    }

    #[tokio::test]
    async fn test_missing_task_id_is_an_error() {
        let checker = DirectorStatusChecker::new(stub(vec![], None));
        let data = OperationData::new(OperationType::Recreate).with_errand("health-check");

        let err = checker.check(&instance(), &data).await.unwrap_err();
        assert!(matches!(err, StatusError::MissingTask(_)));
    }

    #[tokio::test]
    async fn test_last_operation_mapping() {
        let data = OperationData::new(OperationType::Upgrade);
        for (state, expected) in [
            ("failed", BoshOperationType::Failed),
            ("succeeded", BoshOperationType::Succeeded),
            ("in progress", BoshOperationType::Accepted),
        ] {
            let checker = LastOperationChecker::new(Arc::new(StubBroker(state.to_string())));
            let operation = checker.check(&instance(), &data).await.unwrap();
            assert_eq!(operation.kind, expected, "state {}", state);
            assert_eq!(operation.description, "from broker");
            assert_eq!(operation.data, data);
        }
    }

    #[tokio::test]
    async fn test_last_operation_unknown_state() {
        let checker = LastOperationChecker::new(Arc::new(StubBroker("orphaned".to_string())));
        let err = checker
            .check(&instance(), &OperationData::new(OperationType::Upgrade))
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "unknown state from last operation: orphaned");
    }
}
