//! Operation triggers
//!
//! One variant is chosen per run from the configured operation kind. Each
//! trigger issues a single director request for one instance and returns
//! the [`OperationData`] the poller needs to follow the resulting task.

use crate::collaborators::{CollaboratorError, TaskTrigger};
use sweep_core::{IteratorConfig, OperationData, OperationKind, OperationType, ServiceInstance};
use uuid::Uuid;

/// The bulk operation applied to every instance of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationTrigger {
    Recreate,
    Upgrade,
    Errand { name: String },
}

impl OperationTrigger {
    pub fn from_config(config: &IteratorConfig) -> Self {
        match config.operation {
            OperationKind::Recreate => OperationTrigger::Recreate,
            OperationKind::Upgrade => OperationTrigger::Upgrade,
            OperationKind::Errand => OperationTrigger::Errand {
                name: config.errand_name.clone().unwrap_or_default(),
            },
        }
    }

    pub fn operation_type(&self) -> OperationType {
        match self {
            OperationTrigger::Recreate => OperationType::Recreate,
            OperationTrigger::Upgrade => OperationType::Upgrade,
            OperationTrigger::Errand { .. } => OperationType::Errand,
        }
    }

    /// Name the run reports under, e.g. `recreate-all`
    pub fn run_name(&self) -> &'static str {
        match self {
            OperationTrigger::Recreate => "recreate-all",
            OperationTrigger::Upgrade => "upgrade-all",
            OperationTrigger::Errand { .. } => "run-errand-all",
        }
    }

    /// Whether a plan's post-deploy errand should follow this operation
    pub fn runs_post_deploy_errand(&self) -> bool {
        !matches!(self, OperationTrigger::Errand { .. })
    }

    /// Start the operation on one instance
    pub async fn trigger(
        &self,
        director: &dyn TaskTrigger,
        instance: &ServiceInstance,
    ) -> Result<OperationData, CollaboratorError> {
        let deployment = instance.deployment_name();
        let context_id = Uuid::new_v4().to_string();

        let task_id = match self {
            OperationTrigger::Recreate => director.recreate(&deployment, &context_id).await?,
            OperationTrigger::Upgrade => director.upgrade(&deployment, &context_id).await?,
            OperationTrigger::Errand { name } => {
                director.run_errand(&deployment, name, &context_id).await?
            }
        };

        let data = OperationData::new(self.operation_type())
            .with_task(task_id)
            .with_context(context_id);

        Ok(match self {
            OperationTrigger::Errand { name } => data.with_errand(name.clone()),
            _ => data,
        })
    }

    /// Start a plan's post-deploy errand after this operation succeeded
    pub async fn trigger_post_deploy_errand(
        &self,
        director: &dyn TaskTrigger,
        instance: &ServiceInstance,
        errand: &str,
    ) -> Result<OperationData, CollaboratorError> {
        let deployment = instance.deployment_name();
        let context_id = Uuid::new_v4().to_string();

        let task_id = director.run_errand(&deployment, errand, &context_id).await?;

        Ok(OperationData::new(self.operation_type())
            .with_task(task_id)
            .with_context(context_id)
            .with_errand(errand))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingDirector {
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl TaskTrigger for RecordingDirector {
        async fn recreate(&self, deployment: &str, _context_id: &str) -> Result<u64, CollaboratorError> {
            self.calls.lock().push(format!("recreate {}", deployment));
            Ok(42)
        }

        async fn upgrade(&self, deployment: &str, _context_id: &str) -> Result<u64, CollaboratorError> {
            self.calls.lock().push(format!("upgrade {}", deployment));
            Ok(44)
        }

        async fn run_errand(
            &self,
            deployment: &str,
            errand: &str,
            _context_id: &str,
        ) -> Result<u64, CollaboratorError> {
            self.calls.lock().push(format!("run_errand {} {}", deployment, errand));
            Ok(43)
        }
    }

    fn instance() -> ServiceInstance {
        ServiceInstance::new("service-1", "plan")
    }

    #[tokio::test]
    async fn test_recreate_issues_one_request() {
        let director = RecordingDirector::default();
        let data = OperationTrigger::Recreate
            .trigger(&director, &instance())
            .await
            .unwrap();

        assert_eq!(data.operation_type, OperationType::Recreate);
        assert_eq!(data.bosh_task_id, Some(42));
        assert!(data.bosh_context_id.is_some());
        assert!(data.errand.is_none());
        assert_eq!(
            director.calls.lock().as_slice(),
            ["recreate service-instance_service-1"]
        );
    }

    #[tokio::test]
    async fn test_errand_variant_tracks_errand_name() {
        let director = RecordingDirector::default();
        let trigger = OperationTrigger::Errand {
            name: "smoke-tests".to_string(),
        };

        let data = trigger.trigger(&director, &instance()).await.unwrap();

        assert_eq!(data.errand.as_deref(), Some("smoke-tests"));
        assert!(!trigger.runs_post_deploy_errand());
        assert_eq!(trigger.run_name(), "run-errand-all");
    }

    #[tokio::test]
    async fn test_post_deploy_errand_keeps_parent_operation_type() {
        let director = RecordingDirector::default();
        let data = OperationTrigger::Upgrade
            .trigger_post_deploy_errand(&director, &instance(), "health-check")
            .await
            .unwrap();

        assert_eq!(data.operation_type, OperationType::Upgrade);
        assert_eq!(data.bosh_task_id, Some(43));
        assert_eq!(data.errand.as_deref(), Some("health-check"));
    }

    #[tokio::test]
    async fn test_context_ids_are_unique_per_trigger() {
        let director = RecordingDirector::default();
        let first = OperationTrigger::Recreate.trigger(&director, &instance()).await.unwrap();
        let second = OperationTrigger::Recreate.trigger(&director, &instance()).await.unwrap();

        assert_ne!(first.bosh_context_id, second.bosh_context_id);
    }
}
