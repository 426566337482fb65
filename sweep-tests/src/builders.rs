//! Type-safe builders for constructing test objects
//!
//! Builders provide a fluent API for constructing configs and tasks with
//! clear, readable code.

use crate::fixtures::plan;
use sweep_core::{
    ApiConfig, BoshTask, BoshTaskState, IteratorConfig, OperationKind, Plan, StatusSource,
};

/// Builder for [`IteratorConfig`] with fast test timings
///
/// Defaults: recreate, one attempt, one in flight, one-second intervals
/// and the two fixture plans.
pub struct IteratorConfigBuilder {
    config: IteratorConfig,
}

impl IteratorConfigBuilder {
    pub fn new() -> Self {
        let api = |url: &str| ApiConfig::new(url, "some-user", "some-password");
        Self {
            config: IteratorConfig {
                operation: OperationKind::Recreate,
                errand_name: None,
                service_offering: "service-name".to_string(),
                polling_interval: 1,
                attempt_interval: 1,
                attempt_limit: 1,
                request_timeout: 1,
                max_in_flight: 1,
                operation_timeout: None,
                status_source: StatusSource::Director,
                plans: vec![plan::with_errand(), plan::without_errand()],
                broker_api: api("http://localhost:8080"),
                service_instances_api: api("http://localhost:8080/mgmt/service_instances"),
                bosh: api("http://localhost:25555"),
            },
        }
    }

    pub fn operation(mut self, operation: OperationKind) -> Self {
        self.config.operation = operation;
        if operation != OperationKind::Errand {
            self.config.errand_name = None;
        }
        self
    }

    /// Run the named errand on every instance
    pub fn errand(mut self, name: &str) -> Self {
        self.config.operation = OperationKind::Errand;
        self.config.errand_name = Some(name.to_string());
        self
    }

    pub fn polling_interval(mut self, secs: u64) -> Self {
        self.config.polling_interval = secs;
        self
    }

    pub fn attempt_interval(mut self, secs: u64) -> Self {
        self.config.attempt_interval = secs;
        self
    }

    pub fn attempt_limit(mut self, limit: u32) -> Self {
        self.config.attempt_limit = limit;
        self
    }

    pub fn request_timeout(mut self, secs: u64) -> Self {
        self.config.request_timeout = secs;
        self
    }

    pub fn max_in_flight(mut self, max: usize) -> Self {
        self.config.max_in_flight = max;
        self
    }

    pub fn operation_timeout(mut self, secs: u64) -> Self {
        self.config.operation_timeout = Some(secs);
        self
    }

    pub fn status_source(mut self, source: StatusSource) -> Self {
        self.config.status_source = source;
        self
    }

    pub fn plans(mut self, plans: Vec<Plan>) -> Self {
        self.config.plans = plans;
        self
    }

    /// Point the director API at `url`
    pub fn bosh_url(mut self, url: &str) -> Self {
        self.config.bosh.url = url.to_string();
        self
    }

    /// Point the broker and service-instances APIs at a broker at `url`
    pub fn broker_url(mut self, url: &str) -> Self {
        self.config.broker_api.url = url.to_string();
        self.config.service_instances_api.url = format!("{}/mgmt/service_instances", url);
        self
    }

    /// Build and validate the config
    pub fn build(self) -> IteratorConfig {
        self.config.validate().expect("test config should be valid");
        self.config
    }

    /// Build without validation, for testing rejected configs
    pub fn build_unchecked(self) -> IteratorConfig {
        self.config
    }
}

impl Default for IteratorConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for director tasks
pub struct BoshTaskBuilder {
    task: BoshTask,
}

impl BoshTaskBuilder {
    pub fn new(id: u64) -> Self {
        Self {
            task: BoshTask::new(id, BoshTaskState::Queued),
        }
    }

    pub fn state(mut self, state: BoshTaskState) -> Self {
        self.task.state = state;
        self
    }

    pub fn description(mut self, description: &str) -> Self {
        self.task.description = description.to_string();
        self
    }

    pub fn context_id(mut self, context_id: &str) -> Self {
        self.task.context_id = Some(context_id.to_string());
        self
    }

    pub fn build(self) -> BoshTask {
        self.task
    }

    /// Finished task
    pub fn done(id: u64) -> BoshTask {
        Self::new(id).state(BoshTaskState::Done).build()
    }

    /// Task that ended in `error` with `description`
    pub fn failed(id: u64, description: &str) -> BoshTask {
        Self::new(id)
            .state(BoshTaskState::Error)
            .description(description)
            .build()
    }

    /// Task still running
    pub fn processing(id: u64) -> BoshTask {
        Self::new(id).state(BoshTaskState::Processing).build()
    }
}
