//! Test data factories for sweep types
//!
//! Provides pre-built test data with sensible defaults.
//! Use these for quick test setup without needing to specify every field.

/// Plan fixture factories
pub mod plan {
    use sweep_core::Plan;

    pub const WITH_ERRAND_ID: &str = "dedicated-plan-id";
    pub const WITHOUT_ERRAND_ID: &str = "shared-plan-id";
    pub const POST_DEPLOY_ERRAND: &str = "init-cluster";

    /// Plan declaring the `init-cluster` post-deploy errand
    pub fn with_errand() -> Plan {
        let mut plan = Plan::new(WITH_ERRAND_ID).with_post_deploy_errand(POST_DEPLOY_ERRAND);
        plan.name = "dedicated-plan-name".to_string();
        plan
    }

    /// Plan with no lifecycle errands
    pub fn without_errand() -> Plan {
        let mut plan = Plan::new(WITHOUT_ERRAND_ID);
        plan.name = "shared-plan-name".to_string();
        plan
    }
}

/// Service instance fixture factories
pub mod instance {
    use super::plan;
    use sweep_core::ServiceInstance;

    /// `service-<n>` on the plan without an errand
    pub fn numbered(n: usize) -> ServiceInstance {
        ServiceInstance::new(format!("service-{}", n), plan::WITHOUT_ERRAND_ID)
    }

    /// `service-1` .. `service-<count>`
    pub fn many(count: usize) -> Vec<ServiceInstance> {
        (1..=count).map(numbered).collect()
    }

    /// `service-1` on the errand plan and `service-2` on the plain plan
    pub fn one_with_errand() -> Vec<ServiceInstance> {
        vec![
            ServiceInstance::new("service-1", plan::WITH_ERRAND_ID),
            ServiceInstance::new("service-2", plan::WITHOUT_ERRAND_ID),
        ]
    }

    /// Two instances, both on the errand plan
    pub fn both_with_errand() -> Vec<ServiceInstance> {
        vec![
            ServiceInstance::new("service-1", plan::WITH_ERRAND_ID),
            ServiceInstance::new("service-2", plan::WITH_ERRAND_ID),
        ]
    }
}

/// Config fixture factories
pub mod config {
    use crate::builders::IteratorConfigBuilder;
    use sweep_core::IteratorConfig;

    /// Recreate-all run with test timings
    pub fn recreate() -> IteratorConfig {
        IteratorConfigBuilder::new().build()
    }

    /// YAML document for a recreate-all run against the given URLs
    pub fn yaml(broker_url: &str, bosh_url: &str) -> String {
        format!(
            r#"operation: recreate
service_offering: service-name
polling_interval: 1
attempt_interval: 1
attempt_limit: 1
request_timeout: 5
max_in_flight: 1
plans:
  - id: dedicated-plan-id
    name: dedicated-plan-name
    post_deploy_errand: init-cluster
broker_api:
  url: {broker}
  authentication:
    basic: {{username: some-user, password: some-password}}
service_instances_api:
  url: {broker}/mgmt/service_instances
  authentication:
    basic: {{username: some-user, password: some-password}}
bosh:
  url: {bosh}
  authentication:
    basic: {{username: admin, password: admin-password}}
"#,
            broker = broker_url,
            bosh = bosh_url,
        )
    }
}
