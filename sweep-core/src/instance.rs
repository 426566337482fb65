//! Service instances and the plans they belong to

use serde::{Deserialize, Serialize};

/// Prefix the broker puts in front of an instance GUID to name its deployment
pub const INSTANCE_PREFIX: &str = "service-instance_";

/// Director deployment name for a service instance GUID
pub fn deployment_name(guid: &str) -> String {
    format!("{}{}", INSTANCE_PREFIX, guid)
}

/// One deployed service instance, as reported by the platform inventory
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServiceInstance {
    /// Instance GUID
    #[serde(rename = "service_instance_id")]
    pub guid: String,

    /// Unique ID of the plan the instance was provisioned from
    #[serde(rename = "plan_id")]
    pub plan_unique_id: String,
}

impl ServiceInstance {
    pub fn new(guid: impl Into<String>, plan_unique_id: impl Into<String>) -> Self {
        Self {
            guid: guid.into(),
            plan_unique_id: plan_unique_id.into(),
        }
    }

    /// Name of the director deployment backing this instance
    pub fn deployment_name(&self) -> String {
        deployment_name(&self.guid)
    }
}

/// The slice of a catalog plan the engine cares about
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub id: String,

    #[serde(default)]
    pub name: String,

    /// Errand to run after a successful operation on instances of this plan
    #[serde(default)]
    pub post_deploy_errand: Option<String>,
}

impl Plan {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            post_deploy_errand: None,
        }
    }

    pub fn with_post_deploy_errand(mut self, errand: impl Into<String>) -> Self {
        self.post_deploy_errand = Some(errand.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deployment_name() {
        let instance = ServiceInstance::new("service-1", "plan");
        assert_eq!(instance.deployment_name(), "service-instance_service-1");
    }

    #[test]
    fn test_instance_wire_format() {
        let instance: ServiceInstance = serde_json::from_str(
            r#"{"service_instance_id": "abc", "plan_id": "dedicated-plan-id"}"#,
        )
        .unwrap();
        assert_eq!(instance, ServiceInstance::new("abc", "dedicated-plan-id"));
    }

    #[test]
    fn test_plan_without_errand() {
        let plan = Plan::new("small");
        assert_eq!(plan.name, "small");
        assert!(plan.post_deploy_errand.is_none());

        let plan = plan.with_post_deploy_errand("health-check");
        assert_eq!(plan.post_deploy_errand.as_deref(), Some("health-check"));
    }
}
