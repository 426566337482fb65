//! Service-instances management API adapter

use crate::http::ApiClient;
use crate::Result;
use async_trait::async_trait;
use sweep_core::{IteratorConfig, ServiceInstance};
use sweep_runtime::{CollaboratorError, InstanceLister};

/// Lists instances from the broker's management API
///
/// The configured URL already points at the listing endpoint, which serves
/// a single offering.
#[derive(Clone)]
pub struct InventoryClient {
    api: ApiClient,
}

impl InventoryClient {
    pub fn new(config: &IteratorConfig) -> Result<Self> {
        Ok(Self {
            api: ApiClient::new(&config.service_instances_api, config.request_timeout())?,
        })
    }
}

#[async_trait]
impl InstanceLister for InventoryClient {
    async fn list_instances(
        &self,
        offering: &str,
    ) -> std::result::Result<Vec<ServiceInstance>, CollaboratorError> {
        let response = self.api.send(self.api.get(self.api.base_url())).await?;
        let instances: Vec<ServiceInstance> = response
            .json()
            .await
            .map_err(|e| CollaboratorError::Decode(e.to_string()))?;

        tracing::debug!(offering, count = instances.len(), "Listed service instances");
        Ok(instances)
    }
}
