//! Broker last-operation adapter

use crate::http::ApiClient;
use crate::Result;
use async_trait::async_trait;
use sweep_core::{IteratorConfig, OperationData, ServiceInstance};
use sweep_runtime::{BrokerServices, CollaboratorError, LastOperation};

/// Open Service Broker API version sent on every request
pub const BROKER_API_VERSION: &str = "2.14";

/// Client for the broker's `last_operation` endpoint
#[derive(Clone)]
pub struct BrokerClient {
    api: ApiClient,
}

impl BrokerClient {
    pub fn new(config: &IteratorConfig) -> Result<Self> {
        Ok(Self {
            api: ApiClient::new(&config.broker_api, config.request_timeout())?,
        })
    }
}

#[async_trait]
impl BrokerServices for BrokerClient {
    async fn last_operation(
        &self,
        instance: &ServiceInstance,
        data: &OperationData,
    ) -> std::result::Result<LastOperation, CollaboratorError> {
        let operation =
            serde_json::to_string(data).map_err(|e| CollaboratorError::Decode(e.to_string()))?;

        let url = self
            .api
            .url(&format!("/v2/service_instances/{}/last_operation", instance.guid));
        let request = self
            .api
            .get(&url)
            .header("X-Broker-API-Version", BROKER_API_VERSION)
            .query(&[("operation", operation.as_str())]);

        let response = self.api.send(request).await?;
        response
            .json()
            .await
            .map_err(|e| CollaboratorError::Decode(e.to_string()))
    }
}
