//! BOSH director adapter
//!
//! Implements both director facets: [`TaskTrigger`] for starting work and
//! [`TaskReporter`] for reading task state. Every trigger answers with a
//! redirect to `/tasks/<id>`; the ID is taken from the `Location` header.

use crate::http::ApiClient;
use crate::Result;
use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, LOCATION};
use reqwest::Response;
use serde::Deserialize;
use std::time::Duration;
use sweep_core::{BoshTask, BoshTaskState, IteratorConfig};
use sweep_runtime::{CollaboratorError, TaskReporter, TaskTrigger};
use tracing::{debug, info};

/// Header the director records on every task a request creates
pub const CONTEXT_ID_HEADER: &str = "X-Bosh-Context-Id";

#[derive(Debug, Deserialize)]
struct DeploymentManifest {
    manifest: String,
}

/// Client for the BOSH director API
#[derive(Clone)]
pub struct DirectorClient {
    api: ApiClient,
}

impl DirectorClient {
    pub fn new(config: &IteratorConfig) -> Result<Self> {
        Self::with_timeout(&config.bosh, config.request_timeout())
    }

    pub fn with_timeout(api: &sweep_core::ApiConfig, timeout: Duration) -> Result<Self> {
        Ok(Self {
            api: ApiClient::new(api, timeout)?,
        })
    }

    pub fn url(&self) -> &str {
        self.api.base_url()
    }

    fn task_id(response: &Response) -> std::result::Result<u64, CollaboratorError> {
        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|l| l.to_str().ok())
            .ok_or_else(|| CollaboratorError::Decode("missing task location header".to_string()))?;

        location
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .and_then(|id| id.parse().ok())
            .ok_or_else(|| {
                CollaboratorError::Decode(format!("cannot parse task ID from location '{}'", location))
            })
    }

    async fn manifest(&self, deployment: &str) -> std::result::Result<String, CollaboratorError> {
        let url = self.api.url(&format!("/deployments/{}", deployment));
        let response = self.api.send(self.api.get(&url)).await?;
        let body: DeploymentManifest = response
            .json()
            .await
            .map_err(|e| CollaboratorError::Decode(e.to_string()))?;
        Ok(body.manifest)
    }
}

#[async_trait]
impl TaskTrigger for DirectorClient {
    async fn recreate(
        &self,
        deployment: &str,
        context_id: &str,
    ) -> std::result::Result<u64, CollaboratorError> {
        let url = self.api.url(&format!("/deployments/{}/jobs/*", deployment));
        let request = self
            .api
            .put(&url)
            .query(&[("state", "recreate")])
            .header(CONTENT_TYPE, "text/yaml")
            .header(CONTEXT_ID_HEADER, context_id);

        let task_id = Self::task_id(&self.api.send(request).await?)?;
        info!(deployment, task_id, "Recreate task queued");
        Ok(task_id)
    }

    async fn upgrade(
        &self,
        deployment: &str,
        context_id: &str,
    ) -> std::result::Result<u64, CollaboratorError> {
        let manifest = self.manifest(deployment).await?;

        let url = self.api.url("/deployments");
        let request = self
            .api
            .post(&url)
            .header(CONTENT_TYPE, "text/yaml")
            .header(CONTEXT_ID_HEADER, context_id)
            .body(manifest);

        let task_id = Self::task_id(&self.api.send(request).await?)?;
        info!(deployment, task_id, "Upgrade task queued");
        Ok(task_id)
    }

    async fn run_errand(
        &self,
        deployment: &str,
        errand: &str,
        context_id: &str,
    ) -> std::result::Result<u64, CollaboratorError> {
        let url = self
            .api
            .url(&format!("/deployments/{}/errands/{}/runs", deployment, errand));
        let request = self
            .api
            .post(&url)
            .header(CONTEXT_ID_HEADER, context_id)
            .json(&serde_json::json!({}));

        let task_id = Self::task_id(&self.api.send(request).await?)?;
        info!(deployment, errand, task_id, "Errand task queued");
        Ok(task_id)
    }
}

#[async_trait]
impl TaskReporter for DirectorClient {
    async fn get_task(&self, task_id: u64) -> std::result::Result<BoshTask, CollaboratorError> {
        let url = self.api.url(&format!("/tasks/{}", task_id));
        let response = self.api.send(self.api.get(&url)).await?;
        response
            .json()
            .await
            .map_err(|e| CollaboratorError::Decode(e.to_string()))
    }

    async fn get_normalised_tasks_by_context(
        &self,
        deployment: &str,
        context_id: &str,
    ) -> std::result::Result<Vec<BoshTask>, CollaboratorError> {
        let url = self.api.url("/tasks");
        let request = self.api.get(&url).query(&[
            ("deployment", deployment),
            ("context_id", context_id),
            ("verbose", "1"),
        ]);

        let response = self.api.send(request).await?;
        let tasks: Vec<BoshTask> = response
            .json()
            .await
            .map_err(|e| CollaboratorError::Decode(e.to_string()))?;

        debug!(deployment, context_id, count = tasks.len(), "Fetched tasks by context");
        Ok(normalise(tasks))
    }
}

/// Newest task first; a task being cancelled still counts as running
fn normalise(mut tasks: Vec<BoshTask>) -> Vec<BoshTask> {
    tasks.sort_by(|a, b| b.id.cmp(&a.id));
    for task in &mut tasks {
        if task.state == BoshTaskState::Cancelling {
            task.state = BoshTaskState::Processing;
        }
    }
    tasks
}
