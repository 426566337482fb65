//! Mock implementations for external services
//!
//! In-memory fakes for the collaborator traits, with call recording, plus
//! wiremock servers standing in for the director and broker HTTP APIs.

use crate::builders::BoshTaskBuilder;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use sweep_core::{BoshTask, OperationData, ServiceInstance};
use sweep_runtime::{
    BrokerServices, CollaboratorError, InstanceLister, LastOperation, TaskReporter, TaskTrigger,
};
use tokio::time::Instant;
use wiremock::{
    matchers::{method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

type Reply<T> = Result<T, CollaboratorError>;

/// Canned answers: queued ones first, then the default forever
struct Replies<T: Clone> {
    queued: VecDeque<Reply<T>>,
    default: Reply<T>,
}

impl<T: Clone> Replies<T> {
    fn new(default: Reply<T>) -> Mutex<Self> {
        Mutex::new(Self {
            queued: VecDeque::new(),
            default,
        })
    }

    fn next(&mut self) -> Reply<T> {
        self.queued
            .pop_front()
            .unwrap_or_else(|| self.default.clone())
    }
}

/// In-memory platform inventory
pub struct FakeInventory {
    instances: Mutex<Vec<ServiceInstance>>,
    error: Mutex<Option<CollaboratorError>>,
    calls: AtomicUsize,
}

impl FakeInventory {
    pub fn new(instances: Vec<ServiceInstance>) -> Self {
        Self {
            instances: Mutex::new(instances),
            error: Mutex::new(None),
            calls: AtomicUsize::new(0),
        }
    }

    /// Inventory whose listing always fails with `error`
    pub fn failing(error: CollaboratorError) -> Self {
        let inventory = Self::new(vec![]);
        *inventory.error.lock() = Some(error);
        inventory
    }

    /// Add an instance after the fact
    pub fn push(&self, instance: ServiceInstance) {
        self.instances.lock().push(instance);
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InstanceLister for FakeInventory {
    async fn list_instances(&self, _offering: &str) -> Reply<Vec<ServiceInstance>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.error.lock().clone() {
            return Err(error);
        }
        Ok(self.instances.lock().clone())
    }
}

/// One recorded director request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectorCall {
    Recreate { deployment: String, context_id: String },
    Upgrade { deployment: String, context_id: String },
    RunErrand { deployment: String, errand: String, context_id: String },
    GetTask(u64),
    TasksByContext { deployment: String, context_id: String },
}

/// In-memory director implementing both director facets
///
/// Every trigger succeeds and every task is done unless told otherwise.
/// Recreate returns task 42, upgrade 44 and errand runs 43.
pub struct FakeDirector {
    recreate: Mutex<Replies<u64>>,
    upgrade: Mutex<Replies<u64>>,
    run_errand: Mutex<Replies<u64>>,
    get_task: Mutex<Replies<BoshTask>>,
    tasks_by_context: Mutex<Replies<Vec<BoshTask>>>,
    calls: Mutex<Vec<DirectorCall>>,
    trigger_times: Mutex<Vec<Instant>>,
    trigger_delay: Mutex<Duration>,
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl FakeDirector {
    pub fn new() -> Self {
        Self {
            recreate: Replies::new(Ok(42)),
            upgrade: Replies::new(Ok(44)),
            run_errand: Replies::new(Ok(43)),
            get_task: Replies::new(Ok(BoshTaskBuilder::done(43))),
            tasks_by_context: Replies::new(Ok(vec![
                BoshTaskBuilder::done(44),
                BoshTaskBuilder::done(42),
            ])),
            calls: Mutex::new(Vec::new()),
            trigger_times: Mutex::new(Vec::new()),
            trigger_delay: Mutex::new(Duration::ZERO),
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    pub fn recreate_returns(&self, reply: Reply<u64>) -> &Self {
        self.recreate.lock().default = reply;
        self
    }

    /// Answer the next recreate call with `reply`, then fall back
    pub fn recreate_returns_once(&self, reply: Reply<u64>) -> &Self {
        self.recreate.lock().queued.push_back(reply);
        self
    }

    pub fn upgrade_returns(&self, reply: Reply<u64>) -> &Self {
        self.upgrade.lock().default = reply;
        self
    }

    pub fn run_errand_returns(&self, reply: Reply<u64>) -> &Self {
        self.run_errand.lock().default = reply;
        self
    }

    pub fn get_task_returns(&self, reply: Reply<BoshTask>) -> &Self {
        self.get_task.lock().default = reply;
        self
    }

    pub fn tasks_by_context_returns(&self, reply: Reply<Vec<BoshTask>>) -> &Self {
        self.tasks_by_context.lock().default = reply;
        self
    }

    /// Answer the next task-by-context lookups in order, then fall back
    pub fn tasks_by_context_sequence(&self, replies: Vec<Reply<Vec<BoshTask>>>) -> &Self {
        self.tasks_by_context.lock().queued.extend(replies);
        self
    }

    /// Hold every trigger call open for `delay`
    pub fn trigger_delay(&self, delay: Duration) -> &Self {
        *self.trigger_delay.lock() = delay;
        self
    }

    pub fn calls(&self) -> Vec<DirectorCall> {
        self.calls.lock().clone()
    }

    /// Deployments recreate was called for, in call order
    pub fn recreated_deployments(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                DirectorCall::Recreate { deployment, .. } => Some(deployment),
                _ => None,
            })
            .collect()
    }

    pub fn upgraded_deployments(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                DirectorCall::Upgrade { deployment, .. } => Some(deployment),
                _ => None,
            })
            .collect()
    }

    /// `(deployment, errand)` for every errand run, in call order
    pub fn errand_runs(&self) -> Vec<(String, String)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                DirectorCall::RunErrand {
                    deployment, errand, ..
                } => Some((deployment, errand)),
                _ => None,
            })
            .collect()
    }

    /// Number of trigger calls of any kind
    pub fn trigger_count(&self) -> usize {
        self.trigger_times.lock().len()
    }

    /// When each trigger call arrived
    pub fn trigger_times(&self) -> Vec<Instant> {
        self.trigger_times.lock().clone()
    }

    /// Most trigger calls ever open at once
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    async fn trigger(&self, call: DirectorCall, replies: &Mutex<Replies<u64>>) -> Reply<u64> {
        self.calls.lock().push(call);
        self.trigger_times.lock().push(Instant::now());

        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(active, Ordering::SeqCst);

        let delay = *self.trigger_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        self.active.fetch_sub(1, Ordering::SeqCst);
        replies.lock().next()
    }
}

impl Default for FakeDirector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TaskTrigger for FakeDirector {
    async fn recreate(&self, deployment: &str, context_id: &str) -> Reply<u64> {
        let call = DirectorCall::Recreate {
            deployment: deployment.to_string(),
            context_id: context_id.to_string(),
        };
        self.trigger(call, &self.recreate).await
    }

    async fn upgrade(&self, deployment: &str, context_id: &str) -> Reply<u64> {
        let call = DirectorCall::Upgrade {
            deployment: deployment.to_string(),
            context_id: context_id.to_string(),
        };
        self.trigger(call, &self.upgrade).await
    }

    async fn run_errand(&self, deployment: &str, errand: &str, context_id: &str) -> Reply<u64> {
        let call = DirectorCall::RunErrand {
            deployment: deployment.to_string(),
            errand: errand.to_string(),
            context_id: context_id.to_string(),
        };
        self.trigger(call, &self.run_errand).await
    }
}

#[async_trait]
impl TaskReporter for FakeDirector {
    async fn get_task(&self, task_id: u64) -> Reply<BoshTask> {
        self.calls.lock().push(DirectorCall::GetTask(task_id));
        self.get_task.lock().next()
    }

    async fn get_normalised_tasks_by_context(
        &self,
        deployment: &str,
        context_id: &str,
    ) -> Reply<Vec<BoshTask>> {
        self.calls.lock().push(DirectorCall::TasksByContext {
            deployment: deployment.to_string(),
            context_id: context_id.to_string(),
        });
        self.tasks_by_context.lock().next()
    }
}

/// In-memory broker last-operation endpoint
pub struct FakeBroker {
    replies: Mutex<Replies<LastOperation>>,
    calls: Mutex<Vec<(String, OperationData)>>,
}

impl FakeBroker {
    pub fn new() -> Self {
        Self {
            replies: Replies::new(Ok(Self::state("succeeded", ""))),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn state(state: &str, description: &str) -> LastOperation {
        LastOperation {
            state: state.to_string(),
            description: description.to_string(),
        }
    }

    pub fn returns(&self, reply: Reply<LastOperation>) -> &Self {
        self.replies.lock().default = reply;
        self
    }

    pub fn returns_sequence(&self, replies: Vec<Reply<LastOperation>>) -> &Self {
        self.replies.lock().queued.extend(replies);
        self
    }

    /// `(guid, operation data)` of every request
    pub fn calls(&self) -> Vec<(String, OperationData)> {
        self.calls.lock().clone()
    }
}

impl Default for FakeBroker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BrokerServices for FakeBroker {
    async fn last_operation(
        &self,
        instance: &ServiceInstance,
        data: &OperationData,
    ) -> Reply<LastOperation> {
        self.calls.lock().push((instance.guid.clone(), data.clone()));
        self.replies.lock().next()
    }
}

/// Mock BOSH director HTTP API
///
/// # Example
///
/// ```ignore
/// use sweep_tests::mocks::MockDirectorServer;
///
/// #[tokio::test]
/// async fn test_recreate() {
///     let director = MockDirectorServer::start().await;
///     director.recreate("service-instance_service-1", 42).await;
///     director.tasks_by_context("service-instance_service-1", vec![done(42)]).await;
///
///     // Point a DirectorClient at director.uri()...
/// }
/// ```
pub struct MockDirectorServer {
    server: MockServer,
}

impl MockDirectorServer {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    pub fn uri(&self) -> String {
        self.server.uri()
    }

    fn task_redirect(task_id: u64) -> ResponseTemplate {
        ResponseTemplate::new(302).insert_header("Location", format!("/tasks/{}", task_id).as_str())
    }

    /// Answer recreate of `deployment` with task `task_id`
    pub async fn recreate(&self, deployment: &str, task_id: u64) {
        Mock::given(method("PUT"))
            .and(path(format!("/deployments/{}/jobs/*", deployment)))
            .and(query_param("state", "recreate"))
            .respond_with(Self::task_redirect(task_id))
            .mount(&self.server)
            .await;
    }

    /// Answer recreate of `deployment` with an error status
    pub async fn recreate_fails(&self, deployment: &str, status: u16, body: &str) {
        Mock::given(method("PUT"))
            .and(path(format!("/deployments/{}/jobs/*", deployment)))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(&self.server)
            .await;
    }

    /// Serve `manifest` for `deployment` and accept redeploys with `task_id`
    pub async fn upgrade(&self, deployment: &str, manifest: &str, task_id: u64) {
        Mock::given(method("GET"))
            .and(path(format!("/deployments/{}", deployment)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "manifest": manifest })))
            .mount(&self.server)
            .await;

        Mock::given(method("POST"))
            .and(path("/deployments"))
            .respond_with(Self::task_redirect(task_id))
            .mount(&self.server)
            .await;
    }

    /// Answer errand runs of `errand` on `deployment` with task `task_id`
    pub async fn run_errand(&self, deployment: &str, errand: &str, task_id: u64) {
        Mock::given(method("POST"))
            .and(path(format!("/deployments/{}/errands/{}/runs", deployment, errand)))
            .respond_with(Self::task_redirect(task_id))
            .mount(&self.server)
            .await;
    }

    pub async fn task(&self, task: BoshTask) {
        Mock::given(method("GET"))
            .and(path(format!("/tasks/{}", task.id)))
            .respond_with(ResponseTemplate::new(200).set_body_json(&task))
            .mount(&self.server)
            .await;
    }

    /// Serve `tasks` for any context lookup on `deployment`
    pub async fn tasks_by_context(&self, deployment: &str, tasks: Vec<BoshTask>) {
        Mock::given(method("GET"))
            .and(path("/tasks"))
            .and(query_param("deployment", deployment))
            .respond_with(ResponseTemplate::new(200).set_body_json(&tasks))
            .mount(&self.server)
            .await;
    }

    /// Requests the server has seen, as `METHOD path`
    pub async fn requests(&self) -> Vec<String> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .map(|r| format!("{} {}", r.method, r.url.path()))
            .collect()
    }

    /// Headers of the first request to `path`
    pub async fn header_of(&self, request_path: &str, header: &str) -> Option<String> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .find(|r| r.url.path() == request_path)
            .and_then(|r| r.headers.get(header))
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }
}

/// Mock broker serving the management and last-operation APIs
pub struct MockBrokerServer {
    server: MockServer,
}

impl MockBrokerServer {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    pub fn uri(&self) -> String {
        self.server.uri()
    }

    pub async fn instances(&self, instances: &[ServiceInstance]) {
        Mock::given(method("GET"))
            .and(path("/mgmt/service_instances"))
            .respond_with(ResponseTemplate::new(200).set_body_json(instances))
            .mount(&self.server)
            .await;
    }

    pub async fn instances_fail(&self, status: u16, body: &str) {
        Mock::given(method("GET"))
            .and(path("/mgmt/service_instances"))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(&self.server)
            .await;
    }

    pub async fn last_operation(&self, guid: &str, state: &str, description: &str) {
        Mock::given(method("GET"))
            .and(path(format!("/v2/service_instances/{}/last_operation", guid)))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "state": state, "description": description })),
            )
            .mount(&self.server)
            .await;
    }

    /// Raw `operation` query parameter of the first last-operation request
    pub async fn last_operation_query(&self) -> Option<String> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .find(|r| r.url.path().ends_with("/last_operation"))
            .and_then(|r| {
                r.url
                    .query_pairs()
                    .find(|(k, _)| k == "operation")
                    .map(|(_, v)| v.into_owned())
            })
    }
}
