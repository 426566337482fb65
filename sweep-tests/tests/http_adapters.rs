//! HTTP adapters against mock director and broker servers

use std::sync::Arc;
use sweep_core::{BoshTaskState, IteratorConfig, OperationData, OperationType, ServiceInstance};
use sweep_director::{BrokerClient, DirectorClient, InventoryClient};
use sweep_runtime::{
    BrokerServices, BulkOperationOrchestrator, CollaboratorError, Collaborators,
    DirectorStatusChecker, InstanceLister, Reporter, TaskReporter, TaskTrigger,
};
use sweep_tests::assertions::assert_finished_with;
use sweep_tests::{config, BoshTaskBuilder, MockBrokerServer, MockDirectorServer};

const DEPLOYMENT: &str = "service-instance_service-1";

async fn servers() -> (MockBrokerServer, MockDirectorServer, IteratorConfig) {
    let broker = MockBrokerServer::start().await;
    let director = MockDirectorServer::start().await;
    let config = IteratorConfig::from_yaml(&config::yaml(&broker.uri(), &director.uri())).unwrap();
    (broker, director, config)
}

#[tokio::test]
async fn test_recreate_returns_task_from_redirect() {
    let (_broker, server, config) = servers().await;
    server.recreate(DEPLOYMENT, 42).await;
    let client = DirectorClient::new(&config).unwrap();

    let task_id = client.recreate(DEPLOYMENT, "context-1").await.unwrap();

    assert_eq!(task_id, 42);
    assert_eq!(
        server
            .header_of(&format!("/deployments/{}/jobs/*", DEPLOYMENT), "X-Bosh-Context-Id")
            .await
            .as_deref(),
        Some("context-1")
    );
}

#[tokio::test]
async fn test_recreate_error_status_carries_body() {
    let (_broker, server, config) = servers().await;
    server.recreate_fails(DEPLOYMENT, 500, "bosh recreate failed").await;
    let client = DirectorClient::new(&config).unwrap();

    let err = client.recreate(DEPLOYMENT, "context-1").await.unwrap_err();

    assert_eq!(
        err,
        CollaboratorError::UnexpectedStatus {
            status: 500,
            description: "bosh recreate failed".to_string(),
        }
    );
    assert_eq!(
        err.to_string(),
        "unexpected status code: 500. description: bosh recreate failed"
    );
}

#[tokio::test]
async fn test_upgrade_redeploys_current_manifest() {
    let (_broker, server, config) = servers().await;
    server.upgrade(DEPLOYMENT, "name: service-instance_service-1", 44).await;
    let client = DirectorClient::new(&config).unwrap();

    let task_id = client.upgrade(DEPLOYMENT, "context-1").await.unwrap();

    assert_eq!(task_id, 44);
    assert_eq!(
        server.requests().await,
        [
            format!("GET /deployments/{}", DEPLOYMENT),
            "POST /deployments".to_string()
        ]
    );
}

#[tokio::test]
async fn test_run_errand_returns_task() {
    let (_broker, server, config) = servers().await;
    server.run_errand(DEPLOYMENT, "init-cluster", 43).await;
    let client = DirectorClient::new(&config).unwrap();

    let task_id = client
        .run_errand(DEPLOYMENT, "init-cluster", "context-1")
        .await
        .unwrap();

    assert_eq!(task_id, 43);
}

#[tokio::test]
async fn test_get_task_decodes_task() {
    let (_broker, server, config) = servers().await;
    server.task(BoshTaskBuilder::failed(43, "broken")).await;
    let client = DirectorClient::new(&config).unwrap();

    let task = client.get_task(43).await.unwrap();

    assert_eq!(task.state, BoshTaskState::Error);
    assert_eq!(task.description, "broken");
}

#[tokio::test]
async fn test_tasks_by_context_are_normalised() {
    let (_broker, server, config) = servers().await;
    server
        .tasks_by_context(
            DEPLOYMENT,
            vec![
                BoshTaskBuilder::done(40),
                BoshTaskBuilder::new(41).state(BoshTaskState::Cancelling).build(),
            ],
        )
        .await;
    let client = DirectorClient::new(&config).unwrap();

    let tasks = client
        .get_normalised_tasks_by_context(DEPLOYMENT, "context-1")
        .await
        .unwrap();

    let ids: Vec<_> = tasks.iter().map(|t| t.id).collect();
    assert_eq!(ids, [41, 40]);
    assert_eq!(tasks[0].state, BoshTaskState::Processing);
}

#[tokio::test]
async fn test_inventory_lists_instances() {
    let (broker, _server, config) = servers().await;
    let instances = vec![
        ServiceInstance::new("service-1", "dedicated-plan-id"),
        ServiceInstance::new("service-2", "dedicated-plan-id"),
    ];
    broker.instances(&instances).await;
    let client = InventoryClient::new(&config).unwrap();

    let listed = client.list_instances("service-name").await.unwrap();

    assert_eq!(listed, instances);
}

#[tokio::test]
async fn test_inventory_error_status() {
    let (broker, _server, config) = servers().await;
    broker.instances_fail(503, "unavailable").await;
    let client = InventoryClient::new(&config).unwrap();

    let err = client.list_instances("service-name").await.unwrap_err();

    assert_eq!(
        err.to_string(),
        "unexpected status code: 503. description: unavailable"
    );
}

#[tokio::test]
async fn test_last_operation_sends_operation_data() {
    let (broker, _server, config) = servers().await;
    broker.last_operation("service-1", "in progress", "recreating").await;
    let client = BrokerClient::new(&config).unwrap();
    let data = OperationData::new(OperationType::Recreate)
        .with_task(42)
        .with_context("context-1");

    let last_operation = client
        .last_operation(&ServiceInstance::new("service-1", "dedicated-plan-id"), &data)
        .await
        .unwrap();

    assert_eq!(last_operation.state, "in progress");
    assert_eq!(last_operation.description, "recreating");

    let sent: serde_json::Value =
        serde_json::from_str(&broker.last_operation_query().await.unwrap()).unwrap();
    assert_eq!(sent["OperationType"], "recreate");
    assert_eq!(sent["BoshTaskID"], 42);
    assert_eq!(sent["BoshContextID"], "context-1");
}

#[tokio::test]
async fn test_recreate_all_over_http() {
    let (broker, server, config) = servers().await;
    broker
        .instances(&[ServiceInstance::new("service-1", "dedicated-plan-id")])
        .await;
    server.recreate(DEPLOYMENT, 42).await;
    server
        .tasks_by_context(DEPLOYMENT, vec![BoshTaskBuilder::done(42)])
        .await;
    server.run_errand(DEPLOYMENT, "init-cluster", 43).await;
    server.task(BoshTaskBuilder::done(43)).await;

    let director = Arc::new(DirectorClient::new(&config).unwrap());
    let collaborators = Collaborators {
        inventory: Arc::new(InventoryClient::new(&config).unwrap()),
        director: director.clone(),
        status: Arc::new(DirectorStatusChecker::new(director)),
    };
    let (reporter, output) = Reporter::captured("recreate-all");

    let report = BulkOperationOrchestrator::new(&config, collaborators, reporter)
        .run()
        .await
        .unwrap();

    assert_eq!(report.exit_code(), 0);
    assert_finished_with(&output, "SUCCESS");
    let requests = server.requests().await;
    assert!(requests.contains(&format!("POST /deployments/{}/errands/init-cluster/runs", DEPLOYMENT)));
    assert!(requests.contains(&"GET /tasks/43".to_string()));
}
