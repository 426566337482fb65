//! Wires an orchestrator to in-memory collaborators

use crate::mocks::{FakeBroker, FakeDirector, FakeInventory};
use std::sync::Arc;
use sweep_core::IteratorConfig;
use sweep_runtime::{
    BulkOperationOrchestrator, CapturedOutput, Collaborators, DirectorStatusChecker,
    LastOperationChecker, OperationTrigger, Reporter, RunReport, StatusChecker,
};
use tokio_util::sync::CancellationToken;

/// One bulk operation run against fakes, with captured operator output
pub struct Harness {
    config: IteratorConfig,
    inventory: Arc<FakeInventory>,
    director: Arc<FakeDirector>,
    broker: Option<Arc<FakeBroker>>,
    cancel: CancellationToken,
}

impl Harness {
    pub fn new(
        config: IteratorConfig,
        inventory: Arc<FakeInventory>,
        director: Arc<FakeDirector>,
    ) -> Self {
        Self {
            config,
            inventory,
            director,
            broker: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Read status from the broker instead of the director
    pub fn with_broker(mut self, broker: Arc<FakeBroker>) -> Self {
        self.broker = Some(broker);
        self
    }

    /// Token that cancels the run
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn orchestrator(&self) -> (BulkOperationOrchestrator, CapturedOutput) {
        let status: Arc<dyn StatusChecker> = match &self.broker {
            Some(broker) => Arc::new(LastOperationChecker::new(broker.clone())),
            None => Arc::new(DirectorStatusChecker::new(self.director.clone())),
        };
        let collaborators = Collaborators {
            inventory: self.inventory.clone(),
            director: self.director.clone(),
            status,
        };

        let run_name = OperationTrigger::from_config(&self.config).run_name();
        let (reporter, output) = Reporter::captured(run_name);
        let orchestrator = BulkOperationOrchestrator::new(&self.config, collaborators, reporter)
            .with_cancellation(self.cancel.clone());
        (orchestrator, output)
    }

    pub async fn run(&self) -> (sweep_runtime::Result<RunReport>, CapturedOutput) {
        let (orchestrator, output) = self.orchestrator();
        (orchestrator.run().await, output)
    }
}
