//! # Sweep Runtime
//!
//! Engine that applies one asynchronous operation (recreate, upgrade or an
//! errand run) to every service instance of an offering, providing task
//! polling, retry logic, concurrency control and run reporting.

pub mod collaborators;
pub mod concurrency;
pub mod metrics;
pub mod orchestrator;
pub mod poller;
pub mod reporter;
pub mod retry;
pub mod state_machine;
pub mod status;
pub mod trigger;
pub mod workflow;

// Re-export commonly used types
pub use collaborators::{
    BrokerServices, CollaboratorError, InstanceLister, LastOperation, TaskReporter, TaskTrigger,
};
pub use concurrency::ConcurrencyLimiter;
pub use orchestrator::{BulkOperationOrchestrator, Collaborators, RunReport};
pub use poller::{PollOutcome, TaskPoller};
pub use reporter::{CapturedOutput, Reporter};
pub use retry::{RetryExhausted, RetryPolicy};
pub use state_machine::{StateMachine, WorkflowState};
pub use status::{DirectorStatusChecker, LastOperationChecker, StatusChecker, StatusError};
pub use trigger::OperationTrigger;
pub use workflow::{InstanceWorkflow, WorkflowError};

/// Result type for runtime operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for runtime operations
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    #[error("error listing service instances: {0}")]
    Enumeration(CollaboratorError),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
