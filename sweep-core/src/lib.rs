//! # Sweep Core
//!
//! Domain types shared by the bulk operation engine: service instances,
//! director tasks, operation correlation data, per-instance results and the
//! run configuration.

pub mod config;
pub mod instance;
pub mod operation;
pub mod outcome;
pub mod task;

// Re-export commonly used types
pub use config::{
    ApiConfig, Authentication, BasicAuth, IteratorConfig, OperationKind, StatusSource,
};
pub use instance::{deployment_name, Plan, ServiceInstance, INSTANCE_PREFIX};
pub use operation::{BoshOperation, BoshOperationType, OperationData, OperationType};
pub use outcome::{InstanceOutcome, InstanceResult, RunSummary};
pub use task::{BoshTask, BoshTaskState};

/// Result type for core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Failed to read config file {path}: {source}")]
    ConfigRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}
