//! Operation correlation data and the broker-level view of a task

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of asynchronous operation applied to an instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
    Recreate,
    Upgrade,
    Errand,
}

impl OperationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationType::Recreate => "recreate",
            OperationType::Upgrade => "upgrade",
            OperationType::Errand => "errand",
        }
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Correlates a triggered action with the operation that started it
///
/// Serialized with the field names the broker expects in the `operation`
/// parameter of its last-operation endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationData {
    #[serde(rename = "OperationType")]
    pub operation_type: OperationType,

    #[serde(rename = "BoshTaskID", default, skip_serializing_if = "Option::is_none")]
    pub bosh_task_id: Option<u64>,

    #[serde(rename = "BoshContextID", default, skip_serializing_if = "Option::is_none")]
    pub bosh_context_id: Option<String>,

    /// Set when the tracked task is an errand run
    #[serde(rename = "Errand", default, skip_serializing_if = "Option::is_none")]
    pub errand: Option<String>,
}

impl OperationData {
    pub fn new(operation_type: OperationType) -> Self {
        Self {
            operation_type,
            bosh_task_id: None,
            bosh_context_id: None,
            errand: None,
        }
    }

    pub fn with_task(mut self, task_id: u64) -> Self {
        self.bosh_task_id = Some(task_id);
        self
    }

    pub fn with_context(mut self, context_id: impl Into<String>) -> Self {
        self.bosh_context_id = Some(context_id.into());
        self
    }

    pub fn with_errand(mut self, errand: impl Into<String>) -> Self {
        self.errand = Some(errand.into());
        self
    }
}

/// Broker-level status of an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BoshOperationType {
    /// Still running
    Accepted,
    Succeeded,
    Failed,
}

/// Projection of a task's state, produced by a status check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoshOperation {
    pub data: OperationData,
    pub kind: BoshOperationType,
    pub description: String,
}

impl BoshOperation {
    pub fn new(data: OperationData, kind: BoshOperationType, description: impl Into<String>) -> Self {
        Self {
            data,
            kind,
            description: description.into(),
        }
    }
}
