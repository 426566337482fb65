//! Director tasks
//!
//! A task is one unit of asynchronous work tracked by the director. The
//! engine only ever reads tasks; the director owns their lifecycle.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a director task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoshTaskState {
    /// Task is waiting for a worker
    Queued,

    /// Task is running
    Processing,

    /// Cancellation was requested but the task has not stopped yet
    Cancelling,

    /// Task finished successfully
    Done,

    /// Task finished with an error
    Error,

    /// Task was cancelled
    Cancelled,

    /// Task exceeded the director's own time limit
    Timeout,
}

impl BoshTaskState {
    /// Whether the task will not change state again
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BoshTaskState::Done
                | BoshTaskState::Error
                | BoshTaskState::Cancelled
                | BoshTaskState::Timeout
        )
    }

    /// Whether the task reached a terminal state other than `done`
    pub fn is_failure(&self) -> bool {
        self.is_terminal() && *self != BoshTaskState::Done
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BoshTaskState::Queued => "queued",
            BoshTaskState::Processing => "processing",
            BoshTaskState::Cancelling => "cancelling",
            BoshTaskState::Done => "done",
            BoshTaskState::Error => "error",
            BoshTaskState::Cancelled => "cancelled",
            BoshTaskState::Timeout => "timeout",
        }
    }
}

impl fmt::Display for BoshTaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A task as reported by the director
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoshTask {
    pub id: u64,

    pub state: BoshTaskState,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub result: Option<String>,

    #[serde(default)]
    pub context_id: Option<String>,
}

impl BoshTask {
    pub fn new(id: u64, state: BoshTaskState) -> Self {
        Self {
            id,
            state,
            description: String::new(),
            result: None,
            context_id: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(BoshTaskState::Done.is_terminal());
        assert!(BoshTaskState::Error.is_terminal());
        assert!(BoshTaskState::Cancelled.is_terminal());
        assert!(BoshTaskState::Timeout.is_terminal());

        assert!(!BoshTaskState::Queued.is_terminal());
        assert!(!BoshTaskState::Processing.is_terminal());
        assert!(!BoshTaskState::Cancelling.is_terminal());
    }

    #[test]
    fn test_failure_states() {
        assert!(!BoshTaskState::Done.is_failure());
        assert!(BoshTaskState::Error.is_failure());
        assert!(!BoshTaskState::Processing.is_failure());
    }

    #[test]
    fn test_task_wire_format() {
        let task: BoshTask = serde_json::from_str(
            r#"{"id": 42, "state": "processing", "description": "create deployment", "context_id": "ctx"}"#,
        )
        .unwrap();

        assert_eq!(task.id, 42);
        assert_eq!(task.state, BoshTaskState::Processing);
        assert_eq!(task.context_id.as_deref(), Some("ctx"));
        assert!(task.result.is_none());
    }

    #[test]
    fn test_unknown_state_is_rejected() {
        let parsed = serde_json::from_str::<BoshTask>(r#"{"id": 1, "state": "exploded"}"#);
        assert!(parsed.is_err());
    }
}
