//! Per-instance workflow state machine

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// State of one instance's workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkflowState {
    /// Not started
    Pending,

    /// Starting the operation on the director
    Triggering,

    /// Waiting for the operation's task
    Polling,

    /// Starting the post-deploy errand
    ErrandTriggering,

    /// Waiting for the post-deploy errand's task
    ErrandPolling,

    /// Workflow succeeded
    Succeeded,

    /// Workflow failed
    Failed,
}

impl WorkflowState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkflowState::Succeeded | WorkflowState::Failed)
    }
}

/// State machine for one instance's workflow lifecycle
pub struct StateMachine {
    current_state: WorkflowState,
    state_history: Vec<(WorkflowState, DateTime<Utc>)>,
}

impl StateMachine {
    /// Create a new state machine
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            current_state: WorkflowState::Pending,
            state_history: vec![(WorkflowState::Pending, now)],
        }
    }

    /// Get the current state
    pub fn current_state(&self) -> WorkflowState {
        self.current_state
    }

    /// Transition to a new state
    pub fn transition(&mut self, new_state: WorkflowState) -> Result<()> {
        if !self.is_valid_transition(new_state) {
            return Err(Error::InvalidState(format!(
                "Invalid transition from {:?} to {:?}",
                self.current_state, new_state
            )));
        }

        self.current_state = new_state;
        self.state_history.push((new_state, Utc::now()));

        Ok(())
    }

    /// Check if a state transition is valid
    fn is_valid_transition(&self, new_state: WorkflowState) -> bool {
        use WorkflowState::*;

        match (self.current_state, new_state) {
            (Pending, Triggering) => true,
            (Triggering, Polling) => true,
            (Polling, ErrandTriggering) => true,
            (ErrandTriggering, ErrandPolling) => true,
            (Polling | ErrandPolling, Succeeded) => true,
            (from, Failed) => !from.is_terminal(),
            _ => false,
        }
    }

    /// Get the state history
    pub fn history(&self) -> &[(WorkflowState, DateTime<Utc>)] {
        &self.state_history
    }
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let sm = StateMachine::new();
        assert_eq!(sm.current_state(), WorkflowState::Pending);
    }

    #[test]
    fn test_path_without_errand() {
        let mut sm = StateMachine::new();
        assert!(sm.transition(WorkflowState::Triggering).is_ok());
        assert!(sm.transition(WorkflowState::Polling).is_ok());
        assert!(sm.transition(WorkflowState::Succeeded).is_ok());
        assert_eq!(sm.history().len(), 4);
    }

    #[test]
    fn test_path_with_errand() {
        let mut sm = StateMachine::new();
        for state in [
            WorkflowState::Triggering,
            WorkflowState::Polling,
            WorkflowState::ErrandTriggering,
            WorkflowState::ErrandPolling,
            WorkflowState::Succeeded,
        ] {
            sm.transition(state).unwrap();
        }
        assert!(sm.current_state().is_terminal());
    }

    #[test]
    fn test_invalid_transition() {
        let mut sm = StateMachine::new();
        assert!(sm.transition(WorkflowState::Succeeded).is_err());
        assert!(sm.transition(WorkflowState::ErrandPolling).is_err());
    }

    #[test]
    fn test_any_active_state_can_fail() {
        let mut sm = StateMachine::new();
        sm.transition(WorkflowState::Triggering).unwrap();
        assert!(sm.transition(WorkflowState::Failed).is_ok());
    }

    #[test]
    fn test_terminal_states_are_final() {
        let mut sm = StateMachine::new();
        sm.transition(WorkflowState::Failed).unwrap();
        assert!(sm.transition(WorkflowState::Failed).is_err());
        assert!(sm.transition(WorkflowState::Triggering).is_err());
    }
}
