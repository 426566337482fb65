//! Per-instance results and the run summary derived from them

use serde::{Deserialize, Serialize};

/// Terminal outcome of one instance's workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstanceOutcome {
    Succeeded,
    Failed,
}

/// Result of processing one service instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceResult {
    pub guid: String,
    pub outcome: InstanceOutcome,
    pub error: Option<String>,
}

impl InstanceResult {
    pub fn succeeded(guid: impl Into<String>) -> Self {
        Self {
            guid: guid.into(),
            outcome: InstanceOutcome::Succeeded,
            error: None,
        }
    }

    pub fn failed(guid: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            guid: guid.into(),
            outcome: InstanceOutcome::Failed,
            error: Some(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome == InstanceOutcome::Succeeded
    }
}

/// Aggregate counts for a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl RunSummary {
    pub fn from_results(results: &[InstanceResult]) -> Self {
        let succeeded = results.iter().filter(|r| r.is_success()).count();
        Self {
            total: results.len(),
            succeeded,
            failed: results.len() - succeeded,
        }
    }

    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_counts() {
        let results = vec![
            InstanceResult::succeeded("a"),
            InstanceResult::failed("b", "boom"),
            InstanceResult::succeeded("c"),
        ];

        let summary = RunSummary::from_results(&results);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed, 1);
        assert!(!summary.is_success());
    }

    #[test]
    fn test_empty_run_is_success() {
        let summary = RunSummary::from_results(&[]);
        assert_eq!(summary, RunSummary::default());
        assert!(summary.is_success());
    }
}
