//! Prometheus metrics for bulk operation runs
//!
//! Registered in the default registry; exporting them is up to the host
//! process.

use lazy_static::lazy_static;
use prometheus::{register_histogram_vec, register_int_counter_vec, HistogramVec, IntCounterVec};

lazy_static! {
    /// Total number of trigger attempts
    ///
    /// Labels:
    /// - operation: "recreate", "upgrade", "errand"
    /// - status: "success", "failure"
    pub static ref TRIGGER_ATTEMPTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "sweep_trigger_attempts_total",
        "Total number of trigger attempts",
        &["operation", "status"]
    )
    .expect("sweep_trigger_attempts_total metric registration");

    /// Total number of instances that reached a terminal state
    ///
    /// Labels:
    /// - operation: "recreate", "upgrade", "errand"
    /// - outcome: "succeeded", "failed"
    pub static ref INSTANCE_OUTCOMES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "sweep_instance_outcomes_total",
        "Total number of processed service instances by outcome",
        &["operation", "outcome"]
    )
    .expect("sweep_instance_outcomes_total metric registration");

    /// Wall-clock time of one instance's workflow in seconds
    ///
    /// Buckets: 1s to 2h
    pub static ref INSTANCE_DURATION: HistogramVec = register_histogram_vec!(
        "sweep_instance_duration_seconds",
        "Duration of one service instance workflow",
        &["operation"],
        vec![1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0, 600.0, 1200.0, 3600.0, 7200.0]
    )
    .expect("sweep_instance_duration_seconds metric registration");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_registration() {
        let _ = TRIGGER_ATTEMPTS_TOTAL.with_label_values(&["recreate", "success"]);
        let _ = INSTANCE_OUTCOMES_TOTAL.with_label_values(&["recreate", "failed"]);
        let _ = INSTANCE_DURATION.with_label_values(&["upgrade"]);
    }
}
