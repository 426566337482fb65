//! Operator-facing progress output
//!
//! Every line is prefixed with the run name (`[recreate-all] ...`) and
//! written whole under a lock, so lines from concurrent workflows never
//! interleave.

use parking_lot::Mutex;
use std::fmt::Display;
use std::io::{self, Write};
use std::sync::Arc;
use sweep_core::RunSummary;

/// Serialized, line-oriented progress writer shared by a run
#[derive(Clone)]
pub struct Reporter {
    run_name: Arc<str>,
    sink: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl Reporter {
    pub fn new(run_name: &str, sink: impl Write + Send + 'static) -> Self {
        Self {
            run_name: Arc::from(run_name),
            sink: Arc::new(Mutex::new(Box::new(sink))),
        }
    }

    /// Reporter writing to stdout
    pub fn stdout(run_name: &str) -> Self {
        Self::new(run_name, io::stdout())
    }

    /// Reporter writing to an in-memory buffer the caller can inspect
    pub fn captured(run_name: &str) -> (Self, CapturedOutput) {
        let output = CapturedOutput::default();
        (Self::new(run_name, output.clone()), output)
    }

    pub fn run_name(&self) -> &str {
        &self.run_name
    }

    /// Write one prefixed line
    pub fn line(&self, message: impl Display) {
        let line = format!("[{}] {}\n", self.run_name, message);
        let mut sink = self.sink.lock();
        if let Err(e) = sink.write_all(line.as_bytes()).and_then(|_| sink.flush()) {
            tracing::warn!(error = %e, "Failed to write progress line");
        }
    }

    pub fn starting(&self, index: usize, total: usize) {
        self.line(format_args!(
            "Starting to process service instance {} of {}",
            index, total
        ));
    }

    pub fn instance_succeeded(&self, guid: &str, operation: impl Display) {
        self.line(format_args!(
            "Result: Service instance {} {} succeeded",
            guid, operation
        ));
    }

    pub fn instance_failed(&self, guid: &str, error: impl Display) {
        self.line(format_args!(
            "Result: Service instance {} failed: {}",
            guid, error
        ));
    }

    /// Final verdict line, listing the GUIDs that failed
    pub fn finished(&self, summary: &RunSummary, failed_guids: &[&str]) {
        let status = if summary.is_success() {
            "SUCCESS"
        } else {
            "FAILURE"
        };
        self.line(format_args!(
            "FINISHED PROCESSING Status: {}; Summary: Number of successful operations: {}; \
             Number of service instances that failed to process: {} [{}]",
            status,
            summary.succeeded,
            summary.failed,
            failed_guids.join(", ")
        ));
    }
}

/// In-memory sink shared between a [`Reporter`] and a test
#[derive(Clone, Default)]
pub struct CapturedOutput {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl CapturedOutput {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buffer.lock()).into_owned()
    }

    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_string).collect()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.contents().contains(needle)
    }
}

impl Write for CapturedOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lines_are_prefixed() {
        let (reporter, output) = Reporter::captured("recreate-all");
        reporter.starting(1, 2);

        assert_eq!(
            output.lines(),
            ["[recreate-all] Starting to process service instance 1 of 2"]
        );
    }

    #[test]
    fn test_finished_success() {
        let (reporter, output) = Reporter::captured("upgrade-all");
        let summary = RunSummary {
            total: 2,
            succeeded: 2,
            failed: 0,
        };
        reporter.finished(&summary, &[]);

        assert!(output.contains("[upgrade-all] FINISHED PROCESSING Status: SUCCESS"));
        assert!(output.contains("Number of successful operations: 2"));
    }

    #[test]
    fn test_finished_failure_lists_guids() {
        let (reporter, output) = Reporter::captured("recreate-all");
        let summary = RunSummary {
            total: 3,
            succeeded: 1,
            failed: 2,
        };
        reporter.finished(&summary, &["a", "b"]);

        assert!(output.contains("FINISHED PROCESSING Status: FAILURE"));
        assert!(output.contains("failed to process: 2 [a, b]"));
    }

    #[test]
    fn test_concurrent_writers_do_not_interleave() {
        let (reporter, output) = Reporter::captured("recreate-all");

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let reporter = reporter.clone();
                std::thread::spawn(move || {
                    for j in 0..50 {
                        reporter.line(format_args!("writer {} line {}", i, j));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let lines = output.lines();
        assert_eq!(lines.len(), 400);
        assert!(lines
            .iter()
            .all(|l| l.starts_with("[recreate-all] writer ") && l.contains(" line ")));
    }
}
