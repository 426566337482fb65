//! Custom assertions for common verification patterns
//!
//! Provides assertion helpers that give better error messages than a bare
//! `assert!` over captured output.

use sweep_runtime::{CapturedOutput, RunReport};

/// Assert the captured operator output contains `needle`
pub fn assert_output_contains(output: &CapturedOutput, needle: &str) {
    let contents = output.contents();
    assert!(
        contents.contains(needle),
        "Expected output to contain {:?}, got:\n{}",
        needle,
        contents
    );
}

/// Assert the start lines read `1 of N`, `2 of N`, ... in order
pub fn assert_start_lines_in_order(output: &CapturedOutput, total: usize) {
    let marker = "Starting to process service instance ";
    let indices: Vec<usize> = output
        .lines()
        .iter()
        .filter_map(|line| line.split_once(marker).map(|(_, rest)| rest.to_string()))
        .map(|rest| {
            let (i, n) = rest
                .split_once(" of ")
                .unwrap_or_else(|| panic!("malformed start line: {}", rest));
            assert_eq!(n.parse::<usize>().unwrap(), total, "wrong total in {:?}", rest);
            i.parse().unwrap()
        })
        .collect();

    let expected: Vec<usize> = (1..=total).collect();
    assert_eq!(indices, expected, "start lines out of order");
}

/// Assert every GUID appears exactly once in the report
pub fn assert_each_processed_once(report: &RunReport, guids: &[&str]) {
    let mut seen: Vec<&str> = report.results.iter().map(|r| r.guid.as_str()).collect();
    seen.sort_unstable();
    let mut expected = guids.to_vec();
    expected.sort_unstable();
    assert_eq!(seen, expected, "each instance should have exactly one result");
}

/// Assert the final line reports `status` (`SUCCESS` or `FAILURE`)
pub fn assert_finished_with(output: &CapturedOutput, status: &str) {
    let lines = output.lines();
    let last = lines.last().map(String::as_str).unwrap_or_default();
    assert!(
        last.contains(&format!("FINISHED PROCESSING Status: {}", status)),
        "Expected final line to report {}, got {:?}",
        status,
        last
    );
}
