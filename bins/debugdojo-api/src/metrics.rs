// Prometheus counters for runs, test cases and generations

use debugdojo_common::types::RunEvent;
use lazy_static::lazy_static;
use prometheus::{
    register_int_counter, register_int_counter_vec, Encoder, IntCounter, IntCounterVec,
    TextEncoder,
};

lazy_static! {
    pub static ref RUNS_TOTAL: IntCounter = register_int_counter!(
        "debugdojo_runs_total",
        "Runs accepted by /api/run-python"
    )
    .expect("runs counter registers once");
    pub static ref RUNS_FORBIDDEN_TOTAL: IntCounter = register_int_counter!(
        "debugdojo_runs_forbidden_total",
        "Runs halted by the forbidden-content check"
    )
    .expect("forbidden counter registers once");
    pub static ref TEST_CASES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "debugdojo_test_cases_total",
        "Test case results streamed to clients",
        &["status"]
    )
    .expect("test case counter registers once");
    pub static ref GENERATIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "debugdojo_generations_total",
        "Code generation requests by outcome",
        &["outcome"]
    )
    .expect("generation counter registers once");
}

/// Count one event on its way to the client.
pub fn record_event(event: &RunEvent) {
    match event {
        RunEvent::TestCase(_) => TEST_CASES_TOTAL
            .with_label_values(&[event.status_label()])
            .inc(),
        RunEvent::Halted(_) => RUNS_FORBIDDEN_TOTAL.inc(),
    }
}

/// Text exposition of every registered metric.
pub fn render() -> Result<String, String> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder
        .encode(&prometheus::gather(), &mut buffer)
        .map_err(|e| format!("Failed to encode metrics: {}", e))?;
    String::from_utf8(buffer).map_err(|e| format!("Metrics are not UTF-8: {}", e))
}
