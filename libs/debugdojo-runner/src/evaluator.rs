/// Test Evaluator - Verdicts and Diagnostics
///
/// **Core Responsibility:**
/// Turn one raw execution outcome into the TestResult the client sees.
///
/// **Critical Properties:**
/// - Knows nothing about interpreters or processes
/// - Knows nothing about the transport
/// - Pure function: (position, raw outcome) → result
///
/// The pass/fail verdict comes from the interpreter's own `==`, so Python's
/// rules apply unchanged (`1 == 1.0`, `(1, 2) != [1, 2]`, `{1: 'a'} != {'1': 'a'}`).
/// Success and mismatch share one message shape; only the status differs.

use crate::engine::{CaseOutcome, EngineError, TestExecutionOutput};
use crate::ENTRY_POINT;
use debugdojo_common::types::{TestResult, TestStatus};

/// Evaluate a single test case execution output
///
/// ## Arguments
/// * `test_case` - 1-based position of the case in the request
/// * `output` - Raw execution output from the engine
pub fn evaluate_test(test_case: usize, output: &TestExecutionOutput) -> TestResult {
    let (status, message) = match &output.outcome {
        CaseOutcome::MissingEntryPoint => (
            TestStatus::Error,
            format!("Function \"{}\" not found in code", ENTRY_POINT),
        ),
        CaseOutcome::Returned {
            passed,
            input,
            expected,
            actual,
        } => {
            let status = if *passed {
                TestStatus::Success
            } else {
                TestStatus::Error
            };
            (
                status,
                format!(
                    "Input:\n{}\n\nExpected:\n{}\n\nGot:\n{}",
                    input, expected, actual
                ),
            )
        }
        CaseOutcome::Raised { error, traceback } => {
            (TestStatus::Error, format!("Error:\n\n{}\n{}", error, traceback))
        }
        CaseOutcome::TimedOut { after_ms } => (
            TestStatus::Error,
            format!("Error:\n\nExecution timed out after {}ms\n", after_ms),
        ),
        CaseOutcome::Crashed { exit_code, stderr } => {
            let exit = match exit_code {
                Some(code) => format!("status {}", code),
                None => "a signal".to_string(),
            };
            (
                TestStatus::Error,
                format!(
                    "Error:\n\nInterpreter exited with {} before reporting a result\n{}",
                    exit, stderr
                ),
            )
        }
        CaseOutcome::OutputLimitExceeded { limit_bytes } => (
            TestStatus::Error,
            format!("Error:\n\nOutput exceeded {} bytes\n", limit_bytes),
        ),
    };

    TestResult {
        status,
        test_case,
        message,
    }
}

/// Result for a test case whose execution could not even be attempted.
pub fn evaluate_engine_failure(test_case: usize, error: &EngineError) -> TestResult {
    TestResult {
        status: TestStatus::Error,
        test_case,
        message: format!("Error:\n\n{}\n", error),
    }
}
