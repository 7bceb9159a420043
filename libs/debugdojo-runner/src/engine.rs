/// Execution Engine - Abstraction for Code Execution
///
/// **Core Responsibility:**
/// Evaluate a submission in a fresh context, call its entry point with one
/// test case's arguments, and capture the raw outcome.
///
/// **Critical Architectural Boundary:**
/// - Engine knows HOW to execute (interpreter process, harness, timeouts)
/// - Equality is the interpreter's own `==`, reported as a plain verdict
/// - Engine returns raw outcomes; the Evaluator turns them into results
///
/// Production uses `PythonEngine`: one interpreter process per test case, so
/// nothing a case does to module globals can be observed by the next one.

use crate::harness::{parse_report, report_marker, HarnessPayload, HarnessReport, HARNESS_SOURCE};
use async_trait::async_trait;
use debugdojo_common::types::TestCase;
use std::process::Stdio;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tracing::{debug, warn};

/// Safety limit to keep pathological submissions away from the interpreter
const MAX_SOURCE_CODE_BYTES: usize = 1024 * 1024; // 1MB
const MAX_TEST_INPUT_BYTES: usize = 10 * 1024 * 1024; // 10MB
/// Kept from each of the child's stdout and stderr; the rest is drained
const MAX_OUTPUT_BYTES: usize = 1024 * 1024; // 1MB

/// Raw outcome of one test case
#[derive(Debug, Clone, PartialEq)]
pub enum CaseOutcome {
    /// The namespace had no callable bound to the entry-point name
    MissingEntryPoint,
    /// The entry point returned. `passed` is `result == expected` as the
    /// interpreter sees it; the strings are `str()` of each side.
    Returned {
        passed: bool,
        input: String,
        expected: String,
        actual: String,
    },
    /// Compilation, module execution or the call raised
    Raised { error: String, traceback: String },
    /// The per-case deadline passed and the interpreter was killed
    TimedOut { after_ms: u64 },
    /// The interpreter exited without producing a report
    Crashed { exit_code: Option<i32>, stderr: String },
    /// The child wrote more than the kept amount to stdout and no report
    /// survived
    OutputLimitExceeded { limit_bytes: usize },
}

/// Raw execution output for a single test case
/// Produced by an ExecutionEngine, consumed by the Evaluator
#[derive(Debug, Clone, PartialEq)]
pub struct TestExecutionOutput {
    pub outcome: CaseOutcome,
    pub execution_time_ms: u64,
}

/// Infrastructure failures. These still only affect the test case they
/// happened in.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Source code exceeds maximum size of {max} bytes")]
    SourceTooLarge { max: usize },
    #[error("Test input exceeds maximum size of {max} bytes")]
    InputTooLarge { max: usize },
    #[error("Failed to start interpreter `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Interpreter I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("Malformed harness report: {0}")]
    MalformedReport(#[from] serde_json::Error),
}

#[async_trait]
pub trait ExecutionEngine: Send + Sync {
    /// Evaluate `source` in a fresh context, call `entry_point(*input)` and
    /// compare the result with the case's expected value.
    async fn execute(
        &self,
        source: &str,
        entry_point: &str,
        case: &TestCase,
    ) -> Result<TestExecutionOutput, EngineError>;
}

/// Read up to `MAX_OUTPUT_BYTES` from a child pipe, then keep draining so the
/// child never blocks on a full pipe. The flag is set when bytes were dropped.
async fn read_capped<R>(reader: Option<R>) -> std::io::Result<(Vec<u8>, bool)>
where
    R: AsyncRead + Unpin,
{
    let Some(mut reader) = reader else {
        return Ok((Vec::new(), false));
    };
    let mut kept = Vec::new();
    (&mut reader)
        .take(MAX_OUTPUT_BYTES as u64)
        .read_to_end(&mut kept)
        .await?;
    let dropped = tokio::io::copy(&mut reader, &mut tokio::io::sink()).await?;
    Ok((kept, dropped > 0))
}

/// Runs each test case in its own `python -I` process driven by the harness.
///
/// The child environment is cleared except for `PATH`, so process-wide
/// secrets are not visible to submitted code. stdout and stderr are piped;
/// nothing the submission prints reaches the host's own streams.
#[derive(Debug, Clone)]
pub struct PythonEngine {
    program: String,
    timeout: Duration,
}

impl PythonEngine {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg("-I")
            .arg("-c")
            .arg(HARNESS_SOURCE)
            .env_clear()
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(path) = std::env::var_os("PATH") {
            cmd.env("PATH", path);
        }
        cmd
    }
}

#[async_trait]
impl ExecutionEngine for PythonEngine {
    async fn execute(
        &self,
        source: &str,
        entry_point: &str,
        case: &TestCase,
    ) -> Result<TestExecutionOutput, EngineError> {
        if source.len() > MAX_SOURCE_CODE_BYTES {
            return Err(EngineError::SourceTooLarge {
                max: MAX_SOURCE_CODE_BYTES,
            });
        }
        if serde_json::to_vec(case)?.len() > MAX_TEST_INPUT_BYTES {
            return Err(EngineError::InputTooLarge {
                max: MAX_TEST_INPUT_BYTES,
            });
        }

        let marker = report_marker(&uuid::Uuid::new_v4());
        let payload = serde_json::to_vec(&HarnessPayload {
            code: source,
            entry_point,
            case,
            marker: &marker,
        })?;

        let start_time = Instant::now();
        let mut child = self.command().spawn().map_err(|source| EngineError::Spawn {
            program: self.program.clone(),
            source,
        })?;

        // The child is moved into the future: if the deadline fires, dropping
        // the future drops the handle and kill_on_drop reaps the interpreter.
        let execution_future = async move {
            if let Some(mut stdin) = child.stdin.take() {
                if let Err(e) = stdin.write_all(&payload).await {
                    // An interpreter that died early closes its stdin; its
                    // exit status and stderr still tell the story.
                    if e.kind() != std::io::ErrorKind::BrokenPipe {
                        return Err(e);
                    }
                }
            }
            let stdout = child.stdout.take();
            let stderr = child.stderr.take();
            tokio::try_join!(read_capped(stdout), read_capped(stderr), child.wait())
        };

        let output = match tokio::time::timeout(self.timeout, execution_future).await {
            Ok(result) => result?,
            Err(_) => {
                let after_ms = self.timeout.as_millis() as u64;
                warn!(timeout_ms = after_ms, "Test execution timed out; interpreter killed");
                return Ok(TestExecutionOutput {
                    outcome: CaseOutcome::TimedOut { after_ms },
                    execution_time_ms: start_time.elapsed().as_millis() as u64,
                });
            }
        };
        let ((stdout, stdout_truncated), (stderr, _), status) = output;

        let execution_time_ms = start_time.elapsed().as_millis() as u64;
        let stdout = String::from_utf8_lossy(&stdout);

        let outcome = match parse_report(&stdout, &marker) {
            Some(report) => match report? {
                HarnessReport::MissingEntryPoint => CaseOutcome::MissingEntryPoint,
                HarnessReport::Returned {
                    passed,
                    input,
                    expected,
                    actual,
                } => CaseOutcome::Returned {
                    passed,
                    input,
                    expected,
                    actual,
                },
                HarnessReport::Raised { error, traceback } => {
                    CaseOutcome::Raised { error, traceback }
                }
            },
            None if stdout_truncated => {
                warn!(limit_bytes = MAX_OUTPUT_BYTES, "Interpreter output exceeded the limit");
                CaseOutcome::OutputLimitExceeded {
                    limit_bytes: MAX_OUTPUT_BYTES,
                }
            }
            None => {
                let stderr = String::from_utf8_lossy(&stderr).into_owned();
                warn!(
                    exit_code = ?status.code(),
                    stderr_preview = stderr.lines().last().unwrap_or(""),
                    "Interpreter exited without a report"
                );
                CaseOutcome::Crashed {
                    exit_code: status.code(),
                    stderr,
                }
            }
        };

        debug!(execution_time_ms, "Test execution completed");

        Ok(TestExecutionOutput {
            outcome,
            execution_time_ms,
        })
    }
}
