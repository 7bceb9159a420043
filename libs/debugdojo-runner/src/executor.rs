/// Run Executor - High-Level Orchestration
///
/// **Responsibility:**
/// Drive one run: denylist pre-check, then each test case in submission
/// order through the engine and the evaluator, pushing every result to the
/// event channel before the next case starts.
///
/// **Architecture:**
/// 1. Denylist check over the whole source (fatal, exactly one event)
/// 2. ExecutionEngine produces a raw outcome per case (engine.rs)
/// 3. Evaluator turns it into a TestResult (evaluator.rs)
/// 4. The result is sent on the channel immediately
///
/// A closed channel means the consumer went away; the run is abandoned at
/// that point and never retried.

use crate::denylist::Denylist;
use crate::engine::ExecutionEngine;
use crate::evaluator;
use crate::ENTRY_POINT;
use debugdojo_common::types::{RunEvent, RunRequest};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every test case produced a result
    Completed,
    /// The denylist fired; no test case was evaluated
    Forbidden,
    /// The consumer disconnected mid-run
    Abandoned,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub outcome: RunOutcome,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
}

impl RunSummary {
    fn new(total: usize) -> Self {
        Self {
            outcome: RunOutcome::Completed,
            total,
            passed: 0,
            failed: 0,
        }
    }

    pub fn all_passed(&self) -> bool {
        self.outcome == RunOutcome::Completed && self.passed == self.total
    }
}

pub struct TestRunner {
    engine: Arc<dyn ExecutionEngine>,
    denylist: Denylist,
}

impl TestRunner {
    pub fn new(engine: Arc<dyn ExecutionEngine>, denylist: Denylist) -> Self {
        Self { engine, denylist }
    }

    /// Execute a run, sending one event per test case as soon as it is known.
    #[instrument(
        skip(self, run_id, request, events),
        fields(run_id = %run_id, test_count = request.test_cases.len())
    )]
    pub async fn run(
        &self,
        run_id: Uuid,
        request: &RunRequest,
        events: &mpsc::Sender<RunEvent>,
    ) -> RunSummary {
        let mut summary = RunSummary::new(request.test_cases.len());
        let run_start = Instant::now();

        if let Some(message) = self.denylist.check(&request.code) {
            warn!(run_id = %run_id, "Submission contains forbidden content; run halted");
            summary.outcome = RunOutcome::Forbidden;
            if events.send(RunEvent::forbidden(message)).await.is_err() {
                debug!(run_id = %run_id, "Consumer gone before forbidden event was delivered");
            }
            return summary;
        }

        info!(
            run_id = %run_id,
            test_count = summary.total,
            source_size = request.code.len(),
            "Starting run"
        );

        for (idx, test_case) in request.test_cases.iter().enumerate() {
            let position = idx + 1;

            if events.is_closed() {
                summary.outcome = RunOutcome::Abandoned;
                break;
            }

            let result = match self
                .engine
                .execute(&request.code, ENTRY_POINT, test_case)
                .await
            {
                Ok(output) => {
                    debug!(
                        run_id = %run_id,
                        test_case = position,
                        execution_ms = output.execution_time_ms,
                        "Test case executed"
                    );
                    evaluator::evaluate_test(position, &output)
                }
                Err(e) => {
                    warn!(run_id = %run_id, test_case = position, error = %e, "Engine failure");
                    evaluator::evaluate_engine_failure(position, &e)
                }
            };

            if result.passed() {
                summary.passed += 1;
            } else {
                summary.failed += 1;
            }

            debug!(
                run_id = %run_id,
                test_case = position,
                status = %result.status,
                "Test result"
            );

            if events.send(RunEvent::TestCase(result)).await.is_err() {
                summary.outcome = RunOutcome::Abandoned;
                break;
            }
        }

        match summary.outcome {
            RunOutcome::Abandoned => warn!(
                run_id = %run_id,
                completed = summary.passed + summary.failed,
                total = summary.total,
                "Consumer disconnected; run abandoned"
            ),
            _ => info!(
                run_id = %run_id,
                passed = summary.passed,
                failed = summary.failed,
                elapsed_ms = run_start.elapsed().as_millis() as u64,
                "Run completed"
            ),
        }

        summary
    }

    /// Run to completion and return every event that was emitted.
    pub async fn run_collect(&self, request: &RunRequest) -> (Vec<RunEvent>, RunSummary) {
        let (tx, mut rx) = mpsc::channel(request.test_cases.len() + 1);
        let summary = self.run(Uuid::new_v4(), request, &tx).await;
        drop(tx);

        let mut events = Vec::with_capacity(request.test_cases.len());
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        (events, summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{CaseOutcome, EngineError, TestExecutionOutput};
    use async_trait::async_trait;
    use debugdojo_common::types::{TestCase, TestStatus};
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Notify;

    /// Returns the sum of the arguments, fails on a negative first argument
    /// and counts how often it was called.
    #[derive(Default)]
    struct AddingEngine {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ExecutionEngine for AddingEngine {
        async fn execute(
            &self,
            _source: &str,
            _entry_point: &str,
            case: &TestCase,
        ) -> Result<TestExecutionOutput, EngineError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let nums: Vec<i64> = case
                .input
                .as_ref()
                .and_then(Value::as_array)
                .map(|args| args.iter().filter_map(Value::as_i64).collect())
                .unwrap_or_default();
            let outcome = if nums.first().is_some_and(|n| *n < 0) {
                CaseOutcome::Raised {
                    error: "negative input".to_string(),
                    traceback: "Traceback (most recent call last):\nValueError: negative input\n"
                        .to_string(),
                }
            } else {
                let sum: i64 = nums.iter().sum();
                let expected = case.expected.clone().unwrap_or(Value::Null);
                CaseOutcome::Returned {
                    passed: expected == json!(sum),
                    input: format!("{:?}", nums),
                    expected: expected.to_string(),
                    actual: sum.to_string(),
                }
            };
            Ok(TestExecutionOutput {
                outcome,
                execution_time_ms: 1,
            })
        }
    }

    struct BrokenEngine;

    #[async_trait]
    impl ExecutionEngine for BrokenEngine {
        async fn execute(
            &self,
            _source: &str,
            _entry_point: &str,
            _case: &TestCase,
        ) -> Result<TestExecutionOutput, EngineError> {
            Err(EngineError::SourceTooLarge { max: 0 })
        }
    }

    /// Passes every case, but the second one waits until released.
    struct GatedEngine {
        calls: AtomicUsize,
        release: Notify,
    }

    #[async_trait]
    impl ExecutionEngine for GatedEngine {
        async fn execute(
            &self,
            _source: &str,
            _entry_point: &str,
            _case: &TestCase,
        ) -> Result<TestExecutionOutput, EngineError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 1 {
                self.release.notified().await;
            }
            Ok(TestExecutionOutput {
                outcome: CaseOutcome::Returned {
                    passed: true,
                    input: "[]".to_string(),
                    expected: "1".to_string(),
                    actual: "1".to_string(),
                },
                execution_time_ms: 1,
            })
        }
    }

    fn case(input: Value, expected: Value) -> TestCase {
        TestCase::new(input.as_array().cloned().unwrap_or_default(), expected)
    }

    fn request(code: &str, cases: Vec<TestCase>) -> RunRequest {
        RunRequest {
            code: code.to_string(),
            test_cases: cases,
        }
    }

    fn runner(engine: Arc<dyn ExecutionEngine>) -> TestRunner {
        TestRunner::new(engine, Denylist::new("GEMINI_API_KEY", None))
    }

    fn statuses(events: &[RunEvent]) -> Vec<(usize, TestStatus)> {
        events
            .iter()
            .map(|e| match e {
                RunEvent::TestCase(r) => (r.test_case, r.status),
                RunEvent::Halted(_) => panic!("unexpected halt event"),
            })
            .collect()
    }

    #[tokio::test]
    async fn test_one_event_per_case_in_order() {
        let cases = (0..5).map(|i| case(json!([i, i]), json!(i * 2))).collect();
        let (events, summary) = runner(Arc::new(AddingEngine::default()))
            .run_collect(&request("def main(a, b): return a + b", cases))
            .await;

        assert_eq!(
            statuses(&events),
            (1..=5).map(|i| (i, TestStatus::Success)).collect::<Vec<_>>()
        );
        assert_eq!(summary.outcome, RunOutcome::Completed);
        assert!(summary.all_passed());
    }

    #[tokio::test]
    async fn test_mismatch_does_not_stop_the_run() {
        let cases = vec![case(json!([1, 2]), json!(3)), case(json!([2, 2]), json!(5))];
        let (events, summary) = runner(Arc::new(AddingEngine::default()))
            .run_collect(&request("def main(a, b): return a + b", cases))
            .await;

        assert_eq!(
            statuses(&events),
            vec![(1, TestStatus::Success), (2, TestStatus::Error)]
        );
        assert_eq!(summary.passed, 1);
        assert_eq!(summary.failed, 1);
        assert!(!summary.all_passed());
    }

    #[tokio::test]
    async fn test_raise_in_middle_case_is_isolated() {
        let cases = vec![
            case(json!([1]), json!(1)),
            case(json!([-1]), json!(-1)),
            case(json!([3]), json!(3)),
        ];
        let (events, _) = runner(Arc::new(AddingEngine::default()))
            .run_collect(&request("def main(x): ...", cases))
            .await;

        assert_eq!(
            statuses(&events),
            vec![
                (1, TestStatus::Success),
                (2, TestStatus::Error),
                (3, TestStatus::Success)
            ]
        );
        match &events[1] {
            RunEvent::TestCase(r) => {
                assert!(r.message.contains("negative input"));
                assert!(r.message.contains("Traceback"));
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_forbidden_marker_short_circuits() {
        let engine = Arc::new(AddingEngine::default());
        let cases = (0..4).map(|i| case(json!([i]), json!(i))).collect();
        let (events, summary) = runner(engine.clone())
            .run_collect(&request("import os\nos.environ['GEMINI_API_KEY']", cases))
            .await;

        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], RunEvent::Halted(_)));
        assert_eq!(summary.outcome, RunOutcome::Forbidden);
        assert_eq!(engine.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_engine_failure_is_reported_per_case() {
        let cases = vec![case(json!([1]), json!(1)), case(json!([2]), json!(2))];
        let (events, summary) = runner(Arc::new(BrokenEngine))
            .run_collect(&request("def main(x): return x", cases))
            .await;

        assert_eq!(
            statuses(&events),
            vec![(1, TestStatus::Error), (2, TestStatus::Error)]
        );
        assert_eq!(summary.outcome, RunOutcome::Completed);
    }

    #[tokio::test]
    async fn test_empty_request_emits_nothing() {
        let (events, summary) = runner(Arc::new(AddingEngine::default()))
            .run_collect(&request("", vec![]))
            .await;

        assert!(events.is_empty());
        assert_eq!(summary.outcome, RunOutcome::Completed);
    }

    #[tokio::test]
    async fn test_closed_consumer_abandons_run() {
        let engine = Arc::new(AddingEngine::default());
        let cases = (0..10).map(|i| case(json!([i]), json!(i))).collect();
        let (tx, rx) = mpsc::channel(1);
        drop(rx);

        let summary = runner(engine.clone())
            .run(Uuid::new_v4(), &request("def main(x): return x", cases), &tx)
            .await;

        assert_eq!(summary.outcome, RunOutcome::Abandoned);
        assert_eq!(engine.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_each_result_is_sent_before_next_case_runs() {
        let engine = Arc::new(GatedEngine {
            calls: AtomicUsize::new(0),
            release: Notify::new(),
        });
        let runner = Arc::new(runner(engine.clone()));
        let req = request("def main(): return 1", (0..2).map(|_| case(json!([]), json!(1))).collect());
        let (tx, mut rx) = mpsc::channel(1);

        let handle = {
            let runner = runner.clone();
            tokio::spawn(async move { runner.run(Uuid::new_v4(), &req, &tx).await })
        };

        let first = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("first result arrives while the second case is still running")
            .unwrap();
        assert!(matches!(first, RunEvent::TestCase(ref r) if r.test_case == 1));
        assert!(!handle.is_finished());

        engine.release.notify_one();
        let second = rx.recv().await.unwrap();
        assert!(matches!(second, RunEvent::TestCase(ref r) if r.test_case == 2));
        assert_eq!(handle.await.unwrap().outcome, RunOutcome::Completed);
    }

    #[tokio::test]
    async fn test_incomplete_case_does_not_stop_the_run() {
        let cases = vec![
            case(json!([1]), json!(1)),
            TestCase {
                input: Some(json!([2])),
                expected: None,
            },
            case(json!([3]), json!(3)),
        ];
        let (events, _) = runner(Arc::new(AddingEngine::default()))
            .run_collect(&request("def main(x): return x", cases))
            .await;

        assert_eq!(
            statuses(&events),
            vec![
                (1, TestStatus::Success),
                (2, TestStatus::Error),
                (3, TestStatus::Success)
            ]
        );
    }

    #[tokio::test]
    async fn test_rerun_is_idempotent() {
        let runner = runner(Arc::new(AddingEngine::default()));
        let req = request(
            "def main(a, b): return a + b",
            vec![case(json!([1, 2]), json!(3)), case(json!([2, 2]), json!(5))],
        );

        let (first, _) = runner.run_collect(&req).await;
        let (second, _) = runner.run_collect(&req).await;
        assert_eq!(statuses(&first), statuses(&second));
    }
}
