use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// One unit of work for a streaming session: source code plus the ordered
/// test cases to run it against. Missing fields default to empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRequest {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub test_cases: Vec<TestCase>,
}

/// Positional arguments for the entry point and the value it should return.
///
/// Both fields are kept exactly as sent. A missing field stays `None` (an
/// explicit `null` is `Some(Value::Null)`) and a non-array `input` is passed
/// through, so a malformed case fails on its own instead of failing the
/// whole request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub input: Option<Value>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub expected: Option<Value>,
}

impl TestCase {
    pub fn new(input: Vec<Value>, expected: Value) -> Self {
        Self {
            input: Some(Value::Array(input)),
            expected: Some(expected),
        }
    }
}

fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Success,
    Error,
}

impl std::fmt::Display for TestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TestStatus::Success => write!(f, "success"),
            TestStatus::Error => write!(f, "error"),
        }
    }
}

/// Outcome of a single test case as written to the stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    pub status: TestStatus,
    /// 1-based position of the case in the request
    #[serde(rename = "testCase")]
    pub test_case: usize,
    pub message: String,
}

impl TestResult {
    pub fn passed(&self) -> bool {
        self.status == TestStatus::Success
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HaltStatus {
    Forbidden,
}

/// Whole-run abort emitted before any test case is evaluated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunHalted {
    pub status: HaltStatus,
    pub message: String,
}

/// A single event on the run stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RunEvent {
    TestCase(TestResult),
    Halted(RunHalted),
}

impl RunEvent {
    pub fn forbidden(message: impl Into<String>) -> Self {
        RunEvent::Halted(RunHalted {
            status: HaltStatus::Forbidden,
            message: message.into(),
        })
    }

    /// Label used for metrics and log fields.
    pub fn status_label(&self) -> &'static str {
        match self {
            RunEvent::TestCase(result) => match result.status {
                TestStatus::Success => "success",
                TestStatus::Error => "error",
            },
            RunEvent::Halted(_) => "forbidden",
        }
    }
}

/// One buggy/fixed/explanation triple produced by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedSample {
    pub code: String,
    pub fixed_code: String,
    pub explanation: String,
}

/// The full JSON object the model is instructed to answer with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedBatch {
    pub reasoning: String,
    pub content: Vec<GeneratedSample>,
}
