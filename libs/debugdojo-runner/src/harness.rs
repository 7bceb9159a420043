/// Interpreter Harness - the driver each fresh Python process runs
///
/// The harness reads one JSON payload from stdin, evaluates the submission in
/// a brand-new namespace, looks up the entry point by name, invokes it with
/// the case's `input` unpacked as positional arguments and writes exactly one
/// report line to the real stdout, prefixed with the per-case nonce.
///
/// The verdict is the interpreter's own `result == expected`, and input,
/// expected and actual are reported as their `str()` forms. A case missing
/// `input` or `expected`, or with an input that cannot be unpacked, raises
/// inside the guarded block like any other error in the submission.
///
/// Everything the submission prints (module level or inside the call) goes to
/// a scoped in-memory buffer and is discarded. `redirect_stdout` restores the
/// original stream on exit, including when the call raises.

use debugdojo_common::types::TestCase;
use serde::{Deserialize, Serialize};

pub const HARNESS_SOURCE: &str = r#"
import contextlib
import io
import json
import sys
import traceback


def _report(marker, body):
    sys.__stdout__.write(marker + json.dumps(body) + "\n")
    sys.__stdout__.flush()


def _run():
    payload = json.loads(sys.stdin.buffer.read().decode("utf-8"))
    marker = payload["marker"]
    case = payload["case"]
    sink = io.StringIO()
    try:
        namespace = {"__name__": "__submission__", "__builtins__": __builtins__}
        with contextlib.redirect_stdout(sink):
            exec(compile(payload["code"], "<submission>", "exec"), namespace)
        entry = namespace.get(payload["entry_point"])
        if not entry or not callable(entry):
            _report(marker, {"outcome": "missing_entry_point"})
            return
        with contextlib.redirect_stdout(sink):
            result = entry(*case["input"])
        expected = case["expected"]
        _report(marker, {
            "outcome": "returned",
            "passed": bool(result == expected),
            "input": str(case["input"]),
            "expected": str(expected),
            "actual": str(result),
        })
    except Exception as exc:
        _report(marker, {
            "outcome": "raised",
            "error": str(exc),
            "traceback": traceback.format_exc(),
        })


_run()
"#;

/// What the engine writes to the harness' stdin.
#[derive(Debug, Serialize)]
pub struct HarnessPayload<'a> {
    pub code: &'a str,
    pub entry_point: &'a str,
    pub case: &'a TestCase,
    pub marker: &'a str,
}

/// The single line the harness writes back.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum HarnessReport {
    MissingEntryPoint,
    Returned {
        passed: bool,
        input: String,
        expected: String,
        actual: String,
    },
    Raised {
        error: String,
        traceback: String,
    },
}

/// Build the report prefix for one invocation.
pub fn report_marker(nonce: &uuid::Uuid) -> String {
    format!("@@debugdojo-report:{}@@", nonce.simple())
}

/// Find the last marker-tagged report line in the harness' stdout.
///
/// Submissions can write to the raw stdout descriptor; only lines carrying
/// this invocation's marker are considered.
pub fn parse_report(stdout: &str, marker: &str) -> Option<Result<HarnessReport, serde_json::Error>> {
    stdout
        .lines()
        .rev()
        .find_map(|line| line.strip_prefix(marker))
        .map(serde_json::from_str)
}
