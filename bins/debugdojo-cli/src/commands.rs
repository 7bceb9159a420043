// CLI commands: local runs and one-off generation
use anyhow::{Context, Result};
use debugdojo_common::config::Config;
use debugdojo_common::types::{RunEvent, RunRequest};
use debugdojo_gateway::{CodeGenerator, GeminiClient};
use debugdojo_runner::{Denylist, PythonEngine, RunOutcome, TestRunner};
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Load a run request from disk
fn load_request(path: &Path) -> Result<RunRequest> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse {} as a run request", path.display()))
}

/// One event in the same framing the server uses on the wire
fn format_event(event: &RunEvent) -> Result<String> {
    Ok(format!("data: {}\n", serde_json::to_string(event)?))
}

/// Run a request file through the local interpreter, printing each event as
/// soon as it is known. Returns whether every case passed.
pub async fn run_file(path: &Path, python: Option<String>, timeout_ms: Option<u64>) -> Result<bool> {
    let config = Config::from_env().context("Failed to load configuration")?;
    let request = load_request(path)?;

    let program = python.unwrap_or(config.runner.python);
    let timeout = timeout_ms
        .map(Duration::from_millis)
        .unwrap_or(config.runner.case_timeout);

    let engine = PythonEngine::new(program, timeout);
    let denylist = Denylist::new(config.runner.forbidden_marker, config.gemini.api_key);
    let runner = TestRunner::new(Arc::new(engine), denylist);

    let (tx, mut rx) = mpsc::channel::<RunEvent>(8);
    let run = tokio::spawn(async move { runner.run(Uuid::new_v4(), &request, &tx).await });

    let mut stdout = io::stdout();
    while let Some(event) = rx.recv().await {
        writeln!(stdout, "{}", format_event(&event)?)?;
        stdout.flush()?;
    }

    let summary = run.await.context("Run task failed")?;
    match summary.outcome {
        RunOutcome::Forbidden => eprintln!("Run halted before any test case was evaluated"),
        _ => eprintln!("{}/{} test cases passed", summary.passed, summary.total),
    }
    Ok(summary.all_passed())
}

/// Ask the model for samples and print the one selected
pub async fn generate(prompt: &str) -> Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;
    let client = GeminiClient::new(&config.gemini).context("Failed to build generative model client")?;

    eprintln!("🤖 Asking {} for a buggy program...", client.model());
    let code = client.generate(prompt).await.context("Code generation failed")?;
    println!("\n{}", code);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn temp_file(name: &str, content: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("debugdojo-cli-{}-{}", std::process::id(), name));
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_load_request() {
        let path = temp_file(
            "request.json",
            &json!({
                "code": "def main(a, b):\n    return a + b",
                "testCases": [{"input": [1, 2], "expected": 3}]
            })
            .to_string(),
        );

        let request = load_request(&path).unwrap();
        assert_eq!(request.test_cases.len(), 1);
        assert_eq!(request.test_cases[0].expected, Some(json!(3)));
        fs::remove_file(path).ok();
    }

    #[test]
    fn test_load_request_defaults_missing_fields() {
        let path = temp_file("empty.json", "{}");
        let request = load_request(&path).unwrap();
        assert!(request.code.is_empty());
        assert!(request.test_cases.is_empty());
        fs::remove_file(path).ok();
    }

    #[test]
    fn test_load_request_rejects_garbage() {
        let path = temp_file("garbage.json", "not json");
        assert!(load_request(&path).is_err());
        fs::remove_file(path).ok();
    }

    #[test]
    fn test_format_event_matches_wire_framing() {
        let line = format_event(&RunEvent::forbidden("halted")).unwrap();
        assert_eq!(line, "data: {\"status\":\"forbidden\",\"message\":\"halted\"}\n");
    }
}
