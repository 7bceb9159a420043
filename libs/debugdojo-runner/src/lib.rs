//! Test execution runner: runs submitted Python against ordered test cases
//! and streams one result per case.

pub mod denylist;
pub mod engine;
pub mod evaluator;
pub mod executor;
pub mod harness;


/// Name of the callable looked up in every fresh namespace.
pub const ENTRY_POINT: &str = "main";

pub use denylist::Denylist;
pub use engine::{CaseOutcome, EngineError, ExecutionEngine, PythonEngine, TestExecutionOutput};
pub use executor::{RunOutcome, RunSummary, TestRunner};
