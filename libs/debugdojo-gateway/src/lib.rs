//! Code generation gateway: turns a problem description into one buggy
//! `main` implementation via a generative model.

pub mod error;
pub mod gemini;
pub mod generator;
pub mod prompt;

pub use error::GenerationError;
pub use gemini::GeminiClient;
pub use generator::{select_sample, CodeGenerator};
