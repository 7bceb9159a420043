mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "debugdojo-cli")]
#[command(about = "DebugDojo CLI - Run test cases and generate practice code locally", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a request file ({ code, testCases }) and stream the results
    Run {
        /// Path to the JSON request
        #[arg(short, long)]
        file: PathBuf,

        /// Python interpreter (overrides DEBUGDOJO_PYTHON)
        #[arg(short, long)]
        python: Option<String>,

        /// Per-case timeout in milliseconds (overrides DEBUGDOJO_CASE_TIMEOUT_MS)
        #[arg(short, long)]
        timeout_ms: Option<u64>,
    },

    /// Ask the generative model for a buggy program
    Generate {
        /// Problem description
        #[arg(short, long)]
        prompt: String,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Logs go to stderr; stdout carries only results
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let ok = match cli.command {
        Commands::Run {
            file,
            python,
            timeout_ms,
        } => commands::run_file(&file, python, timeout_ms).await?,
        Commands::Generate { prompt } => {
            commands::generate(&prompt).await?;
            true
        }
    };

    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}
