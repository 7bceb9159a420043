mod cors;
mod error;
mod handlers;
mod metrics;
mod routes;


use anyhow::Context;
use debugdojo_common::config::{Config, LogFormat};
use debugdojo_gateway::{CodeGenerator, GeminiClient};
use debugdojo_runner::{Denylist, PythonEngine, TestRunner};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

pub struct AppState {
    pub runner: Arc<TestRunner>,
    pub generator: Arc<dyn CodeGenerator>,
    /// Bounds how many runs execute at once across all clients
    pub run_slots: Arc<Semaphore>,
}

fn init_tracing(format: LogFormat) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false);

    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    info!("Shutdown signal received, draining connections");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;
    init_tracing(config.log_format);

    info!("DebugDojo API booting...");

    let engine = PythonEngine::new(config.runner.python.clone(), config.runner.case_timeout);
    info!(
        python = %engine.program(),
        case_timeout_ms = engine.timeout().as_millis() as u64,
        max_concurrent_runs = config.runner.max_concurrent_runs,
        "Execution engine configured"
    );

    let denylist = Denylist::new(
        config.runner.forbidden_marker.clone(),
        config.gemini.api_key.clone(),
    );
    let runner = TestRunner::new(Arc::new(engine), denylist);

    let generator =
        GeminiClient::new(&config.gemini).context("Failed to build generative model client")?;
    if config.gemini.api_key.is_none() {
        warn!("GEMINI_API_KEY is not set; /api/generate-code will answer with errors");
    } else {
        info!(model = %generator.model(), "Generative model configured");
    }

    let state = Arc::new(AppState {
        runner: Arc::new(runner),
        generator: Arc::new(generator),
        run_slots: Arc::new(Semaphore::new(config.runner.max_concurrent_runs)),
    });

    if let Some(dir) = &config.static_dir {
        info!("Serving static files from {}", dir.display());
    }
    let app = routes::routes(state, config.static_dir.as_deref());

    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    info!("HTTP server listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}
