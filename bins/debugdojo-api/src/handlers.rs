// HTTP route handlers for the DebugDojo API

use axum::{
    body::Bytes,
    extract::State,
    http::header,
    response::{
        sse::{Event, Sse},
        IntoResponse, Json,
    },
};
use debugdojo_common::types::{RunEvent, RunRequest};
use futures_util::stream::{self, Stream};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::ApiError;
use crate::metrics;
use crate::AppState;

/// Events buffered between the run task and the response body; a slow
/// client throttles the run.
const EVENT_BUFFER: usize = 8;

#[derive(Debug, Default, Deserialize)]
pub struct GenerateRequest {
    #[serde(default)]
    pub prompt: String,
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub code: String,
}

/// Bodies are read whatever their declared content type.
fn parse_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|e| ApiError::BadRequest(format!("Invalid JSON body: {}", e)))
}

/// GET /api/health
pub async fn health_check() -> Json<Value> {
    Json(json!({ "status": "OK" }))
}

/// POST /api/run-python - Stream one result event per test case
///
/// The run happens on its own task and holds a concurrency slot until it
/// finishes or the client disconnects. Events reach the client in
/// submission order, each as soon as it is known.
pub async fn run_python(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, ApiError> {
    let request: RunRequest = parse_body(&body)?;
    let run_id = Uuid::new_v4();

    metrics::RUNS_TOTAL.inc();
    info!(
        run_id = %run_id,
        test_count = request.test_cases.len(),
        "Run accepted"
    );

    let (tx, rx) = mpsc::channel::<RunEvent>(EVENT_BUFFER);
    let runner = state.runner.clone();
    let run_slots = state.run_slots.clone();

    tokio::spawn(async move {
        let _permit = match run_slots.acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => {
                error!(run_id = %run_id, "Run slots closed; dropping run");
                return;
            }
        };
        let summary = runner.run(run_id, &request, &tx).await;
        info!(
            run_id = %run_id,
            outcome = ?summary.outcome,
            passed = summary.passed,
            failed = summary.failed,
            "Run finished"
        );
    });

    let events = stream::unfold(rx, |mut rx| async move {
        let event = rx.recv().await?;
        metrics::record_event(&event);
        debug!(status = event.status_label(), "Streaming event");
        Some((Event::default().json_data(&event), rx))
    });

    Ok(Sse::new(events))
}

/// POST /api/generate-code - Return one generated buggy program
pub async fn generate_code(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<GenerateResponse>, ApiError> {
    let request: GenerateRequest = parse_body(&body)?;

    match state.generator.generate(&request.prompt).await {
        Ok(code) => {
            metrics::GENERATIONS_TOTAL.with_label_values(&["ok"]).inc();
            info!(code_len = code.len(), "Code generated");
            Ok(Json(GenerateResponse { code }))
        }
        Err(e) => {
            metrics::GENERATIONS_TOTAL.with_label_values(&["error"]).inc();
            warn!(error = %e, "Code generation failed");
            Err(e.into())
        }
    }
}

/// GET /api/metrics - Prometheus text exposition
pub async fn metrics_handler() -> Result<impl IntoResponse, ApiError> {
    let body = metrics::render().map_err(ApiError::Internal)?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    ))
}

pub async fn not_found() -> ApiError {
    ApiError::NotFound
}
