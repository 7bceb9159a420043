use axum::{
    handler::HandlerWithoutStateExt,
    middleware,
    routing::{get, post},
    Router,
};
use std::path::Path;
use std::sync::Arc;
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::cors;
use crate::handlers;
use crate::AppState;

pub fn routes(state: Arc<AppState>, static_dir: Option<&Path>) -> Router {
    let api = Router::new()
        .route("/api/health", get(handlers::health_check))
        .route("/api/run-python", post(handlers::run_python))
        .route("/api/generate-code", post(handlers::generate_code))
        .route("/api/metrics", get(handlers::metrics_handler));

    // Anything else is a static asset lookup when a directory is configured
    let api = match static_dir {
        Some(dir) => api.fallback_service(
            ServeDir::new(dir)
                .call_fallback_on_method_not_allowed(true)
                .not_found_service(handlers::not_found.into_service()),
        ),
        None => api.fallback(handlers::not_found),
    };

    api.layer(middleware::from_fn(cors::cors))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
