// Request-level failures that end an exchange with a JSON error body

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use debugdojo_gateway::GenerationError;
use serde_json::json;

#[derive(Debug)]
pub enum ApiError {
    /// Body could not be read or parsed; nothing was processed
    BadRequest(String),
    /// The generative model call failed; no partial content
    Generation(GenerationError),
    NotFound,
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Generation(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::BadRequest(msg) => msg.clone(),
            ApiError::Generation(e) => e.to_string(),
            ApiError::NotFound => "Not Found".to_string(),
            ApiError::Internal(msg) => msg.clone(),
        }
    }
}

impl From<GenerationError> for ApiError {
    fn from(e: GenerationError) -> Self {
        ApiError::Generation(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.message() }))).into_response()
    }
}
