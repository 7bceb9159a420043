use thiserror::Error;

/// Everything that can go wrong turning a prompt into a code sample.
/// None of these are retried.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("GEMINI_API_KEY is not configured")]
    MissingCredential,
    #[error("Request to the generative model failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Generative model returned HTTP {status}: {body}")]
    Upstream { status: u16, body: String },
    #[error("Generative model returned no text")]
    EmptyResponse,
    #[error("Generative model returned malformed JSON: {0}")]
    MalformedJson(#[from] serde_json::Error),
    #[error("Generative model returned no code samples")]
    EmptySampleSet,
}

pub type Result<T> = std::result::Result<T, GenerationError>;
