//! Gemini `generateContent` client.

use crate::error::{GenerationError, Result};
use crate::generator::{parse_batch, CodeGenerator};
use crate::prompt::{RESPONSE_MIME_TYPE, SAMPLES_PER_REQUEST, SYSTEM_INSTRUCTION, TEMPERATURE};
use async_trait::async_trait;
use debugdojo_common::config::GeminiSettings;
use debugdojo_common::types::GeneratedBatch;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<RequestContent<'a>>,
    system_instruction: RequestContent<'a>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    response_mime_type: &'static str,
}

impl<'a> GenerateContentRequest<'a> {
    fn new(prompt: &'a str) -> Self {
        Self {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: prompt }],
            }],
            system_instruction: RequestContent {
                parts: vec![RequestPart {
                    text: SYSTEM_INSTRUCTION,
                }],
            },
            generation_config: GenerationConfig {
                temperature: TEMPERATURE,
                response_mime_type: RESPONSE_MIME_TYPE,
            },
        }
    }
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate, if it has any.
    fn text(self) -> Option<String> {
        let content = self.candidates.into_iter().next()?.content?;
        let text: String = content.parts.into_iter().filter_map(|p| p.text).collect();
        (!text.is_empty()).then_some(text)
    }
}

/// Gemini-backed code generator. Stateless between calls.
pub struct GeminiClient {
    http: Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
}

impl GeminiClient {
    pub fn new(settings: &GeminiSettings) -> Result<Self> {
        let http = Client::builder().timeout(settings.timeout).build()?;
        Ok(Self {
            http,
            api_key: settings.api_key.clone(),
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait]
impl CodeGenerator for GeminiClient {
    async fn generate_batch(&self, prompt: &str) -> Result<GeneratedBatch> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(GenerationError::MissingCredential)?;

        info!(model = %self.model, prompt_len = prompt.len(), "Requesting code samples");

        let response = self
            .http
            .post(self.endpoint())
            .header(API_KEY_HEADER, api_key)
            .json(&GenerateContentRequest::new(prompt))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = match response.text().await {
                Ok(body) => body,
                Err(e) => {
                    debug!(error = %e, "Failed to read upstream error body");
                    String::new()
                }
            };
            warn!(status = status.as_u16(), "Generative model rejected the request");
            return Err(GenerationError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let payload: GenerateContentResponse = response.json().await?;
        let text = payload.text().ok_or(GenerationError::EmptyResponse)?;
        debug!(response_len = text.len(), "Received model text");

        let batch = parse_batch(&text)?;
        if batch.content.len() != SAMPLES_PER_REQUEST {
            warn!(
                expected = SAMPLES_PER_REQUEST,
                received = batch.content.len(),
                "Unexpected number of code samples"
            );
        }
        info!(samples = batch.content.len(), "Received code samples");
        Ok(batch)
    }
}
