//! Ollama (local LLM) backend.

use std::time::Instant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use quizzer_core::error::QuizError;
use quizzer_core::traits::{GenerateRequest, GenerateResponse, LanguageModel};

pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";
/// Local models are slow; leave generous room before declaring a timeout.
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Ollama local model backend.
pub struct OllamaProvider {
    base_url: String,
    timeout_secs: u64,
    client: reqwest::Client,
}

impl OllamaProvider {
    pub fn new(base_url: &str, timeout_secs: u64) -> Self {
        let base = if base_url.is_empty() {
            DEFAULT_BASE_URL
        } else {
            base_url
        };

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .expect("failed to build HTTP client");

        Self {
            base_url: base.trim_end_matches('/').to_string(),
            timeout_secs,
            client,
        }
    }

    /// Model names available on the local instance, via `/api/tags`.
    pub async fn list_models(&self) -> Result<Vec<String>, QuizError> {
        let response = self
            .client
            .get(format!("{}/api/tags", self.base_url))
            .send()
            .await
            .map_err(|_| {
                QuizError::ModelUnavailable(format!(
                    "Ollama not reachable at {}. Is it running? Start with: ollama serve",
                    self.base_url
                ))
            })?;

        let tags: OllamaTagsResponse = response.json().await.map_err(|e| QuizError::Api {
            status: 0,
            message: format!("failed to parse tags response: {e}"),
        })?;

        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }
}

#[derive(Serialize)]
struct OllamaRequest {
    model: String,
    messages: Vec<OllamaMessage>,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f64,
    num_predict: u32,
}

#[derive(Deserialize)]
struct OllamaResponse {
    message: OllamaResponseMessage,
    model: String,
}

#[derive(Deserialize)]
struct OllamaResponseMessage {
    content: String,
}

#[derive(Deserialize)]
struct OllamaTagsResponse {
    models: Vec<OllamaModelEntry>,
}

#[derive(Deserialize)]
struct OllamaModelEntry {
    name: String,
}

#[async_trait]
impl LanguageModel for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    #[instrument(skip(self, request), fields(model = %request.model))]
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, QuizError> {
        let start = Instant::now();

        let mut messages = Vec::new();
        if let Some(system) = &request.system_prompt {
            messages.push(OllamaMessage {
                role: "system".to_string(),
                content: system.clone(),
            });
        }
        messages.push(OllamaMessage {
            role: "user".to_string(),
            content: request.prompt.clone(),
        });

        let body = OllamaRequest {
            model: request.model.clone(),
            messages,
            stream: false,
            options: OllamaOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
            },
        };

        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    QuizError::Timeout(self.timeout_secs)
                } else if e.is_connect() {
                    QuizError::ModelUnavailable(format!(
                        "Ollama not reachable at {}. Is it running? Start with: ollama serve",
                        self.base_url
                    ))
                } else {
                    QuizError::ModelUnavailable(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        if status == 404 {
            return Err(QuizError::Api {
                status,
                message: format!(
                    "model '{}' not found locally. Pull it with: ollama pull {}",
                    request.model, request.model
                ),
            });
        }
        if status >= 400 {
            let message = response.text().await.unwrap_or_default();
            return Err(QuizError::Api { status, message });
        }

        let api_response: OllamaResponse = response.json().await.map_err(|e| QuizError::Api {
            status: 0,
            message: format!("failed to parse response: {e}"),
        })?;

        Ok(GenerateResponse {
            content: api_response.message.content,
            model: api_response.model,
            latency_ms: start.elapsed().as_millis() as u64,
        })
    }
}
