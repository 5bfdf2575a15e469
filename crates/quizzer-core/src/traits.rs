//! Core trait definitions for language models and passage sources.
//!
//! `LanguageModel` is implemented by the `quizzer-providers` crate and
//! `PassageSource` by the `quizzer-grounding` crate.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::QuizError;
use crate::model::Passage;

// ---------------------------------------------------------------------------
// Language model trait
// ---------------------------------------------------------------------------

/// Trait for generative text backends.
///
/// The synthesizer and grading engine depend on this purely as a
/// text-in/text-out function with a model-name parameter; transport concerns
/// (endpoints, timeouts, auth) live behind it.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Human-readable backend name (e.g. "ollama").
    fn name(&self) -> &str;

    /// Generate text from a prompt.
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, QuizError>;
}

/// Request to generate text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    /// Model identifier (e.g. "llama3.2:3b").
    pub model: String,
    /// The main prompt.
    pub prompt: String,
    /// Optional system prompt override.
    #[serde(default)]
    pub system_prompt: Option<String>,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f64,
}

/// Response from a generation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateResponse {
    /// The raw response content.
    pub content: String,
    /// Model that actually generated the response.
    pub model: String,
    /// Latency in milliseconds.
    pub latency_ms: u64,
}

// ---------------------------------------------------------------------------
// Passage source trait
// ---------------------------------------------------------------------------

/// Read-only access to a course's grounded passages.
///
/// Implementations are immutable after load and safe to share across
/// concurrent question generations without locking.
pub trait PassageSource: Send + Sync {
    /// Course identifier this source was loaded for.
    fn course(&self) -> &str;

    /// All passages, in (file, page) order.
    fn passages(&self) -> &[Passage];

    /// Rank passages by the number of matching query terms
    /// (case-insensitive substring match); ties broken by page order.
    /// Returns at most `top_k` passages, possibly fewer.
    fn search(&self, query: &str, top_k: usize) -> Vec<&Passage>;
}

// ---------------------------------------------------------------------------
// JSON extraction from model output
// ---------------------------------------------------------------------------

/// Extract the outermost JSON object from a model response.
///
/// Local models routinely wrap JSON in prose or markdown fences; the
/// recovery is a brace scan from the first `{` to the last `}`.
pub fn extract_json_object(response: &str) -> Option<&str> {
    let start = response.find('{')?;
    let end = response.rfind('}')?;
    if end > start {
        Some(&response[start..=end])
    } else {
        None
    }
}

/// Parse a typed value out of a model response, tolerating surrounding text.
pub fn parse_model_json<T: DeserializeOwned>(response: &str) -> Result<T, serde_json::Error> {
    match extract_json_object(response) {
        Some(object) => serde_json::from_str(object),
        None => serde_json::from_str(response),
    }
}
