//! Scripted in-crate test doubles for the `LanguageModel` and
//! `PassageSource` seams.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::QuizError;
use crate::model::Passage;
use crate::traits::{GenerateRequest, GenerateResponse, LanguageModel, PassageSource};

/// A model that replays scripted responses in order, then repeats the last
/// one. Records call count and the last request for assertions.
pub(crate) struct ScriptedModel {
    responses: Mutex<VecDeque<String>>,
    fallback: String,
    calls: AtomicU32,
    last_request: Mutex<Option<GenerateRequest>>,
}

impl ScriptedModel {
    pub fn with_responses(responses: &[&str]) -> Self {
        let mut queue: VecDeque<String> = responses.iter().map(|s| s.to_string()).collect();
        let fallback = queue.back().cloned().unwrap_or_default();
        // Keep the last response as the repeating fallback.
        queue.pop_back();
        Self {
            responses: Mutex::new(queue),
            fallback,
            calls: AtomicU32::new(0),
            last_request: Mutex::new(None),
        }
    }

    pub fn with_fixed(response: &str) -> Self {
        Self::with_responses(&[response])
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::Relaxed)
    }

    pub fn last_request(&self) -> Option<GenerateRequest> {
        self.last_request.lock().unwrap().clone()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, QuizError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        *self.last_request.lock().unwrap() = Some(request.clone());

        let content = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());

        Ok(GenerateResponse {
            content,
            model: request.model.clone(),
            latency_ms: 1,
        })
    }
}

/// A model whose endpoint is always down.
pub(crate) struct UnreachableModel {
    calls: AtomicU32,
}

impl UnreachableModel {
    pub fn new() -> Self {
        Self {
            calls: AtomicU32::new(0),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl LanguageModel for UnreachableModel {
    fn name(&self) -> &str {
        "unreachable"
    }

    async fn generate(&self, _request: &GenerateRequest) -> Result<GenerateResponse, QuizError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        Err(QuizError::ModelUnavailable(
            "connection refused (test double)".into(),
        ))
    }
}

/// A fixed, in-memory passage source.
pub(crate) struct StaticSource {
    course: String,
    passages: Vec<Passage>,
}

impl StaticSource {
    pub fn new(course: &str, passages: Vec<Passage>) -> Self {
        Self {
            course: course.to_string(),
            passages,
        }
    }

    pub fn single_page(course: &str, text: &str) -> Self {
        Self::new(
            course,
            vec![Passage {
                source_file: "notes.pdf".into(),
                page: 1,
                text: text.into(),
            }],
        )
    }
}

impl PassageSource for StaticSource {
    fn course(&self) -> &str {
        &self.course
    }

    fn passages(&self) -> &[Passage] {
        &self.passages
    }

    fn search(&self, query: &str, top_k: usize) -> Vec<&Passage> {
        let query = query.to_lowercase();
        self.passages
            .iter()
            .filter(|p| {
                query
                    .split_whitespace()
                    .any(|term| p.text.to_lowercase().contains(term))
            })
            .take(top_k)
            .collect()
    }
}
