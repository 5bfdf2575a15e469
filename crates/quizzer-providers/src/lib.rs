//! quizzer-providers — Language model backends.
//!
//! Implements the core `LanguageModel` trait for Ollama (local, the primary
//! backend) and OpenAI-compatible endpoints (the fallback when no local
//! model is running), plus a mock for tests.

pub mod config;
pub mod mock;
pub mod ollama;
pub mod openai;

pub use config::{create_provider, load_config, ProviderConfig, QuizzerConfig};
pub use mock::MockModel;
pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;
