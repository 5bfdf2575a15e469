//! Application configuration and provider factory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use quizzer_core::traits::LanguageModel;

use crate::ollama::OllamaProvider;
use crate::openai::OpenAiProvider;

/// Configuration for a single model backend.
///
/// Note: custom Debug impl masks API keys to prevent accidental exposure in
/// logs.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProviderConfig {
    Ollama {
        #[serde(default = "default_ollama_url")]
        base_url: String,
    },
    OpenAI {
        api_key: String,
        #[serde(default)]
        base_url: Option<String>,
    },
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderConfig::Ollama { base_url } => f
                .debug_struct("Ollama")
                .field("base_url", base_url)
                .finish(),
            ProviderConfig::OpenAI {
                api_key: _,
                base_url,
            } => f
                .debug_struct("OpenAI")
                .field("api_key", &"***")
                .field("base_url", base_url)
                .finish(),
        }
    }
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

/// Top-level quizzer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizzerConfig {
    /// Backend configurations keyed by name.
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
    /// Default backend to use.
    #[serde(default = "default_provider")]
    pub default_provider: String,
    /// Default model to use.
    #[serde(default = "default_model")]
    pub default_model: String,
    /// Timeout applied to every model request.
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,
    /// Directory holding one subdirectory of note files per course.
    #[serde(default = "default_courses_root")]
    pub courses_root: PathBuf,
    /// SQLite database holding users and quiz attempts.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
    /// Directory session reports are written to.
    #[serde(default = "default_reports_dir")]
    pub reports_dir: PathBuf,
}

fn default_provider() -> String {
    "ollama".to_string()
}
fn default_model() -> String {
    "llama3.2:3b".to_string()
}
fn default_timeout() -> u64 {
    120
}
fn default_courses_root() -> PathBuf {
    PathBuf::from("./courses")
}
fn default_db_path() -> PathBuf {
    PathBuf::from("./quizzer.db")
}
fn default_reports_dir() -> PathBuf {
    PathBuf::from("./quizzer-reports")
}

impl Default for QuizzerConfig {
    fn default() -> Self {
        Self {
            providers: HashMap::new(),
            default_provider: default_provider(),
            default_model: default_model(),
            request_timeout_secs: default_timeout(),
            courses_root: default_courses_root(),
            db_path: default_db_path(),
            reports_dir: default_reports_dir(),
        }
    }
}

impl QuizzerConfig {
    /// Notes directory for a course: `<courses_root>/<course>/notes` when it
    /// exists, otherwise the course directory itself.
    pub fn notes_dir(&self, course: &str) -> PathBuf {
        let nested = self.courses_root.join(course).join("notes");
        if nested.is_dir() {
            nested
        } else {
            self.courses_root.join(course)
        }
    }

    /// Course identifiers: the subdirectories of `courses_root`, sorted.
    pub fn list_courses(&self) -> Vec<String> {
        let mut courses: Vec<String> = match std::fs::read_dir(&self.courses_root) {
            Ok(entries) => entries
                .filter_map(|entry| entry.ok())
                .filter(|entry| entry.path().is_dir())
                .filter_map(|entry| entry.file_name().into_string().ok())
                .filter(|name| !name.starts_with('.'))
                .collect(),
            Err(_) => Vec::new(),
        };
        courses.sort();
        courses
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    while let Some(start) = result.find("${") {
        if let Some(end) = result[start..].find('}') {
            let var_name = &result[start + 2..start + end];
            let value = std::env::var(var_name).unwrap_or_default();
            result = format!("{}{}{}", &result[..start], value, &result[start + end + 1..]);
        } else {
            break;
        }
    }
    result
}

/// Resolve env vars in a provider config.
fn resolve_provider_config(config: &ProviderConfig) -> ProviderConfig {
    match config {
        ProviderConfig::Ollama { base_url } => ProviderConfig::Ollama {
            base_url: resolve_env_vars(base_url),
        },
        ProviderConfig::OpenAI { api_key, base_url } => ProviderConfig::OpenAI {
            api_key: resolve_env_vars(api_key),
            base_url: base_url.as_ref().map(|u| resolve_env_vars(u)),
        },
    }
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `quizzer.toml` in the current directory
/// 2. `~/.config/quizzer/config.toml`
///
/// Environment variable override: `QUIZZER_OPENAI_KEY`.
pub fn load_config() -> Result<QuizzerConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<QuizzerConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("quizzer.toml");
        if local.exists() {
            Some(local)
        } else if let Some(home) = dirs_path() {
            let global = home.join("config.toml");
            global.exists().then_some(global)
        } else {
            None
        }
    };

    let mut config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str::<QuizzerConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => QuizzerConfig::default(),
    };

    // The local backend needs no credentials; make sure it always exists.
    config
        .providers
        .entry("ollama".into())
        .or_insert(ProviderConfig::Ollama {
            base_url: default_ollama_url(),
        });

    // Apply env var overrides
    if let Ok(key) = std::env::var("QUIZZER_OPENAI_KEY") {
        config
            .providers
            .entry("openai".into())
            .or_insert(ProviderConfig::OpenAI {
                api_key: String::new(),
                base_url: None,
            });
        if let Some(ProviderConfig::OpenAI { api_key, .. }) = config.providers.get_mut("openai") {
            *api_key = key;
        }
    }

    // Resolve env vars in all provider configs
    let resolved: HashMap<String, ProviderConfig> = config
        .providers
        .iter()
        .map(|(k, v)| (k.clone(), resolve_provider_config(v)))
        .collect();
    config.providers = resolved;

    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("quizzer"))
}

/// Create a backend instance from its configuration.
pub fn create_provider(
    config: &ProviderConfig,
    timeout_secs: u64,
) -> Result<Arc<dyn LanguageModel>> {
    match config {
        ProviderConfig::Ollama { base_url } => {
            Ok(Arc::new(OllamaProvider::new(base_url, timeout_secs)))
        }
        ProviderConfig::OpenAI { api_key, base_url } => Ok(Arc::new(OpenAiProvider::new(
            api_key,
            base_url.clone(),
            timeout_secs,
        ))),
    }
}
