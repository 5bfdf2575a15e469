//! The `quizzer check` command.

use std::path::PathBuf;

use anyhow::Result;

use quizzer_providers::config::{load_config_from, ProviderConfig};
use quizzer_providers::OllamaProvider;

pub async fn execute(config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;

    println!(
        "Default: {} / {}",
        config.default_provider, config.default_model
    );

    for (name, provider) in &config.providers {
        match provider {
            ProviderConfig::Ollama { base_url } => {
                let ollama = OllamaProvider::new(base_url, config.request_timeout_secs);
                match ollama.list_models().await {
                    Ok(models) => {
                        println!("{name}: reachable at {base_url}, {} model(s)", models.len());
                        let default_present = models.iter().any(|m| m == &config.default_model);
                        if name == &config.default_provider && !default_present {
                            println!(
                                "  note: default model '{}' is not pulled. Run: ollama pull {}",
                                config.default_model, config.default_model
                            );
                        }
                        for model in models {
                            println!("  - {model}");
                        }
                    }
                    Err(e) => anyhow::bail!("{name}: {e}"),
                }
            }
            ProviderConfig::OpenAI { base_url, .. } => {
                println!(
                    "{name}: configured for {}",
                    base_url.as_deref().unwrap_or("https://api.openai.com")
                );
            }
        }
    }

    Ok(())
}
