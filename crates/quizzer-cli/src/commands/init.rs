//! The `quizzer init` command.

use anyhow::Result;

const STARTER_CONFIG: &str = r#"# quizzer configuration

default_provider = "ollama"
default_model = "llama3.2:3b"
request_timeout_secs = 120

# Each course is a subdirectory of this root; its PDFs live either directly
# inside or under a `notes/` subdirectory.
courses_root = "./courses"
db_path = "./quizzer.db"
reports_dir = "./quizzer-reports"

[providers.ollama]
type = "ollama"
base_url = "http://localhost:11434"

# Fallback for when no local model is running. The key may reference an
# environment variable.
# [providers.openai]
# type = "openai"
# api_key = "${OPENAI_API_KEY}"
"#;

pub fn execute() -> Result<()> {
    if std::path::Path::new("quizzer.toml").exists() {
        println!("quizzer.toml already exists, skipping");
    } else {
        std::fs::write("quizzer.toml", STARTER_CONFIG)?;
        println!("Created quizzer.toml");
    }

    if std::path::Path::new("courses").exists() {
        println!("courses/ already exists, skipping");
    } else {
        std::fs::create_dir_all("courses")?;
        println!("Created courses/ (add one subdirectory of PDF notes per course)");
    }

    Ok(())
}
