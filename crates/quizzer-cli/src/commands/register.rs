//! The `quizzer register` command.

use std::path::PathBuf;

use anyhow::{Context, Result};

use quizzer_providers::config::load_config_from;
use quizzer_store::Database;

use super::prompt;

pub fn execute(user: String, config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let db = Database::open(&config.db_path)
        .with_context(|| format!("cannot open database at {}", config.db_path.display()))?;

    let password = prompt("Password: ")?;
    let confirmation = prompt("Confirm password: ")?;
    anyhow::ensure!(password == confirmation, "passwords do not match");

    let user_id = db.register_user(&user, &password)?;
    println!("Registered '{user}' (id {user_id}). Start a quiz with: quizzer quiz --user {user} --course <course>");
    Ok(())
}
