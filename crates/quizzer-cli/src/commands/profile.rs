//! The `quizzer profile` command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use comfy_table::Table;

use quizzer_core::rating::compute_rating;
use quizzer_providers::config::load_config_from;
use quizzer_store::Database;

pub fn execute(user: String, config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let db = Database::open(&config.db_path)
        .with_context(|| format!("cannot open database at {}", config.db_path.display()))?;

    let record = db
        .find_user(&user)?
        .with_context(|| format!("no user named '{user}'"))?;
    let stats = db.user_stats(record.id)?;
    let rating = compute_rating(&stats.rating_inputs());

    let mut table = Table::new();
    table.set_header(vec!["Statistic", "Value"]);
    table.add_row(vec!["User".to_string(), stats.username.clone()]);
    table.add_row(vec![
        "Member since".to_string(),
        record.created_at.format("%Y-%m-%d").to_string(),
    ]);
    table.add_row(vec![
        "Quizzes completed".to_string(),
        stats.total_attempts.to_string(),
    ]);
    table.add_row(vec![
        "Questions answered".to_string(),
        stats.total_questions.to_string(),
    ]);
    table.add_row(vec![
        "Average score".to_string(),
        format!("{:.1}%", stats.average_score),
    ]);
    table.add_row(vec![
        "Stars earned".to_string(),
        stats.total_stars.to_string(),
    ]);
    table.add_row(vec![
        "Favorite course".to_string(),
        stats.favorite_course.clone().unwrap_or_else(|| "-".to_string()),
    ]);
    table.add_row(vec![
        "Rating".to_string(),
        format!("{} (level {}/5)", rating.tier, rating.tier.level()),
    ]);

    println!("{table}");
    Ok(())
}
