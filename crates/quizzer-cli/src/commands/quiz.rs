//! The `quizzer quiz` command: one interactive session.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};

use quizzer_core::engine::{QuizEngine, QuizEngineConfig};
use quizzer_core::error::QuizError;
use quizzer_core::grading::GradingConfig;
use quizzer_core::model::{Answer, GradeResult, Question, QuestionType};
use quizzer_core::rating::compute_rating;
use quizzer_core::synthesis::SynthesizerConfig;
use quizzer_grounding::GroundingStore;
use quizzer_providers::config::load_config_from;
use quizzer_providers::create_provider;
use quizzer_store::Database;

use super::prompt;

/// Consecutive generation failures tolerated before the session is cut short.
const MAX_CONSECUTIVE_FAILURES: u32 = 3;

pub async fn execute(
    user: String,
    course: String,
    questions: u32,
    types: String,
    topic: Option<String>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    anyhow::ensure!(questions >= 1, "a session needs at least one question");
    let question_types = parse_types(&types)?;

    let config = load_config_from(config_path.as_deref())?;

    let db = Database::open(&config.db_path)
        .with_context(|| format!("cannot open database at {}", config.db_path.display()))?;
    let password = prompt("Password: ")?;
    let record = db.login_user(&user, &password)?;

    let store = GroundingStore::load(&course, &config.notes_dir(&course))
        .with_context(|| format!("course '{course}' has no material"))?;

    let provider_config = config
        .providers
        .get(&config.default_provider)
        .with_context(|| format!("provider '{}' not configured", config.default_provider))?;
    let model = create_provider(provider_config, config.request_timeout_secs)?;

    let engine_config = QuizEngineConfig {
        question_count: questions,
        question_types,
        topic,
        synthesizer: SynthesizerConfig {
            model: config.default_model.clone(),
            ..Default::default()
        },
        grading: GradingConfig {
            model: config.default_model.clone(),
            ..Default::default()
        },
    };
    let mut engine = QuizEngine::new(model, Arc::new(store), engine_config);

    println!(
        "\nStarting {questions}-question quiz on '{course}' for {}. Answers are graded by {}.\n",
        record.username, config.default_model
    );

    let mut consecutive_failures = 0u32;
    while !engine.is_complete() {
        let question = match engine.next_question().await {
            Ok(question) => {
                consecutive_failures = 0;
                question
            }
            Err(e @ QuizError::GenerationFailed { .. }) => {
                consecutive_failures += 1;
                eprintln!("Could not generate a question ({e}), trying again...");
                if consecutive_failures >= MAX_CONSECUTIVE_FAILURES {
                    eprintln!("Giving up after {consecutive_failures} failed generations.");
                    break;
                }
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        present_question(&question, engine.progress().answered + 1, questions);

        let raw = prompt("> ")?;
        let answer = if question.qtype.is_choice() {
            Answer::choices(&question.id, &raw)
        } else {
            Answer::text(&question.id, &raw)
        };

        let result = engine.submit(&question, answer).await;
        present_result(&result);

        let progress = engine.progress();
        println!(
            "Score so far: {}/{} points ({}/{} questions)\n",
            progress.points, progress.max_points, progress.answered, progress.total
        );
    }

    let report = engine.finish(&record.username);
    if report.results.is_empty() {
        println!("No questions were answered; nothing to record.");
        return Ok(());
    }

    println!("Quiz complete! {}", report.summary_line());

    // A failed write must not look like success, but the session result is
    // still in the user's hands via the report below.
    match db.record_attempt(
        record.id,
        &course,
        report.score_percentage,
        report.results.len() as u32,
    ) {
        Ok(_) => {
            if let Ok(stats) = db.user_stats(record.id) {
                let rating = compute_rating(&stats.rating_inputs());
                println!(
                    "Total stars: {} | Rating: {} (level {}/5)",
                    stats.total_stars,
                    rating.tier,
                    rating.tier.level()
                );
            }
        }
        Err(e) => eprintln!("Warning: attempt was not recorded: {e}"),
    }

    let report_path = config
        .reports_dir
        .join(format!("session-{}.json", report.id));
    report.save_json(&report_path)?;
    println!("Session report: {}", report_path.display());

    Ok(())
}

fn parse_types(types: &str) -> Result<Vec<QuestionType>> {
    types
        .split(',')
        .map(|t| {
            t.trim()
                .parse::<QuestionType>()
                .map_err(|e| anyhow::anyhow!(e))
        })
        .collect()
}

fn present_question(question: &Question, number: u32, total: u32) {
    println!("--- Question {number}/{total} [{}] ---", question.qtype);
    println!("{}\n", question.prompt);
    for option in &question.options {
        println!("  {option}");
    }
    if question.qtype == QuestionType::MultiChoice {
        println!("\n(select all that apply, e.g. \"A,C\")");
    }
}

fn present_result(result: &GradeResult) {
    println!("\n{}", result.explanation);
    for check in &result.checks {
        let mark = if check.met { "+" } else { "-" };
        println!("  [{mark}] {}", check.criterion);
    }
    for citation in &result.citations {
        println!("  see {citation}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_types_accepts_aliases() {
        let types = parse_types("short_answer, mcq").unwrap();
        assert_eq!(
            types,
            vec![QuestionType::ShortAnswer, QuestionType::SingleChoice]
        );
        assert!(parse_types("essay").is_err());
    }
}
