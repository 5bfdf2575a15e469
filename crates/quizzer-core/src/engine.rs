//! Quiz session engine.
//!
//! Drives one interactive session: generates questions lazily, grades
//! submitted answers, accumulates results, and produces the final
//! `SessionReport`. One engine instance per active session.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use rand::Rng;
use uuid::Uuid;

use crate::error::QuizError;
use crate::grading::{GradingConfig, GradingEngine};
use crate::model::{Answer, GradeResult, Question, QuestionType};
use crate::rating::stars_for_score;
use crate::report::SessionReport;
use crate::synthesis::{QuestionSynthesizer, SynthesizerConfig};
use crate::traits::{LanguageModel, PassageSource};

/// Configuration for one quiz session.
#[derive(Debug, Clone)]
pub struct QuizEngineConfig {
    /// Number of questions in the session.
    pub question_count: u32,
    /// Types to sample from when generating; one is picked per question.
    pub question_types: Vec<QuestionType>,
    /// Optional topic restriction for passage selection.
    pub topic: Option<String>,
    pub synthesizer: SynthesizerConfig,
    pub grading: GradingConfig,
}

impl Default for QuizEngineConfig {
    fn default() -> Self {
        Self {
            question_count: 10,
            question_types: vec![QuestionType::ShortAnswer],
            topic: None,
            synthesizer: SynthesizerConfig::default(),
            grading: GradingConfig::default(),
        }
    }
}

/// Session progress snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub answered: u32,
    pub total: u32,
    pub points: u32,
    pub max_points: u32,
}

/// The quiz session engine.
pub struct QuizEngine {
    synthesizer: QuestionSynthesizer,
    grader: GradingEngine,
    source: Arc<dyn PassageSource>,
    question_count: u32,
    question_types: Vec<QuestionType>,
    topic: Option<String>,
    /// Lowercased prompts already issued, for duplicate rejection.
    seen_prompts: HashSet<String>,
    results: Vec<GradeResult>,
    issued: u32,
    started_at: chrono::DateTime<Utc>,
    started: Instant,
}

impl QuizEngine {
    pub fn new(
        model: Arc<dyn LanguageModel>,
        source: Arc<dyn PassageSource>,
        config: QuizEngineConfig,
    ) -> Self {
        Self {
            synthesizer: QuestionSynthesizer::new(Arc::clone(&model), config.synthesizer),
            grader: GradingEngine::new(model, config.grading),
            source,
            question_count: config.question_count,
            question_types: config.question_types,
            topic: config.topic,
            seen_prompts: HashSet::new(),
            results: Vec::new(),
            issued: 0,
            started_at: Utc::now(),
            started: Instant::now(),
        }
    }

    pub fn course(&self) -> &str {
        self.source.course()
    }

    pub fn is_complete(&self) -> bool {
        self.results.len() as u32 >= self.question_count
    }

    /// Generate the next question on demand.
    pub async fn next_question(&mut self) -> Result<Question, QuizError> {
        let qtype = match self.question_types.len() {
            0 => QuestionType::ShortAnswer,
            1 => self.question_types[0],
            n => self.question_types[rand::rng().random_range(0..n)],
        };
        let id = format!("q{}", self.issued + 1);

        let question = self
            .synthesizer
            .generate(
                self.source.as_ref(),
                self.topic.as_deref(),
                qtype,
                &id,
                &self.seen_prompts,
            )
            .await?;

        self.seen_prompts.insert(question.prompt.to_lowercase());
        self.issued += 1;
        Ok(question)
    }

    /// Grade an answer and append the result to the session history.
    pub async fn submit(&mut self, question: &Question, answer: Answer) -> GradeResult {
        let result = self.grader.grade(question, &answer).await;
        self.results.push(result.clone());
        result
    }

    pub fn progress(&self) -> Progress {
        Progress {
            answered: self.results.len() as u32,
            total: self.question_count,
            points: self.results.iter().map(|r| r.points_awarded).sum(),
            max_points: self.results.iter().map(|r| r.points_possible).sum(),
        }
    }

    /// Close the session and produce its report.
    pub fn finish(self, username: &str) -> SessionReport {
        let total_points: u32 = self.results.iter().map(|r| r.points_awarded).sum();
        let max_points: u32 = self.results.iter().map(|r| r.points_possible).sum();
        let score_percentage = if max_points > 0 {
            total_points as f64 / max_points as f64 * 100.0
        } else {
            0.0
        };

        SessionReport {
            id: Uuid::new_v4(),
            created_at: self.started_at,
            username: username.to_string(),
            course: self.source.course().to_string(),
            results: self.results,
            total_points,
            max_points,
            score_percentage,
            stars_earned: stars_for_score(score_percentage),
            duration_ms: self.started.elapsed().as_millis() as u64,
        }
    }
}
