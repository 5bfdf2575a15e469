//! Answer grading engine.
//!
//! Converts an `Answer` + `Question` into a `GradeResult`. Choice questions
//! are scored deterministically; free-text answers go through the language
//! model with the question's rubric and citations. Grading is fail-soft:
//! `grade` never returns an error; a transport failure, timeout, or
//! unusable model verdict produces a zero-point result instead.

use std::sync::Arc;

use serde::Deserialize;
use tracing::warn;

use crate::model::{
    Answer, CriterionCheck, Decision, GradeResult, Question, QuestionType,
};
use crate::traits::{parse_model_json, GenerateRequest, LanguageModel};

/// Free-text answers with fewer meaningful characters than this are rejected
/// before any model call is made.
pub const MIN_ANSWER_CHARS: usize = 5;

/// A rubric criterion counts as met when the model's overall score reaches
/// this fraction.
const CRITERION_MET_SCORE: f64 = 0.70;

/// Configuration for the grading engine.
#[derive(Debug, Clone)]
pub struct GradingConfig {
    /// Model identifier used for free-text verdicts.
    pub model: String,
    /// Sampling temperature; low, grading should be stable.
    pub temperature: f64,
    /// Max tokens for the verdict response.
    pub max_tokens: u32,
}

impl Default for GradingConfig {
    fn default() -> Self {
        Self {
            model: "llama3.2:3b".to_string(),
            temperature: 0.2,
            max_tokens: 1000,
        }
    }
}

/// Structured verdict requested from the model for free-text answers.
#[derive(Debug, Clone, Deserialize)]
struct ModelVerdict {
    /// Overall score in `[0, 1]`.
    #[serde(default)]
    score: f64,
    /// One of "exact", "semantically_correct", "partially_correct",
    /// "incorrect".
    #[serde(default)]
    verdict: String,
    /// The model's own flag that the answer directly contradicts the
    /// reference material.
    #[serde(default)]
    contradiction: bool,
    #[serde(default)]
    justification: String,
    #[serde(default)]
    expected_summary: String,
}

/// Count of characters that survive stripping punctuation and whitespace.
pub fn meaningful_chars(answer: &str) -> usize {
    answer.chars().filter(|c| c.is_alphanumeric()).count()
}

/// Multi-choice scoring ratio: `c/C - ic/IC`, clamped to `[0, 1]`.
///
/// `c` correctly selected, `C` total correct, `ic` incorrectly selected,
/// `IC` total incorrect options. The penalty term is 0 when there are no
/// incorrect options to pick.
pub fn choice_ratio(c: u32, total_correct: u32, ic: u32, total_incorrect: u32) -> f64 {
    if total_correct == 0 {
        return 0.0;
    }
    let reward = c as f64 / total_correct as f64;
    let penalty = if total_incorrect == 0 {
        0.0
    } else {
        ic as f64 / total_incorrect as f64
    };
    (reward - penalty).clamp(0.0, 1.0)
}

/// The answer grading engine.
pub struct GradingEngine {
    model: Arc<dyn LanguageModel>,
    config: GradingConfig,
}

impl GradingEngine {
    pub fn new(model: Arc<dyn LanguageModel>, config: GradingConfig) -> Self {
        Self { model, config }
    }

    /// Grade an answer. Always produces a result; failures during model
    /// evaluation degrade to a zero-point `Incorrect` outcome.
    pub async fn grade(&self, question: &Question, answer: &Answer) -> GradeResult {
        match question.qtype {
            QuestionType::SingleChoice => self.grade_single_choice(question, answer),
            QuestionType::MultiChoice => self.grade_multi_choice(question, answer),
            QuestionType::ShortAnswer | QuestionType::LongAnswer => {
                self.grade_free_text(question, answer).await
            }
        }
    }

    fn grade_single_choice(&self, question: &Question, answer: &Answer) -> GradeResult {
        let selected = answer.selected_choices();
        let choice = selected.iter().next().copied();
        let is_correct = selected.len() == 1
            && choice.is_some_and(|c| question.correct_options.contains(&c));

        let correct_display: String = question
            .correct_options
            .iter()
            .map(|c| c.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        let selected_display = choice.map(|c| c.to_string()).unwrap_or_default();

        let explanation = if is_correct {
            format!("Correct! The answer is {correct_display}.")
        } else {
            format!(
                "Incorrect. You selected '{selected_display}' but the correct answer is {correct_display}."
            )
        };

        GradeResult {
            question_id: question.id.clone(),
            points_awarded: if is_correct { question.max_points } else { 0 },
            points_possible: question.max_points,
            decision: if is_correct {
                Decision::Correct
            } else {
                Decision::Incorrect
            },
            checks: vec![CriterionCheck {
                criterion: "Selected the correct option".into(),
                met: is_correct,
                evidence: format!(
                    "selected '{selected_display}', correct is {correct_display}"
                ),
            }],
            explanation,
            citations: question.citations.clone(),
        }
    }

    fn grade_multi_choice(&self, question: &Question, answer: &Answer) -> GradeResult {
        let selected = answer.selected_choices();
        let correct = &question.correct_options;
        let incorrect = question.incorrect_options();

        let c = selected.intersection(correct).count() as u32;
        let ic = selected.intersection(&incorrect).count() as u32;
        let ratio = choice_ratio(c, correct.len() as u32, ic, incorrect.len() as u32);
        let points = (ratio * question.max_points as f64).round() as u32;
        let decision = Decision::from_percentage(ratio);

        let correct_display: String = correct
            .iter()
            .map(|l| l.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        let citation_note = question
            .citations
            .first()
            .map(|cite| format!(" (See {cite})"))
            .unwrap_or_default();

        GradeResult {
            question_id: question.id.clone(),
            points_awarded: points,
            points_possible: question.max_points,
            decision,
            checks: vec![
                CriterionCheck {
                    criterion: "Selected all correct options".into(),
                    met: c == correct.len() as u32,
                    evidence: format!("chose {c}/{} correct options", correct.len()),
                },
                CriterionCheck {
                    criterion: "No incorrect options selected".into(),
                    met: ic == 0,
                    evidence: format!("chose {ic} incorrect options"),
                },
            ],
            explanation: format!(
                "{decision}. Score: {points}/{} points. Correct answer: {correct_display}{citation_note}",
                question.max_points
            ),
            citations: question.citations.clone(),
        }
    }

    async fn grade_free_text(&self, question: &Question, answer: &Answer) -> GradeResult {
        let raw = answer.free_text();

        // Deterministic guard: trivially empty submissions must never reach
        // the model, which tends to score them leniently.
        let meaningful = meaningful_chars(&raw);
        if meaningful < MIN_ANSWER_CHARS {
            return GradeResult {
                question_id: question.id.clone(),
                points_awarded: 0,
                points_possible: question.max_points,
                decision: Decision::Incorrect,
                checks: vec![CriterionCheck {
                    criterion: "Answer meets the minimum length".into(),
                    met: false,
                    evidence: format!("{meaningful} meaningful characters"),
                }],
                explanation: format!(
                    "Answer is too short to evaluate ({meaningful} meaningful characters)."
                ),
                citations: question.citations.clone(),
            };
        }

        let request = GenerateRequest {
            model: self.config.model.clone(),
            prompt: build_grading_prompt(question, &raw),
            system_prompt: Some(GRADER_SYSTEM_PROMPT.to_string()),
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        let response = match self.model.generate(&request).await {
            Ok(response) => response,
            Err(e) => {
                warn!("free-text evaluation failed for {}: {e}", question.id);
                return self.evaluation_error(question, &e.to_string());
            }
        };

        let verdict: ModelVerdict = match parse_model_json(&response.content) {
            Ok(verdict) => verdict,
            Err(e) => {
                warn!(
                    "unparseable verdict for {}: {e}; raw: {:.120}",
                    question.id, response.content
                );
                return self.evaluation_error(question, "the evaluator returned malformed output");
            }
        };

        let score = verdict.score.clamp(0.0, 1.0);
        let points = (score * question.max_points as f64).round() as u32;
        let percentage = if question.max_points == 0 {
            0.0
        } else {
            points as f64 / question.max_points as f64
        };

        let mut decision = Decision::from_percentage(percentage);
        // A direct contradiction of the reference material must never earn
        // partial credit.
        if verdict.contradiction {
            decision = Decision::Incorrect;
        }

        let checks = question
            .rubric
            .iter()
            .map(|criterion| CriterionCheck {
                criterion: criterion.criterion.clone(),
                met: score >= CRITERION_MET_SCORE,
                evidence: verdict.justification.clone(),
            })
            .collect();

        let verdict_label = if verdict.verdict.is_empty() {
            decision.to_string()
        } else {
            verdict.verdict.replace('_', " ")
        };
        let mut explanation = format!(
            "{verdict_label}. Score: {points}/{} points.\n{}",
            question.max_points, verdict.justification
        );
        if verdict.contradiction {
            explanation.push_str("\nThe answer contradicts the reference material.");
        }
        if !verdict.expected_summary.is_empty() {
            explanation.push_str(&format!("\nExpected: {}", verdict.expected_summary));
        }

        GradeResult {
            question_id: question.id.clone(),
            points_awarded: points,
            points_possible: question.max_points,
            decision,
            checks,
            explanation,
            citations: question.citations.clone(),
        }
    }

    /// Fail-soft outcome when the model could not produce a usable verdict.
    fn evaluation_error(&self, question: &Question, reason: &str) -> GradeResult {
        GradeResult {
            question_id: question.id.clone(),
            points_awarded: 0,
            points_possible: question.max_points,
            decision: Decision::Incorrect,
            checks: vec![],
            explanation: format!(
                "Answer evaluation failed ({reason}). No points awarded; try the question again."
            ),
            citations: question.citations.clone(),
        }
    }
}

const GRADER_SYSTEM_PROMPT: &str = "You are an academic examiner grading a student's answer against \
reference material. Grade fairly: accept synonyms and equivalent phrasing, ignore minor spelling \
issues, penalize missing key points and wrong facts. If the answer states the opposite of the \
reference, set \"contradiction\" to true. Return only valid JSON.";

fn build_grading_prompt(question: &Question, user_answer: &str) -> String {
    let rubric_lines: String = question
        .rubric
        .iter()
        .map(|c| format!("- {} ({} pts)\n", c.criterion, c.points))
        .collect();

    let reference: String = question
        .citations
        .iter()
        .map(|c| format!("[{}] {}\n", c, c.quote))
        .collect();

    format!(
        "Question:\n{}\n\n\
         Correct answer:\n{}\n\n\
         Rubric:\n{}\n\
         Reference material:\n{}\n\
         Student answer:\n{}\n\n\
         Grade the student answer against the rubric. Return ONLY this JSON:\n\
         {{\n  \"score\": 0.0,\n  \"verdict\": \"exact|semantically_correct|partially_correct|incorrect\",\n  \
         \"contradiction\": false,\n  \"justification\": \"...\",\n  \"expected_summary\": \"...\"\n}}",
        question.prompt, question.canonical_answer, rubric_lines, reference, user_answer
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Citation, RubricCriterion};
    use crate::testing::{ScriptedModel, UnreachableModel};
    use std::collections::BTreeSet;

    fn citation() -> Citation {
        Citation {
            source_file: "ml.pdf".into(),
            page: 12,
            quote: "stratified sampling maintains class proportions".into(),
        }
    }

    fn choice_question(qtype: QuestionType, correct: &[char]) -> Question {
        Question {
            id: "q1".into(),
            qtype,
            prompt: "Which options apply?".into(),
            options: vec![
                "A: first".into(),
                "B: second".into(),
                "C: third".into(),
                "D: fourth".into(),
            ],
            correct_options: correct.iter().copied().collect(),
            canonical_answer: String::new(),
            concepts: vec![],
            rubric: vec![RubricCriterion {
                criterion: "Selected the correct options".into(),
                points: 10,
            }],
            max_points: 10,
            citations: vec![citation()],
        }
    }

    fn free_text_question() -> Question {
        Question {
            id: "q2".into(),
            qtype: QuestionType::ShortAnswer,
            prompt: "What does stratified sampling preserve?".into(),
            options: vec![],
            correct_options: BTreeSet::new(),
            canonical_answer: "The class proportions of the original dataset".into(),
            concepts: vec!["stratified sampling".into()],
            rubric: vec![
                RubricCriterion {
                    criterion: "Correctly explains or applies: stratified sampling".into(),
                    points: 7,
                },
                RubricCriterion {
                    criterion: "Answer is complete, accurate, and consistent with the notes"
                        .into(),
                    points: 3,
                },
            ],
            max_points: 10,
            citations: vec![citation()],
        }
    }

    fn engine(model: Arc<dyn LanguageModel>) -> GradingEngine {
        GradingEngine::new(model, GradingConfig::default())
    }

    #[tokio::test]
    async fn single_choice_exact_match() {
        let model = Arc::new(UnreachableModel::new());
        let engine = engine(model.clone());
        let question = choice_question(QuestionType::SingleChoice, &['C']);

        let result = engine
            .grade(&question, &Answer::choices("q1", "c"))
            .await;
        assert_eq!(result.points_awarded, 10);
        assert_eq!(result.decision, Decision::Correct);

        let result = engine
            .grade(&question, &Answer::choices("q1", "A"))
            .await;
        assert_eq!(result.points_awarded, 0);
        assert_eq!(result.decision, Decision::Incorrect);

        // Deterministic path: the model is never consulted.
        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn multi_choice_partial_credit_formula() {
        let engine = engine(Arc::new(UnreachableModel::new()));
        let question = choice_question(QuestionType::MultiChoice, &['A', 'C']);

        // {A, B}: c=1/2, ic=1/2 -> ratio 0 -> 0 points.
        let result = engine
            .grade(&question, &Answer::choices("q1", "A,B"))
            .await;
        assert_eq!(result.points_awarded, 0);
        assert_eq!(result.decision, Decision::Incorrect);

        // {A, C}: ratio 1 -> full points.
        let result = engine
            .grade(&question, &Answer::choices("q1", "A,C"))
            .await;
        assert_eq!(result.points_awarded, 10);
        assert_eq!(result.decision, Decision::Correct);

        // {A}: under-selection -> half credit.
        let result = engine.grade(&question, &Answer::choices("q1", "A")).await;
        assert_eq!(result.points_awarded, 5);
        assert_eq!(result.decision, Decision::PartiallyCorrect);
    }

    #[tokio::test]
    async fn multi_choice_points_stay_in_bounds() {
        let engine = engine(Arc::new(UnreachableModel::new()));
        let question = choice_question(QuestionType::MultiChoice, &['A', 'C']);

        // Selecting only wrong options can never go below zero.
        let result = engine
            .grade(&question, &Answer::choices("q1", "B,D"))
            .await;
        assert_eq!(result.points_awarded, 0);

        // Selecting everything cannot exceed max points.
        let result = engine
            .grade(&question, &Answer::choices("q1", "A,B,C,D"))
            .await;
        assert!(result.points_awarded <= question.max_points);
    }

    #[test]
    fn choice_ratio_clamps_and_guards() {
        assert_eq!(choice_ratio(2, 2, 0, 2), 1.0);
        assert_eq!(choice_ratio(1, 2, 1, 2), 0.0);
        assert_eq!(choice_ratio(0, 2, 2, 2), 0.0);
        // No incorrect options at all: penalty term is zero.
        assert_eq!(choice_ratio(1, 2, 0, 0), 0.5);
        // Degenerate key with no correct options.
        assert_eq!(choice_ratio(0, 0, 1, 2), 0.0);
    }

    #[tokio::test]
    async fn short_answer_guard_skips_model() {
        let model = Arc::new(ScriptedModel::with_fixed(
            r#"{"score": 1.0, "verdict": "exact", "justification": "should not be used"}"#,
        ));
        let engine = engine(model.clone());
        let question = free_text_question();

        for raw in ["", "   ", "a.b!", "... ?!", "hi"] {
            let result = engine.grade(&question, &Answer::text("q2", raw)).await;
            assert_eq!(result.points_awarded, 0, "answer {raw:?}");
            assert_eq!(result.decision, Decision::Incorrect, "answer {raw:?}");
            assert!(result.explanation.contains("too short"));
        }

        // The guard must fire before any model dependency is invoked.
        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn free_text_verdict_maps_to_points_and_decision() {
        let model = Arc::new(ScriptedModel::with_fixed(
            r#"{"score": 0.65, "verdict": "partially_correct", "contradiction": false,
                "justification": "mentions proportions but not classes",
                "expected_summary": "class proportions are preserved"}"#,
        ));
        let engine = engine(model.clone());
        let question = free_text_question();

        let result = engine
            .grade(
                &question,
                &Answer::text("q2", "it preserves the proportions when splitting"),
            )
            .await;

        assert_eq!(result.points_awarded, 7); // round(0.65 * 10)
        assert_eq!(result.decision, Decision::PartiallyCorrect);
        assert_eq!(result.checks.len(), 2);
        assert!(result.checks.iter().all(|c| !c.met)); // 0.65 < 0.70
        assert!(result.explanation.contains("Expected:"));
        assert_eq!(model.calls(), 1);

        // The grading prompt carries rubric and citation content.
        let request = model.last_request().unwrap();
        assert!(request.prompt.contains("stratified sampling"));
        assert!(request.prompt.contains("7 pts"));
    }

    #[tokio::test]
    async fn high_score_marks_criteria_met() {
        let model = Arc::new(ScriptedModel::with_fixed(
            r#"{"score": 0.95, "verdict": "semantically_correct", "justification": "complete"}"#,
        ));
        let engine = engine(model);
        let question = free_text_question();

        let result = engine
            .grade(
                &question,
                &Answer::text("q2", "stratified sampling keeps class proportions intact"),
            )
            .await;
        assert_eq!(result.points_awarded, 10);
        assert_eq!(result.decision, Decision::Correct);
        assert!(result.checks.iter().all(|c| c.met));
    }

    #[tokio::test]
    async fn contradiction_overrides_partial_credit() {
        let model = Arc::new(ScriptedModel::with_fixed(
            r#"{"score": 0.75, "verdict": "partially_correct", "contradiction": true,
                "justification": "claims sampling is random, reference says proportional"}"#,
        ));
        let engine = engine(model);
        let question = free_text_question();

        let result = engine
            .grade(
                &question,
                &Answer::text("q2", "it samples the dataset completely at random"),
            )
            .await;

        // Points follow the score, but a contradiction can never be scored
        // as partial credit.
        assert_eq!(result.decision, Decision::Incorrect);
        assert!(result.explanation.contains("contradicts"));
    }

    #[tokio::test]
    async fn score_outside_unit_interval_is_clamped() {
        let model = Arc::new(ScriptedModel::with_fixed(
            r#"{"score": 3.5, "verdict": "exact", "justification": "overflow"}"#,
        ));
        let engine = engine(model);
        let question = free_text_question();

        let result = engine
            .grade(&question, &Answer::text("q2", "a plausible full answer"))
            .await;
        assert_eq!(result.points_awarded, question.max_points);
    }

    #[tokio::test]
    async fn malformed_verdict_fails_soft() {
        let model = Arc::new(ScriptedModel::with_fixed("I would give this a B+"));
        let engine = engine(model);
        let question = free_text_question();

        let result = engine
            .grade(&question, &Answer::text("q2", "an honest attempt at an answer"))
            .await;
        assert_eq!(result.points_awarded, 0);
        assert_eq!(result.decision, Decision::Incorrect);
        assert!(result.explanation.contains("evaluation failed"));
    }

    #[tokio::test]
    async fn unreachable_model_fails_soft() {
        let engine = engine(Arc::new(UnreachableModel::new()));
        let question = free_text_question();

        let result = engine
            .grade(&question, &Answer::text("q2", "an honest attempt at an answer"))
            .await;
        assert_eq!(result.points_awarded, 0);
        assert_eq!(result.decision, Decision::Incorrect);
    }

    #[tokio::test]
    async fn verdict_wrapped_in_prose_is_recovered() {
        let model = Arc::new(ScriptedModel::with_fixed(
            "Here is my evaluation:\n{\"score\": 0.9, \"verdict\": \"exact\", \"justification\": \"good\"}\nDone.",
        ));
        let engine = engine(model);
        let question = free_text_question();

        let result = engine
            .grade(&question, &Answer::text("q2", "class proportions are preserved"))
            .await;
        assert_eq!(result.points_awarded, 9);
        assert_eq!(result.decision, Decision::Correct);
    }

    #[test]
    fn meaningful_chars_strips_punctuation() {
        assert_eq!(meaningful_chars("a, b! c?"), 3);
        assert_eq!(meaningful_chars("   "), 0);
        assert_eq!(meaningful_chars("entropy"), 7);
    }
}
