//! End-to-end pipeline test: generation -> answer -> grading -> persistence
//! -> rating, with a mock model standing in for the endpoint.

use std::collections::HashMap;
use std::sync::Arc;

use quizzer_core::engine::{QuizEngine, QuizEngineConfig};
use quizzer_core::model::{Answer, Decision, Passage, QuestionType};
use quizzer_core::rating::compute_rating;
use quizzer_grounding::GroundingStore;
use quizzer_providers::MockModel;
use quizzer_store::Database;

const GENERATED_ITEM: &str = r#"{
    "type": "short",
    "question": "What does dropout do during training?",
    "answer": "Randomly disables units so features cannot co-adapt",
    "explanation": "From the regularization notes",
    "tags": ["dropout"]
}"#;

const GRADING_VERDICT: &str = r#"{
    "score": 0.8,
    "verdict": "partially_correct",
    "contradiction": false,
    "justification": "Mentions disabled units, misses co-adaptation",
    "expected_summary": "Randomly disables units so features cannot co-adapt"
}"#;

fn mock_model() -> Arc<MockModel> {
    let mut responses = HashMap::new();
    // The synthesizer prompt asks for a quiz question, the grader prompt
    // asks for a graded verdict; route on those phrases.
    responses.insert("quiz question".to_string(), GENERATED_ITEM.to_string());
    responses.insert("Grade the student".to_string(), GRADING_VERDICT.to_string());
    Arc::new(MockModel::new(responses))
}

fn grounding() -> Arc<GroundingStore> {
    Arc::new(GroundingStore::from_passages(
        "ml-dl",
        vec![Passage {
            source_file: "notes.pdf".into(),
            page: 7,
            text: "Dropout randomly disables units during training so that features \
                   cannot co-adapt. It acts as a regularizer for deep networks."
                .into(),
        }],
    ))
}

#[tokio::test]
async fn full_pipeline_from_generation_to_rating() {
    let model = mock_model();
    let mut engine = QuizEngine::new(
        model.clone(),
        grounding(),
        QuizEngineConfig {
            question_count: 1,
            question_types: vec![QuestionType::ShortAnswer],
            ..Default::default()
        },
    );

    // Generation is grounded on the loaded passage.
    let question = engine.next_question().await.unwrap();
    assert_eq!(question.qtype, QuestionType::ShortAnswer);
    assert_eq!(question.citations.len(), 1);
    assert_eq!(question.citations[0].source_file, "notes.pdf");
    assert_eq!(question.citations[0].page, 7);

    // Grading goes through the model and maps onto points and a decision.
    let result = engine
        .submit(
            &question,
            Answer::text(&question.id, "it disables random units while training"),
        )
        .await;
    assert_eq!(result.points_awarded, 8);
    assert_eq!(result.decision, Decision::PartiallyCorrect);

    // One generation call plus one grading call.
    assert_eq!(model.call_count(), 2);

    let report = engine.finish("ada");
    assert_eq!(report.course, "ml-dl");
    assert_eq!(report.score_percentage, 80.0);
    assert_eq!(report.stars_earned, 4);

    // The tracker records the attempt and the rating derives from it.
    let db = Database::open_in_memory().unwrap();
    let user_id = db.register_user("ada", "lovelace1").unwrap();
    db.record_attempt(
        user_id,
        &report.course,
        report.score_percentage,
        report.results.len() as u32,
    )
    .unwrap();

    let stats = db.user_stats(user_id).unwrap();
    assert_eq!(stats.total_attempts, 1);
    assert_eq!(stats.total_stars, 4);
    assert!((stats.accuracy - 0.8).abs() < 1e-9);

    let rating = compute_rating(&stats.rating_inputs());
    assert!(rating.score > 0.0);
}

#[tokio::test]
async fn short_answers_never_reach_the_model_grader() {
    let model = mock_model();
    let mut engine = QuizEngine::new(
        model.clone(),
        grounding(),
        QuizEngineConfig {
            question_count: 1,
            question_types: vec![QuestionType::ShortAnswer],
            ..Default::default()
        },
    );

    let question = engine.next_question().await.unwrap();
    let generation_calls = model.call_count();

    let result = engine
        .submit(&question, Answer::text(&question.id, "idk"))
        .await;
    assert_eq!(result.points_awarded, 0);
    assert_eq!(result.decision, Decision::Incorrect);

    // The too-short guard must short-circuit before the model is consulted.
    assert_eq!(model.call_count(), generation_calls);
}
