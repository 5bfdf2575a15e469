//! Question synthesizer.
//!
//! Produces one grounded `Question` per invocation: samples a passage from
//! the course material, asks the model for a structured quiz item, validates
//! the returned structure, and retries a bounded number of times before
//! giving up with `GenerationFailed`.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use rand::Rng;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::QuizError;
use crate::model::{
    extract_quote, option_label, parse_choice_set, Citation, Passage, Question, QuestionType,
    RubricCriterion,
};
use crate::traits::{parse_model_json, GenerateRequest, LanguageModel, PassageSource};

/// Words kept when quoting the grounded passage in a citation.
const QUOTE_MAX_WORDS: usize = 25;
/// Context window around a topic match when quoting it.
const EXCERPT_WINDOW_BYTES: usize = 150;
/// Source text handed to the model per question.
const CONTENT_CHUNK_BYTES: usize = 1000;
/// Generated prompts shorter than this are considered degenerate.
const MIN_PROMPT_CHARS: usize = 10;

/// Configuration for the question synthesizer.
#[derive(Debug, Clone)]
pub struct SynthesizerConfig {
    /// Model identifier used for generation.
    pub model: String,
    /// Sampling temperature; high, questions should vary.
    pub temperature: f64,
    /// Max tokens for one generated item.
    pub max_tokens: u32,
    /// Additional attempts after a structurally invalid item.
    pub max_retries: u32,
    /// Points every generated question is worth.
    pub max_points: u32,
    /// Passages considered when a topic is given.
    pub search_hits: usize,
}

impl Default for SynthesizerConfig {
    fn default() -> Self {
        Self {
            model: "llama3.2:3b".to_string(),
            temperature: 0.8,
            max_tokens: 500,
            max_retries: 2,
            max_points: 10,
            search_hits: 3,
        }
    }
}

/// A structured quiz item as returned by the model.
#[derive(Debug, Default, Deserialize)]
struct ModelItem {
    #[serde(default)]
    question: String,
    /// "mcq", "true_false", or "short".
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    choices: Vec<String>,
    #[serde(default)]
    answer: AnswerField,
    #[serde(default)]
    #[allow(dead_code)]
    explanation: String,
    #[serde(default)]
    tags: Vec<String>,
}

/// Models return the answer either as a string or as a list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AnswerField {
    One(String),
    Many(Vec<String>),
}

impl Default for AnswerField {
    fn default() -> Self {
        AnswerField::One(String::new())
    }
}

impl AnswerField {
    fn labels(&self) -> BTreeSet<char> {
        match self {
            AnswerField::One(s) => parse_choice_set(s),
            AnswerField::Many(v) => v.iter().filter_map(|s| option_label(s)).collect(),
        }
    }

    fn text(&self) -> String {
        match self {
            AnswerField::One(s) => s.clone(),
            AnswerField::Many(v) => v.join(", "),
        }
    }
}

/// Envelope for models that wrap the item in an `items` array.
#[derive(Debug, Deserialize)]
struct ModelItemEnvelope {
    #[serde(default)]
    items: Vec<ModelItem>,
}

/// The question synthesizer.
pub struct QuestionSynthesizer {
    model: Arc<dyn LanguageModel>,
    config: SynthesizerConfig,
}

impl QuestionSynthesizer {
    pub fn new(model: Arc<dyn LanguageModel>, config: SynthesizerConfig) -> Self {
        Self { model, config }
    }

    /// Generate one grounded question of the requested type.
    ///
    /// `seen_prompts` holds lowercased prompts already issued this session;
    /// duplicates are rejected during validation. Structural failures are
    /// retried up to `max_retries` additional times; `ModelUnavailable`
    /// propagates immediately since retrying cannot help.
    pub async fn generate(
        &self,
        source: &dyn PassageSource,
        topic: Option<&str>,
        qtype: QuestionType,
        question_id: &str,
        seen_prompts: &HashSet<String>,
    ) -> Result<Question, QuizError> {
        let candidates: Vec<&Passage> = match topic {
            Some(t) => {
                let hits = source.search(t, self.config.search_hits);
                if hits.is_empty() {
                    source.passages().iter().collect()
                } else {
                    hits
                }
            }
            None => source.passages().iter().collect(),
        };
        if candidates.is_empty() {
            return Err(QuizError::DocumentUnavailable(source.course().to_string()));
        }

        let attempts = self.config.max_retries + 1;
        let mut last_reason = String::from("no attempt made");

        for attempt in 1..=attempts {
            let passage = candidates[rand::rng().random_range(0..candidates.len())];
            let chunk = content_chunk(&passage.text, CONTENT_CHUNK_BYTES);

            let request = GenerateRequest {
                model: self.config.model.clone(),
                prompt: build_item_prompt(topic, &chunk, qtype),
                system_prompt: Some(
                    "Generate one quiz question from the provided notes. Return ONLY valid JSON."
                        .to_string(),
                ),
                max_tokens: self.config.max_tokens,
                temperature: self.config.temperature,
            };

            let response = match self.model.generate(&request).await {
                Ok(response) => response,
                Err(e @ QuizError::ModelUnavailable(_)) => return Err(e),
                Err(e) => {
                    warn!("generation attempt {attempt}/{attempts} failed: {e}");
                    last_reason = e.to_string();
                    continue;
                }
            };

            match self.build_question(
                &response.content,
                qtype,
                question_id,
                passage,
                topic,
                seen_prompts,
            ) {
                Ok(question) => {
                    debug!(
                        "generated {} question '{}' on attempt {attempt}",
                        qtype, question.id
                    );
                    return Ok(question);
                }
                Err(reason) => {
                    warn!("rejected generated item on attempt {attempt}/{attempts}: {reason}");
                    last_reason = reason;
                }
            }
        }

        Err(QuizError::GenerationFailed {
            attempts,
            reason: last_reason,
        })
    }

    /// Parse, shape, and validate one model response into a `Question`.
    fn build_question(
        &self,
        content: &str,
        qtype: QuestionType,
        question_id: &str,
        passage: &Passage,
        topic: Option<&str>,
        seen_prompts: &HashSet<String>,
    ) -> Result<Question, String> {
        let item = parse_item(content)?;

        let generated_choice = item.kind == "mcq"
            || item.kind == "true_false"
            || !item.choices.is_empty();
        if qtype.is_choice() != generated_choice {
            return Err(format!(
                "generated item kind '{}' does not match requested type '{qtype}'",
                if item.kind.is_empty() { "short" } else { &item.kind }
            ));
        }

        let citations = vec![cite_passage(passage, topic)];
        let concepts = item.tags.clone();

        let question = if qtype.is_choice() {
            Question {
                id: question_id.to_string(),
                qtype,
                prompt: item.question.trim().to_string(),
                options: item.choices.clone(),
                correct_options: item.answer.labels(),
                canonical_answer: item.answer.text(),
                concepts,
                rubric: vec![RubricCriterion {
                    criterion: "Selected the correct options".into(),
                    points: self.config.max_points,
                }],
                max_points: self.config.max_points,
                citations,
            }
        } else {
            let concepts_for_rubric: Vec<String> = if concepts.is_empty() {
                vec![topic_fallback(&item)]
            } else {
                concepts.clone()
            };
            Question {
                id: question_id.to_string(),
                qtype,
                prompt: item.question.trim().to_string(),
                options: vec![],
                correct_options: BTreeSet::new(),
                canonical_answer: item.answer.text(),
                concepts,
                rubric: build_rubric(&concepts_for_rubric, self.config.max_points),
                max_points: self.config.max_points,
                citations,
            }
        };

        validate_question(&question, seen_prompts)?;
        Ok(question)
    }
}

/// Cite the grounded passage; when a topic term occurs in it, the quote is
/// anchored to the text surrounding that match.
fn cite_passage(passage: &Passage, topic: Option<&str>) -> Citation {
    let anchored = topic.and_then(|t| passage.excerpt(t, EXCERPT_WINDOW_BYTES));
    match anchored {
        Some(excerpt) => Citation {
            source_file: passage.source_file.clone(),
            page: passage.page,
            quote: extract_quote(&excerpt, QUOTE_MAX_WORDS),
        },
        None => Citation::from_passage(passage, QUOTE_MAX_WORDS),
    }
}

/// Fallback rubric concept when the model supplies no tags.
fn topic_fallback(item: &ModelItem) -> String {
    item.question
        .split_whitespace()
        .take(4)
        .collect::<Vec<_>>()
        .join(" ")
}

fn parse_item(content: &str) -> Result<ModelItem, String> {
    if let Ok(envelope) = parse_model_json::<ModelItemEnvelope>(content) {
        if let Some(item) = envelope.items.into_iter().next() {
            return Ok(item);
        }
    }
    // Some models return the item directly without the wrapper.
    let item: ModelItem =
        parse_model_json(content).map_err(|e| format!("unparseable item JSON: {e}"))?;
    if item.question.is_empty() {
        return Err("item has no question text".into());
    }
    Ok(item)
}

/// Structural validation applied to every generated question.
pub(crate) fn validate_question(
    question: &Question,
    seen_prompts: &HashSet<String>,
) -> Result<(), String> {
    if question.prompt.chars().count() < MIN_PROMPT_CHARS {
        return Err(format!(
            "prompt too short ({} chars)",
            question.prompt.chars().count()
        ));
    }
    if seen_prompts.contains(&question.prompt.to_lowercase()) {
        return Err("duplicate of an already issued question".into());
    }
    if question.citations.is_empty() {
        return Err("question has no citations".into());
    }
    let rubric_total: u32 = question.rubric.iter().map(|c| c.points).sum();
    if question.rubric.is_empty() || rubric_total != question.max_points {
        return Err(format!(
            "rubric weights sum to {rubric_total}, expected {}",
            question.max_points
        ));
    }

    match question.qtype {
        QuestionType::SingleChoice | QuestionType::MultiChoice => {
            if question.options.len() < 2 {
                return Err(format!("only {} options", question.options.len()));
            }
            let labels: BTreeSet<char> = question.option_labels().into_iter().collect();
            if labels.len() != question.options.len() {
                return Err("option labels are missing or not unique".into());
            }
            if !question.correct_options.is_subset(&labels) {
                return Err("correct options not among the option labels".into());
            }
            let correct = question.correct_options.len();
            if question.qtype == QuestionType::SingleChoice && correct != 1 {
                return Err(format!("single-choice needs exactly 1 correct option, got {correct}"));
            }
            if question.qtype == QuestionType::MultiChoice
                && !(1..question.options.len()).contains(&correct)
            {
                return Err(format!(
                    "multi-choice needs 1..={} correct options, got {correct}",
                    question.options.len() - 1
                ));
            }
        }
        QuestionType::ShortAnswer | QuestionType::LongAnswer => {
            if question.canonical_answer.trim().is_empty() {
                return Err("free-text question has no reference answer".into());
            }
        }
    }

    Ok(())
}

/// Point breakdown for free-text questions: ~70% split across the key
/// concepts, the remainder on completeness. Always sums to `max_points`.
pub fn build_rubric(concepts: &[String], max_points: u32) -> Vec<RubricCriterion> {
    let concept_pool = (max_points as f64 * 0.7) as u32;
    let per_concept = if concepts.is_empty() {
        0
    } else {
        concept_pool / concepts.len() as u32
    };

    let mut rubric: Vec<RubricCriterion> = concepts
        .iter()
        .map(|concept| RubricCriterion {
            criterion: format!("Correctly explains or applies: {concept}"),
            points: per_concept,
        })
        .collect();

    let used: u32 = rubric.iter().map(|c| c.points).sum();
    rubric.push(RubricCriterion {
        criterion: "Answer is complete, accurate, and consistent with the notes".into(),
        points: max_points - used,
    });
    rubric
}

/// A window of the passage text, start varied for question diversity.
fn content_chunk(text: &str, max_bytes: usize) -> String {
    if text.len() <= max_bytes {
        return text.to_string();
    }
    let mut start = rand::rng().random_range(0..=text.len() - max_bytes);
    while start > 0 && !text.is_char_boundary(start) {
        start -= 1;
    }
    let mut end = start + max_bytes;
    while end < text.len() && !text.is_char_boundary(end) {
        end += 1;
    }
    text[start..end].to_string()
}

const VARIATION_HINTS: &[&str] = &[
    "Focus on a specific detail or concept.",
    "Ask about the main idea or the relationship between concepts.",
    "Test understanding of technical terms or definitions.",
    "Challenge comprehension of how concepts work together.",
    "Focus on practical applications or implications.",
];

fn build_item_prompt(topic: Option<&str>, content: &str, qtype: QuestionType) -> String {
    let hint = VARIATION_HINTS[rand::rng().random_range(0..VARIATION_HINTS.len())];
    let topic_line = topic
        .map(|t| format!(" about \"{t}\""))
        .unwrap_or_default();

    let example = if qtype.is_choice() {
        r#"{
  "type": "mcq",
  "question": "What is the main concept discussed?",
  "choices": ["A: Option 1", "B: Option 2", "C: Option 3", "D: Option 4"],
  "answer": "A",
  "explanation": "Brief explanation",
  "tags": ["concept"]
}"#
    } else {
        r#"{
  "type": "short",
  "question": "What is the main concept?",
  "answer": "Brief reference answer",
  "explanation": "Why this is correct",
  "tags": ["concept"]
}"#
    };

    let multi_note = if qtype == QuestionType::MultiChoice {
        "\nThe question must have TWO or more correct choices; list them all in \"answer\" (e.g. \"A,C\")."
    } else {
        ""
    };

    format!(
        "Create one unique quiz question{topic_line} from this text. {hint}{multi_note}\n\n\
         {content}\n\n\
         Return ONLY this JSON (no extra text):\n{example}"
    )
}
