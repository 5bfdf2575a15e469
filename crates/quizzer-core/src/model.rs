//! Core data model types for quizzer.
//!
//! These are the fundamental types the whole system uses to represent
//! source passages, questions, answers, and grading outcomes.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A page-indexed chunk of course material extracted from a note file.
///
/// Immutable once extracted; the grounding store hands out references to a
/// shared, read-only set of passages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passage {
    /// File the text came from (relative to the course notes directory).
    pub source_file: String,
    /// 1-indexed page number.
    pub page: u32,
    /// Extracted page text.
    pub text: String,
}

impl Passage {
    /// Representative quote from the passage text; see [`extract_quote`].
    pub fn quote(&self, max_words: usize) -> String {
        extract_quote(&self.text, max_words)
    }

    /// Excerpt of up to `window` bytes on each side of the first
    /// case-insensitive occurrence of `term`, for citation display.
    pub fn excerpt(&self, term: &str, window: usize) -> Option<String> {
        let haystack = self.text.to_lowercase();
        let idx = haystack.find(&term.to_lowercase())?;
        // Lowercasing can shift byte offsets for a handful of characters;
        // clamp into the original text and snap to char boundaries.
        let idx = idx.min(self.text.len());
        let mut start = idx.saturating_sub(window);
        while start > 0 && !self.text.is_char_boundary(start) {
            start -= 1;
        }
        let mut end = (idx + window).min(self.text.len());
        while end < self.text.len() && !self.text.is_char_boundary(end) {
            end += 1;
        }
        Some(self.text[start..end].trim().to_string())
    }
}

/// A file+page citation attached to a question or grade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    pub source_file: String,
    pub page: u32,
    /// Short verbatim quote from the cited page.
    pub quote: String,
}

impl Citation {
    pub fn from_passage(passage: &Passage, max_quote_words: usize) -> Self {
        Self {
            source_file: passage.source_file.clone(),
            page: passage.page,
            quote: passage.quote(max_quote_words),
        }
    }
}

impl fmt::Display for Citation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, p. {}", self.source_file, self.page)
    }
}

/// Supported question types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    SingleChoice,
    MultiChoice,
    ShortAnswer,
    LongAnswer,
}

impl QuestionType {
    /// Choice questions are graded deterministically without a model call.
    pub fn is_choice(&self) -> bool {
        matches!(self, QuestionType::SingleChoice | QuestionType::MultiChoice)
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuestionType::SingleChoice => write!(f, "single_choice"),
            QuestionType::MultiChoice => write!(f, "multi_choice"),
            QuestionType::ShortAnswer => write!(f, "short_answer"),
            QuestionType::LongAnswer => write!(f, "long_answer"),
        }
    }
}

impl FromStr for QuestionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "single_choice" | "single" | "mcq" => Ok(QuestionType::SingleChoice),
            "multi_choice" | "multi" => Ok(QuestionType::MultiChoice),
            "short_answer" | "short" => Ok(QuestionType::ShortAnswer),
            "long_answer" | "long" => Ok(QuestionType::LongAnswer),
            other => Err(format!("unknown question type: {other}")),
        }
    }
}

/// A scoring criterion with its point weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RubricCriterion {
    pub criterion: String,
    pub points: u32,
}

/// One generated quiz question, immutable once issued to the user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    /// Identifier within the session (e.g. "q3").
    pub id: String,
    #[serde(rename = "type")]
    pub qtype: QuestionType,
    /// The question text shown to the user.
    pub prompt: String,
    /// Labelled options ("A: ...") for choice types, empty otherwise.
    #[serde(default)]
    pub options: Vec<String>,
    /// Labels of the correct options for choice types.
    #[serde(default)]
    pub correct_options: BTreeSet<char>,
    /// Reference answer used for free-text grading.
    #[serde(default)]
    pub canonical_answer: String,
    /// Key concepts the answer is expected to cover.
    #[serde(default)]
    pub concepts: Vec<String>,
    /// Ordered scoring criteria; weights sum to `max_points`.
    pub rubric: Vec<RubricCriterion>,
    pub max_points: u32,
    /// Source passages the question is grounded on; never empty.
    pub citations: Vec<Citation>,
}

impl Question {
    /// Labels of all options, in presentation order.
    pub fn option_labels(&self) -> Vec<char> {
        self.options.iter().filter_map(|o| option_label(o)).collect()
    }

    /// Labels of the options that are *not* in the correct set.
    pub fn incorrect_options(&self) -> BTreeSet<char> {
        self.option_labels()
            .into_iter()
            .filter(|l| !self.correct_options.contains(l))
            .collect()
    }
}

/// First alphabetic character of an option string, uppercased ("b) foo" -> 'B').
pub fn option_label(option: &str) -> Option<char> {
    option
        .chars()
        .find(|c| c.is_ascii_alphabetic())
        .map(|c| c.to_ascii_uppercase())
}

/// Parse a raw selection string ("a, C" / "A,B") into a set of option labels.
///
/// Each comma-separated token contributes its first alphabetic character,
/// uppercased. Tokens without one are ignored.
pub fn parse_choice_set(raw: &str) -> BTreeSet<char> {
    raw.split(',')
        .filter_map(|token| option_label(token))
        .collect()
}

/// A submitted answer, consumed exactly once by the grading engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub question_id: String,
    pub response: AnswerResponse,
    pub submitted_at: DateTime<Utc>,
}

/// The user's response payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerResponse {
    /// Free-text answer for short/long-answer questions.
    Text(String),
    /// Selected option labels for choice questions.
    Choices(BTreeSet<char>),
}

impl Answer {
    pub fn text(question_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            question_id: question_id.into(),
            response: AnswerResponse::Text(text.into()),
            submitted_at: Utc::now(),
        }
    }

    /// Build a choice answer from a raw selection string.
    pub fn choices(question_id: impl Into<String>, raw: &str) -> Self {
        Self {
            question_id: question_id.into(),
            response: AnswerResponse::Choices(parse_choice_set(raw)),
            submitted_at: Utc::now(),
        }
    }

    /// The selected option labels, parsing free text if necessary.
    pub fn selected_choices(&self) -> BTreeSet<char> {
        match &self.response {
            AnswerResponse::Choices(set) => set.clone(),
            AnswerResponse::Text(raw) => parse_choice_set(raw),
        }
    }

    /// The free-text content of the answer.
    pub fn free_text(&self) -> String {
        match &self.response {
            AnswerResponse::Text(raw) => raw.clone(),
            AnswerResponse::Choices(set) => {
                set.iter().map(|c| c.to_string()).collect::<Vec<_>>().join(", ")
            }
        }
    }
}

/// Qualitative grading outcome, derived from the score percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Correct,
    PartiallyCorrect,
    Incorrect,
}

impl Decision {
    /// Map a score fraction in `[0, 1]` onto a decision tier.
    ///
    /// Thresholds are fixed policy: `>= 0.90` correct, `>= 0.40` partially
    /// correct, below that incorrect.
    pub fn from_percentage(percentage: f64) -> Self {
        if percentage >= 0.90 {
            Decision::Correct
        } else if percentage >= 0.40 {
            Decision::PartiallyCorrect
        } else {
            Decision::Incorrect
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Correct => write!(f, "correct"),
            Decision::PartiallyCorrect => write!(f, "partially correct"),
            Decision::Incorrect => write!(f, "incorrect"),
        }
    }
}

/// Outcome of checking one rubric criterion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CriterionCheck {
    pub criterion: String,
    pub met: bool,
    pub evidence: String,
}

/// The result of grading one answer. Produced exactly once per answer and
/// appended to the session history; never mutated afterward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradeResult {
    pub question_id: String,
    pub points_awarded: u32,
    pub points_possible: u32,
    pub decision: Decision,
    pub checks: Vec<CriterionCheck>,
    /// Feedback shown to the user.
    pub explanation: String,
    pub citations: Vec<Citation>,
}

/// Extract a representative quote: the first complete sentence of
/// 5..=`max_words` words, falling back to a word-truncated prefix.
pub fn extract_quote(text: &str, max_words: usize) -> String {
    let text = collapse_whitespace(text);

    for sentence in text.split_inclusive(['.', '!', '?']) {
        let sentence = sentence.trim_end_matches(['.', '!', '?']).trim();
        let words = sentence.split_whitespace().count();
        if (5..=max_words).contains(&words) {
            return sentence.to_string();
        }
    }

    let words: Vec<&str> = text.split_whitespace().take(max_words).collect();
    format!("{}...", words.join(" "))
}

/// Collapse runs of whitespace into single spaces.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
