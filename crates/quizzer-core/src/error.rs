//! Error taxonomy for the quiz pipeline.
//!
//! Defined in `quizzer-core` so every crate in the workspace reports failures
//! through the same vocabulary and callers can classify errors without string
//! matching. Grading is deliberately absent from this taxonomy: the grading
//! engine always returns a `GradeResult` (see `grading`), so a mid-quiz
//! failure can never strand the user without a score.

use thiserror::Error;

/// Errors that can occur while loading material, generating questions, or
/// recording results.
#[derive(Debug, Error)]
pub enum QuizError {
    /// No readable note file was found for a course.
    #[error("no readable course material for '{0}'")]
    DocumentUnavailable(String),

    /// The model produced structurally invalid output on every attempt.
    #[error("question generation failed after {attempts} attempts: {reason}")]
    GenerationFailed { attempts: u32, reason: String },

    /// The model endpoint could not be reached.
    #[error("model endpoint unreachable: {0}")]
    ModelUnavailable(String),

    /// The model request timed out.
    #[error("model request timed out after {0}s")]
    Timeout(u64),

    /// The model endpoint returned an error response.
    #[error("model API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// The local attempt store is unavailable or a write failed.
    #[error("persistence failed: {0}")]
    Persistence(String),
}

impl QuizError {
    /// Returns `true` if re-invoking the failed operation can succeed without
    /// operator intervention (e.g. the model was slow or produced a bad
    /// sample). `DocumentUnavailable` is fatal for the affected course.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, QuizError::DocumentUnavailable(_))
    }
}
