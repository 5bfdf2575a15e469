//! Store error types.

use thiserror::Error;

use quizzer_core::error::QuizError;

/// Errors from the user/attempt store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A username, password, or attempt field failed validation.
    #[error("{0}")]
    InvalidInput(String),

    /// Registration with a username that already exists.
    #[error("username already exists")]
    UsernameTaken,

    /// Login with a wrong username or password. Deliberately does not say
    /// which.
    #[error("invalid username or password")]
    InvalidCredentials,

    /// An operation referenced a user that does not exist.
    #[error("user not found")]
    UnknownUser,

    /// Password hashing or verification failed.
    #[error("password hashing failed: {0}")]
    Hash(String),

    /// The underlying database failed.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

impl From<StoreError> for QuizError {
    fn from(err: StoreError) -> Self {
        QuizError::Persistence(err.to_string())
    }
}
