//! quizzer-store — Embedded user and attempt store.
//!
//! A single-file SQLite database holding user accounts (salted password
//! hashes, never plaintext) and append-only quiz attempts. Ratings are never
//! stored; they are recomputed from the attempt history on demand.

pub mod attempts;
pub mod db;
pub mod error;
pub mod users;

pub use attempts::{QuizAttempt, UserStats};
pub use db::Database;
pub use error::StoreError;
pub use users::UserRecord;
