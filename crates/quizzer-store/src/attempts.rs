//! Append-only quiz attempt history and aggregate statistics.

use chrono::{DateTime, Utc};
use rusqlite::params;
use serde::Serialize;
use tracing::info;

use quizzer_core::rating::{stars_for_score, RatingInputs};

use crate::db::Database;
use crate::error::StoreError;

/// One recorded quiz attempt. Create-once, immutable.
#[derive(Debug, Clone, Serialize)]
pub struct QuizAttempt {
    pub id: i64,
    pub user_id: i64,
    pub course: String,
    /// Overall score in `0..=100`.
    pub score_percentage: f64,
    pub total_questions: u32,
    pub attempted_at: DateTime<Utc>,
}

/// Aggregate view over a user's attempt history. Derived, never stored.
#[derive(Debug, Clone, Serialize)]
pub struct UserStats {
    pub username: String,
    pub total_attempts: u32,
    pub total_questions: u32,
    /// Mean attempt score in `0..=100`.
    pub average_score: f64,
    /// Mean attempt score as a fraction in `[0, 1]`.
    pub accuracy: f64,
    /// Sum of per-attempt star awards.
    pub total_stars: u32,
    pub favorite_course: Option<String>,
}

impl UserStats {
    /// The inputs the rating formula consumes.
    pub fn rating_inputs(&self) -> RatingInputs {
        RatingInputs {
            accuracy: self.accuracy,
            total_stars: self.total_stars,
            total_attempts: self.total_attempts,
        }
    }
}

impl Database {
    /// Append one quiz attempt.
    ///
    /// A single INSERT, atomic in SQLite: the attempt is either fully
    /// recorded or not at all.
    pub fn record_attempt(
        &self,
        user_id: i64,
        course: &str,
        score_percentage: f64,
        total_questions: u32,
    ) -> Result<i64, StoreError> {
        if total_questions == 0 {
            return Err(StoreError::InvalidInput(
                "attempt must contain at least one question".into(),
            ));
        }
        if !(0.0..=100.0).contains(&score_percentage) {
            return Err(StoreError::InvalidInput(format!(
                "score percentage {score_percentage} outside 0..=100"
            )));
        }

        self.conn
            .execute(
                "INSERT INTO quiz_attempts (user_id, course, score_percentage, total_questions, attempted_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![user_id, course, score_percentage, total_questions, Utc::now()],
            )
            .map_err(|e| match e {
                rusqlite::Error::SqliteFailure(err, _)
                    if err.code == rusqlite::ErrorCode::ConstraintViolation =>
                {
                    StoreError::UnknownUser
                }
                other => StoreError::Database(other),
            })?;

        let id = self.conn.last_insert_rowid();
        info!(
            "recorded attempt {id} for user {user_id}: {course} {score_percentage:.1}% over {total_questions} questions"
        );
        Ok(id)
    }

    /// All attempts for a user, oldest first.
    pub fn attempts_for_user(&self, user_id: i64) -> Result<Vec<QuizAttempt>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, course, score_percentage, total_questions, attempted_at
             FROM quiz_attempts WHERE user_id = ?1 ORDER BY attempted_at, id",
        )?;
        let attempts = stmt
            .query_map(params![user_id], |row| {
                Ok(QuizAttempt {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    course: row.get(2)?,
                    score_percentage: row.get(3)?,
                    total_questions: row.get(4)?,
                    attempted_at: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(attempts)
    }

    /// Aggregate statistics for a user, recomputed from the full history.
    pub fn user_stats(&self, user_id: i64) -> Result<UserStats, StoreError> {
        let username: String = self
            .conn
            .query_row(
                "SELECT username FROM users WHERE id = ?1",
                params![user_id],
                |row| row.get(0),
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::UnknownUser,
                other => StoreError::Database(other),
            })?;

        let attempts = self.attempts_for_user(user_id)?;

        let total_attempts = attempts.len() as u32;
        let total_questions: u32 = attempts.iter().map(|a| a.total_questions).sum();
        let average_score = if attempts.is_empty() {
            0.0
        } else {
            attempts.iter().map(|a| a.score_percentage).sum::<f64>() / attempts.len() as f64
        };
        let total_stars: u32 = attempts
            .iter()
            .map(|a| stars_for_score(a.score_percentage))
            .sum();

        // Most-attempted course; ties resolve to the alphabetically first.
        let mut counts: std::collections::BTreeMap<&str, u32> = std::collections::BTreeMap::new();
        for attempt in &attempts {
            *counts.entry(attempt.course.as_str()).or_default() += 1;
        }
        let favorite_course = counts
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(a.0)))
            .map(|(course, _)| course.to_string());

        Ok(UserStats {
            username,
            total_attempts,
            total_questions,
            average_score,
            accuracy: average_score / 100.0,
            total_stars,
            favorite_course,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quizzer_core::rating::{compute_rating, RatingTier};

    fn db_with_user() -> (Database, i64) {
        let db = Database::open_in_memory().unwrap();
        let id = db.register_user("TestUser123", "MyPass123!").unwrap();
        (db, id)
    }

    #[test]
    fn record_and_list_attempts() {
        let (db, user_id) = db_with_user();

        db.record_attempt(user_id, "nlp", 85.0, 10).unwrap();
        db.record_attempt(user_id, "ml-dl", 60.0, 5).unwrap();

        let attempts = db.attempts_for_user(user_id).unwrap();
        assert_eq!(attempts.len(), 2);
        assert_eq!(attempts[0].course, "nlp");
        assert_eq!(attempts[0].score_percentage, 85.0);
        assert_eq!(attempts[1].total_questions, 5);
    }

    #[test]
    fn attempt_validation() {
        let (db, user_id) = db_with_user();

        let err = db.record_attempt(user_id, "nlp", 50.0, 0).unwrap_err();
        assert!(matches!(err, StoreError::InvalidInput(_)));

        let err = db.record_attempt(user_id, "nlp", 101.0, 5).unwrap_err();
        assert!(matches!(err, StoreError::InvalidInput(_)));

        let err = db.record_attempt(user_id, "nlp", -0.5, 5).unwrap_err();
        assert!(matches!(err, StoreError::InvalidInput(_)));
    }

    #[test]
    fn attempt_for_missing_user_is_rejected() {
        let db = Database::open_in_memory().unwrap();
        let err = db.record_attempt(42, "nlp", 50.0, 5).unwrap_err();
        assert!(matches!(err, StoreError::UnknownUser));
    }

    #[test]
    fn stats_aggregate_history() {
        let (db, user_id) = db_with_user();

        db.record_attempt(user_id, "nlp", 95.0, 10).unwrap(); // 5 stars
        db.record_attempt(user_id, "nlp", 75.0, 10).unwrap(); // 3 stars
        db.record_attempt(user_id, "ml-dl", 40.0, 4).unwrap(); // 1 star

        let stats = db.user_stats(user_id).unwrap();
        assert_eq!(stats.username, "TestUser123");
        assert_eq!(stats.total_attempts, 3);
        assert_eq!(stats.total_questions, 24);
        assert!((stats.average_score - 70.0).abs() < 1e-9);
        assert!((stats.accuracy - 0.70).abs() < 1e-9);
        assert_eq!(stats.total_stars, 9);
        assert_eq!(stats.favorite_course.as_deref(), Some("nlp"));
    }

    #[test]
    fn stats_for_fresh_user_are_zeroed() {
        let (db, user_id) = db_with_user();
        let stats = db.user_stats(user_id).unwrap();
        assert_eq!(stats.total_attempts, 0);
        assert_eq!(stats.average_score, 0.0);
        assert_eq!(stats.total_stars, 0);
        assert!(stats.favorite_course.is_none());

        let err = db.user_stats(999).unwrap_err();
        assert!(matches!(err, StoreError::UnknownUser));
    }

    #[test]
    fn deleting_user_cascades_to_attempts() {
        let (db, user_id) = db_with_user();
        db.record_attempt(user_id, "nlp", 80.0, 10).unwrap();

        db.delete_user(user_id).unwrap();
        assert!(db.attempts_for_user(user_id).unwrap().is_empty());
    }

    #[test]
    fn stats_feed_the_rating_formula() {
        let (db, user_id) = db_with_user();
        for _ in 0..10 {
            db.record_attempt(user_id, "ar", 95.0, 10).unwrap();
        }

        let stats = db.user_stats(user_id).unwrap();
        let rating = compute_rating(&stats.rating_inputs());
        // 0.5*0.95 + 0.3*(50/100) + 0.2*(10/50) = 0.665
        assert_eq!(rating.tier, RatingTier::ExpertLearner);
    }

    #[test]
    fn attempts_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quizzer.db");

        let user_id = {
            let db = Database::open(&path).unwrap();
            let id = db.register_user("TestUser123", "MyPass123!").unwrap();
            db.record_attempt(id, "planning", 66.0, 6).unwrap();
            id
        };

        let db = Database::open(&path).unwrap();
        let attempts = db.attempts_for_user(user_id).unwrap();
        assert_eq!(attempts.len(), 1);
        assert_eq!(attempts[0].course, "planning");
    }
}
