//! SQLite database wrapper and schema.

use std::path::Path;

use rusqlite::Connection;
use tracing::debug;

use crate::error::StoreError;

/// Handle to the single-file user/attempt database.
///
/// One writer at a time; the application records at most one attempt per
/// active session, so no further coordination is needed.
pub struct Database {
    pub(crate) conn: Connection,
}

impl Database {
    /// Open (and initialize if necessary) the database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    StoreError::InvalidInput(format!(
                        "cannot create database directory {}: {e}",
                        parent.display()
                    ))
                })?;
            }
        }
        let conn = Connection::open(path.as_ref())?;
        let db = Self { conn };
        db.init()?;
        debug!("opened attempt store at {}", path.as_ref().display());
        Ok(db)
    }

    /// In-memory database, for tests.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    fn init(&self) -> Result<(), StoreError> {
        self.conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                salt TEXT NOT NULL,
                created_at TEXT NOT NULL,
                last_login TEXT
            );

            CREATE TABLE IF NOT EXISTS quiz_attempts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                course TEXT NOT NULL,
                score_percentage REAL NOT NULL,
                total_questions INTEGER NOT NULL,
                attempted_at TEXT NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_attempts_user ON quiz_attempts(user_id);
            "#,
        )?;
        Ok(())
    }
}
