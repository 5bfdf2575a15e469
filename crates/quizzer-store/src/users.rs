//! User registration, authentication, and deletion.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};
use tracing::info;

use crate::db::Database;
use crate::error::StoreError;

/// A stored user account. The password hash never leaves this module.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: i64,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

/// Username rules: 3..=20 characters, letters and digits only.
pub fn validate_username(username: &str) -> Result<(), StoreError> {
    if username.is_empty() {
        return Err(StoreError::InvalidInput("username cannot be empty".into()));
    }
    let len = username.chars().count();
    if len < 3 {
        return Err(StoreError::InvalidInput(
            "username must be at least 3 characters".into(),
        ));
    }
    if len > 20 {
        return Err(StoreError::InvalidInput(
            "username must be at most 20 characters".into(),
        ));
    }
    if !username.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(StoreError::InvalidInput(
            "username can only contain letters and numbers".into(),
        ));
    }
    Ok(())
}

/// Password rules: 6..=50 characters from the printable ASCII set.
pub fn validate_password(password: &str) -> Result<(), StoreError> {
    if password.is_empty() {
        return Err(StoreError::InvalidInput("password cannot be empty".into()));
    }
    let len = password.chars().count();
    if len < 6 {
        return Err(StoreError::InvalidInput(
            "password must be at least 6 characters".into(),
        ));
    }
    if len > 50 {
        return Err(StoreError::InvalidInput(
            "password must be at most 50 characters".into(),
        ));
    }
    if !password.chars().all(|c| c.is_ascii_graphic()) {
        return Err(StoreError::InvalidInput(
            "password contains invalid characters".into(),
        ));
    }
    Ok(())
}

/// Salted one-way digest of a password. Returns (hash, salt); the salt is
/// also embedded in the PHC hash string used for verification.
fn hash_password(password: &str) -> Result<(String, String), StoreError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| StoreError::Hash(e.to_string()))?
        .to_string();
    Ok((hash, salt.as_str().to_string()))
}

fn verify_password(password: &str, stored_hash: &str) -> Result<bool, StoreError> {
    let parsed = PasswordHash::new(stored_hash).map_err(|e| StoreError::Hash(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

impl Database {
    /// Register a new user. Fails on invalid input or a taken username.
    pub fn register_user(&self, username: &str, password: &str) -> Result<i64, StoreError> {
        validate_username(username)?;
        validate_password(password)?;

        let existing: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM users WHERE username = ?1",
                params![username],
                |row| row.get(0),
            )
            .optional()?;
        if existing.is_some() {
            return Err(StoreError::UsernameTaken);
        }

        let (password_hash, salt) = hash_password(password)?;
        self.conn
            .execute(
                "INSERT INTO users (username, password_hash, salt, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![username, password_hash, salt, Utc::now()],
            )
            .map_err(|e| match e {
                rusqlite::Error::SqliteFailure(err, _)
                    if err.code == rusqlite::ErrorCode::ConstraintViolation =>
                {
                    StoreError::UsernameTaken
                }
                other => StoreError::Database(other),
            })?;

        let id = self.conn.last_insert_rowid();
        info!("registered user '{username}' (id {id})");
        Ok(id)
    }

    /// Authenticate a user and update their last-login timestamp.
    ///
    /// Wrong username and wrong password return the same error.
    pub fn login_user(&self, username: &str, password: &str) -> Result<UserRecord, StoreError> {
        let row: Option<(i64, String, DateTime<Utc>)> = self
            .conn
            .query_row(
                "SELECT id, password_hash, created_at FROM users WHERE username = ?1",
                params![username],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        let Some((id, stored_hash, created_at)) = row else {
            return Err(StoreError::InvalidCredentials);
        };

        if !verify_password(password, &stored_hash)? {
            return Err(StoreError::InvalidCredentials);
        }

        self.conn.execute(
            "UPDATE users SET last_login = ?1 WHERE id = ?2",
            params![Utc::now(), id],
        )?;

        Ok(UserRecord {
            id,
            username: username.to_string(),
            created_at,
        })
    }

    /// Look up a user by name without authenticating.
    pub fn find_user(&self, username: &str) -> Result<Option<UserRecord>, StoreError> {
        let record = self
            .conn
            .query_row(
                "SELECT id, username, created_at FROM users WHERE username = ?1",
                params![username],
                |row| {
                    Ok(UserRecord {
                        id: row.get(0)?,
                        username: row.get(1)?,
                        created_at: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(record)
    }

    /// Delete a user; their attempt history cascades away with them.
    pub fn delete_user(&self, user_id: i64) -> Result<(), StoreError> {
        let deleted = self
            .conn
            .execute("DELETE FROM users WHERE id = ?1", params![user_id])?;
        if deleted == 0 {
            return Err(StoreError::UnknownUser);
        }
        info!("deleted user id {user_id} and their attempt history");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_and_login_roundtrip() {
        let db = Database::open_in_memory().unwrap();
        let id = db.register_user("TestUser123", "MyPass123!").unwrap();

        let record = db.login_user("TestUser123", "MyPass123!").unwrap();
        assert_eq!(record.id, id);
        assert_eq!(record.username, "TestUser123");
    }

    #[test]
    fn duplicate_username_is_rejected() {
        let db = Database::open_in_memory().unwrap();
        db.register_user("TestUser123", "MyPass123!").unwrap();

        let err = db.register_user("TestUser123", "AnotherPass!").unwrap_err();
        assert!(matches!(err, StoreError::UsernameTaken));
    }

    #[test]
    fn wrong_password_and_unknown_user_look_identical() {
        let db = Database::open_in_memory().unwrap();
        db.register_user("TestUser123", "MyPass123!").unwrap();

        let wrong_pass = db.login_user("TestUser123", "WrongPass1").unwrap_err();
        let unknown = db.login_user("NoSuchUser", "MyPass123!").unwrap_err();
        assert_eq!(wrong_pass.to_string(), unknown.to_string());
    }

    #[test]
    fn username_validation() {
        assert!(validate_username("abc").is_ok());
        assert!(validate_username("User42").is_ok());
        assert!(validate_username("").is_err());
        assert!(validate_username("ab").is_err());
        assert!(validate_username(&"a".repeat(21)).is_err());
        assert!(validate_username("user name").is_err());
        assert!(validate_username("user_name").is_err());
    }

    #[test]
    fn password_validation() {
        assert!(validate_password("secret1").is_ok());
        assert!(validate_password("P@ssw0rd!").is_ok());
        assert!(validate_password("").is_err());
        assert!(validate_password("short").is_err());
        assert!(validate_password(&"x".repeat(51)).is_err());
        assert!(validate_password("pass word").is_err());
    }

    #[test]
    fn plaintext_is_never_stored() {
        let db = Database::open_in_memory().unwrap();
        db.register_user("TestUser123", "MyPass123!").unwrap();

        let (hash, salt): (String, String) = db
            .conn
            .query_row(
                "SELECT password_hash, salt FROM users WHERE username = 'TestUser123'",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert!(!hash.contains("MyPass123!"));
        assert!(!salt.is_empty());
        // The PHC string records the salt that produced it.
        assert!(hash.contains(&salt));
    }

    #[test]
    fn find_user_does_not_authenticate() {
        let db = Database::open_in_memory().unwrap();
        db.register_user("TestUser123", "MyPass123!").unwrap();

        assert!(db.find_user("TestUser123").unwrap().is_some());
        assert!(db.find_user("Nobody").unwrap().is_none());
    }

    #[test]
    fn delete_unknown_user_errors() {
        let db = Database::open_in_memory().unwrap();
        let err = db.delete_user(999).unwrap_err();
        assert!(matches!(err, StoreError::UnknownUser));
    }
}
