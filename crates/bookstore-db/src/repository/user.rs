//! # User Repository
//!
//! Database operations for accounts. Passwords arrive already hashed; this
//! layer never sees a cleartext password.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use bookstore_core::User;

/// Repository for user database operations.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    /// Inserts a new user.
    ///
    /// ## Errors
    /// * `DbError::UniqueViolation` with `field` set to `username` or `email`
    ///   when either is already registered
    pub async fn insert(&self, username: &str, password_hash: &str, email: &str) -> DbResult<User> {
        debug!(username, "Inserting user");

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, password_hash, email)
            VALUES (?1, ?2, ?3)
            RETURNING id, username, password_hash, email
            "#,
        )
        .bind(username)
        .bind(password_hash)
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } if field.ends_with("email") => {
                DbError::duplicate("email", email)
            }
            DbError::UniqueViolation { .. } => DbError::duplicate("username", username),
            other => other,
        })?;

        Ok(user)
    }

    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, password_hash, email FROM users WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    pub async fn get_by_username(&self, username: &str) -> DbResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, password_hash, email FROM users WHERE username = ?1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Checks whether a username is taken (registration form pre-check).
    pub async fn username_exists(&self, username: &str) -> DbResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE username = ?1)")
                .bind(username)
                .fetch_one(&self.pool)
                .await?;

        Ok(exists)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    #[tokio::test]
    async fn test_insert_and_lookup() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let alice = db.users().insert("alice", "hash", "alice@x.com").await.unwrap();
        assert!(alice.id > 0);

        let by_name = db.users().get_by_username("alice").await.unwrap().unwrap();
        assert_eq!(by_name.id, alice.id);
        assert_eq!(by_name.email, "alice@x.com");

        let by_id = db.users().get_by_id(alice.id).await.unwrap().unwrap();
        assert_eq!(by_id.username, "alice");

        assert!(db.users().username_exists("alice").await.unwrap());
        assert!(!db.users().username_exists("bob").await.unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_username_and_email() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let first = db.users().insert("alice", "hash", "alice@x.com").await.unwrap();

        let err = db
            .users()
            .insert("alice", "other", "alice2@x.com")
            .await
            .unwrap_err();
        assert!(matches!(&err, DbError::UniqueViolation { field, .. } if field == "username"));

        let err = db
            .users()
            .insert("alice2", "other", "alice@x.com")
            .await
            .unwrap_err();
        assert!(matches!(&err, DbError::UniqueViolation { field, .. } if field == "email"));

        // First registration untouched
        let stored = db.users().get_by_username("alice").await.unwrap().unwrap();
        assert_eq!(stored.id, first.id);
        assert_eq!(stored.password_hash, "hash");
    }
}
