//! # Session Repository
//!
//! Login sessions. A session lives until logout, or until `expires_at` when
//! a TTL is configured. Expired rows are deleted when they are looked up;
//! [`SessionRepository::purge_expired`] sweeps the rest on demand.

use chrono::{DateTime, Duration, Utc};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use bookstore_core::Session;

const SESSION_COLUMNS: &str = "id, user_id, username, created_at, expires_at";

/// Repository for session database operations.
#[derive(Debug, Clone)]
pub struct SessionRepository {
    pool: SqlitePool,
}

impl SessionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SessionRepository { pool }
    }

    /// Creates a session with a fresh random token.
    ///
    /// `ttl` of `None` means the session never expires.
    pub async fn create(
        &self,
        user_id: i64,
        username: &str,
        ttl: Option<Duration>,
    ) -> DbResult<Session> {
        let now = Utc::now();
        let session = Session {
            id: Uuid::new_v4().to_string(),
            user_id,
            username: username.to_string(),
            created_at: now,
            expires_at: ttl.map(|ttl| now + ttl),
        };

        debug!(user_id, expires_at = ?session.expires_at, "Creating session");

        sqlx::query(
            r#"
            INSERT INTO sessions (id, user_id, username, created_at, expires_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&session.id)
        .bind(session.user_id)
        .bind(&session.username)
        .bind(session.created_at)
        .bind(session.expires_at)
        .execute(&self.pool)
        .await?;

        Ok(session)
    }

    /// Gets a session by token, expired or not.
    pub async fn get(&self, id: &str) -> DbResult<Option<Session>> {
        let session = sqlx::query_as::<_, Session>(&format!(
            "SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(session)
    }

    /// Gets a live session. An expired one is deleted and reported as absent.
    pub async fn get_valid(&self, id: &str, now: DateTime<Utc>) -> DbResult<Option<Session>> {
        match self.get(id).await? {
            Some(session) if session.is_expired(now) => {
                debug!(user_id = session.user_id, "Dropping expired session");
                self.delete(id).await?;
                Ok(None)
            }
            other => Ok(other),
        }
    }

    /// Deletes a session. Returns `false` when there was nothing to delete.
    pub async fn delete(&self, id: &str) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM sessions WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Deletes every session whose expiry is at or before `now`.
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> DbResult<u64> {
        let expiring: Vec<Session> = sqlx::query_as::<_, Session>(&format!(
            "SELECT {SESSION_COLUMNS} FROM sessions WHERE expires_at IS NOT NULL"
        ))
        .fetch_all(&self.pool)
        .await?;

        // Compared in Rust: stored timestamps may differ in fractional digits
        let mut purged = 0;
        for session in expiring.iter().filter(|s| s.is_expired(now)) {
            if self.delete(&session.id).await? {
                purged += 1;
            }
        }

        debug!(purged, "Purged expired sessions");
        Ok(purged)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
