//! # Authentication
//!
//! Password hashing and session-token resolution.
//!
//! ## Token Flow
//! ```text
//! login(username, password)
//!      │
//!      ▼
//! verify_password(argon2 PHC string) ──✗──► InvalidCredentials
//!      │ ✓
//!      ▼
//! sessions.create(ttl) ──► token (session id)
//!
//! any authenticated command(token)
//!      │
//!      ▼
//! authenticate(token) ──✗──► NotAuthenticated ("Please log in first")
//!      │ ✓
//!      ▼
//! Session { user_id, username }
//! ```

use argon2::{
    password_hash::{rand_core::OsRng, SaltString},
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};
use chrono::Utc;
use tracing::debug;

use crate::error::ApiError;
use crate::state::AppState;
use bookstore_core::Session;

/// Hashes a password for storage.
pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);

    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| ApiError::internal(format!("Failed to hash password: {}", e)))?;

    Ok(hash.to_string())
}

/// Verifies a password against its stored hash.
///
/// An unparsable stored hash counts as a mismatch.
pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

/// Resolves the caller's token to a live session.
///
/// Missing, unknown and expired tokens all produce the same
/// `NotAuthenticated` outcome.
pub async fn authenticate(state: &AppState, token: Option<&str>) -> Result<Session, ApiError> {
    let Some(token) = token.filter(|t| !t.is_empty()) else {
        return Err(ApiError::not_authenticated());
    };

    match state.db().sessions().get_valid(token, Utc::now()).await? {
        Some(session) => Ok(session),
        None => {
            debug!("Unknown or expired session token");
            Err(ApiError::not_authenticated())
        }
    }
}
