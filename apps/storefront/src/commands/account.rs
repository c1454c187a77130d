//! # Account Commands
//!
//! Registration, login and logout.
//!
//! ## Registration Workflow
//! ```text
//! register("alice", "secret", "alice@x.com")
//!      │
//!      ├── validate username / password / email   ✗ → VALIDATION_ERROR
//!      ├── argon2 hash
//!      ├── INSERT users                           ✗ → CONFLICT (username | email)
//!      ▼
//! UserDto { id, username, email }
//! ```

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::auth::{authenticate, hash_password, verify_password};
use crate::error::ApiError;
use crate::state::AppState;
use bookstore_core::validation::{validate_email, validate_password, validate_username};
use bookstore_core::{CoreError, Session, User};

/// Public view of an account; never carries the password hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    pub id: i64,
    pub username: String,
    pub email: String,
}

impl From<User> for UserDto {
    fn from(user: User) -> Self {
        UserDto {
            id: user.id,
            username: user.username,
            email: user.email,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub email: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Returned by a successful login. `token` goes back with every request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub user_id: i64,
    pub username: String,
    pub expires_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl From<Session> for LoginResponse {
    fn from(session: Session) -> Self {
        LoginResponse {
            token: session.id,
            user_id: session.user_id,
            username: session.username,
            expires_at: session.expires_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsernameCheck {
    pub username: String,
    pub available: bool,
}

/// Registers a new account.
///
/// ## Errors
/// * `VALIDATION_ERROR` - malformed username, password or email
/// * `CONFLICT` - username or email already registered
pub async fn register(state: &AppState, request: RegisterRequest) -> Result<UserDto, ApiError> {
    let username = request.username.trim();
    let email = request.email.trim();
    debug!(username, "register command");

    validate_username(username).map_err(CoreError::from)?;
    validate_password(&request.password).map_err(CoreError::from)?;
    validate_email(email).map_err(CoreError::from)?;

    let hash = hash_password(&request.password)?;
    let user = state.db().users().insert(username, &hash, email).await?;

    info!(user_id = user.id, username = %user.username, "User registered");
    Ok(UserDto::from(user))
}

/// Checks whether a username can still be registered.
pub async fn check_username(state: &AppState, username: &str) -> Result<UsernameCheck, ApiError> {
    let username = username.trim();
    let taken = state.db().users().username_exists(username).await?;

    Ok(UsernameCheck {
        username: username.to_string(),
        available: !taken,
    })
}

/// Logs in and opens a session with the configured TTL.
///
/// ## Errors
/// * `NOT_AUTHENTICATED` - unknown username or wrong password (same message
///   for both)
pub async fn login(state: &AppState, request: LoginRequest) -> Result<LoginResponse, ApiError> {
    let username = request.username.trim();
    debug!(username, "login command");

    let user = state.db().users().get_by_username(username).await?;
    let user = match user {
        Some(user) if verify_password(&request.password, &user.password_hash) => user,
        _ => {
            warn!(username, "Failed login");
            return Err(CoreError::InvalidCredentials.into());
        }
    };

    let session = state
        .db()
        .sessions()
        .create(user.id, &user.username, state.config().session_ttl())
        .await?;

    info!(user_id = user.id, "User logged in");
    Ok(LoginResponse::from(session))
}

/// Ends the session. Logging out twice is harmless.
pub async fn logout(state: &AppState, token: &str) -> Result<bool, ApiError> {
    let ended = state.db().sessions().delete(token).await?;
    debug!(ended, "logout command");
    Ok(ended)
}

/// The account behind the token.
pub async fn current_user(state: &AppState, token: Option<&str>) -> Result<UserDto, ApiError> {
    let session = authenticate(state, token).await?;

    let user = state
        .db()
        .users()
        .get_by_id(session.user_id)
        .await?
        .ok_or_else(ApiError::not_authenticated)?;

    Ok(UserDto::from(user))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::ErrorCode;

    /// Registers `username` and returns a logged-in token.
    pub(crate) async fn signed_in(state: &AppState, username: &str) -> String {
        register(
            state,
            RegisterRequest {
                username: username.to_string(),
                password: "secret".to_string(),
                email: format!("{}@x.com", username),
            },
        )
        .await
        .unwrap();

        login(
            state,
            LoginRequest {
                username: username.to_string(),
                password: "secret".to_string(),
            },
        )
        .await
        .unwrap()
        .token
    }

    fn alice() -> RegisterRequest {
        RegisterRequest {
            username: "alice".to_string(),
            password: "secret".to_string(),
            email: "alice@x.com".to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let state = AppState::in_memory().await.unwrap();

        let user = register(&state, alice()).await.unwrap();
        assert_eq!(user.username, "alice");

        // Stored hashed, never in the clear
        let stored = state.db().users().get_by_id(user.id).await.unwrap().unwrap();
        assert_ne!(stored.password_hash, "secret");

        let login = login(
            &state,
            LoginRequest {
                username: "alice".to_string(),
                password: "secret".to_string(),
            },
        )
        .await
        .unwrap();
        assert_eq!(login.user_id, user.id);
        assert!(login.expires_at.is_some());

        let me = current_user(&state, Some(login.token.as_str())).await.unwrap();
        assert_eq!(me.email, "alice@x.com");
    }

    #[tokio::test]
    async fn test_duplicate_registration_is_conflict() {
        let state = AppState::in_memory().await.unwrap();
        let first = register(&state, alice()).await.unwrap();

        let err = register(
            &state,
            RegisterRequest {
                password: "another".to_string(),
                email: "other@x.com".to_string(),
                ..alice()
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::Conflict);
        assert!(err.message.contains("username"));

        let err = register(
            &state,
            RegisterRequest {
                username: "alice2".to_string(),
                ..alice()
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::Conflict);
        assert!(err.message.contains("email"));

        // First registration unaffected
        let stored = state.db().users().get_by_username("alice").await.unwrap().unwrap();
        assert_eq!(stored.id, first.id);
        assert_eq!(stored.email, "alice@x.com");
        assert!(verify_password("secret", &stored.password_hash));
    }

    #[tokio::test]
    async fn test_register_validates_input() {
        let state = AppState::in_memory().await.unwrap();

        for request in [
            RegisterRequest {
                username: "".to_string(),
                ..alice()
            },
            RegisterRequest {
                password: "123".to_string(),
                ..alice()
            },
            RegisterRequest {
                email: "not-an-email".to_string(),
                ..alice()
            },
        ] {
            let err = register(&state, request).await.unwrap_err();
            assert_eq!(err.code, ErrorCode::ValidationError);
        }

        assert!(!state.db().users().username_exists("alice").await.unwrap());
    }

    #[tokio::test]
    async fn test_bad_credentials() {
        let state = AppState::in_memory().await.unwrap();
        register(&state, alice()).await.unwrap();

        for (username, password) in [("alice", "wrong!"), ("nobody", "secret")] {
            let err = login(
                &state,
                LoginRequest {
                    username: username.to_string(),
                    password: password.to_string(),
                },
            )
            .await
            .unwrap_err();
            assert_eq!(err.code, ErrorCode::NotAuthenticated);
            assert_eq!(err.message, "Invalid username or password");
        }
    }

    #[tokio::test]
    async fn test_check_username() {
        let state = AppState::in_memory().await.unwrap();
        assert!(check_username(&state, "alice").await.unwrap().available);

        register(&state, alice()).await.unwrap();
        assert!(!check_username(&state, "alice").await.unwrap().available);
    }

    #[tokio::test]
    async fn test_logout_ends_session() {
        let state = AppState::in_memory().await.unwrap();
        let token = signed_in(&state, "alice").await;

        assert!(logout(&state, &token).await.unwrap());
        assert!(!logout(&state, &token).await.unwrap());

        let err = current_user(&state, Some(token.as_str())).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotAuthenticated);
    }
}
