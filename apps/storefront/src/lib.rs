//! # Bookstore Storefront
//!
//! The command layer between shoppers and the bookstore core.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Storefront                                       │
//! │                                                                         │
//! │  commands/ ──► account, catalog, cart, order                           │
//! │       │                                                                 │
//! │       ├── auth.rs ───► token → Session, argon2 passwords               │
//! │       ├── error.rs ──► ApiError { code, message }                      │
//! │       ▼                                                                 │
//! │  state.rs ───► AppState { Database, AppConfig }                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  bookstore-db (SQLite, transactions) ──► bookstore-core (pure logic)   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## State Injection
//! Every command takes `&AppState` plus its own arguments. Authenticated
//! commands also take the caller's session token as `Option<&str>`; `None`
//! means the caller never logged in.

pub mod auth;
pub mod commands;
pub mod config;
pub mod error;
pub mod state;

use tracing_subscriber::EnvFilter;

pub use config::{AppConfig, ConfigError};
pub use error::{ApiError, ErrorCode};
pub use state::AppState;

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=bookstore_db=trace` - Show trace for the database crate only
/// - Otherwise `default_level` (from `BOOKSTORE_LOG_LEVEL`), with sqlx quieted
pub fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},sqlx=warn", default_level)));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}
