//! # Application State
//!
//! What every command receives: the database handle and the loaded config.
//!
//! ## Thread Safety
//! `Database` wraps a `SqlitePool`, which is cheap to clone and safe to share.
//! Commands run concurrently without explicit locking; cross-request
//! consistency comes from the database transactions, not from this struct.

use bookstore_db::{Database, DbConfig, DbResult};

use crate::config::AppConfig;

#[derive(Debug, Clone)]
pub struct AppState {
    db: Database,
    config: AppConfig,
}

impl AppState {
    pub fn new(db: Database, config: AppConfig) -> Self {
        AppState { db, config }
    }

    /// Opens the configured database (running migrations) and wraps it.
    pub async fn open(config: AppConfig) -> DbResult<Self> {
        let db = Database::new(config.db_config()).await?;
        Ok(AppState::new(db, config))
    }

    /// In-memory database with default config, for tests and demos.
    pub async fn in_memory() -> DbResult<Self> {
        let db = Database::new(DbConfig::in_memory()).await?;
        Ok(AppState::new(db, AppConfig::default()))
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}
