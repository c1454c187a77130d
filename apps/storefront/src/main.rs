//! # Storefront Entry Point
//!
//! Loads configuration, initializes logging, opens the database (applying
//! migrations) and reports what it found.
//!
//! ## Startup Sequence
//! ```text
//! 1. AppConfig::load()        BOOKSTORE_* environment variables
//! 2. init_tracing()           RUST_LOG, else BOOKSTORE_LOG_LEVEL
//! 3. AppState::open()         SQLite with WAL, migrations
//! 4. purge expired sessions
//! 5. report catalog and order counts
//! ```

use chrono::Utc;
use tracing::{error, info, warn};

use storefront::commands::{catalog, order};
use storefront::{init_tracing, AppConfig, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    init_tracing(&config.log_level);

    info!(
        database = %config.database_path.display(),
        max_connections = config.max_connections,
        session_ttl_secs = config.session_ttl_secs,
        "Starting bookstore storefront"
    );

    let state = AppState::open(config).await?;

    if !state.db().health_check().await {
        error!("Database did not answer a health check");
        return Err("database unavailable".into());
    }

    let (total, applied) = bookstore_db::migrations::migration_status(state.db().pool()).await?;
    info!(applied, total, "Migrations checked");

    let purged = state.db().sessions().purge_expired(Utc::now()).await?;
    if purged > 0 {
        info!(purged, "Expired sessions removed");
    }

    let catalog = catalog::list_books(&state, None).await?;
    if catalog.total_records == 0 {
        warn!("Catalog is empty; run the seed binary to add demo books");
    }

    let orders = order::list_all_orders(&state).await?;
    info!(
        books = catalog.total_records,
        catalog_pages = catalog.total_pages,
        orders = orders.len(),
        "Storefront ready"
    );

    state.db().close().await;
    Ok(())
}
