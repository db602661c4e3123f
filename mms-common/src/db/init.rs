//! Database initialization
//!
//! Opens (or creates) the SQLite relational store, creates every table
//! idempotently and seeds reference data.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use tracing::info;

use crate::db::{schema, seed};
use crate::Result;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let pool = connect_file(db_path).await?;
    prepare(&pool).await?;
    Ok(pool)
}

/// Private in-memory database, used by tests and dry runs
pub async fn init_memory_database() -> Result<SqlitePool> {
    let pool = connect_memory().await?;
    prepare(&pool).await?;
    Ok(pool)
}

/// Open (creating if missing) a SQLite file without touching its schema
pub async fn connect_file(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", db_path.display()))?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(std::time::Duration::from_millis(5000));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    Ok(pool)
}

/// In-memory SQLite pool without schema
///
/// A single long-lived connection backs the pool so every query sees the
/// same in-memory schema.
pub async fn connect_memory() -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    Ok(pool)
}

async fn prepare(pool: &SqlitePool) -> Result<()> {
    schema::create_tables(pool).await?;
    seed::seed_reference_data(pool).await?;
    Ok(())
}

/// Count rows in a table, used by diagnostics and tests
pub async fn count_rows(pool: &SqlitePool, table: &str) -> Result<i64> {
    if !schema::TABLE_NAMES.contains(&table) {
        return Err(crate::Error::InvalidInput(format!("Unknown table: {}", table)));
    }
    let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
        .fetch_one(pool)
        .await?;
    Ok(count)
}
