//! Database module for SQLite persistence
//!
//! Holds the document registry, chunk store, and translation cache tables.
//! All job coordination happens through compare-and-set writes against
//! these tables; there is no separate in-process lock registry.

mod schema;

pub use schema::*;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

use crate::error::Result;

/// Create a new database connection pool
pub async fn create_pool(database_url: &str) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    initialize_schema(&pool).await?;

    Ok(pool)
}

/// Create an in-memory pool for tests
#[cfg(test)]
pub async fn create_test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory pool");
    initialize_schema(&pool).await.expect("schema init");
    pool
}

/// Insert a parent documents row so fixtures can write chunk/translation
/// rows without tripping the foreign-key constraints
#[cfg(test)]
pub async fn seed_test_document(pool: &SqlitePool, document_id: &str) {
    sqlx::query(
        "INSERT INTO documents (id, user_id, filename, file_path) VALUES (?, 'user-1', 'test.pdf', '/tmp/test.pdf')",
    )
    .bind(document_id)
    .execute(pool)
    .await
    .expect("seed document");
}
