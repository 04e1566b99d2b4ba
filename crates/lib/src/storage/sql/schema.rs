//! SQL schema definitions and migrations.
//!
//! The schema is portable between SQLite and PostgreSQL.
//!
//! # Migration System
//!
//! Migrations are code rather than SQL files so each step can issue
//! dialect-specific statements.
//!
//! ## Adding a New Migration
//!
//! 1. Increment `SCHEMA_VERSION`
//! 2. Add a new `migrate_vN_to_vM` async function
//! 3. Add the migration to the match statement in `run_migration`

use tracing::info;

use crate::Result;
use crate::storage::StorageError;

use super::{SqlxResultExt, SqlxStore};

/// Current schema version.
pub const SCHEMA_VERSION: i64 = 1;

/// SQL statements to create the schema tables, in dependency order.
pub const CREATE_TABLES: &[&str] = &[
    // BIGINT (64-bit) for portability between SQLite and PostgreSQL
    "CREATE TABLE IF NOT EXISTS schema_version (
        version BIGINT PRIMARY KEY
    )",
    // password_hash is an Argon2id PHC string
    "CREATE TABLE IF NOT EXISTS users (
        id TEXT PRIMARY KEY NOT NULL,
        email TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL
    )",
    // BYTEA is the PostgreSQL binary type; SQLite stores blobs as-is
    "CREATE TABLE IF NOT EXISTS secrets (
        id TEXT PRIMARY KEY NOT NULL,
        owner_id TEXT NOT NULL REFERENCES users(id),
        type TEXT NOT NULL,
        name TEXT NOT NULL,
        content BYTEA NOT NULL,
        UNIQUE (owner_id, name)
    )",
];

/// Tables removed by [`drop_all`], children first.
const DROP_TABLES: &[&str] = &[
    "DROP TABLE IF EXISTS secrets",
    "DROP TABLE IF EXISTS users",
    "DROP TABLE IF EXISTS schema_version",
];

/// Initialize the database schema.
///
/// Creates tables if they don't exist and runs migrations when the stored
/// schema version is behind [`SCHEMA_VERSION`].
pub async fn initialize(store: &SqlxStore) -> Result<()> {
    let pool = store.pool();

    for statement in CREATE_TABLES {
        sqlx::query(statement)
            .execute(pool)
            .await
            .sql_context(&format!("Schema creation failed - SQL: {statement}"))?;
    }

    let row: Option<(i64,)> = sqlx::query_as("SELECT version FROM schema_version")
        .fetch_optional(pool)
        .await
        .sql_context("Failed to check schema version")?;

    match row {
        None => {
            sqlx::query("INSERT INTO schema_version (version) VALUES ($1)")
                .bind(SCHEMA_VERSION)
                .execute(pool)
                .await
                .sql_context("Failed to initialize schema version")?;
        }
        Some((current,)) if current < SCHEMA_VERSION => {
            migrate(store, current, SCHEMA_VERSION).await?;
        }
        Some((current,)) if current > SCHEMA_VERSION => {
            return Err(StorageError::SqlxError {
                reason: format!(
                    "database schema v{current} is newer than supported v{SCHEMA_VERSION}"
                ),
                source: None,
            }
            .into());
        }
        Some(_) => {}
    }

    Ok(())
}

/// Drop every table this schema owns.
pub async fn drop_all(store: &SqlxStore) -> Result<()> {
    for statement in DROP_TABLES {
        sqlx::query(statement)
            .execute(store.pool())
            .await
            .sql_context(&format!("Schema drop failed - SQL: {statement}"))?;
    }
    info!(component = "storage", "schema dropped");
    Ok(())
}

/// Stored schema version, or `None` before initialization.
pub async fn current_version(store: &SqlxStore) -> Result<Option<i64>> {
    let row: Option<(i64,)> = sqlx::query_as("SELECT version FROM schema_version")
        .fetch_optional(store.pool())
        .await
        .sql_context("Failed to read schema version")?;
    Ok(row.map(|(version,)| version))
}

/// Run migrations sequentially, bumping the version after each step.
async fn migrate(store: &SqlxStore, from: i64, to: i64) -> Result<()> {
    info!(from, to, "Starting SQL schema migration");

    let mut current = from;
    while current < to {
        let next = current + 1;
        run_migration(store, current, next).await?;

        sqlx::query("UPDATE schema_version SET version = $1")
            .bind(next)
            .execute(store.pool())
            .await
            .sql_context(&format!("Failed to update schema version to {next}"))?;

        info!(version = next, "Migration completed");
        current = next;
    }

    Ok(())
}

/// Execute a single migration step.
async fn run_migration(_store: &SqlxStore, from: i64, to: i64) -> Result<()> {
    // No migrations exist past v1 yet.

    Err(StorageError::SqlxError {
        reason: format!(
            "Unknown migration path: v{from} to v{to}. \
             SCHEMA_VERSION was incremented without adding a migration."
        ),
        source: None,
    }
    .into())
}
