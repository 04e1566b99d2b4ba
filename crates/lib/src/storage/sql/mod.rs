//! SQL storage backend.
//!
//! [`SqlxStore`] implements both repository traits over an `sqlx` `AnyPool`,
//! so the same queries serve SQLite and PostgreSQL.
//!
//! ## Available Databases
//!
//! - **SQLite** (feature: `sqlite`): file-backed or in-memory
//! - **PostgreSQL** (feature: `postgres`)
//!
//! ## Schema and Migrations
//!
//! The schema lives in the [`schema`] module and is initialized on connect.
//! Uniqueness of emails and of `(owner_id, name)` is enforced by UNIQUE
//! constraints; the repositories translate constraint violations into
//! [`StorageError`] conflicts.

mod secrets;
mod users;

/// Schema definition and migration system.
pub mod schema;

use sqlx::AnyPool;
use sqlx::Executor;
use sqlx::any::AnyPoolOptions;
use tracing::info;

use crate::Result;
use crate::config::DatabaseConfig;
use crate::storage::StorageError;

/// Extension trait for sqlx Result types to simplify error handling.
///
/// Converts sqlx errors to [`StorageError::SqlxError`] with a context
/// message, the way `anyhow::Context` does.
pub(crate) trait SqlxResultExt<T> {
    fn sql_context(self, context: &str) -> Result<T>;
}

impl<T> SqlxResultExt<T> for std::result::Result<T, sqlx::Error> {
    fn sql_context(self, context: &str) -> Result<T> {
        self.map_err(|e| {
            StorageError::SqlxError {
                reason: format!("{context}: {e}"),
                source: Some(e),
            }
            .into()
        })
    }
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

pub(crate) fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_foreign_key_violation())
}

/// Database kind for SQL dialect selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbKind {
    Sqlite,
    Postgres,
}

impl DbKind {
    /// Infer the database kind from a connection URL scheme.
    pub fn from_url(url: &str) -> Option<Self> {
        if url.starts_with("sqlite:") {
            Some(DbKind::Sqlite)
        } else if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            Some(DbKind::Postgres)
        } else {
            None
        }
    }

    /// Collation that orders text by bytes, matching Rust's `str` ordering.
    pub(crate) fn byte_collation(self) -> &'static str {
        match self {
            DbKind::Sqlite => "BINARY",
            DbKind::Postgres => "\"C\"",
        }
    }
}

/// Repository implementation backed by an `sqlx` pool.
///
/// `SqlxStore` is `Send + Sync`; the pool handles connection reuse and
/// synchronization.
#[derive(Debug, Clone)]
pub struct SqlxStore {
    pool: AnyPool,
    kind: DbKind,
}

impl SqlxStore {
    /// Connect using a [`DatabaseConfig`], choosing the driver from the URL.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        match DbKind::from_url(&config.url) {
            #[cfg(feature = "sqlite")]
            Some(DbKind::Sqlite) => Self::connect_sqlite(&config.url, config.max_connections).await,
            #[cfg(feature = "postgres")]
            Some(DbKind::Postgres) => {
                Self::connect_postgres(&config.url, config.max_connections).await
            }
            _ => Err(StorageError::SqlxError {
                reason: format!("unsupported database URL: {}", config.redacted_url()),
                source: None,
            }
            .into()),
        }
    }

    /// Get a reference to the underlying pool.
    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    /// Get the database kind.
    pub fn kind(&self) -> DbKind {
        self.kind
    }

    /// Close the pool, waiting for checked-out connections to return.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(feature = "sqlite")]
impl SqlxStore {
    /// Open a SQLite database file, creating it if needed.
    pub async fn open_sqlite<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        // mode=rwc: read-write-create
        let url = format!("sqlite:{}?mode=rwc", path.as_ref().display());
        Self::connect_sqlite(&url, DatabaseConfig::DEFAULT_MAX_CONNECTIONS).await
    }

    /// Connect to a SQLite database using a connection URL.
    pub async fn connect_sqlite(url: &str, max_connections: u32) -> Result<Self> {
        sqlx::any::install_default_drivers();

        // An in-memory database is destroyed when its last connection closes,
        // so keep one connection alive for the lifetime of the pool.
        let is_in_memory = url.contains("mode=memory");
        let mut options = AnyPoolOptions::new().max_connections(max_connections.max(1));
        if is_in_memory {
            options = options
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }

        // Pragmas are per connection.
        let pool = options
            .after_connect(move |conn, _meta| {
                Box::pin(async move {
                    conn.execute("PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 5000;")
                        .await?;
                    if !is_in_memory {
                        conn.execute("PRAGMA journal_mode = WAL; PRAGMA synchronous = NORMAL;")
                            .await?;
                    }
                    Ok(())
                })
            })
            .connect(url)
            .await
            .sql_context("Failed to connect to SQLite")?;

        let store = Self {
            pool,
            kind: DbKind::Sqlite,
        };
        schema::initialize(&store).await?;
        info!(component = "storage", kind = "sqlite", in_memory = is_in_memory, "database ready");

        Ok(store)
    }

    /// Create a private in-memory SQLite database.
    ///
    /// Each call gets its own database, so tests do not share state.
    pub async fn sqlite_in_memory() -> Result<Self> {
        // Shared cache lets every pooled connection see the same database.
        let unique_id = uuid::Uuid::new_v4();
        let url = format!("sqlite:file:mem_{unique_id}?mode=memory&cache=shared");
        Self::connect_sqlite(&url, DatabaseConfig::DEFAULT_MAX_CONNECTIONS).await
    }
}

#[cfg(feature = "postgres")]
impl SqlxStore {
    /// Connect to a PostgreSQL database using a connection URL.
    pub async fn connect_postgres(url: &str, max_connections: u32) -> Result<Self> {
        sqlx::any::install_default_drivers();

        let pool = AnyPoolOptions::new()
            .max_connections(max_connections.max(1))
            .acquire_timeout(std::time::Duration::from_secs(30))
            .connect(url)
            .await
            .sql_context("Failed to connect to PostgreSQL")?;

        let store = Self {
            pool,
            kind: DbKind::Postgres,
        };
        schema::initialize(&store).await?;
        info!(component = "storage", kind = "postgres", "database ready");

        Ok(store)
    }
}
