//! Database configuration from command-line arguments.

use std::path::{Path, PathBuf};

use vaultkeeper::config::DatabaseConfig;

use crate::cli::DatabaseArgs;

/// SQLite file name used inside `--data-dir`.
pub const DB_FILE: &str = "vaultkeeper.db";

/// Resolve the database configuration.
///
/// An explicit URL wins. Otherwise the SQLite file lives in the data
/// directory (current directory by default), which is created if missing.
pub async fn database_config(
    args: &DatabaseArgs,
) -> Result<DatabaseConfig, Box<dyn std::error::Error>> {
    let url = match &args.database_url {
        Some(url) => url.clone(),
        None => {
            let data_dir = args.data_dir.clone().unwrap_or_else(|| PathBuf::from("."));
            tokio::fs::create_dir_all(&data_dir).await?;
            sqlite_url(&data_dir)
        }
    };

    Ok(DatabaseConfig {
        url,
        max_connections: args.max_connections,
    })
}

fn sqlite_url(data_dir: &Path) -> String {
    format!("sqlite:{}?mode=rwc", data_dir.join(DB_FILE).display())
}
