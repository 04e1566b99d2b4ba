//! Migrate command - applies or reverts the database schema.

use vaultkeeper::storage::sql::{SqlxStore, schema};

use crate::cli::{Direction, MigrateArgs};
use crate::database::database_config;

/// Run the migrate command
pub async fn run(args: &MigrateArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = database_config(&args.database).await?;
    tracing::info!(database = %config.redacted_url(), "migrating");

    // Connecting brings the schema up to date.
    let store = SqlxStore::connect(&config).await?;

    match args.direction {
        Direction::Up => {
            let version = schema::current_version(&store).await?.unwrap_or_default();
            println!("schema at version {version}");
        }
        Direction::Down => {
            schema::drop_all(&store).await?;
            println!("schema dropped");
        }
    }

    store.close().await;
    Ok(())
}
