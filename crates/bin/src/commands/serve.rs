//! Serve command - runs the Vaultkeeper RPC server.

use std::time::Duration;

use tokio::signal::unix::{SignalKind, signal};
use vaultkeeper::app::App;
use vaultkeeper::config::{ServerConfig, TokenConfig, VaultConfig};
use zeroize::Zeroizing;

use crate::cli::ServeArgs;
use crate::database::database_config;

/// Build the server configuration from arguments.
pub async fn vault_config(args: &ServeArgs) -> Result<VaultConfig, Box<dyn std::error::Error>> {
    Ok(VaultConfig {
        server: ServerConfig {
            listen_addr: ServerConfig::parse_listen_addr(&args.listen)?,
            drain_timeout: Duration::from_secs(args.drain_timeout),
            max_request_timeout: Duration::from_secs(args.max_request_timeout),
        },
        token: TokenConfig {
            secret_key: args.token_secret.clone().map(Zeroizing::new),
            lifetime: Duration::from_secs(args.token_lifetime),
        },
        database: database_config(&args.database).await?,
    })
}

/// Run the Vaultkeeper server until SIGTERM or SIGINT.
pub async fn run(args: &ServeArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = vault_config(args).await?;

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    let app = App::new(config).start().await?;
    let local_addr = app.local_addr();

    println!("Vaultkeeper listening on http://{local_addr}");
    println!("Press Ctrl+C to shutdown");

    tokio::select! {
        _ = sigterm.recv() => tracing::info!("Received SIGTERM, initiating graceful shutdown..."),
        _ = sigint.recv() => tracing::info!("Received SIGINT, initiating graceful shutdown..."),
    }

    app.stop().await?;
    println!("Server shut down");
    Ok(())
}
