use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
mod database;
mod output;
mod session;
mod shapes;

use cli::{Cli, Commands};
use output::OutputFormat;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let directive = if cli.verbose {
        "vaultkeeper=debug"
    } else {
        "vaultkeeper=info"
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env().add_directive(directive.parse()?))
        .init();

    let format = OutputFormat::from_json_flag(cli.json);

    match &cli.command {
        Commands::Serve(args) => commands::serve::run(args).await,
        Commands::Migrate(args) => commands::migrate::run(args).await,
        Commands::Health(args) => commands::health::run(args).await,
        Commands::Auth { client, command } => commands::auth::run(client, command).await,
        Commands::Secret { client, command } => {
            commands::secret::run(client, command, format).await
        }
    }
}
