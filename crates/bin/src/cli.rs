//! CLI argument definitions for the Vaultkeeper binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use vaultkeeper::config::ServerConfig;

/// Default server URL for client commands
pub const DEFAULT_SERVER: &str = "http://127.0.0.1:8080";

/// Vaultkeeper secret vault server and client
#[derive(Parser, Debug)]
#[command(name = "vaultkeeper")]
#[command(about = "Vaultkeeper: a per-user secret vault")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print machine-readable JSON instead of tables
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the Vaultkeeper server
    Serve(ServeArgs),
    /// Apply or revert the database schema
    Migrate(MigrateArgs),
    /// Check health of a running Vaultkeeper server
    Health(HealthArgs),
    /// Register, log in, or forget the cached token
    Auth {
        #[command(flatten)]
        client: ClientArgs,
        #[command(subcommand)]
        command: AuthCommand,
    },
    /// Store, read, list and delete secrets
    Secret {
        #[command(flatten)]
        client: ClientArgs,
        #[command(subcommand)]
        command: SecretCommand,
    },
}

/// Database selection shared by `serve` and `migrate`
#[derive(clap::Args, Debug, Clone)]
pub struct DatabaseArgs {
    /// Database URL (`sqlite:...` or `postgres://...`).
    /// Takes precedence over --data-dir.
    #[arg(long, env = "VAULTKEEPER_DATABASE_URL")]
    pub database_url: Option<String>,

    /// Data directory for the SQLite file (vaultkeeper.db)
    #[arg(short = 'D', long, env = "VAULTKEEPER_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Maximum pooled database connections
    #[arg(long, default_value_t = 5, env = "VAULTKEEPER_MAX_CONNECTIONS")]
    pub max_connections: u32,
}

/// Arguments for the serve command
#[derive(clap::Args, Debug)]
pub struct ServeArgs {
    /// Address to listen on
    #[arg(short, long, default_value = ServerConfig::DEFAULT_LISTEN_ADDR, env = "VAULTKEEPER_LISTEN")]
    pub listen: String,

    /// Secret used to sign tokens. A random one is generated when unset.
    #[arg(long, env = "VAULTKEEPER_TOKEN_SECRET", hide_env_values = true)]
    pub token_secret: Option<String>,

    /// Token lifetime in seconds
    #[arg(long, default_value_t = 365 * 24 * 60 * 60, env = "VAULTKEEPER_TOKEN_LIFETIME")]
    pub token_lifetime: u64,

    /// Seconds to wait for in-flight calls on shutdown
    #[arg(long, default_value_t = 10, env = "VAULTKEEPER_DRAIN_TIMEOUT")]
    pub drain_timeout: u64,

    /// Upper bound in seconds on any single call
    #[arg(long, default_value_t = 30, env = "VAULTKEEPER_MAX_REQUEST_TIMEOUT")]
    pub max_request_timeout: u64,

    #[command(flatten)]
    pub database: DatabaseArgs,
}

/// Schema direction for the migrate command
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Direction {
    /// Create tables and bring the schema to the current version
    Up,
    /// Drop every table
    Down,
}

/// Arguments for the migrate command
#[derive(clap::Args, Debug)]
pub struct MigrateArgs {
    #[arg(value_enum, default_value = "up")]
    pub direction: Direction,

    #[command(flatten)]
    pub database: DatabaseArgs,
}

/// Arguments for the health command
#[derive(clap::Args, Debug)]
pub struct HealthArgs {
    /// Base URL of the server to check
    #[arg(short, long, default_value = DEFAULT_SERVER, env = "VAULTKEEPER_SERVER")]
    pub server: String,

    /// Timeout in seconds
    #[arg(short, long, default_value_t = 5)]
    pub timeout: u64,
}

/// Connection settings for client commands
#[derive(clap::Args, Debug)]
pub struct ClientArgs {
    /// Base URL of the server
    #[arg(short, long, default_value = DEFAULT_SERVER, env = "VAULTKEEPER_SERVER")]
    pub server: String,

    /// Where the token is cached. Defaults to <config dir>/vaultkeeper/auth.json.
    #[arg(long, env = "VAULTKEEPER_AUTH_FILE")]
    pub auth_file: Option<PathBuf>,

    /// Per-call deadline in seconds
    #[arg(short, long, default_value_t = 10)]
    pub timeout: u64,
}

#[derive(Subcommand, Debug)]
pub enum AuthCommand {
    /// Create an account and cache its token
    Register { email: String, password: String },
    /// Log in and cache the token
    Login { email: String, password: String },
    /// Remove the cached token
    Forget,
}

#[derive(Subcommand, Debug)]
pub enum SecretCommand {
    /// List secret names and types
    Ls,
    /// Store a new secret
    Create {
        #[command(subcommand)]
        shape: CreateShape,
    },
    /// Print a secret, decoded by its type
    Read {
        #[arg(short, long)]
        name: String,
    },
    /// Delete a secret
    Rm {
        #[arg(short, long)]
        name: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum CreateShape {
    /// Arbitrary bytes, read from a file or stdin
    Raw {
        #[arg(short, long)]
        name: String,
        /// Read content from this file instead of stdin
        #[arg(short, long)]
        from_file: Option<PathBuf>,
    },
    /// A login/password pair
    Lp {
        #[arg(short, long)]
        name: String,
        login: String,
        password: String,
    },
    /// Payment card details
    Card {
        #[arg(short, long)]
        name: String,
        number: String,
        expires: String,
        cvv: String,
        holder: String,
    },
}
