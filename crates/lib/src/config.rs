//! Process configuration.
//!
//! Plain structs with defaults, filled in by the binary from flags and
//! environment variables and handed to [`App`](crate::app::App) at
//! construction. Nothing here reads global state.

use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

use rand::Rng;
use rand::distributions::Alphanumeric;
use thiserror::Error;
use zeroize::Zeroizing;

use crate::Result;

/// Configuration errors.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid listen address {value:?}: {reason}")]
    InvalidListenAddr { value: String, reason: String },

    #[error("token lifetime must be at least one second")]
    ZeroTokenLifetime,

    #[error("invalid database URL: {reason}")]
    InvalidDatabaseUrl { reason: String },

    #[error("max request timeout must be positive")]
    ZeroRequestTimeout,
}

/// Top-level configuration for a vault server.
#[derive(Debug, Clone, Default)]
pub struct VaultConfig {
    pub server: ServerConfig,
    pub token: TokenConfig,
    pub database: DatabaseConfig,
}

impl VaultConfig {
    /// Reject configurations the server cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.token.lifetime.as_secs() == 0 {
            return Err(ConfigError::ZeroTokenLifetime.into());
        }
        if self.server.max_request_timeout.is_zero() {
            return Err(ConfigError::ZeroRequestTimeout.into());
        }
        url::Url::parse(&self.database.url).map_err(|e| ConfigError::InvalidDatabaseUrl {
            reason: e.to_string(),
        })?;
        Ok(())
    }
}

/// Listener and request lifecycle settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind. Port 0 picks a free port.
    pub listen_addr: SocketAddr,
    /// How long a graceful stop waits for in-flight calls.
    pub drain_timeout: Duration,
    /// Upper bound for the per-call deadline a client may request.
    pub max_request_timeout: Duration,
}

impl ServerConfig {
    pub const DEFAULT_LISTEN_ADDR: &'static str = "127.0.0.1:8080";

    /// Parse a listen address such as `0.0.0.0:8080`.
    pub fn parse_listen_addr(value: &str) -> Result<SocketAddr> {
        value.parse().map_err(|e: std::net::AddrParseError| {
            ConfigError::InvalidListenAddr {
                value: value.to_string(),
                reason: e.to_string(),
            }
            .into()
        })
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            drain_timeout: Duration::from_secs(10),
            max_request_timeout: Duration::from_secs(30),
        }
    }
}

/// Token signing settings.
#[derive(Clone)]
pub struct TokenConfig {
    /// HMAC signing key. `None` means a random key is generated at startup.
    pub secret_key: Option<Zeroizing<String>>,
    /// Validity window of issued tokens.
    pub lifetime: Duration,
}

impl TokenConfig {
    /// One year.
    pub const DEFAULT_LIFETIME: Duration = Duration::from_secs(365 * 24 * 60 * 60);

    const GENERATED_KEY_LEN: usize = 64;

    /// The configured signing key, or a freshly generated one.
    ///
    /// The flag is `true` when the key was generated; tokens signed with it do
    /// not survive a restart.
    pub fn signing_key(&self) -> (Zeroizing<String>, bool) {
        match &self.secret_key {
            Some(key) if !key.is_empty() => (key.clone(), false),
            _ => {
                let key: String = rand::thread_rng()
                    .sample_iter(&Alphanumeric)
                    .take(Self::GENERATED_KEY_LEN)
                    .map(char::from)
                    .collect();
                (Zeroizing::new(key), true)
            }
        }
    }
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            secret_key: None,
            lifetime: Self::DEFAULT_LIFETIME,
        }
    }
}

impl fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenConfig")
            .field("secret_key", &self.secret_key.as_ref().map(|_| "<redacted>"))
            .field("lifetime", &self.lifetime)
            .finish()
    }
}

/// Database connection settings.
#[derive(Clone)]
pub struct DatabaseConfig {
    /// `sqlite:` or `postgres://` connection URL.
    pub url: String,
    pub max_connections: u32,
}

impl DatabaseConfig {
    pub const DEFAULT_URL: &'static str = "sqlite:vaultkeeper.db?mode=rwc";
    pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

    /// The URL with any password replaced, safe for logs.
    pub fn redacted_url(&self) -> String {
        redact_url(&self.url)
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: Self::DEFAULT_URL.to_string(),
            max_connections: Self::DEFAULT_MAX_CONNECTIONS,
        }
    }
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &self.redacted_url())
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

/// Replace the password component of a URL with `***`.
///
/// Unparsable input is returned as a placeholder rather than echoed.
pub fn redact_url(raw: &str) -> String {
    match url::Url::parse(raw) {
        Ok(mut parsed) => {
            if parsed.password().is_some() {
                let _ = parsed.set_password(Some("***"));
            }
            parsed.to_string()
        }
        Err(_) => "<unparsable url>".to_string(),
    }
}
