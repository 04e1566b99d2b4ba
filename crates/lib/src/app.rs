//! Process wiring.
//!
//! [`App`] turns a [`VaultConfig`] into a running server: it connects the
//! database (initializing the schema), builds the token manager, registers
//! the services and starts listening. [`server_builder`] does the service
//! wiring alone, for callers that bring their own repositories.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::Result;
use crate::config::{ServerConfig, VaultConfig};
use crate::rpc::auth::TokenAuthenticator;
use crate::rpc::server::{RpcServerBuilder, RunningServer};
use crate::service::{
    KeeperService, UNAUTHENTICATED_METHODS, UserService, keeper_routes, user_routes,
};
use crate::storage::{SecretRepository, UserRepository};
use crate::token::{JwtManager, TokenManager};

#[cfg(any(feature = "sqlite", feature = "postgres"))]
use crate::storage::sql::SqlxStore;

/// A server builder with both services and token authentication registered.
pub fn server_builder(
    config: ServerConfig,
    users: Arc<dyn UserRepository>,
    secrets: Arc<dyn SecretRepository>,
    tokens: Arc<dyn TokenManager>,
    token_lifetime: Duration,
) -> RpcServerBuilder {
    let user_service = Arc::new(UserService::new(users, tokens.clone(), token_lifetime));
    let keeper_service = Arc::new(KeeperService::new(secrets));

    UNAUTHENTICATED_METHODS.iter().fold(
        RpcServerBuilder::new(config)
            .service(user_routes(user_service))
            .service(keeper_routes(keeper_service))
            .authenticator(Arc::new(TokenAuthenticator::new(tokens))),
        |builder, method| builder.exempt(*method),
    )
}

/// Build the token manager from configuration.
pub fn token_manager(config: &VaultConfig) -> Result<Arc<JwtManager>> {
    let (key, generated) = config.token.signing_key();
    if generated {
        warn!(
            component = "app",
            "no token secret configured; generated a random key, issued tokens will not survive a restart"
        );
    }
    Ok(Arc::new(JwtManager::new(key.as_bytes())?))
}

/// A configured, not yet started vault server.
#[derive(Debug)]
pub struct App {
    config: VaultConfig,
}

impl App {
    pub fn new(config: VaultConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    /// Connect storage and start serving.
    #[cfg(any(feature = "sqlite", feature = "postgres"))]
    pub async fn start(self) -> Result<RunningApp> {
        self.config.validate()?;

        info!(
            component = "app",
            database = %self.config.database.redacted_url(),
            "connecting to database"
        );
        let store = Arc::new(SqlxStore::connect(&self.config.database).await?);
        let tokens = token_manager(&self.config)?;

        let server = server_builder(
            self.config.server.clone(),
            store.clone(),
            store.clone(),
            tokens,
            self.config.token.lifetime,
        )
        .start()
        .await?;

        Ok(RunningApp { server, store })
    }
}

/// A started [`App`].
#[cfg(any(feature = "sqlite", feature = "postgres"))]
#[derive(Debug)]
pub struct RunningApp {
    server: RunningServer,
    store: Arc<SqlxStore>,
}

#[cfg(any(feature = "sqlite", feature = "postgres"))]
impl RunningApp {
    pub fn local_addr(&self) -> SocketAddr {
        self.server.local_addr()
    }

    /// Drain the server, then close the database pool.
    ///
    /// The pool is closed only after every call has finished or been
    /// cancelled.
    pub async fn stop(self) -> Result<()> {
        let stopped = self.server.stop().await;
        self.store.close().await;
        stopped
    }
}
