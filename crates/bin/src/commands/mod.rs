pub mod auth;
pub mod health;
pub mod migrate;
pub mod secret;
pub mod serve;

use std::time::Duration;

use vaultkeeper::rpc::client::VaultClient;

use crate::cli::ClientArgs;

/// A client for the configured server, carrying `token` when given.
fn connect(args: &ClientArgs, token: Option<String>) -> VaultClient {
    let mut client =
        VaultClient::new(args.server.as_str()).with_timeout(Duration::from_secs(args.timeout));
    client.set_token(token);
    client
}
