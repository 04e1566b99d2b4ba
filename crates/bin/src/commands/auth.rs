//! Auth commands - register, login and forget.

use crate::cli::{AuthCommand, ClientArgs};
use crate::session::SessionStore;

use super::connect;

/// Run an auth subcommand
pub async fn run(
    client_args: &ClientArgs,
    command: &AuthCommand,
) -> Result<(), Box<dyn std::error::Error>> {
    let sessions = SessionStore::resolve(client_args.auth_file.as_deref())?;

    match command {
        AuthCommand::Register { email, password } => {
            let client = connect(client_args, None);
            let token = client.register(email, password).await?;
            sessions.save(client.base_url(), token).await?;
            println!("registered {email}");
        }
        AuthCommand::Login { email, password } => {
            let client = connect(client_args, None);
            let token = client.login(email, password).await?;
            sessions.save(client.base_url(), token).await?;
            println!("logged in as {email}");
        }
        AuthCommand::Forget => {
            if sessions.forget().await? {
                println!("forgot cached token at {}", sessions.path().display());
            } else {
                println!("no cached token");
            }
        }
    }
    Ok(())
}
