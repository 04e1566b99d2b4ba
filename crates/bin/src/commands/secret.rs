//! Secret commands - ls, create, read and rm.

use std::io::Read;
use std::path::Path;

use serde_json::json;

use crate::cli::{ClientArgs, CreateShape, SecretCommand};
use crate::output::{OutputFormat, print_json, print_table};
use crate::session::SessionStore;
use crate::shapes::{Card, LoginPassword, Shape};

use super::connect;

/// Run a secret subcommand
pub async fn run(
    client_args: &ClientArgs,
    command: &SecretCommand,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let sessions = SessionStore::resolve(client_args.auth_file.as_deref())?;
    let token = sessions
        .token_for(&client_args.server)
        .await?
        .ok_or("not logged in; run `vaultkeeper auth login` first")?;
    let client = connect(client_args, Some(token));

    match command {
        SecretCommand::Ls => {
            let secrets = client.list_secrets().await?;
            match format {
                OutputFormat::Json => print_json(&secrets)?,
                OutputFormat::Human if secrets.is_empty() => println!("no secrets"),
                OutputFormat::Human => {
                    let rows: Vec<Vec<String>> = secrets
                        .into_iter()
                        .map(|s| vec![s.name, s.kind])
                        .collect();
                    print_table(&["NAME", "TYPE"], &rows);
                }
            }
        }
        SecretCommand::Create { shape } => {
            let (name, shape) = build_shape(shape).await?;
            let content = shape.encode()?;
            let created = client.create_secret(name, shape.kind(), content).await?;
            match format {
                OutputFormat::Json => print_json(&created)?,
                OutputFormat::Human => println!("created {} ({})", created.name, created.kind),
            }
        }
        SecretCommand::Read { name } => {
            let secret = client.read_secret(name).await?;
            let shape = Shape::decode(&secret.kind, secret.content)?;
            match format {
                OutputFormat::Json => print_json(&json!({
                    "name": secret.name,
                    "type": shape.kind(),
                    "content": shape.to_string(),
                }))?,
                OutputFormat::Human => println!("{shape}"),
            }
        }
        SecretCommand::Rm { name } => {
            client.delete_secret(name).await?;
            if format == OutputFormat::Human {
                println!("deleted {name}");
            }
        }
    }
    Ok(())
}

async fn build_shape(shape: &CreateShape) -> Result<(&str, Shape), Box<dyn std::error::Error>> {
    Ok(match shape {
        CreateShape::Raw { name, from_file } => {
            let content = match from_file {
                Some(path) => read_file(path).await?,
                None => read_stdin().await?,
            };
            (name.as_str(), Shape::Raw(content))
        }
        CreateShape::Lp {
            name,
            login,
            password,
        } => (
            name.as_str(),
            Shape::Lp(LoginPassword {
                login: login.clone(),
                password: password.clone(),
            }),
        ),
        CreateShape::Card {
            name,
            number,
            expires,
            cvv,
            holder,
        } => (
            name.as_str(),
            Shape::Card(Card {
                number: number.clone(),
                expires: expires.clone(),
                cvv: cvv.clone(),
                holder: holder.clone(),
            }),
        ),
    })
}

async fn read_file(path: &Path) -> std::io::Result<Vec<u8>> {
    tokio::fs::read(path).await
}

async fn read_stdin() -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    let content = tokio::task::spawn_blocking(|| {
        let mut buf = Vec::new();
        std::io::stdin().read_to_end(&mut buf).map(|_| buf)
    })
    .await??;
    Ok(content)
}
