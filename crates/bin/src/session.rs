//! Token cache for client commands.
//!
//! `auth register` and `auth login` store the issued token, together with
//! the server it is valid for, in a small JSON file. Other commands read it
//! back and attach it to their calls.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A cached bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub server: String,
    pub token: String,
    pub saved_at: DateTime<Utc>,
}

/// The on-disk location of the cached [`Session`].
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<config dir>/vaultkeeper/auth.json`, or `path` when given.
    pub fn resolve(path: Option<&Path>) -> Result<Self, Box<dyn std::error::Error>> {
        match path {
            Some(path) => Ok(Self::new(path)),
            None => {
                let dir = dirs::config_dir().ok_or("cannot determine the config directory")?;
                Ok(Self::new(dir.join("vaultkeeper").join("auth.json")))
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The cached session, or `None` if nothing has been saved.
    pub async fn load(&self) -> Result<Option<Session>, Box<dyn std::error::Error>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// The cached token, if it was issued by `server`.
    pub async fn token_for(
        &self,
        server: &str,
    ) -> Result<Option<String>, Box<dyn std::error::Error>> {
        Ok(self
            .load()
            .await?
            .filter(|session| same_server(&session.server, server))
            .map(|session| session.token))
    }

    pub async fn save(&self, server: &str, token: String) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let session = Session {
            server: server.to_string(),
            token,
            saved_at: Utc::now(),
        };
        tokio::fs::write(&self.path, serde_json::to_vec_pretty(&session)?).await?;
        restrict_permissions(&self.path).await?;

        tracing::debug!(path = %self.path.display(), "token cached");
        Ok(())
    }

    /// Delete the cache. Returns whether anything was removed.
    pub async fn forget(&self) -> Result<bool, Box<dyn std::error::Error>> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

fn same_server(a: &str, b: &str) -> bool {
    a.trim_end_matches('/') == b.trim_end_matches('/')
}

#[cfg(unix)]
async fn restrict_permissions(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)).await
}

#[cfg(not(unix))]
async fn restrict_permissions(_path: &Path) -> std::io::Result<()> {
    Ok(())
}
