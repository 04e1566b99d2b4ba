//! In-memory storage backend
//!
//! Holds users and secrets in maps behind a single async lock. Uniqueness is
//! decided inside one write-lock critical section, mirroring the UNIQUE
//! constraints of the SQL schema. Nothing is persisted.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;
use zeroize::Zeroizing;

use super::crypto::{self, Verification};
use super::{SecretRepository, StorageError, UserRepository};
use crate::Result;
use crate::model::{Secret, SecretSummary, User};

#[derive(Debug)]
struct StoredUser {
    email: String,
    password_hash: String,
}

#[derive(Debug, Default)]
struct State {
    users: HashMap<Uuid, StoredUser>,
    /// email -> user id
    emails: HashMap<String, Uuid>,
    /// Keyed by owner then name, so iterating one owner's range is name-ordered.
    secrets: BTreeMap<(Uuid, String), Secret>,
}

/// Map-backed implementation of both repository traits.
#[derive(Debug, Default)]
pub struct InMemory {
    state: RwLock<State>,
}

impl InMemory {
    /// Creates a new, empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered users.
    pub async fn user_count(&self) -> usize {
        self.state.read().await.users.len()
    }
}

#[async_trait]
impl UserRepository for InMemory {
    async fn create(&self, user: User) -> Result<User> {
        // Hash before taking the lock; Argon2 is slow on purpose.
        let password_hash = crypto::hash_password_blocking(user.password.clone()).await?;

        let mut state = self.state.write().await;
        if state.emails.contains_key(&user.email) {
            return Err(StorageError::EmailTaken.into());
        }

        let id = Uuid::new_v4();
        state.emails.insert(user.email.clone(), id);
        state.users.insert(
            id,
            StoredUser {
                email: user.email.clone(),
                password_hash,
            },
        );
        debug!(user_id = %id, "user created");

        Ok(User::stored(id, user.email))
    }

    async fn read_by_email_and_password(&self, email: &str, password: &str) -> Result<User> {
        let found = {
            let state = self.state.read().await;
            state.emails.get(email).and_then(|id| {
                state
                    .users
                    .get(id)
                    .map(|stored| (*id, stored.email.clone(), stored.password_hash.clone()))
            })
        };

        let (id, email, hash) = match found {
            Some((id, email, hash)) => (Some(id), Some(email), Some(hash)),
            None => (None, None, None),
        };

        let verdict =
            crypto::verify_password_blocking(Zeroizing::new(password.to_string()), hash).await?;

        match (verdict, id, email) {
            (Verification::Match, Some(id), Some(email)) => Ok(User::stored(id, email)),
            _ => Err(StorageError::UserNotFound.into()),
        }
    }

    async fn read(&self, id: &Uuid) -> Result<User> {
        let state = self.state.read().await;
        state
            .users
            .get(id)
            .map(|stored| User::stored(*id, stored.email.clone()))
            .ok_or_else(|| StorageError::UserNotFound.into())
    }
}

#[async_trait]
impl SecretRepository for InMemory {
    async fn create(&self, owner_id: &Uuid, secret: Secret) -> Result<Secret> {
        let mut state = self.state.write().await;
        if !state.users.contains_key(owner_id) {
            return Err(StorageError::UnknownOwner.into());
        }

        let key = (*owner_id, secret.name.clone());
        if state.secrets.contains_key(&key) {
            return Err(StorageError::SecretNameTaken { name: secret.name }.into());
        }

        let stored = Secret {
            id: Uuid::new_v4(),
            owner_id: *owner_id,
            ..secret
        };
        state.secrets.insert(key, stored.clone());

        Ok(stored)
    }

    async fn read_by_name(&self, owner_id: &Uuid, name: &str) -> Result<Secret> {
        let state = self.state.read().await;
        state
            .secrets
            .get(&(*owner_id, name.to_string()))
            .cloned()
            .ok_or_else(|| {
                StorageError::SecretNotFound {
                    name: name.to_string(),
                }
                .into()
            })
    }

    async fn delete_by_name(&self, owner_id: &Uuid, name: &str) -> Result<()> {
        let mut state = self.state.write().await;
        match state.secrets.remove(&(*owner_id, name.to_string())) {
            Some(_) => Ok(()),
            None => Err(StorageError::SecretNotFound {
                name: name.to_string(),
            }
            .into()),
        }
    }

    async fn list(&self, owner_id: &Uuid) -> Result<Vec<SecretSummary>> {
        let state = self.state.read().await;
        Ok(state
            .secrets
            .range((*owner_id, String::new())..)
            .take_while(|((owner, _), _)| owner == owner_id)
            .map(|(_, secret)| secret.summary())
            .collect())
    }
}
