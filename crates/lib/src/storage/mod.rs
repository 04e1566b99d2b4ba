//! Persistence for users and secrets.
//!
//! The [`UserRepository`] and [`SecretRepository`] traits are the storage
//! seam. Two backends implement both:
//!
//! - [`sql::SqlxStore`]: SQLite or PostgreSQL through an `sqlx` `AnyPool`
//! - [`InMemory`]: a lock-guarded map used by tests and ephemeral servers
//!
//! Repositories return [`StorageError`]s. Passwords enter a repository as
//! plaintext, are hashed there with Argon2id, and never come back out.

pub mod crypto;
mod errors;
mod in_memory;
#[cfg(any(feature = "sqlite", feature = "postgres"))]
pub mod sql;

pub use errors::StorageError;
pub use in_memory::InMemory;

use async_trait::async_trait;
use uuid::Uuid;

use crate::Result;
use crate::model::{Secret, SecretSummary, User};

/// Persists user records and checks credentials.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Store a new user, returning it with its assigned id.
    ///
    /// Fails with [`StorageError::EmailTaken`] when the email is registered.
    async fn create(&self, user: User) -> Result<User>;

    /// Look up a user by email and check the password.
    ///
    /// An unknown email and a wrong password both yield
    /// [`StorageError::UserNotFound`].
    async fn read_by_email_and_password(&self, email: &str, password: &str) -> Result<User>;

    /// Look up a user by id.
    async fn read(&self, id: &Uuid) -> Result<User>;
}

/// Persists secrets scoped to their owner.
#[async_trait]
pub trait SecretRepository: Send + Sync {
    /// Store `secret` under `owner_id`, returning it with its assigned id.
    ///
    /// Names are unique per owner; a duplicate fails with
    /// [`StorageError::SecretNameTaken`] and leaves the existing secret alone.
    async fn create(&self, owner_id: &Uuid, secret: Secret) -> Result<Secret>;

    /// Fetch one secret by name.
    async fn read_by_name(&self, owner_id: &Uuid, name: &str) -> Result<Secret>;

    /// Delete one secret by name. Deleting nothing is
    /// [`StorageError::SecretNotFound`].
    async fn delete_by_name(&self, owner_id: &Uuid, name: &str) -> Result<()>;

    /// Summaries of every secret the owner holds, sorted by name.
    async fn list(&self, owner_id: &Uuid) -> Result<Vec<SecretSummary>>;
}
