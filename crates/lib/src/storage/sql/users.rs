//! [`UserRepository`] over SQL.

use async_trait::async_trait;
use tracing::debug;
use uuid::Uuid;
use zeroize::Zeroizing;

use crate::Result;
use crate::model::User;
use crate::storage::crypto::{self, Verification};
use crate::storage::{StorageError, UserRepository};

use super::{SqlxResultExt, SqlxStore, is_unique_violation};

pub(super) fn parse_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|e| {
        StorageError::CorruptRecord {
            reason: format!("invalid id {raw:?}: {e}"),
        }
        .into()
    })
}

#[async_trait]
impl UserRepository for SqlxStore {
    async fn create(&self, user: User) -> Result<User> {
        let password_hash = crypto::hash_password_blocking(user.password.clone()).await?;
        let id = Uuid::new_v4();

        let inserted = sqlx::query("INSERT INTO users (id, email, password_hash) VALUES ($1, $2, $3)")
            .bind(id.to_string())
            .bind(&user.email)
            .bind(&password_hash)
            .execute(self.pool())
            .await;

        match inserted {
            Ok(_) => {
                debug!(user_id = %id, "user created");
                Ok(User::stored(id, user.email))
            }
            Err(e) if is_unique_violation(&e) => Err(StorageError::EmailTaken.into()),
            Err(e) => Err(e).sql_context("Failed to insert user"),
        }
    }

    async fn read_by_email_and_password(&self, email: &str, password: &str) -> Result<User> {
        let row: Option<(String, String, String)> =
            sqlx::query_as("SELECT id, email, password_hash FROM users WHERE email = $1")
                .bind(email)
                .fetch_optional(self.pool())
                .await
                .sql_context("Failed to look up user")?;

        let (record, hash) = match row {
            Some((id, email, hash)) => (Some((id, email)), Some(hash)),
            None => (None, None),
        };

        let verdict =
            crypto::verify_password_blocking(Zeroizing::new(password.to_string()), hash).await?;

        match (verdict, record) {
            (Verification::Match, Some((id, email))) => Ok(User::stored(parse_id(&id)?, email)),
            _ => Err(StorageError::UserNotFound.into()),
        }
    }

    async fn read(&self, id: &Uuid) -> Result<User> {
        let row: Option<(String,)> = sqlx::query_as("SELECT email FROM users WHERE id = $1")
            .bind(id.to_string())
            .fetch_optional(self.pool())
            .await
            .sql_context("Failed to read user")?;

        match row {
            Some((email,)) => Ok(User::stored(*id, email)),
            None => Err(StorageError::UserNotFound.into()),
        }
    }
}
