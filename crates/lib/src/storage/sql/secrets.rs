//! [`SecretRepository`] over SQL.

use async_trait::async_trait;
use uuid::Uuid;

use crate::Result;
use crate::model::{Secret, SecretSummary};
use crate::storage::{SecretRepository, StorageError};

use super::users::parse_id;
use super::{SqlxResultExt, SqlxStore, is_foreign_key_violation, is_unique_violation};

#[async_trait]
impl SecretRepository for SqlxStore {
    async fn create(&self, owner_id: &Uuid, secret: Secret) -> Result<Secret> {
        let id = Uuid::new_v4();

        let inserted = sqlx::query(
            "INSERT INTO secrets (id, owner_id, type, name, content) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(id.to_string())
        .bind(owner_id.to_string())
        .bind(&secret.kind)
        .bind(&secret.name)
        .bind(&secret.content)
        .execute(self.pool())
        .await;

        match inserted {
            Ok(_) => Ok(Secret {
                id,
                owner_id: *owner_id,
                ..secret
            }),
            Err(e) if is_unique_violation(&e) => {
                Err(StorageError::SecretNameTaken { name: secret.name }.into())
            }
            Err(e) if is_foreign_key_violation(&e) => Err(StorageError::UnknownOwner.into()),
            Err(e) => Err(e).sql_context("Failed to insert secret"),
        }
    }

    async fn read_by_name(&self, owner_id: &Uuid, name: &str) -> Result<Secret> {
        let row: Option<(String, String, Vec<u8>)> = sqlx::query_as(
            "SELECT id, type, content FROM secrets WHERE owner_id = $1 AND name = $2",
        )
        .bind(owner_id.to_string())
        .bind(name)
        .fetch_optional(self.pool())
        .await
        .sql_context("Failed to read secret")?;

        match row {
            Some((id, kind, content)) => Ok(Secret {
                id: parse_id(&id)?,
                owner_id: *owner_id,
                name: name.to_string(),
                kind,
                content,
            }),
            None => Err(StorageError::SecretNotFound {
                name: name.to_string(),
            }
            .into()),
        }
    }

    async fn delete_by_name(&self, owner_id: &Uuid, name: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM secrets WHERE owner_id = $1 AND name = $2")
            .bind(owner_id.to_string())
            .bind(name)
            .execute(self.pool())
            .await
            .sql_context("Failed to delete secret")?;

        if result.rows_affected() == 0 {
            return Err(StorageError::SecretNotFound {
                name: name.to_string(),
            }
            .into());
        }
        Ok(())
    }

    async fn list(&self, owner_id: &Uuid) -> Result<Vec<SecretSummary>> {
        let query = format!(
            "SELECT name, type FROM secrets WHERE owner_id = $1 ORDER BY name COLLATE {}",
            self.kind().byte_collation()
        );

        let rows: Vec<(String, String)> = sqlx::query_as(&query)
            .bind(owner_id.to_string())
            .fetch_all(self.pool())
            .await
            .sql_context("Failed to list secrets")?;

        Ok(rows
            .into_iter()
            .map(|(name, kind)| SecretSummary { name, kind })
            .collect())
    }
}
