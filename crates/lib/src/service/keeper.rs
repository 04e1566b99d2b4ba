//! Owner-scoped secret operations.

use std::sync::Arc;

use tracing::{debug, error};
use uuid::Uuid;

use crate::model::Secret;
use crate::rpc::Status;
use crate::rpc::protocol::{
    CreateSecretRequest, CreateSecretResponse, DeleteSecretResponse, ListSecretsResponse,
    ReadSecretResponse, SecretEntry, SecretName,
};
use crate::storage::SecretRepository;

/// Stores, reads, lists and deletes one owner's secrets.
///
/// Every operation takes the owner id resolved by the authentication stage.
pub struct KeeperService {
    secrets: Arc<dyn SecretRepository>,
}

impl KeeperService {
    pub fn new(secrets: Arc<dyn SecretRepository>) -> Self {
        Self { secrets }
    }

    pub async fn create_secret(
        &self,
        owner_id: Uuid,
        request: CreateSecretRequest,
    ) -> Result<CreateSecretResponse, Status> {
        validate_name(&request.name)?;

        let secret = Secret::new(owner_id, request.name, request.kind, request.content);
        let stored = self
            .secrets
            .create(&owner_id, secret)
            .await
            .map_err(|e| {
                if e.is_conflict() {
                    Status::already_exists("secret already exists")
                } else {
                    error!(component = "service", owner_id = %owner_id, error = %e, "failed to create secret");
                    Status::internal("failed to create secret")
                }
            })?;

        debug!(component = "service", owner_id = %owner_id, secret_id = %stored.id, "secret created");
        Ok(CreateSecretResponse {
            name: stored.name,
            kind: stored.kind,
        })
    }

    pub async fn read_secret(
        &self,
        owner_id: Uuid,
        request: SecretName,
    ) -> Result<ReadSecretResponse, Status> {
        validate_name(&request.name)?;

        let secret = self
            .secrets
            .read_by_name(&owner_id, &request.name)
            .await
            .map_err(|e| {
                if e.is_not_found() {
                    Status::not_found("secret not found")
                } else {
                    error!(component = "service", owner_id = %owner_id, error = %e, "failed to read secret");
                    Status::internal("failed to read secret")
                }
            })?;

        Ok(ReadSecretResponse {
            name: secret.name,
            kind: secret.kind,
            content: secret.content,
        })
    }

    pub async fn delete_secret(
        &self,
        owner_id: Uuid,
        request: SecretName,
    ) -> Result<DeleteSecretResponse, Status> {
        validate_name(&request.name)?;

        self.secrets
            .delete_by_name(&owner_id, &request.name)
            .await
            .map_err(|e| {
                if e.is_not_found() {
                    Status::not_found("secret not found")
                } else {
                    error!(component = "service", owner_id = %owner_id, error = %e, "failed to delete secret");
                    Status::internal("failed to delete secret")
                }
            })?;

        Ok(DeleteSecretResponse {})
    }

    pub async fn list_secrets(&self, owner_id: Uuid) -> Result<ListSecretsResponse, Status> {
        let summaries = self.secrets.list(&owner_id).await.map_err(|e| {
            error!(component = "service", owner_id = %owner_id, error = %e, "failed to list secrets");
            Status::internal("failed to list secrets")
        })?;

        Ok(ListSecretsResponse {
            secrets: summaries
                .into_iter()
                .map(|summary| SecretEntry {
                    name: summary.name,
                    kind: summary.kind,
                })
                .collect(),
        })
    }
}

fn validate_name(name: &str) -> Result<(), Status> {
    if name.is_empty() {
        return Err(Status::invalid_argument("secret name must not be empty"));
    }
    Ok(())
}
