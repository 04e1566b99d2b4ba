//! RPC handlers.
//!
//! [`UserService`] and [`KeeperService`] orchestrate the repositories and the
//! token manager. They are the only place storage errors become wire
//! [`Status`](crate::rpc::Status) codes; driver details are logged, never
//! returned.

mod keeper;
mod user;

pub use keeper::KeeperService;
pub use user::UserService;

use std::sync::Arc;

use axum::{Json, Router, extract::State, routing::post};

use crate::rpc::protocol::{
    CreateSecretRequest, CreateSecretResponse, Credentials, DeleteSecretResponse,
    ListSecretsResponse, ReadSecretResponse, SecretName, TokenResponse, methods,
};
use crate::rpc::{CallContext, RpcJson, Status};

/// Methods that must be reachable without a token.
pub const UNAUTHENTICATED_METHODS: &[&str] = &[methods::REGISTER, methods::LOGIN];

/// Routes for Register and Login.
pub fn user_routes(service: Arc<UserService>) -> Router {
    Router::new()
        .route(methods::REGISTER, post(register))
        .route(methods::LOGIN, post(login))
        .with_state(service)
}

/// Routes for the owner-scoped secret methods.
pub fn keeper_routes(service: Arc<KeeperService>) -> Router {
    Router::new()
        .route(methods::CREATE_SECRET, post(create_secret))
        .route(methods::READ_SECRET, post(read_secret))
        .route(methods::DELETE_SECRET, post(delete_secret))
        .route(methods::LIST_SECRETS, post(list_secrets))
        .with_state(service)
}

async fn register(
    State(service): State<Arc<UserService>>,
    RpcJson(request): RpcJson<Credentials>,
) -> Result<Json<TokenResponse>, Status> {
    service.register(request).await.map(Json)
}

async fn login(
    State(service): State<Arc<UserService>>,
    RpcJson(request): RpcJson<Credentials>,
) -> Result<Json<TokenResponse>, Status> {
    service.login(request).await.map(Json)
}

async fn create_secret(
    State(service): State<Arc<KeeperService>>,
    context: CallContext,
    RpcJson(request): RpcJson<CreateSecretRequest>,
) -> Result<Json<CreateSecretResponse>, Status> {
    let owner_id = context.require_owner()?;
    service.create_secret(owner_id, request).await.map(Json)
}

async fn read_secret(
    State(service): State<Arc<KeeperService>>,
    context: CallContext,
    RpcJson(request): RpcJson<SecretName>,
) -> Result<Json<ReadSecretResponse>, Status> {
    let owner_id = context.require_owner()?;
    service.read_secret(owner_id, request).await.map(Json)
}

async fn delete_secret(
    State(service): State<Arc<KeeperService>>,
    context: CallContext,
    RpcJson(request): RpcJson<SecretName>,
) -> Result<Json<DeleteSecretResponse>, Status> {
    let owner_id = context.require_owner()?;
    service.delete_secret(owner_id, request).await.map(Json)
}

// Takes no body, so callers may send `{}` or nothing.
async fn list_secrets(
    State(service): State<Arc<KeeperService>>,
    context: CallContext,
) -> Result<Json<ListSecretsResponse>, Status> {
    let owner_id = context.require_owner()?;
    service.list_secrets(owner_id).await.map(Json)
}
