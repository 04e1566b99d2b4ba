//! The RPC surface.
//!
//! Calls are JSON-over-HTTP: the request path is the full method name (see
//! [`protocol::methods`]) and failures come back as a [`Status`]. The
//! [`server`] module assembles the interceptor chain and lifecycle; the
//! [`client`] module is the typed caller.

pub mod auth;
pub mod client;
pub mod protocol;
pub mod server;
mod status;

pub use status::{Code, Status};

use std::convert::Infallible;

use axum::{
    Json,
    extract::{FromRequest, FromRequestParts, Request, rejection::JsonRejection},
    http::request::Parts,
};
use serde::de::DeserializeOwned;
use uuid::Uuid;

/// Request-scoped identity attached by the authentication stage.
///
/// Handlers for exempt methods see an anonymous context.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallContext {
    owner_id: Option<Uuid>,
}

impl CallContext {
    pub fn authenticated(owner_id: Uuid) -> Self {
        Self {
            owner_id: Some(owner_id),
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn owner_id(&self) -> Option<Uuid> {
        self.owner_id
    }

    /// The verified owner, or `Unauthenticated`.
    pub fn require_owner(&self) -> Result<Uuid, Status> {
        self.owner_id
            .ok_or_else(|| Status::unauthenticated("missing caller identity"))
    }
}

impl<S> FromRequestParts<S> for CallContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<CallContext>()
            .copied()
            .unwrap_or_default())
    }
}

/// JSON body extractor whose rejections are `InvalidArgument` statuses.
#[derive(Debug, Clone, Copy, Default)]
pub struct RpcJson<T>(pub T);

impl<T, S> FromRequest<S> for RpcJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Status;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(RpcJson(value)),
            Err(rejection) => Err(Status::invalid_argument(rejection_message(&rejection))),
        }
    }
}

fn rejection_message(rejection: &JsonRejection) -> String {
    match rejection {
        JsonRejection::MissingJsonContentType(_) => "expected application/json body".to_string(),
        other => format!("malformed request body: {}", other.body_text()),
    }
}
