//! Request authentication.
//!
//! The server runs every call that is not on its exemption list through an
//! [`Authenticator`]. On success the verified owner is attached to the
//! request as a [`CallContext`]; on failure the call is answered with
//! `Unauthenticated` and never reaches a handler.

use std::collections::HashSet;
use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{HeaderMap, header::AUTHORIZATION},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::debug;
use uuid::Uuid;

use super::{CallContext, Status};
use crate::token::TokenManager;

const BEARER: &str = "bearer";

/// Resolves the caller's owner id from request headers.
pub trait Authenticator: Send + Sync {
    fn authenticate(&self, headers: &HeaderMap) -> Result<Uuid, Status>;
}

/// Extract the token from an `authorization: bearer <token>` header.
///
/// The scheme is matched case-insensitively.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, Status> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or_else(|| Status::unauthenticated("missing authorization header"))?
        .to_str()
        .map_err(|_| Status::unauthenticated("malformed authorization header"))?;

    let (scheme, token) = value
        .split_once(' ')
        .ok_or_else(|| Status::unauthenticated("malformed authorization header"))?;
    let token = token.trim();
    if !scheme.eq_ignore_ascii_case(BEARER) || token.is_empty() {
        return Err(Status::unauthenticated("malformed authorization header"));
    }

    Ok(token)
}

/// Authenticates bearer tokens issued by a [`TokenManager`].
pub struct TokenAuthenticator {
    tokens: Arc<dyn TokenManager>,
}

impl TokenAuthenticator {
    pub fn new(tokens: Arc<dyn TokenManager>) -> Self {
        Self { tokens }
    }
}

impl Authenticator for TokenAuthenticator {
    fn authenticate(&self, headers: &HeaderMap) -> Result<Uuid, Status> {
        let token = bearer_token(headers)?;

        let claims = self.tokens.decode(token).map_err(|e| {
            debug!(component = "auth", error = %e, "token rejected");
            Status::unauthenticated("invalid auth token")
        })?;

        Uuid::parse_str(&claims.sub).map_err(|e| {
            debug!(component = "auth", error = %e, "token subject is not a user id");
            Status::unauthenticated("invalid auth token")
        })
    }
}

/// Accepts every call as one fixed owner.
#[cfg(any(test, feature = "testing"))]
#[derive(Debug, Clone, Copy)]
pub struct FixedAuthenticator(pub Uuid);

#[cfg(any(test, feature = "testing"))]
impl Authenticator for FixedAuthenticator {
    fn authenticate(&self, _headers: &HeaderMap) -> Result<Uuid, Status> {
        Ok(self.0)
    }
}

/// Authentication stage state: the authenticator and the exempt paths.
#[derive(Clone)]
pub(crate) struct AuthGate {
    authenticator: Arc<dyn Authenticator>,
    exempt: Arc<HashSet<String>>,
}

impl AuthGate {
    pub(crate) fn new(authenticator: Arc<dyn Authenticator>, exempt: HashSet<String>) -> Self {
        Self {
            authenticator,
            exempt: Arc::new(exempt),
        }
    }
}

pub(crate) async fn authenticate(
    State(gate): State<AuthGate>,
    mut request: Request,
    next: Next,
) -> Response {
    if gate.exempt.contains(request.uri().path()) {
        return next.run(request).await;
    }

    match gate.authenticator.authenticate(request.headers()) {
        Ok(owner_id) => {
            request
                .extensions_mut()
                .insert(CallContext::authenticated(owner_id));
            next.run(request).await
        }
        Err(status) => status.into_response(),
    }
}
