//! Stateless identity tokens.
//!
//! A token binds a subject string (an [`Identity`]) to a validity window and
//! is signed with a symmetric key held by the [`TokenManager`]. Nothing is
//! stored server-side, so a token stays valid until its embedded expiry.

mod errors;
mod jwt;

pub use errors::TokenError;
pub use jwt::JwtManager;

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::Result;

/// Anything that can act as a token subject.
pub trait Identity {
    /// A stable string naming the principal.
    fn identity(&self) -> String;
}

/// Claims carried inside every token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the identity string the token was issued for.
    pub sub: String,
    /// Issued at (Unix seconds)
    pub iat: u64,
    /// Not before (Unix seconds)
    pub nbf: u64,
    /// Expiration (Unix seconds)
    pub exp: u64,
}

impl Identity for Claims {
    fn identity(&self) -> String {
        self.sub.clone()
    }
}

/// Issues and verifies identity tokens.
pub trait TokenManager: Send + Sync {
    /// Sign a token for `identity`, valid for `lifetime` from now.
    fn issue(&self, identity: &dyn Identity, lifetime: Duration) -> Result<String>;

    /// Verify `token` and return its claims.
    fn decode(&self, token: &str) -> Result<Claims>;

    /// Verify `token` and check that it was issued for `target`.
    fn validate(&self, token: &str, target: &dyn Identity) -> Result<()> {
        let claims = self.decode(token)?;
        if claims.identity() != target.identity() {
            return Err(TokenError::invalid("subject mismatch").into());
        }
        Ok(())
    }
}
