//! Error types for token issuance and verification.

use thiserror::Error;

/// Errors raised by a [`TokenManager`](super::TokenManager).
///
/// `reason` strings are diagnostics for server-side logs. Callers on the wire
/// only ever see a generic "invalid auth token".
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum TokenError {
    /// Signature, algorithm, structure or validity window rejected.
    #[error("invalid token: {reason}")]
    InvalidToken { reason: String },

    /// The manager was constructed without a signing key.
    #[error("token signing key must not be empty")]
    EmptySigningKey,

    /// Encoding the claims failed.
    #[error("failed to sign token: {reason}")]
    SigningFailed { reason: String },
}

impl TokenError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        TokenError::InvalidToken {
            reason: reason.into(),
        }
    }
}
