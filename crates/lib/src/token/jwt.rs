//! HS256 JSON Web Token implementation of [`TokenManager`].

use std::{fmt, sync::Arc, time::Duration};

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use tracing::debug;

use super::{Claims, Identity, TokenError, TokenManager};
use crate::{Clock, Result, SystemClock};

const ALGORITHM: Algorithm = Algorithm::HS256;

/// Token manager signing HS256 JWTs with a fixed secret.
///
/// Expiry and not-before are checked against the manager's own [`Clock`]
/// with zero leeway, rather than by `jsonwebtoken`'s wall-clock check.
pub struct JwtManager {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    clock: Arc<dyn Clock>,
}

impl JwtManager {
    /// Create a manager using the system clock.
    pub fn new(secret: impl AsRef<[u8]>) -> Result<Self> {
        Self::with_clock(secret, Arc::new(SystemClock))
    }

    /// Create a manager that reads time from `clock`.
    pub fn with_clock(secret: impl AsRef<[u8]>, clock: Arc<dyn Clock>) -> Result<Self> {
        let secret = secret.as_ref();
        if secret.is_empty() {
            return Err(TokenError::EmptySigningKey.into());
        }

        let mut validation = Validation::new(ALGORITHM);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["sub", "exp", "nbf", "iat"]);

        Ok(Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            clock,
        })
    }
}

impl fmt::Debug for JwtManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtManager")
            .field("algorithm", &ALGORITHM)
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

impl TokenManager for JwtManager {
    fn issue(&self, identity: &dyn Identity, lifetime: Duration) -> Result<String> {
        let now = self.clock.now_secs();
        let claims = Claims {
            sub: identity.identity(),
            iat: now,
            nbf: now,
            exp: now.saturating_add(lifetime.as_secs()),
        };

        encode(&Header::new(ALGORITHM), &claims, &self.encoding).map_err(|e| {
            TokenError::SigningFailed {
                reason: e.to_string(),
            }
            .into()
        })
    }

    fn decode(&self, token: &str) -> Result<Claims> {
        let claims = decode::<Claims>(token, &self.decoding, &self.validation)
            .map_err(|e| {
                debug!(error = %e, "token parse failed");
                TokenError::invalid(format!("token parse: {e}"))
            })?
            .claims;

        let now = self.clock.now_secs();
        if now >= claims.exp {
            return Err(TokenError::invalid("token expired").into());
        }
        if now < claims.nbf {
            return Err(TokenError::invalid("token not yet valid").into());
        }

        Ok(claims)
    }
}
