//! Password hashing for the user repositories
//!
//! Passwords are hashed with Argon2id into PHC strings. Verification goes
//! through the Argon2 verifier, which compares digests in constant time.
//! Both operations are CPU-bound and run on the blocking pool.

use std::sync::OnceLock;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core},
};
use zeroize::Zeroizing;

use super::errors::StorageError;
use crate::Result;

/// Outcome of checking a password against a stored hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verification {
    Match,
    Mismatch,
}

/// Hash a password using Argon2id.
///
/// Returns the PHC-format hash string, which embeds the random salt.
pub fn hash_password(password: impl AsRef<str>) -> Result<String> {
    let salt = SaltString::generate(&mut rand_core::OsRng);

    Argon2::default()
        .hash_password(password.as_ref().as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            StorageError::PasswordHash {
                reason: format!("hashing failed: {e}"),
            }
            .into()
        })
}

/// Verify a password against its PHC hash.
pub fn verify_password(
    password: impl AsRef<str>,
    password_hash: impl AsRef<str>,
) -> Result<Verification> {
    let parsed_hash =
        PasswordHash::new(password_hash.as_ref()).map_err(|e| StorageError::CorruptRecord {
            reason: format!("unparsable password hash: {e}"),
        })?;

    match Argon2::default().verify_password(password.as_ref().as_bytes(), &parsed_hash) {
        Ok(()) => Ok(Verification::Match),
        Err(argon2::password_hash::Error::Password) => Ok(Verification::Mismatch),
        Err(e) => Err(StorageError::PasswordHash {
            reason: format!("verification failed: {e}"),
        }
        .into()),
    }
}

/// Spend the same work as a real verification when the email is unknown, so
/// response timing does not reveal which emails are registered.
pub fn verify_against_dummy(password: impl AsRef<str>) {
    static DUMMY_HASH: OnceLock<Option<String>> = OnceLock::new();

    let dummy = DUMMY_HASH.get_or_init(|| hash_password("vaultkeeper-dummy-password").ok());
    if let Some(hash) = dummy {
        let _ = verify_password(password, hash);
    }
}

/// [`hash_password`] on the blocking pool.
pub async fn hash_password_blocking(password: Zeroizing<String>) -> Result<String> {
    tokio::task::spawn_blocking(move || hash_password(password.as_str()))
        .await
        .map_err(|e| StorageError::PasswordHash {
            reason: format!("hashing task failed: {e}"),
        })?
}

/// [`verify_password`] on the blocking pool. A `None` hash runs the dummy
/// verification and reports a mismatch.
pub async fn verify_password_blocking(
    password: Zeroizing<String>,
    password_hash: Option<String>,
) -> Result<Verification> {
    tokio::task::spawn_blocking(move || match password_hash {
        Some(hash) => verify_password(password.as_str(), hash),
        None => {
            verify_against_dummy(password.as_str());
            Ok(Verification::Mismatch)
        }
    })
    .await
    .map_err(|e| StorageError::PasswordHash {
        reason: format!("verification task failed: {e}"),
    })?
}
