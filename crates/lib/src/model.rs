//! Records owned by the repositories.

use std::fmt;

use uuid::Uuid;
use zeroize::Zeroizing;

use crate::token::Identity;

/// A registered principal.
///
/// `password` only carries plaintext on its way into a repository (create or
/// credential check). Records read back from storage leave it empty; the hash
/// never leaves the storage layer.
#[derive(Clone, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub password: Zeroizing<String>,
}

impl User {
    /// Build an unsaved user from registration input.
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            id: Uuid::nil(),
            email: email.into(),
            password: Zeroizing::new(password.into()),
        }
    }

    /// A stored user as returned by a repository, without credentials.
    pub fn stored(id: Uuid, email: impl Into<String>) -> Self {
        Self {
            id,
            email: email.into(),
            password: Zeroizing::new(String::new()),
        }
    }
}

impl Identity for User {
    fn identity(&self) -> String {
        self.id.hyphenated().to_string()
    }
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// A named, typed blob owned by one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Secret {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub kind: String,
    pub content: Vec<u8>,
}

impl Secret {
    /// Build an unsaved secret for `owner_id`.
    pub fn new(
        owner_id: Uuid,
        name: impl Into<String>,
        kind: impl Into<String>,
        content: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            id: Uuid::nil(),
            owner_id,
            name: name.into(),
            kind: kind.into(),
            content: content.into(),
        }
    }

    pub fn summary(&self) -> SecretSummary {
        SecretSummary {
            name: self.name.clone(),
            kind: self.kind.clone(),
        }
    }
}

/// Listing projection of a [`Secret`]. Never carries content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretSummary {
    pub name: String,
    pub kind: String,
}
