//!
//! Vaultkeeper: a per-user secret vault served over a small authenticated RPC surface.
//!
//! ## Core Concepts
//!
//! * **Tokens (`token::TokenManager`)**: Stateless, HMAC-signed bearer credentials whose subject is a user id.
//! * **Repositories (`storage::UserRepository`, `storage::SecretRepository`)**: The storage seam. An SQL
//!   backend (`storage::sql::SqlxStore`) and an in-memory backend (`storage::InMemory`) implement both.
//! * **Services (`service::UserService`, `service::KeeperService`)**: Map repository outcomes to wire
//!   `rpc::Status` codes. They are the only place storage errors are translated.
//! * **RPC server (`rpc::server::RpcServerBuilder`)**: Binds a listener and runs every call through the
//!   logging, panic-recovery and authentication stages before it reaches a service.
//! * **Call context (`rpc::CallContext`)**: The verified owner id attached to a request by the
//!   authentication stage.

pub mod app;
pub mod clock;
pub mod config;
pub mod model;
pub mod rpc;
pub mod service;
pub mod storage;
pub mod token;

pub use clock::{Clock, SystemClock};
#[cfg(any(test, feature = "testing"))]
pub use clock::FixedClock;

/// Result type used throughout the Vaultkeeper library.
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for the Vaultkeeper library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Structured token errors from the token module
    #[error(transparent)]
    Token(token::TokenError),

    /// Structured storage errors from the storage module
    #[error(transparent)]
    Storage(storage::StorageError),

    /// Structured server lifecycle errors from the rpc module
    #[error(transparent)]
    Server(rpc::server::ServerError),

    /// Configuration errors
    #[error(transparent)]
    Config(config::ConfigError),
}

impl Error {
    /// Get the originating module for this error.
    pub fn module(&self) -> &'static str {
        match self {
            Error::Token(_) => "token",
            Error::Storage(_) => "storage",
            Error::Server(_) => "rpc",
            Error::Config(_) => "config",
            Error::Io(_) => "io",
            Error::Serialize(_) => "serialize",
        }
    }

    /// Check if this error indicates a resource was not found.
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::Storage(storage_err) => storage_err.is_not_found(),
            _ => false,
        }
    }

    /// Check if this error indicates a conflict (already exists).
    pub fn is_conflict(&self) -> bool {
        match self {
            Error::Storage(storage_err) => storage_err.is_conflict(),
            _ => false,
        }
    }

    /// Check if this error means the presented credential was rejected.
    pub fn is_invalid_token(&self) -> bool {
        matches!(self, Error::Token(token::TokenError::InvalidToken { .. }))
    }
}

impl From<token::TokenError> for Error {
    fn from(err: token::TokenError) -> Self {
        Error::Token(err)
    }
}

impl From<storage::StorageError> for Error {
    fn from(err: storage::StorageError) -> Self {
        Error::Storage(err)
    }
}

impl From<rpc::server::ServerError> for Error {
    fn from(err: rpc::server::ServerError) -> Self {
        Error::Server(err)
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Error::Config(err)
    }
}
