//! Request and response bodies of the RPC surface.
//!
//! Every call is an HTTP POST of a JSON body to the method's full name.
//! Binary secret content travels as standard base64.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Full method names, used as request paths.
pub mod methods {
    pub const REGISTER: &str = "/vaultkeeper.User/Register";
    pub const LOGIN: &str = "/vaultkeeper.User/Login";
    pub const CREATE_SECRET: &str = "/vaultkeeper.Keeper/CreateSecret";
    pub const READ_SECRET: &str = "/vaultkeeper.Keeper/ReadSecret";
    pub const DELETE_SECRET: &str = "/vaultkeeper.Keeper/DeleteSecret";
    pub const LIST_SECRETS: &str = "/vaultkeeper.Keeper/ListSecrets";
    pub const HEALTH: &str = "/health";
}

/// Header carrying the caller's per-call deadline in milliseconds.
pub const TIMEOUT_HEADER: &str = "x-request-timeout-ms";

/// Register and Login input.
#[derive(Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateSecretRequest {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(with = "base64_content")]
    pub content: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateSecretResponse {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// Input of ReadSecret and DeleteSecret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretName {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadSecretResponse {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(with = "base64_content")]
    pub content: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteSecretResponse {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListSecretsResponse {
    pub secrets: Vec<SecretEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

mod base64_content {
    use base64ct::{Base64, Encoding};
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&Base64::encode_string(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        Base64::decode_vec(&encoded).map_err(|e| de::Error::custom(format!("invalid base64: {e}")))
    }
}
