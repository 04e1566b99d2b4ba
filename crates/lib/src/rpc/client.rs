//! Typed client for the RPC surface.

use std::time::Duration;

use reqwest::header::AUTHORIZATION;
use serde::{Serialize, de::DeserializeOwned};
use tracing::debug;

use super::protocol::{
    CreateSecretRequest, CreateSecretResponse, Credentials, DeleteSecretResponse, HealthResponse,
    ListSecretsResponse, ReadSecretResponse, SecretEntry, SecretName, TIMEOUT_HEADER,
    TokenResponse, methods,
};
use super::{Code, Status};

/// Calls a vault server over HTTP.
///
/// Every failure, including transport errors, is reported as a [`Status`].
#[derive(Debug, Clone)]
pub struct VaultClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
    timeout: Option<Duration>,
}

impl VaultClient {
    /// Client for a server at `base_url`, e.g. `http://127.0.0.1:8080`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
            timeout: None,
        }
    }

    /// Attach a bearer token to every call.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Ask the server to abandon calls that run longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Register and return the issued token.
    pub async fn register(&self, email: &str, password: &str) -> Result<String, Status> {
        let response: TokenResponse = self
            .call(methods::REGISTER, &credentials(email, password))
            .await?;
        Ok(response.token)
    }

    /// Log in and return the issued token.
    pub async fn login(&self, email: &str, password: &str) -> Result<String, Status> {
        let response: TokenResponse = self
            .call(methods::LOGIN, &credentials(email, password))
            .await?;
        Ok(response.token)
    }

    pub async fn create_secret(
        &self,
        name: &str,
        kind: &str,
        content: Vec<u8>,
    ) -> Result<CreateSecretResponse, Status> {
        let request = CreateSecretRequest {
            name: name.to_string(),
            kind: kind.to_string(),
            content,
        };
        self.call(methods::CREATE_SECRET, &request).await
    }

    pub async fn read_secret(&self, name: &str) -> Result<ReadSecretResponse, Status> {
        self.call(methods::READ_SECRET, &secret_name(name)).await
    }

    pub async fn delete_secret(&self, name: &str) -> Result<(), Status> {
        let _: DeleteSecretResponse = self
            .call(methods::DELETE_SECRET, &secret_name(name))
            .await?;
        Ok(())
    }

    pub async fn list_secrets(&self) -> Result<Vec<SecretEntry>, Status> {
        let response: ListSecretsResponse = self
            .call(methods::LIST_SECRETS, &serde_json::json!({}))
            .await?;
        Ok(response.secrets)
    }

    pub async fn health(&self) -> Result<HealthResponse, Status> {
        let response = self
            .http
            .get(self.url(methods::HEALTH))
            .send()
            .await
            .map_err(transport_error)?;
        decode(response).await
    }

    fn url(&self, method: &str) -> String {
        format!("{}{}", self.base_url, method)
    }

    async fn call<Req, Resp>(&self, method: &str, request: &Req) -> Result<Resp, Status>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let mut builder = self.http.post(self.url(method)).json(request);
        if let Some(token) = &self.token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        if let Some(timeout) = self.timeout {
            builder = builder
                .header(TIMEOUT_HEADER, timeout.as_millis().to_string())
                // Give the server a moment to answer with its own status.
                .timeout(timeout + Duration::from_secs(1));
        }

        debug!(component = "client", method, "calling");
        let response = builder.send().await.map_err(transport_error)?;
        decode(response).await
    }
}

fn credentials(email: &str, password: &str) -> Credentials {
    Credentials {
        email: email.to_string(),
        password: password.to_string(),
    }
}

fn secret_name(name: &str) -> SecretName {
    SecretName {
        name: name.to_string(),
    }
}

fn transport_error(e: reqwest::Error) -> Status {
    if e.is_timeout() {
        Status::deadline_exceeded(e.to_string())
    } else {
        Status::unavailable(e.to_string())
    }
}

async fn decode<Resp: DeserializeOwned>(response: reqwest::Response) -> Result<Resp, Status> {
    let status = response.status();
    let body = response.bytes().await.map_err(transport_error)?;

    if status.is_success() {
        return serde_json::from_slice(&body)
            .map_err(|e| Status::internal(format!("failed to parse response: {e}")));
    }

    match serde_json::from_slice::<Status>(&body) {
        Ok(rpc_status) => Err(rpc_status),
        Err(_) => {
            let code = Code::from_http_status(status);
            Err(Status::new(code, String::from_utf8_lossy(&body).into_owned()))
        }
    }
}
