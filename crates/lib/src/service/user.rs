//! Register and Login.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};

use crate::model::User;
use crate::rpc::Status;
use crate::rpc::protocol::{Credentials, TokenResponse};
use crate::storage::UserRepository;
use crate::token::TokenManager;

/// Issues tokens for new and returning users.
pub struct UserService {
    users: Arc<dyn UserRepository>,
    tokens: Arc<dyn TokenManager>,
    token_lifetime: Duration,
}

impl UserService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        tokens: Arc<dyn TokenManager>,
        token_lifetime: Duration,
    ) -> Self {
        Self {
            users,
            tokens,
            token_lifetime,
        }
    }

    pub async fn register(&self, request: Credentials) -> Result<TokenResponse, Status> {
        validate_credentials(&request)?;

        let user = self
            .users
            .create(User::new(request.email, request.password))
            .await
            .map_err(|e| {
                if e.is_conflict() {
                    Status::already_exists("user already exists")
                } else {
                    error!(component = "service", error = %e, "failed to create user");
                    Status::internal("failed to create user")
                }
            })?;

        info!(component = "service", user_id = %user.id, "user registered");
        self.issue(&user)
    }

    pub async fn login(&self, request: Credentials) -> Result<TokenResponse, Status> {
        validate_credentials(&request)?;

        let user = self
            .users
            .read_by_email_and_password(&request.email, &request.password)
            .await
            .map_err(|e| {
                if e.is_not_found() {
                    Status::unauthenticated("invalid email or password")
                } else {
                    error!(component = "service", error = %e, "failed to read user");
                    Status::internal("failed to log in")
                }
            })?;

        self.issue(&user)
    }

    fn issue(&self, user: &User) -> Result<TokenResponse, Status> {
        let token = self.tokens.issue(user, self.token_lifetime).map_err(|e| {
            error!(component = "service", error = %e, "failed to issue token");
            Status::internal("failed to issue token")
        })?;
        Ok(TokenResponse { token })
    }
}

fn validate_credentials(request: &Credentials) -> Result<(), Status> {
    if request.email.is_empty() {
        return Err(Status::invalid_argument("email must not be empty"));
    }
    if request.password.is_empty() {
        return Err(Status::invalid_argument("password must not be empty"));
    }
    Ok(())
}
