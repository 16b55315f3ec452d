//! LeanCloud REST session resolver
//!
//! Resolves session tokens via `GET /1.1/users/me` and credentials via
//! `POST /1.1/login` using the reqwest HTTP client.

use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};

use crate::backend::SessionResolver;
use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::types::SessionUser;

const SESSION_HEADER: &str = "X-LC-Session";
const APP_ID_HEADER: &str = "X-LC-Id";
const APP_KEY_HEADER: &str = "X-LC-Key";

/// Login request body
#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

/// REST API error response, e.g. `{"code":211,"error":"Could not find user."}`
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    code: i64,
    error: String,
}

/// Session resolver backed by the LeanCloud REST API
pub struct LeanCloudResolver {
    client: Client,
    config: AuthConfig,
}

impl LeanCloudResolver {
    /// Create a new resolver
    pub fn new(config: AuthConfig) -> Result<Self, AuthError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AuthError::Request(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_server.trim_end_matches('/'), path)
    }

    fn signed(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header(APP_ID_HEADER, &self.config.app_id)
            .header(APP_KEY_HEADER, &self.config.app_key)
    }

    async fn read_user(response: Response) -> Result<SessionUser, AuthError> {
        let status = response.status();

        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());

            if let Ok(error_response) = serde_json::from_str::<ErrorResponse>(&error_body) {
                return Err(AuthError::Rejected {
                    code: error_response.code,
                    message: error_response.error,
                });
            }

            return Err(AuthError::Response(format!(
                "LeanCloud API returned {}: {}",
                status, error_body
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AuthError::Response(format!("Failed to parse user: {}", e)))
    }
}

#[async_trait::async_trait]
impl SessionResolver for LeanCloudResolver {
    async fn become_user(&self, session_token: &str) -> Result<SessionUser, AuthError> {
        let response = self
            .signed(self.client.get(self.url("/1.1/users/me")))
            .header(SESSION_HEADER, session_token)
            .send()
            .await
            .map_err(|e| AuthError::Request(format!("HTTP request failed: {}", e)))?;

        let mut user = Self::read_user(response).await?;
        if user.session_token.is_none() {
            user.session_token = Some(session_token.to_string());
        }

        tracing::debug!(user_id = %user.object_id, "Session token resolved");
        Ok(user)
    }

    async fn log_in(&self, username: &str, password: &str) -> Result<SessionUser, AuthError> {
        let response = self
            .signed(self.client.post(self.url("/1.1/login")))
            .json(&LoginRequest { username, password })
            .send()
            .await
            .map_err(|e| AuthError::Request(format!("HTTP request failed: {}", e)))?;

        let user = Self::read_user(response).await?;
        if user.session_token.is_none() {
            return Err(AuthError::Response(
                "Login response carried no session token".to_string(),
            ));
        }

        tracing::info!(user_id = %user.object_id, "User logged in");
        Ok(user)
    }
}
