//! Credential collaborator and per-client token cache
//!
//! A [`CredentialProvider`] produces bearer tokens. [`TokenCache`] fetches one
//! lazily and reuses it until [`TokenCache::clear`] is called. The cache is
//! guarded by an async mutex, so concurrent orchestrations on one client share
//! a single fetch.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::{CoreError, Result};

/// Client id of the Cloud Manager login application at the auth endpoint
pub const DEFAULT_AUTH_CLIENT_ID: &str = "Mu0V1ywgYteI6w1MbD15fKfVIUrNXGWC";

/// Source of bearer tokens
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn access_token(&self) -> Result<String>;
}

/// Fixed, pre-issued access token
#[derive(Debug, Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

#[async_trait]
impl CredentialProvider for StaticToken {
    async fn access_token(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}

#[derive(Debug, Serialize)]
struct RefreshTokenRequest<'a> {
    grant_type: &'static str,
    refresh_token: &'a str,
    client_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Exchanges a refresh token for an access token at the auth endpoint
#[derive(Debug, Clone)]
pub struct RefreshTokenProvider {
    http: reqwest::Client,
    auth_url: String,
    auth_client_id: String,
    refresh_token: String,
}

impl RefreshTokenProvider {
    pub fn new(auth_url: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            auth_url: auth_url.into(),
            auth_client_id: DEFAULT_AUTH_CLIENT_ID.to_string(),
            refresh_token: refresh_token.into(),
        }
    }

    /// Override the auth application client id (non-production environments)
    pub fn with_auth_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.auth_client_id = client_id.into();
        self
    }
}

#[async_trait]
impl CredentialProvider for RefreshTokenProvider {
    async fn access_token(&self) -> Result<String> {
        debug!("Requesting access token from {}", self.auth_url);
        let request = RefreshTokenRequest {
            grant_type: "refresh_token",
            refresh_token: &self.refresh_token,
            client_id: &self.auth_client_id,
        };
        let response = self
            .http
            .post(&self.auth_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| CoreError::Credential(format!("token request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| CoreError::Credential(format!("token response unreadable: {}", e)))?;
        if !status.is_success() {
            return Err(CoreError::Credential(format!(
                "code: {}, message: {}",
                status.as_u16(),
                body
            )));
        }

        let token: TokenResponse = serde_json::from_str(&body)?;
        Ok(token.access_token)
    }
}

/// Lazily fetched, explicitly cleared bearer token
pub struct TokenCache {
    provider: Arc<dyn CredentialProvider>,
    token: Mutex<Option<String>>,
}

impl TokenCache {
    pub fn new(provider: Arc<dyn CredentialProvider>) -> Self {
        Self {
            provider,
            token: Mutex::new(None),
        }
    }

    /// Cached token, fetching it on first use
    pub async fn token(&self) -> Result<String> {
        let mut guard = self.token.lock().await;
        if let Some(token) = guard.as_ref() {
            return Ok(token.clone());
        }
        let token = self.provider.access_token().await?;
        *guard = Some(token.clone());
        Ok(token)
    }

    /// Drop the cached token; the next call fetches a new one
    pub async fn clear(&self) {
        *self.token.lock().await = None;
    }
}
