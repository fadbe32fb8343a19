//! Cloud Manager client: transport, token cache and polling configuration
//!
//! [`OccmClient`] is the handle every resolver, poller and workflow function
//! takes. Reads go through the network-retry wrapper; mutations are sent once.

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use crate::auth::{CredentialProvider, RefreshTokenProvider, StaticToken, TokenCache};
use crate::config::{PollingConfig, Profile, TokenSource};
use crate::error::{CoreError, Result, ResultExt, check_response};
use crate::retry::with_network_retry;
use crate::transport::{ApiRequest, ApiResponse, HttpTransport, Method, Transport};

/// Client for the Cloud Manager REST API
pub struct OccmClient {
    transport: Arc<dyn Transport>,
    tokens: TokenCache,
    polling: PollingConfig,
}

impl OccmClient {
    pub fn new(transport: Arc<dyn Transport>, credentials: Arc<dyn CredentialProvider>) -> Self {
        Self {
            transport,
            tokens: TokenCache::new(credentials),
            polling: PollingConfig::default(),
        }
    }

    /// Replace the polling and retry configuration
    pub fn with_polling(mut self, polling: PollingConfig) -> Self {
        self.polling = polling;
        self
    }

    /// Build a client from a configuration profile
    pub fn from_profile(name: &str, profile: &Profile) -> Result<Self> {
        let client_id = profile.resolve_client_id()?;
        let transport = HttpTransport::new(&profile.cloud_manager_url, client_id)?;
        let credentials: Arc<dyn CredentialProvider> = match profile.resolve_token_source(name)? {
            TokenSource::Refresh(token) => {
                Arc::new(RefreshTokenProvider::new(&profile.auth_url, token))
            }
            TokenSource::Static(token) => Arc::new(StaticToken::new(token)),
        };
        Ok(Self::new(Arc::new(transport), credentials).with_polling(profile.polling()))
    }

    pub fn polling(&self) -> &PollingConfig {
        &self.polling
    }

    /// Current bearer token, fetched on first use
    pub async fn token(&self) -> Result<String> {
        self.tokens.token().await
    }

    /// Forget the cached bearer token
    pub async fn clear_token(&self) {
        self.tokens.clear().await;
    }

    /// GET with transport retries; error statuses are not retried
    pub async fn get(&self, path: &str, operation: &str) -> Result<ApiResponse> {
        let token = self.token().await?;
        let request = ApiRequest::get(path);
        debug!("{}: GET {}", operation, path);

        let policy = self.polling.network_retry_policy();
        let response = with_network_retry(&policy, operation, || {
            self.transport.call(&request, &token)
        })
        .await?;
        check_response(&response, operation)?;
        Ok(response)
    }

    /// GET and decode the JSON body
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str, operation: &str) -> Result<T> {
        let response = self.get(path, operation).await?;
        serde_json::from_slice(&response.body)
            .map_err(CoreError::from)
            .for_operation(operation, path)
    }

    /// Send a mutating request exactly once
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        body: Value,
        operation: &str,
    ) -> Result<ApiResponse> {
        let token = self.token().await?;
        let request = ApiRequest::with_body(method, path, body);
        debug!("{}: {} {}", operation, method, path);

        let response = self.transport.call(&request, &token).await?;
        check_response(&response, operation)?;
        Ok(response)
    }
}

impl std::fmt::Debug for OccmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OccmClient")
            .field("polling", &self.polling)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedTransport;
    use crate::transport::TransportError;

    #[tokio::test]
    async fn test_get_retries_transport_errors() {
        let transport = ScriptedTransport::new();
        transport.push_transport_error("connection refused");
        transport.push_json(200, serde_json::json!({"ok": true}));
        let client = transport.client();

        let value: Value = client.get_json("/occm/api/x", "test").await.unwrap();
        assert_eq!(value["ok"], true);
        assert_eq!(transport.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_decode_error_names_operation_and_path() {
        let transport = ScriptedTransport::new();
        transport.push_json(200, serde_json::json!({"status": "not a number"}));
        let client = transport.client();

        let err = client
            .get_json::<crate::types::TaskStatusResponse>(
                "/occm/api/audit/activeTask/t-1",
                "checkTaskStatus",
            )
            .await
            .unwrap_err();
        assert!(matches!(err.root(), CoreError::Decode(_)));
        let message = err.to_string();
        assert!(message.contains("checkTaskStatus"), "got: {message}");
        assert!(message.contains("/occm/api/audit/activeTask/t-1"), "got: {message}");
    }

    #[tokio::test]
    async fn test_send_is_never_retried() {
        let transport = ScriptedTransport::new();
        transport.push_transport_error("connection reset");
        let client = transport.client();

        let err = client
            .send(Method::Put, "/occm/api/x", serde_json::json!({}), "test")
            .await
            .unwrap_err();
        assert!(matches!(err, crate::CoreError::Transport(TransportError { .. })));
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_error_status_surfaces_body() {
        let transport = ScriptedTransport::new();
        transport.push_text(400, "Invalid request");
        let client = transport.client();

        let err = client.get("/occm/api/x", "test").await.unwrap_err();
        assert_eq!(err.to_string(), "code: 400, message: Invalid request");
        assert_eq!(transport.requests().len(), 1);
    }
}
