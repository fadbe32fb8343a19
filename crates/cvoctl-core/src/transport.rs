//! Transport collaborator
//!
//! A [`Transport`] performs exactly one HTTP call and reports either the
//! response (whatever its status) or a connection-level [`TransportError`].
//! Status interpretation happens in [`crate::error::check_response`], retries in
//! [`crate::retry`].

use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::trace;
use url::Url;

use crate::config::ConfigError;
use crate::error::Result;

/// HTTP methods used against the Cloud Manager API
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        };
        f.write_str(name)
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// A single API request, path relative to the Cloud Manager host
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            body: None,
        }
    }

    pub fn with_body(method: Method, path: impl Into<String>, body: Value) -> Self {
        Self {
            method,
            path: path.into(),
            body: Some(body),
        }
    }
}

/// Raw response: status code and body bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body as text, lossy
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Connection-level failure: the request produced no HTTP response
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{method} {path}: {message}")]
pub struct TransportError {
    pub method: Method,
    pub path: String,
    pub message: String,
}

impl TransportError {
    pub fn new(request: &ApiRequest, message: impl Into<String>) -> Self {
        Self {
            method: request.method,
            path: request.path.clone(),
            message: message.into(),
        }
    }
}

/// Performs one HTTP call with a bearer token
#[async_trait]
pub trait Transport: Send + Sync {
    async fn call(
        &self,
        request: &ApiRequest,
        token: &str,
    ) -> std::result::Result<ApiResponse, TransportError>;
}

/// Default request timeout for [`HttpTransport`]
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// [`Transport`] backed by `reqwest`
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
    base_url: Url,
    client_id: String,
}

impl HttpTransport {
    /// Create a transport for the given Cloud Manager host and connector client id
    pub fn new(base_url: &str, client_id: impl Into<String>) -> Result<Self> {
        Self::with_timeout(base_url, client_id, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(
        base_url: &str,
        client_id: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{}/", base_url)
        };
        let base_url = Url::parse(&normalized).map_err(|e| ConfigError::InvalidUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self {
            http,
            base_url,
            client_id: client_id.into(),
        })
    }

    fn url_for(&self, request: &ApiRequest) -> std::result::Result<Url, TransportError> {
        self.base_url
            .join(request.path.trim_start_matches('/'))
            .map_err(|e| TransportError::new(request, format!("invalid path: {}", e)))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn call(
        &self,
        request: &ApiRequest,
        token: &str,
    ) -> std::result::Result<ApiResponse, TransportError> {
        let url = self.url_for(request)?;
        trace!("{} {}", request.method, url);

        let mut builder = self
            .http
            .request(request.method.into(), url)
            .bearer_auth(token)
            .header("X-Agent-Id", &self.client_id);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| TransportError::new(request, e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::new(request, e.to_string()))?;

        Ok(ApiResponse {
            status,
            body: body.to_vec(),
        })
    }
}

/// Encode a single path segment (names may contain spaces or slashes)
pub(crate) fn segment(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}
