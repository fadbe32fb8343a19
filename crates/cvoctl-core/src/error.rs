//! Unified error handling for cvoctl-core
//!
//! Every failure an orchestration can produce is a [`CoreError`]. Errors are
//! annotated with the operation name and resource id via
//! [`ResultExt::for_operation`]; the predicate helpers look through that
//! annotation.
//!
//! # Example
//!
//! ```rust
//! use cvoctl_core::{CoreError, ResultExt};
//!
//! let result: cvoctl_core::Result<()> = Err(CoreError::NotFound {
//!     kind: "working environment",
//!     key: "env-a".to_string(),
//! });
//! let err = result.for_operation("change tier level", "VsaWorkingEnvironment-1").unwrap_err();
//! assert!(err.is_not_found());
//! assert!(err.to_string().contains("VsaWorkingEnvironment-1"));
//! ```

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::config::ConfigError;
use crate::transport::{ApiResponse, TransportError};

/// Core error type for resolution, polling and workflows
#[derive(Error, Debug)]
pub enum CoreError {
    /// Connection-level failure, surfaced after the retry budget is spent
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// The service answered with a status outside [200, 300)
    #[error("code: {status}, message: {body}")]
    Api { status: u16, body: String },

    /// No matching resource in any partition
    #[error("Cannot find {kind} {key}")]
    NotFound { kind: &'static str, key: String },

    /// Request rejected locally before anything was submitted
    #[error("Precondition failed: {0}")]
    Precondition(String),

    /// Poll budget exhausted while the remote side was still pending
    #[error("Taking too long for {action} to {task} or not properly setup ({attempts} status checks)")]
    Timeout {
        action: String,
        task: String,
        attempts: u32,
    },

    /// The remote side reported a terminal failure
    #[error("Failed to {task} {action}, error: {reason}")]
    RemoteFailure {
        action: String,
        task: String,
        reason: String,
    },

    /// Response body was not the expected JSON
    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    /// Response was well-formed but carried something we cannot interpret
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Access token could not be obtained
    #[error("Credential error: {0}")]
    Credential(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Any of the above, annotated with the operation and resource it happened in
    #[error("{operation} failed for {resource}: {source}")]
    Operation {
        operation: String,
        resource: String,
        #[source]
        source: Box<CoreError>,
    },
}

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

/// Optional `{code, message}` envelope the service uses for some errors
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ApiErrorEnvelope {
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub message: Option<String>,
}

impl CoreError {
    /// The innermost error, skipping operation annotations
    pub fn root(&self) -> &CoreError {
        match self {
            CoreError::Operation { source, .. } => source.root(),
            other => other,
        }
    }

    /// Returns true if the resource does not exist (resolver miss or HTTP 404)
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self.root(),
            CoreError::NotFound { .. } | CoreError::Api { status: 404, .. }
        )
    }

    /// Returns true if the poll budget or deadline ran out
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self.root(), CoreError::Timeout { .. })
    }

    /// Returns true if the request was rejected before submission
    #[must_use]
    pub fn is_precondition(&self) -> bool {
        matches!(self.root(), CoreError::Precondition(_))
    }

    /// Returns true if the remote side reported a terminal failure
    #[must_use]
    pub fn is_remote_failure(&self) -> bool {
        matches!(self.root(), CoreError::RemoteFailure { .. })
    }

    /// Returns true if this is an authentication/authorization error
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(
            self.root(),
            CoreError::Credential(_) | CoreError::Api { status: 401 | 403, .. }
        )
    }

    /// Returns true if repeating the failed *request* may succeed
    ///
    /// This says nothing about repeating a whole orchestration: submissions are
    /// not idempotent.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self.root() {
            CoreError::Transport(_) => true,
            CoreError::Api { status, .. } => matches!(status, 429 | 502 | 503 | 504),
            _ => false,
        }
    }

    /// HTTP status of an application error
    pub fn status(&self) -> Option<u16> {
        match self.root() {
            CoreError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Message from the `{code, message}` envelope, if the body carried one
    pub fn api_message(&self) -> Option<String> {
        match self.root() {
            CoreError::Api { body, .. } => serde_json::from_str::<ApiErrorEnvelope>(body)
                .ok()
                .and_then(|envelope| envelope.message),
            _ => None,
        }
    }
}

/// Annotate errors with the operation and resource they belong to
pub trait ResultExt<T> {
    fn for_operation(self, operation: &str, resource: &str) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn for_operation(self, operation: &str, resource: &str) -> Result<T> {
        self.map_err(|source| CoreError::Operation {
            operation: operation.to_string(),
            resource: resource.to_string(),
            source: Box::new(source),
        })
    }
}

/// Fail with [`CoreError::Api`] when the status is outside [200, 300)
pub fn check_response(response: &ApiResponse, operation: &str) -> Result<()> {
    if response.is_success() {
        return Ok(());
    }
    let body = response.text();
    debug!("{} request failed: {} {}", operation, response.status, body);
    Err(CoreError::Api {
        status: response.status,
        body,
    })
}
