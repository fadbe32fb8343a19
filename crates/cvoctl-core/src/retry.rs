//! Network-retry wrapper
//!
//! Retries a single transport call after connection-level failures only.
//! Responses with an error status are returned to the caller untouched; they
//! are deterministic and retrying them would only multiply load.

use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::transport::TransportError;

/// Fixed-delay bounded retry policy for transport failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkRetryPolicy {
    /// Retries after the first attempt
    pub retries: u32,
    /// Fixed delay between attempts
    pub delay: Duration,
}

impl Default for NetworkRetryPolicy {
    fn default() -> Self {
        Self {
            retries: 3,
            delay: Duration::from_secs(1),
        }
    }
}

impl NetworkRetryPolicy {
    /// Single attempt, no retries
    pub fn none() -> Self {
        Self {
            retries: 0,
            delay: Duration::ZERO,
        }
    }
}

/// Run `call` until it returns a response or the retry budget is spent
///
/// At most `policy.retries + 1` attempts are made; the last error is returned.
pub async fn with_network_retry<T, F, Fut>(
    policy: &NetworkRetryPolicy,
    label: &str,
    mut call: F,
) -> Result<T, TransportError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, TransportError>>,
{
    let mut remaining = policy.retries;
    loop {
        match call().await {
            Ok(value) => return Ok(value),
            Err(err) if remaining > 0 => {
                warn!(
                    "{} request failed, retrying in {:?} ({} left): {}",
                    label, policy.delay, remaining, err
                );
                tokio::time::sleep(policy.delay).await;
                remaining -= 1;
            }
            Err(err) => return Err(err),
        }
    }
}
