//! Polling and retry configuration
//!
//! The defaults are empirical tunings for the Cloud Manager service: three
//! transport retries one second apart, and 65 status checks one minute apart
//! for long-running operations, doubled for HA working environments. They can
//! be overridden per profile.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::error::{ConfigError, Result};
use crate::progress::PollPolicy;
use crate::retry::NetworkRetryPolicy;

/// Configuration for transport retries and completion polling
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Retries after a connection-level failure of a read request
    #[serde(default = "default_network_retries")]
    pub network_retries: u32,

    /// Delay in seconds between transport retries
    #[serde(default = "default_network_retry_delay")]
    pub network_retry_delay_secs: u64,

    /// Status checks allowed after the first one before giving up
    #[serde(default = "default_completion_retries")]
    pub completion_retries: u32,

    /// Delay in seconds between status checks
    #[serde(default = "default_completion_interval")]
    pub completion_interval_secs: u64,

    /// Factor applied to the completion budget for HA working environments
    #[serde(default = "default_ha_multiplier")]
    pub ha_multiplier: u32,

    /// Optional wall-clock limit in seconds for a single wait, scaled like the budget
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_deadline_secs: Option<u64>,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            network_retries: default_network_retries(),
            network_retry_delay_secs: default_network_retry_delay(),
            completion_retries: default_completion_retries(),
            completion_interval_secs: default_completion_interval(),
            ha_multiplier: default_ha_multiplier(),
            completion_deadline_secs: None,
        }
    }
}

impl PollingConfig {
    /// Configuration with every delay set to zero, keeping the default budgets
    pub fn immediate() -> Self {
        Self {
            network_retry_delay_secs: 0,
            completion_interval_secs: 0,
            ..Self::default()
        }
    }

    /// Reject settings that cannot produce a usable budget
    pub fn validate(&self, profile: &str) -> Result<()> {
        if self.ha_multiplier < 1 {
            return Err(ConfigError::InvalidPolling {
                profile: profile.to_string(),
                field: "ha_multiplier".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Transport retry policy for read requests
    pub fn network_retry_policy(&self) -> NetworkRetryPolicy {
        NetworkRetryPolicy {
            retries: self.network_retries,
            delay: Duration::from_secs(self.network_retry_delay_secs),
        }
    }

    /// Completion policy for a working environment of the given topology
    pub fn completion_policy(&self, is_ha: bool) -> PollPolicy {
        let mut policy = PollPolicy::new(
            self.completion_retries,
            Duration::from_secs(self.completion_interval_secs),
        );
        if let Some(deadline) = self.completion_deadline_secs {
            policy = policy.with_deadline(Duration::from_secs(deadline));
        }
        if is_ha {
            policy = policy.scaled(self.ha_multiplier);
        }
        policy
    }
}

fn default_network_retries() -> u32 {
    3
}

fn default_network_retry_delay() -> u64 {
    1
}

fn default_completion_retries() -> u32 {
    65
}

fn default_completion_interval() -> u64 {
    60
}

fn default_ha_multiplier() -> u32 {
    2
}
