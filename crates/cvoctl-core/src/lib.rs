//! # cvoctl-core
//!
//! Orchestration layer for the NetApp Cloud Manager (OCCM) REST API.
//!
//! Mutating calls on a Cloud Volumes ONTAP working environment are
//! asynchronous: the service accepts the request and either hands back a task
//! id or simply starts changing the resource. This crate drives those
//! operations to a terminal state and finds the resource to act on in the
//! first place.
//!
//! ## Layers
//!
//! - [`transport`] - one HTTP call, behind the [`Transport`] trait
//! - [`auth`] - bearer tokens, behind the [`CredentialProvider`] trait
//! - [`retry`] - bounded fixed-delay retry of connection failures
//! - [`client`] - [`OccmClient`], the handle everything else takes
//! - [`resolver`] - name/id lookup across provider partitions and FSX
//! - [`progress`] - completion polling with [`ProgressEvent`] callbacks
//! - [`cvo`] - tag, password, tier, license and upgrade workflows
//! - [`config`] - profiles and polling defaults from a TOML file
//!
//! ## Example
//!
//! ```rust,ignore
//! use cvoctl_core::{Config, OccmClient, cvo};
//!
//! let config = Config::load()?;
//! let name = config.resolve_profile(None)?;
//! let client = OccmClient::from_profile(&name, config.profile(&name)?)?;
//!
//! cvo::change_tier_level(&client, "VsaWorkingEnvironment-abc", "infrequent-access").await?;
//! ```

pub mod auth;
pub mod client;
pub mod config;
pub mod cvo;
pub mod error;
pub mod progress;
pub mod resolver;
pub mod retry;
pub mod transport;
pub mod types;

#[cfg(test)]
mod testing;

pub use auth::{CredentialProvider, RefreshTokenProvider, StaticToken, TokenCache};
pub use client::OccmClient;
pub use config::{Config, ConfigError, PollingConfig, Profile};
pub use error::{CoreError, Result, ResultExt};
pub use progress::{PollOutcome, PollPolicy, ProgressCallback, ProgressEvent, poll_until};
pub use resolver::{ApiRoot, Detail, WorkingEnvironmentSelector};
pub use retry::NetworkRetryPolicy;
pub use transport::{ApiRequest, ApiResponse, HttpTransport, Method, Transport, TransportError};
pub use types::{Partition, TaskStatus, WorkingEnvironment, WorkingEnvironmentProperties};
