//! Configuration and profile management for cvoctl
//!
// Allow nested config module - this is intentional for the config subsystem

#![allow(clippy::module_inception)]
//!
//! # Features
//!
//! - Multiple named profiles, one per Cloud Manager connector
//! - Secure credential storage using OS keyring (optional)
//! - Environment variable expansion in config files
//! - Per-profile polling and retry tuning

pub mod config;
pub mod credential;
pub mod error;
pub mod polling;

pub use config::{CONFIG_FILE_ENV, Config, Profile, TokenSource};
pub use credential::{CredentialStorage, CredentialStore};
pub use error::{ConfigError, Result};
pub use polling::PollingConfig;
