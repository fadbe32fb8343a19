//! Credential storage abstraction with optional keyring support
//!
//! Refresh tokens and static access tokens stored in a profile are resolved
//! through this module:
//! - Environment variable override
//! - OS keyring reference (`keyring:<key>`, when the feature is enabled)
//! - Plaintext value

use super::error::{ConfigError, Result};
use std::env;

/// Prefix that indicates a value should be retrieved from the keyring
const KEYRING_PREFIX: &str = "keyring:";

/// Service name for keyring entries
#[cfg(feature = "secure-storage")]
const SERVICE_NAME: &str = "cvoctl";

/// Storage backend for credentials
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialStorage {
    /// Store in OS keyring
    #[cfg(feature = "secure-storage")]
    Keyring,
    /// Store as plaintext
    Plaintext,
}

/// Credential store abstraction
#[derive(Debug)]
pub struct CredentialStore {
    storage: CredentialStorage,
}

impl Default for CredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialStore {
    /// Create a new credential store with automatic backend selection
    pub fn new() -> Self {
        #[cfg(feature = "secure-storage")]
        {
            if keyring::Entry::new(SERVICE_NAME, "__probe__").is_ok() {
                return Self {
                    storage: CredentialStorage::Keyring,
                };
            }
        }
        Self {
            storage: CredentialStorage::Plaintext,
        }
    }

    /// Store a credential and return the value to write into the config file.
    ///
    /// With the keyring backend this is a `keyring:<key>` reference, otherwise
    /// the plaintext value itself.
    pub fn store_credential(&self, key: &str, value: &str) -> Result<String> {
        match self.storage {
            #[cfg(feature = "secure-storage")]
            CredentialStorage::Keyring => {
                let entry = keyring::Entry::new(SERVICE_NAME, key)
                    .map_err(|e| ConfigError::KeyringError(e.to_string()))?;
                entry.set_password(value).map_err(|e| {
                    ConfigError::KeyringError(format!(
                        "Failed to store credential in keyring: {}",
                        e
                    ))
                })?;
                Ok(format!("{}{}", KEYRING_PREFIX, key))
            }
            CredentialStorage::Plaintext => {
                let _ = key;
                Ok(value.to_string())
            }
        }
    }

    /// Retrieve a credential value
    ///
    /// Resolution order:
    /// 1. Environment variable (if `env_var` is provided and set)
    /// 2. Keyring, if the value starts with `keyring:`
    /// 3. The value as-is
    pub fn get_credential(&self, value: &str, env_var: Option<&str>) -> Result<String> {
        if let Some(var) = env_var
            && let Ok(env_value) = env::var(var)
        {
            return Ok(env_value);
        }

        let Some(key) = value.strip_prefix(KEYRING_PREFIX) else {
            return Ok(value.to_string());
        };

        #[cfg(feature = "secure-storage")]
        {
            let entry = keyring::Entry::new(SERVICE_NAME, key)
                .map_err(|e| ConfigError::KeyringError(e.to_string()))?;
            entry.get_password().map_err(|e| {
                ConfigError::KeyringError(format!(
                    "Failed to retrieve credential '{}' from keyring: {}",
                    key, e
                ))
            })
        }
        #[cfg(not(feature = "secure-storage"))]
        {
            Err(ConfigError::CredentialError(format!(
                "Credential '{}' references keyring but secure-storage feature is not enabled",
                key
            )))
        }
    }

    /// Check if a value is a keyring reference
    pub fn is_keyring_reference(value: &str) -> bool {
        value.starts_with(KEYRING_PREFIX)
    }

    /// Name of the active storage backend
    pub fn storage_backend(&self) -> &'static str {
        match self.storage {
            #[cfg(feature = "secure-storage")]
            CredentialStorage::Keyring => "keyring",
            CredentialStorage::Plaintext => "plaintext",
        }
    }
}
