//! Configuration management for cvoctl
//!
//! Handles configuration loading from files and environment variables.
//! Configuration is stored in TOML format with support for multiple named profiles,
//! one per Cloud Manager account / connector.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::credential::CredentialStore;
use super::error::{ConfigError, Result};
use super::polling::PollingConfig;

/// Environment variable that overrides the config file location
pub const CONFIG_FILE_ENV: &str = "CVOCTL_CONFIG_FILE";

/// Main configuration structure
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
pub struct Config {
    /// Profile used when none is given on the command line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_profile: Option<String>,
    /// Map of profile name -> profile configuration
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

/// Individual profile configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Profile {
    /// Connector (agent) client id sent with every request
    pub client_id: String,
    /// Refresh token exchanged for access tokens. Supports `keyring:` references.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Pre-issued access token, used as-is when no refresh token is configured
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    /// Cloud Manager base URL
    #[serde(default = "default_cloud_manager_url")]
    pub cloud_manager_url: String,
    /// Token endpoint used for refresh token exchange
    #[serde(default = "default_auth_url")]
    pub auth_url: String,
    /// Tenant (account workspace) used for FSX lookups
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    /// Polling and retry overrides for this profile
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub polling: Option<PollingConfig>,
}

/// How a profile obtains bearer tokens, after credential resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenSource {
    /// Exchange a refresh token at the auth endpoint
    Refresh(String),
    /// Use a fixed access token
    Static(String),
}

impl Profile {
    /// Create a profile with default URLs and no polling overrides
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            refresh_token: None,
            access_token: None,
            cloud_manager_url: default_cloud_manager_url(),
            auth_url: default_auth_url(),
            tenant_id: None,
            polling: None,
        }
    }

    /// Effective polling configuration
    pub fn polling(&self) -> PollingConfig {
        self.polling.clone().unwrap_or_default()
    }

    /// Resolve the client id with environment variable override
    pub fn resolve_client_id(&self) -> Result<String> {
        CredentialStore::new()
            .get_credential(&self.client_id, Some("CVOCTL_CLIENT_ID"))
            .map_err(|e| ConfigError::CredentialError(format!("Failed to resolve client id: {}", e)))
    }

    /// Resolve the token source (with keyring and environment support)
    ///
    /// A refresh token wins over a static access token.
    pub fn resolve_token_source(&self, name: &str) -> Result<TokenSource> {
        let store = CredentialStore::new();

        if let Some(refresh_token) = &self.refresh_token {
            let resolved = store
                .get_credential(refresh_token, Some("CVOCTL_REFRESH_TOKEN"))
                .map_err(|e| {
                    ConfigError::CredentialError(format!("Failed to resolve refresh token: {}", e))
                })?;
            return Ok(TokenSource::Refresh(resolved));
        }

        if let Some(access_token) = &self.access_token {
            let resolved = store
                .get_credential(access_token, Some("CVOCTL_ACCESS_TOKEN"))
                .map_err(|e| {
                    ConfigError::CredentialError(format!("Failed to resolve access token: {}", e))
                })?;
            return Ok(TokenSource::Static(resolved));
        }

        Err(ConfigError::MissingToken {
            name: name.to_string(),
        })
    }
}

impl Config {
    /// Resolve the profile name to use
    ///
    /// Explicit name, then `default_profile`, then the alphabetically first profile.
    pub fn resolve_profile(&self, explicit_profile: Option<&str>) -> Result<String> {
        if let Some(profile_name) = explicit_profile {
            return Ok(profile_name.to_string());
        }

        if let Some(ref default) = self.default_profile {
            return Ok(default.clone());
        }

        self.list_profiles()
            .first()
            .map(|(name, _)| (*name).clone())
            .ok_or(ConfigError::NoProfiles)
    }

    /// Look up a profile by name
    pub fn profile(&self, name: &str) -> Result<&Profile> {
        self.profiles
            .get(name)
            .ok_or_else(|| ConfigError::ProfileNotFound {
                name: name.to_string(),
            })
    }

    /// Load configuration from the standard location
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        Self::load_from_path(&config_path)
    }

    /// Load configuration from a specific path
    ///
    /// A missing file yields an empty configuration.
    pub fn load_from_path(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(config_path).map_err(|e| ConfigError::LoadError {
            path: config_path.display().to_string(),
            source: e,
        })?;

        let expanded_content = Self::expand_env_vars(&content);

        let config: Config = toml::from_str(&expanded_content)?;
        config.validate()?;

        Ok(config)
    }

    /// Check per-profile settings that parse but cannot be used
    pub fn validate(&self) -> Result<()> {
        for (name, profile) in &self.profiles {
            if let Some(polling) = &profile.polling {
                polling.validate(name)?;
            }
        }
        Ok(())
    }

    /// Save configuration to the standard location
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;
        self.save_to_path(&config_path)
    }

    /// Save configuration to a specific path
    pub fn save_to_path(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::SaveError {
                path: parent.display().to_string(),
                source: e,
            })?;
        }

        let content = toml::to_string_pretty(self)?;

        fs::write(config_path, content).map_err(|e| ConfigError::SaveError {
            path: config_path.display().to_string(),
            source: e,
        })?;

        Ok(())
    }

    /// Set or update a profile
    pub fn set_profile(&mut self, name: String, profile: Profile) {
        self.profiles.insert(name, profile);
    }

    /// Remove a profile by name
    pub fn remove_profile(&mut self, name: &str) -> Option<Profile> {
        if self.default_profile.as_deref() == Some(name) {
            self.default_profile = None;
        }
        self.profiles.remove(name)
    }

    /// List all profiles sorted by name
    pub fn list_profiles(&self) -> Vec<(&String, &Profile)> {
        let mut profiles: Vec<_> = self.profiles.iter().collect();
        profiles.sort_by_key(|(name, _)| *name);
        profiles
    }

    /// Get the path to the configuration file
    ///
    /// `CVOCTL_CONFIG_FILE` wins; otherwise the platform config directory
    /// (`~/.config/cvoctl/config.toml` on Linux).
    pub fn config_path() -> Result<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_FILE_ENV) {
            return Ok(PathBuf::from(path));
        }

        let proj_dirs =
            ProjectDirs::from("com", "cvoctl", "cvoctl").ok_or(ConfigError::ConfigDirError)?;

        Ok(proj_dirs.config_dir().join("config.toml"))
    }

    /// Expand `${VAR}` and `${VAR:-default}` references in configuration content
    ///
    /// Unset variables are left unexpanded so that profiles which are not used
    /// do not fail to load.
    fn expand_env_vars(content: &str) -> String {
        let expanded =
            shellexpand::env_with_context_no_errors(content, |var| std::env::var(var).ok());
        expanded.to_string()
    }
}

fn default_cloud_manager_url() -> String {
    "https://cloudmanager.cloud.netapp.com".to_string()
}

fn default_auth_url() -> String {
    "https://netapp-cloud-account.auth0.com/oauth/token".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn make_profile(client_id: &str) -> Profile {
        Profile {
            refresh_token: Some("refresh".to_string()),
            ..Profile::new(client_id)
        }
    }

    #[test]
    fn test_config_serialization() {
        let mut config = Config::default();
        config.set_profile("prod".to_string(), make_profile("agent-1"));
        config.default_profile = Some("prod".to_string());

        let serialized = toml::to_string(&config).unwrap();
        let deserialized: Config = toml::from_str(&serialized).unwrap();

        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_profile_defaults() {
        let toml_str = r#"
[profiles.prod]
client_id = "agent-1"
refresh_token = "token"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        let profile = config.profile("prod").unwrap();

        assert_eq!(profile.cloud_manager_url, "https://cloudmanager.cloud.netapp.com");
        assert_eq!(
            profile.auth_url,
            "https://netapp-cloud-account.auth0.com/oauth/token"
        );
        assert!(profile.polling.is_none());
        assert_eq!(profile.polling(), PollingConfig::default());
    }

    #[test]
    fn test_profile_polling_override() {
        let toml_str = r#"
[profiles.lab]
client_id = "agent-2"
access_token = "static"

[profiles.lab.polling]
completion_retries = 5
completion_interval_secs = 10
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        let polling = config.profile("lab").unwrap().polling();
        assert_eq!(polling.completion_retries, 5);
        assert_eq!(polling.completion_interval_secs, 10);
        assert_eq!(polling.ha_multiplier, 2);
    }

    #[test]
    fn test_profile_resolution_order() {
        let mut config = Config::default();
        assert!(matches!(
            config.resolve_profile(None),
            Err(ConfigError::NoProfiles)
        ));

        config.set_profile("zeta".to_string(), make_profile("z"));
        config.set_profile("alpha".to_string(), make_profile("a"));
        assert_eq!(config.resolve_profile(None).unwrap(), "alpha");

        config.default_profile = Some("zeta".to_string());
        assert_eq!(config.resolve_profile(None).unwrap(), "zeta");
        assert_eq!(config.resolve_profile(Some("other")).unwrap(), "other");
    }

    #[test]
    fn test_remove_profile_clears_default() {
        let mut config = Config::default();
        config.set_profile("prod".to_string(), make_profile("agent-1"));
        config.default_profile = Some("prod".to_string());

        assert!(config.remove_profile("prod").is_some());
        assert!(config.default_profile.is_none());
        assert!(matches!(
            config.profile("prod"),
            Err(ConfigError::ProfileNotFound { .. })
        ));
    }

    #[test]
    #[serial_test::serial]
    fn test_token_source_resolution() {
        unsafe {
            std::env::remove_var("CVOCTL_REFRESH_TOKEN");
            std::env::remove_var("CVOCTL_ACCESS_TOKEN");
        }

        let refresh = make_profile("agent");
        assert_eq!(
            refresh.resolve_token_source("prod").unwrap(),
            TokenSource::Refresh("refresh".to_string())
        );

        let static_token = Profile {
            access_token: Some("abc".to_string()),
            ..Profile::new("agent")
        };
        assert_eq!(
            static_token.resolve_token_source("lab").unwrap(),
            TokenSource::Static("abc".to_string())
        );

        let none = Profile::new("agent");
        assert!(matches!(
            none.resolve_token_source("empty"),
            Err(ConfigError::MissingToken { .. })
        ));
    }

    #[test]
    #[serial_test::serial]
    fn test_env_var_expansion() {
        unsafe {
            std::env::set_var("CVOCTL_TEST_CLIENT", "agent-from-env");
        }

        let content = r#"
[profiles.test]
client_id = "${CVOCTL_TEST_CLIENT}"
refresh_token = "${CVOCTL_TEST_UNSET_TOKEN:-fallback}"
"#;

        let expanded = Config::expand_env_vars(content);
        assert!(expanded.contains("agent-from-env"));
        assert!(expanded.contains("fallback"));

        unsafe {
            std::env::remove_var("CVOCTL_TEST_CLIENT");
        }
    }

    #[test]
    #[serial_test::serial]
    fn test_config_path_env_override() {
        unsafe {
            std::env::set_var(CONFIG_FILE_ENV, "/tmp/cvoctl-test/config.toml");
        }
        assert_eq!(
            Config::config_path().unwrap(),
            PathBuf::from("/tmp/cvoctl-test/config.toml")
        );
        unsafe {
            std::env::remove_var(CONFIG_FILE_ENV);
        }
    }
}
