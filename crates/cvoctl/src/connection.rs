//! Connection management: profile selection and client construction

use cvoctl_core::{Config, OccmClient};
use tracing::{debug, trace};

use crate::error::Result as CliResult;

/// Creates authenticated Cloud Manager clients from the loaded configuration
#[derive(Clone)]
pub struct ConnectionManager {
    pub config: Config,
    pub config_path: Option<std::path::PathBuf>,
}

impl ConnectionManager {
    /// Create a new connection manager with a custom config path
    pub fn with_config_path(config: Config, config_path: Option<std::path::PathBuf>) -> Self {
        Self {
            config,
            config_path,
        }
    }

    /// Save the configuration to the appropriate location
    pub fn save_config(&self) -> CliResult<()> {
        match &self.config_path {
            Some(path) => self.config.save_to_path(path)?,
            None => self.config.save()?,
        }
        Ok(())
    }

    /// Path the configuration is read from and written to
    pub fn effective_config_path(&self) -> CliResult<std::path::PathBuf> {
        match &self.config_path {
            Some(path) => Ok(path.clone()),
            None => Ok(Config::config_path()?),
        }
    }

    /// Name of the profile a command runs against
    pub fn resolve_profile_name(&self, profile_name: Option<&str>) -> CliResult<String> {
        Ok(self.config.resolve_profile(profile_name)?)
    }

    /// Tenant configured for a profile, used as the default FSX tenant
    pub fn profile_tenant(&self, profile_name: Option<&str>) -> Option<String> {
        let name = self.config.resolve_profile(profile_name).ok()?;
        self.config.profile(&name).ok()?.tenant_id.clone()
    }

    /// Create a Cloud Manager client for the selected profile
    pub fn create_client(&self, profile_name: Option<&str>) -> CliResult<OccmClient> {
        trace!("Profile name: {:?}", profile_name);
        let name = self.resolve_profile_name(profile_name)?;
        let profile = self.config.profile(&name)?;
        debug!(
            "Creating Cloud Manager client for profile '{}' ({})",
            name, profile.cloud_manager_url
        );
        Ok(OccmClient::from_profile(&name, profile)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cvoctl_core::Profile;

    fn manager() -> ConnectionManager {
        let mut config = Config::default();
        let mut prod = Profile::new("connector-1");
        prod.access_token = Some("token".to_string());
        prod.tenant_id = Some("account-1".to_string());
        config.set_profile("prod".to_string(), prod);
        ConnectionManager::with_config_path(config, None)
    }

    #[test]
    fn single_profile_is_used_without_a_default() {
        let mgr = manager();
        assert_eq!(mgr.resolve_profile_name(None).unwrap(), "prod");
        assert_eq!(mgr.profile_tenant(None).as_deref(), Some("account-1"));
    }

    #[test]
    fn unknown_profile_cannot_build_a_client() {
        let mgr = manager();
        assert!(mgr.create_client(Some("staging")).is_err());
        assert!(mgr.profile_tenant(Some("staging")).is_none());
    }

    #[test]
    fn static_token_profile_builds_a_client() {
        let mgr = manager();
        assert!(mgr.create_client(None).is_ok());
    }
}
