//! Request bodies and local checks for Cloud Volumes ONTAP modifications
//!
//! Everything here is pure: payload shapes for the mutation endpoints and the
//! checks that must pass before anything is submitted.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::{CoreError, Result};
use crate::types::UpgradeVersion;

/// Config key that lets a PAYGO system take an image upgrade
pub const SKIP_ELIGIBILITY_PAYGO_UPGRADE: &str = "skip-eligibility-paygo-upgrade";

/// Version value that cannot be used for an explicit upgrade
pub const LATEST_VERSION: &str = "latest";

/// A user tag as the service expects it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserTag {
    pub tag_key: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub tag_value: String,
}

impl UserTag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            tag_key: key.into(),
            tag_value: value.into(),
        }
    }
}

/// A GCP label; sent to the service as a user tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GcpLabel {
    pub label_key: String,
    #[serde(default)]
    pub label_value: String,
}

impl GcpLabel {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label_key: key.into(),
            label_value: value.into(),
        }
    }
}

impl From<GcpLabel> for UserTag {
    fn from(label: GcpLabel) -> Self {
        UserTag::new(label.label_key, label.label_value)
    }
}

/// Body of `PUT .../user-tags`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModifyUserTagsRequest {
    pub tags: Vec<UserTag>,
}

/// Body of `PUT .../set-password`
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct SetPasswordRequest {
    pub password: String,
}

impl std::fmt::Debug for SetPasswordRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SetPasswordRequest")
            .field("password", &"***")
            .finish()
    }
}

/// Body of `PUT .../license-instance-type`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseInstanceTypeRequest {
    pub instance_type: String,
    pub license_type: String,
}

/// Body of `POST .../change-tier-level`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeTierLevelRequest {
    pub level: String,
}

/// Source of an image upgrade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UpdateType {
    /// An image published through Cloud Manager
    OccmProvided,
}

/// Body of `POST .../update-image`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpgradeImageRequest {
    pub update_type: UpdateType,
    pub update_parameter: String,
}

impl UpgradeImageRequest {
    pub fn occm_provided(version: impl Into<String>) -> Self {
        Self {
            update_type: UpdateType::OccmProvided,
            update_parameter: version.into(),
        }
    }
}

/// Body of `PUT /occm/api/occm/config/{key}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetFlagRequest {
    pub value: bool,
    pub value_type: &'static str,
}

impl SetFlagRequest {
    pub fn boolean(value: bool) -> Self {
        Self {
            value,
            value_type: "BOOLEAN",
        }
    }
}

fn validate_unique_keys<'a>(kind: &str, keys: impl IntoIterator<Item = &'a str>) -> Result<()> {
    let mut seen = HashSet::new();
    for key in keys {
        if !seen.insert(key) {
            return Err(CoreError::Precondition(format!(
                "{} {} is not unique",
                kind, key
            )));
        }
    }
    Ok(())
}

/// Reject tag lists that repeat a key
pub fn validate_unique_tag_keys(tags: &[UserTag]) -> Result<()> {
    validate_unique_keys("tag_key", tags.iter().map(|t| t.tag_key.as_str()))
}

/// Reject label lists that repeat a key
pub fn validate_unique_label_keys(labels: &[GcpLabel]) -> Result<()> {
    validate_unique_keys("label_key", labels.iter().map(|l| l.label_key.as_str()))
}

/// Pick the catalog entry for a requested version
///
/// An entry matches when its `imageVersion` is a substring of `requested`, so
/// a catalog entry `9.10` accepts a request for `9.10.1`. The first match in
/// catalog order is returned.
pub fn match_upgrade_version(
    id: &str,
    catalog: Option<&[UpgradeVersion]>,
    requested: &str,
) -> Result<String> {
    let catalog = catalog.ok_or_else(|| {
        CoreError::Precondition(format!(
            "Working environment {}: no upgrade version available",
            id
        ))
    })?;

    catalog
        .iter()
        .find(|entry| requested.contains(entry.image_version.as_str()))
        .map(|entry| entry.image_version.clone())
        .ok_or_else(|| {
            let available: Vec<&str> = catalog.iter().map(|e| e.image_version.as_str()).collect();
            CoreError::Precondition(format!(
                "Working environment {}: ontap version {} is not in the upgrade versions list ({})",
                id,
                requested,
                available.join(", ")
            ))
        })
}

/// A value with the last applied state and the state the caller asked for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tracked<T> {
    pub prior: T,
    pub desired: T,
}

impl<T: PartialEq + Clone> Tracked<T> {
    pub fn new(prior: T, desired: T) -> Self {
        Self { prior, desired }
    }

    /// Same prior and desired value
    pub fn unchanged(value: T) -> Self {
        Self {
            prior: value.clone(),
            desired: value,
        }
    }

    pub fn changed(&self) -> bool {
        self.prior != self.desired
    }

    /// Put the desired value back to the prior one
    pub fn revert(&mut self) {
        self.desired = self.prior.clone();
    }

    /// Record the desired value as applied
    pub fn commit(&mut self) {
        self.prior = self.desired.clone();
    }
}

/// Declared upgrade intent for one working environment
///
/// Mirrors the caller's in-memory model: whether an upgrade is wanted, the
/// target version and the `use_latest_version` flag, each with its prior
/// value so a rejected or failed request can be rolled back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OntapUpgradeRequest {
    pub upgrade: bool,
    pub ontap_version: Tracked<String>,
    pub use_latest_version: Tracked<bool>,
}

impl OntapUpgradeRequest {
    /// Reject requests that cannot name a concrete image
    pub fn check_requested_version(&self) -> Result<()> {
        if self.ontap_version.desired == LATEST_VERSION {
            return Err(CoreError::Precondition(
                "ontap_version only can be upgraded with the specific ontap_version not \"latest\""
                    .to_string(),
            ));
        }
        if self.use_latest_version.desired {
            return Err(CoreError::Precondition(
                "ontap_version cannot be upgraded with \"use_latest_version\" true".to_string(),
            ));
        }
        Ok(())
    }

    /// With no upgrade declared, roll back version changes and fail if there were any
    pub fn revert_unrequested_changes(&mut self) -> Result<()> {
        let mut changed = false;
        if self.ontap_version.changed() {
            self.ontap_version.revert();
            changed = true;
        }
        if self.use_latest_version.changed() {
            self.use_latest_version.revert();
            changed = true;
        }
        if changed {
            return Err(CoreError::Precondition(
                "upgrade_ontap_version is not turned on. The change will not be done".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn catalog(versions: &[&str]) -> Vec<UpgradeVersion> {
        versions
            .iter()
            .map(|v| UpgradeVersion {
                image_version: v.to_string(),
                ..Default::default()
            })
            .collect()
    }

    #[test]
    fn test_catalog_substring_match() {
        let entries = catalog(&["9.10"]);
        assert_eq!(
            match_upgrade_version("we-1", Some(entries.as_slice()), "9.10.1").unwrap(),
            "9.10"
        );

        let err = match_upgrade_version("we-1", Some(entries.as_slice()), "9.11").unwrap_err();
        assert!(err.is_precondition());
        assert!(err.to_string().contains("9.11"));
    }

    #[test]
    fn test_catalog_first_match_wins() {
        let entries = catalog(&["ONTAP-9.10.1.T1", "9.10"]);
        assert_eq!(
            match_upgrade_version("we-1", Some(entries.as_slice()), "ONTAP-9.10.1.T1").unwrap(),
            "ONTAP-9.10.1.T1"
        );
    }

    #[test]
    fn test_missing_catalog_is_precondition() {
        let err = match_upgrade_version("we-1", None, "9.10.1").unwrap_err();
        assert!(err.is_precondition());
        assert!(err.to_string().contains("no upgrade version available"));

        let err = match_upgrade_version("we-1", Some(&[][..]), "9.10.1").unwrap_err();
        assert!(err.is_precondition());
    }

    #[test]
    fn test_duplicate_tag_keys() {
        let tags = vec![
            UserTag::new("owner", "a"),
            UserTag::new("env", "prod"),
            UserTag::new("owner", "b"),
        ];
        let err = validate_unique_tag_keys(&tags).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Precondition failed: tag_key owner is not unique"
        );
        assert!(validate_unique_tag_keys(&tags[..2]).is_ok());

        let labels = vec![GcpLabel::new("team", "x"), GcpLabel::new("team", "y")];
        assert!(validate_unique_label_keys(&labels).unwrap_err().is_precondition());
    }

    #[test]
    fn test_payload_shapes() {
        let tags = ModifyUserTagsRequest {
            tags: vec![UserTag::new("owner", "ops"), UserTag::new("flag", "")],
        };
        assert_eq!(
            serde_json::to_value(&tags).unwrap(),
            json!({"tags": [{"tagKey": "owner", "tagValue": "ops"}, {"tagKey": "flag"}]})
        );

        assert_eq!(
            serde_json::to_value(UpgradeImageRequest::occm_provided("ONTAP-9.10.1")).unwrap(),
            json!({"updateType": "OCCM_PROVIDED", "updateParameter": "ONTAP-9.10.1"})
        );
        assert_eq!(
            serde_json::to_value(SetFlagRequest::boolean(true)).unwrap(),
            json!({"value": true, "valueType": "BOOLEAN"})
        );
        assert_eq!(
            serde_json::to_value(LicenseInstanceTypeRequest {
                instance_type: "m5.2xlarge".to_string(),
                license_type: "cot-premium-paygo".to_string(),
            })
            .unwrap(),
            json!({"instanceType": "m5.2xlarge", "licenseType": "cot-premium-paygo"})
        );
    }

    #[test]
    fn test_gcp_label_conversion() {
        let tag: UserTag = GcpLabel::new("team", "storage").into();
        assert_eq!(tag, UserTag::new("team", "storage"));
    }

    #[test]
    fn test_password_is_not_logged() {
        let request = SetPasswordRequest {
            password: "hunter2".to_string(),
        };
        assert!(!format!("{:?}", request).contains("hunter2"));
    }

    #[test]
    fn test_latest_guardrails() {
        let request = OntapUpgradeRequest {
            upgrade: true,
            ontap_version: Tracked::new("9.9.1".to_string(), LATEST_VERSION.to_string()),
            use_latest_version: Tracked::unchanged(false),
        };
        assert!(request.check_requested_version().unwrap_err().is_precondition());

        let request = OntapUpgradeRequest {
            upgrade: true,
            ontap_version: Tracked::new("9.9.1".to_string(), "9.10.1".to_string()),
            use_latest_version: Tracked::new(false, true),
        };
        assert!(request.check_requested_version().unwrap_err().is_precondition());
    }

    #[test]
    fn test_unrequested_change_is_reverted() {
        let mut request = OntapUpgradeRequest {
            upgrade: false,
            ontap_version: Tracked::new("9.9.1".to_string(), "9.10.1".to_string()),
            use_latest_version: Tracked::new(true, false),
        };
        let err = request.revert_unrequested_changes().unwrap_err();
        assert!(err.is_precondition());
        assert_eq!(request.ontap_version.desired, "9.9.1");
        assert!(request.use_latest_version.desired);

        let mut untouched = OntapUpgradeRequest {
            upgrade: false,
            ontap_version: Tracked::unchanged("9.9.1".to_string()),
            use_latest_version: Tracked::unchanged(false),
        };
        assert!(untouched.revert_unrequested_changes().is_ok());
    }
}
