//! Response types for the Cloud Manager API
//!
//! Only the fields orchestration logic reads are typed. Everything else in a
//! properties snapshot is kept as raw JSON in [`WorkingEnvironmentProperties::other`].

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::error::{CoreError, Result};

/// Treat an explicit `null` the same as a missing key
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Status value reported while a working environment is being modified
pub const STATUS_UPDATING: &str = "UPDATING";

/// Provider partition a working environment record was found in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Partition {
    #[serde(rename = "on-prem")]
    OnPrem,
    Aws,
    Azure,
    Gcp,
    Fsx,
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Partition::OnPrem => "on-prem",
            Partition::Aws => "aws",
            Partition::Azure => "azure",
            Partition::Gcp => "gcp",
            Partition::Fsx => "fsx",
        };
        f.write_str(name)
    }
}

/// A managed storage cluster
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkingEnvironment {
    #[serde(default, deserialize_with = "null_as_default")]
    pub public_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub cloud_provider_name: String,
    #[serde(default, rename = "isHA", deserialize_with = "null_as_default")]
    pub is_ha: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub working_environment_type: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub svm_name: String,
    /// Set when the record came from the list endpoint or the FSX namespace
    #[serde(default, skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub partition: Option<Partition>,
}

/// Shape of `GET /occm/api/working-environments`: four parallel arrays
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkingEnvironmentList {
    #[serde(default, deserialize_with = "null_as_default")]
    pub vsa_working_environments: Vec<WorkingEnvironment>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub on_prem_working_environments: Vec<WorkingEnvironment>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub azure_vsa_working_environments: Vec<WorkingEnvironment>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub gcp_vsa_working_environments: Vec<WorkingEnvironment>,
}

impl WorkingEnvironmentList {
    /// Flatten into one sequence tagged by partition, in scan order:
    /// on-prem, AWS, Azure, GCP.
    pub fn into_ordered(self) -> Vec<WorkingEnvironment> {
        let partitions = [
            (Partition::OnPrem, self.on_prem_working_environments),
            (Partition::Aws, self.vsa_working_environments),
            (Partition::Azure, self.azure_vsa_working_environments),
            (Partition::Gcp, self.gcp_vsa_working_environments),
        ];
        partitions
            .into_iter()
            .flat_map(|(partition, envs)| {
                envs.into_iter().map(move |mut env| {
                    env.partition = Some(partition);
                    env
                })
            })
            .collect()
    }
}

/// Outcome of one task status query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Pending,
    Success,
    Failure,
}

impl TryFrom<i32> for TaskStatus {
    type Error = CoreError;

    fn try_from(code: i32) -> Result<Self> {
        match code {
            0 => Ok(TaskStatus::Pending),
            1 => Ok(TaskStatus::Success),
            -1 => Ok(TaskStatus::Failure),
            other => Err(CoreError::UnexpectedResponse(format!(
                "unknown task status {}",
                other
            ))),
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TaskStatus::Pending => "PENDING",
            TaskStatus::Success => "SUCCESS",
            TaskStatus::Failure => "FAILURE",
        };
        f.write_str(name)
    }
}

/// Body of `GET /occm/api/audit/activeTask/{id}`
#[derive(Debug, Clone, Deserialize)]
pub struct TaskStatusResponse {
    pub status: i32,
    #[serde(default)]
    pub error: Option<String>,
}

impl TaskStatusResponse {
    pub fn task_status(&self) -> Result<TaskStatus> {
        TaskStatus::try_from(self.status)
    }
}

/// Entry of the eligible-upgrade catalog
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpgradeVersion {
    #[serde(default, deserialize_with = "null_as_default")]
    pub image_version: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub last_modified: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub auto_update_allowed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureCauses {
    #[serde(default, deserialize_with = "null_as_default")]
    pub invalid_cloud_provider_credentials: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub invalid_ontap_credentials: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub no_cloud_provider_connection: bool,
}

/// `status` object of a properties snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CvoStatus {
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub failure_causes: Option<FailureCauses>,
    #[serde(default)]
    pub extended_failure_reason: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CapacityLimit {
    #[serde(default, deserialize_with = "null_as_default")]
    pub size: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub unit: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseType {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default)]
    pub capacity_limit: Option<CapacityLimit>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapacityTierInfo {
    #[serde(default)]
    pub s3_bucket_name: Option<String>,
    #[serde(default)]
    pub tier_level: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub health: bool,
    #[serde(default)]
    pub serial_number: Option<String>,
}

/// `ontapClusterProperties` object of a properties snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OntapClusterProperties {
    #[serde(default, deserialize_with = "null_as_default")]
    pub ontap_version: String,
    #[serde(default)]
    pub upgrade_versions: Option<Vec<UpgradeVersion>>,
    #[serde(default)]
    pub cluster_name: Option<String>,
    #[serde(default)]
    pub license_type: Option<LicenseType>,
    #[serde(default)]
    pub capacity_tier_info: Option<CapacityTierInfo>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub nodes: Vec<Node>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

/// Point-in-time read of `GET {apiRoot}/working-environments/{id}?fields=...`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkingEnvironmentProperties {
    #[serde(default, deserialize_with = "null_as_default")]
    pub public_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub cloud_provider_name: String,
    #[serde(default, rename = "isHA", deserialize_with = "null_as_default")]
    pub is_ha: bool,
    #[serde(default)]
    pub status: Option<CvoStatus>,
    #[serde(default)]
    pub ontap_cluster_properties: Option<OntapClusterProperties>,
    /// Fields never consumed by orchestration logic
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl WorkingEnvironmentProperties {
    /// `status.status`, empty when the snapshot did not include it
    pub fn status_name(&self) -> &str {
        self.status.as_ref().map(|s| s.status.as_str()).unwrap_or("")
    }

    pub fn is_updating(&self) -> bool {
        self.status_name() == STATUS_UPDATING
    }

    /// Reported ONTAP version, empty when unknown
    pub fn ontap_version(&self) -> &str {
        self.ontap_cluster_properties
            .as_ref()
            .map(|p| p.ontap_version.as_str())
            .unwrap_or("")
    }

    /// Eligible-upgrade catalog, `None` when the service reported none
    pub fn upgrade_versions(&self) -> Option<&[UpgradeVersion]> {
        self.ontap_cluster_properties
            .as_ref()
            .and_then(|p| p.upgrade_versions.as_deref())
    }
}

/// Entry of `GET /fsx-ontap/working-environments/{tenant}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct FsxSystem {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
}

/// Entry of `GET /occm/api/fsx/working-environments/{id}/svms`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct FsxSvm {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_list_flattens_in_scan_order() {
        let list: WorkingEnvironmentList = serde_json::from_value(json!({
            "vsaWorkingEnvironments": [{"publicId": "aws-1", "name": "a"}],
            "onPremWorkingEnvironments": [{"publicId": "onprem-1", "name": "b"}],
            "azureVsaWorkingEnvironments": [{"publicId": "azure-1", "name": "c"}],
            "gcpVsaWorkingEnvironments": [{"publicId": "gcp-1", "name": "d"}]
        }))
        .unwrap();

        let ordered = list.into_ordered();
        let ids: Vec<_> = ordered.iter().map(|e| e.public_id.as_str()).collect();
        assert_eq!(ids, vec!["onprem-1", "aws-1", "azure-1", "gcp-1"]);
        let partitions: Vec<_> = ordered.iter().map(|e| e.partition.unwrap()).collect();
        assert_eq!(
            partitions,
            vec![
                Partition::OnPrem,
                Partition::Aws,
                Partition::Azure,
                Partition::Gcp
            ]
        );
    }

    #[test]
    fn test_list_tolerates_missing_partitions() {
        let list: WorkingEnvironmentList =
            serde_json::from_value(json!({"azureVsaWorkingEnvironments": []})).unwrap();
        assert!(list.into_ordered().is_empty());
    }

    #[test]
    fn test_working_environment_fields() {
        let env: WorkingEnvironment = serde_json::from_value(json!({
            "publicId": "VsaWorkingEnvironment-1",
            "name": "cvo1",
            "cloudProviderName": "Amazon",
            "isHA": true,
            "workingEnvironmentType": "VSA",
            "svmName": "svm_cvo1",
            "tenantId": "ignored"
        }))
        .unwrap();
        assert!(env.is_ha);
        assert_eq!(env.cloud_provider_name, "Amazon");
        assert_eq!(env.svm_name, "svm_cvo1");
        assert!(env.partition.is_none());
    }

    #[test]
    fn test_task_status_codes() {
        assert_eq!(TaskStatus::try_from(0).unwrap(), TaskStatus::Pending);
        assert_eq!(TaskStatus::try_from(1).unwrap(), TaskStatus::Success);
        assert_eq!(TaskStatus::try_from(-1).unwrap(), TaskStatus::Failure);
        assert!(TaskStatus::try_from(2).is_err());
    }

    #[test]
    fn test_properties_keep_unknown_fields() {
        let props: WorkingEnvironmentProperties = serde_json::from_value(json!({
            "publicId": "VsaWorkingEnvironment-1",
            "status": {"status": "UPDATING", "message": ""},
            "ontapClusterProperties": {
                "ontapVersion": "9.10.1",
                "upgradeVersions": [{"imageVersion": "ONTAP-9.11.1", "lastModified": 1, "autoUpdateAllowed": false}],
                "wormEnabled": false
            },
            "awsProperties": {"regionName": "us-east-1"}
        }))
        .unwrap();

        assert!(props.is_updating());
        assert_eq!(props.ontap_version(), "9.10.1");
        assert_eq!(props.upgrade_versions().unwrap()[0].image_version, "ONTAP-9.11.1");
        assert!(props.other.contains_key("awsProperties"));
        assert!(
            props
                .ontap_cluster_properties
                .as_ref()
                .unwrap()
                .other
                .contains_key("wormEnabled")
        );
    }

    #[test]
    fn test_empty_snapshot_is_not_updating() {
        let props = WorkingEnvironmentProperties::default();
        assert!(!props.is_updating());
        assert_eq!(props.ontap_version(), "");
        assert!(props.upgrade_versions().is_none());
    }

    #[test]
    fn test_null_fields_read_as_defaults() {
        let list: WorkingEnvironmentList = serde_json::from_value(json!({
            "onPremWorkingEnvironments": [
                {"publicId": "onprem-1", "name": "lab", "svmName": null, "cloudProviderName": null, "isHA": null}
            ],
            "azureVsaWorkingEnvironments": null
        }))
        .unwrap();
        let ordered = list.into_ordered();
        assert_eq!(ordered.len(), 1);
        assert_eq!(ordered[0].svm_name, "");
        assert_eq!(ordered[0].cloud_provider_name, "");
        assert!(!ordered[0].is_ha);
    }

    #[test]
    fn test_null_snapshot_fields_read_as_pending() {
        let props: WorkingEnvironmentProperties = serde_json::from_value(json!({
            "publicId": "VsaWorkingEnvironment-1",
            "status": {"status": null},
            "ontapClusterProperties": {"ontapVersion": null, "nodes": null}
        }))
        .unwrap();
        assert_eq!(props.status_name(), "");
        assert!(!props.is_updating());
        assert_eq!(props.ontap_version(), "");
        assert!(props.ontap_cluster_properties.unwrap().nodes.is_empty());
    }

    #[test]
    fn test_partition_serializes_like_display() {
        assert_eq!(serde_json::to_value(Partition::OnPrem).unwrap(), json!("on-prem"));
        assert_eq!(Partition::OnPrem.to_string(), "on-prem");
        assert_eq!(serde_json::to_value(Partition::Fsx).unwrap(), json!("fsx"));
    }
}
