//! Working environment resolution
//!
//! The service has no "get by name" endpoint and splits its inventory across
//! provider partitions. Lookups fetch the full list once and scan it in
//! partition order (on-prem, AWS, Azure, GCP). FSX file systems live in a
//! separate namespace with their own endpoints and are addressed by `fs-` ids.
//!
//! Names are only unique inside one partition. When the same name appears in
//! several partitions the first one in scan order is returned; callers should
//! not depend on which.

use serde_json::Value;
use std::fmt;
use tracing::debug;

use crate::client::OccmClient;
use crate::error::{CoreError, Result, ResultExt};
use crate::transport::segment;
use crate::types::{
    FsxSvm, FsxSystem, Partition, WorkingEnvironment, WorkingEnvironmentList,
    WorkingEnvironmentProperties,
};

/// Prefix of FSX file system ids
pub const FSX_ID_PREFIX: &str = "fs-";

/// API root shared by every FSX working environment
pub const FSX_API_ROOT: &str = "/occm/api/fsx";

const WORKING_ENVIRONMENT: &str = "working environment";
const FSX_WORKING_ENVIRONMENT: &str = "FSX working environment";

/// Returns true for ids in the FSX namespace
pub fn is_fsx_id(id: &str) -> bool {
    id.starts_with(FSX_ID_PREFIX)
}

/// Fetch every working environment, tagged with its partition, in scan order
pub async fn list_working_environments(client: &OccmClient) -> Result<Vec<WorkingEnvironment>> {
    let list: WorkingEnvironmentList = client
        .get_json("/occm/api/working-environments", "listWorkingEnvironments")
        .await?;
    Ok(list.into_ordered())
}

fn find_in<'a>(
    environments: &'a [WorkingEnvironment],
    matches: impl Fn(&WorkingEnvironment) -> bool,
) -> Option<&'a WorkingEnvironment> {
    environments.iter().find(|env| matches(env))
}

/// First working environment whose name matches exactly
pub async fn resolve_by_name(client: &OccmClient, name: &str) -> Result<WorkingEnvironment> {
    let environments = list_working_environments(client).await?;
    let found = find_in(&environments, |env| env.name == name).cloned();
    match found {
        Some(env) => {
            debug!("Found working environment {} ({}) in {:?}", env.name, env.public_id, env.partition);
            Ok(env)
        }
        None => Err(CoreError::NotFound {
            kind: WORKING_ENVIRONMENT,
            key: name.to_string(),
        }),
    }
}

/// Working environment with the given public id, found by scanning the list
pub async fn resolve_by_id(client: &OccmClient, id: &str) -> Result<WorkingEnvironment> {
    let environments = list_working_environments(client).await?;
    find_in(&environments, |env| env.public_id == id)
        .cloned()
        .ok_or_else(|| CoreError::NotFound {
            kind: WORKING_ENVIRONMENT,
            key: id.to_string(),
        })
}

/// Coarse record from the single-resource endpoint
///
/// Carries provider and HA flag but not the partition.
pub async fn working_environment_info(client: &OccmClient, id: &str) -> Result<WorkingEnvironment> {
    let path = format!("/occm/api/working-environments/{}", segment(id));
    client.get_json(&path, "getWorkingEnvironmentInfo").await
}

/// How much of a working environment record a direct lookup should return
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detail {
    /// Provider and HA flag only, one request
    Coarse,
    /// Re-resolved through the list for fields only the list carries
    Full,
}

/// Look up by id through the direct endpoint, optionally enriching from the list
///
/// A 404 from the direct endpoint is reported as [`CoreError::NotFound`].
pub async fn resolve_by_id_via_direct_lookup(
    client: &OccmClient,
    id: &str,
    detail: Detail,
) -> Result<WorkingEnvironment> {
    let coarse = match working_environment_info(client, id).await {
        Ok(env) => env,
        Err(err) if err.is_not_found() => {
            return Err(CoreError::NotFound {
                kind: WORKING_ENVIRONMENT,
                key: id.to_string(),
            });
        }
        Err(err) => return Err(err),
    };

    match detail {
        Detail::Coarse => Ok(coarse),
        Detail::Full => {
            let public_id = if coarse.public_id.is_empty() {
                id
            } else {
                coarse.public_id.as_str()
            };
            resolve_by_id(client, public_id).await
        }
    }
}

/// SVM name of an FSX file system; the first SVM is taken
pub async fn fsx_svm_name(client: &OccmClient, id: &str) -> Result<String> {
    let path = format!("/occm/api/fsx/working-environments/{}/svms", segment(id));
    let svms: Vec<FsxSvm> = client.get_json(&path, "getFSXSVM").await?;
    svms.into_iter()
        .next()
        .map(|svm| svm.name)
        .ok_or_else(|| CoreError::NotFound {
            kind: "SVM for FSX working environment",
            key: id.to_string(),
        })
}

fn fsx_environment(id: String, name: String, svm_name: String) -> WorkingEnvironment {
    WorkingEnvironment {
        public_id: id,
        name,
        cloud_provider_name: "Amazon".to_string(),
        is_ha: false,
        working_environment_type: "FSX".to_string(),
        svm_name,
        partition: Some(Partition::Fsx),
    }
}

/// FSX file system by id, with its SVM name
pub async fn resolve_fsx_by_id(
    client: &OccmClient,
    tenant_id: &str,
    id: &str,
) -> Result<WorkingEnvironment> {
    let path = format!(
        "/fsx-ontap/working-environments/{}/{}",
        segment(tenant_id),
        segment(id)
    );
    let system: Value = match client.get_json(&path, "getFSXWorkingEnvironmentInfo").await {
        Ok(system) => system,
        Err(err) if err.is_not_found() => {
            return Err(CoreError::NotFound {
                kind: FSX_WORKING_ENVIRONMENT,
                key: id.to_string(),
            });
        }
        Err(err) => return Err(err),
    };
    let name = system
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            CoreError::UnexpectedResponse(format!("FSX working environment {} has no name", id))
        })?
        .to_string();

    let svm_name = fsx_svm_name(client, id).await?;
    Ok(fsx_environment(id.to_string(), name, svm_name))
}

/// FSX file system by name within a tenant, with its SVM name
pub async fn resolve_fsx_by_name(
    client: &OccmClient,
    tenant_id: &str,
    name: &str,
) -> Result<WorkingEnvironment> {
    let path = format!("/fsx-ontap/working-environments/{}", segment(tenant_id));
    let systems: Vec<FsxSystem> = client.get_json(&path, "getAWSFSXByName").await?;
    let system = systems
        .into_iter()
        .find(|system| system.name == name)
        .ok_or_else(|| CoreError::NotFound {
            kind: FSX_WORKING_ENVIRONMENT,
            key: name.to_string(),
        })?;

    let svm_name = fsx_svm_name(client, &system.id).await?;
    Ok(fsx_environment(system.id, system.name, svm_name))
}

/// Path prefix for mutation endpoints of one working environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRoot {
    pub path: String,
    /// Provider name as reported by the service; empty for FSX
    pub cloud_provider: String,
    pub is_ha: bool,
}

impl fmt::Display for ApiRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

/// API root for an already resolved working environment
pub fn api_root_for(env: &WorkingEnvironment) -> String {
    if is_fsx_id(&env.public_id) || env.partition == Some(Partition::Fsx) {
        return FSX_API_ROOT.to_string();
    }
    let topology = if env.is_ha { "ha" } else { "vsa" };
    if env.cloud_provider_name == "Amazon" {
        if env.is_ha {
            "/occm/api/aws/ha".to_string()
        } else {
            "/occm/api/vsa".to_string()
        }
    } else {
        format!(
            "/occm/api/{}/{}",
            env.cloud_provider_name.to_lowercase(),
            topology
        )
    }
}

/// Compute the API root for a working environment id
///
/// FSX ids are answered without a network call.
pub async fn compute_api_root(client: &OccmClient, id: &str) -> Result<ApiRoot> {
    if is_fsx_id(id) {
        return Ok(ApiRoot {
            path: FSX_API_ROOT.to_string(),
            cloud_provider: String::new(),
            is_ha: false,
        });
    }
    let env = resolve_by_id_via_direct_lookup(client, id, Detail::Coarse).await?;
    let path = api_root_for(&env);
    debug!("API root = {}", path);
    Ok(ApiRoot {
        path,
        cloud_provider: env.cloud_provider_name,
        is_ha: env.is_ha,
    })
}

/// GCP working environment path, the collection when `id` is `None`
pub fn gcp_working_environment_root(is_ha: bool, id: Option<&str>) -> String {
    let topology = if is_ha { "ha" } else { "vsa" };
    match id {
        Some(id) => format!(
            "/occm/api/gcp/{}/working-environments/{}",
            topology,
            segment(id)
        ),
        None => format!("/occm/api/gcp/{}/working-environments", topology),
    }
}

/// Typed properties snapshot restricted to `fields`
pub async fn working_environment_properties(
    client: &OccmClient,
    api_root: &str,
    id: &str,
    fields: &[&str],
) -> Result<WorkingEnvironmentProperties> {
    let mut path = format!("{}/working-environments/{}", api_root, segment(id));
    if !fields.is_empty() {
        path.push_str("?fields=");
        path.push_str(&fields.join(","));
    }
    client.get_json(&path, "getWorkingEnvironmentProperties").await
}

/// How a caller identifies a working environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkingEnvironmentSelector {
    Id(String),
    Name(String),
    FsxId { tenant_id: String, id: String },
    FsxName { tenant_id: String, name: String },
}

impl WorkingEnvironmentSelector {
    /// Build a selector from optional id, name and tenant inputs
    ///
    /// An id wins over a name. An `fs-` id needs a tenant. A name together
    /// with a tenant selects the FSX namespace.
    pub fn from_fields(
        id: Option<&str>,
        name: Option<&str>,
        tenant_id: Option<&str>,
    ) -> Result<Self> {
        let id = id.filter(|s| !s.is_empty());
        let name = name.filter(|s| !s.is_empty());
        let tenant_id = tenant_id.filter(|s| !s.is_empty());

        match (id, name, tenant_id) {
            (Some(id), _, Some(tenant)) if is_fsx_id(id) => Ok(Self::FsxId {
                tenant_id: tenant.to_string(),
                id: id.to_string(),
            }),
            (Some(id), _, None) if is_fsx_id(id) => Err(CoreError::Precondition(format!(
                "Cannot find FSX working environment {}, need tenant_id",
                id
            ))),
            (Some(id), _, _) => Ok(Self::Id(id.to_string())),
            (None, Some(name), Some(tenant)) => Ok(Self::FsxName {
                tenant_id: tenant.to_string(),
                name: name.to_string(),
            }),
            (None, Some(name), None) => Ok(Self::Name(name.to_string())),
            (None, None, _) => Err(CoreError::Precondition(
                "working environment id or name is required".to_string(),
            )),
        }
    }

    pub fn is_fsx(&self) -> bool {
        matches!(self, Self::FsxId { .. } | Self::FsxName { .. })
    }
}

impl fmt::Display for WorkingEnvironmentSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) | Self::FsxId { id, .. } => f.write_str(id),
            Self::Name(name) | Self::FsxName { name, .. } => f.write_str(name),
        }
    }
}

/// Resolve a selector to a full working environment record
pub async fn resolve(
    client: &OccmClient,
    selector: &WorkingEnvironmentSelector,
) -> Result<WorkingEnvironment> {
    match selector {
        WorkingEnvironmentSelector::Id(id) => {
            resolve_by_id_via_direct_lookup(client, id, Detail::Full).await
        }
        WorkingEnvironmentSelector::Name(name) => resolve_by_name(client, name).await,
        WorkingEnvironmentSelector::FsxId { tenant_id, id } => {
            resolve_fsx_by_id(client, tenant_id, id).await
        }
        WorkingEnvironmentSelector::FsxName { tenant_id, name } => {
            resolve_fsx_by_name(client, tenant_id, name).await
        }
    }
}

/// Resolve the two ends of a replication relationship
///
/// Ids are matched against the list directly. The destination may be an FSX
/// file system.
pub async fn resolve_replication_pair(
    client: &OccmClient,
    source: &WorkingEnvironmentSelector,
    destination: &WorkingEnvironmentSelector,
) -> Result<(WorkingEnvironment, WorkingEnvironment)> {
    let source_env = resolve_endpoint(client, source)
        .await
        .for_operation("resolve replication source", &source.to_string())?;
    let destination_env = resolve_endpoint(client, destination)
        .await
        .for_operation("resolve replication destination", &destination.to_string())?;
    Ok((source_env, destination_env))
}

async fn resolve_endpoint(
    client: &OccmClient,
    selector: &WorkingEnvironmentSelector,
) -> Result<WorkingEnvironment> {
    match selector {
        WorkingEnvironmentSelector::Id(id) => resolve_by_id(client, id).await,
        other => resolve(client, other).await,
    }
}
