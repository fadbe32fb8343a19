//! Cloud Volumes ONTAP workflows - multi-step modifications
//!
//! Each workflow resolves the API root for the working environment, submits
//! one mutation to `{apiRoot}/working-environments/{id}/{action}` and, where
//! the change has observable state transitions, polls until it settles.
//! Submissions are sent exactly once. Errors are annotated with the operation
//! name and working environment id.

use serde::Serialize;
use tracing::{debug, info};

use crate::client::OccmClient;
use crate::cvo::params::{
    ChangeTierLevelRequest, GcpLabel, LicenseInstanceTypeRequest, ModifyUserTagsRequest,
    OntapUpgradeRequest, SKIP_ELIGIBILITY_PAYGO_UPGRADE, SetFlagRequest, SetPasswordRequest,
    UpgradeImageRequest, UserTag, match_upgrade_version, validate_unique_label_keys,
    validate_unique_tag_keys,
};
use crate::error::{Result, ResultExt};
use crate::progress::{ProgressCallback, wait_for_image_upgrade, wait_for_update};
use crate::resolver::{ApiRoot, compute_api_root, working_environment_properties};
use crate::transport::{Method, segment};
use crate::types::WorkingEnvironmentProperties;

/// Snapshot field carrying the eligible-upgrade catalog
pub const UPGRADE_CATALOG_FIELDS: &[&str] = &["ontapClusterProperties.fields(upgradeVersions)"];

/// Send one mutation for a working environment under a known API root
async fn submit<B: Serialize>(
    client: &OccmClient,
    method: Method,
    api_root: &ApiRoot,
    id: &str,
    action: &str,
    body: &B,
    operation: &str,
) -> Result<()> {
    let path = format!(
        "{}/working-environments/{}/{}",
        api_root.path,
        segment(id),
        action
    );
    let body = serde_json::to_value(body)?;
    client.send(method, &path, body, operation).await?;
    Ok(())
}

async fn put_user_tags(client: &OccmClient, id: &str, tags: Vec<UserTag>) -> Result<()> {
    let api_root = compute_api_root(client, id).await?;
    let request = ModifyUserTagsRequest { tags };
    submit(
        client,
        Method::Put,
        &api_root,
        id,
        "user-tags",
        &request,
        "updateCVOUserTags",
    )
    .await?;
    info!("Updated {} user tags: {:?}", id, request.tags);
    Ok(())
}

/// Replace the user tags of a working environment
///
/// Duplicate keys are rejected before anything is sent.
pub async fn update_user_tags(client: &OccmClient, id: &str, tags: &[UserTag]) -> Result<()> {
    async {
        validate_unique_tag_keys(tags)?;
        put_user_tags(client, id, tags.to_vec()).await
    }
    .await
    .for_operation("update user tags", id)
}

/// Replace the labels of a GCP working environment
pub async fn update_gcp_labels(client: &OccmClient, id: &str, labels: &[GcpLabel]) -> Result<()> {
    async {
        validate_unique_label_keys(labels)?;
        let tags = labels.iter().cloned().map(UserTag::from).collect();
        put_user_tags(client, id, tags).await
    }
    .await
    .for_operation("update GCP labels", id)
}

/// Set the SVM admin password
pub async fn set_svm_password(client: &OccmClient, id: &str, password: &str) -> Result<()> {
    let result: Result<()> = async {
        let api_root = compute_api_root(client, id).await?;
        let request = SetPasswordRequest {
            password: password.to_string(),
        };
        submit(
            client,
            Method::Put,
            &api_root,
            id,
            "set-password",
            &request,
            "updateCVOSVMPassword",
        )
        .await?;
        info!("Updated {} svm password", id);
        Ok(())
    }
    .await;
    result.for_operation("set SVM password", id)
}

/// Change the capacity tier level
///
/// Fire and forget: the service exposes no state transition to wait on.
pub async fn change_tier_level(client: &OccmClient, id: &str, level: &str) -> Result<()> {
    let result: Result<()> = async {
        let api_root = compute_api_root(client, id).await?;
        let request = ChangeTierLevelRequest {
            level: level.to_string(),
        };
        submit(
            client,
            Method::Post,
            &api_root,
            id,
            "change-tier-level",
            &request,
            "updateCVOTierLevel",
        )
        .await?;
        info!("Updated {} tier level: {}", id, level);
        Ok(())
    }
    .await;
    result.for_operation("change tier level", id)
}

/// Change license and instance type, then wait for the update to settle
///
/// Returns the snapshot read once the status left `UPDATING`. HA systems get
/// the scaled retry budget.
pub async fn update_license_instance_type(
    client: &OccmClient,
    id: &str,
    request: &LicenseInstanceTypeRequest,
    on_progress: Option<&ProgressCallback>,
) -> Result<WorkingEnvironmentProperties> {
    let result: Result<WorkingEnvironmentProperties> = async {
        let api_root = compute_api_root(client, id).await?;
        submit(
            client,
            Method::Put,
            &api_root,
            id,
            "license-instance-type",
            request,
            "updateCVOLicenseInstanceType",
        )
        .await?;

        let policy = client.polling().completion_policy(api_root.is_ha);
        let props = wait_for_update(client, &api_root.path, id, &policy, on_progress).await?;
        info!("Updated {} license and instance type: {:?}", id, request);
        Ok(props)
    }
    .await;
    result.for_operation("update license and instance type", id)
}

/// Check the eligible-upgrade catalog and return the matching entry
///
/// The catalog is read fresh on every call.
pub async fn ensure_upgrade_available(
    client: &OccmClient,
    api_root: &ApiRoot,
    id: &str,
    requested: &str,
) -> Result<String> {
    let props =
        working_environment_properties(client, &api_root.path, id, UPGRADE_CATALOG_FIELDS).await?;
    debug!("Current ontap version of {}: {}", id, props.ontap_version());
    match_upgrade_version(id, props.upgrade_versions(), requested)
}

/// Set a boolean Cloud Manager config flag
pub async fn set_config_flag(client: &OccmClient, key: &str, value: bool) -> Result<()> {
    let path = format!("/occm/api/occm/config/{}", segment(key));
    let body = serde_json::to_value(SetFlagRequest::boolean(value))?;
    client
        .send(Method::Put, &path, body, "setConfigFlag")
        .await?;
    debug!("Config flag {} set to {}", key, value);
    Ok(())
}

/// Submit an image upgrade for a catalog version and wait until it lands
///
/// Sets the eligibility bypass flag first. A flag that was set is not unset
/// when the submission fails. Returns the version reported afterwards.
pub async fn upgrade_ontap_image(
    client: &OccmClient,
    api_root: &ApiRoot,
    id: &str,
    version: &str,
    on_progress: Option<&ProgressCallback>,
) -> Result<String> {
    set_config_flag(client, SKIP_ELIGIBILITY_PAYGO_UPGRADE, true).await?;

    let request = UpgradeImageRequest::occm_provided(version);
    submit(
        client,
        Method::Post,
        api_root,
        id,
        "update-image",
        &request,
        "upgradeCVOOntapVersion",
    )
    .await?;

    let policy = client.polling().completion_policy(api_root.is_ha);
    let reported =
        wait_for_image_upgrade(client, &api_root.path, id, version, &policy, on_progress).await?;
    info!("Upgraded {} ontap version to {}", id, reported);
    Ok(reported)
}

/// Upgrade a working environment to a requested ONTAP version
///
/// Resolves the API root, checks the catalog before anything is changed and
/// then runs [`upgrade_ontap_image`] with the matched catalog entry.
pub async fn upgrade_ontap_version(
    client: &OccmClient,
    id: &str,
    requested: &str,
    on_progress: Option<&ProgressCallback>,
) -> Result<String> {
    async {
        let api_root = compute_api_root(client, id).await?;
        let version = ensure_upgrade_available(client, &api_root, id, requested).await?;
        upgrade_ontap_image(client, &api_root, id, &version, on_progress).await
    }
    .await
    .for_operation("upgrade ONTAP image", id)
}

/// Apply the declared upgrade intent for a working environment
///
/// With `upgrade` set, `latest` and `use_latest_version` are rejected before
/// any request; a failed upgrade reverts the desired version. Without it, any
/// version change is reverted and reported. Returns the new version when an
/// upgrade ran.
pub async fn check_and_upgrade_ontap_version(
    client: &OccmClient,
    id: &str,
    request: &mut OntapUpgradeRequest,
    on_progress: Option<&ProgressCallback>,
) -> Result<Option<String>> {
    if !request.upgrade {
        request
            .revert_unrequested_changes()
            .for_operation("upgrade ONTAP image", id)?;
        debug!("No ontap version upgrade for {}", id);
        return Ok(None);
    }

    request
        .check_requested_version()
        .for_operation("upgrade ONTAP image", id)?;

    let target = request.ontap_version.desired.clone();
    match upgrade_ontap_version(client, id, &target, on_progress).await {
        Ok(reported) => {
            request.ontap_version.commit();
            request.use_latest_version.commit();
            Ok(Some(reported))
        }
        Err(err) => {
            request.ontap_version.revert();
            Err(err)
        }
    }
}
