//! Working environment command implementations

use anyhow::Context;
use cvoctl_core::cvo::{
    self, GcpLabel, LicenseInstanceTypeRequest, OntapUpgradeRequest, Tracked, UserTag,
};
use cvoctl_core::progress::wait_for_task;
use cvoctl_core::resolver::{self, WorkingEnvironmentSelector};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info};

use super::progress::{settle, spinner, spinner_callback};
use crate::cli::{LicenseArgs, OutputFormat, SelectorArgs, TaskCommands, UpgradeArgs};
use crate::connection::ConnectionManager;
use crate::error::{CliError, Result as CliResult};
use crate::output::print_output;

pub async fn handle_list(
    conn_mgr: &ConnectionManager,
    profile: Option<&str>,
    output: OutputFormat,
) -> CliResult<()> {
    let client = conn_mgr.create_client(profile)?;
    let environments = resolver::list_working_environments(&client).await?;
    debug!("Listed {} working environments", environments.len());
    print_output(&environments, output)
}

/// Build a selector, filling the tenant from the profile for `fs-` ids
fn selector_for(
    conn_mgr: &ConnectionManager,
    profile: Option<&str>,
    args: &SelectorArgs,
) -> CliResult<WorkingEnvironmentSelector> {
    let tenant = match (&args.tenant_id, &args.id) {
        (Some(tenant), _) => Some(tenant.clone()),
        (None, Some(id)) if resolver::is_fsx_id(id) => conn_mgr.profile_tenant(profile),
        _ => None,
    };
    Ok(WorkingEnvironmentSelector::from_fields(
        args.id.as_deref(),
        args.name.as_deref(),
        tenant.as_deref(),
    )?)
}

pub async fn handle_resolve(
    conn_mgr: &ConnectionManager,
    profile: Option<&str>,
    args: &SelectorArgs,
    output: OutputFormat,
) -> CliResult<()> {
    let selector = selector_for(conn_mgr, profile, args)?;
    let client = conn_mgr.create_client(profile)?;
    let env = resolver::resolve(&client, &selector).await?;
    print_output(&env, output)
}

pub async fn handle_api_root(
    conn_mgr: &ConnectionManager,
    profile: Option<&str>,
    id: &str,
    output: OutputFormat,
) -> CliResult<()> {
    let client = conn_mgr.create_client(profile)?;
    let api_root = resolver::compute_api_root(&client, id).await?;
    print_output(
        json!({
            "publicId": id,
            "apiRoot": api_root.path,
            "cloudProviderName": api_root.cloud_provider,
            "isHA": api_root.is_ha,
        }),
        output,
    )
}

pub async fn handle_properties(
    conn_mgr: &ConnectionManager,
    profile: Option<&str>,
    id: &str,
    fields: &[String],
    output: OutputFormat,
) -> CliResult<()> {
    let client = conn_mgr.create_client(profile)?;
    let api_root = resolver::compute_api_root(&client, id).await?;
    let fields: Vec<&str> = fields
        .iter()
        .map(String::as_str)
        .filter(|f| !f.is_empty())
        .collect();
    let properties =
        resolver::working_environment_properties(&client, &api_root.path, id, &fields).await?;
    print_output(&properties, output)
}

pub async fn handle_task_command(
    conn_mgr: &ConnectionManager,
    profile: Option<&str>,
    command: &TaskCommands,
    output: OutputFormat,
) -> CliResult<()> {
    match command {
        TaskCommands::Wait {
            task_id,
            action,
            verb,
            retries,
            interval,
        } => {
            let client = conn_mgr.create_client(profile)?;
            let mut policy = client.polling().completion_policy(false);
            if let Some(retries) = retries {
                policy.retries = *retries;
            }
            if let Some(interval) = interval {
                policy.interval = Duration::from_secs(*interval);
            }

            let pb = spinner(format!("Waiting for task {}", task_id));
            let callback = spinner_callback(&pb);
            let result = wait_for_task(&client, task_id, action, verb, &policy, Some(&callback)).await;
            settle(&pb);
            result?;

            print_output(json!({"taskId": task_id, "status": "DONE"}), output)
        }
    }
}

pub async fn handle_tags(
    conn_mgr: &ConnectionManager,
    profile: Option<&str>,
    id: &str,
    tags: &[(String, String)],
    output: OutputFormat,
) -> CliResult<()> {
    let client = conn_mgr.create_client(profile)?;
    let tags: Vec<UserTag> = tags.iter().map(|(k, v)| UserTag::new(k, v)).collect();
    cvo::update_user_tags(&client, id, &tags).await?;
    info!("Updated {} user tags on {}", tags.len(), id);
    print_output(json!({"publicId": id, "userTags": tags}), output)
}

pub async fn handle_labels(
    conn_mgr: &ConnectionManager,
    profile: Option<&str>,
    id: &str,
    labels: &[(String, String)],
    output: OutputFormat,
) -> CliResult<()> {
    let client = conn_mgr.create_client(profile)?;
    let labels: Vec<GcpLabel> = labels.iter().map(|(k, v)| GcpLabel::new(k, v)).collect();
    cvo::update_gcp_labels(&client, id, &labels).await?;
    info!("Updated {} labels on {}", labels.len(), id);
    print_output(json!({"publicId": id, "gcpLabels": labels}), output)
}

pub async fn handle_password(
    conn_mgr: &ConnectionManager,
    profile: Option<&str>,
    id: &str,
    password: Option<&str>,
    output: OutputFormat,
) -> CliResult<()> {
    let password = match password {
        Some(p) => p.to_string(),
        None => rpassword::prompt_password("SVM password: ")
            .context("failed to read password from the terminal")?,
    };
    if password.is_empty() {
        return Err(CliError::InvalidInput {
            message: "password cannot be empty".to_string(),
        });
    }

    let client = conn_mgr.create_client(profile)?;
    cvo::set_svm_password(&client, id, &password).await?;
    print_output(json!({"publicId": id, "svmPassword": "updated"}), output)
}

pub async fn handle_tier(
    conn_mgr: &ConnectionManager,
    profile: Option<&str>,
    id: &str,
    level: &str,
    output: OutputFormat,
) -> CliResult<()> {
    let client = conn_mgr.create_client(profile)?;
    cvo::change_tier_level(&client, id, level).await?;
    print_output(json!({"publicId": id, "tierLevel": level}), output)
}

pub async fn handle_license(
    conn_mgr: &ConnectionManager,
    profile: Option<&str>,
    args: &LicenseArgs,
    output: OutputFormat,
) -> CliResult<()> {
    let client = conn_mgr.create_client(profile)?;
    let request = LicenseInstanceTypeRequest {
        instance_type: args.instance_type.clone(),
        license_type: args.license_type.clone(),
    };

    let pb = spinner(format!("Changing license and instance type of {}", args.id));
    let callback = spinner_callback(&pb);
    let result =
        cvo::update_license_instance_type(&client, &args.id, &request, Some(&callback)).await;
    settle(&pb);

    print_output(&result?, output)
}

pub async fn handle_upgrade(
    conn_mgr: &ConnectionManager,
    profile: Option<&str>,
    args: &UpgradeArgs,
    output: OutputFormat,
) -> CliResult<()> {
    let client = conn_mgr.create_client(profile)?;
    let mut request = OntapUpgradeRequest {
        upgrade: true,
        ontap_version: Tracked::new(String::new(), args.version.clone()),
        use_latest_version: Tracked::unchanged(false),
    };

    let pb = spinner(format!("Upgrading {} to {}", args.id, args.version));
    let callback = spinner_callback(&pb);
    let result =
        cvo::check_and_upgrade_ontap_version(&client, &args.id, &mut request, Some(&callback))
            .await;
    settle(&pb);

    let reported = result?.unwrap_or_default();
    print_output(
        json!({"publicId": args.id, "ontapVersion": reported}),
        output,
    )
}
