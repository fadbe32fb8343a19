//! Profile management command implementations

use colored::Colorize;
use cvoctl_core::{ConfigError, Profile};
use serde_json::json;
use tracing::{debug, info};

use crate::cli::{OutputFormat, ProfileCommands, ProfileSetArgs};
use crate::connection::ConnectionManager;
use crate::error::Result as CliResult;
use crate::output::print_output;

/// Handle profile management commands
pub async fn handle_profile_command(
    profile_cmd: &ProfileCommands,
    conn_mgr: &mut ConnectionManager,
    output_format: OutputFormat,
) -> CliResult<()> {
    use ProfileCommands::*;

    match profile_cmd {
        List => handle_list(conn_mgr, output_format),
        Path => handle_path(conn_mgr, output_format),
        Show { name } => handle_show(conn_mgr, name, output_format),
        Set(args) => handle_set(conn_mgr, args),
        Remove { name } => handle_remove(conn_mgr, name),
        Default { name } => handle_default(conn_mgr, name),
    }
}

/// Mask a secret for display, keeping `keyring:` and `${VAR}` references readable
fn mask_secret(value: &str) -> String {
    if value.starts_with("keyring:") || value.starts_with("${") {
        return value.to_string();
    }
    let chars: Vec<char> = value.chars().collect();
    if chars.len() > 8 {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", head, tail)
    } else {
        "***".to_string()
    }
}

fn profile_summary(name: &str, profile: &Profile, is_default: bool) -> serde_json::Value {
    json!({
        "name": name,
        "default": is_default,
        "clientId": profile.client_id,
        "cloudManagerUrl": profile.cloud_manager_url,
        "tenantId": profile.tenant_id,
        "token": if profile.refresh_token.is_some() { "refresh" } else { "access" },
    })
}

fn handle_list(conn_mgr: &ConnectionManager, output_format: OutputFormat) -> CliResult<()> {
    let config = &conn_mgr.config;
    let profiles = config.list_profiles();
    debug!("Found {} profiles", profiles.len());

    if output_format == OutputFormat::Json {
        let rows: Vec<_> = profiles
            .iter()
            .map(|(name, profile)| {
                profile_summary(
                    name,
                    profile,
                    config.default_profile.as_deref() == Some(name.as_str()),
                )
            })
            .collect();
        return print_output(json!({ "profiles": rows }), output_format);
    }

    if profiles.is_empty() {
        println!("No profiles configured.");
        println!("Use 'cvoctl profile set' to create a profile.");
        return Ok(());
    }

    for (name, profile) in profiles {
        let marker = if config.default_profile.as_deref() == Some(name.as_str()) {
            " (default)"
        } else {
            ""
        };
        println!("  {}{}", name.bold().cyan(), marker);
        println!("    {} {}", "URL:".dimmed(), profile.cloud_manager_url);
        println!("    {} {}", "Client:".dimmed(), profile.client_id);
    }
    Ok(())
}

fn handle_path(conn_mgr: &ConnectionManager, output_format: OutputFormat) -> CliResult<()> {
    let path = conn_mgr.effective_config_path()?;
    match output_format {
        OutputFormat::Json => print_output(json!({ "path": path.display().to_string() }), output_format),
        OutputFormat::Table => {
            println!("{}", path.display());
            Ok(())
        }
    }
}

fn handle_show(
    conn_mgr: &ConnectionManager,
    name: &str,
    output_format: OutputFormat,
) -> CliResult<()> {
    let config = &conn_mgr.config;
    let profile = config.profile(name)?;
    let mut details = profile_summary(
        name,
        profile,
        config.default_profile.as_deref() == Some(name),
    );
    details["authUrl"] = json!(profile.auth_url);
    if let Some(token) = profile.refresh_token.as_deref().or(profile.access_token.as_deref()) {
        details["tokenValue"] = json!(mask_secret(token));
    }
    details["polling"] = serde_json::to_value(profile.polling())?;

    print_output(details, output_format)
}

fn handle_set(conn_mgr: &mut ConnectionManager, args: &ProfileSetArgs) -> CliResult<()> {
    debug!("Setting profile: {}", args.name);

    let mut profile = Profile::new(&args.client_id);
    if let Some(url) = &args.url {
        profile.cloud_manager_url = url.clone();
    }
    if let Some(auth_url) = &args.auth_url {
        profile.auth_url = auth_url.clone();
    }
    profile.tenant_id = args.tenant_id.clone();
    // Keep polling overrides when a profile is re-set
    if let Ok(existing) = conn_mgr.config.profile(&args.name) {
        profile.polling = existing.polling.clone();
    }

    #[cfg(feature = "secure-storage")]
    let store = |kind: &str, value: &String| -> CliResult<String> {
        if args.use_keyring {
            let credentials = cvoctl_core::config::CredentialStore::new();
            Ok(credentials.store_credential(&format!("{}-{}", args.name, kind), value)?)
        } else {
            Ok(value.clone())
        }
    };
    #[cfg(not(feature = "secure-storage"))]
    let store = |_kind: &str, value: &String| -> CliResult<String> { Ok(value.clone()) };

    profile.refresh_token = args
        .refresh_token
        .as_ref()
        .map(|t| store("refresh-token", t))
        .transpose()?;
    profile.access_token = args
        .access_token
        .as_ref()
        .map(|t| store("access-token", t))
        .transpose()?;

    let is_first = conn_mgr.config.profiles.is_empty();
    conn_mgr.config.set_profile(args.name.clone(), profile);
    if is_first {
        conn_mgr.config.default_profile = Some(args.name.clone());
    }
    conn_mgr.save_config()?;

    info!("Saved profile '{}'", args.name);
    println!("Profile '{}' saved successfully.", args.name);
    if !is_first {
        println!();
        println!("Tip: Set as default with:");
        println!("  cvoctl profile default {}", args.name);
    }
    Ok(())
}

fn handle_remove(conn_mgr: &mut ConnectionManager, name: &str) -> CliResult<()> {
    if conn_mgr.config.remove_profile(name).is_none() {
        return Err(ConfigError::ProfileNotFound {
            name: name.to_string(),
        }
        .into());
    }
    conn_mgr.save_config()?;
    println!("Profile '{}' removed.", name);
    Ok(())
}

fn handle_default(conn_mgr: &mut ConnectionManager, name: &str) -> CliResult<()> {
    conn_mgr.config.profile(name)?;
    conn_mgr.config.default_profile = Some(name.to_string());
    conn_mgr.save_config()?;
    println!("Default profile set to '{}'.", name);
    Ok(())
}
