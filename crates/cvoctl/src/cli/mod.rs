//! CLI structure and command definitions
//!
//! Working environment commands live in [`cvo`]; profile management is
//! defined here.

use clap::{Parser, Subcommand};

pub mod cvo;

pub use cvo::*;

/// Cloud Volumes ONTAP orchestration through Cloud Manager
#[derive(Parser, Debug)]
#[command(name = "cvoctl")]
#[command(
    version,
    about = "Cloud Volumes ONTAP orchestration CLI for NetApp Cloud Manager"
)]
#[command(long_about = "
Cloud Volumes ONTAP orchestration CLI for NetApp Cloud Manager

Every command talks to the Cloud Manager connector configured in the selected
profile. Mutations are sent once and then polled until the service settles.

EXAMPLES:
    # Set up a profile
    cvoctl profile set prod --client-id abc123 --refresh-token TOKEN

    # Find a working environment by name
    cvoctl resolve --name cvo-prod

    # Show the API root used for mutations
    cvoctl api-root VsaWorkingEnvironment-1

    # Upgrade ONTAP and wait for the new version to be reported
    cvoctl upgrade VsaWorkingEnvironment-1 ONTAP-9.10.1P3

For more help on a specific command, run:
    cvoctl <command> --help
")]
pub struct Cli {
    /// Profile to use for this command
    #[arg(long, short, global = true, env = "CVOCTL_PROFILE")]
    pub profile: Option<String>,

    /// Path to alternate configuration file
    #[arg(long, global = true, env = "CVOCTL_CONFIG_FILE")]
    pub config_file: Option<String>,

    /// Output format
    #[arg(long, short = 'o', global = true, value_enum, default_value = "json")]
    pub output: OutputFormat,

    /// Enable verbose logging
    #[arg(long, short, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// Human-readable table format
    Table,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List every working environment visible to the connector
    #[command(visible_alias = "ls")]
    List,

    /// Resolve a working environment by id or name
    #[command(after_help = "EXAMPLES:
    cvoctl resolve --id VsaWorkingEnvironment-1
    cvoctl resolve --name cvo-prod

    # FSX for ONTAP needs the tenant (account workspace)
    cvoctl resolve --id fs-0123 --tenant-id account-1
    cvoctl resolve --name fsx-prod --tenant-id account-1
")]
    Resolve(SelectorArgs),

    /// Show the API root used for mutations of a working environment
    ApiRoot {
        /// Working environment public id
        id: String,
    },

    /// Read working environment properties
    #[command(visible_alias = "props")]
    Properties {
        /// Working environment public id
        id: String,

        /// Properties to request (comma separated)
        #[arg(long, value_delimiter = ',', default_value = "status,ontapClusterProperties")]
        fields: Vec<String>,
    },

    /// Task operations
    #[command(subcommand)]
    Task(TaskCommands),

    /// Replace the user tags of a working environment
    #[command(after_help = "EXAMPLES:
    cvoctl tags VsaWorkingEnvironment-1 --tag owner=storage --tag env=prod
")]
    Tags {
        /// Working environment public id
        id: String,

        /// Tag as key=value (repeatable)
        #[arg(long = "tag", value_parser = parse_key_value, required = true)]
        tags: Vec<(String, String)>,
    },

    /// Replace the labels of a GCP working environment
    Labels {
        /// Working environment public id
        id: String,

        /// Label as key=value (repeatable)
        #[arg(long = "label", value_parser = parse_key_value, required = true)]
        labels: Vec<(String, String)>,
    },

    /// Set the SVM admin password (prompted when omitted)
    Password {
        /// Working environment public id
        id: String,

        /// New password
        #[arg(long)]
        password: Option<String>,
    },

    /// Change the capacity tier level
    Tier {
        /// Working environment public id
        id: String,

        /// Tier level (e.g. normal, ia, ia-single, intelligent)
        level: String,
    },

    /// Change license and instance type, then wait for the update to settle
    License(LicenseArgs),

    /// Upgrade ONTAP to a version published by Cloud Manager
    Upgrade(UpgradeArgs),

    /// Profile management
    #[command(subcommand, visible_alias = "prof")]
    #[command(after_help = "EXAMPLES:
    # Create a profile with a refresh token
    cvoctl profile set prod --client-id abc123 --refresh-token TOKEN

    # Create a profile with a pre-issued access token
    cvoctl profile set lab --client-id lab-connector --access-token TOKEN

    # List all profiles
    cvoctl profile list

    # Show profile details
    cvoctl profile show prod

    # Set the default profile
    cvoctl profile default prod
")]
    Profile(ProfileCommands),
}

/// Profile management commands
#[derive(Subcommand, Debug)]
pub enum ProfileCommands {
    /// List all configured profiles
    #[command(visible_alias = "ls")]
    List,

    /// Show the path to the configuration file
    Path,

    /// Show details of a specific profile
    #[command(visible_alias = "get")]
    Show {
        /// Profile name to show
        name: String,
    },

    /// Set or create a profile
    #[command(visible_alias = "add")]
    Set(ProfileSetArgs),

    /// Remove a profile
    #[command(visible_alias = "rm")]
    Remove {
        /// Profile name to remove
        name: String,
    },

    /// Set the default profile
    Default {
        /// Profile name
        name: String,
    },
}

/// Arguments for `profile set`
#[derive(clap::Args, Debug)]
#[command(group(
    clap::ArgGroup::new("token")
        .required(true)
        .args(["refresh_token", "access_token"])
))]
pub struct ProfileSetArgs {
    /// Profile name
    pub name: String,

    /// Connector (agent) client id
    #[arg(long)]
    pub client_id: String,

    /// Refresh token exchanged for access tokens
    #[arg(long)]
    pub refresh_token: Option<String>,

    /// Pre-issued access token
    #[arg(long)]
    pub access_token: Option<String>,

    /// Cloud Manager base URL
    #[arg(long)]
    pub url: Option<String>,

    /// Token endpoint for the refresh token exchange
    #[arg(long)]
    pub auth_url: Option<String>,

    /// Tenant (account workspace) used for FSX lookups
    #[arg(long)]
    pub tenant_id: Option<String>,

    /// Store the token in the OS keyring instead of the config file
    #[cfg(feature = "secure-storage")]
    #[arg(long)]
    pub use_keyring: bool,
}

/// Parse `key=value`; the value may be empty
pub fn parse_key_value(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("invalid key=value pair: {}", s)),
    }
}
