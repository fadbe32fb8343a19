//! Arguments shared by working environment commands

use clap::{Args, Subcommand};

/// Selects a working environment by id or name
///
/// `--tenant-id` (or the profile's tenant) switches name lookups to FSX; an
/// `fs-` id always needs a tenant.
#[derive(Args, Debug, Clone)]
#[command(group(
    clap::ArgGroup::new("selector")
        .required(true)
        .args(["id", "name"])
))]
pub struct SelectorArgs {
    /// Working environment public id
    #[arg(long)]
    pub id: Option<String>,

    /// Working environment name
    #[arg(long)]
    pub name: Option<String>,

    /// Tenant (account workspace) for FSX working environments
    #[arg(long)]
    pub tenant_id: Option<String>,
}

/// Task commands
#[derive(Subcommand, Debug)]
pub enum TaskCommands {
    /// Wait for an asynchronous Cloud Manager task to finish
    Wait {
        /// Task id returned by a mutation
        task_id: String,

        /// Action name used in messages
        #[arg(long, default_value = "task")]
        action: String,

        /// Verb used in messages
        #[arg(long, default_value = "complete")]
        verb: String,

        /// Override the number of status checks after the first one
        #[arg(long)]
        retries: Option<u32>,

        /// Override the seconds between status checks
        #[arg(long)]
        interval: Option<u64>,
    },
}

/// Arguments for `license`
#[derive(Args, Debug)]
pub struct LicenseArgs {
    /// Working environment public id
    pub id: String,

    /// Instance type (e.g. m5.2xlarge)
    #[arg(long)]
    pub instance_type: String,

    /// License type (e.g. cot-premium-paygo)
    #[arg(long)]
    pub license_type: String,
}

/// Arguments for `upgrade`
#[derive(Args, Debug)]
pub struct UpgradeArgs {
    /// Working environment public id
    pub id: String,

    /// ONTAP version to upgrade to, as listed by the upgrade catalog
    pub version: String,
}
