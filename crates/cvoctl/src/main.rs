use clap::Parser;
use cvoctl_core::Config;
use tracing::{debug, error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod commands;
mod connection;
mod error;
mod output;

use cli::{Cli, Commands};
use connection::ConnectionManager;
use error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    if let Err(e) = run(&cli).await {
        e.print_diagnostic();
        std::process::exit(1);
    }
}

async fn run(cli: &Cli) -> Result<(), CliError> {
    // Load configuration from specified path or default location
    let (config, config_path) = if let Some(config_file) = &cli.config_file {
        let path = std::path::PathBuf::from(config_file);
        debug!("Loading config from explicit path: {:?}", path);
        (Config::load_from_path(&path)?, Some(path))
    } else {
        debug!("Loading config from default location");
        (Config::load()?, None)
    };
    let mut conn_mgr = ConnectionManager::with_config_path(config, config_path);

    execute_command(cli, &mut conn_mgr).await
}

fn init_tracing(verbose: u8) {
    // Check for RUST_LOG env var first, then fall back to verbosity flag
    let filter = if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::EnvFilter::from_default_env()
    } else {
        let level = match verbose {
            0 => "cvoctl=warn,cvoctl_core=warn",
            1 => "cvoctl=info,cvoctl_core=info",
            2 => "cvoctl=debug,cvoctl_core=debug",
            _ => "cvoctl=trace,cvoctl_core=trace",
        };
        tracing_subscriber::EnvFilter::new(level)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false)
                .with_thread_names(false)
                .compact(),
        )
        .init();

    debug!("Tracing initialized with verbosity level: {}", verbose);
}

async fn execute_command(cli: &Cli, conn_mgr: &mut ConnectionManager) -> Result<(), CliError> {
    info!("Command: {}", format_command(&cli.command));

    let profile = cli.profile.as_deref();
    let output = cli.output;

    let start = std::time::Instant::now();
    let result = match &cli.command {
        Commands::List => commands::cvo::handle_list(conn_mgr, profile, output).await,
        Commands::Resolve(args) => {
            commands::cvo::handle_resolve(conn_mgr, profile, args, output).await
        }
        Commands::ApiRoot { id } => {
            commands::cvo::handle_api_root(conn_mgr, profile, id, output).await
        }
        Commands::Properties { id, fields } => {
            commands::cvo::handle_properties(conn_mgr, profile, id, fields, output).await
        }
        Commands::Task(task_cmd) => {
            commands::cvo::handle_task_command(conn_mgr, profile, task_cmd, output).await
        }
        Commands::Tags { id, tags } => {
            commands::cvo::handle_tags(conn_mgr, profile, id, tags, output).await
        }
        Commands::Labels { id, labels } => {
            commands::cvo::handle_labels(conn_mgr, profile, id, labels, output).await
        }
        Commands::Password { id, password } => {
            commands::cvo::handle_password(conn_mgr, profile, id, password.as_deref(), output)
                .await
        }
        Commands::Tier { id, level } => {
            commands::cvo::handle_tier(conn_mgr, profile, id, level, output).await
        }
        Commands::License(args) => {
            commands::cvo::handle_license(conn_mgr, profile, args, output).await
        }
        Commands::Upgrade(args) => {
            commands::cvo::handle_upgrade(conn_mgr, profile, args, output).await
        }
        Commands::Profile(profile_cmd) => {
            debug!("Executing profile command");
            commands::profile::handle_profile_command(profile_cmd, conn_mgr, output).await
        }
    };

    let duration = start.elapsed();
    match &result {
        Ok(_) => info!("Command completed successfully in {:?}", duration),
        Err(e) => error!("Command failed after {:?}: {}", duration, e),
    }

    result
}

/// Format command for human-readable logging (without sensitive data)
fn format_command(command: &Commands) -> String {
    match command {
        Commands::List => "list".to_string(),
        Commands::Resolve(args) => format!(
            "resolve id={:?} name={:?} tenant={:?}",
            args.id, args.name, args.tenant_id
        ),
        Commands::ApiRoot { id } => format!("api-root {}", id),
        Commands::Properties { id, fields } => {
            format!("properties {} fields={}", id, fields.join(","))
        }
        Commands::Task(cli::TaskCommands::Wait { task_id, .. }) => {
            format!("task wait {}", task_id)
        }
        Commands::Tags { id, tags } => format!("tags {} ({} tags)", id, tags.len()),
        Commands::Labels { id, labels } => format!("labels {} ({} labels)", id, labels.len()),
        Commands::Password { id, .. } => format!("password {} [password redacted]", id),
        Commands::Tier { id, level } => format!("tier {} {}", id, level),
        Commands::License(args) => format!(
            "license {} instance_type={} license_type={}",
            args.id, args.instance_type, args.license_type
        ),
        Commands::Upgrade(args) => format!("upgrade {} {}", args.id, args.version),
        Commands::Profile(cmd) => {
            use cli::ProfileCommands::*;
            match cmd {
                List => "profile list".to_string(),
                Path => "profile path".to_string(),
                Show { name } => format!("profile show {}", name),
                Set(args) => format!("profile set {} [credentials redacted]", args.name),
                Remove { name } => format!("profile remove {}", name),
                Default { name } => format!("profile default {}", name),
            }
        }
    }
}
