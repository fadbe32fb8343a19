//! Error types for cvoctl
//!
//! Every command returns [`CliError`]; `main` renders it once as a
//! cargo-style diagnostic with suggestions.

use colored::Colorize;
use cvoctl_core::{ConfigError, CoreError};
use thiserror::Error;

/// Cargo-style diagnostic formatter for CLI errors.
///
/// Produces structured output like:
/// ```text
/// error: Profile 'prod' not found
///
///   tip: List available profiles: cvoctl profile list
/// ```
pub struct CliDiagnostic {
    message: String,
    tips: Vec<String>,
}

impl CliDiagnostic {
    pub fn error(message: &str) -> Self {
        Self {
            message: message.to_string(),
            tips: Vec::new(),
        }
    }

    pub fn tip(mut self, description: &str) -> Self {
        self.tips.push(description.to_string());
        self
    }

    /// Print the diagnostic to stderr with colored formatting.
    pub fn print(&self) {
        eprint!("{}{}", "error".red().bold(), ": ".bold());
        eprintln!("{}", self.message);

        for tip in &self.tips {
            eprintln!();
            eprint!("  {}{}", "tip".yellow().bold(), ": ".bold());
            eprintln!("{}", tip);
        }
    }
}

/// Main error type for the cvoctl application
#[derive(Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Core(#[from] CoreError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Output formatting error: {message}")]
    OutputError { message: String },

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// Result type for cvoctl commands
pub type Result<T> = std::result::Result<T, CliError>;

impl CliError {
    /// Get helpful suggestions for resolving this error
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            CliError::Config(ConfigError::ProfileNotFound { name }) => vec![
                "List available profiles: cvoctl profile list".to_string(),
                format!(
                    "Create profile '{}': cvoctl profile set {} --client-id <id> --refresh-token <token>",
                    name, name
                ),
            ],
            CliError::Config(ConfigError::NoProfiles) => vec![
                "Create a profile: cvoctl profile set <name> --client-id <id> --refresh-token <token>"
                    .to_string(),
                "View profile documentation: cvoctl profile --help".to_string(),
            ],
            CliError::Config(ConfigError::MissingToken { name }) => vec![
                format!("Add a token: cvoctl profile set {} --refresh-token <token>", name),
                "Or export CVOCTL_REFRESH_TOKEN / CVOCTL_ACCESS_TOKEN".to_string(),
            ],
            CliError::Core(err) if err.is_unauthorized() => vec![
                "Check the profile token: cvoctl profile show <profile>".to_string(),
                "Refresh tokens expire; issue a new one from the Cloud Manager console".to_string(),
            ],
            CliError::Core(err) if err.is_not_found() => vec![
                "List working environments: cvoctl list".to_string(),
                "FSX working environments need --tenant-id".to_string(),
            ],
            CliError::Core(err) if err.is_timeout() => vec![
                "The operation may still be running; check the Cloud Manager timeline".to_string(),
                "Raise completion_retries in the profile's [polling] section".to_string(),
            ],
            CliError::Core(err) if matches!(err.root(), CoreError::Transport(_)) => vec![
                "Check network connectivity to the Cloud Manager URL".to_string(),
                "Verify the URL: cvoctl profile show <profile>".to_string(),
            ],
            CliError::InvalidInput { .. } => {
                vec!["Check the command syntax: cvoctl <command> --help".to_string()]
            }
            _ => vec![],
        }
    }

    /// Print a cargo-style diagnostic to stderr using colored formatting.
    pub fn print_diagnostic(&self) {
        let mut diag = CliDiagnostic::error(&self.to_string());
        for suggestion in self.suggestions() {
            diag = diag.tip(&suggestion);
        }
        diag.print();
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        CliError::OutputError {
            message: format!("JSON error: {}", err),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::OutputError {
            message: format!("IO error: {}", err),
        }
    }
}
