//! Top-level error types for app_packager.
//!
//! [`PackagerError`] wraps the pipeline's [`crate::bundler::Error`], manifest
//! loading failures and CLI misuse, and knows how to suggest a way out.

use crate::bundler::Error as BundlerError;
pub use crate::metadata::ManifestError;
use thiserror::Error;

/// Result type alias for app_packager operations
pub type Result<T> = std::result::Result<T, PackagerError>;

/// Main error type for all app_packager operations
#[derive(Error, Debug)]
pub enum PackagerError {
    /// Manifest loading errors
    #[error("Manifest error: {0}")]
    Manifest(#[from] ManifestError),

    /// Packaging pipeline errors
    #[error("Packaging error: {0}")]
    Bundler(#[from] BundlerError),

    /// CLI argument errors
    #[error("CLI error: {0}")]
    Cli(#[from] CliError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// CLI-specific errors
#[derive(Error, Debug)]
pub enum CliError {
    /// Invalid arguments provided
    #[error("Invalid arguments: {reason}")]
    InvalidArguments {
        /// Reason for the error
        reason: String,
    },

    /// Command execution failed
    #[error("Command execution failed: {command} - {reason}")]
    ExecutionFailed {
        /// Command that failed
        command: String,
        /// Reason for the error
        reason: String,
    },
}

impl PackagerError {
    /// Get actionable recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<String> {
        match self {
            PackagerError::Manifest(ManifestError::NotFound { path }) => vec![
                format!("Create {} with [project] and [packager] tables", path.display()),
                "Point to another manifest with --config <path>".to_string(),
            ],
            PackagerError::Manifest(ManifestError::MissingKey { table, key }) => {
                vec![format!("Add '{key}' to the {table} table")]
            }
            PackagerError::Manifest(ManifestError::Parse { .. }) => vec![
                "Check the manifest for typos in key names".to_string(),
                "Keys are snake_case, e.g. main_class, output_directory".to_string(),
            ],
            PackagerError::Bundler(error) => bundler_suggestions(error.root_cause()),
            _ => vec!["Check the error message above for specific details".to_string()],
        }
    }
}

fn bundler_suggestions(error: &BundlerError) -> Vec<String> {
    match error {
        BundlerError::ToolNotFound { tool, .. } => vec![
            format!("Install {tool} and make sure it is on PATH"),
            "For jdeps and jlink, set JAVA_HOME or [packager.runtime] jdk_path".to_string(),
        ],
        BundlerError::ExternalTool { tool, .. } => vec![
            format!("Re-run with RUST_LOG=debug to see the full {tool} invocation"),
        ],
        BundlerError::Validation(_) => vec![
            "Fix the configured paths in packager.toml".to_string(),
            "Run `app_packager validate` to check the configuration without building".to_string(),
        ],
        _ => vec!["Check the error message above for specific details".to_string()],
    }
}
