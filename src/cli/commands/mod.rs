//! Command execution.

mod package;
mod validate;

use crate::cli::{Args, Command, OutputManager};
use crate::error::Result;
use crate::metadata::{ManifestOverrides, load_manifest};
use crate::bundler::Settings;

use package::execute_package;
use validate::execute_validate;

/// Execute the command selected on the command line, returning the exit code
pub async fn execute_command(args: Args) -> Result<i32> {
    let output = OutputManager::new(args.verbose, args.quiet);

    if let Err(validation_error) = args.validate() {
        output.error(&format!("Invalid arguments: {}", validation_error));
        return Ok(1);
    }

    let result = match &args.command {
        Command::Package { json, .. } => execute_package(&args, *json, &output).await,
        Command::Validate(_) => execute_validate(&args, &output).await,
    };

    match result {
        Ok(()) => Ok(0),
        Err(e) => {
            output.error(&format!("Command '{}' failed: {}", args.command.name(), e));
            let suggestions = e.recovery_suggestions();
            if !suggestions.is_empty() {
                output.println("\n💡 Recovery suggestions:");
                for suggestion in suggestions {
                    output.indent(&format!("• {}", suggestion));
                }
            }
            Ok(1)
        }
    }
}

/// Load the manifest named by `--config` and apply the command's overrides
fn load_settings(args: &Args, output: &OutputManager) -> Result<Settings> {
    output.verbose(&format!("Reading {}", args.config.display()));
    let loaded = load_manifest(&args.config)?;
    loaded.to_settings(&ManifestOverrides::from(args.command.overrides()))
}
