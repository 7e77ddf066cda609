//! Validate command implementation.
//!
//! Loads the manifest and checks every configured path without building.

use super::load_settings;
use crate::bundler;
use crate::cli::{Args, OutputManager};
use crate::error::Result;

/// Execute validate command
pub(super) async fn execute_validate(args: &Args, output: &OutputManager) -> Result<()> {
    let settings = load_settings(args, output)?;
    bundler::validate(&settings)?;

    output.success(&format!(
        "{} {} is ready to package for {}",
        settings.name(),
        settings.version(),
        settings.platform()
    ));
    let runtime = settings.runtime();
    if runtime.bundle {
        output.indent(&format!("runtime folder: {}", runtime.directory_name));
    } else {
        output.indent("runtime: system java");
    }
    if !settings.generate_installers() {
        output.indent("installers: skipped");
    }
    Ok(())
}
