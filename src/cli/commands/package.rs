//! Package command implementation.

use super::load_settings;
use crate::bundler::Packager;
use crate::cli::{Args, OutputManager};
use crate::error::Result;

/// Execute package command
pub(super) async fn execute_package(args: &Args, json: bool, output: &OutputManager) -> Result<()> {
    let settings = load_settings(args, output)?;
    output.section(&format!(
        "Packaging {} {} for {}",
        settings.name(),
        settings.version(),
        settings.platform()
    ));
    output.verbose(&format!("Output: {}", settings.output_directory().display()));

    let mut packager = Packager::new(settings)?;
    let result = packager.create_app().await;

    for record in packager.history() {
        match &record.note {
            Some(note) => output.verbose(&format!("{}: {}", record.phase, note)),
            None => output.verbose(&record.phase.to_string()),
        }
    }
    let artifacts = result?;

    if json {
        println!("{}", serde_json::to_string_pretty(&artifacts)?);
        return Ok(());
    }

    if let Some(bundle) = packager.bundle() {
        output.success(&format!("App created: {}", bundle.executable.display()));
    }
    if artifacts.is_empty() {
        output.info("No installers generated");
    }
    for artifact in &artifacts {
        output.success(&format!(
            "{} {} ({} bytes)",
            artifact.package_type,
            artifact.path.display(),
            artifact.size
        ));
        output.indent(&format!("sha256 {}", artifact.sha256));
    }
    Ok(())
}
