//! Command line argument parsing and validation.

use crate::bundler::Platform;
use crate::metadata::{DEFAULT_MANIFEST, ManifestOverrides};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::str::FromStr;

/// Package a JVM application into a self-contained app and native installers
#[derive(Parser, Debug)]
#[command(
    name = "app_packager",
    version,
    about = "Package a JVM application into a self-contained app and native installers",
    long_about = "Builds a runnable jar, embeds a (reduced) Java runtime, creates the platform \
launcher and generates installers (deb/rpm, dmg/pkg, setup.exe).

Usage:
  app_packager package
  app_packager package --platform linux --no-installers
  app_packager validate -c path/to/packager.toml"
)]
pub struct Args {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,

    /// Manifest describing the application
    #[arg(short = 'c', long, global = true, default_value = DEFAULT_MANIFEST)]
    pub config: PathBuf,

    /// Show detailed progress
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build the app and its installers
    Package {
        /// Manifest overrides
        #[command(flatten)]
        overrides: OverrideArgs,

        /// Print the produced artifacts as JSON
        #[arg(long)]
        json: bool,
    },

    /// Load the manifest and check every configured path without building
    Validate(OverrideArgs),
}

impl Command {
    /// Command name for messages
    pub fn name(&self) -> &'static str {
        match self {
            Command::Package { .. } => "package",
            Command::Validate(_) => "validate",
        }
    }

    /// Manifest overrides given with the command
    pub fn overrides(&self) -> &OverrideArgs {
        match self {
            Command::Package { overrides, .. } | Command::Validate(overrides) => overrides,
        }
    }
}

/// Options that take precedence over `packager.toml`
#[derive(clap::Args, Debug, Clone, Default)]
pub struct OverrideArgs {
    /// Target platform: linux, mac, windows or auto
    #[arg(short, long, value_parser = Platform::from_str)]
    pub platform: Option<Platform>,

    /// Directory receiving the app folder and installers
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Application name
    #[arg(long)]
    pub name: Option<String>,

    /// Application version
    #[arg(long = "version", value_name = "VERSION", id = "app_version")]
    pub app_version: Option<String>,

    /// Embed a Java runtime in the app
    #[arg(long, value_name = "BOOL", action = clap::ArgAction::Set)]
    pub bundle_runtime: Option<bool>,

    /// Stop after creating the app
    #[arg(long)]
    pub no_installers: bool,
}

impl From<&OverrideArgs> for ManifestOverrides {
    fn from(args: &OverrideArgs) -> Self {
        Self {
            platform: args.platform,
            output_directory: args.output_dir.clone(),
            name: args.name.clone(),
            version: args.app_version.clone(),
            bundle_runtime: args.bundle_runtime,
            no_installers: args.no_installers,
        }
    }
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate arguments for consistency
    pub fn validate(&self) -> Result<(), String> {
        let overrides = self.command.overrides();
        if overrides.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err("--name must not be blank".to_string());
        }
        if overrides
            .app_version
            .as_deref()
            .is_some_and(|v| v.trim().is_empty())
        {
            return Err("--version must not be blank".to_string());
        }
        Ok(())
    }
}
