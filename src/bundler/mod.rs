//! Packaging pipeline turning a compiled Java application into native apps
//! and installers.
//!
//! This module assembles a self-contained app folder (launcher, runnable jar,
//! dependencies, resources and an optional embedded runtime) and drives the
//! external tools that turn it into installers.
//!
//! # Supported Formats
//!
//! | Platform | Launcher | Installers |
//! |----------|----------|------------|
//! | Linux | startup script + jar in one file | .deb, .rpm |
//! | macOS | `.app` bundle | .dmg, .pkg |
//! | Windows | launch4j `.exe` | Inno Setup setup `.exe` |
//!
//! Every platform can additionally produce a `.tar.gz` and a `.zip` of the
//! app folder.
//!
//! # Integration
//!
//! ```no_run
//! use app_packager::bundler::{Packager, PackageSettings, SettingsBuilder};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = SettingsBuilder::new()
//!     .package_settings(PackageSettings {
//!         name: "demo".into(),
//!         version: "1.0".into(),
//!         ..Default::default()
//!     })
//!     .main_class("com.example.Main")
//!     .runnable_archive(Some("target/demo.jar".into()))
//!     .output_directory("target/package")
//!     .build()?;
//!
//! let artifacts = Packager::new(settings)?.create_app().await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod archive;
mod builder;
pub mod context;
pub mod error;
pub mod platform;
pub mod resources;
pub mod runtime;
mod settings;
pub mod state;
pub mod structure;
pub mod template;
pub mod tool;
pub(crate) mod utils;

// Public re-exports
pub use builder::{Packager, calculate_sha256, validate};
pub use context::{AppBundle, AppLayout, PackagerContext};
pub use error::{Context, Error, ErrorExt, Result};
pub use platform::{PackageType, Platform, PlatformPackager, create_packager};
pub use settings::{
    FileAssociation, LinuxSettings, MacOsSettings, ModuleSpec, Organization, PackageSettings,
    PlatformSettings, RuntimeSettings, Scripts, Settings, SettingsBuilder, WindowsSettings,
};
pub use state::{PackagerPhase, PackagerState};
pub use template::{TemplateContext, TemplateRenderer};

/// An installer or bundle produced by a packaging run.
///
/// # Examples
///
/// ```no_run
/// use app_packager::bundler::{Packager, Settings};
///
/// # async fn example(settings: Settings) -> app_packager::bundler::Result<()> {
/// for artifact in Packager::new(settings)?.create_app().await? {
///     println!("{}: {} ({} bytes)", artifact.package_type, artifact.path.display(), artifact.size);
///     println!("SHA256: {}", artifact.sha256);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, serde::Serialize)]
pub struct InstallerArtifact {
    /// Format of the artifact.
    pub package_type: PackageType,

    /// Location, `{output}/{name}_{version}.{ext}`.
    pub path: std::path::PathBuf,

    /// Size in bytes.
    pub size: u64,

    /// Hex-encoded SHA-256 checksum, for publishing alongside the artifact.
    pub sha256: String,
}
