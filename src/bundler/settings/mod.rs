//! Configuration structures for packaging operations.
//!
//! [`Settings`] is produced once by [`SettingsBuilder`] and never mutated
//! afterwards. Every stage of the pipeline reads from the same value.

mod builder;
mod platform;
mod runtime;

pub use builder::SettingsBuilder;
pub use platform::{LinuxSettings, MacOsSettings, PlatformSettings, WindowsSettings};
pub use runtime::{ModuleSpec, RuntimeSettings};

use crate::bundler::platform::Platform;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Organization publishing the application.
#[derive(Debug, Clone, Default)]
pub struct Organization {
    /// Display name, also used as the RPM packager and DEB maintainer.
    pub name: String,
    /// Homepage of the organization.
    pub url: Option<String>,
    /// Contact address.
    pub email: Option<String>,
}

/// Package identity and descriptive metadata.
///
/// # Examples
///
/// ```no_run
/// use app_packager::bundler::PackageSettings;
///
/// let settings = PackageSettings {
///     name: "demo".into(),
///     version: "1.0".into(),
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone, Default)]
pub struct PackageSettings {
    /// Application name. Used for the app folder, executable and installer names.
    pub name: String,
    /// Human-readable name. Defaults to `name`.
    pub display_name: String,
    /// Version string, e.g. `1.0.0`.
    pub version: String,
    /// One-line description. Defaults to the display name.
    pub description: String,
    /// Project homepage.
    pub url: Option<String>,
    /// Publisher.
    pub organization: Organization,
    /// License file shipped with installers.
    pub license_file: Option<PathBuf>,
}

/// Maintainer scripts and the optional launcher bootstrap.
#[derive(Debug, Clone, Default)]
pub struct Scripts {
    /// Shell fragment inlined into the launcher before the JVM starts.
    pub bootstrap: Option<PathBuf>,
    /// Runs before installation.
    pub pre_install: Option<PathBuf>,
    /// Runs after installation.
    pub post_install: Option<PathBuf>,
    /// Runs before removal.
    pub pre_remove: Option<PathBuf>,
    /// Runs after removal.
    pub post_remove: Option<PathBuf>,
}

impl Scripts {
    /// Every configured script path.
    pub fn all(&self) -> impl Iterator<Item = &PathBuf> {
        [
            &self.bootstrap,
            &self.pre_install,
            &self.post_install,
            &self.pre_remove,
            &self.post_remove,
        ]
        .into_iter()
        .flatten()
    }

    /// Maintainer scripts paired with their Debian control file names.
    pub fn maintainer_scripts(&self) -> impl Iterator<Item = (&'static str, &PathBuf)> {
        [
            ("preinst", &self.pre_install),
            ("postinst", &self.post_install),
            ("prerm", &self.pre_remove),
            ("postrm", &self.post_remove),
        ]
        .into_iter()
        .filter_map(|(name, path)| path.as_ref().map(|p| (name, p)))
    }
}

/// A file type the application opens.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct FileAssociation {
    /// MIME type, e.g. `application/x-demo`.
    pub mime_type: String,
    /// Extension without the leading dot.
    pub extension: String,
    /// Human-readable description.
    pub description: String,
}

/// Complete, validated packaging configuration.
#[derive(Debug, Clone)]
pub struct Settings {
    pub(crate) package: PackageSettings,
    pub(crate) main_class: String,
    pub(crate) icon_file: Option<PathBuf>,
    pub(crate) output_directory: PathBuf,
    pub(crate) assets_directory: Option<PathBuf>,
    pub(crate) runtime: RuntimeSettings,
    pub(crate) additional_resources: Vec<PathBuf>,
    pub(crate) vm_args: Vec<String>,
    pub(crate) runnable_archive: Option<PathBuf>,
    pub(crate) classes_directory: Option<PathBuf>,
    pub(crate) dependencies: Vec<PathBuf>,
    pub(crate) copy_dependencies: bool,
    pub(crate) classpath: Option<String>,
    pub(crate) manifest_entries: BTreeMap<String, String>,
    pub(crate) extra: BTreeMap<String, String>,
    pub(crate) file_associations: Vec<FileAssociation>,
    pub(crate) scripts: Scripts,
    pub(crate) administrator_required: bool,
    pub(crate) use_resources_as_working_dir: bool,
    pub(crate) generate_installers: bool,
    pub(crate) create_tarball: bool,
    pub(crate) create_zipball: bool,
    pub(crate) platform: PlatformSettings,
}

impl Settings {
    /// Application name.
    pub fn name(&self) -> &str {
        &self.package.name
    }

    /// Human-readable name.
    pub fn display_name(&self) -> &str {
        &self.package.display_name
    }

    /// Version string.
    pub fn version(&self) -> &str {
        &self.package.version
    }

    /// Package metadata.
    pub fn package(&self) -> &PackageSettings {
        &self.package
    }

    /// Fully qualified main class.
    pub fn main_class(&self) -> &str {
        &self.main_class
    }

    /// Configured icon, if any.
    pub fn icon_file(&self) -> Option<&Path> {
        self.icon_file.as_deref()
    }

    /// Directory receiving the app folder, assets and installers.
    pub fn output_directory(&self) -> &Path {
        &self.output_directory
    }

    /// Directory holding user template overrides and default icons.
    pub fn assets_directory(&self) -> Option<&Path> {
        self.assets_directory.as_deref()
    }

    /// Runtime bundling options.
    pub fn runtime(&self) -> &RuntimeSettings {
        &self.runtime
    }

    /// Extra files and folders copied into the resources folder, in order.
    pub fn additional_resources(&self) -> &[PathBuf] {
        &self.additional_resources
    }

    /// JVM options passed by the launcher, in order.
    pub fn vm_args(&self) -> &[String] {
        &self.vm_args
    }

    /// Prebuilt runnable jar.
    pub fn runnable_archive(&self) -> Option<&Path> {
        self.runnable_archive.as_deref()
    }

    /// Compiled classes used to assemble the runnable jar.
    pub fn classes_directory(&self) -> Option<&Path> {
        self.classes_directory.as_deref()
    }

    /// Dependency jars, in order.
    pub fn dependencies(&self) -> &[PathBuf] {
        &self.dependencies
    }

    /// Whether dependency jars are copied into `libs`.
    pub fn copy_dependencies(&self) -> bool {
        self.copy_dependencies
    }

    /// Extra `Class-Path` entries, space separated.
    pub fn classpath(&self) -> Option<&str> {
        self.classpath.as_deref()
    }

    /// Custom jar manifest entries.
    pub fn manifest_entries(&self) -> &BTreeMap<String, String> {
        &self.manifest_entries
    }

    /// Free-form template variables.
    pub fn extra(&self) -> &BTreeMap<String, String> {
        &self.extra
    }

    /// File types the application opens.
    pub fn file_associations(&self) -> &[FileAssociation] {
        &self.file_associations
    }

    /// Bootstrap and maintainer scripts.
    pub fn scripts(&self) -> &Scripts {
        &self.scripts
    }

    /// Whether the launcher or installer requests elevation.
    pub fn administrator_required(&self) -> bool {
        self.administrator_required
    }

    /// Whether the launcher changes directory to the resources folder.
    pub fn use_resources_as_working_dir(&self) -> bool {
        self.use_resources_as_working_dir
    }

    /// Whether installers are generated after the app is created.
    pub fn generate_installers(&self) -> bool {
        self.generate_installers
    }

    /// Whether a `.tar.gz` of the app folder is produced.
    pub fn create_tarball(&self) -> bool {
        self.create_tarball
    }

    /// Whether a `.zip` of the app folder is produced.
    pub fn create_zipball(&self) -> bool {
        self.create_zipball
    }

    /// Platform-specific options.
    pub fn platform_settings(&self) -> &PlatformSettings {
        &self.platform
    }

    /// Target platform.
    pub fn platform(&self) -> Platform {
        self.platform.platform()
    }

    /// Installer base name, `{name}_{version}`.
    pub fn installer_base_name(&self) -> String {
        format!("{}_{}", self.package.name, self.package.version)
    }

    /// License name used in package metadata: the license file name or `Unknown`.
    pub fn license_name(&self) -> String {
        self.package
            .license_file
            .as_ref()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "Unknown".to_string())
    }
}
