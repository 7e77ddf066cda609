//! Staged builder producing immutable [`Settings`].

use super::{
    FileAssociation, PackageSettings, PlatformSettings, RuntimeSettings, Scripts, Settings,
};
use crate::bundler::error::{Context, Error, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Version used when neither the packager nor the project declares one.
pub const DEFAULT_VERSION: &str = "1.0.0";

/// Builder for [`Settings`].
///
/// # Examples
///
/// ```no_run
/// use app_packager::bundler::{PackageSettings, SettingsBuilder};
///
/// let settings = SettingsBuilder::new()
///     .package_settings(PackageSettings {
///         name: "demo".into(),
///         version: "1.0".into(),
///         ..Default::default()
///     })
///     .main_class("com.example.Main")
///     .output_directory("target")
///     .build()?;
/// # Ok::<(), app_packager::bundler::Error>(())
/// ```
#[derive(Debug, Default)]
pub struct SettingsBuilder {
    package: Option<PackageSettings>,
    main_class: Option<String>,
    icon_file: Option<PathBuf>,
    output_directory: Option<PathBuf>,
    assets_directory: Option<PathBuf>,
    runtime: RuntimeSettings,
    additional_resources: Vec<PathBuf>,
    vm_args: Vec<String>,
    runnable_archive: Option<PathBuf>,
    classes_directory: Option<PathBuf>,
    dependencies: Vec<PathBuf>,
    copy_dependencies: Option<bool>,
    classpath: Option<String>,
    manifest_entries: BTreeMap<String, String>,
    extra: BTreeMap<String, String>,
    file_associations: Vec<FileAssociation>,
    scripts: Scripts,
    administrator_required: bool,
    use_resources_as_working_dir: Option<bool>,
    generate_installers: Option<bool>,
    create_tarball: bool,
    create_zipball: bool,
    platform: Option<PlatformSettings>,
}

impl SettingsBuilder {
    /// Creates a new settings builder.
    pub fn new() -> Self {
        Default::default()
    }

    /// Sets package metadata.
    ///
    /// # Required
    ///
    /// This field is required for building.
    pub fn package_settings(mut self, settings: PackageSettings) -> Self {
        self.package = Some(settings);
        self
    }

    /// Sets the main class.
    ///
    /// # Required
    ///
    /// This field is required for building.
    pub fn main_class(mut self, main_class: impl Into<String>) -> Self {
        self.main_class = Some(main_class.into());
        self
    }

    /// Sets the application icon.
    pub fn icon_file(mut self, path: Option<PathBuf>) -> Self {
        self.icon_file = path;
        self
    }

    /// Sets the output directory.
    ///
    /// # Required
    ///
    /// This field is required for building.
    pub fn output_directory<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.output_directory = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets the assets directory used for template overrides and default icons.
    pub fn assets_directory(mut self, path: Option<PathBuf>) -> Self {
        self.assets_directory = path;
        self
    }

    /// Sets runtime bundling options.
    ///
    /// Default: bundle and customize a `jre` folder.
    pub fn runtime(mut self, runtime: RuntimeSettings) -> Self {
        self.runtime = runtime;
        self
    }

    /// Sets extra resources, copied in order.
    pub fn additional_resources(mut self, resources: Vec<PathBuf>) -> Self {
        self.additional_resources = resources;
        self
    }

    /// Sets JVM options.
    pub fn vm_args(mut self, args: Vec<String>) -> Self {
        self.vm_args = args;
        self
    }

    /// Sets a prebuilt runnable jar.
    pub fn runnable_archive(mut self, path: Option<PathBuf>) -> Self {
        self.runnable_archive = path;
        self
    }

    /// Sets the compiled classes directory.
    pub fn classes_directory(mut self, path: Option<PathBuf>) -> Self {
        self.classes_directory = path;
        self
    }

    /// Sets dependency jars.
    pub fn dependencies(mut self, deps: Vec<PathBuf>) -> Self {
        self.dependencies = deps;
        self
    }

    /// Sets whether dependencies are copied into `libs`.
    ///
    /// Default: true
    pub fn copy_dependencies(mut self, copy: bool) -> Self {
        self.copy_dependencies = Some(copy);
        self
    }

    /// Sets extra `Class-Path` entries.
    pub fn classpath(mut self, classpath: Option<String>) -> Self {
        self.classpath = classpath;
        self
    }

    /// Sets custom jar manifest entries.
    pub fn manifest_entries(mut self, entries: BTreeMap<String, String>) -> Self {
        self.manifest_entries = entries;
        self
    }

    /// Sets free-form template variables.
    pub fn extra(mut self, extra: BTreeMap<String, String>) -> Self {
        self.extra = extra;
        self
    }

    /// Sets file associations.
    pub fn file_associations(mut self, associations: Vec<FileAssociation>) -> Self {
        self.file_associations = associations;
        self
    }

    /// Sets bootstrap and maintainer scripts.
    pub fn scripts(mut self, scripts: Scripts) -> Self {
        self.scripts = scripts;
        self
    }

    /// Sets whether elevation is requested.
    pub fn administrator_required(mut self, required: bool) -> Self {
        self.administrator_required = required;
        self
    }

    /// Sets whether the launcher runs from the resources folder.
    ///
    /// Default: true
    pub fn use_resources_as_working_dir(mut self, value: bool) -> Self {
        self.use_resources_as_working_dir = Some(value);
        self
    }

    /// Sets whether installers are generated.
    ///
    /// Default: true
    pub fn generate_installers(mut self, value: bool) -> Self {
        self.generate_installers = Some(value);
        self
    }

    /// Sets whether a tarball of the app folder is produced.
    pub fn create_tarball(mut self, value: bool) -> Self {
        self.create_tarball = value;
        self
    }

    /// Sets whether a zipball of the app folder is produced.
    pub fn create_zipball(mut self, value: bool) -> Self {
        self.create_zipball = value;
        self
    }

    /// Sets the target platform options.
    ///
    /// Default: the host platform's defaults.
    pub fn platform(mut self, platform: PlatformSettings) -> Self {
        self.platform = Some(platform);
        self
    }

    /// Builds the settings.
    ///
    /// # Errors
    ///
    /// Returns an error if required fields are missing:
    /// - `package_settings` (with a non-blank name)
    /// - `main_class` (non-blank)
    /// - `output_directory`
    pub fn build(self) -> Result<Settings> {
        let mut package = self.package.context("package_settings is required")?;

        package.name = package.name.trim().to_string();
        if package.name.is_empty() {
            return Err(Error::Validation("name must not be blank".into()));
        }
        let main_class = self.main_class.unwrap_or_default().trim().to_string();
        if main_class.is_empty() {
            return Err(Error::Validation("main_class must not be blank".into()));
        }
        let output_directory = self
            .output_directory
            .context("output_directory is required")?;

        if package.version.trim().is_empty() {
            package.version = DEFAULT_VERSION.to_string();
        }
        if package.display_name.trim().is_empty() {
            package.display_name = package.name.clone();
        }
        if package.description.trim().is_empty() {
            package.description = package.display_name.clone();
        }
        if package.organization.name.trim().is_empty() {
            package.organization.name = "ACME".to_string();
        }

        let mut runtime = self.runtime;
        if runtime.directory_name.trim().is_empty() {
            runtime.directory_name = RuntimeSettings::default().directory_name;
        }

        Ok(Settings {
            package,
            main_class,
            icon_file: self.icon_file,
            output_directory,
            assets_directory: self.assets_directory,
            runtime,
            additional_resources: self.additional_resources,
            vm_args: self.vm_args,
            runnable_archive: self.runnable_archive,
            classes_directory: self.classes_directory,
            dependencies: self.dependencies,
            copy_dependencies: self.copy_dependencies.unwrap_or(true),
            classpath: self.classpath,
            manifest_entries: self.manifest_entries,
            extra: self.extra,
            file_associations: self.file_associations,
            scripts: self.scripts,
            administrator_required: self.administrator_required,
            use_resources_as_working_dir: self.use_resources_as_working_dir.unwrap_or(true),
            generate_installers: self.generate_installers.unwrap_or(true),
            create_tarball: self.create_tarball,
            create_zipball: self.create_zipball,
            platform: self.platform.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn package(name: &str, version: &str) -> PackageSettings {
        PackageSettings {
            name: name.into(),
            version: version.into(),
            ..Default::default()
        }
    }

    #[test]
    fn defaults_are_resolved() {
        let settings = SettingsBuilder::new()
            .package_settings(package("demo", ""))
            .main_class("com.example.Main")
            .output_directory("/tmp/out")
            .build()
            .unwrap();

        assert_eq!(settings.version(), DEFAULT_VERSION);
        assert_eq!(settings.display_name(), "demo");
        assert_eq!(settings.package().description, "demo");
        assert_eq!(settings.runtime().directory_name, "jre");
        assert!(settings.copy_dependencies());
        assert!(settings.use_resources_as_working_dir());
        assert!(settings.generate_installers());
        assert_eq!(settings.installer_base_name(), "demo_1.0.0");
        assert_eq!(settings.license_name(), "Unknown");
    }

    #[test]
    fn blank_name_is_rejected() {
        let err = SettingsBuilder::new()
            .package_settings(package("  ", "1.0"))
            .main_class("com.example.Main")
            .output_directory("/tmp/out")
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn blank_main_class_is_rejected() {
        let err = SettingsBuilder::new()
            .package_settings(package("demo", "1.0"))
            .main_class("")
            .output_directory("/tmp/out")
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }
}
