//! `packager.toml` loading.
//!
//! The manifest has two tables. `[project]` carries the host project's
//! identity and supplies defaults; `[packager]` carries packaging options.
//! Relative paths resolve against the manifest's directory.
//!
//! ```toml
//! [project]
//! name = "demo"
//! version = "1.0"
//!
//! [packager]
//! main_class = "com.example.Main"
//! classes_directory = "target/classes"
//!
//! [packager.runtime]
//! modules = ["java.base"]
//! ```

use crate::bundler::{
    FileAssociation, LinuxSettings, MacOsSettings, ModuleSpec, Organization, PackageSettings,
    Platform, PlatformSettings, RuntimeSettings, Scripts, Settings, SettingsBuilder,
    WindowsSettings,
};
use crate::error::Result;
use path_absolutize::Absolutize;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Manifest file name looked up by default.
pub const DEFAULT_MANIFEST: &str = "packager.toml";

/// Output directory used when none is configured.
pub const DEFAULT_OUTPUT_DIR: &str = "target/package";

/// Manifest loading errors
#[derive(Error, Debug)]
pub enum ManifestError {
    /// Manifest file missing
    #[error("Manifest not found at {path}")]
    NotFound {
        /// Expected location
        path: PathBuf,
    },

    /// Manifest could not be read
    #[error("Failed to read {path}: {source}")]
    Read {
        /// Manifest path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Manifest is not valid TOML or has unexpected keys
    #[error("Failed to parse {path}: {source}")]
    Parse {
        /// Manifest path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: toml::de::Error,
    },

    /// A required key is absent
    #[error("Missing '{key}' in {table}")]
    MissingKey {
        /// Table name
        table: &'static str,
        /// Key name
        key: &'static str,
    },

    /// Unrecognized platform value
    #[error("{0}")]
    InvalidPlatform(String),

    /// Path could not be made absolute
    #[error("Invalid path {path}: {source}")]
    InvalidPath {
        /// Offending path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}

/// Host project metadata.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectTable {
    /// Project name
    pub name: Option<String>,
    /// Project version
    pub version: Option<String>,
    /// Project description
    pub description: Option<String>,
    /// Project homepage
    pub url: Option<String>,
    /// Publisher
    pub organization: Option<OrganizationTable>,
}

/// `[project.organization]`
#[allow(missing_docs)]
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OrganizationTable {
    pub name: Option<String>,
    pub url: Option<String>,
    pub email: Option<String>,
}

/// `[packager.runtime]`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuntimeTable {
    /// Embed a runtime
    pub bundle: Option<bool>,
    /// Reduce the runtime with jlink
    pub customize: Option<bool>,
    /// Prebuilt runtime to copy
    pub runtime_path: Option<PathBuf>,
    /// JDK home
    pub jdk_path: Option<PathBuf>,
    /// Runtime folder name
    pub directory_name: Option<String>,
    /// Explicit module list
    pub modules: Vec<String>,
    /// Modules always added
    pub additional_modules: Vec<String>,
    /// Extra jlink module paths
    pub additional_module_paths: Vec<PathBuf>,
}

/// `[packager.scripts]`
#[allow(missing_docs)]
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScriptsTable {
    pub bootstrap: Option<PathBuf>,
    pub pre_install: Option<PathBuf>,
    pub post_install: Option<PathBuf>,
    pub pre_remove: Option<PathBuf>,
    pub post_remove: Option<PathBuf>,
}

/// `[[packager.file_associations]]`
#[allow(missing_docs)]
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileAssociationTable {
    pub mime_type: String,
    pub extension: String,
    #[serde(default)]
    pub description: String,
}

/// `[packager.linux]`
#[allow(missing_docs)]
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LinuxTable {
    pub generate_deb: Option<bool>,
    pub generate_rpm: Option<bool>,
    pub categories: Option<String>,
}

/// `[packager.mac]`
#[allow(missing_docs)]
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MacTable {
    pub generate_dmg: Option<bool>,
    pub generate_pkg: Option<bool>,
    pub bundle_identifier: Option<String>,
}

/// `[packager.windows]`
#[allow(missing_docs)]
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WindowsTable {
    pub generate_setup: Option<bool>,
    pub gui: Option<bool>,
    pub product_guid: Option<String>,
}

/// Packaging options.
#[allow(missing_docs)]
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PackagerTable {
    pub name: Option<String>,
    pub display_name: Option<String>,
    pub version: Option<String>,
    pub description: Option<String>,
    pub main_class: Option<String>,
    pub platform: Option<String>,
    pub icon_file: Option<PathBuf>,
    pub license_file: Option<PathBuf>,
    pub output_directory: Option<PathBuf>,
    pub assets_directory: Option<PathBuf>,
    pub runnable_archive: Option<PathBuf>,
    pub classes_directory: Option<PathBuf>,
    pub dependencies: Vec<PathBuf>,
    pub copy_dependencies: Option<bool>,
    pub classpath: Option<String>,
    pub manifest_entries: BTreeMap<String, String>,
    pub extra: BTreeMap<String, String>,
    pub additional_resources: Vec<PathBuf>,
    pub vm_args: Vec<String>,
    pub administrator_required: bool,
    pub use_resources_as_working_dir: Option<bool>,
    pub generate_installers: Option<bool>,
    pub create_tarball: bool,
    pub create_zipball: bool,
    pub runtime: RuntimeTable,
    pub scripts: ScriptsTable,
    pub file_associations: Vec<FileAssociationTable>,
    pub linux: LinuxTable,
    pub mac: MacTable,
    pub windows: WindowsTable,
}

/// Parsed `packager.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PackagerManifest {
    /// Host project metadata
    pub project: ProjectTable,
    /// Packaging options
    pub packager: PackagerTable,
}

/// Values given on the command line that take precedence over the manifest.
#[derive(Debug, Clone, Default)]
pub struct ManifestOverrides {
    /// Target platform
    pub platform: Option<Platform>,
    /// Output directory, relative to the current directory
    pub output_directory: Option<PathBuf>,
    /// Application name
    pub name: Option<String>,
    /// Application version
    pub version: Option<String>,
    /// Embed a runtime
    pub bundle_runtime: Option<bool>,
    /// Skip installer generation
    pub no_installers: bool,
}

/// A manifest together with the directory its relative paths resolve against.
#[derive(Debug, Clone)]
pub struct LoadedManifest {
    /// Parsed content
    pub manifest: PackagerManifest,
    /// Directory containing the manifest
    pub base_dir: PathBuf,
}

/// Read and parse the manifest at `path`.
pub fn load_manifest(path: &Path) -> Result<LoadedManifest> {
    if !path.is_file() {
        return Err(ManifestError::NotFound {
            path: path.to_path_buf(),
        }
        .into());
    }

    let content = std::fs::read_to_string(path).map_err(|source| ManifestError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let manifest = parse_manifest(&content).map_err(|source| ManifestError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    let absolute = absolute(path, Path::new("."))?;
    let base_dir = absolute
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    Ok(LoadedManifest { manifest, base_dir })
}

/// Parse manifest text.
pub fn parse_manifest(content: &str) -> std::result::Result<PackagerManifest, toml::de::Error> {
    toml::from_str(content)
}

fn absolute(path: &Path, base: &Path) -> std::result::Result<PathBuf, ManifestError> {
    let base = if base.is_absolute() {
        base.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(|source| ManifestError::InvalidPath {
                path: base.to_path_buf(),
                source,
            })?
            .join(base)
    };
    path.absolutize_from(&base)
        .map(|p| p.into_owned())
        .map_err(|source| ManifestError::InvalidPath {
            path: path.to_path_buf(),
            source,
        })
}

impl LoadedManifest {
    fn resolve(&self, path: &Path) -> std::result::Result<PathBuf, ManifestError> {
        absolute(path, &self.base_dir)
    }

    fn resolve_opt(&self, path: Option<&PathBuf>) -> std::result::Result<Option<PathBuf>, ManifestError> {
        path.map(|p| self.resolve(p)).transpose()
    }

    fn resolve_all(&self, paths: &[PathBuf]) -> std::result::Result<Vec<PathBuf>, ManifestError> {
        paths.iter().map(|p| self.resolve(p)).collect()
    }

    /// Build [`Settings`], applying `overrides` on top of the manifest.
    pub fn to_settings(&self, overrides: &ManifestOverrides) -> Result<Settings> {
        let project = &self.manifest.project;
        let packager = &self.manifest.packager;

        let name = overrides
            .name
            .clone()
            .or_else(|| packager.name.clone())
            .or_else(|| project.name.clone())
            .ok_or(ManifestError::MissingKey {
                table: "[project]",
                key: "name",
            })?;
        let main_class = packager.main_class.clone().ok_or(ManifestError::MissingKey {
            table: "[packager]",
            key: "main_class",
        })?;

        let organization = project.organization.clone().unwrap_or_default();
        let package = PackageSettings {
            name,
            display_name: packager.display_name.clone().unwrap_or_default(),
            version: overrides
                .version
                .clone()
                .or_else(|| packager.version.clone())
                .or_else(|| project.version.clone())
                .unwrap_or_default(),
            description: packager
                .description
                .clone()
                .or_else(|| project.description.clone())
                .unwrap_or_default(),
            url: project.url.clone(),
            organization: Organization {
                name: organization.name.unwrap_or_default(),
                url: organization.url,
                email: organization.email,
            },
            license_file: self.resolve_opt(packager.license_file.as_ref())?,
        };

        let output_directory = match &overrides.output_directory {
            Some(dir) => absolute(dir, Path::new("."))?,
            None => self.resolve(
                packager
                    .output_directory
                    .as_deref()
                    .unwrap_or(Path::new(DEFAULT_OUTPUT_DIR)),
            )?,
        };

        let platform = match overrides.platform {
            Some(platform) => platform,
            None => match &packager.platform {
                Some(value) => value.parse().map_err(ManifestError::InvalidPlatform)?,
                None => Platform::current(),
            },
        };

        let mut builder = SettingsBuilder::new()
            .package_settings(package)
            .main_class(main_class)
            .icon_file(self.resolve_opt(packager.icon_file.as_ref())?)
            .output_directory(output_directory)
            .assets_directory(self.resolve_opt(packager.assets_directory.as_ref())?)
            .runtime(self.runtime_settings(overrides)?)
            .additional_resources(self.resolve_all(&packager.additional_resources)?)
            .vm_args(packager.vm_args.clone())
            .runnable_archive(self.resolve_opt(packager.runnable_archive.as_ref())?)
            .classes_directory(self.resolve_opt(packager.classes_directory.as_ref())?)
            .dependencies(self.resolve_all(&packager.dependencies)?)
            .classpath(packager.classpath.clone())
            .manifest_entries(packager.manifest_entries.clone())
            .extra(packager.extra.clone())
            .file_associations(
                packager
                    .file_associations
                    .iter()
                    .map(|a| FileAssociation {
                        mime_type: a.mime_type.clone(),
                        extension: a.extension.clone(),
                        description: a.description.clone(),
                    })
                    .collect(),
            )
            .scripts(self.scripts()?)
            .administrator_required(packager.administrator_required)
            .create_tarball(packager.create_tarball)
            .create_zipball(packager.create_zipball)
            .platform(self.platform_settings(platform));

        if let Some(copy) = packager.copy_dependencies {
            builder = builder.copy_dependencies(copy);
        }
        if let Some(value) = packager.use_resources_as_working_dir {
            builder = builder.use_resources_as_working_dir(value);
        }
        if overrides.no_installers {
            builder = builder.generate_installers(false);
        } else if let Some(value) = packager.generate_installers {
            builder = builder.generate_installers(value);
        }

        Ok(builder.build()?)
    }

    fn runtime_settings(
        &self,
        overrides: &ManifestOverrides,
    ) -> std::result::Result<RuntimeSettings, ManifestError> {
        let table = &self.manifest.packager.runtime;
        let defaults = RuntimeSettings::default();
        Ok(RuntimeSettings {
            bundle: overrides
                .bundle_runtime
                .or(table.bundle)
                .unwrap_or(defaults.bundle),
            customize: table.customize.unwrap_or(defaults.customize),
            runtime_path: self.resolve_opt(table.runtime_path.as_ref())?,
            jdk_path: self.resolve_opt(table.jdk_path.as_ref())?,
            directory_name: table
                .directory_name
                .clone()
                .unwrap_or(defaults.directory_name),
            modules: ModuleSpec {
                explicit: table.modules.clone(),
                additional: table.additional_modules.clone(),
            },
            additional_module_paths: self.resolve_all(&table.additional_module_paths)?,
        })
    }

    fn scripts(&self) -> std::result::Result<Scripts, ManifestError> {
        let table = &self.manifest.packager.scripts;
        Ok(Scripts {
            bootstrap: self.resolve_opt(table.bootstrap.as_ref())?,
            pre_install: self.resolve_opt(table.pre_install.as_ref())?,
            post_install: self.resolve_opt(table.post_install.as_ref())?,
            pre_remove: self.resolve_opt(table.pre_remove.as_ref())?,
            post_remove: self.resolve_opt(table.post_remove.as_ref())?,
        })
    }

    fn platform_settings(&self, platform: Platform) -> PlatformSettings {
        let packager = &self.manifest.packager;
        match platform {
            Platform::Linux => {
                let defaults = LinuxSettings::default();
                PlatformSettings::Linux(LinuxSettings {
                    generate_deb: packager.linux.generate_deb.unwrap_or(defaults.generate_deb),
                    generate_rpm: packager.linux.generate_rpm.unwrap_or(defaults.generate_rpm),
                    categories: packager
                        .linux
                        .categories
                        .clone()
                        .unwrap_or(defaults.categories),
                })
            }
            Platform::MacOs => {
                let defaults = MacOsSettings::default();
                PlatformSettings::MacOs(MacOsSettings {
                    generate_dmg: packager.mac.generate_dmg.unwrap_or(defaults.generate_dmg),
                    generate_pkg: packager.mac.generate_pkg.unwrap_or(defaults.generate_pkg),
                    bundle_identifier: packager.mac.bundle_identifier.clone(),
                })
            }
            Platform::Windows => {
                let defaults = WindowsSettings::default();
                PlatformSettings::Windows(WindowsSettings {
                    generate_setup: packager
                        .windows
                        .generate_setup
                        .unwrap_or(defaults.generate_setup),
                    gui: packager.windows.gui.unwrap_or(defaults.gui),
                    product_guid: packager.windows.product_guid.clone(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PackagerError;

    const DEMO: &str = r#"
[project]
name = "demo"
version = "1.0"
description = "A demo"

[project.organization]
name = "Example Corp"

[packager]
main_class = "com.example.Main"
classes_directory = "target/classes"
dependencies = ["lib/a.jar"]
vm_args = ["-Xmx512m"]
platform = "linux"

[packager.runtime]
bundle = false
modules = ["java.base"]

[packager.linux]
generate_rpm = false
"#;

    fn loaded(content: &str) -> LoadedManifest {
        LoadedManifest {
            manifest: parse_manifest(content).unwrap(),
            base_dir: PathBuf::from("/work/app"),
        }
    }

    #[test]
    fn project_table_supplies_defaults() {
        let settings = loaded(DEMO).to_settings(&ManifestOverrides::default()).unwrap();
        assert_eq!(settings.name(), "demo");
        assert_eq!(settings.version(), "1.0");
        assert_eq!(settings.package().description, "A demo");
        assert_eq!(settings.package().organization.name, "Example Corp");
        assert_eq!(settings.platform(), Platform::Linux);
        assert!(!settings.runtime().bundle);
        assert_eq!(settings.runtime().modules.explicit, vec!["java.base"]);
        let linux = settings.platform_settings().linux().unwrap();
        assert!(linux.generate_deb);
        assert!(!linux.generate_rpm);
    }

    #[test]
    fn relative_paths_resolve_against_the_manifest() {
        let settings = loaded(DEMO).to_settings(&ManifestOverrides::default()).unwrap();
        assert_eq!(
            settings.classes_directory(),
            Some(Path::new("/work/app/target/classes"))
        );
        assert_eq!(settings.dependencies(), &[PathBuf::from("/work/app/lib/a.jar")]);
        assert_eq!(settings.output_directory(), Path::new("/work/app/target/package"));
    }

    #[test]
    fn overrides_win() {
        let overrides = ManifestOverrides {
            platform: Some(Platform::Windows),
            output_directory: Some(PathBuf::from("/tmp/out")),
            name: Some("other".into()),
            version: Some("2.0".into()),
            bundle_runtime: Some(true),
            no_installers: true,
        };
        let settings = loaded(DEMO).to_settings(&overrides).unwrap();
        assert_eq!(settings.name(), "other");
        assert_eq!(settings.version(), "2.0");
        assert_eq!(settings.output_directory(), Path::new("/tmp/out"));
        assert!(settings.runtime().bundle);
        assert!(!settings.generate_installers());
        assert!(settings.platform_settings().windows().is_some());
    }

    #[test]
    fn main_class_is_required() {
        let err = loaded("[project]\nname = \"demo\"\n")
            .to_settings(&ManifestOverrides::default())
            .unwrap_err();
        assert!(matches!(
            err,
            PackagerError::Manifest(ManifestError::MissingKey { key: "main_class", .. })
        ));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(parse_manifest("[packager]\nmain_clas = \"x\"\n").is_err());
    }

    #[test]
    fn missing_file_is_reported() {
        let err = load_manifest(Path::new("/nonexistent/packager.toml")).unwrap_err();
        assert!(matches!(err, PackagerError::Manifest(ManifestError::NotFound { .. })));
    }
}
