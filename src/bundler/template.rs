//! Template rendering for launchers, descriptors and installer scripts.
//!
//! Templates are handlebars sources keyed by id (`linux/startup.sh`,
//! `windows/iss`, ...). The built-in sources are compiled into the binary; a
//! file `{assets_dir}/{id}.hbs` replaces the built-in template of the same id.
//! Rendering runs in strict mode without HTML escaping.

use crate::bundler::context::AppBundle;
use crate::bundler::error::{Error, ErrorExt, Result};
use crate::bundler::settings::{FileAssociation, Settings};
use handlebars::Handlebars;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Built-in templates: (id, source).
pub const BUILTIN_TEMPLATES: [(&str, &str); 6] = [
    ("linux/startup.sh", include_str!("templates/linux/startup.sh.hbs")),
    ("linux/desktop", include_str!("templates/linux/desktop.hbs")),
    ("linux/control", include_str!("templates/linux/control.hbs")),
    ("mac/startup", include_str!("templates/mac/startup.hbs")),
    ("windows/launch4j.xml", include_str!("templates/windows/launch4j.xml.hbs")),
    ("windows/iss", include_str!("templates/windows/iss.hbs")),
];

/// Values derived for the Windows templates.
#[derive(Debug, Clone, Serialize)]
pub struct WindowsVars {
    /// `gui` or `console`.
    pub header_type: String,
    /// Inno Setup `AppId`, brace-escaped.
    pub app_id: String,
    /// Install directory.
    pub default_dir_name: String,
    /// Installed launcher path.
    pub app_executable: String,
    /// Source glob of the app folder.
    pub app_sources: String,
    /// Start menu shortcut.
    pub group_icon: String,
    /// Desktop shortcut.
    pub desktop_icon: String,
    /// Post-install launch caption.
    pub launch_description: String,
    /// Four-part numeric version.
    pub file_version: String,
    /// Elevation manifest, empty when not required.
    pub manifest_file: String,
}

/// Immutable view of the settings and the bundle used by templates.
///
/// Field names are the variable names templates see. Paths are absolute.
#[allow(missing_docs)]
#[derive(Debug, Clone, Serialize)]
pub struct TemplateContext {
    pub name: String,
    pub display_name: String,
    pub version: String,
    pub description: String,
    pub url: String,
    pub organization_name: String,
    pub organization_url: String,
    pub organization_email: String,
    pub main_class: String,
    pub vm_args: Vec<String>,
    pub bundle_jre: bool,
    pub jre_directory_name: String,
    pub use_resources_as_working_dir: bool,
    pub administrator_required: bool,
    pub bootstrap: Option<String>,
    pub categories: String,
    pub license_name: String,
    pub deb_package_name: String,
    pub deb_architecture: String,
    pub bundle_identifier: String,
    pub installer_base_name: String,
    pub executable_name: String,
    pub jar_name: String,
    pub icon_name: String,
    pub app_folder: String,
    pub assets_folder: String,
    pub output_directory: String,
    pub executable: String,
    pub jar_file: String,
    pub icon_file: String,
    pub file_associations: Vec<FileAssociation>,
    pub extra: BTreeMap<String, String>,
    pub win: WindowsVars,
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn debian_arch() -> &'static str {
    match std::env::consts::ARCH {
        "x86_64" => "amd64",
        "x86" => "i386",
        "aarch64" => "arm64",
        "arm" => "armhf",
        "riscv64" => "riscv64",
        "powerpc64" => "ppc64el",
        "s390x" => "s390x",
        _ => "all",
    }
}

/// Numeric four-part version, e.g. `1.2-beta` becomes `1.2.0.0`.
pub fn quad_version(version: &str) -> String {
    let mut parts: Vec<String> = version
        .split(|c: char| !c.is_ascii_digit())
        .filter(|p| !p.is_empty())
        .take(4)
        .map(str::to_string)
        .collect();
    parts.resize(4, "0".to_string());
    parts.join(".")
}

fn default_bundle_identifier(settings: &Settings) -> String {
    match settings.main_class().rsplit_once('.') {
        Some((package, _)) => format!("{package}.{}", settings.name()),
        None => settings.name().to_string(),
    }
}

impl TemplateContext {
    /// Builds the view for `settings` and `bundle`. Reads the bootstrap script if one is set.
    pub async fn new(settings: &Settings, bundle: &AppBundle) -> Result<Self> {
        let bootstrap = match &settings.scripts().bootstrap {
            Some(path) => Some(
                tokio::fs::read_to_string(path)
                    .await
                    .fs_context("reading bootstrap script", path)?,
            ),
            None => None,
        };

        let package = settings.package();
        let runtime = settings.runtime();
        let platform = settings.platform_settings();
        let executable_name = file_name(&bundle.executable);
        let display_name = package.display_name.clone();

        let guid = platform
            .windows()
            .and_then(|w| w.product_guid.clone())
            .unwrap_or_else(|| {
                uuid::Uuid::new_v5(&uuid::Uuid::NAMESPACE_OID, settings.name().as_bytes())
                    .to_string()
                    .to_uppercase()
            });
        let manifest_file = if settings.administrator_required() {
            bundle
                .assets_folder
                .join(format!("{executable_name}.manifest"))
                .to_string_lossy()
                .into_owned()
        } else {
            String::new()
        };

        let win = WindowsVars {
            header_type: if platform.windows().is_none_or(|w| w.gui) {
                "gui".into()
            } else {
                "console".into()
            },
            app_id: format!("{{{{{guid}}}"),
            default_dir_name: format!("{{autopf}}\\{}", settings.name()),
            app_executable: format!("{{app}}\\{executable_name}"),
            app_sources: format!("{}\\*", bundle.app_folder.display()),
            group_icon: format!("{{group}}\\{display_name}"),
            desktop_icon: format!("{{autodesktop}}\\{display_name}"),
            launch_description: format!("{{cm:LaunchProgram,{display_name}}}"),
            file_version: quad_version(settings.version()),
            manifest_file,
        };

        Ok(Self {
            name: settings.name().to_string(),
            display_name,
            version: settings.version().to_string(),
            description: package.description.clone(),
            url: package.url.clone().unwrap_or_default(),
            organization_name: package.organization.name.clone(),
            organization_url: package.organization.url.clone().unwrap_or_default(),
            organization_email: package.organization.email.clone().unwrap_or_default(),
            main_class: settings.main_class().to_string(),
            vm_args: settings.vm_args().to_vec(),
            bundle_jre: bundle.runtime_folder.is_some(),
            jre_directory_name: runtime.directory_name.clone(),
            use_resources_as_working_dir: settings.use_resources_as_working_dir(),
            administrator_required: settings.administrator_required(),
            bootstrap,
            categories: platform
                .linux()
                .map(|l| l.categories.clone())
                .unwrap_or_else(|| "Utility".into()),
            license_name: settings.license_name(),
            deb_package_name: settings.name().to_lowercase().replace([' ', '_'], "-"),
            deb_architecture: if bundle.runtime_folder.is_some() {
                debian_arch().into()
            } else {
                "all".into()
            },
            bundle_identifier: platform
                .macos()
                .and_then(|m| m.bundle_identifier.clone())
                .unwrap_or_else(|| default_bundle_identifier(settings)),
            installer_base_name: settings.installer_base_name(),
            executable_name,
            jar_name: file_name(&bundle.jar_file),
            icon_name: file_name(&bundle.icon_file),
            app_folder: bundle.app_folder.to_string_lossy().into_owned(),
            assets_folder: bundle.assets_folder.to_string_lossy().into_owned(),
            output_directory: settings.output_directory().to_string_lossy().into_owned(),
            executable: bundle.executable.to_string_lossy().into_owned(),
            jar_file: bundle.jar_file.to_string_lossy().into_owned(),
            icon_file: bundle.icon_file.to_string_lossy().into_owned(),
            file_associations: settings.file_associations().to_vec(),
            extra: settings.extra().clone(),
            win,
        })
    }
}

/// Renders templates by id.
#[derive(Debug, Clone)]
pub struct TemplateRenderer {
    registry: Handlebars<'static>,
}

impl TemplateRenderer {
    /// Registers the built-in templates, replacing any that have an override in `assets_dir`.
    pub fn new(assets_dir: Option<&Path>) -> Result<Self> {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(true);
        registry.register_escape_fn(handlebars::no_escape);

        for (id, builtin) in BUILTIN_TEMPLATES {
            let custom = assets_dir
                .map(|dir| dir.join(format!("{id}.hbs")))
                .filter(|p| p.is_file());
            let source = match &custom {
                Some(path) => {
                    log::info!("Using custom template {}", path.display());
                    std::fs::read_to_string(path).fs_context("reading template", path)?
                }
                None => builtin.to_string(),
            };
            registry
                .register_template_string(id, source)
                .map_err(|e| Error::Template {
                    template: id.to_string(),
                    reason: e.to_string(),
                })?;
        }

        Ok(Self { registry })
    }

    /// Whether `id` names a registered template.
    pub fn has_template(&self, id: &str) -> bool {
        self.registry.has_template(id)
    }

    /// Renders `id` into a string.
    pub fn render_to_string(&self, id: &str, ctx: &TemplateContext) -> Result<String> {
        if !self.has_template(id) {
            return Err(Error::UnknownTemplate(id.to_string()));
        }
        self.registry.render(id, ctx).map_err(|e| Error::Template {
            template: id.to_string(),
            reason: e.to_string(),
        })
    }

    /// Renders `id` into `target`, creating parent directories. Returns `target`.
    pub async fn render(&self, id: &str, ctx: &TemplateContext, target: &Path) -> Result<PathBuf> {
        let text = self.render_to_string(id, ctx)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .fs_context("creating directory", parent)?;
        }
        tokio::fs::write(target, text)
            .await
            .fs_context("writing rendered template", target)?;
        log::debug!("Rendered {} to {}", id, target.display());
        Ok(target.to_path_buf())
    }
}
