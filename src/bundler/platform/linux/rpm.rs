//! RPM package (.rpm) generation.
//!
//! The desktop entry is shipped inside the app folder and linked into
//! `/usr/share/applications`. The launcher and the runtime's `bin/java` form
//! one executable include group; everything else is mapped with the default
//! modes. RPM headers only accept XPM icons, so one is derived from the app
//! icon when no XPM sits next to it.

use super::{file_name, install_dir};
use crate::bundler::context::{AppBundle, PackagerContext};
use crate::bundler::error::{ErrorExt, Result};
use crate::bundler::platform::PackageType;
use crate::bundler::resources::icons;
use crate::bundler::settings::Settings;
use crate::bundler::template::TemplateContext;
use crate::bundler::tool::{ConfigNode, Tool, ToolInvocationSpec, element, element_tree};
use crate::bundler::utils::fs::copy_file_to_folder;
use std::path::{Path, PathBuf};

/// Finds or creates the XPM icon for the package header.
///
/// Looks for `{icon stem}.xpm` next to the configured icon, then converts
/// the icon into the assets folder, then falls back to the bundled default.
pub async fn resolve_xpm(settings: &Settings, bundle: &AppBundle) -> Result<PathBuf> {
    let sources = settings
        .icon_file()
        .into_iter()
        .chain(std::iter::once(bundle.icon_file.as_path()));
    for icon in sources {
        if icon.extension().is_some_and(|e| e.eq_ignore_ascii_case("xpm")) && icon.is_file() {
            return Ok(icon.to_path_buf());
        }
        let sibling = icon.with_extension("xpm");
        if sibling.is_file() {
            return Ok(sibling);
        }
    }

    let dest = bundle.assets_folder.join(format!("{}.xpm", settings.name()));
    match icons::write_xpm(&bundle.icon_file, &dest) {
        Ok(()) => log::info!("XPM icon converted from {}", bundle.icon_file.display()),
        Err(e) => {
            log::warn!(
                "Could not convert {} to XPM ({e}); using the default icon",
                bundle.icon_file.display()
            );
            tokio::fs::write(&dest, icons::DEFAULT_XPM)
                .await
                .fs_context("writing default XPM icon", &dest)?;
        }
    }
    Ok(dest)
}

fn source(location: &Path, outer: &str, inner: &str, values: &[String]) -> ConfigNode {
    element_tree("source", vec![
        element("location", location.to_string_lossy()),
        element_tree(outer, values.iter().map(|v| element(inner, v.as_str())).collect()),
    ])
}

fn softlink(location: String) -> ConfigNode {
    element_tree("softlinkSource", vec![element("location", location)])
}

fn mapping(directory: &str, filemode: Option<&str>, sources: Vec<ConfigNode>) -> ConfigNode {
    let mut children = vec![element("directory", directory)];
    if let Some(mode) = filemode {
        children.push(element("filemode", mode));
    }
    children.push(element_tree("sources", sources));
    element_tree("mapping", children)
}

/// rpm configuration for `bundle`.
pub fn rpm_configuration(
    settings: &Settings,
    bundle: &AppBundle,
    desktop_name: &str,
    xpm: &Path,
    rpm: &Path,
) -> Vec<ConfigNode> {
    let package = settings.package();
    let prefix = install_dir(settings);
    let executable = file_name(&bundle.executable);

    let mut executables = vec![executable.clone()];
    if bundle.runtime_folder.is_some() {
        executables.push(settings.runtime().java_binary());
    }

    vec![
        element("name", settings.name()),
        element("version", settings.version()),
        element("summary", package.description.as_str()),
        element("description", package.description.as_str()),
        element("url", package.url.clone().unwrap_or_default()),
        element("license", settings.license_name()),
        element("packager", package.organization.name.as_str()),
        element("group", "Application"),
        element("icon", xpm.to_string_lossy()),
        element("autoRequires", "false"),
        element("needarch", "true"),
        element("defaultDirmode", "755"),
        element("defaultFilemode", "644"),
        element("defaultUsername", "root"),
        element("defaultGroupname", "root"),
        element("copyTo", rpm.to_string_lossy()),
        element_tree("mappings", vec![
            mapping(&prefix, None, vec![source(
                &bundle.app_folder,
                "excludes",
                "exclude",
                &executables,
            )]),
            mapping(&prefix, Some("755"), vec![source(
                &bundle.app_folder,
                "includes",
                "include",
                &executables,
            )]),
            mapping("/usr/share/applications", None, vec![softlink(format!(
                "{prefix}/{desktop_name}"
            ))]),
            mapping("/usr/local/bin", None, vec![softlink(format!("{prefix}/{executable}"))]),
        ]),
    ]
}

/// Builds `{output}/{name}_{version}.rpm`.
pub async fn generate(ctx: &PackagerContext, bundle: &AppBundle) -> Result<PathBuf> {
    let settings = &ctx.settings;
    let rpm = PackageType::Rpm.artifact_path(settings);
    log::info!("Generating {} ...", rpm.display());

    let template = TemplateContext::new(settings, bundle).await?;
    let desktop_file = bundle.assets_folder.join(format!("{}.desktop", settings.name()));
    ctx.renderer
        .render("linux/desktop", &template, &desktop_file)
        .await?;
    let installed_desktop = copy_file_to_folder(&desktop_file, &bundle.app_folder).await?;

    let xpm = resolve_xpm(settings, bundle).await?;

    let spec = ToolInvocationSpec::new(
        Tool::Rpmbuild,
        "rpm",
        rpm_configuration(settings, bundle, &file_name(&installed_desktop), &xpm, &rpm),
        ctx.env.clone(),
    );
    ctx.invoker.invoke(&spec).await?;

    log::info!("RPM package generated: {}", rpm.display());
    Ok(rpm)
}
