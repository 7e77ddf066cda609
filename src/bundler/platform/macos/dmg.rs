//! macOS disk image (.dmg) and installer package (.pkg) creation.
//!
//! The DMG holds the `.app` and an `Applications` symlink for drag-to-install.
//! The PKG installs the `.app` into `/Applications`.

use super::app_bundle_path;
use crate::bundler::context::{AppBundle, PackagerContext};
use crate::bundler::error::{Error, ErrorExt, Result};
use crate::bundler::platform::PackageType;
use crate::bundler::settings::Settings;
use crate::bundler::tool::{Tool, ToolInvocationSpec, args_tree};
use crate::bundler::utils::fs::{copy_dir, create_dir_all};
use std::path::Path;
use std::path::PathBuf;

/// `hdiutil` arguments creating `dmg` from `staging`.
pub fn hdiutil_args(settings: &Settings, staging: &Path, dmg: &Path) -> Vec<String> {
    vec![
        "create".to_string(),
        "-srcfolder".to_string(),
        staging.to_string_lossy().into_owned(),
        "-volname".to_string(),
        settings.display_name().to_string(),
        "-ov".to_string(),
        "-format".to_string(),
        "UDZO".to_string(),
        dmg.to_string_lossy().into_owned(),
    ]
}

/// `pkgbuild` arguments installing `app` into `/Applications`.
pub fn pkgbuild_args(app: &Path, pkg: &Path) -> Vec<String> {
    vec![
        "--install-location".to_string(),
        "/Applications".to_string(),
        "--component".to_string(),
        app.to_string_lossy().into_owned(),
        pkg.to_string_lossy().into_owned(),
    ]
}

/// Builds `{output}/{name}_{version}.dmg`.
pub async fn create_dmg(ctx: &PackagerContext, bundle: &AppBundle) -> Result<PathBuf> {
    let settings = &ctx.settings;
    let dmg = PackageType::Dmg.artifact_path(settings);
    log::info!("Generating {} ...", dmg.display());

    let app = app_bundle_path(settings, &bundle.app_folder);
    let app_name = app
        .file_name()
        .ok_or_else(|| Error::Structure("invalid app bundle path".to_string()))?;
    let staging = bundle.assets_folder.join("dmg");
    create_dir_all(&staging, true).await?;
    copy_dir(&app, &staging.join(app_name)).await?;

    #[cfg(unix)]
    {
        let applications = staging.join("Applications");
        std::os::unix::fs::symlink("/Applications", &applications)
            .fs_context("creating Applications symlink", &applications)?;
    }

    let spec = ToolInvocationSpec::new(
        Tool::Hdiutil,
        "create",
        vec![args_tree(hdiutil_args(settings, &staging, &dmg))],
        ctx.env.clone(),
    );
    ctx.invoker.invoke(&spec).await?;

    log::info!("DMG generated: {}", dmg.display());
    Ok(dmg)
}

/// Builds `{output}/{name}_{version}.pkg`.
pub async fn create_pkg(ctx: &PackagerContext, bundle: &AppBundle) -> Result<PathBuf> {
    let settings = &ctx.settings;
    let pkg = PackageType::Pkg.artifact_path(settings);
    log::info!("Generating {} ...", pkg.display());

    let app = app_bundle_path(settings, &bundle.app_folder);
    let spec = ToolInvocationSpec::new(
        Tool::Pkgbuild,
        "pkgbuild",
        vec![args_tree(pkgbuild_args(&app, &pkg))],
        ctx.env.clone(),
    );
    ctx.invoker.invoke(&spec).await?;

    log::info!("PKG generated: {}", pkg.display());
    Ok(pkg)
}
