//! Generic app folder assembly shared by every platform variant.
//!
//! The variant decides where things go; this module creates the folders,
//! resolves the icon, copies resources and dependencies and provides the
//! runnable jar the launcher is built from.

use crate::bundler::archive::jar::{JarManifest, class_path, create_jar};
use crate::bundler::context::{AppBundle, PackagerContext};
use crate::bundler::error::{Error, Result};
use crate::bundler::platform::PlatformPackager;
use crate::bundler::resources::icons;
use crate::bundler::settings::Settings;
use crate::bundler::utils::fs::{copy_dir, copy_file, copy_file_to_folder, create_dir_all};
use std::path::{Path, PathBuf};

/// Path of the runnable jar, `{output}/{name}-{version}-runnable.jar`.
pub fn runnable_jar_path(settings: &Settings) -> PathBuf {
    settings.output_directory().join(format!(
        "{}-{}-runnable.jar",
        settings.name(),
        settings.version()
    ))
}

/// Folder under the output directory holding generated build inputs.
pub const ASSETS_FOLDER: &str = "assets";

/// Creates the app folder for `variant` and fills in everything that is not
/// platform specific.
pub async fn assemble(ctx: &PackagerContext, variant: &dyn PlatformPackager) -> Result<AppBundle> {
    let settings = &ctx.settings;
    let output = settings.output_directory();
    let app_folder = output.join(settings.name());
    let layout = variant.create_specific_app_structure(settings, &app_folder);

    create_dir_all(&app_folder, true).await?;
    let assets_folder = output.join(ASSETS_FOLDER);
    create_dir_all(&assets_folder, false).await?;
    let libs_folder = layout.jar_folder.join("libs");
    for folder in [
        &layout.executable_folder,
        &layout.jar_folder,
        &layout.resources_folder,
        &libs_folder,
    ] {
        create_dir_all(folder, false).await?;
    }

    let icon_file = resolve_icon(settings, &assets_folder)?;
    log::info!("Icon: {}", icon_file.display());

    copy_resources(settings.additional_resources(), &layout.resources_folder).await?;

    if settings.copy_dependencies() {
        for dependency in settings.dependencies() {
            copy_file_to_folder(dependency, &libs_folder).await?;
        }
        log::info!("Copied {} dependencies", settings.dependencies().len());
    }

    let jar_file = runnable_jar(settings).await?;

    Ok(AppBundle {
        app_folder: layout.app_folder,
        assets_folder,
        executable: layout.executable,
        executable_folder: layout.executable_folder,
        jar_folder: layout.jar_folder,
        libs_folder,
        resources_folder: layout.resources_folder,
        runtime_folder: settings.runtime().bundle.then_some(layout.runtime_folder),
        jar_file,
        icon_file,
    })
}

/// Picks the icon: configured, then `{assets_dir}/{platform}/{name}.{ext}`,
/// then a generated default written to the assets folder.
pub fn resolve_icon(settings: &Settings, assets_folder: &Path) -> Result<PathBuf> {
    if let Some(icon) = settings.icon_file() {
        if !icon.is_file() {
            return Err(Error::Structure(format!("icon {} does not exist", icon.display())));
        }
        return Ok(icon.to_path_buf());
    }

    let platform = settings.platform();
    if let Some(dir) = settings.assets_directory() {
        let candidate = dir
            .join(platform.assets_subdir())
            .join(format!("{}.{}", settings.name(), platform.icon_extension()));
        if candidate.is_file() {
            return Ok(candidate);
        }
    }

    let default = assets_folder.join(format!("{}.png", settings.name()));
    icons::write_default_png(&default)?;
    Ok(default)
}

async fn copy_resources(resources: &[PathBuf], destination: &Path) -> Result<()> {
    for resource in resources {
        if resource.is_dir() {
            let name = resource.file_name().ok_or_else(|| {
                Error::Structure(format!("{} has no directory name", resource.display()))
            })?;
            copy_dir(resource, &destination.join(name)).await?;
        } else if resource.is_file() {
            copy_file_to_folder(resource, destination).await?;
        } else {
            return Err(Error::Structure(format!(
                "resource {} does not exist",
                resource.display()
            )));
        }
        log::debug!("Copied resource {}", resource.display());
    }
    Ok(())
}

async fn runnable_jar(settings: &Settings) -> Result<PathBuf> {
    let jar_file = runnable_jar_path(settings);

    if let Some(archive) = settings.runnable_archive() {
        if archive != jar_file {
            copy_file(archive, &jar_file).await?;
        }
        return Ok(jar_file);
    }

    let classes = settings
        .classes_directory()
        .ok_or_else(|| {
            Error::Structure("no runnable jar or classes directory to build one from".to_string())
        })?
        .to_path_buf();
    let manifest = JarManifest {
        main_class: settings.main_class().to_string(),
        class_path: class_path(
            settings.dependencies(),
            settings.copy_dependencies(),
            settings.classpath(),
        ),
        entries: settings.manifest_entries().clone(),
    };

    let dest = jar_file.clone();
    tokio::task::spawn_blocking(move || create_jar(&classes, &manifest, &dest))
        .await
        .map_err(|e| Error::GenericError(format!("Join error: {}", e)))??;
    log::info!("Runnable jar created: {}", jar_file.display());
    Ok(jar_file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::platform::{Platform, create_packager};
    use crate::bundler::settings::{
        LinuxSettings, PackageSettings, PlatformSettings, RuntimeSettings, SettingsBuilder,
    };
    use crate::bundler::template::TemplateRenderer;
    use crate::bundler::tool::{ExecutionEnv, ProcessInvoker};
    use std::sync::Arc;

    fn context(root: &Path, bundle_runtime: bool) -> PackagerContext {
        let classes = root.join("classes/com/example");
        std::fs::create_dir_all(&classes).unwrap();
        std::fs::write(classes.join("Main.class"), [0xca, 0xfe]).unwrap();
        let resources = root.join("res/config");
        std::fs::create_dir_all(&resources).unwrap();
        std::fs::write(resources.join("app.properties"), "a=b").unwrap();
        std::fs::write(root.join("lib.jar"), "lib").unwrap();

        let settings = SettingsBuilder::new()
            .package_settings(PackageSettings {
                name: "demo".into(),
                version: "1.0".into(),
                ..Default::default()
            })
            .main_class("com.example.Main")
            .output_directory(root.join("out"))
            .classes_directory(Some(root.join("classes")))
            .dependencies(vec![root.join("lib.jar")])
            .additional_resources(vec![root.join("res/config")])
            .runtime(RuntimeSettings {
                bundle: bundle_runtime,
                ..Default::default()
            })
            .platform(PlatformSettings::Linux(LinuxSettings::default()))
            .build()
            .unwrap();
        PackagerContext {
            settings,
            renderer: TemplateRenderer::new(None).unwrap(),
            invoker: Arc::new(ProcessInvoker::new()),
            env: ExecutionEnv::default(),
        }
    }

    #[tokio::test]
    async fn assembles_linux_folder() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path(), false);
        let variant = create_packager(Platform::Linux);
        let bundle = assemble(&ctx, variant.as_ref()).await.unwrap();

        let out = dir.path().join("out");
        assert_eq!(bundle.app_folder, out.join("demo"));
        assert_eq!(bundle.jar_file, out.join("demo-1.0-runnable.jar"));
        assert!(bundle.jar_file.is_file());
        assert!(out.join("demo/libs/lib.jar").is_file());
        assert!(out.join("demo/config/app.properties").is_file());
        assert_eq!(bundle.icon_file, out.join("assets/demo.png"));
        assert!(bundle.icon_file.is_file());
        assert!(bundle.runtime_folder.is_none());
    }

    #[tokio::test]
    async fn runtime_folder_follows_bundle_flag() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path(), true);
        let variant = create_packager(Platform::Linux);
        let bundle = assemble(&ctx, variant.as_ref()).await.unwrap();
        assert_eq!(bundle.runtime_folder, Some(dir.path().join("out/demo/jre")));
    }

    #[tokio::test]
    async fn stale_app_folder_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path(), false);
        let stale = dir.path().join("out/demo/stale.txt");
        std::fs::create_dir_all(stale.parent().unwrap()).unwrap();
        std::fs::write(&stale, "old").unwrap();

        assemble(&ctx, create_packager(Platform::Linux).as_ref()).await.unwrap();
        assert!(!stale.exists());
    }

    #[tokio::test]
    async fn missing_resource_is_a_structure_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = copy_resources(&[dir.path().join("nope")], dir.path()).await.unwrap_err();
        assert!(matches!(err, Error::Structure(_)));
    }

    #[test]
    fn assets_icon_is_preferred_over_default() {
        let dir = tempfile::tempdir().unwrap();
        let assets = dir.path().join("assets");
        std::fs::create_dir_all(assets.join("linux")).unwrap();
        std::fs::write(assets.join("linux/demo.png"), "png").unwrap();
        let settings = SettingsBuilder::new()
            .package_settings(PackageSettings {
                name: "demo".into(),
                ..Default::default()
            })
            .main_class("Main")
            .output_directory(dir.path())
            .assets_directory(Some(assets.clone()))
            .platform(PlatformSettings::Linux(LinuxSettings::default()))
            .build()
            .unwrap();
        let icon = resolve_icon(&settings, &dir.path().join("out")).unwrap();
        assert_eq!(icon, assets.join("linux/demo.png"));
    }
}
