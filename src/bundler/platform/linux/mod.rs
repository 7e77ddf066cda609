//! Linux app and installers.
//!
//! The launcher is a bash script with the runnable jar appended to it; the
//! JVM finds the jar's central directory at the end of the file and ignores
//! the leading script. Everything, runtime included, lives in the app folder
//! that installers place under `/opt/{name}`.
//!
//! | Format | Tool | Module |
//! |--------|------|--------|
//! | .deb | `jdeb` (in-process writer) | [`debian`] |
//! | .rpm | `rpmbuild` | [`rpm`] |

pub mod debian;
pub mod rpm;

use crate::bundler::context::{AppBundle, AppLayout, PackagerContext};
use crate::bundler::error::{Error, Result};
use crate::bundler::platform::{PackageType, Platform, PlatformPackager};
use crate::bundler::settings::Settings;
use crate::bundler::template::TemplateContext;
use crate::bundler::utils::fs::{concat, copy_file_to_folder, set_owner_executable};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Install prefix of the app folder.
pub fn install_dir(settings: &Settings) -> String {
    format!("/opt/{}", settings.name())
}

pub(crate) fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Linux variant.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinuxPackager;

#[async_trait]
impl PlatformPackager for LinuxPackager {
    fn platform(&self) -> Platform {
        Platform::Linux
    }

    fn create_specific_app_structure(&self, settings: &Settings, app_folder: &Path) -> AppLayout {
        AppLayout {
            app_folder: app_folder.to_path_buf(),
            executable_folder: app_folder.to_path_buf(),
            executable: app_folder.join(settings.name()),
            jar_folder: app_folder.to_path_buf(),
            resources_folder: app_folder.to_path_buf(),
            runtime_folder: app_folder.join(&settings.runtime().directory_name),
        }
    }

    async fn do_create_app(&self, ctx: &PackagerContext, bundle: &mut AppBundle) -> Result<()> {
        if bundle.icon_file.parent() != Some(bundle.app_folder.as_path()) {
            bundle.icon_file = copy_file_to_folder(&bundle.icon_file, &bundle.app_folder).await?;
        }

        let template = TemplateContext::new(&ctx.settings, bundle).await?;
        let script = ctx
            .renderer
            .render(
                "linux/startup.sh",
                &template,
                &bundle.assets_folder.join("startup.sh"),
            )
            .await?;

        concat(&bundle.executable, &[script.as_path(), bundle.jar_file.as_path()]).await?;
        set_owner_executable(&bundle.executable).await?;
        log::info!("Launcher created: {}", bundle.executable.display());
        Ok(())
    }

    async fn do_generate_installers(
        &self,
        ctx: &PackagerContext,
        bundle: &AppBundle,
        installers: &mut Vec<(PackageType, PathBuf)>,
    ) -> Result<()> {
        let Some(linux) = ctx.settings.platform_settings().linux() else {
            return Err(Error::Validation("Linux settings are required".to_string()));
        };

        if linux.generate_deb {
            let deb = debian::generate(ctx, bundle)
                .await
                .map_err(|e| Error::installer("deb", e))?;
            installers.push((PackageType::Deb, deb));
        }
        if linux.generate_rpm {
            let rpm = rpm::generate(ctx, bundle)
                .await
                .map_err(|e| Error::installer("rpm", e))?;
            installers.push((PackageType::Rpm, rpm));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::settings::{PackageSettings, SettingsBuilder};

    #[test]
    fn everything_lives_in_the_app_folder() {
        let settings = SettingsBuilder::new()
            .package_settings(PackageSettings {
                name: "demo".into(),
                ..Default::default()
            })
            .main_class("com.example.Main")
            .output_directory("/out")
            .build()
            .unwrap();
        let layout = LinuxPackager.create_specific_app_structure(&settings, Path::new("/out/demo"));
        assert_eq!(layout.executable, PathBuf::from("/out/demo/demo"));
        assert_eq!(layout.jar_folder, PathBuf::from("/out/demo"));
        assert_eq!(layout.runtime_folder, PathBuf::from("/out/demo/jre"));
        assert_eq!(install_dir(&settings), "/opt/demo");
    }
}
