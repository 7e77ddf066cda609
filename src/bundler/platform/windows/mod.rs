//! Windows executables and installers.
//!
//! The launcher is a launch4j wrapper embedding the runnable jar; the runtime
//! sits next to it in the app folder. The installer is compiled by Inno Setup.
//!
//! | Artifact | Tool | Module |
//! |----------|------|--------|
//! | `{name}.exe` launcher | `launch4jc` | [`exe`] |
//! | `{name}_{version}.exe` setup | `iscc` | [`setup`] |

pub mod exe;
pub mod setup;

use crate::bundler::context::{AppBundle, AppLayout, PackagerContext};
use crate::bundler::error::{Error, Result};
use crate::bundler::platform::{PackageType, Platform, PlatformPackager};
use crate::bundler::settings::Settings;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Windows variant.
#[derive(Debug, Clone, Copy, Default)]
pub struct WindowsPackager;

#[async_trait]
impl PlatformPackager for WindowsPackager {
    fn platform(&self) -> Platform {
        Platform::Windows
    }

    fn create_specific_app_structure(&self, settings: &Settings, app_folder: &Path) -> AppLayout {
        AppLayout {
            app_folder: app_folder.to_path_buf(),
            executable_folder: app_folder.to_path_buf(),
            executable: app_folder.join(format!("{}.exe", settings.name())),
            jar_folder: app_folder.to_path_buf(),
            resources_folder: app_folder.to_path_buf(),
            runtime_folder: app_folder.join(&settings.runtime().directory_name),
        }
    }

    async fn do_create_app(&self, ctx: &PackagerContext, bundle: &mut AppBundle) -> Result<()> {
        exe::create_exe(ctx, bundle).await
    }

    async fn do_generate_installers(
        &self,
        ctx: &PackagerContext,
        bundle: &AppBundle,
        installers: &mut Vec<(PackageType, PathBuf)>,
    ) -> Result<()> {
        let Some(windows) = ctx.settings.platform_settings().windows() else {
            return Err(Error::Validation("Windows settings are required".to_string()));
        };

        if windows.generate_setup {
            let setup = setup::create_setup(ctx, bundle)
                .await
                .map_err(|e| Error::installer("setup", e))?;
            installers.push((PackageType::Setup, setup));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::settings::{PackageSettings, SettingsBuilder};

    #[test]
    fn launcher_is_an_exe_in_the_app_folder() {
        let settings = SettingsBuilder::new()
            .package_settings(PackageSettings {
                name: "demo".into(),
                ..Default::default()
            })
            .main_class("com.example.Main")
            .output_directory("/out")
            .build()
            .unwrap();
        let layout = WindowsPackager.create_specific_app_structure(&settings, Path::new("/out/demo"));
        assert_eq!(layout.executable, PathBuf::from("/out/demo/demo.exe"));
        assert_eq!(layout.runtime_folder, PathBuf::from("/out/demo/jre"));
    }
}
