//! macOS `.app` bundles and installers.
//!
//! # Bundle Layout
//!
//! ```text
//! {name}/{name}.app/Contents/
//!     Info.plist
//!     PkgInfo
//!     MacOS/{name}                    launcher script
//!     Resources/{name}.icns
//!     Resources/Java/{jar}, libs/     runnable jar and dependencies
//!     PlugIns/{jre}/Contents/Home/    embedded runtime
//! ```
//!
//! # Installers
//!
//! | Format | Tool | Module |
//! |--------|------|--------|
//! | .dmg | `hdiutil` | [`dmg`] |
//! | .pkg | `pkgbuild` | [`dmg`] |

pub mod app;
pub mod dmg;

use crate::bundler::context::{AppBundle, AppLayout, PackagerContext};
use crate::bundler::error::{Error, Result};
use crate::bundler::platform::{PackageType, Platform, PlatformPackager};
use crate::bundler::settings::Settings;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Location of the `.app` directory inside the app folder.
pub fn app_bundle_path(settings: &Settings, app_folder: &Path) -> PathBuf {
    app_folder.join(format!("{}.app", settings.name()))
}

/// macOS variant.
#[derive(Debug, Clone, Copy, Default)]
pub struct MacPackager;

#[async_trait]
impl PlatformPackager for MacPackager {
    fn platform(&self) -> Platform {
        Platform::MacOs
    }

    fn create_specific_app_structure(&self, settings: &Settings, app_folder: &Path) -> AppLayout {
        let contents = app_bundle_path(settings, app_folder).join("Contents");
        let resources = contents.join("Resources");
        AppLayout {
            app_folder: app_folder.to_path_buf(),
            executable_folder: contents.join("MacOS"),
            executable: contents.join("MacOS").join(settings.name()),
            jar_folder: resources.join("Java"),
            resources_folder: resources,
            runtime_folder: contents
                .join("PlugIns")
                .join(&settings.runtime().directory_name)
                .join("Contents/Home"),
        }
    }

    async fn do_create_app(&self, ctx: &PackagerContext, bundle: &mut AppBundle) -> Result<()> {
        app::create_app(ctx, bundle).await
    }

    async fn do_generate_installers(
        &self,
        ctx: &PackagerContext,
        bundle: &AppBundle,
        installers: &mut Vec<(PackageType, PathBuf)>,
    ) -> Result<()> {
        let Some(mac) = ctx.settings.platform_settings().macos() else {
            return Err(Error::Validation("macOS settings are required".to_string()));
        };

        if mac.generate_dmg {
            let dmg = dmg::create_dmg(ctx, bundle)
                .await
                .map_err(|e| Error::installer("dmg", e))?;
            installers.push((PackageType::Dmg, dmg));
        }
        if mac.generate_pkg {
            let pkg = dmg::create_pkg(ctx, bundle)
                .await
                .map_err(|e| Error::installer("pkg", e))?;
            installers.push((PackageType::Pkg, pkg));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::settings::{PackageSettings, SettingsBuilder};

    #[test]
    fn layout_nests_inside_the_app_bundle() {
        let settings = SettingsBuilder::new()
            .package_settings(PackageSettings {
                name: "demo".into(),
                ..Default::default()
            })
            .main_class("com.example.Main")
            .output_directory("/out")
            .build()
            .unwrap();
        let layout = MacPackager.create_specific_app_structure(&settings, Path::new("/out/demo"));
        assert_eq!(layout.executable, PathBuf::from("/out/demo/demo.app/Contents/MacOS/demo"));
        assert_eq!(layout.jar_folder, PathBuf::from("/out/demo/demo.app/Contents/Resources/Java"));
        assert_eq!(
            layout.runtime_folder,
            PathBuf::from("/out/demo/demo.app/Contents/PlugIns/jre/Contents/Home")
        );
    }
}
