//! Platform variants of the packaging pipeline.
//!
//! Every variant implements [`PlatformPackager`]. The driver asks the variant
//! where things go ([`PlatformPackager::create_specific_app_structure`]), how
//! to turn the assembled folder into a runnable app
//! ([`PlatformPackager::do_create_app`]) and which installers to produce
//! ([`PlatformPackager::do_generate_installers`]).
//!
//! | Platform | Installers | Module |
//! |----------|------------|--------|
//! | Linux | .deb, .rpm | [`linux`] |
//! | macOS | .dmg, .pkg | [`macos`] |
//! | Windows | setup .exe (Inno Setup) | [`windows`] |
//!
//! Variant code is plain Rust on every host; only the external tools it
//! drives are platform bound.

pub mod linux;
pub mod macos;
pub mod windows;

use crate::bundler::context::{AppBundle, AppLayout, PackagerContext};
use crate::bundler::error::Result;
use crate::bundler::settings::Settings;
use async_trait::async_trait;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Target platform.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Platform {
    /// GNU/Linux.
    Linux,
    /// macOS.
    MacOs,
    /// Windows.
    Windows,
}

impl Platform {
    /// The host platform. Unknown unix flavours are treated as Linux.
    pub fn current() -> Self {
        if cfg!(target_os = "macos") {
            Platform::MacOs
        } else if cfg!(target_os = "windows") {
            Platform::Windows
        } else {
            Platform::Linux
        }
    }

    /// Sub-folder of the assets directory holding this platform's defaults.
    pub fn assets_subdir(&self) -> &'static str {
        match self {
            Platform::Linux => "linux",
            Platform::MacOs => "mac",
            Platform::Windows => "windows",
        }
    }

    /// Icon extension looked up in the assets directory.
    pub fn icon_extension(&self) -> &'static str {
        match self {
            Platform::Linux => "png",
            Platform::MacOs => "icns",
            Platform::Windows => "ico",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Platform::Linux => "linux",
            Platform::MacOs => "mac",
            Platform::Windows => "windows",
        })
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "linux" => Ok(Platform::Linux),
            "mac" | "macos" => Ok(Platform::MacOs),
            "windows" => Ok(Platform::Windows),
            "auto" => Ok(Platform::current()),
            other => Err(format!("unknown platform {other} (expected linux, mac, windows or auto)")),
        }
    }
}

/// Installer formats the packager produces.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum PackageType {
    /// Debian package (.deb).
    Deb,
    /// RPM package (.rpm).
    Rpm,
    /// macOS disk image (.dmg).
    Dmg,
    /// macOS installer package (.pkg).
    Pkg,
    /// Windows Inno Setup installer (.exe).
    Setup,
    /// Gzipped tarball of the app folder.
    Tarball,
    /// Zip archive of the app folder.
    Zipball,
}

impl PackageType {
    /// Returns the short name for this package type.
    pub fn short_name(&self) -> &'static str {
        match self {
            PackageType::Deb => "deb",
            PackageType::Rpm => "rpm",
            PackageType::Dmg => "dmg",
            PackageType::Pkg => "pkg",
            PackageType::Setup => "setup",
            PackageType::Tarball => "tarball",
            PackageType::Zipball => "zipball",
        }
    }

    /// File extension of the produced artifact.
    pub fn extension(&self) -> &'static str {
        match self {
            PackageType::Deb => "deb",
            PackageType::Rpm => "rpm",
            PackageType::Dmg => "dmg",
            PackageType::Pkg => "pkg",
            PackageType::Setup => "exe",
            PackageType::Tarball => "tar.gz",
            PackageType::Zipball => "zip",
        }
    }

    /// Canonical artifact path, `{output}/{name}_{version}.{ext}`.
    pub fn artifact_path(&self, settings: &Settings) -> PathBuf {
        settings.output_directory().join(format!(
            "{}.{}",
            settings.installer_base_name(),
            self.extension()
        ))
    }
}

impl fmt::Display for PackageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.short_name())
    }
}

/// Platform-specific steps of the pipeline.
#[async_trait]
pub trait PlatformPackager: Send + Sync {
    /// The platform this variant targets.
    fn platform(&self) -> Platform;

    /// Destinations of the launcher, jar, resources and runtime inside `app_folder`.
    ///
    /// Pure: performs no I/O.
    fn create_specific_app_structure(&self, settings: &Settings, app_folder: &Path) -> AppLayout;

    /// Turns the assembled folder into a runnable app. The launcher must be
    /// executable when this returns.
    async fn do_create_app(&self, ctx: &PackagerContext, bundle: &mut AppBundle) -> Result<()>;

    /// Produces the requested installers, appending each artifact in order.
    async fn do_generate_installers(
        &self,
        ctx: &PackagerContext,
        bundle: &AppBundle,
        installers: &mut Vec<(PackageType, PathBuf)>,
    ) -> Result<()>;
}

/// Returns the variant for `platform`.
pub fn create_packager(platform: Platform) -> Box<dyn PlatformPackager> {
    match platform {
        Platform::Linux => Box::new(linux::LinuxPackager),
        Platform::MacOs => Box::new(macos::MacPackager),
        Platform::Windows => Box::new(windows::WindowsPackager),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factory_selects_variant() {
        for platform in [Platform::Linux, Platform::MacOs, Platform::Windows] {
            assert_eq!(create_packager(platform).platform(), platform);
        }
    }

    #[test]
    fn platform_parsing() {
        assert_eq!("Linux".parse::<Platform>().unwrap(), Platform::Linux);
        assert_eq!("macos".parse::<Platform>().unwrap(), Platform::MacOs);
        assert!("beos".parse::<Platform>().is_err());
    }

    #[test]
    fn extensions() {
        assert_eq!(PackageType::Setup.extension(), "exe");
        assert_eq!(PackageType::Tarball.extension(), "tar.gz");
        assert_eq!(PackageType::Deb.to_string(), "deb");
    }
}
