//! Per-platform packaging options.

use crate::bundler::platform::Platform;

/// GNU/Linux installer options.
#[derive(Clone, Debug)]
pub struct LinuxSettings {
    /// Build a `.deb` package.
    pub generate_deb: bool,
    /// Build an `.rpm` package.
    pub generate_rpm: bool,
    /// Desktop entry categories, `;` separated.
    pub categories: String,
}

impl Default for LinuxSettings {
    fn default() -> Self {
        Self {
            generate_deb: true,
            generate_rpm: true,
            categories: "Utility".to_string(),
        }
    }
}

/// macOS installer options.
#[derive(Clone, Debug)]
pub struct MacOsSettings {
    /// Build a `.dmg` disk image.
    pub generate_dmg: bool,
    /// Build a `.pkg` installer.
    pub generate_pkg: bool,
    /// `CFBundleIdentifier`. Defaults to `{main class package}.{name}`.
    pub bundle_identifier: Option<String>,
}

impl Default for MacOsSettings {
    fn default() -> Self {
        Self {
            generate_dmg: true,
            generate_pkg: true,
            bundle_identifier: None,
        }
    }
}

/// Windows installer options.
#[derive(Clone, Debug)]
pub struct WindowsSettings {
    /// Build an Inno Setup installer.
    pub generate_setup: bool,
    /// Wrap the jar in a GUI header; console otherwise.
    pub gui: bool,
    /// Stable installer id. Derived from the application name when absent.
    pub product_guid: Option<String>,
}

impl Default for WindowsSettings {
    fn default() -> Self {
        Self {
            generate_setup: true,
            gui: true,
            product_guid: None,
        }
    }
}

/// Platform-specific options, one variant per target.
#[derive(Clone, Debug)]
pub enum PlatformSettings {
    /// GNU/Linux target.
    Linux(LinuxSettings),
    /// macOS target.
    MacOs(MacOsSettings),
    /// Windows target.
    Windows(WindowsSettings),
}

impl PlatformSettings {
    /// Default options for `platform`.
    pub fn for_platform(platform: Platform) -> Self {
        match platform {
            Platform::Linux => PlatformSettings::Linux(LinuxSettings::default()),
            Platform::MacOs => PlatformSettings::MacOs(MacOsSettings::default()),
            Platform::Windows => PlatformSettings::Windows(WindowsSettings::default()),
        }
    }

    /// The targeted platform.
    pub fn platform(&self) -> Platform {
        match self {
            PlatformSettings::Linux(_) => Platform::Linux,
            PlatformSettings::MacOs(_) => Platform::MacOs,
            PlatformSettings::Windows(_) => Platform::Windows,
        }
    }

    /// Linux options, if targeting Linux.
    pub fn linux(&self) -> Option<&LinuxSettings> {
        match self {
            PlatformSettings::Linux(s) => Some(s),
            _ => None,
        }
    }

    /// macOS options, if targeting macOS.
    pub fn macos(&self) -> Option<&MacOsSettings> {
        match self {
            PlatformSettings::MacOs(s) => Some(s),
            _ => None,
        }
    }

    /// Windows options, if targeting Windows.
    pub fn windows(&self) -> Option<&WindowsSettings> {
        match self {
            PlatformSettings::Windows(s) => Some(s),
            _ => None,
        }
    }
}

impl Default for PlatformSettings {
    fn default() -> Self {
        Self::for_platform(Platform::current())
    }
}
