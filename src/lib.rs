//! # app_packager
//!
//! Turns a compiled JVM application into a self-contained, natively
//! launchable app and platform installers.
//!
//! ## Features
//!
//! - **Runnable jar**: built from a classes directory with a generated manifest
//! - **Reduced runtime**: modules derived with `jdeps`, image built with `jlink`
//! - **Launchers**: shell launcher on Linux, `.app` bundle on macOS, launch4j exe on Windows
//! - **Installers**: deb and rpm, dmg and pkg, Inno Setup, plus tar.gz and zip bundles
//!
//! ## Usage
//!
//! ```bash
//! app_packager package                      # uses ./packager.toml
//! app_packager package -p linux --no-installers
//! app_packager validate -c app/packager.toml
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod bundler;
pub mod cli;
pub mod error;
pub mod metadata;

pub use bundler::{InstallerArtifact, PackageType, Packager, Settings, SettingsBuilder};
pub use cli::Args;
pub use error::{CliError, PackagerError, Result};
