//! Packaging pipeline driver.
//!
//! This module provides [`Packager`], which runs the stages every platform
//! variant shares and delegates the platform-specific ones.
//!
//! # Overview
//!
//! The packager:
//! 1. Validates [`Settings`] paths
//! 2. Resolves the JDK used for runtime customization
//! 3. Assembles the app folder and embeds the runtime
//! 4. Lets the platform variant create the launcher
//! 5. Lets the variant generate installers, then writes generic bundles
//! 6. Returns [`InstallerArtifact`] results with sizes and checksums
//!
//! The first failing stage aborts the run; partial output is left in place.
//!
//! # Example
//!
//! ```no_run
//! use app_packager::bundler::{Packager, PackageSettings, SettingsBuilder};
//!
//! # async fn example() -> app_packager::bundler::Result<()> {
//! let settings = SettingsBuilder::new()
//!     .package_settings(PackageSettings {
//!         name: "demo".into(),
//!         version: "1.0".into(),
//!         ..Default::default()
//!     })
//!     .main_class("com.example.Main")
//!     .classes_directory(Some("target/classes".into()))
//!     .output_directory("target/package")
//!     .build()?;
//!
//! let mut packager = Packager::new(settings)?;
//! for artifact in packager.create_app().await? {
//!     println!("Created: {} ({} bytes)", artifact.path.display(), artifact.size);
//!     println!("SHA256: {}", artifact.sha256);
//! }
//! # Ok(())
//! # }
//! ```

use crate::bundler::archive::bundles;
use crate::bundler::context::{AppBundle, PackagerContext};
use crate::bundler::error::{Error, ErrorExt, Result};
use crate::bundler::platform::{PackageType, PlatformPackager, create_packager};
use crate::bundler::settings::{RuntimeSettings, Settings};
use crate::bundler::state::{PackagerPhase, PackagerState, PhaseRecord};
use crate::bundler::structure::ASSETS_FOLDER;
use crate::bundler::template::TemplateRenderer;
use crate::bundler::tool::{ExecutionEnv, ProcessInvoker, ToolInvoker};
use crate::bundler::utils::stage;
use crate::bundler::{InstallerArtifact, runtime, structure};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Drives one packaging run.
///
/// # Examples
///
/// ```no_run
/// use app_packager::bundler::{Packager, Settings};
///
/// # async fn example(settings: Settings) -> app_packager::bundler::Result<()> {
/// let mut packager = Packager::new(settings)?;
/// let artifacts = packager.create_app().await?;
/// println!("{} artifacts, final state {}", artifacts.len(), packager.state());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Packager {
    ctx: PackagerContext,
    state: PackagerState,
    bundle: Option<AppBundle>,
}

impl Packager {
    /// Creates a packager that runs real tools.
    pub fn new(settings: Settings) -> Result<Self> {
        Self::with_invoker(settings, Arc::new(ProcessInvoker::new()))
    }

    /// Creates a packager that sends every tool invocation to `invoker`.
    pub fn with_invoker(settings: Settings, invoker: Arc<dyn ToolInvoker>) -> Result<Self> {
        let renderer = TemplateRenderer::new(settings.assets_directory())?;
        let env = ExecutionEnv {
            working_dir: settings.output_directory().to_path_buf(),
            jdk_home: None,
            vars: Default::default(),
        };
        Ok(Self {
            ctx: PackagerContext {
                settings,
                renderer,
                invoker,
                env,
            },
            state: PackagerState::new(),
            bundle: None,
        })
    }

    /// Configuration of this run.
    pub fn settings(&self) -> &Settings {
        &self.ctx.settings
    }

    /// Current phase.
    pub fn state(&self) -> PackagerPhase {
        self.state.current()
    }

    /// Phases entered so far.
    pub fn history(&self) -> &[PhaseRecord] {
        self.state.history()
    }

    /// The app as assembled, once the structure stage has run.
    pub fn bundle(&self) -> Option<&AppBundle> {
        self.bundle.as_ref()
    }

    /// Runs every stage in order and returns the produced artifacts.
    ///
    /// Installers are listed in generation order, generic bundles last.
    pub async fn create_app(&mut self) -> Result<Vec<InstallerArtifact>> {
        stage::reset();
        match self.run().await {
            Ok(artifacts) => {
                self.state.advance(PackagerPhase::Done, None)?;
                Ok(artifacts)
            }
            Err(e) => {
                stage::reset();
                log::error!("Packaging failed: {e}");
                self.state.fail(e.to_string());
                Err(e)
            }
        }
    }

    async fn run(&mut self) -> Result<Vec<InstallerArtifact>> {
        if self.state.current() != PackagerPhase::Init {
            return Err(Error::GenericError(format!(
                "packager already ran (state: {})",
                self.state.current()
            )));
        }

        stage::begin("Validating configuration ...");
        validate(&self.ctx.settings)?;
        self.ctx.env.jdk_home = resolve_jdk_home(self.ctx.settings.runtime());
        if let Some(home) = &self.ctx.env.jdk_home {
            stage::info(format!("JDK: {}", home.display()));
        }
        stage::end("Configuration is valid");

        let variant = create_packager(self.ctx.settings.platform());
        let mut bundle = self.create_structure(variant.as_ref()).await?;

        stage::begin(format!("Creating {} app ...", variant.platform()));
        variant.do_create_app(&self.ctx, &mut bundle).await?;
        if !bundle.executable.exists() {
            return Err(Error::Structure(format!(
                "launcher {} was not created",
                bundle.executable.display()
            )));
        }
        stage::end(format!("App created in {}", bundle.app_folder.display()));
        self.state.advance(
            PackagerPhase::PlatformAppCreated,
            Some(bundle.executable.display().to_string()),
        )?;
        self.bundle = Some(bundle.clone());

        let mut produced = Vec::new();
        if self.ctx.settings.generate_installers() {
            stage::begin("Generating installers ...");
            variant
                .do_generate_installers(&self.ctx, &bundle, &mut produced)
                .await?;
            self.generic_bundles(&bundle, &mut produced).await?;
            for (package_type, path) in &produced {
                if !path.is_file() {
                    return Err(Error::ExternalTool {
                        tool: package_type.to_string(),
                        goal: "generate".to_string(),
                        reason: format!("{} was not produced", path.display()),
                    });
                }
            }
            stage::end(format!("{} installers generated", produced.len()));
            self.state.advance(PackagerPhase::InstallersGenerated, None)?;
        } else {
            stage::info("Installer generation skipped");
        }

        let mut artifacts = Vec::with_capacity(produced.len());
        for (package_type, path) in produced {
            artifacts.push(artifact(package_type, path).await?);
        }
        Ok(artifacts)
    }

    async fn create_structure(&mut self, variant: &dyn PlatformPackager) -> Result<AppBundle> {
        stage::begin("Creating app structure ...");
        let mut bundle = structure::assemble(&self.ctx, variant).await?;

        if self.ctx.settings.runtime().bundle {
            stage::begin("Embedding Java runtime ...");
            bundle.runtime_folder = runtime::customize(&self.ctx, &bundle).await?;
            stage::end("Runtime embedded");
        } else {
            stage::info("Runtime not bundled");
        }

        stage::end(format!("App structure created in {}", bundle.app_folder.display()));
        self.state.advance(
            PackagerPhase::StructureAssembled,
            Some(bundle.app_folder.display().to_string()),
        )?;
        self.bundle = Some(bundle.clone());
        Ok(bundle)
    }

    async fn generic_bundles(
        &self,
        bundle: &AppBundle,
        produced: &mut Vec<(PackageType, PathBuf)>,
    ) -> Result<()> {
        let settings = &self.ctx.settings;
        let mut requested = Vec::new();
        if settings.create_tarball() {
            requested.push(PackageType::Tarball);
        }
        if settings.create_zipball() {
            requested.push(PackageType::Zipball);
        }

        for package_type in requested {
            let dest = package_type.artifact_path(settings);
            stage::info(format!("Creating {} ...", dest.display()));
            let app_folder = bundle.app_folder.clone();
            let target = dest.clone();
            tokio::task::spawn_blocking(move || match package_type {
                PackageType::Tarball => bundles::create_tarball(&app_folder, &target),
                _ => bundles::create_zipball(&app_folder, &target),
            })
            .await
            .map_err(|e| Error::GenericError(format!("Join error: {}", e)))?
            .map_err(|e| Error::installer(package_type.short_name(), e))?;
            produced.push((package_type, dest));
        }
        Ok(())
    }
}

/// JDK used for jdeps and jlink: the configured path, else `JAVA_HOME`.
fn resolve_jdk_home(runtime: &RuntimeSettings) -> Option<PathBuf> {
    runtime.jdk_path.clone().or_else(|| {
        std::env::var_os("JAVA_HOME")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
    })
}

fn require_file(kind: &str, path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(Error::Validation(format!("{kind} {} does not exist", path.display())))
    }
}

fn require_dir(kind: &str, path: &Path) -> Result<()> {
    if path.is_dir() {
        Ok(())
    } else {
        Err(Error::Validation(format!("{kind} {} is not a directory", path.display())))
    }
}

/// Checks that every configured input exists before anything is written.
pub fn validate(settings: &Settings) -> Result<()> {
    if settings.name().eq_ignore_ascii_case(ASSETS_FOLDER) {
        return Err(Error::Validation(format!(
            "app name '{ASSETS_FOLDER}' collides with the assets folder"
        )));
    }
    if let Some(icon) = settings.icon_file() {
        require_file("icon", icon)?;
    }
    if let Some(license) = &settings.package().license_file {
        require_file("license file", license)?;
    }

    let runtime = settings.runtime();
    if let Some(path) = &runtime.runtime_path {
        require_dir("runtime", path)?;
        if !RuntimeSettings::is_runtime_dir(path) {
            return Err(Error::Validation(format!(
                "runtime {} does not contain bin/java",
                path.display()
            )));
        }
    }
    if let Some(jdk) = &runtime.jdk_path {
        require_dir("JDK", jdk)?;
    }
    for path in &runtime.additional_module_paths {
        if !path.exists() {
            return Err(Error::Validation(format!(
                "module path {} does not exist",
                path.display()
            )));
        }
    }

    match (settings.runnable_archive(), settings.classes_directory()) {
        (Some(jar), _) => require_file("runnable jar", jar)?,
        (None, Some(classes)) => require_dir("classes directory", classes)?,
        (None, None) => {
            return Err(Error::Validation(
                "either runnable_archive or classes_directory is required".to_string(),
            ));
        }
    }

    for resource in settings.additional_resources() {
        if !resource.exists() {
            return Err(Error::Validation(format!(
                "resource {} does not exist",
                resource.display()
            )));
        }
    }
    for dependency in settings.dependencies() {
        require_file("dependency", dependency)?;
    }
    for script in settings.scripts().all() {
        require_file("script", script)?;
    }
    Ok(())
}

async fn artifact(package_type: PackageType, path: PathBuf) -> Result<InstallerArtifact> {
    let size = tokio::fs::metadata(&path)
        .await
        .fs_context("reading artifact metadata", &path)?
        .len();
    let sha256 = calculate_sha256(&path).await?;
    Ok(InstallerArtifact {
        package_type,
        path,
        size,
        sha256,
    })
}

/// Calculates the SHA256 checksum of a file.
///
/// Reads in 8KB chunks and returns the hex-encoded digest (64 characters).
pub async fn calculate_sha256(path: &Path) -> Result<String> {
    use sha2::{Digest, Sha256};
    use tokio::io::AsyncReadExt;

    let mut file = tokio::fs::File::open(path)
        .await
        .fs_context("opening artifact", path)?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; 8192];

    loop {
        let n = file.read(&mut buffer).await.map_err(Error::IoError)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::settings::{PackageSettings, SettingsBuilder};

    fn builder(root: &Path) -> SettingsBuilder {
        SettingsBuilder::new()
            .package_settings(PackageSettings {
                name: "demo".into(),
                version: "1.0".into(),
                ..Default::default()
            })
            .main_class("com.example.Main")
            .output_directory(root.join("out"))
    }

    #[test]
    fn jar_or_classes_are_required() {
        let dir = tempfile::tempdir().unwrap();
        let settings = builder(dir.path()).build().unwrap();
        assert!(matches!(validate(&settings), Err(Error::Validation(_))));

        std::fs::create_dir_all(dir.path().join("classes")).unwrap();
        let settings = builder(dir.path())
            .classes_directory(Some(dir.path().join("classes")))
            .build()
            .unwrap();
        validate(&settings).unwrap();
    }

    #[test]
    fn runtime_without_java_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("classes")).unwrap();
        std::fs::create_dir_all(dir.path().join("runtime/bin")).unwrap();
        let settings = builder(dir.path())
            .classes_directory(Some(dir.path().join("classes")))
            .runtime(RuntimeSettings {
                runtime_path: Some(dir.path().join("runtime")),
                ..Default::default()
            })
            .build()
            .unwrap();
        let err = validate(&settings).unwrap_err();
        assert!(err.to_string().contains("bin/java"));
    }

    #[test]
    fn app_named_like_the_assets_folder_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("classes")).unwrap();
        let settings = builder(dir.path())
            .package_settings(PackageSettings {
                name: "Assets".into(),
                version: "1.0".into(),
                ..Default::default()
            })
            .classes_directory(Some(dir.path().join("classes")))
            .build()
            .unwrap();
        let err = validate(&settings).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(err.to_string().contains("assets folder"));
    }

    #[test]
    fn missing_icon_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("classes")).unwrap();
        let settings = builder(dir.path())
            .classes_directory(Some(dir.path().join("classes")))
            .icon_file(Some(dir.path().join("missing.png")))
            .build()
            .unwrap();
        assert!(matches!(validate(&settings), Err(Error::Validation(_))));
    }

    #[tokio::test]
    async fn sha256_of_known_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, "abc").unwrap();
        assert_eq!(
            calculate_sha256(&path).await.unwrap(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn explicit_jdk_wins() {
        let runtime = RuntimeSettings {
            jdk_path: Some("/opt/jdk".into()),
            ..Default::default()
        };
        assert_eq!(resolve_jdk_home(&runtime), Some(PathBuf::from("/opt/jdk")));
    }
}
