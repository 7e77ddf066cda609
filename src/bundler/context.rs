//! Shared state threaded through the pipeline stages.
//!
//! [`PackagerContext`] is built once per run and only read afterwards.
//! [`AppBundle`] records what has been written to disk so far and is the
//! only value the stages mutate.

use crate::bundler::settings::Settings;
use crate::bundler::template::TemplateRenderer;
use crate::bundler::tool::{ExecutionEnv, ToolInvoker};
use std::path::PathBuf;
use std::sync::Arc;

/// Variant-specific destinations inside the app folder.
///
/// Produced by `create_specific_app_structure` without touching the disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppLayout {
    /// Root of the app (the folder installers ship).
    pub app_folder: PathBuf,
    /// Folder holding the launcher.
    pub executable_folder: PathBuf,
    /// Launcher path.
    pub executable: PathBuf,
    /// Folder holding the runnable jar and the `libs` folder.
    pub jar_folder: PathBuf,
    /// Folder receiving additional resources.
    pub resources_folder: PathBuf,
    /// Folder receiving the bundled runtime.
    pub runtime_folder: PathBuf,
}

/// On-disk app being built.
#[derive(Debug, Clone)]
pub struct AppBundle {
    /// Root of the app.
    pub app_folder: PathBuf,
    /// Build-time assets (rendered templates, converted icons).
    pub assets_folder: PathBuf,
    /// Launcher path.
    pub executable: PathBuf,
    /// Folder holding the launcher.
    pub executable_folder: PathBuf,
    /// Dependencies root.
    pub jar_folder: PathBuf,
    /// Dependency jars folder, `{jar_folder}/libs`.
    pub libs_folder: PathBuf,
    /// Folder receiving additional resources.
    pub resources_folder: PathBuf,
    /// Bundled runtime, present only when a runtime is embedded.
    pub runtime_folder: Option<PathBuf>,
    /// Runnable jar.
    pub jar_file: PathBuf,
    /// Resolved icon source.
    pub icon_file: PathBuf,
}

/// Read-only collaborators of a run.
#[derive(Clone)]
pub struct PackagerContext {
    /// Validated configuration.
    pub settings: Settings,
    /// Template registry.
    pub renderer: TemplateRenderer,
    /// External tool runner.
    pub invoker: Arc<dyn ToolInvoker>,
    /// Environment for tool invocations.
    pub env: ExecutionEnv,
}

impl std::fmt::Debug for PackagerContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackagerContext")
            .field("settings", &self.settings)
            .field("renderer", &self.renderer)
            .field("invoker", &"<dyn ToolInvoker>")
            .field("env", &self.env)
            .finish()
    }
}
