//! Embedded Java runtime: verbatim copy or a jlink-reduced image.
//!
//! The module set comes from the configuration when listed explicitly,
//! otherwise from a `jdeps -s` summary of the runnable jar and its
//! dependencies. The summary edges form a graph and every module reachable
//! from the runnable jar is kept, as long as jlink can find it on the module
//! path. Analysis problems never fail the run; the image then contains every
//! module of the JDK.

use crate::bundler::context::{AppBundle, PackagerContext};
use crate::bundler::error::{Error, Result};
use crate::bundler::tool::{Tool, ToolInvocationSpec, args_tree};
use crate::bundler::utils::fs::{copy_dir, remove_dir_all, set_owner_executable};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Bfs;
use regex::Regex;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

const NOT_FOUND: &str = "not found";
const ALL_MODULES: &str = "ALL-MODULE-PATH";

static SUMMARY_EDGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(\S+)\s+->\s+(.+?)\s*$").expect("summary edge pattern is valid")
});

/// Modules linked into the reduced runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleSet {
    /// Exactly these modules.
    Modules(BTreeSet<String>),
    /// Every module on the module path.
    AllModules,
}

impl ModuleSet {
    /// Value of jlink's `--add-modules`.
    pub fn add_modules_arg(&self) -> String {
        match self {
            ModuleSet::Modules(modules) => modules.iter().cloned().collect::<Vec<_>>().join(","),
            ModuleSet::AllModules => ALL_MODULES.to_string(),
        }
    }

    fn with_additional(self, additional: &[String]) -> Self {
        match self {
            ModuleSet::Modules(mut modules) => {
                modules.extend(additional.iter().cloned());
                ModuleSet::Modules(modules)
            }
            ModuleSet::AllModules => ModuleSet::AllModules,
        }
    }
}

/// Parses `jdeps -s` output into a dependency graph keyed by node name.
pub fn parse_summary(output: &str) -> (DiGraph<String, ()>, HashMap<String, NodeIndex>) {
    let mut graph = DiGraph::new();
    let mut nodes: HashMap<String, NodeIndex> = HashMap::new();

    for line in output.lines() {
        let Some(caps) = SUMMARY_EDGE.captures(line) else {
            continue;
        };
        let from = node_for(&mut graph, &mut nodes, &caps[1]);
        let to = node_for(&mut graph, &mut nodes, &caps[2]);
        graph.update_edge(from, to, ());
    }
    (graph, nodes)
}

fn node_for(
    graph: &mut DiGraph<String, ()>,
    nodes: &mut HashMap<String, NodeIndex>,
    name: &str,
) -> NodeIndex {
    *nodes
        .entry(name.to_string())
        .or_insert_with(|| graph.add_node(name.to_string()))
}

/// Modules reachable from `root` in a `jdeps -s` summary.
///
/// Fails when an archive on the path has an unresolved dependency or when
/// nothing is reachable.
pub fn derive_modules(summary: &str, root: &str) -> Result<BTreeSet<String>> {
    let (graph, nodes) = parse_summary(summary);
    let start = nodes.get(root).copied().ok_or_else(|| {
        Error::RuntimeCustomization(format!("jdeps reported no dependencies for {root}"))
    })?;

    let mut modules = BTreeSet::new();
    let mut bfs = Bfs::new(&graph, start);
    while let Some(index) = bfs.next(&graph) {
        let name = &graph[index];
        if name == NOT_FOUND {
            return Err(Error::RuntimeCustomization(
                "jdeps could not resolve every dependency".to_string(),
            ));
        }
        if index != start && !name.ends_with(".jar") && !name.contains(char::is_whitespace) {
            modules.insert(name.clone());
        }
    }

    if modules.is_empty() {
        return Err(Error::RuntimeCustomization(format!(
            "jdeps found no modules required by {root}"
        )));
    }
    Ok(modules)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

async fn analyze(ctx: &PackagerContext, bundle: &AppBundle) -> Result<BTreeSet<String>> {
    let mut args = vec![
        "-s".to_string(),
        "--multi-release".to_string(),
        "base".to_string(),
        bundle.jar_file.to_string_lossy().into_owned(),
    ];
    args.extend(
        ctx.settings
            .dependencies()
            .iter()
            .map(|d| d.to_string_lossy().into_owned()),
    );

    let spec = ToolInvocationSpec::new(Tool::Jdeps, "jdeps", vec![args_tree(args)], ctx.env.clone());
    let output = ctx
        .invoker
        .invoke(&spec)
        .await
        .map_err(|e| Error::RuntimeCustomization(e.to_string()))?;
    derive_modules(&output.stdout, &file_name(&bundle.jar_file))
}

/// Module path searched by jlink: `{jdk}/jmods` followed by the extra paths.
pub fn module_path(jdk_home: &Path, additional_module_paths: &[PathBuf]) -> Vec<PathBuf> {
    std::iter::once(jdk_home.join("jmods"))
        .chain(additional_module_paths.iter().cloned())
        .collect()
}

/// Whether `name` exists on `module_path` as a packaged or exploded module.
pub fn module_resolvable(name: &str, module_path: &[PathBuf]) -> bool {
    module_path
        .iter()
        .any(|dir| dir.join(format!("{name}.jmod")).is_file() || dir.join(name).is_dir())
}

/// Drops the names jlink would not find on `module_path`.
///
/// Modular dependency jars appear in a jdeps summary under their module
/// name and are only linkable when they sit on the module path.
pub fn retain_resolvable(
    modules: BTreeSet<String>,
    module_path: &[PathBuf],
) -> Result<BTreeSet<String>> {
    let (kept, dropped): (BTreeSet<String>, BTreeSet<String>) = modules
        .into_iter()
        .partition(|m| module_resolvable(m, module_path));
    if !dropped.is_empty() {
        log::info!(
            "Not on the module path: {}",
            dropped.into_iter().collect::<Vec<_>>().join(", ")
        );
    }
    if kept.is_empty() {
        return Err(Error::RuntimeCustomization(
            "none of the required modules is on the module path".to_string(),
        ));
    }
    Ok(kept)
}

/// Decides which modules the reduced runtime contains.
pub async fn resolve_modules(ctx: &PackagerContext, bundle: &AppBundle) -> ModuleSet {
    let runtime = ctx.settings.runtime();
    if !runtime.customize {
        return ModuleSet::AllModules;
    }
    if !runtime.modules.explicit.is_empty() {
        let explicit = runtime.modules.explicit.iter().cloned().collect();
        return ModuleSet::Modules(explicit).with_additional(&runtime.modules.additional);
    }
    let Some(jdk_home) = ctx.env.jdk_home.as_deref() else {
        log::warn!("No JDK to analyze against; bundling all modules");
        return ModuleSet::AllModules;
    };
    let search = module_path(jdk_home, &runtime.additional_module_paths);
    match analyze(ctx, bundle)
        .await
        .and_then(|derived| retain_resolvable(derived, &search))
    {
        Ok(derived) => {
            let names = derived.iter().cloned().collect::<Vec<_>>().join(", ");
            log::info!("Required modules: {names}");
            ModuleSet::Modules(derived).with_additional(&runtime.modules.additional)
        }
        Err(e) => {
            log::warn!("{e}; bundling all modules");
            ModuleSet::AllModules
        }
    }
}

/// jlink arguments producing `output` from `jdk_home` with `modules`.
pub fn jlink_args(
    jdk_home: &Path,
    additional_module_paths: &[PathBuf],
    modules: &ModuleSet,
    output: &Path,
) -> Vec<String> {
    let separator = if cfg!(windows) { ";" } else { ":" };
    let joined = module_path(jdk_home, additional_module_paths)
        .iter()
        .map(|p| p.to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(separator);

    vec![
        "--module-path".to_string(),
        joined,
        "--add-modules".to_string(),
        modules.add_modules_arg(),
        "--output".to_string(),
        output.to_string_lossy().into_owned(),
        "--no-header-files".to_string(),
        "--no-man-pages".to_string(),
        "--strip-debug".to_string(),
        "--compress=2".to_string(),
    ]
}

/// Places a runtime in the bundle's runtime folder.
///
/// Returns `None` when no runtime is embedded.
pub async fn customize(ctx: &PackagerContext, bundle: &AppBundle) -> Result<Option<PathBuf>> {
    let runtime = ctx.settings.runtime();
    let Some(destination) = bundle.runtime_folder.clone().filter(|_| runtime.bundle) else {
        return Ok(None);
    };

    if let Some(source) = &runtime.runtime_path {
        log::info!("Copying runtime from {}", source.display());
        copy_dir(source, &destination).await?;
        let java = destination.join("bin/java");
        if java.is_file() {
            set_owner_executable(&java).await?;
        }
        return Ok(Some(destination));
    }

    let jdk_home = ctx.env.jdk_home.as_deref().ok_or_else(|| {
        Error::Validation(
            "a JDK is required to build the runtime; set runtime.jdk_path or JAVA_HOME".to_string(),
        )
    })?;

    let modules = resolve_modules(ctx, bundle).await;
    if destination.exists() {
        remove_dir_all(&destination).await?;
    }
    let args = jlink_args(jdk_home, &runtime.additional_module_paths, &modules, &destination);
    let spec = ToolInvocationSpec::new(Tool::Jlink, "jlink", vec![args_tree(args)], ctx.env.clone());
    ctx.invoker.invoke(&spec).await?;

    log::info!("Runtime created in {}", destination.display());
    Ok(Some(destination))
}
