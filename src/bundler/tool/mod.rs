//! External packaging tool invocation.
//!
//! Every installer format and the runtime customizer describe the work they
//! need as a [`ToolInvocationSpec`]: a tool identity, a goal and a typed
//! configuration tree built with [`element`] and [`element_tree`]. The
//! invocation is handed to a [`ToolInvoker`]; [`ProcessInvoker`] is the production
//! implementation, tests substitute a recording fake.
//!
//! # Example
//!
//! ```
//! use app_packager::bundler::tool::{element, element_tree};
//!
//! let config = element_tree("configuration", vec![
//!     element("controlDir", "/out/assets/control"),
//!     element("deb", "/out/demo_1.0.deb"),
//! ]);
//! assert_eq!(config.child_text("deb"), Some("/out/demo_1.0.deb"));
//! ```

pub mod jdeb;
pub mod rpmbuild;

use crate::bundler::error::{Error, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Value of a configuration node: text or nested nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeValue {
    /// Leaf text.
    Text(String),
    /// Ordered child nodes.
    Children(Vec<ConfigNode>),
}

/// A named node of a tool configuration tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigNode {
    /// Element name.
    pub name: String,
    /// Text or children.
    pub value: NodeValue,
}

/// Creates a text node.
pub fn element(name: impl Into<String>, text: impl Into<String>) -> ConfigNode {
    ConfigNode {
        name: name.into(),
        value: NodeValue::Text(text.into()),
    }
}

/// Creates a node holding `children` in order.
pub fn element_tree(name: impl Into<String>, children: Vec<ConfigNode>) -> ConfigNode {
    ConfigNode {
        name: name.into(),
        value: NodeValue::Children(children),
    }
}

impl ConfigNode {
    /// Leaf text, `None` for tree nodes.
    pub fn text(&self) -> Option<&str> {
        match &self.value {
            NodeValue::Text(t) => Some(t),
            NodeValue::Children(_) => None,
        }
    }

    /// Child nodes, empty for leaves.
    pub fn children(&self) -> &[ConfigNode] {
        match &self.value {
            NodeValue::Children(c) => c,
            NodeValue::Text(_) => &[],
        }
    }

    /// First child called `name`.
    pub fn child(&self, name: &str) -> Option<&ConfigNode> {
        self.children().iter().find(|c| c.name == name)
    }

    /// Text of the first child called `name`.
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name).and_then(ConfigNode::text)
    }

    /// All children called `name`, in order.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a ConfigNode> {
        self.children().iter().filter(move |c| c.name == name)
    }

    /// Text of a required child, or an error naming the missing key.
    pub fn require_text(&self, name: &str) -> Result<&str> {
        self.child_text(name).ok_or_else(|| {
            Error::GenericError(format!("missing <{name}> in <{}> configuration", self.name))
        })
    }

    /// Boolean text of a child. Absent children read as `default`.
    pub fn child_flag(&self, name: &str, default: bool) -> bool {
        self.child_text(name)
            .map(|t| t.trim().eq_ignore_ascii_case("true"))
            .unwrap_or(default)
    }
}

/// Builds the `args` tree used by subprocess tools.
pub fn args_tree<I, S>(args: I) -> ConfigNode
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    element_tree("args", args.into_iter().map(|a| element("arg", a)).collect())
}

/// External tools the packager drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tool {
    /// Module dependency analysis.
    Jdeps,
    /// Reduced runtime linker.
    Jlink,
    /// Debian package writer.
    Jdeb,
    /// RPM package builder.
    Rpmbuild,
    /// Windows exe wrapper.
    Launch4j,
    /// Inno Setup compiler.
    InnoSetup,
    /// macOS disk image tool.
    Hdiutil,
    /// macOS installer package tool.
    Pkgbuild,
}

impl Tool {
    /// Program name on disk (without platform suffix).
    pub fn program(&self) -> &'static str {
        match self {
            Tool::Jdeps => "jdeps",
            Tool::Jlink => "jlink",
            Tool::Jdeb => "jdeb",
            Tool::Rpmbuild => "rpmbuild",
            Tool::Launch4j => "launch4jc",
            Tool::InnoSetup => "iscc",
            Tool::Hdiutil => "hdiutil",
            Tool::Pkgbuild => "pkgbuild",
        }
    }

    /// Whether the program ships with the JDK.
    pub fn from_jdk(&self) -> bool {
        matches!(self, Tool::Jdeps | Tool::Jlink)
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.program())
    }
}

/// Process environment for a tool invocation.
#[derive(Debug, Clone, Default)]
pub struct ExecutionEnv {
    /// Working directory of the subprocess.
    pub working_dir: PathBuf,
    /// JDK used to resolve JDK tools.
    pub jdk_home: Option<PathBuf>,
    /// Extra environment variables.
    pub vars: BTreeMap<String, String>,
}

/// One request to run an external tool.
#[derive(Debug, Clone)]
pub struct ToolInvocationSpec {
    /// Tool to run.
    pub tool: Tool,
    /// Goal or operation id.
    pub goal: String,
    /// Typed configuration tree.
    pub configuration: ConfigNode,
    /// Process environment.
    pub env: ExecutionEnv,
}

impl ToolInvocationSpec {
    /// Creates a spec with a `configuration` root holding `children`.
    pub fn new(
        tool: Tool,
        goal: impl Into<String>,
        children: Vec<ConfigNode>,
        env: ExecutionEnv,
    ) -> Self {
        Self {
            tool,
            goal: goal.into(),
            configuration: element_tree("configuration", children),
            env,
        }
    }

    /// Builds an [`Error::ExternalTool`] for this invocation.
    pub fn failure(&self, reason: impl Into<String>) -> Error {
        Error::ExternalTool {
            tool: self.tool.to_string(),
            goal: self.goal.clone(),
            reason: reason.into(),
        }
    }

    /// Arguments listed under `args/arg`.
    pub fn args(&self) -> Vec<String> {
        self.configuration
            .child("args")
            .map(|args| {
                args.children_named("arg")
                    .filter_map(ConfigNode::text)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Captured result of a successful invocation.
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    /// Standard output, lossily decoded.
    pub stdout: String,
}

/// Runs external packaging tools.
#[async_trait]
pub trait ToolInvoker: Send + Sync {
    /// Runs the tool described by `spec`.
    ///
    /// Fails with [`Error::ExternalTool`] when the tool reports a failure and
    /// [`Error::ToolNotFound`] when it is not installed.
    async fn invoke(&self, spec: &ToolInvocationSpec) -> Result<ToolOutput>;
}

/// Production invoker: `jdeb` in-process, everything else as a subprocess.
#[derive(Debug, Clone, Default)]
pub struct ProcessInvoker;

impl ProcessInvoker {
    /// Creates a new invoker.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ToolInvoker for ProcessInvoker {
    async fn invoke(&self, spec: &ToolInvocationSpec) -> Result<ToolOutput> {
        log::debug!("invoking {} goal {}", spec.tool, spec.goal);
        match spec.tool {
            Tool::Jdeb => {
                jdeb::build_package(&spec.configuration)
                    .await
                    .map_err(|e| spec.failure(e.to_string()))?;
                Ok(ToolOutput::default())
            }
            Tool::Rpmbuild => {
                let program = resolve_program(spec.tool, spec.env.jdk_home.as_deref())?;
                rpmbuild::build_package(&program, spec).await?;
                Ok(ToolOutput::default())
            }
            tool => {
                let program = resolve_program(tool, spec.env.jdk_home.as_deref())?;
                run_process(&program, &spec.args(), spec).await
            }
        }
    }
}

/// Locates the executable for `tool`.
///
/// JDK tools are taken from `{jdk_home}/bin` when it is set and contains
/// them; otherwise the program is looked up on `PATH`.
pub fn resolve_program(tool: Tool, jdk_home: Option<&Path>) -> Result<PathBuf> {
    if tool.from_jdk()
        && let Some(home) = jdk_home
    {
        let candidate = home
            .join("bin")
            .join(format!("{}{}", tool.program(), std::env::consts::EXE_SUFFIX));
        if candidate.is_file() {
            return Ok(candidate);
        }
    }
    which::which(tool.program()).map_err(|_| Error::ToolNotFound {
        tool: tool.to_string(),
        searched: match jdk_home {
            Some(home) if tool.from_jdk() => format!("{}/bin and PATH", home.display()),
            _ => "PATH".to_string(),
        },
    })
}

/// Runs `program` with `args`, failing on a non-zero exit status.
pub(crate) async fn run_process(
    program: &Path,
    args: &[String],
    spec: &ToolInvocationSpec,
) -> Result<ToolOutput> {
    let mut command = tokio::process::Command::new(program);
    command.args(args).envs(&spec.env.vars);
    if !spec.env.working_dir.as_os_str().is_empty() {
        command.current_dir(&spec.env.working_dir);
    }
    if let Some(home) = &spec.env.jdk_home {
        command.env("JAVA_HOME", home);
    }

    log::debug!("running {} {}", program.display(), args.join(" "));
    let output = command.output().await.map_err(|error| Error::CommandFailed {
        command: program.display().to_string(),
        error,
    })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(spec.failure(format!("{}: {}", output.status, stderr.trim())));
    }

    Ok(ToolOutput {
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tree_lookup_and_args() {
        let spec = ToolInvocationSpec::new(
            Tool::Jlink,
            "jlink",
            vec![
                args_tree(["--add-modules", "java.base"]),
                element("flag", "TRUE"),
            ],
            ExecutionEnv::default(),
        );
        assert_eq!(spec.args(), vec!["--add-modules", "java.base"]);
        assert!(spec.configuration.child_flag("flag", false));
        assert!(!spec.configuration.child_flag("missing", false));
        assert!(spec.configuration.child_text("args").is_none());
    }

    #[test]
    fn missing_key_is_reported() {
        let node = element_tree("data", vec![element("type", "file")]);
        let err = node.require_text("src").unwrap_err();
        assert!(err.to_string().contains("<src>"));
    }

    #[test]
    fn failure_names_tool_and_goal() {
        let spec = ToolInvocationSpec::new(Tool::Jdeb, "jdeb", vec![], ExecutionEnv::default());
        let err = spec.failure("broken");
        assert_eq!(err.to_string(), "jdeb jdeb failed: broken");
    }
}
