use std::path::{Path, PathBuf};

/// Module names requested for the reduced runtime.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleSpec {
    /// Complete module list. When non-empty, no analysis is run.
    pub explicit: Vec<String>,
    /// Modules always added to the explicit or derived set.
    pub additional: Vec<String>,
}

/// How the Java runtime is embedded in the app.
#[derive(Debug, Clone)]
pub struct RuntimeSettings {
    /// Embed a runtime at all.
    pub bundle: bool,
    /// Reduce the runtime to the required modules.
    pub customize: bool,
    /// Prebuilt runtime copied verbatim.
    pub runtime_path: Option<PathBuf>,
    /// JDK providing `jdeps`, `jlink` and `jmods`.
    pub jdk_path: Option<PathBuf>,
    /// Name of the runtime folder inside the app.
    pub directory_name: String,
    /// Requested modules.
    pub modules: ModuleSpec,
    /// Extra `--module-path` entries for jlink.
    pub additional_module_paths: Vec<PathBuf>,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            bundle: false,
            customize: true,
            runtime_path: None,
            jdk_path: None,
            directory_name: "jre".to_string(),
            modules: ModuleSpec::default(),
            additional_module_paths: Vec::new(),
        }
    }
}

impl RuntimeSettings {
    /// Path of the java launcher relative to the folder holding the runtime.
    pub fn java_binary(&self) -> String {
        format!("{}/bin/java", self.directory_name)
    }

    /// Whether `dir` looks like a Java runtime.
    pub fn is_runtime_dir(dir: &Path) -> bool {
        dir.join("bin/java").is_file() || dir.join("bin/java.exe").is_file()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runtime_is_opt_in() {
        let runtime = RuntimeSettings::default();
        assert!(!runtime.bundle);
        assert!(runtime.customize);
        assert_eq!(runtime.java_binary(), "jre/bin/java");
    }
}
