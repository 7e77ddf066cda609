#![allow(dead_code)]

use app_packager::bundler::tool::{Tool, ToolInvocationSpec, ToolInvoker, ToolOutput};
use app_packager::bundler::{
    Error, LinuxSettings, PackageSettings, PlatformSettings, Result, RuntimeSettings,
    SettingsBuilder,
};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Records every invocation and writes the file each tool would produce.
#[derive(Default)]
pub struct RecordingInvoker {
    pub calls: Mutex<Vec<ToolInvocationSpec>>,
    pub fail_on: Option<Tool>,
    pub jdeps_stdout: Option<String>,
}

impl RecordingInvoker {
    pub fn failing_on(tool: Tool) -> Self {
        Self {
            fail_on: Some(tool),
            ..Default::default()
        }
    }

    pub fn with_jdeps(stdout: &str) -> Self {
        Self {
            jdeps_stdout: Some(stdout.to_string()),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<ToolInvocationSpec> {
        self.calls.lock().unwrap().clone()
    }

    pub fn tools(&self) -> Vec<Tool> {
        self.calls().iter().map(|c| c.tool).collect()
    }
}

#[async_trait]
impl ToolInvoker for RecordingInvoker {
    async fn invoke(&self, spec: &ToolInvocationSpec) -> Result<ToolOutput> {
        self.calls.lock().unwrap().push(spec.clone());
        if self.fail_on == Some(spec.tool) {
            return Err(spec.failure("exit status 1"));
        }
        if let (Tool::Jdeps, Some(stdout)) = (spec.tool, &self.jdeps_stdout) {
            return Ok(ToolOutput {
                stdout: stdout.clone(),
            });
        }

        let produced = match spec.tool {
            Tool::Jdeb => spec.configuration.child_text("deb").map(PathBuf::from),
            Tool::Rpmbuild => spec.configuration.child_text("copyTo").map(PathBuf::from),
            _ => None,
        };
        if let Some(path) = produced {
            std::fs::write(&path, format!("{} package", spec.tool)).map_err(Error::IoError)?;
        }
        Ok(ToolOutput::default())
    }
}

/// A compiled application: one class file and one dependency jar.
pub struct Fixture {
    pub dir: tempfile::TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let classes = dir.path().join("classes/com/example");
        std::fs::create_dir_all(&classes).unwrap();
        std::fs::write(classes.join("Main.class"), [0xCA, 0xFE, 0xBA, 0xBE]).unwrap();
        std::fs::create_dir_all(dir.path().join("lib")).unwrap();
        std::fs::write(dir.path().join("lib/a.jar"), b"PK\x05\x06dependency").unwrap();
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn output(&self) -> PathBuf {
        self.path().join("out")
    }

    /// A Java runtime directory usable as `runtime_path`.
    pub fn runtime(&self) -> PathBuf {
        let runtime = self.path().join("prebuilt-jre");
        std::fs::create_dir_all(runtime.join("bin")).unwrap();
        std::fs::create_dir_all(runtime.join("lib")).unwrap();
        std::fs::write(runtime.join("bin/java"), "#!/bin/sh\n").unwrap();
        std::fs::write(runtime.join("lib/modules"), "modules").unwrap();
        runtime
    }

    /// A JDK home whose `jmods` holds `modules`.
    pub fn jdk(&self, modules: &[&str]) -> PathBuf {
        let jdk = self.path().join("jdk");
        std::fs::create_dir_all(jdk.join("jmods")).unwrap();
        for module in modules {
            std::fs::write(jdk.join("jmods").join(format!("{module}.jmod")), "").unwrap();
        }
        jdk
    }

    /// Settings for `demo 1.0` targeting Linux without an embedded runtime.
    pub fn demo(&self) -> SettingsBuilder {
        SettingsBuilder::new()
            .package_settings(PackageSettings {
                name: "demo".into(),
                version: "1.0".into(),
                ..Default::default()
            })
            .main_class("com.example.Main")
            .classes_directory(Some(self.path().join("classes")))
            .dependencies(vec![self.path().join("lib/a.jar")])
            .output_directory(self.output())
            .runtime(RuntimeSettings {
                bundle: false,
                ..Default::default()
            })
            .platform(PlatformSettings::Linux(LinuxSettings::default()))
    }
}
