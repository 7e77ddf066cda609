//! Runnable jar assembly.
//!
//! Builds a jar from a compiled classes directory with a manifest declaring
//! `Main-Class`, `Class-Path` and `Created-By`. Entries are written in name
//! order with pinned timestamps so the same input yields the same bytes.

use crate::bundler::error::{Error, ErrorExt, Result};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;
use zip::{CompressionMethod, DateTime, ZipWriter, write::SimpleFileOptions};

const MANIFEST_PATH: &str = "META-INF/MANIFEST.MF";
const MAX_LINE: usize = 72;

/// Contents of a jar manifest.
#[derive(Debug, Clone, Default)]
pub struct JarManifest {
    /// `Main-Class` value.
    pub main_class: String,
    /// `Class-Path` entries, in order.
    pub class_path: Vec<String>,
    /// Additional attributes.
    pub entries: BTreeMap<String, String>,
}

impl JarManifest {
    /// Manifest text with CRLF line endings and 72-byte line wrapping.
    pub fn render(&self) -> String {
        let mut out = String::new();
        push_attribute(&mut out, "Manifest-Version", "1.0");
        push_attribute(&mut out, "Main-Class", &self.main_class);
        if !self.class_path.is_empty() {
            push_attribute(&mut out, "Class-Path", &self.class_path.join(" "));
        }
        push_attribute(
            &mut out,
            "Created-By",
            concat!(env!("CARGO_PKG_NAME"), " ", env!("CARGO_PKG_VERSION")),
        );
        for (key, value) in &self.entries {
            push_attribute(&mut out, key, value);
        }
        out.push_str("\r\n");
        out
    }
}

/// Appends `key: value`, continuing long lines with a leading space.
fn push_attribute(out: &mut String, key: &str, value: &str) {
    let line = format!("{key}: {value}");
    let mut rest = line.as_str();
    let mut first = true;
    while !rest.is_empty() {
        let budget = if first { MAX_LINE } else { MAX_LINE - 1 };
        let mut cut = rest.len().min(budget);
        while !rest.is_char_boundary(cut) {
            cut -= 1;
        }
        if !first {
            out.push(' ');
        }
        out.push_str(&rest[..cut]);
        out.push_str("\r\n");
        rest = &rest[cut..];
        first = false;
    }
}

/// `Class-Path` entries for the copied dependencies plus extra entries.
///
/// Extra entries are split on whitespace, `:` and `;`.
pub fn class_path(dependencies: &[PathBuf], copy_dependencies: bool, extra: Option<&str>) -> Vec<String> {
    let mut entries: Vec<String> = if copy_dependencies {
        dependencies
            .iter()
            .filter_map(|d| d.file_name())
            .map(|n| format!("libs/{}", n.to_string_lossy()))
            .collect()
    } else {
        Vec::new()
    };
    if let Some(extra) = extra {
        entries.extend(
            extra
                .split(|c: char| c.is_whitespace() || c == ':' || c == ';')
                .filter(|s| !s.is_empty())
                .map(str::to_string),
        );
    }
    entries
}

fn options(mode: u32) -> SimpleFileOptions {
    SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default())
        .unix_permissions(mode)
}

/// Writes a jar at `dest` holding `manifest` and every file under `classes_dir`.
///
/// A manifest already present in `classes_dir` is replaced.
pub fn create_jar(classes_dir: &Path, manifest: &JarManifest, dest: &Path) -> Result<()> {
    if !classes_dir.is_dir() {
        return Err(Error::Structure(format!(
            "classes directory {} does not exist",
            classes_dir.display()
        )));
    }
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent).fs_context("creating jar directory", parent)?;
    }

    let file = File::create(dest).fs_context("creating jar", dest)?;
    let mut zip = ZipWriter::new(file);

    zip.add_directory("META-INF/", options(0o755))?;
    zip.start_file(MANIFEST_PATH, options(0o644))?;
    zip.write_all(manifest.render().as_bytes())?;

    for entry in WalkDir::new(classes_dir).sort_by_file_name().min_depth(1) {
        let entry = entry?;
        let rel = entry
            .path()
            .strip_prefix(classes_dir)?
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        if rel == "META-INF" || rel == MANIFEST_PATH {
            continue;
        }
        if entry.file_type().is_dir() {
            zip.add_directory(format!("{rel}/"), options(0o755))?;
        } else {
            zip.start_file(rel, options(0o644))?;
            let mut src = File::open(entry.path()).fs_context("opening class file", entry.path())?;
            io::copy(&mut src, &mut zip)?;
        }
    }

    zip.finish()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn manifest_wraps_long_lines() {
        let manifest = JarManifest {
            main_class: "com.example.Main".into(),
            class_path: (0..10).map(|i| format!("libs/dependency-{i}.jar")).collect(),
            entries: BTreeMap::new(),
        };
        let text = manifest.render();
        assert!(text.starts_with("Manifest-Version: 1.0\r\nMain-Class: com.example.Main\r\n"));
        assert!(text.lines().all(|l| l.trim_end_matches('\r').len() <= MAX_LINE));
        let unfolded = text.replace("\r\n ", "");
        assert!(unfolded.contains("libs/dependency-0.jar libs/dependency-1.jar"));
        assert!(text.ends_with("\r\n\r\n"));
    }

    #[test]
    fn class_path_lists_libs_and_extras() {
        let deps = vec![PathBuf::from("/repo/a.jar"), PathBuf::from("/repo/b.jar")];
        assert_eq!(
            class_path(&deps, true, Some("conf/ ext.jar")),
            vec!["libs/a.jar", "libs/b.jar", "conf/", "ext.jar"]
        );
        assert!(class_path(&deps, false, None).is_empty());
    }

    #[test]
    fn jar_contains_manifest_and_classes() {
        let dir = tempfile::tempdir().unwrap();
        let classes = dir.path().join("classes");
        std::fs::create_dir_all(classes.join("com/example")).unwrap();
        std::fs::write(classes.join("com/example/Main.class"), [0xca, 0xfe, 0xba, 0xbe]).unwrap();

        let jar = dir.path().join("demo.jar");
        let manifest = JarManifest {
            main_class: "com.example.Main".into(),
            ..Default::default()
        };
        create_jar(&classes, &manifest, &jar).unwrap();
        let first = std::fs::read(&jar).unwrap();
        create_jar(&classes, &manifest, &jar).unwrap();
        assert_eq!(first, std::fs::read(&jar).unwrap());

        let mut archive = zip::ZipArchive::new(File::open(&jar).unwrap()).unwrap();
        let mut text = String::new();
        archive
            .by_name(MANIFEST_PATH)
            .unwrap()
            .read_to_string(&mut text)
            .unwrap();
        assert!(text.contains("Main-Class: com.example.Main"));
        assert!(archive.by_name("com/example/Main.class").is_ok());
    }
}
