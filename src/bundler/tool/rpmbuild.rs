//! RPM generation through `rpmbuild`.
//!
//! Translates an rpm mapping configuration into a staged file tree and a
//! generated spec file, runs `rpmbuild -bb` in a private top directory and
//! copies the resulting package to `copyTo`.
//!
//! Build time and file timestamps are pinned to `SOURCE_DATE_EPOCH` (taken
//! from the environment, `0` when unset) so identical inputs give identical
//! packages.

use crate::bundler::error::{Context, Error, ErrorExt, Result};
use crate::bundler::tool::{ConfigNode, ToolInvocationSpec, run_process};
use crate::bundler::utils::fs::{copy_file, create_dir_all, remove_dir_all};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A path listed in the `%files` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// Installed absolute path.
    pub path: String,
    /// Octal mode.
    pub mode: String,
    /// Whether the record is a `%dir` entry.
    pub dir: bool,
}

/// Staging plan derived from the mappings.
#[derive(Debug, Default)]
pub struct StagePlan {
    /// Files to copy: (source, installed path).
    pub copies: Vec<(PathBuf, String)>,
    /// Symlinks to create: (installed path, target).
    pub links: Vec<(String, String)>,
    /// `%files` records.
    pub records: Vec<FileRecord>,
}

const SOURCE_DATE_EPOCH: &str = "SOURCE_DATE_EPOCH";

/// Copy of `spec` whose environment carries `SOURCE_DATE_EPOCH`.
pub fn with_source_date_epoch(spec: &ToolInvocationSpec) -> ToolInvocationSpec {
    let mut spec = spec.clone();
    spec.env
        .vars
        .entry(SOURCE_DATE_EPOCH.to_string())
        .or_insert_with(|| {
            std::env::var(SOURCE_DATE_EPOCH)
                .ok()
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| "0".to_string())
        });
    spec
}

/// Builds the package described by `spec` with the `rpmbuild` at `program`.
pub async fn build_package(program: &Path, spec: &ToolInvocationSpec) -> Result<PathBuf> {
    let config = &spec.configuration;
    let name = config.require_text("name")?;
    let copy_to = PathBuf::from(config.require_text("copyTo")?);
    let parent = copy_to
        .parent()
        .context("copyTo has no parent directory")?
        .to_path_buf();

    let topdir = parent.join(format!(".rpmbuild-{name}"));
    create_dir_all(&topdir, true).await?;
    let staging = topdir.join("STAGING");
    let sources = topdir.join("SOURCES");
    create_dir_all(&staging, false).await?;
    create_dir_all(&sources, false).await?;

    let plan = plan_mappings(config)?;
    stage(&plan, &staging).await?;

    let icon = match config.child_text("icon") {
        Some(icon) if !icon.is_empty() => {
            let icon = PathBuf::from(icon);
            let dest = sources.join(icon.file_name().context("icon has no file name")?);
            copy_file(&icon, &dest).await?;
            dest.file_name().map(|n| n.to_string_lossy().into_owned())
        }
        _ => None,
    };

    let spec_file = topdir.join(format!("{name}.spec"));
    let text = spec_text(config, &plan, &staging, icon.as_deref())?;
    tokio::fs::write(&spec_file, text)
        .await
        .fs_context("writing rpm spec", &spec_file)?;

    let args = vec![
        "-bb".to_string(),
        "--define".to_string(),
        format!("_topdir {}", topdir.display()),
        spec_file.to_string_lossy().into_owned(),
    ];
    run_process(program, &args, &with_source_date_epoch(spec)).await?;

    let built = WalkDir::new(topdir.join("RPMS"))
        .into_iter()
        .filter_map(|e| e.ok())
        .find(|e| e.file_type().is_file() && e.path().extension().is_some_and(|x| x == "rpm"))
        .map(|e| e.path().to_path_buf())
        .ok_or_else(|| spec.failure("rpmbuild produced no package"))?;

    copy_file(&built, &copy_to).await?;
    remove_dir_all(&topdir).await?;
    Ok(copy_to)
}

fn matches_any(rel: &str, patterns: &[String]) -> bool {
    patterns.iter().any(|p| p == rel)
}

fn list(source: &ConfigNode, outer: &str, inner: &str) -> Vec<String> {
    source
        .child(outer)
        .map(|n| {
            n.children_named(inner)
                .filter_map(ConfigNode::text)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Resolves the `mappings` tree into copies, links and `%files` records.
pub fn plan_mappings(config: &ConfigNode) -> Result<StagePlan> {
    let default_filemode = config.child_text("defaultFilemode").unwrap_or("644");
    let default_dirmode = config.child_text("defaultDirmode").unwrap_or("755");
    let mappings = config
        .child("mappings")
        .context("missing <mappings> in rpm configuration")?;

    let mut plan = StagePlan::default();
    for mapping in mappings.children_named("mapping") {
        let directory = mapping.require_text("directory")?.trim_end_matches('/');
        let filemode = mapping.child_text("filemode").unwrap_or(default_filemode);
        let sources = mapping
            .child("sources")
            .context("missing <sources> in rpm mapping")?;

        for source in sources.children() {
            let location = source.require_text("location")?;
            match source.name.as_str() {
                "softlinkSource" => {
                    let file_name = Path::new(location)
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .context("softlink location has no file name")?;
                    let installed = format!("{directory}/{file_name}");
                    plan.links.push((installed.clone(), location.to_string()));
                    plan.records.push(FileRecord {
                        path: installed,
                        mode: "777".into(),
                        dir: false,
                    });
                }
                "source" => {
                    let includes = list(source, "includes", "include");
                    let excludes = list(source, "excludes", "exclude");
                    let root = PathBuf::from(location);
                    if includes.is_empty() {
                        plan.records.push(FileRecord {
                            path: directory.to_string(),
                            mode: default_dirmode.to_string(),
                            dir: true,
                        });
                    }
                    for entry in WalkDir::new(&root).sort_by_file_name().min_depth(1) {
                        let entry = entry?;
                        let rel = entry
                            .path()
                            .strip_prefix(&root)?
                            .components()
                            .map(|c| c.as_os_str().to_string_lossy())
                            .collect::<Vec<_>>()
                            .join("/");
                        if matches_any(&rel, &excludes) {
                            continue;
                        }
                        let installed = format!("{directory}/{rel}");
                        if entry.file_type().is_dir() {
                            if includes.is_empty() {
                                plan.records.push(FileRecord {
                                    path: installed,
                                    mode: default_dirmode.to_string(),
                                    dir: true,
                                });
                            }
                            continue;
                        }
                        if !includes.is_empty() && !matches_any(&rel, &includes) {
                            continue;
                        }
                        plan.copies.push((entry.path().to_path_buf(), installed.clone()));
                        plan.records.push(FileRecord {
                            path: installed,
                            mode: filemode.to_string(),
                            dir: false,
                        });
                    }
                }
                other => {
                    return Err(Error::GenericError(format!("unknown rpm source {other}")));
                }
            }
        }
    }
    Ok(plan)
}

async fn stage(plan: &StagePlan, staging: &Path) -> Result<()> {
    for (source, installed) in &plan.copies {
        copy_file(source, &staging.join(installed.trim_start_matches('/'))).await?;
    }
    for record in plan.records.iter().filter(|r| r.dir) {
        create_dir_all(&staging.join(record.path.trim_start_matches('/')), false).await?;
    }
    for (installed, target) in &plan.links {
        let link = staging.join(installed.trim_start_matches('/'));
        if let Some(parent) = link.parent() {
            create_dir_all(parent, false).await?;
        }
        #[cfg(unix)]
        tokio::fs::symlink(target, &link)
            .await
            .fs_context("creating symlink", &link)?;
        #[cfg(not(unix))]
        {
            let _ = target;
            return Err(Error::GenericError(
                "rpm symlinks require a unix host".to_string(),
            ));
        }
    }
    Ok(())
}

/// Renders the rpm spec file.
pub fn spec_text(
    config: &ConfigNode,
    plan: &StagePlan,
    staging: &Path,
    icon: Option<&str>,
) -> Result<String> {
    let user = config.child_text("defaultUsername").unwrap_or("root");
    let group = config.child_text("defaultGroupname").unwrap_or("root");
    let version = config.require_text("version")?.replace('-', "_");

    let mut s = String::new();
    let _ = writeln!(s, "%global __os_install_post %{{nil}}");
    let _ = writeln!(s, "%define _build_id_links none");
    let _ = writeln!(s, "%define use_source_date_epoch_as_buildtime 1");
    let _ = writeln!(s, "%define clamp_mtime_to_source_date_epoch 1");
    let _ = writeln!(s, "%define _buildhost reproducible");
    let _ = writeln!(s, "Name: {}", config.require_text("name")?);
    let _ = writeln!(s, "Version: {version}");
    let _ = writeln!(s, "Release: 1");
    let _ = writeln!(s, "Summary: {}", config.child_text("summary").unwrap_or(""));
    let _ = writeln!(s, "License: {}", config.child_text("license").unwrap_or("Unknown"));
    let _ = writeln!(s, "Group: {}", config.child_text("group").unwrap_or("Application"));
    if let Some(packager) = config.child_text("packager") {
        let _ = writeln!(s, "Packager: {packager}");
    }
    if let Some(url) = config.child_text("url").filter(|u| !u.is_empty()) {
        let _ = writeln!(s, "URL: {url}");
    }
    if let Some(icon) = icon {
        let _ = writeln!(s, "Icon: {icon}");
    }
    if !config.child_flag("autoRequires", true) {
        let _ = writeln!(s, "AutoReqProv: no");
    }
    if !config.child_flag("needarch", false) {
        let _ = writeln!(s, "BuildArch: noarch");
    }
    let _ = writeln!(s);
    let _ = writeln!(s, "%description");
    let _ = writeln!(s, "{}", config.child_text("description").unwrap_or(""));
    let _ = writeln!(s);
    let _ = writeln!(s, "%install");
    let _ = writeln!(s, "mkdir -p \"$RPM_BUILD_ROOT\"");
    let _ = writeln!(s, "cp -a '{}'/. \"$RPM_BUILD_ROOT\"/", staging.display());
    let _ = writeln!(s);
    let _ = writeln!(s, "%files");
    for record in &plan.records {
        let _ = writeln!(
            s,
            "{}%attr({},{user},{group}) \"{}\"",
            if record.dir { "%dir " } else { "" },
            record.mode,
            record.path
        );
    }
    Ok(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::tool::{ExecutionEnv, Tool, element, element_tree};

    fn source(location: &Path, key: &str, item: &str, values: &[&str]) -> ConfigNode {
        element_tree("source", vec![
            element("location", location.to_string_lossy()),
            element_tree(key, values.iter().map(|v| element(item, *v)).collect()),
        ])
    }

    #[test]
    fn includes_and_excludes_split_the_app_folder() {
        let dir = tempfile::tempdir().unwrap();
        let app = dir.path().join("demo");
        std::fs::create_dir_all(app.join("libs")).unwrap();
        std::fs::write(app.join("demo"), "x").unwrap();
        std::fs::write(app.join("libs/a.jar"), "x").unwrap();

        let config = element_tree("configuration", vec![
            element("name", "demo"),
            element("version", "1.0-SNAPSHOT"),
            element("defaultFilemode", "644"),
            element("defaultDirmode", "755"),
            element_tree("mappings", vec![
                element_tree("mapping", vec![
                    element("directory", "/opt/demo"),
                    element_tree("sources", vec![source(&app, "excludes", "exclude", &["demo"])]),
                ]),
                element_tree("mapping", vec![
                    element("directory", "/opt/demo"),
                    element("filemode", "755"),
                    element_tree("sources", vec![source(&app, "includes", "include", &["demo"])]),
                ]),
                element_tree("mapping", vec![
                    element("directory", "/usr/local/bin"),
                    element_tree("sources", vec![element_tree("softlinkSource", vec![
                        element("location", "/opt/demo/demo"),
                    ])]),
                ]),
            ]),
        ]);

        let plan = plan_mappings(&config).unwrap();
        let record = |p: &str| plan.records.iter().find(|r| r.path == p).cloned().unwrap();
        assert_eq!(record("/opt/demo/demo").mode, "755");
        assert_eq!(record("/opt/demo/libs/a.jar").mode, "644");
        assert!(record("/opt/demo/libs").dir);
        assert_eq!(plan.records.iter().filter(|r| r.path == "/opt/demo/demo").count(), 1);
        assert_eq!(plan.links, vec![("/usr/local/bin/demo".to_string(), "/opt/demo/demo".to_string())]);

        let text = spec_text(&config, &plan, Path::new("/stage"), None).unwrap();
        assert!(text.contains("Version: 1.0_SNAPSHOT"));
        assert!(text.contains("%attr(755,root,root) \"/opt/demo/demo\""));
        assert!(text.contains("BuildArch: noarch"));
    }

    #[test]
    fn build_time_is_pinned() {
        let config = element_tree(
            "configuration",
            vec![element("name", "demo"), element("version", "1.0")],
        );
        let text = spec_text(&config, &StagePlan::default(), Path::new("/stage"), None).unwrap();
        assert!(text.contains("%define use_source_date_epoch_as_buildtime 1\n"));
        assert!(text.contains("%define clamp_mtime_to_source_date_epoch 1\n"));

        let mut env = ExecutionEnv::default();
        env.vars.insert(SOURCE_DATE_EPOCH.to_string(), "1700000000".to_string());
        let spec = ToolInvocationSpec::new(Tool::Rpmbuild, "rpm", vec![], env);
        let pinned = with_source_date_epoch(&spec);
        assert_eq!(pinned.env.vars[SOURCE_DATE_EPOCH], "1700000000");

        let spec = ToolInvocationSpec::new(Tool::Rpmbuild, "rpm", vec![], ExecutionEnv::default());
        assert!(with_source_date_epoch(&spec).env.vars.contains_key(SOURCE_DATE_EPOCH));
    }
}
