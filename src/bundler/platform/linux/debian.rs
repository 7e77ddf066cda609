//! Debian package (.deb) generation.
//!
//! Renders the desktop entry and control file, then describes the package
//! contents as a jdeb data set:
//!
//! | Source | Installed at | Mode |
//! |--------|--------------|------|
//! | app folder minus launcher and `{jre}/bin/java` | `/opt/{name}` | 644 / 755 |
//! | launcher | `/opt/{name}` | 755 |
//! | desktop entry | `/usr/share/applications` | 644 |
//! | `{jre}/bin/java` (when embedded) | `/opt/{name}/{jre}/bin` | 755 |
//! | link `/usr/local/bin/{name}` | | 777 |

use super::{file_name, install_dir};
use crate::bundler::context::{AppBundle, PackagerContext};
use crate::bundler::error::Result;
use crate::bundler::platform::PackageType;
use crate::bundler::settings::Settings;
use crate::bundler::template::TemplateContext;
use crate::bundler::tool::{ConfigNode, Tool, ToolInvocationSpec, element, element_tree};
use crate::bundler::utils::fs::{copy_file, create_dir_all, set_mode};
use std::path::{Path, PathBuf};

fn mapper(prefix: &str, filemode: Option<&str>) -> ConfigNode {
    let mut children = vec![element("type", "perm"), element("prefix", prefix)];
    if let Some(mode) = filemode {
        children.push(element("filemode", mode));
    }
    element_tree("mapper", children)
}

fn data(kind: &str, children: Vec<ConfigNode>) -> ConfigNode {
    let mut all = vec![element("type", kind)];
    all.extend(children);
    element_tree("data", all)
}

/// jdeb configuration for `bundle`.
pub fn deb_configuration(
    settings: &Settings,
    bundle: &AppBundle,
    control_dir: &Path,
    desktop_file: &Path,
    deb: &Path,
) -> Vec<ConfigNode> {
    let prefix = install_dir(settings);
    let executable = file_name(&bundle.executable);
    let runtime = settings.runtime();
    let runtime_java = bundle.runtime_folder.as_ref().map(|_| {
        let rel = runtime.java_binary();
        (
            bundle.app_folder.join(&rel),
            format!("{prefix}/{}/bin", runtime.directory_name),
            rel,
        )
    });

    let mut excludes = vec![executable.clone()];
    if let Some((_, _, rel)) = &runtime_java {
        excludes.push(rel.clone());
    }

    let mut data_set = vec![
        data(
            "directory",
            vec![
                element("src", bundle.app_folder.to_string_lossy()),
                element("excludes", excludes.join(",")),
                mapper(&prefix, None),
            ],
        ),
        data(
            "file",
            vec![
                element("src", bundle.executable.to_string_lossy()),
                mapper(&prefix, Some("755")),
            ],
        ),
        data(
            "file",
            vec![
                element("src", desktop_file.to_string_lossy()),
                mapper("/usr/share/applications", None),
            ],
        ),
    ];
    if let Some((java, java_prefix, _)) = &runtime_java {
        data_set.push(data(
            "file",
            vec![
                element("src", java.to_string_lossy()),
                mapper(java_prefix, Some("755")),
            ],
        ));
    }
    data_set.push(data(
        "link",
        vec![
            element("linkName", format!("/usr/local/bin/{}", settings.name())),
            element("linkTarget", format!("{prefix}/{executable}")),
            element("symlink", "true"),
            mapper("", Some("777")),
        ],
    ));

    vec![
        element("controlDir", control_dir.to_string_lossy()),
        element("deb", deb.to_string_lossy()),
        element_tree("dataSet", data_set),
    ]
}

/// Builds `{output}/{name}_{version}.deb`.
pub async fn generate(ctx: &PackagerContext, bundle: &AppBundle) -> Result<PathBuf> {
    let settings = &ctx.settings;
    let deb = PackageType::Deb.artifact_path(settings);
    log::info!("Generating {} ...", deb.display());

    let template = TemplateContext::new(settings, bundle).await?;
    let desktop_file = bundle.assets_folder.join(format!("{}.desktop", settings.name()));
    ctx.renderer
        .render("linux/desktop", &template, &desktop_file)
        .await?;

    let control_dir = bundle.assets_folder.join("control");
    create_dir_all(&control_dir, true).await?;
    ctx.renderer
        .render("linux/control", &template, &control_dir.join("control"))
        .await?;
    for (name, script) in settings.scripts().maintainer_scripts() {
        let dest = control_dir.join(name);
        copy_file(script, &dest).await?;
        set_mode(&dest, 0o755).await?;
    }

    let spec = ToolInvocationSpec::new(
        Tool::Jdeb,
        "jdeb",
        deb_configuration(settings, bundle, &control_dir, &desktop_file, &deb),
        ctx.env.clone(),
    );
    ctx.invoker.invoke(&spec).await?;

    log::info!("DEB package generated: {}", deb.display());
    Ok(deb)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::settings::{PackageSettings, RuntimeSettings, SettingsBuilder};

    fn settings() -> Settings {
        settings_with_runtime(RuntimeSettings::default())
    }

    fn settings_with_runtime(runtime: RuntimeSettings) -> Settings {
        SettingsBuilder::new()
            .package_settings(PackageSettings {
                name: "demo".into(),
                version: "1.0".into(),
                ..Default::default()
            })
            .main_class("com.example.Main")
            .output_directory("/out")
            .runtime(runtime)
            .build()
            .unwrap()
    }

    fn bundle(runtime: bool) -> AppBundle {
        AppBundle {
            app_folder: "/out/demo".into(),
            assets_folder: "/out/assets".into(),
            executable: "/out/demo/demo".into(),
            executable_folder: "/out/demo".into(),
            jar_folder: "/out/demo".into(),
            libs_folder: "/out/demo/libs".into(),
            resources_folder: "/out/demo".into(),
            runtime_folder: runtime.then(|| PathBuf::from("/out/demo/jre")),
            jar_file: "/out/demo-1.0-runnable.jar".into(),
            icon_file: "/out/demo/demo.png".into(),
        }
    }

    fn data_entries(config: &[ConfigNode]) -> Vec<ConfigNode> {
        config
            .iter()
            .find(|n| n.name == "dataSet")
            .unwrap()
            .children()
            .to_vec()
    }

    #[test]
    fn without_runtime_only_the_launcher_is_excluded() {
        let config = deb_configuration(
            &settings(),
            &bundle(false),
            Path::new("/out/assets/control"),
            Path::new("/out/assets/demo.desktop"),
            Path::new("/out/demo_1.0.deb"),
        );
        let entries = data_entries(&config);
        assert_eq!(entries.len(), 4);
        assert_eq!(entries[0].child_text("excludes"), Some("demo"));
        assert_eq!(entries[1].child("mapper").unwrap().child_text("filemode"), Some("755"));
        assert_eq!(entries[3].child_text("linkName"), Some("/usr/local/bin/demo"));
        assert_eq!(entries[3].child_text("linkTarget"), Some("/opt/demo/demo"));
    }

    #[test]
    fn embedded_runtime_gets_its_own_mapping() {
        let config = deb_configuration(
            &settings(),
            &bundle(true),
            Path::new("/out/assets/control"),
            Path::new("/out/assets/demo.desktop"),
            Path::new("/out/demo_1.0.deb"),
        );
        let entries = data_entries(&config);
        assert_eq!(entries.len(), 5);
        assert_eq!(entries[0].child_text("excludes"), Some("demo,jre/bin/java"));
        let java = &entries[3];
        assert_eq!(java.child_text("src"), Some("/out/demo/jre/bin/java"));
        let mapper = java.child("mapper").unwrap();
        assert_eq!(mapper.child_text("prefix"), Some("/opt/demo/jre/bin"));
        assert_eq!(mapper.child_text("filemode"), Some("755"));
    }

    #[test]
    fn renamed_runtime_folder_is_mapped_by_name() {
        let runtime = RuntimeSettings {
            bundle: true,
            directory_name: "runtime".into(),
            ..Default::default()
        };
        let mut b = bundle(true);
        b.runtime_folder = Some(PathBuf::from("/out/demo/runtime"));
        let config = deb_configuration(
            &settings_with_runtime(runtime),
            &b,
            Path::new("/out/assets/control"),
            Path::new("/out/assets/demo.desktop"),
            Path::new("/out/demo_1.0.deb"),
        );
        let entries = data_entries(&config);
        assert_eq!(entries[0].child_text("excludes"), Some("demo,runtime/bin/java"));
        assert_eq!(entries[3].child_text("src"), Some("/out/demo/runtime/bin/java"));
        let mapper = entries[3].child("mapper").unwrap();
        assert_eq!(mapper.child_text("prefix"), Some("/opt/demo/runtime/bin"));
    }
}
