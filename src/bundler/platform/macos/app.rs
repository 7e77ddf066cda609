//! macOS application bundle (.app) creation.

use crate::bundler::context::{AppBundle, PackagerContext};
use crate::bundler::error::{Error, ErrorExt, Result};
use crate::bundler::template::TemplateContext;
use crate::bundler::utils::fs::{copy_file, copy_file_to_folder, set_mode};
use plist::{Dictionary, Value};
use std::path::Path;

/// Fills the `.app` skeleton: jar, launcher, icon, `Info.plist` and `PkgInfo`.
pub async fn create_app(ctx: &PackagerContext, bundle: &mut AppBundle) -> Result<()> {
    let settings = &ctx.settings;

    bundle.jar_file = copy_file_to_folder(&bundle.jar_file, &bundle.jar_folder).await?;

    let template = TemplateContext::new(settings, bundle).await?;
    ctx.renderer
        .render("mac/startup", &template, &bundle.executable)
        .await?;
    set_mode(&bundle.executable, 0o755).await?;

    let icon_name = if bundle.icon_file.extension().is_some_and(|e| e == "icns") {
        let name = format!("{}.icns", settings.name());
        copy_file(&bundle.icon_file, &bundle.resources_folder.join(&name)).await?;
        Some(name)
    } else {
        log::warn!(
            "{} is not an .icns file; the app will use the generic icon",
            bundle.icon_file.display()
        );
        None
    };

    let contents = bundle
        .executable_folder
        .parent()
        .ok_or_else(|| Error::Structure("MacOS folder has no parent".to_string()))?
        .to_path_buf();

    let plist_path = contents.join("Info.plist");
    Value::Dictionary(info_plist(&template, icon_name.as_deref()))
        .to_file_xml(&plist_path)
        .map_err(Error::Plist)?;

    write_pkg_info(&contents.join("PkgInfo")).await?;
    log::info!("App bundle created: {}", contents.display());
    Ok(())
}

async fn write_pkg_info(path: &Path) -> Result<()> {
    tokio::fs::write(path, "APPL????")
        .await
        .fs_context("writing PkgInfo", path)
}

/// `Info.plist` contents.
pub fn info_plist(template: &TemplateContext, icon_name: Option<&str>) -> Dictionary {
    let mut dict = Dictionary::new();

    dict.insert("CFBundleDevelopmentRegion".into(), "English".into());
    dict.insert("CFBundleDisplayName".into(), template.display_name.clone().into());
    dict.insert("CFBundleExecutable".into(), template.executable_name.clone().into());
    dict.insert("CFBundleIdentifier".into(), template.bundle_identifier.clone().into());
    dict.insert("CFBundleName".into(), template.name.clone().into());
    dict.insert("CFBundlePackageType".into(), "APPL".into());
    dict.insert("CFBundleSignature".into(), "????".into());
    dict.insert("CFBundleShortVersionString".into(), template.version.clone().into());
    dict.insert("CFBundleVersion".into(), template.version.clone().into());
    dict.insert("CFBundleInfoDictionaryVersion".into(), "6.0".into());
    if let Some(icon) = icon_name {
        dict.insert("CFBundleIconFile".into(), icon.into());
    }
    dict.insert("NSHighResolutionCapable".into(), true.into());
    dict.insert(
        "NSHumanReadableCopyright".into(),
        template.organization_name.clone().into(),
    );
    dict.insert(
        "JVMOptions".into(),
        Value::Array(template.vm_args.iter().cloned().map(Value::from).collect()),
    );
    dict.insert("JVMMainClassName".into(), template.main_class.clone().into());

    if !template.file_associations.is_empty() {
        let types = template
            .file_associations
            .iter()
            .map(|assoc| {
                let mut entry = Dictionary::new();
                entry.insert("CFBundleTypeName".into(), assoc.description.clone().into());
                entry.insert("CFBundleTypeRole".into(), "Editor".into());
                entry.insert(
                    "CFBundleTypeExtensions".into(),
                    Value::Array(vec![assoc.extension.clone().into()]),
                );
                entry.insert(
                    "CFBundleTypeMIMETypes".into(),
                    Value::Array(vec![assoc.mime_type.clone().into()]),
                );
                if let Some(icon) = icon_name {
                    entry.insert("CFBundleTypeIconFile".into(), icon.into());
                }
                Value::Dictionary(entry)
            })
            .collect();
        dict.insert("CFBundleDocumentTypes".into(), Value::Array(types));
    }

    dict
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::settings::{
        FileAssociation, MacOsSettings, PackageSettings, PlatformSettings, SettingsBuilder,
    };
    use std::path::PathBuf;

    async fn template() -> TemplateContext {
        let settings = SettingsBuilder::new()
            .package_settings(PackageSettings {
                name: "demo".into(),
                version: "1.0".into(),
                ..Default::default()
            })
            .main_class("com.example.Main")
            .output_directory("/out")
            .vm_args(vec!["-Xmx1g".into()])
            .file_associations(vec![FileAssociation {
                mime_type: "application/x-demo".into(),
                extension: "demo".into(),
                description: "Demo document".into(),
            }])
            .platform(PlatformSettings::MacOs(MacOsSettings::default()))
            .build()
            .unwrap();
        let contents = PathBuf::from("/out/demo/demo.app/Contents");
        let bundle = AppBundle {
            app_folder: "/out/demo".into(),
            assets_folder: "/out/assets".into(),
            executable: contents.join("MacOS/demo"),
            executable_folder: contents.join("MacOS"),
            jar_folder: contents.join("Resources/Java"),
            libs_folder: contents.join("Resources/Java/libs"),
            resources_folder: contents.join("Resources"),
            runtime_folder: None,
            jar_file: contents.join("Resources/Java/demo-1.0-runnable.jar"),
            icon_file: "/icons/demo.icns".into(),
        };
        TemplateContext::new(&settings, &bundle).await.unwrap()
    }

    #[tokio::test]
    async fn plist_describes_the_bundle() {
        let dict = info_plist(&template().await, Some("demo.icns"));
        assert_eq!(dict.get("CFBundleExecutable").and_then(Value::as_string), Some("demo"));
        assert_eq!(
            dict.get("CFBundleIdentifier").and_then(Value::as_string),
            Some("com.example.demo")
        );
        assert_eq!(dict.get("CFBundleIconFile").and_then(Value::as_string), Some("demo.icns"));
        let options = dict.get("JVMOptions").and_then(Value::as_array).unwrap();
        assert_eq!(options[0].as_string(), Some("-Xmx1g"));
        let types = dict.get("CFBundleDocumentTypes").and_then(Value::as_array).unwrap();
        let first = types[0].as_dictionary().unwrap();
        assert_eq!(first.get("CFBundleTypeName").and_then(Value::as_string), Some("Demo document"));
    }

    #[tokio::test]
    async fn icon_is_optional() {
        let dict = info_plist(&template().await, None);
        assert!(dict.get("CFBundleIconFile").is_none());
    }
}
