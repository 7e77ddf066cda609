//! Launcher creation with launch4j.

use crate::bundler::context::{AppBundle, PackagerContext};
use crate::bundler::error::{Error, ErrorExt, Result};
use crate::bundler::resources::icons;
use crate::bundler::template::TemplateContext;
use crate::bundler::tool::{Tool, ToolInvocationSpec, args_tree};
use crate::bundler::utils::fs::set_owner_executable;
use std::path::{Path, PathBuf};

/// Application manifest requesting elevation.
pub const ELEVATION_MANIFEST: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<assembly xmlns="urn:schemas-microsoft-com:asm.v1" manifestVersion="1.0">
  <trustInfo xmlns="urn:schemas-microsoft-com:asm.v3">
    <security>
      <requestedPrivileges>
        <requestedExecutionLevel level="requireAdministrator" uiAccess="false"/>
      </requestedPrivileges>
    </security>
  </trustInfo>
</assembly>
"#;

/// Returns an ICO for `icon`, converting it into `assets_folder` unless it already is one.
pub async fn ensure_ico(icon: &Path, assets_folder: &Path, name: &str) -> Result<PathBuf> {
    if icon.extension().is_some_and(|e| e.eq_ignore_ascii_case("ico")) {
        return Ok(icon.to_path_buf());
    }
    let ico = assets_folder.join(format!("{name}.ico"));
    let (source, dest) = (icon.to_path_buf(), ico.clone());
    tokio::task::spawn_blocking(move || icons::create_ico_file(&source, &dest))
        .await
        .map_err(|e| Error::GenericError(format!("Join error: {}", e)))??;
    Ok(ico)
}

/// Wraps the runnable jar into `{name}.exe`.
pub async fn create_exe(ctx: &PackagerContext, bundle: &mut AppBundle) -> Result<()> {
    let settings = &ctx.settings;
    bundle.icon_file = ensure_ico(&bundle.icon_file, &bundle.assets_folder, settings.name()).await?;

    let template = TemplateContext::new(settings, bundle).await?;
    if settings.administrator_required() {
        let manifest = PathBuf::from(&template.win.manifest_file);
        tokio::fs::write(&manifest, ELEVATION_MANIFEST)
            .await
            .fs_context("writing elevation manifest", &manifest)?;
    }

    let config = ctx
        .renderer
        .render(
            "windows/launch4j.xml",
            &template,
            &bundle.assets_folder.join("launch4j.xml"),
        )
        .await?;

    let spec = ToolInvocationSpec::new(
        Tool::Launch4j,
        "launch4j",
        vec![args_tree([config.to_string_lossy().into_owned()])],
        ctx.env.clone(),
    );
    ctx.invoker.invoke(&spec).await?;

    if !bundle.executable.is_file() {
        return Err(spec.failure(format!("{} was not created", bundle.executable.display())));
    }
    set_owner_executable(&bundle.executable).await?;
    log::info!("Launcher created: {}", bundle.executable.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn png_icons_are_converted() {
        let dir = tempfile::tempdir().unwrap();
        let png = dir.path().join("demo.png");
        icons::write_default_png(&png).unwrap();
        let ico = ensure_ico(&png, dir.path(), "demo").await.unwrap();
        assert_eq!(ico, dir.path().join("demo.ico"));
        assert!(ico.is_file());
    }

    #[tokio::test]
    async fn ico_icons_are_kept() {
        let dir = tempfile::tempdir().unwrap();
        let ico = dir.path().join("custom.ICO");
        let kept = ensure_ico(&ico, dir.path(), "demo").await.unwrap();
        assert_eq!(kept, ico);
    }
}
