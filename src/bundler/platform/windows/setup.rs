//! Inno Setup installer generation.

use crate::bundler::context::{AppBundle, PackagerContext};
use crate::bundler::error::Result;
use crate::bundler::platform::PackageType;
use crate::bundler::template::TemplateContext;
use crate::bundler::tool::{Tool, ToolInvocationSpec, args_tree};
use std::path::PathBuf;

/// Builds `{output}/{name}_{version}.exe` from the rendered `.iss` script.
pub async fn create_setup(ctx: &PackagerContext, bundle: &AppBundle) -> Result<PathBuf> {
    let settings = &ctx.settings;
    let setup = PackageType::Setup.artifact_path(settings);
    log::info!("Generating {} ...", setup.display());

    let template = TemplateContext::new(settings, bundle).await?;
    let iss = ctx
        .renderer
        .render(
            "windows/iss",
            &template,
            &bundle.assets_folder.join(format!("{}.iss", settings.name())),
        )
        .await?;

    let spec = ToolInvocationSpec::new(
        Tool::InnoSetup,
        "iscc",
        vec![args_tree([iss.to_string_lossy().into_owned()])],
        ctx.env.clone(),
    );
    ctx.invoker.invoke(&spec).await?;

    log::info!("Setup generated: {}", setup.display());
    Ok(setup)
}
