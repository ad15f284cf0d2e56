use super::Context;
use anyhow::{Context as _, Result};
use content_core::builder::{BuildSelection, Builder};
use content_core::engine::TarEngine;
use std::path::Path;
use std::sync::Arc;

fn selection(addon: Option<String>, bundle: Option<String>) -> BuildSelection {
    match (addon, bundle) {
        (Some(addon), Some(bundle)) => BuildSelection::Bundles(vec![(addon, bundle)]),
        (Some(addon), None) => BuildSelection::Addons(vec![addon]),
        _ => BuildSelection::All,
    }
}

/// Build archives for the selection and update `chain.json`.
pub async fn build(
    ctx: &Context,
    project: &Path,
    addon: Option<String>,
    bundle: Option<String>,
) -> Result<()> {
    let project = project
        .canonicalize()
        .with_context(|| format!("Project directory {} not found", project.display()))?;
    let mut catalog = ctx.open().await;

    let builder = Builder::new(Arc::new(TarEngine::new(&project))).with_reporter(ctx.reporter.clone());
    let summary = builder.build(&mut catalog, &selection(addon, bundle)).await?;

    ctx.reporter.info(&format!(
        "{} bundles recorded in {} ({:.2}s)",
        summary.manifest.addons().iter().map(|a| a.bundles().len()).sum::<usize>(),
        content_core::chain_file(catalog.root()).display(),
        summary.elapsed_secs
    ));
    Ok(())
}
