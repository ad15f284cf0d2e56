use super::{Context, save};
use anyhow::{Result, bail};

pub async fn add(ctx: &Context, addon: &str, name: &str) -> Result<()> {
    let mut catalog = ctx.open().await;
    catalog.add_bundle(addon, name)?;
    save(&mut catalog).await?;
    ctx.reporter.success(&format!("Created bundle '{addon}/{name}'"));
    Ok(())
}

pub async fn remove(ctx: &Context, addon: &str, name: &str) -> Result<()> {
    let mut catalog = ctx.open().await;
    let removed = catalog.remove_bundle(addon, name)?;
    save(&mut catalog).await?;
    ctx.reporter.success(&format!(
        "Removed bundle '{addon}/{name}' ({} assets)",
        removed.len()
    ));
    Ok(())
}

/// Slice by part count or by maximum part size.
pub async fn slice(
    ctx: &Context,
    addon: &str,
    name: &str,
    parts: Option<usize>,
    max: Option<usize>,
) -> Result<()> {
    let mut catalog = ctx.open().await;
    let created = match (parts, max) {
        (Some(parts), _) => catalog.slice_bundle(addon, name, parts),
        (None, Some(max)) => catalog.slice_bundle_max(addon, name, max),
        (None, None) => bail!("Either --parts or --max is required"),
    };
    if created == 0 {
        bail!("Bundle '{addon}/{name}' could not be sliced");
    }
    save(&mut catalog).await?;
    ctx.reporter
        .success(&format!("Sliced '{addon}/{name}' into {created} parts"));
    Ok(())
}

/// Merge `sources` into `into`.
pub async fn split(ctx: &Context, addon: &str, sources: &[String], into: &str) -> Result<()> {
    let mut catalog = ctx.open().await;
    let sources: Vec<&str> = sources.iter().map(String::as_str).collect();
    let consumed = catalog.split_bundles(addon, &sources, into);
    if consumed == 0 {
        bail!("Nothing merged into '{addon}/{into}' (missing sources, or scenes mixed with assets)");
    }
    save(&mut catalog).await?;
    ctx.reporter
        .success(&format!("Merged {consumed} bundles into '{addon}/{into}'"));
    Ok(())
}

pub async fn move_to(ctx: &Context, name: &str, to: &str) -> Result<()> {
    let mut catalog = ctx.open().await;
    catalog.move_bundle(name, to)?;
    save(&mut catalog).await?;
    ctx.reporter.success(&format!("Moved bundle '{name}' to '{to}'"));
    Ok(())
}
