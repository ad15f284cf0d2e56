use super::{Context, save};
use anyhow::{Result, bail};
use content_schema::CompressionMode;

pub async fn set(ctx: &Context, addon: &str, bundle: &str, mode: CompressionMode) -> Result<()> {
    let mut catalog = ctx.open().await;
    catalog.set_compression(addon, bundle, mode)?;
    save(&mut catalog).await?;
    ctx.reporter
        .success(&format!("Compression of '{addon}/{bundle}' set to {mode}"));
    Ok(())
}

/// Print the resolved mode, marking inherited defaults.
pub async fn get(ctx: &Context, addon: &str, bundle: &str) -> Result<()> {
    let catalog = ctx.open().await;
    if catalog.registry().addon(addon).and_then(|a| a.bundle(bundle)).is_none() {
        bail!("Bundle '{addon}/{bundle}' not found");
    }
    let mode = catalog.compression_mode(addon, bundle);
    if catalog.compression().entry(addon, bundle).is_some() {
        println!("{mode}");
    } else {
        println!("{mode} (default)");
    }
    Ok(())
}
