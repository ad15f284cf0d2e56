use super::{Context, save};
use crate::ui::table::catalog_table;
use anyhow::Result;

/// Create an addon.
pub async fn add(
    ctx: &Context,
    name: &str,
    description: Option<String>,
    author: Option<String>,
) -> Result<()> {
    let mut catalog = ctx.open().await;
    let addon = catalog.add_addon(name)?;
    if let Some(description) = description {
        addon.description = description;
    }
    if let Some(author) = author {
        addon.author = author;
    }
    let created = addon.name().to_string();
    save(&mut catalog).await?;
    ctx.reporter.success(&format!("Created addon '{created}'"));
    Ok(())
}

/// Remove an addon with its bundles and assets.
pub async fn remove(ctx: &Context, name: &str) -> Result<()> {
    let mut catalog = ctx.open().await;
    let removed = catalog.remove_addon(name)?;
    save(&mut catalog).await?;
    ctx.reporter.success(&format!(
        "Removed addon '{}' ({} bundles, {} assets)",
        removed.name(),
        removed.len(),
        removed.asset_count()
    ));
    Ok(())
}

/// Print the catalog.
pub async fn list(ctx: &Context) -> Result<()> {
    let catalog = ctx.open().await;
    if catalog.registry().is_empty() {
        println!();
        println!("  No addons in {}.", catalog.root().display());
        println!("  Run 'content addon add <name>' to get started.");
        return Ok(());
    }
    println!("{}", catalog_table(&catalog));
    Ok(())
}
