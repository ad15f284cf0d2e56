use super::Context;
use crate::ui::table::detected_table;
use anyhow::Result;
use content_core::loader::detect_addons;

/// List addon directories carrying a `chain.json`.
pub async fn detect(ctx: &Context) -> Result<()> {
    let detected = detect_addons(&ctx.config.root).await;
    if detected.is_empty() {
        println!();
        println!("  No built addons in {}.", ctx.config.root.display());
        println!("  Run 'content build' first.");
        return Ok(());
    }
    let mut chains: Vec<_> = detected.values().collect();
    chains.sort_by(|a, b| a.name().cmp(b.name()));
    println!("{}", detected_table(chains));
    Ok(())
}
