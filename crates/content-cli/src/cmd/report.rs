use super::Context;
use anyhow::{Context as _, Result};
use content_core::report::write_report;

pub async fn report(ctx: &Context) -> Result<()> {
    let catalog = ctx.open().await;
    let path = write_report(&catalog)
        .await
        .context("Failed to write report")?;
    ctx.reporter.success(&format!("Report written to {}", path.display()));
    Ok(())
}
