use super::Context;
use crate::ui::table::mount_table;
use anyhow::{Result, bail};
use content_core::archive::TarArchiveLoader;
use content_core::loader::{MountStatus, Mounter};
use content_core::resolver::resolve_mount_order;
use crossterm::style::Stylize;
use std::sync::Arc;

/// Expand `addons` with their prerequisites, each addon once, prerequisites
/// first.
async fn mount_order(mounter: &Mounter, addons: &[String]) -> Result<Vec<String>> {
    let manifest = mounter.detected_manifest().await;
    let mut order: Vec<String> = Vec::new();
    for addon in addons {
        for name in resolve_mount_order(&manifest, addon)? {
            if !order.contains(&name) {
                order.push(name);
            }
        }
    }
    Ok(order)
}

/// Mount the requested addons, print their state, then release them.
pub async fn mount(ctx: &Context, addons: &[String], with_deps: bool) -> Result<()> {
    let mounter = Mounter::new(&ctx.config.root, Arc::new(TarArchiveLoader))
        .with_reporter(ctx.reporter.clone());

    let order = if with_deps {
        mount_order(&mounter, addons).await?
    } else {
        addons.to_vec()
    };

    let statuses: Vec<(String, MountStatus)> = if with_deps {
        // Prerequisites must be live before their dependents.
        let mut statuses = Vec::with_capacity(order.len());
        for addon in &order {
            statuses.push((addon.clone(), mounter.mount(addon).await));
        }
        statuses
    } else {
        let results = futures::future::join_all(order.iter().map(|a| mounter.mount(a))).await;
        order.iter().cloned().zip(results).collect()
    };

    let mut failed = 0;
    for (addon, status) in &statuses {
        let label = match status {
            MountStatus::Mounted | MountStatus::AlreadyMounted => status.label().green(),
            _ => {
                failed += 1;
                status.label().red()
            }
        };
        println!("{} {label}", addon.as_str().bold());
        if let Some(snapshot) = mounter.snapshot(addon) {
            println!(
                "Bundles: {}/{} mounted, {} missing",
                snapshot.mounted,
                snapshot.bundles.len(),
                snapshot.missing
            );
            println!("{}", mount_table(&snapshot));
        }
    }

    let released = mounter.unmount_all(true);
    tracing::debug!(released, "Unmounted addons");

    if failed > 0 {
        bail!("{failed} addon(s) failed to mount");
    }
    Ok(())
}
