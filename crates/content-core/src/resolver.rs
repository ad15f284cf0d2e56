//! Addon-level dependency ordering and manifest verification.

use content_schema::{BuildManifest, DanglingDependency};
use std::collections::{BTreeSet, HashSet};

/// Errors raised while ordering addons for mounting.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// The addon (or one of its prerequisites) has no manifest entry.
    #[error("Addon '{0}' not found in manifest")]
    NotFound(String),

    /// Two or more addons depend on each other.
    #[error("Circular dependency detected involving '{0}'")]
    Cycle(String),
}

/// Addons whose bundles `addon`'s bundles reference, excluding itself.
pub fn addon_prerequisites(manifest: &BuildManifest, addon: &str) -> BTreeSet<String> {
    manifest
        .addon(addon)
        .into_iter()
        .flat_map(|chain| chain.bundles())
        .flat_map(|record| record.dependencies())
        .map(|dep| dep.addon().to_string())
        .filter(|dep| dep != addon)
        .collect()
}

/// Resolves the addons to mount for `addon`, prerequisites first.
///
/// Performs a depth-first traversal over the addon-level dependency graph
/// derived from qualified identifiers. The requested addon is always last.
///
/// # Errors
///
/// Returns an error if an addon in the graph has no manifest entry or a
/// cycle is detected.
pub fn resolve_mount_order(manifest: &BuildManifest, addon: &str) -> Result<Vec<String>, ResolveError> {
    let mut order = Vec::new();
    let mut visited = HashSet::new();
    let mut visiting = HashSet::new();
    visit(manifest, addon, &mut order, &mut visited, &mut visiting)?;
    Ok(order)
}

fn visit(
    manifest: &BuildManifest,
    addon: &str,
    order: &mut Vec<String>,
    visited: &mut HashSet<String>,
    visiting: &mut HashSet<String>,
) -> Result<(), ResolveError> {
    if visited.contains(addon) {
        return Ok(());
    }
    if visiting.contains(addon) {
        return Err(ResolveError::Cycle(addon.to_string()));
    }
    if manifest.addon(addon).is_none() {
        return Err(ResolveError::NotFound(addon.to_string()));
    }

    visiting.insert(addon.to_string());
    for dep in addon_prerequisites(manifest, addon) {
        visit(manifest, &dep, order, visited, visiting)?;
    }
    visiting.remove(addon);

    visited.insert(addon.to_string());
    order.push(addon.to_string());
    Ok(())
}

/// Every qualified identifier in `manifest` that resolves to no record,
/// sorted for stable output.
pub fn verify_manifest(manifest: &BuildManifest) -> Vec<DanglingDependency> {
    let mut dangling = manifest.dangling();
    dangling.sort_by(|a, b| {
        (&a.addon, &a.bundle, a.dependency.as_str()).cmp(&(&b.addon, &b.bundle, b.dependency.as_str()))
    });
    dangling
}

#[cfg(test)]
mod tests {
    use super::*;
    use content_schema::{BundleRecord, QualifiedId};

    fn manifest(edges: &[(&str, &[&str])]) -> BuildManifest {
        let mut manifest = BuildManifest::new();
        for (addon, deps) in edges {
            let mut record = BundleRecord::new("main", 0, "h");
            for dep in *deps {
                record = record.with_dependency(QualifiedId::new(dep, "main"));
            }
            manifest.add_or_find_addon(addon).upsert(record);
        }
        manifest
    }

    #[test]
    fn prerequisites_come_first() {
        let m = manifest(&[("Base", &[]), ("Mid", &["Base"]), ("Top", &["Mid", "Base"])]);
        assert_eq!(resolve_mount_order(&m, "Top").unwrap(), vec!["Base", "Mid", "Top"]);
        assert_eq!(resolve_mount_order(&m, "Base").unwrap(), vec!["Base"]);
    }

    #[test]
    fn self_references_are_ignored() {
        let m = manifest(&[("A", &["A"])]);
        assert_eq!(resolve_mount_order(&m, "A").unwrap(), vec!["A"]);
    }

    #[test]
    fn cycles_are_reported() {
        let m = manifest(&[("A", &["B"]), ("B", &["A"])]);
        assert!(matches!(resolve_mount_order(&m, "A"), Err(ResolveError::Cycle(_))));
    }

    #[test]
    fn missing_prerequisite_is_reported() {
        let m = manifest(&[("A", &["Ghost"])]);
        assert_eq!(
            resolve_mount_order(&m, "A"),
            Err(ResolveError::NotFound("Ghost".to_string()))
        );
    }

    #[test]
    fn verify_lists_dangling_ids() {
        let m = manifest(&[("A", &["Ghost", "A"])]);
        let dangling = verify_manifest(&m);
        assert_eq!(dangling.len(), 1);
        assert_eq!(dangling[0].dependency.as_str(), "Ghost@main");
    }
}
