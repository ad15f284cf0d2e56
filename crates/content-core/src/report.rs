//! Plain-text catalog report.

use crate::catalog::Catalog;
use crate::paths;
use std::fmt;
use std::path::{Path, PathBuf};

const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];

/// Format a byte count with binary units, e.g. `1.50 MB`.
pub fn format_size(bytes: u64) -> String {
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{size:.2} {}", UNITS[unit])
    }
}

/// Total size of the archives below an addon folder.
///
/// The exported `content.json` and `chain.json` are not archives and are
/// left out.
fn archives_size(dir: &Path) -> u64 {
    let exports = [paths::content_file(dir), paths::chain_file(dir)];
    walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file() && !exports.iter().any(|p| p == e.path()))
        .filter_map(|e| e.metadata().ok())
        .map(|m| m.len())
        .sum()
}

fn file_size(path: &Path) -> Option<u64> {
    std::fs::metadata(path)
        .ok()
        .filter(std::fs::Metadata::is_file)
        .map(|m| m.len())
}

/// Text report over a catalog, rendered through [`fmt::Display`].
///
/// Sizes come from built archives on disk; bundles that were never built
/// are marked as such.
#[derive(Debug, Clone, Copy)]
pub struct Report<'a> {
    catalog: &'a Catalog,
}

impl<'a> Report<'a> {
    /// Report over `catalog`.
    pub fn new(catalog: &'a Catalog) -> Self {
        Self { catalog }
    }
}

impl fmt::Display for Report<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let catalog = self.catalog;
        let root = catalog.root();
        let registry = catalog.registry();

        let addon_sizes: Vec<u64> = registry
            .addons()
            .iter()
            .map(|addon| archives_size(&paths::addon_dir(root, addon.name())))
            .collect();
        let total: u64 = addon_sizes.iter().sum();
        let bundles: usize = registry.addons().iter().map(|a| a.len()).sum();

        writeln!(
            f,
            "Content report ({})",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
        )?;
        writeln!(f, "Root: {}", root.display())?;
        writeln!(f, "Total size: {}", format_size(total))?;
        writeln!(
            f,
            "Addons: {}  Bundles: {}  Assets: {}",
            registry.len(),
            bundles,
            registry.asset_count()
        )?;

        for (addon, size) in registry.addons().iter().zip(&addon_sizes) {
            writeln!(f)?;
            writeln!(
                f,
                "[{}] {} (author: {}, {})",
                addon.name(),
                format_size(*size),
                addon.author,
                addon.description
            )?;

            for bundle in addon.bundles() {
                let size = paths::bundle_path(root, addon.name(), bundle.name())
                    .and_then(|archive| file_size(&archive))
                    .map_or_else(|| "not built".to_string(), format_size);
                writeln!(
                    f,
                    "  {} [{} assets, {}] {}",
                    bundle.name(),
                    bundle.len(),
                    catalog.compression_mode(addon.name(), bundle.name()),
                    size
                )?;
                for asset in bundle.assets() {
                    writeln!(
                        f,
                        "    - {} ({}) <{}>",
                        asset.name(),
                        asset.path(),
                        asset.type_name()
                    )?;
                }
            }
        }

        Ok(())
    }
}

/// Render the catalog as a text report.
pub fn render_report(catalog: &Catalog) -> String {
    Report::new(catalog).to_string()
}

/// Render the report and save it as `report.log` in the content root.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub async fn write_report(catalog: &Catalog) -> std::io::Result<PathBuf> {
    let path = paths::report_file(catalog.root());
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&path, render_report(catalog)).await?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::AssetDescriptor;
    use crate::config::ContentConfig;
    use tempfile::TempDir;

    #[test]
    fn sizes_use_binary_units() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(1023), "1023 B");
        assert_eq!(format_size(1536), "1.50 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.00 MB");
        assert_eq!(format_size(3 * 1024 * 1024 * 1024), "3.00 GB");
        assert_eq!(format_size(2048 * 1024 * 1024 * 1024), "2048.00 GB");
    }

    #[tokio::test]
    async fn report_lists_hierarchy_and_sizes() {
        let dir = TempDir::new().unwrap();
        let mut catalog = Catalog::new(ContentConfig::new(dir.path()));
        catalog.add_addon("Weapons").unwrap();
        catalog.add_bundle("Weapons", "rifles").unwrap();
        catalog.add_bundle("Weapons", "pistols").unwrap();
        catalog.add_asset(
            "Weapons",
            "rifles",
            &AssetDescriptor::new("ak", "Assets/ak.png", "g1", "Texture2D", "Texture"),
        );

        std::fs::create_dir_all(dir.path().join("Weapons")).unwrap();
        std::fs::write(dir.path().join("Weapons").join("rifles"), vec![0u8; 2048]).unwrap();
        std::fs::write(paths::content_file(&dir.path().join("Weapons")), vec![b' '; 700]).unwrap();
        std::fs::write(paths::chain_file(&dir.path().join("Weapons")), vec![b' '; 300]).unwrap();

        let path = write_report(&catalog).await.unwrap();
        let report = std::fs::read_to_string(path).unwrap();
        assert!(report.contains("Total size: 2.00 KB"));
        assert!(report.contains("[Weapons] 2.00 KB"));
        assert!(report.contains("Addons: 1  Bundles: 2  Assets: 1"));
        assert!(report.contains("rifles [1 assets, none] 2.00 KB"));
        assert!(report.contains("pistols [0 assets, none] not built"));
        assert!(report.contains("- ak (Assets/ak.png) <Texture2D>"));
    }
}
