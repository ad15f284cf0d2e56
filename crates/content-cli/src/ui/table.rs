//! Tabular listings for the catalog, detected addons and mount state.

use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::{Cell, CellAlignment, ContentArrangement, Table};
use content_core::Catalog;
use content_core::loader::AddonSnapshot;
use content_schema::AddonChain;

fn table(header: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_BORDERS_ONLY)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header.to_vec());
    table
}

fn right(value: impl ToString) -> Cell {
    Cell::new(value).set_alignment(CellAlignment::Right)
}

/// One row per bundle, grouped by addon. Addons without bundles get a
/// single row with an empty bundle column.
pub fn catalog_table(catalog: &Catalog) -> Table {
    let mut out = table(&["Addon", "Bundle", "Assets", "Compression"]);
    for addon in catalog.registry().addons() {
        if addon.is_empty() {
            out.add_row(vec![Cell::new(addon.name()), Cell::new("-"), right(0), Cell::new("-")]);
            continue;
        }
        for (i, bundle) in addon.bundles().iter().enumerate() {
            let owner = if i == 0 { addon.name().to_string() } else { String::new() };
            out.add_row(vec![
                Cell::new(owner),
                Cell::new(bundle.name()),
                right(bundle.len()),
                Cell::new(catalog.compression_mode(addon.name(), bundle.name())),
            ]);
        }
    }
    out
}

/// Detected addons with their built bundles.
pub fn detected_table<'a>(chains: impl IntoIterator<Item = &'a AddonChain>) -> Table {
    let mut out = table(&["Addon", "Bundles", "Dependencies"]);
    for chain in chains {
        let dependencies: usize = chain.bundles().iter().map(|b| b.dependencies().len()).sum();
        out.add_row(vec![
            Cell::new(chain.name()),
            right(chain.bundles().len()),
            right(dependencies),
        ]);
    }
    out
}

/// Per-bundle mount state of one addon.
pub fn mount_table(snapshot: &AddonSnapshot) -> Table {
    let mut out = table(&["Bundle", "Status", "Progress", "Live"]);
    for bundle in &snapshot.bundles {
        out.add_row(vec![
            Cell::new(&bundle.name),
            Cell::new(bundle.status),
            right(super::progress::format_percent(bundle.progress)),
            Cell::new(if bundle.live { "yes" } else { "no" }),
        ]);
    }
    out
}
