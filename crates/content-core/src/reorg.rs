//! Bundle reorganization: slicing one bundle into balanced parts and merging
//! several bundles into one.
//!
//! Both operations validate everything up front and either apply fully or
//! leave the registry untouched.

use content_schema::{Bundle, PATH_SEPARATOR, Registry, is_valid_bundle_name};
use std::collections::HashSet;

/// Name of the `index`-th part of a sliced bundle.
pub fn part_name(bundle: &str, index: usize) -> String {
    format!("{bundle}{PATH_SEPARATOR}Part_{index}")
}

/// Sizes of the parts a bundle of `len` assets is sliced into.
///
/// The first `len % parts` parts get one extra asset. Empty parts are
/// dropped, so the result never has more than `len` entries.
pub fn part_sizes(len: usize, parts: usize) -> Vec<usize> {
    if parts == 0 || len == 0 {
        return Vec::new();
    }
    let base = len / parts;
    let remainder = len % parts;
    (0..parts)
        .map(|i| if i < remainder { base + 1 } else { base })
        .filter(|&size| size > 0)
        .collect()
}

/// Slice `addon`/`bundle` into `parts` bundles named `<bundle>/Part_<i>`.
///
/// Parts take the original's position in the addon, and the original is
/// removed once every part is in place. Returns the number of parts
/// created; zero means nothing changed (missing bundle, empty bundle,
/// `parts == 0`, or a part name already taken).
pub fn slice_bundle(registry: &mut Registry, addon: &str, bundle: &str, parts: usize) -> usize {
    let Some(owner) = registry.addon_mut(addon) else {
        return 0;
    };
    let Some(index) = owner.bundle_index(bundle) else {
        return 0;
    };

    let assets = owner.bundles()[index].assets().to_vec();
    let sizes = part_sizes(assets.len(), parts);
    if sizes.is_empty() {
        return 0;
    }

    let names: Vec<String> = (0..sizes.len()).map(|i| part_name(bundle, i)).collect();
    if names.iter().any(|name| owner.has_bundle(name)) {
        tracing::warn!(addon, bundle, "Slice target already exists; nothing sliced");
        return 0;
    }

    let mut remaining = assets.into_iter();
    for (offset, (name, size)) in names.iter().zip(&sizes).enumerate() {
        let mut part = Bundle::new(name.as_str());
        for asset in remaining.by_ref().take(*size) {
            part.add_asset(asset);
        }
        if owner.insert_bundle_at(index + offset, part).is_err() {
            for name in &names[..offset] {
                owner.remove_bundle(name);
            }
            return 0;
        }
    }

    owner.remove_bundle(bundle);
    tracing::debug!(addon, bundle, parts = sizes.len(), "Sliced bundle");
    sizes.len()
}

/// Slice so that no part holds more than `max_assets` assets.
pub fn slice_bundle_max(
    registry: &mut Registry,
    addon: &str,
    bundle: &str,
    max_assets: usize,
) -> usize {
    if max_assets == 0 {
        return 0;
    }
    let Some(len) = registry
        .addon(addon)
        .and_then(|a| a.bundle(bundle))
        .map(Bundle::len)
    else {
        return 0;
    };
    if len <= max_assets {
        return 0;
    }
    slice_bundle(registry, addon, bundle, len.div_ceil(max_assets))
}

/// Merge `sources` of one addon into `dest`.
///
/// Missing sources and a source equal to `dest` are ignored. The merge is
/// rejected as a whole when the combined assets would mix scenes with other
/// assets. `dest` is created when missing. Returns the number of source
/// bundles consumed.
pub fn split_bundles(registry: &mut Registry, addon: &str, sources: &[&str], dest: &str) -> usize {
    let Some(owner) = registry.addon_mut(addon) else {
        return 0;
    };
    if !owner.has_bundle(dest) && !is_valid_bundle_name(dest) {
        tracing::warn!(addon, dest, "Invalid merge target; nothing merged");
        return 0;
    }

    let mut seen = HashSet::new();
    let sources: Vec<&str> = sources
        .iter()
        .copied()
        .filter(|name| *name != dest && owner.has_bundle(name) && seen.insert(*name))
        .collect();
    if sources.is_empty() {
        return 0;
    }

    let (mut scenes, mut others) = owner.bundle(dest).map_or((0, 0), |b| {
        let scenes = b.scenes();
        (scenes, b.len() - scenes)
    });
    for name in &sources {
        if let Some(bundle) = owner.bundle(name) {
            let s = bundle.scenes();
            scenes += s;
            others += bundle.len() - s;
        }
    }
    if scenes > 0 && others > 0 {
        tracing::warn!(addon, dest, "Merge would mix scenes and assets; nothing merged");
        return 0;
    }

    let mut drained = Vec::new();
    for name in &sources {
        if let Some(mut bundle) = owner.remove_bundle(name) {
            drained.extend(bundle.take_assets());
        }
    }

    let Some(target) = owner.add_or_find_bundle(dest) else {
        return 0;
    };
    for asset in drained {
        let status = target.add_asset(asset);
        if !status.is_ok() {
            tracing::warn!(addon, dest, %status, "Asset dropped while merging");
        }
    }

    sources.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use content_schema::{Asset, Status};

    fn texture(id: &str) -> Asset {
        Asset::new(id, format!("Assets/{id}.png"), id, "Texture2D", "Texture")
    }

    fn scene(id: &str) -> Asset {
        Asset::new(id, format!("Assets/{id}.unity"), id, "SceneAsset", "Object")
    }

    fn registry_with(bundles: &[(&str, Vec<Asset>)]) -> Registry {
        let mut registry = Registry::new();
        let addon = registry.add_addon("A").unwrap();
        for (name, assets) in bundles {
            let bundle = addon.add_bundle(name).unwrap();
            for asset in assets {
                assert_eq!(bundle.add_asset(asset.clone()), Status::Ok);
            }
        }
        registry
    }

    fn sizes(registry: &Registry) -> Vec<(String, usize)> {
        registry
            .addon("A")
            .unwrap()
            .bundles()
            .iter()
            .map(|b| (b.name().to_string(), b.len()))
            .collect()
    }

    #[test]
    fn part_sizes_are_balanced() {
        assert_eq!(part_sizes(7, 3), vec![3, 2, 2]);
        assert_eq!(part_sizes(6, 3), vec![2, 2, 2]);
        assert_eq!(part_sizes(2, 5), vec![1, 1]);
        assert!(part_sizes(0, 3).is_empty());
        assert!(part_sizes(3, 0).is_empty());

        for (n, p) in [(10, 3), (1, 1), (100, 7), (13, 13)] {
            let sizes = part_sizes(n, p);
            assert_eq!(sizes.iter().sum::<usize>(), n);
            assert_eq!(sizes.iter().filter(|&&s| s == n.div_ceil(p)).count(), if n % p == 0 { p } else { n % p });
        }
    }

    #[test]
    fn slice_seven_into_three() {
        let assets: Vec<Asset> = (0..7).map(|i| texture(&format!("t{i}"))).collect();
        let mut registry = registry_with(&[("before", vec![]), ("big", assets), ("after", vec![])]);

        assert_eq!(slice_bundle(&mut registry, "A", "big", 3), 3);
        assert_eq!(
            sizes(&registry),
            vec![
                ("before".to_string(), 0),
                ("big/Part_0".to_string(), 3),
                ("big/Part_1".to_string(), 2),
                ("big/Part_2".to_string(), 2),
                ("after".to_string(), 0),
            ]
        );

        let part = registry.addon("A").unwrap().bundle("big/Part_1").unwrap();
        assert_eq!(part.assets()[0].content_id(), "t3");
    }

    #[test]
    fn slice_more_parts_than_assets_skips_empty() {
        let mut registry = registry_with(&[("b", vec![texture("t0"), texture("t1")])]);
        assert_eq!(slice_bundle(&mut registry, "A", "b", 5), 2);
        assert_eq!(registry.addon("A").unwrap().len(), 2);
    }

    #[test]
    fn slice_degenerate_cases_do_nothing() {
        let mut registry = registry_with(&[("empty", vec![]), ("b", vec![texture("t0")])]);
        let before = registry.clone();

        assert_eq!(slice_bundle(&mut registry, "A", "empty", 3), 0);
        assert_eq!(slice_bundle(&mut registry, "A", "b", 0), 0);
        assert_eq!(slice_bundle(&mut registry, "A", "missing", 2), 0);
        assert_eq!(slice_bundle(&mut registry, "Nope", "b", 2), 0);
        assert_eq!(registry, before);
    }

    #[test]
    fn slice_refuses_taken_part_names() {
        let mut registry = registry_with(&[
            ("b", vec![texture("t0"), texture("t1")]),
            ("b/Part_1", vec![]),
        ]);
        let before = registry.clone();
        assert_eq!(slice_bundle(&mut registry, "A", "b", 2), 0);
        assert_eq!(registry, before);
    }

    #[test]
    fn slice_max_caps_part_size() {
        let assets: Vec<Asset> = (0..10).map(|i| texture(&format!("t{i}"))).collect();
        let mut registry = registry_with(&[("b", assets)]);
        assert_eq!(slice_bundle_max(&mut registry, "A", "b", 4), 3);
        assert!(sizes(&registry).iter().all(|(_, n)| *n <= 4));

        assert_eq!(slice_bundle_max(&mut registry, "A", "b/Part_0", 4), 0);
    }

    #[test]
    fn split_merges_sources_into_dest() {
        let mut registry = registry_with(&[
            ("B1", vec![texture("t0"), texture("t1")]),
            ("B2", vec![texture("t2")]),
            ("Dest", vec![]),
        ]);

        assert_eq!(split_bundles(&mut registry, "A", &["B1", "B2"], "Dest"), 2);
        let addon = registry.addon("A").unwrap();
        assert!(!addon.has_bundle("B1"));
        assert!(!addon.has_bundle("B2"));
        assert_eq!(addon.bundle("Dest").unwrap().len(), 3);
    }

    #[test]
    fn split_creates_missing_dest_and_ignores_self() {
        let mut registry = registry_with(&[("B1", vec![texture("t0")]), ("B2", vec![texture("t1")])]);

        assert_eq!(
            split_bundles(&mut registry, "A", &["B1", "B2", "missing", "B2"], "B2"),
            1
        );
        let addon = registry.addon("A").unwrap();
        assert_eq!(addon.bundle("B2").unwrap().len(), 2);

        assert_eq!(split_bundles(&mut registry, "A", &["B2"], "Fresh"), 1);
        assert_eq!(registry.addon("A").unwrap().bundle("Fresh").unwrap().len(), 2);
    }

    #[test]
    fn split_rejects_mixed_scenes_without_mutation() {
        let mut registry = registry_with(&[
            ("levels", vec![scene("s0")]),
            ("textures", vec![texture("t0")]),
        ]);
        let before = registry.clone();

        assert_eq!(
            split_bundles(&mut registry, "A", &["levels", "textures"], "Dest"),
            0
        );
        assert_eq!(split_bundles(&mut registry, "A", &["levels"], "textures"), 0);
        assert_eq!(registry, before);
    }

    #[test]
    fn split_rejects_escaping_dest() {
        let mut registry = registry_with(&[("B1", vec![texture("t0")])]);
        let before = registry.clone();
        assert_eq!(split_bundles(&mut registry, "A", &["B1"], "../outside"), 0);
        assert_eq!(split_bundles(&mut registry, "A", &["B1"], ""), 0);
        assert_eq!(registry, before);
    }
}
