//! The addon → bundle → asset hierarchy persisted as `content.json`.
//!
//! The types here own their invariants: names are unique at each level,
//! content ids are unique inside a bundle, and a bundle never mixes scene
//! assets with non-scene assets. Operations that would break an invariant
//! return a [`Status`] (or `None`) and leave the structure untouched.

use crate::types::{AddonName, AssetSearch, Status, is_valid_bundle_name};
use serde::{Deserialize, Serialize};

const SCENE_TYPE_MARKER: &str = "sceneasset";

/// Identity of one packaged file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    name: String,
    path: String,
    #[serde(rename = "contentId")]
    content_id: String,
    #[serde(rename = "type")]
    type_name: String,
    #[serde(rename = "baseType", default)]
    base_type: String,
}

impl Asset {
    /// Create a new asset record.
    pub fn new(
        name: impl Into<String>,
        path: impl Into<String>,
        content_id: impl Into<String>,
        type_name: impl Into<String>,
        base_type: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            content_id: content_id.into(),
            type_name: type_name.into(),
            base_type: base_type.into(),
        }
    }

    /// Friendly (addressable) name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Source path of the underlying file.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Stable content id assigned by the import pipeline.
    pub fn content_id(&self) -> &str {
        &self.content_id
    }

    /// Concrete type name reported by the import pipeline.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Declared parent type name, empty when unknown.
    pub fn base_type(&self) -> &str {
        &self.base_type
    }

    /// Rename the asset. Only the friendly name changes.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Point the record at a moved file.
    pub fn set_path(&mut self, path: impl Into<String>) {
        self.path = path.into();
    }

    /// Returns `true` if this asset is a scene.
    pub fn is_scene(&self) -> bool {
        self.type_name
            .to_ascii_lowercase()
            .contains(SCENE_TYPE_MARKER)
    }

    /// Returns `true` if the field selected by `search` equals `value`.
    pub fn matches(&self, value: &str, search: AssetSearch) -> bool {
        match search {
            AssetSearch::Name => self.name == value,
            AssetSearch::ContentId => self.content_id == value,
            AssetSearch::Path => self.path == value,
        }
    }
}

/// An archive unit under construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bundle {
    name: String,
    #[serde(rename = "Assets", default)]
    assets: Vec<Asset>,
}

impl Bundle {
    /// Create an empty bundle.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            assets: Vec::new(),
        }
    }

    /// Bundle name, unique within its addon.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Assets in insertion order.
    pub fn assets(&self) -> &[Asset] {
        &self.assets
    }

    /// Number of assets.
    pub fn len(&self) -> usize {
        self.assets.len()
    }

    /// Returns `true` if the bundle has no assets.
    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Number of scene assets.
    pub fn scenes(&self) -> usize {
        self.assets.iter().filter(|a| a.is_scene()).count()
    }

    /// Find an asset by the given search key.
    pub fn find(&self, value: &str, search: AssetSearch) -> Option<&Asset> {
        self.assets.iter().find(|a| a.matches(value, search))
    }

    /// Find an asset mutably by the given search key.
    pub fn find_mut(&mut self, value: &str, search: AssetSearch) -> Option<&mut Asset> {
        self.assets.iter_mut().find(|a| a.matches(value, search))
    }

    /// Returns `true` if an asset matches the given search key.
    pub fn has_asset(&self, value: &str, search: AssetSearch) -> bool {
        self.find(value, search).is_some()
    }

    /// Check the scene segregation rule for `asset` without mutating.
    pub fn admits(&self, asset: &Asset) -> Status {
        let scenes = self.scenes();
        if !asset.is_scene() && scenes > 0 {
            Status::BundleHaveScenes
        } else if asset.is_scene() && scenes == 0 && !self.assets.is_empty() {
            Status::BundleHaveAssets
        } else {
            Status::Ok
        }
    }

    /// Append an asset, enforcing content id uniqueness and segregation.
    pub fn add_asset(&mut self, asset: Asset) -> Status {
        if self.has_asset(&asset.content_id, AssetSearch::ContentId) {
            return Status::AlreadyContains;
        }

        let status = self.admits(&asset);
        if status.is_ok() {
            self.assets.push(asset);
        }
        status
    }

    /// Remove the first asset matching the search key.
    pub fn remove_asset(&mut self, value: &str, search: AssetSearch) -> Option<Asset> {
        let index = self.assets.iter().position(|a| a.matches(value, search))?;
        Some(self.assets.remove(index))
    }

    /// Take every asset out of the bundle, leaving it empty.
    pub fn take_assets(&mut self) -> Vec<Asset> {
        std::mem::take(&mut self.assets)
    }
}

/// A named, independently distributable content pack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Addon {
    name: AddonName,
    /// Free-form description, `-` when unset.
    #[serde(default = "placeholder")]
    pub description: String,
    /// Author, `-` when unset.
    #[serde(default = "placeholder")]
    pub author: String,
    #[serde(rename = "Bundles", default)]
    bundles: Vec<Bundle>,
}

fn placeholder() -> String {
    "-".to_string()
}

impl Addon {
    /// Create an addon with placeholder description and author.
    pub fn new(name: impl Into<AddonName>) -> Self {
        Self {
            name: name.into(),
            description: placeholder(),
            author: placeholder(),
            bundles: Vec::new(),
        }
    }

    /// Sanitized addon name.
    pub fn name(&self) -> &AddonName {
        &self.name
    }

    /// Bundles in declaration order.
    pub fn bundles(&self) -> &[Bundle] {
        &self.bundles
    }

    /// Number of bundles.
    pub fn len(&self) -> usize {
        self.bundles.len()
    }

    /// Returns `true` if the addon has no bundles.
    pub fn is_empty(&self) -> bool {
        self.bundles.is_empty()
    }

    /// Position of the named bundle.
    pub fn bundle_index(&self, name: &str) -> Option<usize> {
        self.bundles.iter().position(|b| b.name == name)
    }

    /// Find a bundle by exact name.
    pub fn bundle(&self, name: &str) -> Option<&Bundle> {
        self.bundles.iter().find(|b| b.name == name)
    }

    /// Find a bundle mutably by exact name.
    pub fn bundle_mut(&mut self, name: &str) -> Option<&mut Bundle> {
        self.bundles.iter_mut().find(|b| b.name == name)
    }

    /// Returns `true` if a bundle with this name exists.
    pub fn has_bundle(&self, name: &str) -> bool {
        self.bundle(name).is_some()
    }

    /// Create a bundle. Returns `None` if the name is taken or invalid
    /// (see [`is_valid_bundle_name`]).
    pub fn add_bundle(&mut self, name: &str) -> Option<&mut Bundle> {
        if !is_valid_bundle_name(name) || self.has_bundle(name) {
            return None;
        }
        self.bundles.push(Bundle::new(name));
        self.bundles.last_mut()
    }

    /// Return the named bundle, creating it when missing. Returns `None` if
    /// the bundle does not exist and `name` is invalid.
    pub fn add_or_find_bundle(&mut self, name: &str) -> Option<&mut Bundle> {
        match self.bundle_index(name) {
            Some(index) => self.bundles.get_mut(index),
            None => self.add_bundle(name),
        }
    }

    /// Insert an existing bundle at `index` (clamped to the end).
    ///
    /// # Errors
    ///
    /// Hands the bundle back if its name is invalid or already taken.
    pub fn insert_bundle_at(&mut self, index: usize, bundle: Bundle) -> Result<(), Bundle> {
        if !is_valid_bundle_name(&bundle.name) || self.has_bundle(&bundle.name) {
            return Err(bundle);
        }
        let index = index.min(self.bundles.len());
        self.bundles.insert(index, bundle);
        Ok(())
    }

    /// Append an existing bundle.
    ///
    /// # Errors
    ///
    /// Hands the bundle back if its name is invalid or already taken.
    pub fn push_bundle(&mut self, bundle: Bundle) -> Result<(), Bundle> {
        let end = self.bundles.len();
        self.insert_bundle_at(end, bundle)
    }

    /// Remove a bundle and all of its assets.
    pub fn remove_bundle(&mut self, name: &str) -> Option<Bundle> {
        let index = self.bundle_index(name)?;
        Some(self.bundles.remove(index))
    }

    /// Total number of assets across all bundles.
    pub fn asset_count(&self) -> usize {
        self.bundles.iter().map(Bundle::len).sum()
    }
}

/// The full catalog: root aggregate owning every addon, bundle and asset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registry {
    #[serde(rename = "Addons", default)]
    addons: Vec<Addon>,
}

/// Where an asset lives inside the registry.
#[derive(Debug, Clone, Copy)]
pub struct AssetLocation<'a> {
    /// Owning addon.
    pub addon: &'a Addon,
    /// Owning bundle.
    pub bundle: &'a Bundle,
    /// The asset itself.
    pub asset: &'a Asset,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Addons in declaration order.
    pub fn addons(&self) -> &[Addon] {
        &self.addons
    }

    /// Number of addons.
    pub fn len(&self) -> usize {
        self.addons.len()
    }

    /// Returns `true` if the registry has no addons.
    pub fn is_empty(&self) -> bool {
        self.addons.is_empty()
    }

    /// Find an addon by exact (sanitized) name.
    pub fn addon(&self, name: &str) -> Option<&Addon> {
        self.addons.iter().find(|a| a.name == name)
    }

    /// Find an addon mutably by exact (sanitized) name.
    pub fn addon_mut(&mut self, name: &str) -> Option<&mut Addon> {
        self.addons.iter_mut().find(|a| a.name == name)
    }

    /// Returns `true` if an addon with this name exists.
    pub fn has_addon(&self, name: &str) -> bool {
        self.addon(name).is_some()
    }

    /// Create an addon. Returns `None` if the sanitized name is empty or taken.
    pub fn add_addon(&mut self, name: &str) -> Option<&mut Addon> {
        let name = AddonName::new(name);
        if name.is_empty() || self.has_addon(&name) {
            return None;
        }
        self.addons.push(Addon::new(name));
        self.addons.last_mut()
    }

    /// Append an existing addon.
    ///
    /// # Errors
    ///
    /// Hands the addon back if its name is already taken.
    pub fn insert_addon(&mut self, addon: Addon) -> Result<(), Addon> {
        if self.has_addon(&addon.name) {
            return Err(addon);
        }
        self.addons.push(addon);
        Ok(())
    }

    /// Rename an addon. Fails if the sanitized name is empty or taken.
    pub fn rename_addon(&mut self, from: &str, to: &str) -> bool {
        let to = AddonName::new(to);
        if to.is_empty() || self.has_addon(&to) {
            return false;
        }
        match self.addon_mut(from) {
            Some(addon) => {
                addon.name = to;
                true
            }
            None => false,
        }
    }

    /// Remove an addon and everything it owns.
    pub fn remove_addon(&mut self, name: &str) -> Option<Addon> {
        let index = self.addons.iter().position(|a| a.name == name)?;
        Some(self.addons.remove(index))
    }

    /// Returns `true` if any addon holds a bundle with this name.
    pub fn has_bundle(&self, name: &str) -> bool {
        self.find_bundle(name).is_some()
    }

    /// Find the first bundle with this name across all addons.
    pub fn find_bundle(&self, name: &str) -> Option<(&Addon, &Bundle)> {
        self.addons
            .iter()
            .find_map(|addon| addon.bundle(name).map(|bundle| (addon, bundle)))
    }

    /// Returns `true` if any bundle holds a matching asset.
    pub fn has_asset(&self, value: &str, search: AssetSearch) -> bool {
        self.find_asset(value, search).is_some()
    }

    /// Find the first matching asset and where it lives.
    pub fn find_asset(&self, value: &str, search: AssetSearch) -> Option<AssetLocation<'_>> {
        self.addons.iter().find_map(|addon| {
            addon.bundles.iter().find_map(|bundle| {
                bundle.find(value, search).map(|asset| AssetLocation {
                    addon,
                    bundle,
                    asset,
                })
            })
        })
    }

    /// Find the first matching asset mutably.
    pub fn find_asset_mut(&mut self, value: &str, search: AssetSearch) -> Option<&mut Asset> {
        self.addons
            .iter_mut()
            .flat_map(|addon| addon.bundles.iter_mut())
            .find_map(|bundle| bundle.find_mut(value, search))
    }

    /// Remove the first matching asset from whichever bundle holds it.
    pub fn remove_asset(&mut self, value: &str, search: AssetSearch) -> Option<Asset> {
        self.addons
            .iter_mut()
            .flat_map(|addon| addon.bundles.iter_mut())
            .find_map(|bundle| bundle.remove_asset(value, search))
    }

    /// Move an asset into `dest_addon`/`dest_bundle`.
    ///
    /// Segregation is checked against the destination before the asset is
    /// taken out of its source, so a rejected move leaves it where it was.
    pub fn move_asset(&mut self, content_id: &str, dest_addon: &str, dest_bundle: &str) -> Status {
        let Some(asset) = self
            .find_asset(content_id, AssetSearch::ContentId)
            .map(|loc| loc.asset.clone())
        else {
            return Status::Failed;
        };

        let Some(dest) = self
            .addon(dest_addon)
            .and_then(|addon| addon.bundle(dest_bundle))
        else {
            return Status::Failed;
        };

        if dest.has_asset(content_id, AssetSearch::ContentId) {
            return Status::AlreadyContains;
        }

        let status = dest.admits(&asset);
        if !status.is_ok() {
            return status;
        }

        if self.remove_asset(content_id, AssetSearch::ContentId).is_none() {
            return Status::Failed;
        }

        match self
            .addon_mut(dest_addon)
            .and_then(|addon| addon.bundle_mut(dest_bundle))
        {
            Some(dest) => dest.add_asset(asset),
            None => Status::Failed,
        }
    }

    /// Move a whole bundle into another addon.
    ///
    /// Fails without mutation if the source is missing, its name is not a
    /// valid bundle name, or the destination addon already has a bundle with
    /// the same name.
    pub fn move_bundle(&mut self, bundle: &str, dest_addon: &str) -> bool {
        let Some(dest) = self.addon(dest_addon) else {
            return false;
        };
        if dest.has_bundle(bundle) || !is_valid_bundle_name(bundle) {
            return false;
        }

        let taken = self
            .addons
            .iter_mut()
            .find_map(|addon| addon.remove_bundle(bundle));

        match (taken, self.addon_mut(dest_addon)) {
            (Some(taken), Some(dest)) => dest.push_bundle(taken).is_ok(),
            _ => false,
        }
    }

    /// A copy of the registry holding only the named addon.
    pub fn scoped(&self, addon: &str) -> Option<Registry> {
        self.addon(addon).map(|addon| Registry {
            addons: vec![addon.clone()],
        })
    }

    /// Total number of assets across the whole registry.
    pub fn asset_count(&self) -> usize {
        self.addons.iter().map(Addon::asset_count).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texture(id: &str) -> Asset {
        Asset::new(id, format!("Assets/{id}.png"), id, "Texture2D", "Texture")
    }

    fn scene(id: &str) -> Asset {
        Asset::new(id, format!("Assets/{id}.unity"), id, "SceneAsset", "Object")
    }

    #[test]
    fn scene_detection_is_case_insensitive() {
        assert!(Asset::new("a", "p", "1", "sceneasset", "").is_scene());
        assert!(scene("lvl").is_scene());
        assert!(!texture("t").is_scene());
    }

    #[test]
    fn add_asset_rejects_duplicate_content_id() {
        let mut bundle = Bundle::new("b");
        assert_eq!(bundle.add_asset(texture("t1")), Status::Ok);
        assert_eq!(bundle.add_asset(texture("t1")), Status::AlreadyContains);
        assert_eq!(bundle.len(), 1);
    }

    #[test]
    fn scene_into_asset_bundle_is_rejected() {
        let mut bundle = Bundle::new("b");
        bundle.add_asset(texture("t1"));
        let before = bundle.clone();

        assert_eq!(bundle.add_asset(scene("s1")), Status::BundleHaveAssets);
        assert_eq!(bundle, before);
    }

    #[test]
    fn asset_into_scene_bundle_is_rejected() {
        let mut bundle = Bundle::new("b");
        bundle.add_asset(scene("s1"));
        let before = bundle.clone();

        assert_eq!(bundle.add_asset(texture("t1")), Status::BundleHaveScenes);
        assert_eq!(bundle, before);
        assert_eq!(bundle.add_asset(scene("s2")), Status::Ok);
    }

    #[test]
    fn add_addon_rejects_duplicates_after_sanitizing() {
        let mut registry = Registry::new();
        assert!(registry.add_addon("Core").is_some());
        assert!(registry.add_addon("Co.re").is_none());
        assert!(registry.add_addon("core").is_some());
        assert!(registry.add_addon("./").is_none());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn add_bundle_rejects_duplicates() {
        let mut addon = Addon::new("A");
        assert!(addon.add_bundle("b").is_some());
        assert!(addon.add_bundle("b").is_none());
        assert_eq!(addon.len(), 1);
    }

    #[test]
    fn bundle_names_cannot_leave_the_addon() {
        let mut addon = Addon::new("A");
        assert!(addon.add_bundle("../../../escaped").is_none());
        assert!(addon.add_bundle("").is_none());
        assert!(addon.add_or_find_bundle("a/../b").is_none());
        assert!(addon.insert_bundle_at(0, Bundle::new("..")).is_err());
        assert!(addon.push_bundle(Bundle::new(r"x\y")).is_err());
        assert!(addon.is_empty());

        assert!(addon.add_or_find_bundle("ok/Part_0").is_some());
        assert!(addon.add_or_find_bundle("ok/Part_0").is_some());
        assert_eq!(addon.len(), 1);
    }

    #[test]
    fn lookups_by_each_search_key() {
        let mut registry = Registry::new();
        let addon = registry.add_addon("A").unwrap();
        addon.add_bundle("b").unwrap().add_asset(texture("t1"));

        assert!(registry.has_asset("t1", AssetSearch::Name));
        assert!(registry.has_asset("t1", AssetSearch::ContentId));
        assert!(registry.has_asset("Assets/t1.png", AssetSearch::Path));
        assert!(!registry.has_asset("Assets/t1.png", AssetSearch::Name));

        let loc = registry.find_asset("t1", AssetSearch::ContentId).unwrap();
        assert_eq!(loc.addon.name(), "A");
        assert_eq!(loc.bundle.name(), "b");
        assert!(registry.has_bundle("b"));
    }

    #[test]
    fn move_asset_keeps_source_on_segregation_failure() {
        let mut registry = Registry::new();
        let addon = registry.add_addon("A").unwrap();
        addon.add_bundle("textures").unwrap().add_asset(texture("t1"));
        addon.add_bundle("levels").unwrap().add_asset(scene("s1"));

        assert_eq!(
            registry.move_asset("t1", "A", "levels"),
            Status::BundleHaveScenes
        );
        let addon = registry.addon("A").unwrap();
        assert_eq!(addon.bundle("textures").unwrap().len(), 1);
        assert_eq!(addon.bundle("levels").unwrap().len(), 1);
    }

    #[test]
    fn move_asset_between_bundles() {
        let mut registry = Registry::new();
        let addon = registry.add_addon("A").unwrap();
        addon.add_bundle("one").unwrap().add_asset(texture("t1"));
        addon.add_bundle("two");

        assert_eq!(registry.move_asset("t1", "A", "two"), Status::Ok);
        let addon = registry.addon("A").unwrap();
        assert!(addon.bundle("one").unwrap().is_empty());
        assert_eq!(addon.bundle("two").unwrap().len(), 1);
        assert_eq!(registry.move_asset("missing", "A", "two"), Status::Failed);
        assert_eq!(registry.move_asset("t1", "A", "nope"), Status::Failed);
    }

    #[test]
    fn move_bundle_between_addons() {
        let mut registry = Registry::new();
        registry.add_addon("A").unwrap().add_bundle("shared");
        registry.add_addon("B");

        assert!(registry.move_bundle("shared", "B"));
        assert!(!registry.addon("A").unwrap().has_bundle("shared"));
        assert!(registry.addon("B").unwrap().has_bundle("shared"));
        assert!(!registry.move_bundle("shared", "Missing"));
    }

    #[test]
    fn registry_json_round_trip_preserves_order() {
        let mut registry = Registry::new();
        let addon = registry.add_addon("Weapons").unwrap();
        addon.author = "studio".into();
        let bundle = addon.add_bundle("rifles").unwrap();
        bundle.add_asset(texture("t2"));
        bundle.add_asset(texture("t1"));
        registry.add_addon("Maps").unwrap().add_bundle("desert").unwrap().add_asset(scene("s1"));

        let json = serde_json::to_string_pretty(&registry).unwrap();
        assert!(json.contains("\"Addons\""));
        assert!(json.contains("\"contentId\""));
        assert!(json.contains("\"baseType\""));

        let restored: Registry = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, registry);
        let ids: Vec<_> = restored.addons()[0].bundles()[0]
            .assets()
            .iter()
            .map(Asset::content_id)
            .collect();
        assert_eq!(ids, vec!["t2", "t1"]);
    }

    #[test]
    fn scoped_registry_holds_one_addon() {
        let mut registry = Registry::new();
        registry.add_addon("A");
        registry.add_addon("B");
        let scoped = registry.scoped("B").unwrap();
        assert_eq!(scoped.len(), 1);
        assert!(scoped.has_addon("B"));
        assert!(registry.scoped("C").is_none());
    }
}
