//! Asset admission check.

use crate::config::CapabilityTable;
use content_schema::{Asset, AssetSearch, Registry, Status};

/// An asset as reported by the import pipeline, before admission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetDescriptor {
    /// Friendly (addressable) name.
    pub name: String,
    /// Source path of the file.
    pub path: String,
    /// Stable content id.
    pub content_id: String,
    /// Concrete type name.
    pub type_name: String,
    /// Parent type name, empty when unknown.
    pub base_type: String,
    /// The asset is flagged as never saved into builds.
    pub hide_flags: bool,
    /// The asset is embedded in a scene rather than stored on disk.
    pub from_scene: bool,
}

impl AssetDescriptor {
    /// Descriptor for an on-disk file with no flags set.
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
            hide_flags: false,
            from_scene: false,
        }
    }

    /// The registry record for this descriptor.
    pub fn to_asset(&self) -> Asset {
        Asset::new(
            &self.name,
            &self.path,
            &self.content_id,
            &self.type_name,
            &self.base_type,
        )
    }
}

/// Decide whether `descriptor` may enter the registry.
///
/// Checks run in a fixed order and the first failure is returned.
pub fn check_asset(
    descriptor: &AssetDescriptor,
    registry: &Registry,
    capabilities: &CapabilityTable,
) -> Status {
    if descriptor.content_id.is_empty() || descriptor.path.is_empty() {
        return Status::MissingOrNullAsset;
    }
    if descriptor.hide_flags {
        return Status::HasHideFlags;
    }
    if descriptor.from_scene {
        return Status::IsAssetFromScene;
    }
    if registry.has_asset(&descriptor.content_id, AssetSearch::ContentId) {
        return Status::AlreadyContains;
    }
    if !capabilities.is_supported(&descriptor.type_name, &descriptor.base_type) {
        return Status::NotSupported;
    }
    check_location(&descriptor.path)
}

/// The path-only part of the admission check.
pub fn check_location(path: &str) -> Status {
    if is_resource_path(path) {
        Status::IsResourceAsset
    } else if is_editor_path(path) {
        Status::IsEditorAsset
    } else {
        Status::Ok
    }
}

/// Returns `true` if `path` lies inside a resources folder.
pub fn is_resource_path(path: &str) -> bool {
    let path = normalize(path);
    path.contains("/resources/")
        || path.contains("editor resources")
        || path.contains("package resources")
        || path.ends_with("/resources")
}

/// Returns `true` if `path` lies inside an editor-only folder.
pub fn is_editor_path(path: &str) -> bool {
    let path = normalize(path);
    path.contains("/editor/") || path.ends_with("/editor")
}

fn normalize(path: &str) -> String {
    path.replace('\\', "/").to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texture(id: &str, path: &str) -> AssetDescriptor {
        AssetDescriptor::new(id, path, id, "Texture2D", "Texture")
    }

    #[test]
    fn ok_for_plain_supported_asset() {
        let registry = Registry::new();
        let caps = CapabilityTable::builtin();
        assert_eq!(
            check_asset(&texture("t", "Assets/Art/t.png"), &registry, &caps),
            Status::Ok
        );
    }

    #[test]
    fn checks_run_in_order() {
        let registry = Registry::new();
        let caps = CapabilityTable::builtin();

        let mut d = texture("", "Assets/Resources/t.png");
        d.hide_flags = true;
        assert_eq!(check_asset(&d, &registry, &caps), Status::MissingOrNullAsset);

        d.content_id = "t".into();
        assert_eq!(check_asset(&d, &registry, &caps), Status::HasHideFlags);

        d.hide_flags = false;
        d.from_scene = true;
        assert_eq!(check_asset(&d, &registry, &caps), Status::IsAssetFromScene);

        d.from_scene = false;
        d.type_name = "MonoScript".into();
        assert_eq!(check_asset(&d, &registry, &caps), Status::NotSupported);

        d.type_name = "Texture2D".into();
        assert_eq!(check_asset(&d, &registry, &caps), Status::IsResourceAsset);

        d.path = "Assets/Editor/t.png".into();
        assert_eq!(check_asset(&d, &registry, &caps), Status::IsEditorAsset);
    }

    #[test]
    fn content_id_is_globally_unique() {
        let mut registry = Registry::new();
        registry
            .add_addon("A")
            .unwrap()
            .add_bundle("b")
            .unwrap()
            .add_asset(texture("t", "Assets/t.png").to_asset());

        let caps = CapabilityTable::builtin();
        assert_eq!(
            check_asset(&texture("t", "Assets/other.png"), &registry, &caps),
            Status::AlreadyContains
        );
    }

    #[test]
    fn resource_and_editor_paths() {
        assert!(is_resource_path("Assets/Resources/x.png"));
        assert!(is_resource_path(r"Assets\Resources"));
        assert!(is_resource_path("Assets/Editor Resources/x.png"));
        assert!(is_resource_path("Packages/Package Resources/x.png"));
        assert!(!is_resource_path("Assets/MyResources.png"));
        assert!(!is_resource_path("Assets/ResourcesPack/x.png"));

        assert!(is_editor_path("Assets/Editor/Tool.cs"));
        assert!(is_editor_path("Assets/Plugins/editor"));
        assert!(!is_editor_path("Assets/EditorArt/x.png"));
    }
}
