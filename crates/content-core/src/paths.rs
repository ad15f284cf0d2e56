//! Content root layout
//!
//! File names and path helpers. Archive paths are only produced for addon
//! and bundle names that stay below the content root.

use std::path::{Path, PathBuf};

/// Serialized registry inside a content root (and inside each exported addon folder).
pub const CONTENT_FILE: &str = "content.json";

/// Serialized build manifest.
pub const CHAIN_FILE: &str = "chain.json";

/// Optional configuration file read from the content root.
pub const CONFIG_FILE: &str = "content.toml";

/// Compression policy overrides.
pub const COMPRESSION_FILE: &str = "compression.json";

/// Text report written by `write_report`.
pub const REPORT_FILE: &str = "report.log";

/// Content root used when nothing else is configured.
pub const DEFAULT_CONTENT_DIR: &str = "Content";

/// Environment variable overriding the content root.
pub const ROOT_ENV: &str = "CONTENT_ROOT";

/// Environment variable overriding the registry-wide compression default.
pub const COMPRESSION_ENV: &str = "CONTENT_DEFAULT_COMPRESSION";

/// Content root from `CONTENT_ROOT`, falling back to `./Content`.
pub fn default_root() -> PathBuf {
    std::env::var_os(ROOT_ENV).map_or_else(|| PathBuf::from(DEFAULT_CONTENT_DIR), PathBuf::from)
}

/// Registry file: `<root>/content.json`
pub fn content_file(root: &Path) -> PathBuf {
    root.join(CONTENT_FILE)
}

/// Manifest file: `<root>/chain.json`
pub fn chain_file(root: &Path) -> PathBuf {
    root.join(CHAIN_FILE)
}

/// Config file: `<root>/content.toml`
pub fn config_file(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

/// Compression overrides: `<root>/compression.json`
pub fn compression_file(root: &Path) -> PathBuf {
    root.join(COMPRESSION_FILE)
}

/// Report file: `<root>/report.log`
pub fn report_file(root: &Path) -> PathBuf {
    root.join(REPORT_FILE)
}

/// Distributable addon folder: `<root>/<addon>`
pub fn addon_dir(root: &Path, addon: &str) -> PathBuf {
    root.join(addon)
}

/// Archive file of a built bundle: `<root>/<addon>/<bundle>`
///
/// Sliced bundle names contain `/`, so `desert/Part_0` lands in a nested
/// `desert` directory. Returns `None` when the addon is not a single plain
/// component or the bundle name is invalid, so the result never leaves
/// `<root>/<addon>`.
pub fn bundle_path(root: &Path, addon: &str, bundle: &str) -> Option<PathBuf> {
    let plain_addon = !addon.is_empty()
        && addon != "."
        && addon != ".."
        && !addon.contains(['/', '\\']);
    if !plain_addon || !content_schema::is_valid_bundle_name(bundle) {
        return None;
    }
    Some(
        bundle
            .split(content_schema::PATH_SEPARATOR)
            .fold(addon_dir(root, addon), |path, part| path.join(part)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundle_path_nests_sliced_names() {
        let root = Path::new("/content");
        assert_eq!(
            bundle_path(root, "Maps", "desert/Part_1"),
            Some(PathBuf::from("/content/Maps/desert/Part_1"))
        );
        assert_eq!(
            bundle_path(root, "Maps", "desert"),
            Some(PathBuf::from("/content/Maps/desert"))
        );
    }

    #[test]
    fn bundle_path_refuses_escapes() {
        let root = Path::new("/content");
        assert_eq!(bundle_path(root, "Maps", "../../../escaped"), None);
        assert_eq!(bundle_path(root, "Maps", "desert/../../x"), None);
        assert_eq!(bundle_path(root, "Maps", ""), None);
        assert_eq!(bundle_path(root, "..", "desert"), None);
        assert_eq!(bundle_path(root, "a/b", "desert"), None);
        assert_eq!(bundle_path(root, "", "desert"), None);
    }
}
