//! Status taxonomy, search keys, compression modes and addon names.

use serde::{Deserialize, Deserializer, Serialize};
use std::borrow::Borrow;
use std::str::FromStr;

/// Outcome of a catalog operation.
///
/// Rejections are values, not errors: a caller that tries to put a scene
/// next to a texture gets [`Status::BundleHaveAssets`] back and nothing in
/// the registry changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    /// The operation was applied.
    #[serde(rename = "OK")]
    Ok,
    /// The operation could not be applied for a reason not covered below.
    Failed,
    /// The asset type is not packageable.
    NotSupported,
    /// The content id is already present.
    AlreadyContains,
    /// The asset is flagged as never saved into builds.
    HasHideFlags,
    /// The asset lives inside a scene rather than on disk.
    IsAssetFromScene,
    /// The asset lives inside a resources folder.
    IsResourceAsset,
    /// The asset lives inside an editor-only folder.
    IsEditorAsset,
    /// The descriptor has no content id or no path.
    MissingOrNullAsset,
    /// The target bundle holds scenes; only scenes may be added.
    BundleHaveScenes,
    /// The target bundle holds non-scene assets; scenes may not be added.
    BundleHaveAssets,
    /// Catch-all for states that should not occur.
    Unknown,
}

impl Status {
    /// Returns `true` for [`Status::Ok`].
    pub fn is_ok(self) -> bool {
        self == Self::Ok
    }

    /// Human-readable label used in diagnostics.
    pub fn label(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Failed => "Failed",
            Self::NotSupported => "Not Supported",
            Self::AlreadyContains => "Already contains",
            Self::HasHideFlags => "Has hide flags",
            Self::IsAssetFromScene => "Asset from Scene",
            Self::IsResourceAsset => "Resource asset",
            Self::IsEditorAsset => "Editor asset",
            Self::MissingOrNullAsset => "Missing/Invalid asset",
            Self::BundleHaveScenes => "Bundle have scenes",
            Self::BundleHaveAssets => "Bundle have assets",
            Self::Unknown => "Unknown",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Which field of an asset record a lookup matches against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AssetSearch {
    /// Friendly (addressable) name.
    #[default]
    Name,
    /// Stable content id.
    ContentId,
    /// Source path on disk.
    Path,
}

/// Archive compression applied to a built bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionMode {
    /// Stored uncompressed (default).
    #[default]
    None,
    /// Fast block compression, cheap to decompress.
    Lz4,
    /// High-ratio compression, slower to load.
    Lzma,
}

impl CompressionMode {
    /// Lowercase name as used in configuration files.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Lz4 => "lz4",
            Self::Lzma => "lzma",
        }
    }
}

impl std::fmt::Display for CompressionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown compression mode.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown compression mode '{0}' (expected none, lz4 or lzma)")]
pub struct UnknownCompression(pub String);

impl FromStr for CompressionMode {
    type Err = UnknownCompression;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "uncompressed" => Ok(Self::None),
            "lz4" => Ok(Self::Lz4),
            "lzma" => Ok(Self::Lzma),
            _ => Err(UnknownCompression(s.to_string())),
        }
    }
}

/// Returns `true` if `name` can name a bundle.
///
/// Bundle names map to relative paths below their addon folder: one or more
/// `/`-separated components, none of them empty, `.` or `..`, and no `\`.
pub fn is_valid_bundle_name(name: &str) -> bool {
    !name.is_empty()
        && !name.contains('\\')
        && name
            .split(crate::PATH_SEPARATOR)
            .all(|part| !part.is_empty() && part != "." && part != "..")
}

/// A sanitized addon name.
///
/// Addon names become directory names and the left-hand side of qualified
/// identifiers, so path separators, dots and `@` are stripped on
/// construction. Comparison is exact and case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct AddonName(String);

impl AddonName {
    /// Create a new addon name, stripping forbidden characters.
    pub fn new(name: &str) -> Self {
        Self(
            name.chars()
                .filter(|c| !matches!(c, '/' | '\\' | '.' | '@'))
                .collect(),
        )
    }

    /// Return the sanitized name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if nothing survived sanitization.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'de> Deserialize<'de> for AddonName {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Self::new(&s))
    }
}

impl std::fmt::Display for AddonName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::ops::Deref for AddonName {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<str> for AddonName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl AsRef<std::path::Path> for AddonName {
    fn as_ref(&self) -> &std::path::Path {
        std::path::Path::new(&self.0)
    }
}

impl Borrow<str> for AddonName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for AddonName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for AddonName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl From<&str> for AddonName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for AddonName {
    fn from(s: String) -> Self {
        Self::new(&s)
    }
}
