//! Configuration
//!
//! `ContentConfig` is resolved in three layers: built-in defaults, an
//! optional `content.toml` in the content root, and environment overrides.
//!
//! ```toml
//! default_compression = "lz4"
//!
//! [types]
//! VideoClip = true
//! Shader = false
//!
//! [parents]
//! VideoClip = "Object"
//! ```

use crate::paths;
use content_schema::{CompressionMode, UnknownCompression};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// Errors raised while loading configuration.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// The config file exists but could not be read.
    #[error("Failed to read {path}: {source}")]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The config file is not valid TOML for this schema.
    #[error("Failed to parse {path}: {source}")]
    Parse {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        source: toml::de::Error,
    },

    /// An environment override named an unknown compression mode.
    #[error(transparent)]
    Compression(#[from] UnknownCompression),
}

const SUPPORTED: &[&str] = &[
    "AudioClip",
    "AnimationClip",
    "Shader",
    "GameObject",
    "ComputeShader",
    "Texture",
    "Font",
    "Material",
    "PhysicMaterial",
    "TextAsset",
    "ScriptableObject",
    "SceneAsset",
    "Object",
];

const UNSUPPORTED: &[&str] = &[
    "Content",
    "MonoScript",
    "DefaultAsset",
    "AssemblyDefinitionAsset",
    "AssemblyDefinitionReferenceAsset",
];

const PARENTS: &[(&str, &str)] = &[
    ("Texture2D", "Texture"),
    ("Texture3D", "Texture"),
    ("Cubemap", "Texture"),
    ("RenderTexture", "Texture"),
    ("Sprite", "Object"),
    ("Mesh", "Object"),
    ("MonoScript", "TextAsset"),
];

/// Which asset types may be packaged.
///
/// A type is looked up first by its own name, then by its declared parent,
/// walking up until an explicit entry is found. The first entry wins, so an
/// explicit `false` on a type overrides a supported parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityTable {
    types: HashMap<String, bool>,
    parents: HashMap<String, String>,
}

impl Default for CapabilityTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl CapabilityTable {
    /// A table with no entries; nothing is supported.
    pub fn empty() -> Self {
        Self {
            types: HashMap::new(),
            parents: HashMap::new(),
        }
    }

    /// The built-in whitelist, blacklist and parent declarations.
    pub fn builtin() -> Self {
        let mut table = Self::empty();
        for name in SUPPORTED {
            table.set(name, true);
        }
        for name in UNSUPPORTED {
            table.set(name, false);
        }
        for (child, parent) in PARENTS {
            table.declare_parent(child, parent);
        }
        table
    }

    /// Mark a type as supported or unsupported.
    pub fn set(&mut self, type_name: &str, supported: bool) {
        self.types.insert(type_name.to_string(), supported);
    }

    /// Declare `parent` as the parent type of `child`.
    pub fn declare_parent(&mut self, child: &str, parent: &str) {
        self.parents.insert(child.to_string(), parent.to_string());
    }

    /// Returns `true` if `type_name` (or the nearest ancestor with an entry)
    /// is supported. `base_type` is the parent reported alongside the asset
    /// and is used when the table declares none.
    pub fn is_supported(&self, type_name: &str, base_type: &str) -> bool {
        let mut seen = HashSet::new();
        let mut current = Some(type_name);

        while let Some(name) = current {
            if !seen.insert(name) {
                break;
            }
            if let Some(&supported) = self.types.get(name) {
                return supported;
            }
            current = match self.parents.get(name) {
                Some(parent) => Some(parent.as_str()),
                None if name == type_name && !base_type.is_empty() => Some(base_type),
                None => None,
            };
        }

        false
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    default_compression: Option<CompressionMode>,
    types: HashMap<String, bool>,
    parents: HashMap<String, String>,
}

/// Resolved configuration for one content root.
#[derive(Debug, Clone)]
pub struct ContentConfig {
    /// Directory holding `content.json`, `chain.json` and built archives.
    pub root: PathBuf,
    /// Compression applied to bundles without an override.
    pub default_compression: CompressionMode,
    /// Packageable asset types.
    pub capabilities: CapabilityTable,
}

impl ContentConfig {
    /// Defaults for `root`, without reading any file.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            default_compression: CompressionMode::default(),
            capabilities: CapabilityTable::builtin(),
        }
    }

    /// Resolve the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if `content.toml` exists but is unreadable or invalid,
    /// or if `CONTENT_DEFAULT_COMPRESSION` names an unknown mode.
    pub fn load(root: Option<PathBuf>) -> Result<Self, ConfigError> {
        Self::resolve(root, |key| std::env::var(key).ok())
    }

    /// Resolve the configuration with an explicit environment lookup.
    ///
    /// # Errors
    ///
    /// See [`ContentConfig::load`].
    pub fn resolve(
        root: Option<PathBuf>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let root = root
            .or_else(|| env(paths::ROOT_ENV).map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(paths::DEFAULT_CONTENT_DIR));

        let mut config = Self::new(root);

        let file = paths::config_file(&config.root);
        if file.exists() {
            config.apply_file(&file)?;
        }

        if let Some(mode) = env(paths::COMPRESSION_ENV) {
            config.default_compression = mode.parse()?;
        }

        Ok(config)
    }

    fn apply_file(&mut self, path: &Path) -> Result<(), ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let file: ConfigFile = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        if let Some(mode) = file.default_compression {
            self.default_compression = mode;
        }
        for (name, supported) in &file.types {
            self.capabilities.set(name, *supported);
        }
        for (child, parent) in &file.parents {
            self.capabilities.declare_parent(child, parent);
        }

        tracing::debug!(path = %path.display(), "Loaded content config");
        Ok(())
    }
}
