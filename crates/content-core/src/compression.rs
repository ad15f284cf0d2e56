//! Compression policy store.
//!
//! A sparse table of `(addon, bundle) → mode` overrides. Bundles without an
//! entry use the registry-wide default. The table is consulted only by the
//! build driver and is garbage collected against the registry whenever an
//! addon or bundle is removed.

use content_schema::{CompressionMode, Registry};
use serde::{Deserialize, Serialize};

/// One override.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompressionEntry {
    /// Addon owning the bundle.
    pub addon: String,
    /// Bundle name.
    pub bundle: String,
    /// Mode applied when building the bundle.
    pub mode: CompressionMode,
}

/// Override table persisted as `compression.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompressionStore {
    #[serde(rename = "Entries", default)]
    entries: Vec<CompressionEntry>,
    #[serde(skip)]
    default_mode: CompressionMode,
}

impl CompressionStore {
    /// Empty store with the given fallback mode.
    pub fn with_default(default_mode: CompressionMode) -> Self {
        Self {
            entries: Vec::new(),
            default_mode,
        }
    }

    /// Replace the fallback mode.
    pub fn set_default(&mut self, mode: CompressionMode) {
        self.default_mode = mode;
    }

    /// The fallback mode.
    pub fn default_mode(&self) -> CompressionMode {
        self.default_mode
    }

    /// All overrides in insertion order.
    pub fn entries(&self) -> &[CompressionEntry] {
        &self.entries
    }

    /// Resolved mode for a bundle.
    pub fn get(&self, addon: &str, bundle: &str) -> CompressionMode {
        self.entry(addon, bundle)
            .map_or(self.default_mode, |entry| entry.mode)
    }

    /// The explicit override for a bundle, if any.
    pub fn entry(&self, addon: &str, bundle: &str) -> Option<&CompressionEntry> {
        self.entries
            .iter()
            .find(|e| e.addon == addon && e.bundle == bundle)
    }

    /// Insert or replace the override for a bundle.
    pub fn set(&mut self, addon: &str, bundle: &str, mode: CompressionMode) {
        match self
            .entries
            .iter_mut()
            .find(|e| e.addon == addon && e.bundle == bundle)
        {
            Some(entry) => entry.mode = mode,
            None => self.entries.push(CompressionEntry {
                addon: addon.to_string(),
                bundle: bundle.to_string(),
                mode,
            }),
        }
    }

    /// Drop the override for a bundle.
    pub fn remove(&mut self, addon: &str, bundle: &str) -> Option<CompressionMode> {
        let index = self
            .entries
            .iter()
            .position(|e| e.addon == addon && e.bundle == bundle)?;
        Some(self.entries.remove(index).mode)
    }

    /// Point the override of a moved bundle at its new addon.
    pub fn retarget(&mut self, from_addon: &str, bundle: &str, to_addon: &str) {
        if let Some(mode) = self.remove(from_addon, bundle) {
            self.set(to_addon, bundle, mode);
        }
    }

    /// Purge overrides whose addon or bundle no longer exists.
    ///
    /// Returns the number of entries removed.
    pub fn gc(&mut self, registry: &Registry) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| {
            registry
                .addon(&e.addon)
                .is_some_and(|addon| addon.has_bundle(&e.bundle))
        });
        let removed = before - self.entries.len();
        if removed > 0 {
            tracing::debug!(removed, "Purged stale compression overrides");
        }
        removed
    }
}
