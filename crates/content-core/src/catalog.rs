//! The catalog context.
//!
//! `Catalog` groups the registry, the compression policy store and the
//! configuration that governs them. It is passed explicitly to whatever
//! needs it; loading and flushing are under the caller's control.
//!
//! Mutations go through the catalog so that removals always garbage collect
//! stale compression overrides and every change marks the catalog dirty.

use crate::check::{self, AssetDescriptor};
use crate::compression::CompressionStore;
use crate::config::ContentConfig;
use crate::paths;
use crate::reorg;
use crate::store::{self, StoreError};
use content_schema::{
    Addon, AddonName, Asset, AssetSearch, Bundle, CompressionMode, Registry, Status,
    is_valid_bundle_name,
};
use std::path::Path;

/// Suffix of the bundle that collects shared dependencies.
pub const SHARED_SUFFIX: &str = "_Shared";

/// Errors raised by catalog operations that create, remove or relocate
/// addons and bundles.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// The addon name is empty after sanitization.
    #[error("Invalid addon name '{0}'")]
    InvalidName(String),

    /// An addon with this name already exists.
    #[error("Addon '{0}' already exists")]
    AddonExists(String),

    /// No addon with this name exists.
    #[error("Addon '{0}' not found")]
    AddonNotFound(String),

    /// A bundle with this name already exists in the addon.
    #[error("Bundle '{bundle}' already exists in addon '{addon}'")]
    BundleExists {
        /// Owning addon.
        addon: String,
        /// Bundle name.
        bundle: String,
    },

    /// The bundle name is empty or would resolve outside its addon.
    #[error("Invalid bundle name '{0}'")]
    InvalidBundleName(String),

    /// No bundle with this name exists in the addon.
    #[error("Bundle '{bundle}' not found in addon '{addon}'")]
    BundleNotFound {
        /// Owning addon.
        addon: String,
        /// Bundle name.
        bundle: String,
    },
}

/// Source of asset dependencies, supplied by the import pipeline.
pub trait DependencyProvider {
    /// Assets `asset` depends on.
    fn dependencies(&self, asset: &Asset) -> Vec<AssetDescriptor>;
}

/// Registry, compression policy and configuration for one content root.
#[derive(Debug)]
pub struct Catalog {
    config: ContentConfig,
    registry: Registry,
    compression: CompressionStore,
    dirty: bool,
}

impl Catalog {
    /// An empty catalog.
    pub fn new(config: ContentConfig) -> Self {
        let compression = CompressionStore::with_default(config.default_compression);
        Self {
            config,
            registry: Registry::new(),
            compression,
            dirty: false,
        }
    }

    /// Load the catalog persisted under the configured root.
    ///
    /// Missing or corrupt files yield empty structures.
    pub async fn open(config: ContentConfig) -> Self {
        let registry: Registry = store::read_json_or_default(&paths::content_file(&config.root)).await;
        let mut compression: CompressionStore =
            store::read_json_or_default(&paths::compression_file(&config.root)).await;
        compression.set_default(config.default_compression);
        compression.gc(&registry);

        tracing::debug!(
            root = %config.root.display(),
            addons = registry.len(),
            "Opened catalog"
        );

        Self {
            config,
            registry,
            compression,
            dirty: false,
        }
    }

    /// Persist the registry and the compression overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if either file cannot be written.
    pub async fn flush(&mut self) -> Result<(), StoreError> {
        let root = &self.config.root;
        store::write_json_atomic(&paths::content_file(root), &self.registry).await?;
        store::write_json_atomic(&paths::compression_file(root), &self.compression).await?;
        self.dirty = false;
        Ok(())
    }

    /// Returns `true` if there are changes not yet flushed.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// The configuration this catalog was opened with.
    pub fn config(&self) -> &ContentConfig {
        &self.config
    }

    /// The content root.
    pub fn root(&self) -> &Path {
        &self.config.root
    }

    /// Read-only view of the registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Read-only view of the compression overrides.
    pub fn compression(&self) -> &CompressionStore {
        &self.compression
    }

    fn touch(&mut self) {
        self.dirty = true;
    }

    fn collect_garbage(&mut self) {
        self.compression.gc(&self.registry);
    }

    fn addon_mut(&mut self, addon: &str) -> Result<&mut Addon, RegistryError> {
        self.registry
            .addon_mut(addon)
            .ok_or_else(|| RegistryError::AddonNotFound(addon.to_string()))
    }

    fn bundle_mut(&mut self, addon: &str, bundle: &str) -> Result<&mut Bundle, RegistryError> {
        self.addon_mut(addon)?
            .bundle_mut(bundle)
            .ok_or_else(|| RegistryError::BundleNotFound {
                addon: addon.to_string(),
                bundle: bundle.to_string(),
            })
    }

    // ---- Addons ----

    /// Create an addon.
    ///
    /// # Errors
    ///
    /// Fails if the sanitized name is empty or already taken.
    pub fn add_addon(&mut self, name: &str) -> Result<&mut Addon, RegistryError> {
        let sanitized = AddonName::new(name);
        if sanitized.is_empty() {
            return Err(RegistryError::InvalidName(name.to_string()));
        }
        if self.registry.has_addon(&sanitized) {
            return Err(RegistryError::AddonExists(sanitized.to_string()));
        }
        self.touch();
        self.registry
            .add_addon(&sanitized)
            .ok_or(RegistryError::AddonExists(sanitized.to_string()))
    }

    /// Remove an addon with all of its bundles and assets.
    ///
    /// # Errors
    ///
    /// Fails if the addon does not exist.
    pub fn remove_addon(&mut self, name: &str) -> Result<Addon, RegistryError> {
        let removed = self
            .registry
            .remove_addon(name)
            .ok_or_else(|| RegistryError::AddonNotFound(name.to_string()))?;
        self.touch();
        self.collect_garbage();
        Ok(removed)
    }

    // ---- Bundles ----

    /// Create a bundle.
    ///
    /// # Errors
    ///
    /// Fails if the addon is missing, the bundle name is invalid or the
    /// name is taken.
    pub fn add_bundle(&mut self, addon: &str, name: &str) -> Result<&mut Bundle, RegistryError> {
        let owner = self
            .registry
            .addon_mut(addon)
            .ok_or_else(|| RegistryError::AddonNotFound(addon.to_string()))?;
        if !is_valid_bundle_name(name) {
            return Err(RegistryError::InvalidBundleName(name.to_string()));
        }
        let bundle = owner.add_bundle(name).ok_or_else(|| RegistryError::BundleExists {
            addon: addon.to_string(),
            bundle: name.to_string(),
        })?;
        self.dirty = true;
        Ok(bundle)
    }

    /// Return the bundle, creating it when missing.
    ///
    /// # Errors
    ///
    /// Fails if the addon is missing or a bundle would have to be created
    /// under an invalid name.
    pub fn add_or_find_bundle(&mut self, addon: &str, name: &str) -> Result<&mut Bundle, RegistryError> {
        let owner = self
            .registry
            .addon_mut(addon)
            .ok_or_else(|| RegistryError::AddonNotFound(addon.to_string()))?;
        let created = !owner.has_bundle(name);
        let bundle = owner
            .add_or_find_bundle(name)
            .ok_or_else(|| RegistryError::InvalidBundleName(name.to_string()))?;
        if created {
            self.dirty = true;
        }
        Ok(bundle)
    }

    /// Remove a bundle and its assets.
    ///
    /// # Errors
    ///
    /// Fails if the addon or the bundle is missing.
    pub fn remove_bundle(&mut self, addon: &str, name: &str) -> Result<Bundle, RegistryError> {
        let removed = self
            .addon_mut(addon)?
            .remove_bundle(name)
            .ok_or_else(|| RegistryError::BundleNotFound {
                addon: addon.to_string(),
                bundle: name.to_string(),
            })?;
        self.touch();
        self.collect_garbage();
        Ok(removed)
    }

    /// Move a whole bundle into another addon, carrying its compression
    /// override along.
    ///
    /// # Errors
    ///
    /// Fails if the bundle or the destination is missing, or the
    /// destination already has a bundle with that name.
    pub fn move_bundle(&mut self, bundle: &str, dest_addon: &str) -> Result<(), RegistryError> {
        let source = self
            .registry
            .find_bundle(bundle)
            .map(|(addon, _)| addon.name().to_string())
            .ok_or_else(|| RegistryError::BundleNotFound {
                addon: "*".to_string(),
                bundle: bundle.to_string(),
            })?;
        let dest = self
            .registry
            .addon(dest_addon)
            .ok_or_else(|| RegistryError::AddonNotFound(dest_addon.to_string()))?;
        if dest.has_bundle(bundle) {
            return Err(RegistryError::BundleExists {
                addon: dest_addon.to_string(),
                bundle: bundle.to_string(),
            });
        }

        if !self.registry.move_bundle(bundle, dest_addon) {
            return Err(RegistryError::BundleNotFound {
                addon: source,
                bundle: bundle.to_string(),
            });
        }
        self.compression.retarget(&source, bundle, dest_addon);
        self.touch();
        Ok(())
    }

    /// Slice a bundle into `parts` balanced parts. See [`reorg::slice_bundle`].
    pub fn slice_bundle(&mut self, addon: &str, bundle: &str, parts: usize) -> usize {
        let created = reorg::slice_bundle(&mut self.registry, addon, bundle, parts);
        if created > 0 {
            self.touch();
            self.collect_garbage();
        }
        created
    }

    /// Slice a bundle so no part exceeds `max_assets`. See [`reorg::slice_bundle_max`].
    pub fn slice_bundle_max(&mut self, addon: &str, bundle: &str, max_assets: usize) -> usize {
        let created = reorg::slice_bundle_max(&mut self.registry, addon, bundle, max_assets);
        if created > 0 {
            self.touch();
            self.collect_garbage();
        }
        created
    }

    /// Merge bundles of one addon. See [`reorg::split_bundles`].
    pub fn split_bundles(&mut self, addon: &str, sources: &[&str], dest: &str) -> usize {
        let consumed = reorg::split_bundles(&mut self.registry, addon, sources, dest);
        if consumed > 0 {
            self.touch();
            self.collect_garbage();
        }
        consumed
    }

    // ---- Assets ----

    /// Admit an asset into `addon`/`bundle`.
    ///
    /// Runs the full admission check before the bundle's own rules.
    pub fn add_asset(&mut self, addon: &str, bundle: &str, descriptor: &AssetDescriptor) -> Status {
        let status = check::check_asset(descriptor, &self.registry, &self.config.capabilities);
        if !status.is_ok() {
            return status;
        }

        let Ok(target) = self.bundle_mut(addon, bundle) else {
            return Status::Failed;
        };
        let status = target.add_asset(descriptor.to_asset());
        if status.is_ok() {
            self.touch();
        }
        status
    }

    /// Remove an asset by content id from whichever bundle holds it.
    pub fn remove_asset(&mut self, content_id: &str) -> Option<Asset> {
        let removed = self.registry.remove_asset(content_id, AssetSearch::ContentId)?;
        self.touch();
        self.collect_garbage();
        Some(removed)
    }

    /// Move an asset into another bundle; segregation is checked first.
    pub fn move_asset(&mut self, content_id: &str, dest_addon: &str, dest_bundle: &str) -> Status {
        let status = self.registry.move_asset(content_id, dest_addon, dest_bundle);
        if status.is_ok() {
            self.touch();
        }
        status
    }

    /// Change the friendly name of an asset.
    pub fn rename_asset(&mut self, content_id: &str, name: &str) -> bool {
        match self.registry.find_asset_mut(content_id, AssetSearch::ContentId) {
            Some(asset) => {
                asset.set_name(name);
                self.touch();
                true
            }
            None => false,
        }
    }

    /// Follow a moved file.
    ///
    /// The new location is re-checked; an asset moved into a resources or
    /// editor folder is dropped from the registry and the rejection is
    /// returned.
    pub fn relocate_asset(&mut self, content_id: &str, new_path: &str) -> Status {
        if !self.registry.has_asset(content_id, AssetSearch::ContentId) {
            return Status::Failed;
        }

        let status = check::check_location(new_path);
        if !status.is_ok() {
            self.registry.remove_asset(content_id, AssetSearch::ContentId);
            tracing::info!(content_id, path = new_path, %status, "Asset moved out of packageable location");
            self.touch();
            return status;
        }

        if let Some(asset) = self.registry.find_asset_mut(content_id, AssetSearch::ContentId) {
            asset.set_path(new_path);
        }
        self.touch();
        Status::Ok
    }

    /// Drop the record of a deleted file.
    pub fn forget_asset(&mut self, content_id: &str) -> Option<Asset> {
        self.remove_asset(content_id)
    }

    /// Gather every not-yet-registered dependency of `addon`/`bundle` into
    /// `<bundle>_Shared` in the same addon.
    ///
    /// Returns the number of assets added.
    ///
    /// # Errors
    ///
    /// Fails if the addon or the bundle is missing.
    pub fn collect_dependencies(
        &mut self,
        addon: &str,
        bundle: &str,
        provider: &dyn DependencyProvider,
    ) -> Result<usize, RegistryError> {
        let assets = self
            .registry
            .addon(addon)
            .ok_or_else(|| RegistryError::AddonNotFound(addon.to_string()))?
            .bundle(bundle)
            .ok_or_else(|| RegistryError::BundleNotFound {
                addon: addon.to_string(),
                bundle: bundle.to_string(),
            })?
            .assets()
            .to_vec();

        let shared = format!("{bundle}{SHARED_SUFFIX}");
        let mut added = 0;
        for asset in &assets {
            for dependency in provider.dependencies(asset) {
                let status = check::check_asset(&dependency, &self.registry, &self.config.capabilities);
                if !status.is_ok() {
                    tracing::debug!(dependency = %dependency.path, %status, "Dependency skipped");
                    continue;
                }
                let target = self.add_or_find_bundle(addon, &shared)?;
                if target.add_asset(dependency.to_asset()).is_ok() {
                    added += 1;
                }
            }
        }

        Ok(added)
    }

    // ---- Compression ----

    /// Resolved compression mode for a bundle.
    pub fn compression_mode(&self, addon: &str, bundle: &str) -> CompressionMode {
        self.compression.get(addon, bundle)
    }

    /// Override the compression mode of an existing bundle.
    ///
    /// # Errors
    ///
    /// Fails if the addon or the bundle is missing.
    pub fn set_compression(
        &mut self,
        addon: &str,
        bundle: &str,
        mode: CompressionMode,
    ) -> Result<(), RegistryError> {
        self.bundle_mut(addon, bundle)?;
        self.compression.set(addon, bundle, mode);
        self.touch();
        Ok(())
    }
}
