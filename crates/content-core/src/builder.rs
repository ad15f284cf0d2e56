//! Build driver
//!
//! Turns a selection of registry bundles into unit specifications, runs the
//! packaging engine over them in one blocking batch and folds the results
//! into the persisted build manifest.
//!
//! ```text
//! precondition → plan → engine → assemble → merge → verify → persist → export
//! ```
//!
//! Nothing is written unless the engine succeeds and the merged manifest has
//! no dangling dependency.

use crate::catalog::Catalog;
use crate::engine::{EngineError, PackagingEngine, UnitResult, UnitSpec};
use crate::reporter::{NullReporter, Reporter};
use crate::resolver;
use crate::store::{self, StoreError};
use crate::paths;
use content_schema::{
    BuildManifest, BundleRecord, DanglingDependency, QualifiedId, QualifiedIdError,
    split_unit_name,
};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

/// Errors that abort a build.
#[derive(thiserror::Error, Debug)]
pub enum BuildError {
    /// The authoring environment has unsaved changes.
    #[error("Unsaved changes in the authoring environment; save them before building")]
    UnsavedChanges,

    /// The content root could not be created.
    #[error("Content directory {path} is not available: {source}")]
    MissingDirectory {
        /// The content root.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The selection holds no bundle with assets.
    #[error("Nothing to build")]
    NothingToBuild,

    /// The packaging engine failed; its code is passed through unchanged.
    #[error("Build failed: {code}: {detail}")]
    Engine {
        /// Engine failure code.
        code: String,
        /// Engine failure detail.
        detail: String,
    },

    /// The engine ran on a task that panicked or was cancelled.
    #[error("Build task failed: {0}")]
    Task(String),

    /// The engine returned a unit or dependency name without an addon part.
    #[error(transparent)]
    MalformedName(#[from] QualifiedIdError),

    /// The merged manifest references bundles it does not contain.
    #[error("Build produced {} dangling dependencies (first: {})", .0.len(), .0.first().map(ToString::to_string).unwrap_or_default())]
    DanglingDependency(Vec<DanglingDependency>),

    /// Persisting the manifest, registry or exports failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<EngineError> for BuildError {
    fn from(e: EngineError) -> Self {
        Self::Engine {
            code: e.code,
            detail: e.detail,
        }
    }
}

/// Which bundles to build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildSelection {
    /// Every bundle of every addon. The manifest is rebuilt from scratch.
    All,
    /// Every bundle of the listed addons, merged into the existing manifest.
    Addons(Vec<String>),
    /// Explicit `(addon, bundle)` pairs, merged into the existing manifest.
    Bundles(Vec<(String, String)>),
}

impl BuildSelection {
    /// A single bundle.
    pub fn single(addon: &str, bundle: &str) -> Self {
        Self::Bundles(vec![(addon.to_string(), bundle.to_string())])
    }

    fn includes(&self, addon: &str, bundle: &str) -> bool {
        match self {
            Self::All => true,
            Self::Addons(addons) => addons.iter().any(|a| a == addon),
            Self::Bundles(pairs) => pairs.iter().any(|(a, b)| a == addon && b == bundle),
        }
    }
}

/// Authoring state the build must not race with.
pub trait Environment: Send + Sync {
    /// Returns `true` if there are unsaved edits that a build would miss.
    fn has_unsaved_changes(&self) -> bool;
}

/// An environment that is always saved.
#[derive(Debug, Clone, Copy, Default)]
pub struct CleanEnvironment;

impl Environment for CleanEnvironment {
    fn has_unsaved_changes(&self) -> bool {
        false
    }
}

/// The units to submit for a selection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildPlan {
    /// Units with at least one asset.
    pub units: Vec<UnitSpec>,
    /// Selected bundles without assets, as `<addon>/<bundle>`.
    pub skipped: Vec<String>,
    /// Addons touched by the selection.
    pub addons_total: usize,
    /// Bundles in the selection, including skipped ones.
    pub bundles_total: usize,
}

/// Outcome of a successful build.
#[derive(Debug, Clone)]
pub struct BuildSummary {
    /// Addons that produced at least one unit.
    pub addons_built: usize,
    /// Addons touched by the selection.
    pub addons_total: usize,
    /// Units produced.
    pub bundles_built: usize,
    /// Bundles in the selection.
    pub bundles_total: usize,
    /// Empty bundles that were skipped.
    pub skipped: Vec<String>,
    /// The manifest as persisted.
    pub manifest: BuildManifest,
    /// Wall-clock duration.
    pub elapsed_secs: f64,
}

impl std::fmt::Display for BuildSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Build finished! [Addons: {}/{}] [Bundles: {}/{}]",
            self.addons_built, self.addons_total, self.bundles_built, self.bundles_total
        )
    }
}

/// Build the unit specifications for `selection`.
pub fn plan(catalog: &Catalog, selection: &BuildSelection) -> BuildPlan {
    let mut plan = BuildPlan::default();

    for addon in catalog.registry().addons() {
        let mut touched = false;
        for bundle in addon.bundles() {
            if !selection.includes(addon.name(), bundle.name()) {
                continue;
            }
            touched = true;
            plan.bundles_total += 1;

            let unit_name = format!("{}{}{}", addon.name(), content_schema::PATH_SEPARATOR, bundle.name());
            if bundle.is_empty() {
                tracing::warn!(unit = %unit_name, "Skipping empty bundle");
                plan.skipped.push(unit_name);
                continue;
            }

            plan.units.push(UnitSpec {
                name: unit_name,
                asset_paths: bundle.assets().iter().map(|a| a.path().to_string()).collect(),
                addressable_names: bundle.assets().iter().map(|a| a.name().to_string()).collect(),
                compression: catalog.compression_mode(addon.name(), bundle.name()),
            });
        }
        if touched {
            plan.addons_total += 1;
        }
    }

    plan
}

/// Fold engine results into a manifest, rewriting raw dependencies into
/// qualified identifiers.
///
/// # Errors
///
/// Returns an error if a unit name or a dependency has no addon part.
pub fn assemble(results: &[UnitResult]) -> Result<BuildManifest, QualifiedIdError> {
    let mut manifest = BuildManifest::new();

    for result in results {
        let (addon, bundle) = split_unit_name(&result.name)?;
        let dependencies = result
            .dependencies
            .iter()
            .map(|raw| QualifiedId::from_raw(raw))
            .collect::<Result<Vec<_>, _>>()?;

        let record = BundleRecord::new(bundle, result.crc, result.hash.as_str())
            .with_dependencies(dependencies);
        manifest.add_or_find_addon(addon).upsert(record);
    }

    Ok(manifest)
}

/// Runs builds against a packaging engine.
pub struct Builder {
    engine: Arc<dyn PackagingEngine>,
    environment: Arc<dyn Environment>,
    reporter: Arc<dyn Reporter>,
}

impl std::fmt::Debug for Builder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Builder").finish_non_exhaustive()
    }
}

impl Builder {
    /// Builder with a clean environment and no reporting.
    pub fn new(engine: Arc<dyn PackagingEngine>) -> Self {
        Self {
            engine,
            environment: Arc::new(CleanEnvironment),
            reporter: Arc::new(NullReporter),
        }
    }

    /// Check `environment` for unsaved changes before building.
    #[must_use]
    pub fn with_environment(mut self, environment: Arc<dyn Environment>) -> Self {
        self.environment = environment;
        self
    }

    /// Report progress through `reporter`.
    #[must_use]
    pub fn with_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Build every bundle of the registry.
    ///
    /// # Errors
    ///
    /// See [`Builder::build`].
    pub async fn build_all(&self, catalog: &mut Catalog) -> Result<BuildSummary, BuildError> {
        self.build(catalog, &BuildSelection::All).await
    }

    /// Build an explicit set of bundles.
    ///
    /// # Errors
    ///
    /// See [`Builder::build`].
    pub async fn build_bundles(
        &self,
        catalog: &mut Catalog,
        bundles: &[(String, String)],
    ) -> Result<BuildSummary, BuildError> {
        self.build(catalog, &BuildSelection::Bundles(bundles.to_vec()))
            .await
    }

    /// Build one bundle.
    ///
    /// # Errors
    ///
    /// See [`Builder::build`].
    pub async fn build_single(
        &self,
        catalog: &mut Catalog,
        addon: &str,
        bundle: &str,
    ) -> Result<BuildSummary, BuildError> {
        self.build(catalog, &BuildSelection::single(addon, bundle))
            .await
    }

    /// Build `selection`, persist the manifest and the registry, and export
    /// per-addon copies for every addon that produced units.
    ///
    /// # Errors
    ///
    /// Returns an error, without writing anything, if the environment is
    /// dirty, the selection is empty, the engine fails or the merged
    /// manifest has dangling dependencies. Returns an error if persisting
    /// fails.
    pub async fn build(
        &self,
        catalog: &mut Catalog,
        selection: &BuildSelection,
    ) -> Result<BuildSummary, BuildError> {
        let start = Instant::now();

        if self.environment.has_unsaved_changes() {
            self.reporter.error("Save your changes before building");
            return Err(BuildError::UnsavedChanges);
        }

        let root = catalog.root().to_path_buf();
        tokio::fs::create_dir_all(&root)
            .await
            .map_err(|source| BuildError::MissingDirectory {
                path: root.clone(),
                source,
            })?;

        let plan = plan(catalog, selection);
        for unit in &plan.skipped {
            self.reporter.warning(&format!("{unit} is empty and will not be built"));
        }
        if plan.units.is_empty() {
            return Err(BuildError::NothingToBuild);
        }

        self.reporter.section("Building");
        tracing::info!(units = plan.units.len(), root = %root.display(), "Submitting build");

        let engine = Arc::clone(&self.engine);
        let output = root.clone();
        let units = plan.units.clone();
        let results = tokio::task::spawn_blocking(move || engine.build(&output, &units))
            .await
            .map_err(|e| BuildError::Task(e.to_string()))?
            .map_err(|e| {
                tracing::error!(code = %e.code, detail = %e.detail, "Packaging engine failed");
                self.reporter.error(&format!("Build failed: {}", e.code));
                BuildError::from(e)
            })?;

        let built = assemble(&results)?;

        let chain_path = paths::chain_file(&root);
        let mut manifest = if *selection == BuildSelection::All {
            BuildManifest::new()
        } else {
            store::read_json_or_default(&chain_path).await
        };
        manifest.merge(built.clone());

        let dangling = resolver::verify_manifest(&manifest);
        if !dangling.is_empty() {
            for d in &dangling {
                tracing::error!(dependency = %d, "Dangling dependency");
            }
            return Err(BuildError::DanglingDependency(dangling));
        }

        store::write_json_atomic(&chain_path, &manifest).await?;
        catalog.flush().await?;

        let built_addons: BTreeSet<&str> = built.addons().iter().map(|c| c.name()).collect();
        for addon in &built_addons {
            self.export_addon(catalog, &manifest, addon).await?;
        }

        for chain in built.addons() {
            for record in chain.bundles() {
                self.reporter
                    .bundle_done(chain.name(), record.name(), &format!("crc {:08x}", record.crc()));
            }
        }

        let summary = BuildSummary {
            addons_built: built_addons.len(),
            addons_total: plan.addons_total,
            bundles_built: results.len(),
            bundles_total: plan.bundles_total,
            skipped: plan.skipped,
            manifest,
            elapsed_secs: start.elapsed().as_secs_f64(),
        };

        tracing::info!("{summary}");
        self.reporter.success(&summary.to_string());
        Ok(summary)
    }

    /// Write `<root>/<addon>/content.json` and `<root>/<addon>/chain.json`
    /// scoped to `addon`.
    async fn export_addon(
        &self,
        catalog: &Catalog,
        manifest: &BuildManifest,
        addon: &str,
    ) -> Result<(), BuildError> {
        let dir = paths::addon_dir(catalog.root(), addon);

        if let Some(registry) = catalog.registry().scoped(addon) {
            store::write_json_atomic(&paths::content_file(&dir), &registry).await?;
        }
        if let Some(chain) = manifest.scoped(addon) {
            store::write_json_atomic(&paths::chain_file(&dir), &chain).await?;
        }

        tracing::debug!(addon, dir = %dir.display(), "Exported addon");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::AssetDescriptor;
    use crate::config::ContentConfig;
    use content_schema::{CompressionMode, Status};

    fn catalog() -> Catalog {
        let mut catalog = Catalog::new(ContentConfig::new("unused"));
        catalog.add_addon("A").unwrap();
        catalog.add_bundle("A", "full").unwrap();
        catalog.add_bundle("A", "empty").unwrap();
        catalog.add_addon("B").unwrap();
        catalog.add_bundle("B", "other").unwrap();

        let asset = AssetDescriptor::new("hero", "Assets/hero.png", "g1", "Texture2D", "Texture");
        assert_eq!(catalog.add_asset("A", "full", &asset), Status::Ok);
        let asset = AssetDescriptor::new("map", "Assets/map.png", "g2", "Texture2D", "Texture");
        assert_eq!(catalog.add_asset("B", "other", &asset), Status::Ok);
        catalog
    }

    #[test]
    fn plan_skips_empty_bundles() {
        let mut catalog = catalog();
        catalog.set_compression("A", "full", CompressionMode::Lz4).unwrap();

        let plan = plan(&catalog, &BuildSelection::All);
        assert_eq!(plan.bundles_total, 3);
        assert_eq!(plan.addons_total, 2);
        assert_eq!(plan.skipped, vec!["A/empty"]);
        assert_eq!(plan.units.len(), 2);

        let unit = &plan.units[0];
        assert_eq!(unit.name, "A/full");
        assert_eq!(unit.asset_paths, vec!["Assets/hero.png"]);
        assert_eq!(unit.addressable_names, vec!["hero"]);
        assert_eq!(unit.compression, CompressionMode::Lz4);
    }

    #[test]
    fn plan_respects_selection() {
        let catalog = catalog();
        let plan = plan(&catalog, &BuildSelection::single("B", "other"));
        assert_eq!(plan.units.len(), 1);
        assert_eq!(plan.addons_total, 1);

        let plan = super::plan(&catalog, &BuildSelection::Addons(vec!["A".to_string()]));
        assert_eq!(plan.bundles_total, 2);
        assert_eq!(plan.units.len(), 1);
    }

    #[test]
    fn assemble_rewrites_dependencies() {
        let results = vec![UnitResult {
            name: "AddonB/main".to_string(),
            crc: 7,
            hash: "h".to_string(),
            dependencies: vec!["AddonA/Sub/bundleX".to_string()],
        }];
        let manifest = assemble(&results).unwrap();
        let record = manifest.addon("AddonB").unwrap().bundle("main").unwrap();
        assert_eq!(record.dependencies()[0].as_str(), "AddonA@Sub/bundleX");
        assert_eq!(record.dependencies()[0].split(), ("AddonA", "Sub/bundleX"));
    }

    #[test]
    fn assemble_rejects_malformed_dependency() {
        let results = vec![UnitResult {
            name: "A/b".to_string(),
            crc: 0,
            hash: String::new(),
            dependencies: vec!["nobundle".to_string()],
        }];
        assert!(assemble(&results).is_err());
    }
}
