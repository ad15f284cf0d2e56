//! Command handlers.
//!
//! Each handler opens the catalog for the resolved content root, performs
//! one operation and flushes when something changed.

pub mod addon;
pub mod asset;
pub mod build;
pub mod bundle;
pub mod completions;
pub mod compression;
pub mod detect;
pub mod mount;
pub mod report;

use crate::ui::TerminalReporter;
use anyhow::{Context as _, Result};
use content_core::{Catalog, ContentConfig, Reporter};
use std::path::PathBuf;
use std::sync::Arc;

/// Shared state for one invocation.
#[derive(Clone)]
pub struct Context {
    pub config: ContentConfig,
    pub reporter: Arc<dyn Reporter>,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("root", &self.config.root)
            .finish_non_exhaustive()
    }
}

impl Context {
    /// Resolve configuration for `root` (or the environment default).
    pub fn new(root: Option<PathBuf>, quiet: bool) -> Result<Self> {
        let config = ContentConfig::load(root).context("Failed to load configuration")?;
        let reporter: Arc<dyn Reporter> = if quiet {
            Arc::new(TerminalReporter::quiet())
        } else {
            Arc::new(TerminalReporter::new())
        };
        Ok(Self { config, reporter })
    }

    /// Load the catalog stored under the content root.
    pub async fn open(&self) -> Catalog {
        Catalog::open(self.config.clone()).await
    }
}

/// Persist the catalog if an operation changed it.
pub async fn save(catalog: &mut Catalog) -> Result<()> {
    if catalog.is_dirty() {
        catalog
            .flush()
            .await
            .with_context(|| format!("Failed to save catalog in {}", catalog.root().display()))?;
    }
    Ok(())
}
