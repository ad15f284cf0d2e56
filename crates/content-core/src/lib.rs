//! content-core - catalog operations, build chain and runtime mounter
//!
//! # Overview
//!
//! - [`catalog::Catalog`] is the context object: registry, compression policy
//!   and configuration for one content root, loaded and flushed by the caller.
//! - [`reorg`] slices and merges bundles.
//! - [`builder::Builder`] drives a [`engine::PackagingEngine`] and maintains
//!   the build manifest (`chain.json`).
//! - [`loader::Mounter`] detects distributable addons and mounts their
//!   archives through an [`archive::ArchiveLoader`].
//!
//! # Directory Layout
//!
//! ```text
//! <root>/
//! ├── content.json       # Registry
//! ├── chain.json         # Build manifest
//! ├── compression.json   # Compression overrides
//! ├── content.toml       # Optional configuration
//! └── <addon>/
//!     ├── content.json   # Registry scoped to this addon
//!     ├── chain.json     # Manifest scoped to this addon
//!     └── <bundle>       # Archive files
//! ```

pub mod archive;
pub mod builder;
pub mod catalog;
pub mod check;
pub mod compression;
pub mod config;
pub mod engine;
pub mod loader;
pub mod paths;
pub mod reorg;
pub mod report;
pub mod reporter;
pub mod resolver;
pub mod store;

pub use catalog::{Catalog, RegistryError};
pub use config::ContentConfig;
pub use paths::*;
pub use reporter::{NullReporter, Reporter};
