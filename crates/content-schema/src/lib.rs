//! Shared data model for the content catalog.
//!
//! Everything that crosses a process boundary lives here: the registry
//! hierarchy persisted as `content.json`, the build manifest persisted as
//! `chain.json`, the status taxonomy returned by catalog operations and the
//! content hash used to identify built archives.

pub mod chain;
pub mod hash;
pub mod registry;
pub mod types;

// Re-exports
pub use chain::{
    AddonChain, BuildManifest, BundleRecord, DanglingDependency, QualifiedId, QualifiedIdError,
    split_unit_name,
};
pub use hash::ContentHash;
pub use registry::{Addon, Asset, AssetLocation, Bundle, Registry};
pub use types::*;

/// Separator between an addon name and a bundle path in a qualified identifier.
pub const QUALIFIER: char = '@';

/// Separator between path components inside unit and bundle names.
pub const PATH_SEPARATOR: char = '/';
