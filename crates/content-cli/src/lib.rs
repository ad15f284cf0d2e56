//! content - addon catalog, build chain and mounter
#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_panics_doc)]
//!
//! Command-line front end for `content-core`.
//!
//! # Directory Layout
//!
//! ```text
//! Content/               # --root, or $CONTENT_ROOT
//! ├── content.json       # Registry
//! ├── chain.json         # Build manifest
//! ├── compression.json   # Compression overrides
//! └── <addon>/           # Distributable addon: scoped copies + archives
//! ```

pub mod cmd;
pub mod ui;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "content")]
#[command(author, version, about = "content - addon catalog, build chain and mounter")]
pub struct Cli {
    /// Content root (defaults to ./Content)
    #[arg(long, global = true, env = "CONTENT_ROOT")]
    pub root: Option<PathBuf>,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Manage addons
    Addon {
        #[command(subcommand)]
        command: AddonCommands,
    },
    /// Manage bundles
    Bundle {
        #[command(subcommand)]
        command: BundleCommands,
    },
    /// Manage assets
    Asset {
        #[command(subcommand)]
        command: AssetCommands,
    },
    /// Per-bundle compression overrides
    Compression {
        #[command(subcommand)]
        command: CompressionCommands,
    },
    /// Build archives and the manifest
    Build {
        /// Project directory asset paths are relative to
        #[arg(long, default_value = ".")]
        project: PathBuf,
        /// Only build this addon
        #[arg(long)]
        addon: Option<String>,
        /// Only build this bundle (requires --addon)
        #[arg(long, requires = "addon")]
        bundle: Option<String>,
    },
    /// Write report.log describing the catalog
    Report,
    /// List distributable addons found under the content root
    Detect,
    /// Mount addons and print per-bundle status
    Mount {
        /// Addon name(s)
        #[arg(required = true)]
        addons: Vec<String>,
        /// Mount prerequisite addons first
        #[arg(long)]
        with_deps: bool,
    },
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}

#[derive(Debug, Subcommand)]
pub enum AddonCommands {
    /// Create an addon
    Add {
        /// Addon name (path separators, dots and '@' are stripped)
        name: String,
        /// Description
        #[arg(long)]
        description: Option<String>,
        /// Author
        #[arg(long)]
        author: Option<String>,
    },
    /// Remove an addon and everything in it
    Remove {
        /// Addon name
        name: String,
    },
    /// List addons and bundles
    List,
}

#[derive(Debug, Subcommand)]
pub enum BundleCommands {
    /// Create a bundle
    Add {
        /// Owning addon
        addon: String,
        /// Bundle name
        name: String,
    },
    /// Remove a bundle and its assets
    Remove {
        /// Owning addon
        addon: String,
        /// Bundle name
        name: String,
    },
    /// Slice a bundle into balanced parts
    Slice {
        /// Owning addon
        addon: String,
        /// Bundle name
        name: String,
        /// Number of parts
        #[arg(long, conflicts_with = "max", required_unless_present = "max")]
        parts: Option<usize>,
        /// Maximum assets per part
        #[arg(long)]
        max: Option<usize>,
    },
    /// Merge bundles into one
    Split {
        /// Owning addon
        addon: String,
        /// Source bundles
        #[arg(required = true)]
        sources: Vec<String>,
        /// Destination bundle (created when missing)
        #[arg(long)]
        into: String,
    },
    /// Move a bundle to another addon
    Move {
        /// Bundle name
        name: String,
        /// Destination addon
        #[arg(long)]
        to: String,
    },
}

#[derive(Debug, Subcommand)]
pub enum AssetCommands {
    /// Add a file to a bundle
    Add {
        /// Owning addon
        addon: String,
        /// Target bundle
        bundle: String,
        /// Source path of the file
        path: String,
        /// Addressable name (defaults to the file stem)
        #[arg(long)]
        name: Option<String>,
        /// Type name reported by the import pipeline
        #[arg(long = "type")]
        type_name: String,
        /// Parent type name
        #[arg(long, default_value = "")]
        base_type: String,
        /// Content id (defaults to a hash of the path)
        #[arg(long)]
        id: Option<String>,
    },
    /// Remove an asset by content id
    Remove {
        /// Content id
        id: String,
    },
    /// Move an asset to another bundle
    Move {
        /// Content id
        id: String,
        /// Destination addon
        #[arg(long)]
        addon: String,
        /// Destination bundle
        #[arg(long)]
        bundle: String,
    },
}

#[derive(Debug, Subcommand)]
pub enum CompressionCommands {
    /// Set the mode of a bundle (none, lz4, lzma)
    Set {
        /// Owning addon
        addon: String,
        /// Bundle name
        bundle: String,
        /// Compression mode
        mode: content_schema::CompressionMode,
    },
    /// Show the resolved mode of a bundle
    Get {
        /// Owning addon
        addon: String,
        /// Bundle name
        bundle: String,
    },
}
