//! Build manifest ("chain") persisted as `chain.json`.
//!
//! The manifest records every archive unit a build produced, grouped by
//! addon, together with its checksum, content hash and the qualified
//! identifiers of the units it depends on.
//!
//! ## Qualified identifiers
//!
//! The packaging engine names units `<addon>/<bundle path>`. Bundle paths
//! may themselves contain `/` (sliced bundles are named `name/Part_0`), so
//! the first separator is rewritten to `@`:
//!
//! ```text
//! AddonA/Sub/bundleX  ->  AddonA@Sub/bundleX  ->  ("AddonA", "Sub/bundleX")
//! ```

use crate::{PATH_SEPARATOR, QUALIFIER};
use serde::{Deserialize, Serialize};

/// Errors raised while building or parsing qualified identifiers.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum QualifiedIdError {
    /// A raw engine dependency did not have the `<addon>/<bundle>` shape.
    #[error("Malformed unit name '{0}': expected <addon>/<bundle>")]
    MalformedUnit(String),

    /// A qualified identifier did not have the `<addon>@<bundle>` shape.
    #[error("Malformed qualified identifier '{0}': expected <addon>@<bundle>")]
    MalformedQualified(String),
}

/// Split an engine unit name into `(addon, bundle path)` on the first `/`.
///
/// # Errors
///
/// Returns [`QualifiedIdError::MalformedUnit`] if either side is empty.
pub fn split_unit_name(unit: &str) -> Result<(&str, &str), QualifiedIdError> {
    match unit.split_once(PATH_SEPARATOR) {
        Some((addon, bundle)) if !addon.is_empty() && !bundle.is_empty() => Ok((addon, bundle)),
        _ => Err(QualifiedIdError::MalformedUnit(unit.to_string())),
    }
}

/// A dependency reference of the form `<addon>@<bundle path>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QualifiedId(String);

impl QualifiedId {
    /// Build an identifier from its parts.
    pub fn new(addon: &str, bundle_path: &str) -> Self {
        Self(format!("{addon}{QUALIFIER}{bundle_path}"))
    }

    /// Rewrite a raw engine dependency (`<addon>/<bundle path>`).
    ///
    /// # Errors
    ///
    /// Returns [`QualifiedIdError::MalformedUnit`] if the raw string has no
    /// addon or no bundle component.
    pub fn from_raw(raw: &str) -> Result<Self, QualifiedIdError> {
        let (addon, bundle) = split_unit_name(raw)?;
        Ok(Self::new(addon, bundle))
    }

    /// Parse an already-qualified identifier.
    ///
    /// # Errors
    ///
    /// Returns [`QualifiedIdError::MalformedQualified`] if there is no `@`
    /// or either side is empty.
    pub fn parse(s: &str) -> Result<Self, QualifiedIdError> {
        match s.split_once(QUALIFIER) {
            Some((addon, bundle)) if !addon.is_empty() && !bundle.is_empty() => {
                Ok(Self(s.to_string()))
            }
            _ => Err(QualifiedIdError::MalformedQualified(s.to_string())),
        }
    }

    /// Split back into `(addon, bundle path)`.
    pub fn split(&self) -> (&str, &str) {
        self.0.split_once(QUALIFIER).unwrap_or((self.0.as_str(), ""))
    }

    /// Addon half of the identifier.
    pub fn addon(&self) -> &str {
        self.split().0
    }

    /// Bundle path half of the identifier.
    pub fn bundle_path(&self) -> &str {
        self.split().1
    }

    /// Return the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for QualifiedId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for QualifiedId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Identity of one built archive unit.
///
/// Records are values: adding a dependency produces a new record instead of
/// mutating one that may already sit in another collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleRecord {
    name: String,
    crc: u32,
    hash: String,
    #[serde(default)]
    dependencies: Vec<QualifiedId>,
}

impl BundleRecord {
    /// Create a record with no dependencies.
    pub fn new(name: impl Into<String>, crc: u32, hash: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            crc,
            hash: hash.into(),
            dependencies: Vec::new(),
        }
    }

    /// Return a copy of this record with `dependency` appended.
    #[must_use]
    pub fn with_dependency(mut self, dependency: QualifiedId) -> Self {
        self.dependencies.push(dependency);
        self
    }

    /// Return a copy of this record with every dependency appended.
    #[must_use]
    pub fn with_dependencies(mut self, dependencies: impl IntoIterator<Item = QualifiedId>) -> Self {
        self.dependencies.extend(dependencies);
        self
    }

    /// Bundle path inside the addon.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 32-bit checksum of the archive file.
    pub fn crc(&self) -> u32 {
        self.crc
    }

    /// Content hash reported by the engine.
    pub fn hash(&self) -> &str {
        &self.hash
    }

    /// Units this one depends on.
    pub fn dependencies(&self) -> &[QualifiedId] {
        &self.dependencies
    }
}

/// Every built unit of one addon, in build order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddonChain {
    name: String,
    #[serde(rename = "Bundles", default)]
    bundles: Vec<BundleRecord>,
}

impl AddonChain {
    /// Create an empty chain entry.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bundles: Vec::new(),
        }
    }

    /// Addon name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Records in declaration order.
    pub fn bundles(&self) -> &[BundleRecord] {
        &self.bundles
    }

    /// Find a record by bundle path.
    pub fn bundle(&self, name: &str) -> Option<&BundleRecord> {
        self.bundles.iter().find(|b| b.name == name)
    }

    /// Insert a record, replacing any existing record with the same name in place.
    pub fn upsert(&mut self, record: BundleRecord) {
        match self.bundles.iter_mut().find(|b| b.name == record.name) {
            Some(slot) => *slot = record,
            None => self.bundles.push(record),
        }
    }
}

/// A dependency that does not resolve to any record in the manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DanglingDependency {
    /// Addon holding the offending record.
    pub addon: String,
    /// Bundle path of the offending record.
    pub bundle: String,
    /// The unresolved identifier.
    pub dependency: QualifiedId,
}

impl std::fmt::Display for DanglingDependency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}{QUALIFIER}{} -> {}",
            self.addon, self.bundle, self.dependency
        )
    }
}

/// The persisted build manifest: addon name → built units.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildManifest {
    #[serde(rename = "Addons", default)]
    addons: Vec<AddonChain>,
}

impl BuildManifest {
    /// Create an empty manifest.
    pub fn new() -> Self {
        Self::default()
    }

    /// Chain entries in declaration order.
    pub fn addons(&self) -> &[AddonChain] {
        &self.addons
    }

    /// Returns `true` if no addon has been recorded.
    pub fn is_empty(&self) -> bool {
        self.addons.is_empty()
    }

    /// Find the chain entry for an addon.
    pub fn addon(&self, name: &str) -> Option<&AddonChain> {
        self.addons.iter().find(|a| a.name == name)
    }

    /// Return the chain entry for an addon, creating it when missing.
    pub fn add_or_find_addon(&mut self, name: &str) -> &mut AddonChain {
        let index = match self.addons.iter().position(|a| a.name == name) {
            Some(index) => index,
            None => {
                self.addons.push(AddonChain::new(name));
                self.addons.len() - 1
            }
        };
        &mut self.addons[index]
    }

    /// Insert a whole chain entry, replacing any entry with the same name.
    pub fn insert_addon(&mut self, chain: AddonChain) {
        match self.addons.iter_mut().find(|a| a.name == chain.name) {
            Some(slot) => *slot = chain,
            None => self.addons.push(chain),
        }
    }

    /// Drop the chain entry for an addon.
    pub fn remove_addon(&mut self, name: &str) -> Option<AddonChain> {
        let index = self.addons.iter().position(|a| a.name == name)?;
        Some(self.addons.remove(index))
    }

    /// Upsert every record of `other` into this manifest.
    pub fn merge(&mut self, other: BuildManifest) {
        for chain in other.addons {
            let entry = self.add_or_find_addon(&chain.name);
            for record in chain.bundles {
                entry.upsert(record);
            }
        }
    }

    /// Look up the record a qualified identifier points at.
    pub fn resolve(&self, id: &QualifiedId) -> Option<&BundleRecord> {
        let (addon, bundle) = id.split();
        self.addon(addon).and_then(|chain| chain.bundle(bundle))
    }

    /// Every dependency that does not resolve inside this manifest.
    pub fn dangling(&self) -> Vec<DanglingDependency> {
        self.addons
            .iter()
            .flat_map(|chain| {
                chain.bundles.iter().flat_map(move |record| {
                    record
                        .dependencies
                        .iter()
                        .filter(|dep| self.resolve(dep).is_none())
                        .map(move |dep| DanglingDependency {
                            addon: chain.name.clone(),
                            bundle: record.name.clone(),
                            dependency: dep.clone(),
                        })
                })
            })
            .collect()
    }

    /// A copy of the manifest holding only the named addon.
    pub fn scoped(&self, addon: &str) -> Option<BuildManifest> {
        self.addon(addon).map(|chain| BuildManifest {
            addons: vec![chain.clone()],
        })
    }
}
