//! Packaging engine seam.
//!
//! The build driver hands a batch of [`UnitSpec`]s to a [`PackagingEngine`]
//! and gets back one [`UnitResult`] per produced archive. What happens in
//! between (byte layout, compression codec) is the engine's business.
//!
//! [`TarEngine`] is the bundled implementation: one tar archive per unit,
//! optionally zstd-compressed, checksummed with CRC-32 and hashed with
//! BLAKE3. It never reports dependencies.

use content_schema::{CompressionMode, ContentHash, split_unit_name};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// zstd level used for [`CompressionMode::Lz4`]: fast to write and read.
pub const FAST_LEVEL: i32 = 1;

/// zstd level used for [`CompressionMode::Lzma`]: small, slower to write.
pub const HIGH_LEVEL: i32 = 19;

/// One archive unit to build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitSpec {
    /// Qualified unit name `<addon>/<bundle>`.
    pub name: String,
    /// Source paths of the bundle's assets, in bundle order.
    pub asset_paths: Vec<String>,
    /// Addressable names, parallel to `asset_paths`.
    pub addressable_names: Vec<String>,
    /// Compression to apply.
    pub compression: CompressionMode,
}

/// Identity of one produced archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitResult {
    /// Qualified unit name `<addon>/<bundle path>`.
    pub name: String,
    /// 32-bit checksum of the archive file.
    pub crc: u32,
    /// Content hash of the archive file.
    pub hash: String,
    /// Raw dependencies, each `<addon>/<bundle path>`.
    pub dependencies: Vec<String>,
}

/// A failed engine run. The code is passed on to the user verbatim.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{code}: {detail}")]
pub struct EngineError {
    /// Engine-specific failure code.
    pub code: String,
    /// Human-readable detail.
    pub detail: String,
}

impl EngineError {
    /// Build an error from a code and a detail message.
    pub fn new(code: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            detail: detail.into(),
        }
    }
}

/// Something that turns unit specifications into archive files.
///
/// Runs as one blocking batch; the build driver moves it off the async
/// runtime.
pub trait PackagingEngine: Send + Sync {
    /// Build every unit into `output` and report what was produced.
    ///
    /// # Errors
    ///
    /// Any failure aborts the whole batch.
    fn build(&self, output: &Path, units: &[UnitSpec]) -> Result<Vec<UnitResult>, EngineError>;
}

impl<T: PackagingEngine + ?Sized> PackagingEngine for Arc<T> {
    fn build(&self, output: &Path, units: &[UnitSpec]) -> Result<Vec<UnitResult>, EngineError> {
        (**self).build(output, units)
    }
}

/// Tar-based engine reading assets relative to a project directory.
#[derive(Debug, Clone)]
pub struct TarEngine {
    project: PathBuf,
}

impl TarEngine {
    /// Engine resolving asset paths against `project`.
    pub fn new(project: impl Into<PathBuf>) -> Self {
        Self {
            project: project.into(),
        }
    }

    fn pack(&self, unit: &UnitSpec) -> Result<Vec<u8>, EngineError> {
        let mut builder = tar::Builder::new(Vec::new());
        builder.mode(tar::HeaderMode::Deterministic);

        for (path, name) in unit.asset_paths.iter().zip(&unit.addressable_names) {
            let source = self.project.join(path);
            let mut file = std::fs::File::open(&source).map_err(|e| {
                EngineError::new("MissingAsset", format!("{}: {e}", source.display()))
            })?;
            builder
                .append_file(name, &mut file)
                .map_err(|e| EngineError::new("PackFailed", format!("{}: {e}", unit.name)))?;
        }

        builder
            .into_inner()
            .map_err(|e| EngineError::new("PackFailed", format!("{}: {e}", unit.name)))
    }
}

/// Compress a packed archive according to `mode`.
///
/// # Errors
///
/// Returns an error if the zstd encoder fails.
pub fn compress(data: Vec<u8>, mode: CompressionMode) -> std::io::Result<Vec<u8>> {
    match mode {
        CompressionMode::None => Ok(data),
        CompressionMode::Lz4 => zstd::encode_all(&data[..], FAST_LEVEL),
        CompressionMode::Lzma => zstd::encode_all(&data[..], HIGH_LEVEL),
    }
}

/// CRC-32 of `data`.
pub fn checksum(data: &[u8]) -> u32 {
    let mut crc = flate2::Crc::new();
    crc.update(data);
    crc.sum()
}

impl PackagingEngine for TarEngine {
    fn build(&self, output: &Path, units: &[UnitSpec]) -> Result<Vec<UnitResult>, EngineError> {
        let mut results = Vec::with_capacity(units.len());

        for unit in units {
            let (addon, bundle) = split_unit_name(&unit.name)
                .map_err(|e| EngineError::new("InvalidUnitName", e.to_string()))?;
            if unit.asset_paths.len() != unit.addressable_names.len() {
                return Err(EngineError::new(
                    "InvalidUnit",
                    format!("{}: asset paths and names differ in length", unit.name),
                ));
            }

            let destination = crate::paths::bundle_path(output, addon, bundle).ok_or_else(|| {
                EngineError::new(
                    "InvalidUnitName",
                    format!("{}: resolves outside the output directory", unit.name),
                )
            })?;

            let packed = self.pack(unit)?;
            let bytes = compress(packed, unit.compression)
                .map_err(|e| EngineError::new("CompressionFailed", format!("{}: {e}", unit.name)))?;

            let write_err = |e: std::io::Error| {
                EngineError::new("WriteFailed", format!("{}: {e}", destination.display()))
            };
            if let Some(parent) = destination.parent() {
                std::fs::create_dir_all(parent).map_err(write_err)?;
            }
            let mut file = std::fs::File::create(&destination).map_err(write_err)?;
            file.write_all(&bytes).map_err(write_err)?;

            tracing::debug!(
                unit = %unit.name,
                size = bytes.len(),
                mode = %unit.compression,
                "Packed unit"
            );

            results.push(UnitResult {
                name: unit.name.clone(),
                crc: checksum(&bytes),
                hash: ContentHash::compute(&bytes).into_string(),
                dependencies: Vec::new(),
            });
        }

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn unit(name: &str, files: &[&str], compression: CompressionMode) -> UnitSpec {
        UnitSpec {
            name: name.to_string(),
            asset_paths: files.iter().map(|f| (*f).to_string()).collect(),
            addressable_names: files.iter().map(|f| format!("named_{f}")).collect(),
            compression,
        }
    }

    #[test]
    fn checksum_matches_known_value() {
        assert_eq!(checksum(b"123456789"), 0xCBF4_3926);
    }

    #[test]
    fn tar_engine_writes_archives() {
        let project = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        std::fs::write(project.path().join("a.txt"), b"alpha").unwrap();
        std::fs::write(project.path().join("b.txt"), b"beta").unwrap();

        let engine = TarEngine::new(project.path());
        let results = engine
            .build(
                output.path(),
                &[
                    unit("A/plain", &["a.txt"], CompressionMode::None),
                    unit("A/deep/Part_0", &["a.txt", "b.txt"], CompressionMode::Lzma),
                ],
            )
            .unwrap();

        assert_eq!(results.len(), 2);
        let plain = std::fs::read(output.path().join("A").join("plain")).unwrap();
        assert_eq!(results[0].crc, checksum(&plain));
        assert_eq!(results[0].hash, ContentHash::compute(&plain).as_str());
        assert!(results.iter().all(|r| r.dependencies.is_empty()));

        let packed = std::fs::read(output.path().join("A").join("deep").join("Part_0")).unwrap();
        let unpacked = zstd::decode_all(&packed[..]).unwrap();
        let mut archive = tar::Archive::new(&unpacked[..]);
        let names: Vec<String> = archive
            .entries()
            .unwrap()
            .map(|e| e.unwrap().path().unwrap().display().to_string())
            .collect();
        assert_eq!(names, vec!["named_a.txt", "named_b.txt"]);
    }

    #[test]
    fn missing_asset_fails_the_batch() {
        let project = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        let err = TarEngine::new(project.path())
            .build(output.path(), &[unit("A/b", &["nope.png"], CompressionMode::None)])
            .unwrap_err();
        assert_eq!(err.code, "MissingAsset");
    }

    #[test]
    fn malformed_unit_name_fails() {
        let project = TempDir::new().unwrap();
        let err = TarEngine::new(project.path())
            .build(project.path(), &[unit("nobundle", &[], CompressionMode::None)])
            .unwrap_err();
        assert_eq!(err.code, "InvalidUnitName");
    }

    #[test]
    fn unit_names_cannot_escape_the_output() {
        let project = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        std::fs::write(project.path().join("a.txt"), b"alpha").unwrap();
        let err = TarEngine::new(project.path())
            .build(
                output.path(),
                &[unit("A/../../escaped", &["a.txt"], CompressionMode::None)],
            )
            .unwrap_err();
        assert_eq!(err.code, "InvalidUnitName");
        assert!(!output.path().parent().unwrap().join("escaped").exists());
    }
}
