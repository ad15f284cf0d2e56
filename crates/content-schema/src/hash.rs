//! Content hashes.

use serde::{Deserialize, Serialize};
use std::io::Read;

/// BLAKE3 content hash of a built archive (64 hex characters).
///
/// The manifest stores it as an opaque string so that engines hashing with
/// something else can still be recorded; this type is what the bundled
/// engine produces.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHash(String);

impl ContentHash {
    /// Wrap an existing hex string without validation.
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Hash an in-memory buffer.
    pub fn compute(data: &[u8]) -> Self {
        Self(blake3::hash(data).to_hex().to_string())
    }

    /// Hash everything readable from `reader` without buffering it whole.
    ///
    /// # Errors
    ///
    /// Returns any I/O error raised by the reader.
    pub fn compute_reader<R: Read>(mut reader: R) -> std::io::Result<Self> {
        let mut hasher = blake3::Hasher::new();
        std::io::copy(&mut reader, &mut hasher)?;
        Ok(Self(hasher.finalize().to_hex().to_string()))
    }

    /// Return the inner hex string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the hash, returning the hex string.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for ContentHash {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
