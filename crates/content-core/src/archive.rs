//! Runtime archive loading.
//!
//! Loading is modelled as a poll: [`ArchiveLoader::begin_load`] starts the
//! work and returns a [`LoadRequest`] that the mounter polls until it yields
//! a handle or an error. The bundled [`TarArchiveLoader`] reads archives
//! produced by [`crate::engine::TarEngine`] on a blocking task.

use std::collections::{BTreeMap, HashMap};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use tokio::sync::oneshot;

const ZSTD_MAGIC: [u8; 4] = [0x28, 0xB5, 0x2F, 0xFD];
const READ_CHUNK: usize = 64 * 1024;

/// State of an in-flight load.
#[derive(Debug)]
pub enum LoadPoll {
    /// Still loading; progress in `[0, 1]`.
    Pending(f32),
    /// Finished with a live handle.
    Done(Box<dyn ArchiveHandle>),
    /// Finished without a usable handle.
    Failed(String),
}

/// An in-flight load.
pub trait LoadRequest: Send {
    /// Current state. Once `Done` or `Failed` has been returned the request
    /// is spent.
    fn poll(&mut self) -> LoadPoll;
}

/// Starts archive loads.
pub trait ArchiveLoader: Send + Sync {
    /// Begin loading the archive at `path`.
    fn begin_load(&self, path: &Path) -> Box<dyn LoadRequest>;
}

impl<T: ArchiveLoader + ?Sized> ArchiveLoader for Arc<T> {
    fn begin_load(&self, path: &Path) -> Box<dyn LoadRequest> {
        (**self).begin_load(path)
    }
}

/// A loaded archive.
pub trait ArchiveHandle: Send + Sync + std::fmt::Debug {
    /// Names of the assets the archive holds.
    fn asset_names(&self) -> Vec<String>;

    /// Load one asset, keeping it alive until released.
    fn load_asset(&mut self, name: &str) -> Option<Arc<[u8]>>;

    /// Release the archive. With `release_loaded_assets`, assets already
    /// handed out are evicted as well.
    fn release(&mut self, release_loaded_assets: bool);
}

/// An archive unpacked into memory.
#[derive(Debug)]
pub struct TarArchive {
    path: PathBuf,
    entries: BTreeMap<String, Arc<[u8]>>,
    loaded: HashMap<String, Arc<[u8]>>,
    released: bool,
}

impl TarArchive {
    /// Unpack a (possibly zstd-compressed) tar archive.
    ///
    /// # Errors
    ///
    /// Returns an error if decompression or tar parsing fails.
    pub fn from_bytes(path: impl Into<PathBuf>, bytes: &[u8]) -> std::io::Result<Self> {
        let decoded;
        let raw = if bytes.starts_with(&ZSTD_MAGIC) {
            decoded = zstd::decode_all(bytes)?;
            &decoded[..]
        } else {
            bytes
        };

        let mut entries = BTreeMap::new();
        let mut archive = tar::Archive::new(raw);
        for entry in archive.entries()? {
            let mut entry = entry?;
            let name = entry.path()?.to_string_lossy().into_owned();
            let mut data = Vec::new();
            entry.read_to_end(&mut data)?;
            entries.insert(name, Arc::from(data));
        }

        Ok(Self {
            path: path.into(),
            entries,
            loaded: HashMap::new(),
            released: false,
        })
    }

    /// File the archive was read from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of assets currently held alive by callers' loads.
    pub fn loaded_count(&self) -> usize {
        self.loaded.len()
    }

    /// Returns `true` once `release` has been called.
    pub fn is_released(&self) -> bool {
        self.released
    }
}

impl ArchiveHandle for TarArchive {
    fn asset_names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    fn load_asset(&mut self, name: &str) -> Option<Arc<[u8]>> {
        let data = self.entries.get(name)?.clone();
        self.loaded.insert(name.to_string(), data.clone());
        Some(data)
    }

    fn release(&mut self, release_loaded_assets: bool) {
        self.entries.clear();
        if release_loaded_assets {
            self.loaded.clear();
        }
        self.released = true;
    }
}

/// Loads [`TarArchive`]s on the blocking thread pool.
#[derive(Debug, Clone, Copy, Default)]
pub struct TarArchiveLoader;

struct TarLoadRequest {
    progress: Arc<AtomicU32>,
    rx: oneshot::Receiver<Result<TarArchive, String>>,
}

impl LoadRequest for TarLoadRequest {
    fn poll(&mut self) -> LoadPoll {
        match self.rx.try_recv() {
            Ok(Ok(archive)) => LoadPoll::Done(Box::new(archive)),
            Ok(Err(e)) => LoadPoll::Failed(e),
            Err(oneshot::error::TryRecvError::Empty) => {
                LoadPoll::Pending(f32::from_bits(self.progress.load(Ordering::Relaxed)))
            }
            Err(oneshot::error::TryRecvError::Closed) => {
                LoadPoll::Failed("load task ended without a result".to_string())
            }
        }
    }
}

fn read_with_progress(path: &Path, progress: &AtomicU32) -> std::io::Result<Vec<u8>> {
    let mut file = std::fs::File::open(path)?;
    let total = file.metadata()?.len().max(1);
    let mut data = Vec::with_capacity(usize::try_from(total).unwrap_or(0));
    let mut chunk = vec![0u8; READ_CHUNK];

    loop {
        let n = file.read(&mut chunk)?;
        if n == 0 {
            break;
        }
        data.extend_from_slice(&chunk[..n]);
        let fraction = (data.len() as f64 / total as f64).min(1.0) as f32;
        progress.store(fraction.to_bits(), Ordering::Relaxed);
    }

    Ok(data)
}

impl ArchiveLoader for TarArchiveLoader {
    fn begin_load(&self, path: &Path) -> Box<dyn LoadRequest> {
        let progress = Arc::new(AtomicU32::new(0f32.to_bits()));
        let (tx, rx) = oneshot::channel();

        let path = path.to_path_buf();
        let task_progress = Arc::clone(&progress);
        tokio::task::spawn_blocking(move || {
            let result = read_with_progress(&path, &task_progress)
                .and_then(|bytes| TarArchive::from_bytes(&path, &bytes))
                .map_err(|e| format!("{}: {e}", path.display()));
            let _ = tx.send(result);
        });

        Box::new(TarLoadRequest { progress, rx })
    }
}
