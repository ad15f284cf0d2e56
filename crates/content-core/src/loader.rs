//! Loader / Mounter
//!
//! Mounts distributable addons found under the content root. Detection is a
//! one-time scan for subdirectories holding both `content.json` and
//! `chain.json`; the chain entry found there is the addon's bundle list.
//!
//! # State machine
//!
//! ```text
//! bundle:  NotMounted → Loading → Mounted | LoadingError | NotFound
//! addon:   a repeated mount request answers AlreadyMounted and does nothing
//! ```
//!
//! Each mount runs its bundles strictly in manifest order. Independent
//! addons may be mounted concurrently from separate tasks; the shared table
//! is only locked for short, non-async sections.

use crate::archive::{ArchiveHandle, ArchiveLoader, LoadPoll};
use crate::paths;
use crate::reporter::{NullReporter, Reporter};
use crate::store;
use content_schema::{AddonChain, BuildManifest};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::{OnceCell, mpsc};

/// Default delay between two polls of an in-flight load.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Runtime status of a mounted addon or bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MountStatus {
    /// Not mounted.
    NotMounted,
    /// No detected addon, or no archive file on disk.
    NotFound,
    /// Load in progress.
    Loading,
    /// Loading finished without a usable handle.
    LoadingError,
    /// Loaded and live.
    Mounted,
    /// A mount was requested for an addon that is already tracked.
    AlreadyMounted,
}

impl MountStatus {
    /// Short label used in terminal output.
    pub fn label(self) -> &'static str {
        match self {
            Self::NotMounted => "not mounted",
            Self::NotFound => "not found",
            Self::Loading => "loading",
            Self::LoadingError => "loading error",
            Self::Mounted => "mounted",
            Self::AlreadyMounted => "already mounted",
        }
    }
}

impl std::fmt::Display for MountStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Progress notifications emitted while mounting.
#[derive(Debug, Clone, PartialEq)]
pub enum MountEvent {
    /// A mount started.
    AddonStarted {
        /// Addon name.
        addon: String,
        /// Number of bundles to load.
        bundles: usize,
    },
    /// A bundle load advanced.
    BundleProgress {
        /// Addon name.
        addon: String,
        /// Bundle name.
        bundle: String,
        /// Progress in percent.
        progress: f32,
    },
    /// A bundle reached a final status.
    BundleFinished {
        /// Addon name.
        addon: String,
        /// Bundle name.
        bundle: String,
        /// Final status.
        status: MountStatus,
    },
    /// The addon's bundle loop finished.
    AddonFinished {
        /// Addon name.
        addon: String,
        /// Final status.
        status: MountStatus,
        /// Bundles mounted.
        mounted: usize,
        /// Bundles without an archive file.
        missing: usize,
    },
}

#[derive(Debug)]
struct MountedBundle {
    name: String,
    status: MountStatus,
    progress: f32,
    handle: Option<Box<dyn ArchiveHandle>>,
}

#[derive(Debug)]
struct MountedAddon {
    name: String,
    status: MountStatus,
    progress: f32,
    mounted: usize,
    missing: usize,
    bundles: Vec<MountedBundle>,
}

/// Point-in-time view of a mounted bundle.
#[derive(Debug, Clone, PartialEq)]
pub struct BundleSnapshot {
    /// Bundle name.
    pub name: String,
    /// Current status.
    pub status: MountStatus,
    /// Progress in percent.
    pub progress: f32,
    /// Whether a live archive handle is held.
    pub live: bool,
}

/// Point-in-time view of a mounted addon.
#[derive(Debug, Clone, PartialEq)]
pub struct AddonSnapshot {
    /// Addon name.
    pub name: String,
    /// Current status.
    pub status: MountStatus,
    /// Completed bundles in percent.
    pub progress: f32,
    /// Bundles mounted so far.
    pub mounted: usize,
    /// Bundles without an archive file so far.
    pub missing: usize,
    /// Per-bundle state in manifest order.
    pub bundles: Vec<BundleSnapshot>,
}

type Tracked = Arc<Mutex<MountedAddon>>;

/// Mounts and unmounts distributable addons.
pub struct Mounter {
    root: PathBuf,
    loader: Arc<dyn ArchiveLoader>,
    detected: OnceCell<HashMap<String, AddonChain>>,
    mounted: Mutex<HashMap<String, Tracked>>,
    reporter: Arc<dyn Reporter>,
    events: Option<mpsc::UnboundedSender<MountEvent>>,
    poll_interval: Duration,
}

impl std::fmt::Debug for Mounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mounter")
            .field("root", &self.root)
            .field("poll_interval", &self.poll_interval)
            .finish_non_exhaustive()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // A panic while holding the lock leaves plain data behind; keep going.
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

impl Mounter {
    /// Mounter for `root` using `loader` to read archives.
    pub fn new(root: impl Into<PathBuf>, loader: Arc<dyn ArchiveLoader>) -> Self {
        Self {
            root: root.into(),
            loader,
            detected: OnceCell::new(),
            mounted: Mutex::new(HashMap::new()),
            reporter: Arc::new(NullReporter),
            events: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Report progress through `reporter`.
    #[must_use]
    pub fn with_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Also publish progress as [`MountEvent`]s.
    #[must_use]
    pub fn with_events(mut self, events: mpsc::UnboundedSender<MountEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Delay between polls of an in-flight load.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Content root being served.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn emit(&self, event: MountEvent) {
        if let Some(tx) = &self.events {
            // Receiver gone means nobody is listening.
            let _ = tx.send(event);
        }
    }

    // ---- Detection ----

    /// Distributable addons under the root, scanned once and memoized.
    pub async fn detected(&self) -> &HashMap<String, AddonChain> {
        self.detected
            .get_or_init(|| detect_addons(&self.root))
            .await
    }

    /// Every detected chain entry merged into one manifest.
    pub async fn detected_manifest(&self) -> BuildManifest {
        let detected = self.detected().await;
        let mut chains: Vec<&AddonChain> = detected.values().collect();
        chains.sort_by(|a, b| a.name().cmp(b.name()));

        let mut manifest = BuildManifest::new();
        for chain in chains {
            manifest.insert_addon(chain.clone());
        }
        manifest
    }

    // ---- Mounting ----

    /// Returns `true` if the addon is tracked (in any status).
    pub fn is_mounted(&self, addon: &str) -> bool {
        lock(&self.mounted).contains_key(addon)
    }

    /// Names of all tracked addons, sorted.
    pub fn mounted_addons(&self) -> Vec<String> {
        let mut names: Vec<String> = lock(&self.mounted).keys().cloned().collect();
        names.sort();
        names
    }

    /// Snapshot of a tracked addon.
    pub fn snapshot(&self, addon: &str) -> Option<AddonSnapshot> {
        let tracked = lock(&self.mounted).get(addon).cloned()?;
        let state = lock(&tracked);
        Some(AddonSnapshot {
            name: state.name.clone(),
            status: state.status,
            progress: state.progress,
            mounted: state.mounted,
            missing: state.missing,
            bundles: state
                .bundles
                .iter()
                .map(|b| BundleSnapshot {
                    name: b.name.clone(),
                    status: b.status,
                    progress: b.progress,
                    live: b.handle.is_some(),
                })
                .collect(),
        })
    }

    /// Mount a detected addon.
    ///
    /// Returns [`MountStatus::AlreadyMounted`] without any I/O if the addon is
    /// tracked, [`MountStatus::NotFound`] if it was not detected, and
    /// otherwise the aggregate result: `Mounted` when every bundle mounted,
    /// `NotFound` when no archive file exists, `LoadingError` otherwise.
    /// Once detected, the addon stays tracked whatever the outcome until
    /// [`Mounter::unmount`].
    pub async fn mount(&self, addon: &str) -> MountStatus {
        if self.is_mounted(addon) {
            return MountStatus::AlreadyMounted;
        }

        let Some(chain) = self.detected().await.get(addon).cloned() else {
            tracing::debug!(addon, "Addon not detected");
            return MountStatus::NotFound;
        };

        let tracked: Tracked = Arc::new(Mutex::new(MountedAddon {
            name: addon.to_string(),
            status: MountStatus::Loading,
            progress: 0.0,
            mounted: 0,
            missing: 0,
            bundles: chain
                .bundles()
                .iter()
                .map(|record| MountedBundle {
                    name: record.name().to_string(),
                    status: MountStatus::NotMounted,
                    progress: 0.0,
                    handle: None,
                })
                .collect(),
        }));

        {
            let mut table = lock(&self.mounted);
            if table.contains_key(addon) {
                return MountStatus::AlreadyMounted;
            }
            table.insert(addon.to_string(), Arc::clone(&tracked));
        }

        let total = chain.bundles().len();
        tracing::debug!(addon, bundles = total, "Mounting addon");
        self.reporter.section(&format!("Mounting {addon}"));
        self.emit(MountEvent::AddonStarted {
            addon: addon.to_string(),
            bundles: total,
        });

        let mut mounted = 0;
        let mut missing = 0;

        for (index, record) in chain.bundles().iter().enumerate() {
            if !self.still_tracked(addon, &tracked) {
                tracing::debug!(addon, "Unmounted during mount; stopping");
                return MountStatus::NotMounted;
            }

            let status = self.mount_bundle(addon, index, record.name(), &tracked).await;
            match status {
                MountStatus::Mounted => mounted += 1,
                MountStatus::NotFound => missing += 1,
                MountStatus::NotMounted => {
                    tracing::debug!(addon, "Unmounted during mount; stopping");
                    return MountStatus::NotMounted;
                }
                _ => {}
            }

            let mut state = lock(&tracked);
            state.mounted = mounted;
            state.missing = missing;
            state.progress = (index + 1) as f32 / total as f32 * 100.0;
        }

        let status = if mounted == total {
            MountStatus::Mounted
        } else if missing == total {
            MountStatus::NotFound
        } else {
            MountStatus::LoadingError
        };
        lock(&tracked).status = status;

        tracing::debug!(addon, %status, mounted, missing, total, "Mount finished");
        match status {
            MountStatus::Mounted => self.reporter.success(&format!(
                "Mounted {addon} [Bundles: {mounted}/{total}]"
            )),
            _ => self.reporter.warning(&format!(
                "{addon}: {status} [Bundles: {mounted}/{total}, missing {missing}]"
            )),
        }
        self.emit(MountEvent::AddonFinished {
            addon: addon.to_string(),
            status,
            mounted,
            missing,
        });

        status
    }

    fn still_tracked(&self, addon: &str, tracked: &Tracked) -> bool {
        lock(&self.mounted)
            .get(addon)
            .is_some_and(|current| Arc::ptr_eq(current, tracked))
    }

    fn set_bundle(&self, tracked: &Tracked, index: usize, status: MountStatus, progress: f32) {
        if let Some(bundle) = lock(tracked).bundles.get_mut(index) {
            bundle.status = status;
            bundle.progress = progress;
        }
    }

    async fn mount_bundle(
        &self,
        addon: &str,
        index: usize,
        bundle: &str,
        tracked: &Tracked,
    ) -> MountStatus {
        let Some(path) = paths::bundle_path(&self.root, addon, bundle) else {
            tracing::warn!(addon, bundle, "Bundle name resolves outside the addon folder");
            self.set_bundle(tracked, index, MountStatus::LoadingError, 0.0);
            self.reporter.bundle_failed(addon, bundle, "invalid bundle name");
            self.finish_bundle(addon, bundle, MountStatus::LoadingError);
            return MountStatus::LoadingError;
        };

        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            tracing::debug!(addon, bundle, path = %path.display(), "Archive missing");
            self.set_bundle(tracked, index, MountStatus::NotFound, 0.0);
            self.reporter.bundle_failed(addon, bundle, "archive not found");
            self.finish_bundle(addon, bundle, MountStatus::NotFound);
            return MountStatus::NotFound;
        }

        self.set_bundle(tracked, index, MountStatus::Loading, 0.0);
        let mut request = self.loader.begin_load(&path);

        let status = loop {
            match request.poll() {
                LoadPoll::Pending(fraction) => {
                    let progress = fraction.clamp(0.0, 1.0) * 100.0;
                    self.set_bundle(tracked, index, MountStatus::Loading, progress);
                    self.reporter.bundle_progress(addon, bundle, progress);
                    self.emit(MountEvent::BundleProgress {
                        addon: addon.to_string(),
                        bundle: bundle.to_string(),
                        progress,
                    });
                    tokio::time::sleep(self.poll_interval).await;
                }
                LoadPoll::Done(mut handle) => {
                    if !self.still_tracked(addon, tracked) {
                        // Unmounted while loading: nobody owns this handle.
                        handle.release(true);
                        break MountStatus::NotMounted;
                    }
                    let mut state = lock(tracked);
                    if let Some(slot) = state.bundles.get_mut(index) {
                        slot.status = MountStatus::Mounted;
                        slot.progress = 100.0;
                        slot.handle = Some(handle);
                    }
                    drop(state);
                    self.reporter.bundle_done(addon, bundle, "mounted");
                    break MountStatus::Mounted;
                }
                LoadPoll::Failed(reason) => {
                    tracing::warn!(addon, bundle, %reason, "Archive failed to load");
                    self.set_bundle(tracked, index, MountStatus::LoadingError, 0.0);
                    self.reporter.bundle_failed(addon, bundle, &reason);
                    break MountStatus::LoadingError;
                }
            }
        };

        self.finish_bundle(addon, bundle, status);
        status
    }

    fn finish_bundle(&self, addon: &str, bundle: &str, status: MountStatus) {
        tracing::debug!(addon, bundle, %status, "Bundle finished");
        self.emit(MountEvent::BundleFinished {
            addon: addon.to_string(),
            bundle: bundle.to_string(),
            status,
        });
    }

    /// Load one asset from a mounted bundle.
    ///
    /// Returns `None` if the bundle holds no live handle or the archive has
    /// no such asset. The asset stays loaded until the addon is unmounted
    /// with `release_loaded_assets`.
    pub fn load_asset(&self, addon: &str, bundle: &str, name: &str) -> Option<Arc<[u8]>> {
        let tracked = lock(&self.mounted).get(addon).cloned()?;
        let mut state = lock(&tracked);
        state
            .bundles
            .iter_mut()
            .find(|b| b.name == bundle)?
            .handle
            .as_mut()?
            .load_asset(name)
    }

    /// Release every live handle of an addon and stop tracking it.
    ///
    /// Returns `false` (and does nothing) if the addon is not tracked.
    pub fn unmount(&self, addon: &str, release_loaded_assets: bool) -> bool {
        let Some(tracked) = lock(&self.mounted).remove(addon) else {
            return false;
        };

        let mut state = lock(&tracked);
        for bundle in &mut state.bundles {
            if let Some(mut handle) = bundle.handle.take() {
                handle.release(release_loaded_assets);
            }
            bundle.status = MountStatus::NotMounted;
            bundle.progress = 0.0;
        }
        state.status = MountStatus::NotMounted;
        state.progress = 0.0;
        state.mounted = 0;
        state.missing = 0;

        tracing::debug!(addon, release_loaded_assets, "Unmounted addon");
        true
    }

    /// Unmount every tracked addon.
    pub fn unmount_all(&self, release_loaded_assets: bool) -> usize {
        self.mounted_addons()
            .iter()
            .filter(|name| self.unmount(name, release_loaded_assets))
            .count()
    }
}

/// Scan `root` for distributable addon folders.
///
/// A folder qualifies when it holds both `content.json` and `chain.json`
/// and its `chain.json` has an entry named after the folder.
pub async fn detect_addons(root: &Path) -> HashMap<String, AddonChain> {
    let mut detected = HashMap::new();

    let mut entries = match tokio::fs::read_dir(root).await {
        Ok(entries) => entries,
        Err(e) => {
            tracing::debug!(root = %root.display(), error = %e, "Content root not readable");
            return detected;
        }
    };

    while let Ok(Some(entry)) = entries.next_entry().await {
        let dir = entry.path();
        if !entry.file_type().await.is_ok_and(|t| t.is_dir()) {
            continue;
        }
        let Some(name) = dir.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
            continue;
        };

        let content = paths::content_file(&dir);
        let chain = paths::chain_file(&dir);
        if !(content.exists() && chain.exists()) {
            continue;
        }

        let manifest: BuildManifest = store::read_json_or_default(&chain).await;
        match manifest.addon(&name) {
            Some(entry) => {
                tracing::debug!(addon = %name, bundles = entry.bundles().len(), "Detected addon");
                detected.insert(name, entry.clone());
            }
            None => tracing::warn!(addon = %name, "chain.json has no entry for its folder"),
        }
    }

    detected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::LoadRequest;
    use content_schema::{BundleRecord, Registry};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use tempfile::TempDir;

    /// Every archive holds a single asset named `hero`. Loaded names are
    /// recorded in the shared list until released with eviction.
    #[derive(Debug)]
    struct FakeHandle {
        releases: Arc<AtomicUsize>,
        loaded: Arc<Mutex<Vec<String>>>,
    }

    impl ArchiveHandle for FakeHandle {
        fn asset_names(&self) -> Vec<String> {
            vec!["hero".to_string()]
        }
        fn load_asset(&mut self, name: &str) -> Option<Arc<[u8]>> {
            if name != "hero" {
                return None;
            }
            lock(&self.loaded).push(name.to_string());
            Some(Arc::from(&b"pixels"[..]))
        }
        fn release(&mut self, release_loaded_assets: bool) {
            self.releases.fetch_add(1, Ordering::SeqCst);
            if release_loaded_assets {
                lock(&self.loaded).clear();
            }
        }
    }

    struct FakeRequest {
        polls: usize,
        fail: bool,
        hold: Arc<AtomicBool>,
        releases: Arc<AtomicUsize>,
        loaded: Arc<Mutex<Vec<String>>>,
    }

    impl LoadRequest for FakeRequest {
        fn poll(&mut self) -> LoadPoll {
            if self.hold.load(Ordering::SeqCst) {
                return LoadPoll::Pending(0.25);
            }
            self.polls += 1;
            match (self.polls, self.fail) {
                (1, _) => LoadPoll::Pending(0.5),
                (_, true) => LoadPoll::Failed("corrupt".to_string()),
                (_, false) => LoadPoll::Done(Box::new(FakeHandle {
                    releases: Arc::clone(&self.releases),
                    loaded: Arc::clone(&self.loaded),
                })),
            }
        }
    }

    /// Loads anything; paths ending in `bad` fail. Counts loads and releases.
    /// While `hold` is set, requests stay pending.
    #[derive(Default)]
    struct FakeLoader {
        loads: AtomicUsize,
        hold: Arc<AtomicBool>,
        releases: Arc<AtomicUsize>,
        loaded: Arc<Mutex<Vec<String>>>,
    }

    impl FakeLoader {
        fn loaded(&self) -> Vec<String> {
            lock(&self.loaded).clone()
        }
    }

    impl ArchiveLoader for FakeLoader {
        fn begin_load(&self, path: &Path) -> Box<dyn LoadRequest> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            Box::new(FakeRequest {
                polls: 0,
                fail: path.ends_with("bad"),
                hold: Arc::clone(&self.hold),
                releases: Arc::clone(&self.releases),
                loaded: Arc::clone(&self.loaded),
            })
        }
    }

    fn publish(root: &Path, addon: &str, bundles: &[&str], on_disk: &[&str]) {
        let dir = root.join(addon);
        std::fs::create_dir_all(&dir).unwrap();

        let mut registry = Registry::new();
        registry.add_addon(addon);
        std::fs::write(dir.join("content.json"), serde_json::to_vec(&registry).unwrap()).unwrap();

        let mut manifest = BuildManifest::new();
        let chain = manifest.add_or_find_addon(addon);
        for bundle in bundles {
            chain.upsert(BundleRecord::new(*bundle, 0, "h"));
        }
        std::fs::write(dir.join("chain.json"), serde_json::to_vec(&manifest).unwrap()).unwrap();

        for bundle in on_disk {
            std::fs::write(dir.join(bundle), b"archive").unwrap();
        }
    }

    fn fake_mounter(root: &Path) -> (Mounter, Arc<FakeLoader>) {
        let loader = Arc::new(FakeLoader::default());
        let mounter = Mounter::new(root, loader.clone()).with_poll_interval(Duration::from_millis(1));
        (mounter, loader)
    }

    #[tokio::test]
    async fn detection_requires_both_files() {
        let dir = TempDir::new().unwrap();
        publish(dir.path(), "Weapons", &["rifles"], &[]);
        std::fs::create_dir_all(dir.path().join("Stray")).unwrap();
        std::fs::write(dir.path().join("Stray").join("chain.json"), b"{}").unwrap();

        let detected = detect_addons(dir.path()).await;
        assert_eq!(detected.len(), 1);
        assert!(detected.contains_key("Weapons"));
    }

    #[tokio::test]
    async fn mount_all_bundles() {
        let dir = TempDir::new().unwrap();
        publish(dir.path(), "A", &["one", "two"], &["one", "two"]);
        let (mounter, _) = fake_mounter(dir.path());

        assert_eq!(mounter.mount("A").await, MountStatus::Mounted);
        let snapshot = mounter.snapshot("A").unwrap();
        assert_eq!(snapshot.status, MountStatus::Mounted);
        assert!((snapshot.progress - 100.0).abs() < f32::EPSILON);
        assert!(snapshot.bundles.iter().all(|b| b.live && b.status == MountStatus::Mounted));
        let names: Vec<_> = snapshot.bundles.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["one", "two"]);
    }

    #[tokio::test]
    async fn second_mount_is_a_no_op() {
        let dir = TempDir::new().unwrap();
        publish(dir.path(), "A", &["one"], &["one"]);
        let (mounter, loader) = fake_mounter(dir.path());

        assert_eq!(mounter.mount("A").await, MountStatus::Mounted);
        let loads = loader.loads.load(Ordering::SeqCst);
        assert_eq!(mounter.mount("A").await, MountStatus::AlreadyMounted);
        assert_eq!(loader.loads.load(Ordering::SeqCst), loads);
    }

    #[tokio::test]
    async fn unknown_addon_is_not_found() {
        let dir = TempDir::new().unwrap();
        let (mounter, _) = fake_mounter(dir.path());
        assert_eq!(mounter.mount("Ghost").await, MountStatus::NotFound);
        assert!(!mounter.is_mounted("Ghost"));
    }

    #[tokio::test]
    async fn missing_and_failed_bundles_are_recorded() {
        let dir = TempDir::new().unwrap();
        publish(dir.path(), "A", &["one", "gone", "bad"], &["one", "bad"]);
        let (mounter, _) = fake_mounter(dir.path());

        assert_eq!(mounter.mount("A").await, MountStatus::LoadingError);
        let snapshot = mounter.snapshot("A").unwrap();
        assert_eq!(snapshot.mounted, 1);
        assert_eq!(snapshot.missing, 1);
        let statuses: Vec<_> = snapshot.bundles.iter().map(|b| b.status).collect();
        assert_eq!(
            statuses,
            vec![
                MountStatus::Mounted,
                MountStatus::NotFound,
                MountStatus::LoadingError
            ]
        );
    }

    #[tokio::test]
    async fn all_missing_is_not_found_but_tracked() {
        let dir = TempDir::new().unwrap();
        publish(dir.path(), "A", &["one", "two"], &[]);
        let (mounter, loader) = fake_mounter(dir.path());

        assert_eq!(mounter.mount("A").await, MountStatus::NotFound);
        assert!(mounter.is_mounted("A"));
        assert_eq!(loader.loads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unmount_releases_handles() {
        let dir = TempDir::new().unwrap();
        publish(dir.path(), "A", &["one", "two"], &["one", "two"]);
        let (mounter, loader) = fake_mounter(dir.path());

        mounter.mount("A").await;
        assert!(mounter.unmount("A", true));
        assert_eq!(loader.releases.load(Ordering::SeqCst), 2);
        assert!(!mounter.is_mounted("A"));
        assert!(!mounter.unmount("A", true));
        assert_eq!(mounter.mount("A").await, MountStatus::Mounted);
    }

    #[tokio::test]
    async fn unmount_resets_counters() {
        let dir = TempDir::new().unwrap();
        publish(dir.path(), "A", &["one", "gone"], &["one"]);
        let (mounter, _) = fake_mounter(dir.path());

        mounter.mount("A").await;
        let snapshot = mounter.snapshot("A").unwrap();
        assert_eq!((snapshot.mounted, snapshot.missing), (1, 1));
        assert!(mounter.unmount("A", false));
        assert!(mounter.snapshot("A").is_none());
    }

    #[tokio::test]
    async fn load_asset_from_mounted_bundle() {
        let dir = TempDir::new().unwrap();
        publish(dir.path(), "A", &["one"], &["one"]);
        let (mounter, loader) = fake_mounter(dir.path());

        assert!(mounter.load_asset("A", "one", "hero").is_none());
        mounter.mount("A").await;
        assert_eq!(&*mounter.load_asset("A", "one", "hero").unwrap(), b"pixels");
        assert!(mounter.load_asset("A", "one", "villain").is_none());
        assert!(mounter.load_asset("A", "two", "hero").is_none());
        assert_eq!(loader.loaded(), vec!["hero"]);
    }

    #[tokio::test]
    async fn unmount_with_release_evicts_loaded_assets() {
        let dir = TempDir::new().unwrap();
        publish(dir.path(), "A", &["one"], &["one"]);
        let (mounter, loader) = fake_mounter(dir.path());

        mounter.mount("A").await;
        mounter.load_asset("A", "one", "hero").unwrap();
        assert!(mounter.unmount("A", true));
        assert!(loader.loaded().is_empty());
        assert!(mounter.load_asset("A", "one", "hero").is_none());
    }

    #[tokio::test]
    async fn unmount_without_release_keeps_loaded_assets() {
        let dir = TempDir::new().unwrap();
        publish(dir.path(), "A", &["one"], &["one"]);
        let (mounter, loader) = fake_mounter(dir.path());

        mounter.mount("A").await;
        mounter.load_asset("A", "one", "hero").unwrap();
        assert!(mounter.unmount("A", false));
        assert_eq!(loader.releases.load(Ordering::SeqCst), 1);
        assert_eq!(loader.loaded(), vec!["hero"]);
    }

    #[tokio::test]
    async fn detection_is_memoized() {
        let dir = TempDir::new().unwrap();
        publish(dir.path(), "A", &["one"], &["one"]);
        let (mounter, _) = fake_mounter(dir.path());

        assert_eq!(mounter.detected().await.len(), 1);
        publish(dir.path(), "B", &["two"], &["two"]);

        let detected = mounter.detected().await;
        assert_eq!(detected.len(), 1);
        assert!(!detected.contains_key("B"));
        assert_eq!(mounter.mount("B").await, MountStatus::NotFound);
        assert_eq!(detect_addons(dir.path()).await.len(), 2);
    }

    #[tokio::test]
    async fn unmount_during_mount_releases_orphan() {
        let dir = TempDir::new().unwrap();
        publish(dir.path(), "A", &["one", "two"], &["one", "two"]);
        let (mounter, loader) = fake_mounter(dir.path());
        loader.hold.store(true, Ordering::SeqCst);

        let interrupt = async {
            while !mounter
                .snapshot("A")
                .is_some_and(|s| s.bundles[0].status == MountStatus::Loading)
            {
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
            assert!(mounter.unmount("A", true));
            loader.hold.store(false, Ordering::SeqCst);
        };

        let (status, ()) = tokio::join!(mounter.mount("A"), interrupt);
        assert_eq!(status, MountStatus::NotMounted);
        assert_eq!(loader.loads.load(Ordering::SeqCst), 1);
        assert_eq!(loader.releases.load(Ordering::SeqCst), 1);
        assert!(!mounter.is_mounted("A"));
    }

    #[tokio::test]
    async fn events_follow_manifest_order() {
        let dir = TempDir::new().unwrap();
        publish(dir.path(), "A", &["one", "two"], &["one", "two"]);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let (mounter, _) = fake_mounter(dir.path());
        let mounter = mounter.with_events(tx);

        mounter.mount("A").await;
        drop(mounter);

        let mut finished = Vec::new();
        let mut last = None;
        while let Some(event) = rx.recv().await {
            if let MountEvent::BundleFinished { bundle, .. } = &event {
                finished.push(bundle.clone());
            }
            last = Some(event);
        }
        assert_eq!(finished, vec!["one", "two"]);
        assert!(matches!(
            last,
            Some(MountEvent::AddonFinished {
                status: MountStatus::Mounted,
                mounted: 2,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn concurrent_mounts_of_distinct_addons() {
        let dir = TempDir::new().unwrap();
        publish(dir.path(), "A", &["a1"], &["a1"]);
        publish(dir.path(), "B", &["b1"], &["b1"]);
        let (mounter, _) = fake_mounter(dir.path());
        let mounter = Arc::new(mounter);

        let (a, b) = tokio::join!(mounter.mount("A"), mounter.mount("B"));
        assert_eq!(a, MountStatus::Mounted);
        assert_eq!(b, MountStatus::Mounted);
        assert_eq!(mounter.mounted_addons(), vec!["A", "B"]);
        assert_eq!(mounter.unmount_all(false), 2);
    }
}
