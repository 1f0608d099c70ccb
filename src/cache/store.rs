//! In-memory image cache with static and dynamic partitions.

use std::collections::{HashMap, HashSet};
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use futures::future::{try_join_all, FutureExt};
use tokio::sync::OnceCell;

use super::entry::{AssetId, CacheStats, ImageHandle, Partition};
use super::error::{FailureReason, LoadFailure};
use crate::loader::AssetLoader;
use crate::pool::run_bounded;

type EntryMap = RwLock<HashMap<AssetId, ImageHandle>>;

/// Memoizes loaded images so repeated requests never re-fetch.
///
/// One cache is created per process and shared behind an `Arc`. Entries are
/// never evicted individually: the static partition lives for the whole
/// process, the dynamic partition can only be emptied in bulk with
/// [`AssetCache::clear_dynamic`].
pub struct AssetCache {
    loader: Arc<dyn AssetLoader>,
    static_entries: EntryMap,
    dynamic_entries: EntryMap,
    static_loaded: AtomicBool,
    // Ids that failed during the one-time static preload.
    static_preload: OnceCell<HashSet<AssetId>>,
}

impl std::fmt::Debug for AssetCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetCache")
            .field("loader", &"<loader>")
            .field("stats", &self.stats())
            .finish()
    }
}

impl AssetCache {
    /// Create an empty cache that loads misses through `loader`.
    #[must_use]
    pub fn new(loader: Arc<dyn AssetLoader>) -> Self {
        Self {
            loader,
            static_entries: RwLock::new(HashMap::new()),
            dynamic_entries: RwLock::new(HashMap::new()),
            static_loaded: AtomicBool::new(false),
            static_preload: OnceCell::new(),
        }
    }

    /// Return the cached handle for `id`, loading it into the dynamic
    /// partition on a miss.
    ///
    /// A hit in either partition resolves without calling the loader.
    /// Failures are returned to the caller and nothing is cached for them,
    /// so a later call tries again.
    ///
    /// # Errors
    ///
    /// Returns [`LoadFailure`] if `id` is empty or the loader fails.
    pub async fn ensure_loaded(&self, id: &AssetId) -> Result<ImageHandle, LoadFailure> {
        self.ensure_in(id, Partition::Dynamic).await
    }

    /// Same contract as [`ensure_loaded`](Self::ensure_loaded), but a fresh
    /// load is stored in the static partition.
    ///
    /// This is the per-asset step of the startup preload. An id already held
    /// by the dynamic partition is returned as-is rather than loaded twice.
    ///
    /// # Errors
    ///
    /// Returns [`LoadFailure`] if `id` is empty or the loader fails.
    pub async fn ensure_static(&self, id: &AssetId) -> Result<ImageHandle, LoadFailure> {
        self.ensure_in(id, Partition::Static).await
    }

    async fn ensure_in(
        &self,
        id: &AssetId,
        partition: Partition,
    ) -> Result<ImageHandle, LoadFailure> {
        if id.is_empty() {
            return Err(LoadFailure::new(id.clone(), FailureReason::EmptyIdentifier));
        }

        if let Some(handle) = self.get_if_present(id) {
            log::trace!("Cache hit: {}", id);
            return Ok(handle);
        }

        log::trace!("Cache miss: {} (loading into {} partition)", id, partition);
        match self.loader.load(id).await {
            Ok(handle) => Ok(self.insert(partition, id.clone(), handle)),
            Err(e) => {
                log::warn!("{}", e);
                Err(e)
            }
        }
    }

    /// Store `handle` unless the partition already holds `id`, returning the
    /// handle that ends up cached.
    fn insert(&self, partition: Partition, id: AssetId, handle: ImageHandle) -> ImageHandle {
        let mut map = self
            .partition(partition)
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        map.entry(id).or_insert(handle).clone()
    }

    fn partition(&self, partition: Partition) -> &EntryMap {
        match partition {
            Partition::Static => &self.static_entries,
            Partition::Dynamic => &self.dynamic_entries,
        }
    }

    fn lookup(&self, partition: Partition, id: &str) -> Option<ImageHandle> {
        self.partition(partition)
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    /// Synchronous lookup: static partition first, then dynamic.
    #[must_use]
    pub fn get_if_present<Q: AsRef<str> + ?Sized>(&self, id: &Q) -> Option<ImageHandle> {
        let id = id.as_ref();
        self.lookup(Partition::Static, id)
            .or_else(|| self.lookup(Partition::Dynamic, id))
    }

    /// Whether either partition holds `id`.
    #[must_use]
    pub fn is_cached<Q: AsRef<str> + ?Sized>(&self, id: &Q) -> bool {
        self.get_if_present(id).is_some()
    }

    /// Which partition holds `id`, if any.
    #[must_use]
    pub fn partition_of<Q: AsRef<str> + ?Sized>(&self, id: &Q) -> Option<Partition> {
        let id = id.as_ref();
        if self.lookup(Partition::Static, id).is_some() {
            Some(Partition::Static)
        } else if self.lookup(Partition::Dynamic, id).is_some() {
            Some(Partition::Dynamic)
        } else {
            None
        }
    }

    /// Eagerly load every build-known asset into the static partition.
    ///
    /// At most `width` loads run at once. Individual failures are logged and
    /// skipped. Once completed (here or by a preload run) further calls
    /// return immediately; a call made while a preload run or another bulk
    /// preload is in flight waits for it instead of loading again.
    pub async fn bulk_preload_static(&self, ids: &[AssetId], width: usize) {
        if self.is_static_loaded() {
            return;
        }
        self.bulk_preload_static_with(ids, width, |_, _| {}).await;
    }

    /// [`bulk_preload_static`](Self::bulk_preload_static), reporting every
    /// asset of `ids` to `on_settled` with whether it ended up cached.
    ///
    /// The static preload runs once per cache. If another caller already
    /// started it, this waits for that run, then settles `ids` against its
    /// outcome: cached ids count as loaded, ids that failed there count as
    /// failed without being loaded again, and ids the other run did not
    /// cover are loaded now.
    pub async fn bulk_preload_static_with<F>(&self, ids: &[AssetId], width: usize, on_settled: F)
    where
        F: Fn(&AssetId, bool) + Sync,
    {
        let initialized_here = AtomicBool::new(false);

        let failed = self
            .static_preload
            .get_or_init(|| async {
                initialized_here.store(true, Ordering::SeqCst);
                let failed = Mutex::new(HashSet::new());

                run_bounded(ids, width, |id| {
                    let (failed, on_settled) = (&failed, &on_settled);
                    async move {
                        let loaded = self.settle_static(&id).await;
                        if !loaded {
                            failed
                                .lock()
                                .unwrap_or_else(PoisonError::into_inner)
                                .insert(id.clone());
                        }
                        on_settled(&id, loaded);
                    }
                })
                .await;

                let failed = failed.into_inner().unwrap_or_else(PoisonError::into_inner);
                self.mark_static_loaded();
                log::info!(
                    "Preloaded {} static images ({} failed)",
                    ids.len().saturating_sub(failed.len()),
                    failed.len()
                );
                failed
            })
            .await;

        if initialized_here.load(Ordering::SeqCst) {
            return;
        }

        run_bounded(ids, width, |id| {
            let on_settled = &on_settled;
            async move {
                let loaded = if self.is_cached(&id) {
                    true
                } else if failed.contains(&id) {
                    false
                } else {
                    self.settle_static(&id).await
                };
                on_settled(&id, loaded);
            }
        })
        .await;
    }

    /// Load `id` into the static partition, reporting success.
    ///
    /// A loader that panics counts as a failed load.
    async fn settle_static(&self, id: &AssetId) -> bool {
        match AssertUnwindSafe(self.ensure_static(id)).catch_unwind().await {
            Ok(result) => result.is_ok(),
            Err(_) => {
                log::error!("Loader panicked while loading {}", id);
                false
            }
        }
    }

    /// Record that the one-time static preload has completed.
    pub fn mark_static_loaded(&self) {
        self.static_loaded.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_static_loaded(&self) -> bool {
        self.static_loaded.load(Ordering::SeqCst)
    }

    /// Load several assets at once, skipping empty and repeated ids.
    ///
    /// Handles are returned in first-occurrence order.
    ///
    /// # Errors
    ///
    /// Fails with the first [`LoadFailure`] if any asset cannot be loaded.
    pub async fn preload_batch<I>(&self, ids: I) -> Result<Vec<ImageHandle>, LoadFailure>
    where
        I: IntoIterator<Item = AssetId>,
    {
        let mut seen = HashSet::new();
        let unique: Vec<AssetId> = ids
            .into_iter()
            .filter(|id| !id.is_empty() && seen.insert(id.clone()))
            .collect();

        try_join_all(unique.iter().map(|id| self.ensure_loaded(id))).await
    }

    /// Drop every dynamic entry. The static partition is untouched.
    ///
    /// Loads that already passed their cache check still store their result
    /// when they finish.
    pub fn clear_dynamic(&self) {
        let mut map = self
            .dynamic_entries
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let dropped = map.len();
        map.clear();
        log::info!("Dynamic image cache cleared ({} entries)", dropped);
    }

    /// Snapshot of entry counts and decoded memory.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let static_entries = self
            .static_entries
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let dynamic_entries = self
            .dynamic_entries
            .read()
            .unwrap_or_else(PoisonError::into_inner);

        let decoded_bytes = static_entries
            .values()
            .chain(dynamic_entries.values())
            .map(ImageHandle::decoded_bytes)
            .sum();

        CacheStats {
            static_entries: static_entries.len(),
            dynamic_entries: dynamic_entries.len(),
            static_loaded: self.is_static_loaded(),
            total_entries: static_entries.len() + dynamic_entries.len(),
            decoded_bytes,
        }
    }
}
