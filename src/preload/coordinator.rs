//! The startup preload run and its progress feed.

use std::cell::Cell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use futures::future::{BoxFuture, FutureExt, Shared};

use super::state::PreloadState;
use crate::cache::AssetCache;
use crate::manifest::AssetSource;
use crate::pool::{worker_count, DEFAULT_CONCURRENCY};

/// Callback receiving every published snapshot.
pub type Listener = Arc<dyn Fn(PreloadState) + Send + Sync>;

/// Future for the one preload run, resolving to the final snapshot.
///
/// Clones share the same run; awaiting any of them never restarts it.
pub type PreloadRun = Shared<BoxFuture<'static, PreloadState>>;

/// Configuration for the preload run.
#[derive(Debug, Clone)]
pub struct PreloadConfig {
    /// Maximum number of concurrent loads.
    pub concurrency: usize,
}

impl Default for PreloadConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

impl PreloadConfig {
    /// Set the maximum number of concurrent loads (at least one).
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }
}

thread_local! {
    // Address of the coordinator whose listeners this thread is notifying.
    static NOTIFYING: Cell<usize> = const { Cell::new(0) };
}

/// Call `listener` with `snapshot`, recording that `owner` is notifying.
fn notify(owner: usize, listener: &Listener, snapshot: PreloadState) {
    struct Restore(usize);

    impl Drop for Restore {
        fn drop(&mut self) {
            NOTIFYING.with(|current| current.set(self.0));
        }
    }

    let _restore = Restore(NOTIFYING.with(|current| current.replace(owner)));
    listener(snapshot);
}

/// Panic rather than deadlock when a listener re-enters its coordinator.
fn assert_not_notifying(owner: usize, operation: &str) {
    assert!(
        NOTIFYING.with(Cell::get) != owner,
        "PreloadCoordinator::{operation} called from inside a listener"
    );
}

#[derive(Default)]
struct Observed {
    state: PreloadState,
    listeners: Vec<(u64, Listener)>,
    next_id: u64,
}

struct Inner {
    cache: Arc<AssetCache>,
    source: Arc<dyn AssetSource>,
    config: PreloadConfig,
    observed: Mutex<Observed>,
    // Held while notifying so every listener sees snapshots in publish order.
    emit: Mutex<()>,
    run: Mutex<Option<PreloadRun>>,
}

impl Inner {
    fn snapshot(&self) -> PreloadState {
        self.observed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .state
    }

    fn publish(&self, update: impl FnOnce(&mut PreloadState)) {
        let _emit = self.emit.lock().unwrap_or_else(PoisonError::into_inner);

        let (snapshot, listeners) = {
            let mut observed = self
                .observed
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            update(&mut observed.state);
            let listeners: Vec<Listener> = observed
                .listeners
                .iter()
                .map(|(_, listener)| Arc::clone(listener))
                .collect();
            (observed.state, listeners)
        };

        let owner = self.address();
        for listener in &listeners {
            notify(owner, listener, snapshot);
        }
    }

    fn address(&self) -> usize {
        std::ptr::from_ref(self) as usize
    }

    fn remove_listener(&self, id: u64) {
        self.observed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .listeners
            .retain(|(listener_id, _)| *listener_id != id);
    }

    async fn run(self: Arc<Self>) -> PreloadState {
        let source = Arc::clone(&self.source);
        let ids = match tokio::task::spawn_blocking(move || source.discover()).await {
            Ok(Ok(ids)) => ids,
            Ok(Err(e)) => {
                log::warn!("Asset discovery failed, nothing to preload: {}", e);
                Vec::new()
            }
            Err(e) => {
                log::warn!("Asset discovery task failed, nothing to preload: {}", e);
                Vec::new()
            }
        };

        let total = ids.len();
        self.publish(|state| state.total = total);
        log::info!(
            "Preloading {} images with {} workers",
            total,
            worker_count(self.config.concurrency, total)
        );

        let this = &*self;
        self.cache
            .bulk_preload_static_with(&ids, self.config.concurrency, |_, loaded| {
                this.publish(|state| {
                    if loaded {
                        state.loaded += 1;
                    } else {
                        state.failed += 1;
                    }
                });
            })
            .await;

        self.publish(|state| state.done = true);

        let finished = self.snapshot();
        log::info!(
            "Preload complete: {} loaded, {} failed of {}",
            finished.loaded,
            finished.failed,
            finished.total
        );
        finished
    }
}

/// Drives the one-time bulk preload and publishes its progress.
///
/// Construct one coordinator per process at startup and hand clones to
/// whoever needs it; clones share the same state and the same run.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use asset_preload::cache::AssetCache;
/// use asset_preload::loader::FsImageLoader;
/// use asset_preload::manifest::ListSource;
/// use asset_preload::preload::{PreloadConfig, PreloadCoordinator};
///
/// # async fn demo() {
/// let cache = Arc::new(AssetCache::new(Arc::new(FsImageLoader::new("images"))));
/// let source = Arc::new(ListSource::new(["hero.png", "team.png"]));
/// let coordinator = PreloadCoordinator::new(cache, source, PreloadConfig::default());
///
/// let subscription = coordinator.subscribe(|state| {
///     println!("{}/{} attempted", state.loaded + state.failed, state.total);
/// });
/// let finished = coordinator.start().await;
/// assert!(finished.done);
/// subscription.unsubscribe();
/// # }
/// ```
#[derive(Clone)]
pub struct PreloadCoordinator {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for PreloadCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreloadCoordinator")
            .field("config", &self.inner.config)
            .field("state", &self.state())
            .finish()
    }
}

impl PreloadCoordinator {
    /// Create an idle coordinator that preloads `source` into `cache`.
    #[must_use]
    pub fn new(
        cache: Arc<AssetCache>,
        source: Arc<dyn AssetSource>,
        config: PreloadConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                cache,
                source,
                config,
                observed: Mutex::new(Observed::default()),
                emit: Mutex::new(()),
                run: Mutex::new(None),
            }),
        }
    }

    /// Start the preload run, or return the run already started.
    ///
    /// The first call marks the state started, publishes it, and spawns the
    /// run: enumerate, publish the total, load every asset through the cache
    /// with bounded concurrency, then publish `done`. Every later call, before
    /// or after completion, returns a clone of the same future.
    ///
    /// # Panics
    ///
    /// The first call panics if made outside a Tokio runtime. Any call
    /// panics if made from inside one of this coordinator's listeners.
    pub fn start(&self) -> PreloadRun {
        assert_not_notifying(self.inner.address(), "start");
        let mut run = self
            .inner
            .run
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = run.as_ref() {
            return existing.clone();
        }

        self.inner.publish(|state| state.started = true);

        let handle = tokio::spawn(Arc::clone(&self.inner).run());
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let future = async move {
            match handle.await {
                Ok(state) => state,
                Err(e) => {
                    log::error!("Preload run aborted: {}", e);
                    weak.upgrade().map(|inner| inner.snapshot()).unwrap_or_default()
                }
            }
        }
        .boxed()
        .shared();

        *run = Some(future.clone());
        future
    }

    /// Register `listener` for every future publication.
    ///
    /// The listener is called immediately with the current snapshot, then
    /// with each later snapshot in publish order. Listeners run on whichever
    /// task published and may call [`Subscription::unsubscribe`], but not
    /// [`subscribe`](Self::subscribe) or [`start`](Self::start).
    ///
    /// Dropping the returned [`Subscription`] keeps the listener registered
    /// for the life of the coordinator.
    ///
    /// # Panics
    ///
    /// Panics if called from inside one of this coordinator's listeners.
    #[must_use = "the listener stays registered until `unsubscribe` is called"]
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(PreloadState) + Send + Sync + 'static,
    {
        let owner = self.inner.address();
        assert_not_notifying(owner, "subscribe");

        let listener: Listener = Arc::new(listener);
        let _emit = self
            .inner
            .emit
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let (id, snapshot) = {
            let mut observed = self
                .inner
                .observed
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            let id = observed.next_id;
            observed.next_id += 1;
            observed.listeners.push((id, Arc::clone(&listener)));
            (id, observed.state)
        };

        notify(owner, &listener, snapshot);

        Subscription {
            inner: Arc::downgrade(&self.inner),
            id,
            active: AtomicBool::new(true),
        }
    }

    /// Current snapshot, independent of any subscription.
    #[must_use]
    pub fn state(&self) -> PreloadState {
        self.inner.snapshot()
    }

    /// Whether every asset has been attempted.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.state().done
    }

    /// Number of registered listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.inner
            .observed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .listeners
            .len()
    }

    /// The cache this coordinator fills.
    #[must_use]
    pub fn cache(&self) -> &Arc<AssetCache> {
        &self.inner.cache
    }

    #[must_use]
    pub fn config(&self) -> &PreloadConfig {
        &self.inner.config
    }
}

/// Registration handle returned by [`PreloadCoordinator::subscribe`].
///
/// Dropping the handle does not unsubscribe.
#[derive(Debug)]
pub struct Subscription {
    inner: Weak<Inner>,
    id: u64,
    active: AtomicBool,
}

impl Subscription {
    /// Stop receiving publications. Calling this again is a no-op.
    pub fn unsubscribe(&self) {
        if !self.active.swap(false, Ordering::SeqCst) {
            return;
        }
        if let Some(inner) = self.inner.upgrade() {
            inner.remove_listener(self.id);
        }
    }

    /// Whether this subscription is still registered.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}
