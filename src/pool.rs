//! Fixed-width worker pool for asset loads.
//!
//! A small number of workers pull the next unclaimed identifier from a shared
//! atomic cursor until the list is drained. At most `width` loads are ever in
//! flight, and completions arrive in whatever order their I/O settles.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures::future::join_all;

use crate::cache::AssetId;

/// Default number of concurrent loads.
pub const DEFAULT_CONCURRENCY: usize = 16;

/// Number of workers to spawn for `len` items at the requested width.
///
/// A width of zero is treated as one. Never exceeds `len`.
#[must_use]
pub fn worker_count(width: usize, len: usize) -> usize {
    width.max(1).min(len)
}

/// Run `f` once for every id with at most `width` calls pending at a time.
///
/// Returns when every id has been attempted. With an empty list no worker is
/// started and `f` is never called.
pub async fn run_bounded<F, Fut>(ids: &[AssetId], width: usize, f: F)
where
    F: Fn(AssetId) -> Fut,
    Fut: Future<Output = ()>,
{
    let workers = worker_count(width, ids.len());
    if workers == 0 {
        return;
    }

    log::trace!("Dispatching {} assets to {} workers", ids.len(), workers);

    let cursor = AtomicUsize::new(0);
    join_all((0..workers).map(|_| drain(ids, &cursor, &f))).await;
}

async fn drain<F, Fut>(ids: &[AssetId], cursor: &AtomicUsize, f: &F)
where
    F: Fn(AssetId) -> Fut,
    Fut: Future<Output = ()>,
{
    while let Some(id) = ids.get(cursor.fetch_add(1, Ordering::Relaxed)) {
        f(id.clone()).await;
    }
}
