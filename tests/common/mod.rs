//! Shared test fixtures: an instrumented in-memory loader.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use asset_preload::cache::{AssetCache, AssetId, ImageHandle, LoadFailure};
use asset_preload::loader::AssetLoader;
use async_trait::async_trait;
use image::DynamicImage;

/// Loader that records every call and the peak number of concurrent loads.
#[derive(Default)]
pub struct MockLoader {
    failing: HashSet<String>,
    panicking: HashSet<String>,
    delay: Duration,
    max_jitter_ms: u64,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    per_id: Mutex<HashMap<String, usize>>,
}

impl MockLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every load takes this long.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Each id gets a fixed pseudo-random extra delay in `0..=max_ms`.
    pub fn with_jitter(mut self, max_ms: u64) -> Self {
        self.max_jitter_ms = max_ms;
        self
    }

    /// Loads of these ids fail.
    pub fn failing<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.failing.extend(ids.into_iter().map(Into::into));
        self
    }

    /// Loads of these ids panic instead of returning.
    pub fn panicking<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.panicking.extend(ids.into_iter().map(Into::into));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn calls_for(&self, id: &str) -> usize {
        self.per_id.lock().unwrap().get(id).copied().unwrap_or(0)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn delay_for(&self, id: &str) -> Duration {
        if self.max_jitter_ms == 0 {
            return self.delay;
        }
        let seed = id
            .bytes()
            .fold(17u64, |acc, b| acc.wrapping_mul(31).wrapping_add(u64::from(b)));
        self.delay + Duration::from_millis(seed % (self.max_jitter_ms + 1))
    }
}

#[async_trait]
impl AssetLoader for MockLoader {
    async fn load(&self, id: &AssetId) -> Result<ImageHandle, LoadFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self
            .per_id
            .lock()
            .unwrap()
            .entry(id.as_str().to_string())
            .or_default() += 1;

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let delay = self.delay_for(id.as_str());
        if delay.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.panicking.contains(id.as_str()) {
            panic!("mock loader panicked on {id}");
        }
        if self.failing.contains(id.as_str()) {
            Err(LoadFailure::other(id.clone(), "mock failure"))
        } else {
            Ok(ImageHandle::new(id.clone(), DynamicImage::new_rgba8(1, 1)))
        }
    }
}

/// `count` identifiers named `img-0.png`, `img-1.png`, ...
pub fn asset_ids(count: usize) -> Vec<AssetId> {
    (0..count)
        .map(|i| AssetId::new(format!("img-{i}.png")))
        .collect()
}

/// A cache backed by `loader`, keeping a typed handle to the loader.
pub fn cache_with(loader: MockLoader) -> (Arc<AssetCache>, Arc<MockLoader>) {
    let loader = Arc::new(loader);
    let cache = Arc::new(AssetCache::new(loader.clone()));
    (cache, loader)
}
