mod common;

use std::sync::Arc;
use std::time::Duration;

use asset_preload::cache::{AssetId, FailureReason, Partition};
use asset_preload::manifest::ListSource;
use asset_preload::preload::{PreloadConfig, PreloadCoordinator};
use common::{asset_ids, cache_with, MockLoader};

#[tokio::test]
async fn test_ensure_loaded_caches_in_dynamic_partition() {
    let (cache, loader) = cache_with(MockLoader::new());
    let id = AssetId::from("/assets/images/hero.png");

    assert!(cache.get_if_present(&id).is_none());

    let first = cache.ensure_loaded(&id).await.unwrap();
    assert_eq!(loader.calls(), 1);
    assert_eq!(cache.partition_of(&id), Some(Partition::Dynamic));

    // Synchronous hit, then an async hit that does not touch the loader
    let hit = cache.get_if_present(&id).unwrap();
    assert!(hit.ptr_eq(&first));

    let second = cache.ensure_loaded(&id).await.unwrap();
    assert!(second.ptr_eq(&first));
    assert_eq!(loader.calls(), 1);
}

#[tokio::test]
async fn test_lookup_accepts_str() {
    let (cache, _) = cache_with(MockLoader::new());
    cache.ensure_loaded(&"a.png".into()).await.unwrap();
    assert!(cache.is_cached("a.png"));
    assert!(!cache.is_cached("./a.png"));
}

#[tokio::test]
async fn test_failure_is_not_cached_or_retried() {
    let (cache, loader) = cache_with(MockLoader::new().failing(["broken.png"]));
    let id = AssetId::from("broken.png");

    let err = cache.ensure_loaded(&id).await.unwrap_err();
    assert_eq!(err.id, id);
    assert_eq!(loader.calls_for("broken.png"), 1);
    assert!(!cache.is_cached(&id));

    // A second request tries again; nothing negative was remembered
    assert!(cache.ensure_loaded(&id).await.is_err());
    assert_eq!(loader.calls_for("broken.png"), 2);
}

#[tokio::test]
async fn test_empty_identifier_rejected_without_loading() {
    let (cache, loader) = cache_with(MockLoader::new());
    let err = cache.ensure_loaded(&AssetId::from("")).await.unwrap_err();
    assert_eq!(err.reason, FailureReason::EmptyIdentifier);
    assert_eq!(loader.calls(), 0);
}

#[tokio::test]
async fn test_bulk_preload_static_is_idempotent() {
    let (cache, loader) = cache_with(MockLoader::new());
    let ids = asset_ids(6);

    cache.bulk_preload_static(&ids, 16).await;
    assert!(cache.is_static_loaded());
    assert_eq!(loader.calls(), 6);
    for id in &ids {
        assert_eq!(cache.partition_of(id), Some(Partition::Static));
    }

    cache.bulk_preload_static(&ids, 16).await;
    assert_eq!(loader.calls(), 6);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_bulk_preload_runs_once() {
    let (cache, loader) = cache_with(MockLoader::new().with_delay(Duration::from_millis(5)));
    let ids = asset_ids(8);

    tokio::join!(
        cache.bulk_preload_static(&ids, 4),
        cache.bulk_preload_static(&ids, 4)
    );

    assert_eq!(loader.calls(), 8);
    assert_eq!(cache.stats().static_entries, 8);
}

#[tokio::test]
async fn test_bulk_preload_tolerates_failures() {
    let (cache, _) = cache_with(MockLoader::new().failing(["img-1.png"]));
    let ids = asset_ids(3);

    cache.bulk_preload_static(&ids, 2).await;

    assert!(cache.is_static_loaded());
    assert!(cache.is_cached("img-0.png"));
    assert!(!cache.is_cached("img-1.png"));
    assert!(cache.is_cached("img-2.png"));
}

#[tokio::test]
async fn test_ensure_static_does_not_reload_dynamic_entry() {
    let (cache, loader) = cache_with(MockLoader::new());
    let id = AssetId::from("shared.png");

    cache.ensure_loaded(&id).await.unwrap();
    cache.ensure_static(&id).await.unwrap();

    assert_eq!(loader.calls(), 1);
    assert_eq!(cache.partition_of(&id), Some(Partition::Dynamic));
}

#[tokio::test]
async fn test_clear_dynamic_keeps_static() {
    let (cache, _) = cache_with(MockLoader::new());
    cache.bulk_preload_static(&asset_ids(2), 4).await;
    cache.ensure_loaded(&"runtime.png".into()).await.unwrap();

    let before = cache.stats();
    assert_eq!(before.static_entries, 2);
    assert_eq!(before.dynamic_entries, 1);

    cache.clear_dynamic();

    let after = cache.stats();
    assert_eq!(after.static_entries, 2);
    assert_eq!(after.dynamic_entries, 0);
    assert!(cache.is_cached("img-0.png"));
    assert!(!cache.is_cached("runtime.png"));
}

#[tokio::test]
async fn test_clear_dynamic_does_not_cancel_in_flight_load() {
    let (cache, _) = cache_with(MockLoader::new().with_delay(Duration::from_millis(50)));
    let id = AssetId::from("slow.png");

    let pending = {
        let cache = Arc::clone(&cache);
        let id = id.clone();
        tokio::spawn(async move { cache.ensure_loaded(&id).await })
    };

    tokio::time::sleep(Duration::from_millis(10)).await;
    cache.clear_dynamic();

    pending.await.unwrap().unwrap();
    assert!(cache.is_cached(&id));
}

#[tokio::test]
async fn test_preload_batch_dedups_and_skips_empty() {
    let (cache, loader) = cache_with(MockLoader::new());
    let ids = ["a.png", "a.png", "", "b.png"].map(AssetId::from);

    let handles = cache.preload_batch(ids).await.unwrap();

    assert_eq!(handles.len(), 2);
    assert_eq!(handles[0].source().as_str(), "a.png");
    assert_eq!(handles[1].source().as_str(), "b.png");
    assert_eq!(loader.calls(), 2);
}

#[tokio::test]
async fn test_preload_batch_fails_on_any_failure() {
    let (cache, _) = cache_with(MockLoader::new().failing(["bad.png"]));
    let err = cache
        .preload_batch(["ok.png", "bad.png"].map(AssetId::from))
        .await
        .unwrap_err();
    assert_eq!(err.id.as_str(), "bad.png");
}

#[tokio::test]
async fn test_stats_count_decoded_bytes() {
    let (cache, _) = cache_with(MockLoader::new());
    cache.bulk_preload_static(&asset_ids(2), 2).await;
    cache.ensure_loaded(&"x.png".into()).await.unwrap();

    let stats = cache.stats();
    assert_eq!(stats.total_entries, 3);
    // MockLoader decodes to 1x1 RGBA
    assert_eq!(stats.decoded_bytes, 12);
    assert!(stats.static_loaded);
}

#[tokio::test]
async fn test_bulk_preload_tolerates_panicking_loader() {
    let (cache, loader) = cache_with(MockLoader::new().panicking(["img-2.png"]));
    let ids = asset_ids(4);

    cache.bulk_preload_static(&ids, 2).await;

    assert!(cache.is_static_loaded());
    assert_eq!(loader.calls(), 4);
    assert_eq!(cache.stats().static_entries, 3);
    assert!(!cache.is_cached("img-2.png"));
}

#[tokio::test]
async fn test_bulk_preload_waits_for_running_preload() {
    let (cache, loader) = cache_with(MockLoader::new().with_delay(Duration::from_millis(20)));
    let ids = asset_ids(6);
    let coordinator = PreloadCoordinator::new(
        Arc::clone(&cache),
        Arc::new(ListSource::new(ids.clone())),
        PreloadConfig::default().with_concurrency(2),
    );

    let run = coordinator.start();
    tokio::time::sleep(Duration::from_millis(5)).await;
    cache.bulk_preload_static(&ids, 16).await;

    assert_eq!(loader.calls(), 6);
    assert_eq!(cache.stats().static_entries, 6);

    let state = run.await;
    assert_eq!(state.loaded, 6);
    assert_eq!(loader.calls(), 6);
}

#[tokio::test]
async fn test_preload_after_bulk_reuses_outcome() {
    let (cache, loader) = cache_with(MockLoader::new().failing(["img-1.png"]));
    let ids = asset_ids(3);
    cache.bulk_preload_static(&ids, 4).await;
    assert_eq!(loader.calls(), 3);

    let coordinator = PreloadCoordinator::new(
        Arc::clone(&cache),
        Arc::new(ListSource::new(ids)),
        PreloadConfig::default(),
    );
    let state = coordinator.start().await;

    assert!(state.done);
    assert_eq!(state.loaded, 2);
    assert_eq!(state.failed, 1);
    // Neither the cached assets nor the failed one were loaded again
    assert_eq!(loader.calls(), 3);
}

#[tokio::test]
async fn test_static_preload_settles_uncovered_ids() {
    let (cache, loader) = cache_with(MockLoader::new());
    cache.bulk_preload_static(&asset_ids(2), 4).await;

    let extra = AssetId::from("late.png");
    let mut ids = asset_ids(2);
    ids.push(extra.clone());

    let settled = std::sync::Mutex::new(Vec::new());
    cache
        .bulk_preload_static_with(&ids, 4, |id, loaded| {
            settled.lock().unwrap().push((id.clone(), loaded));
        })
        .await;

    let mut settled = settled.into_inner().unwrap();
    settled.sort();
    assert_eq!(settled.len(), 3);
    assert!(settled.iter().all(|(_, loaded)| *loaded));
    assert_eq!(cache.partition_of(&extra), Some(Partition::Static));
    assert_eq!(loader.calls(), 3);
}
