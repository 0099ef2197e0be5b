//! Prefetch scheduler tests against a local upstream.
//!
//! Run with: `cargo test --test prefetch_integration`

mod common;

use tempfile::TempDir;

use tileproxy::app::{AppConfig, TileProxyApp};
use tileproxy::cache::CacheConfig;
use tileproxy::prefetch::{split_provider_list, PrefetchConfig, PrefetchScheduler};
use tileproxy::provider::{ProviderDescriptor, ProviderKind};
use tileproxy::Tile;

use common::spawn_upstream;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_prefetch_to_zoom_two_caches_21_tiles() {
    let upstream = spawn_upstream().await;
    let dir = TempDir::new().unwrap();
    let config = AppConfig::new(vec![ProviderDescriptor::new("local", ProviderKind::Xyz)
        .with_url(format!("{}/tiles", upstream.base_url))])
    .with_cache(CacheConfig::new(dir.path()));
    let app = TileProxyApp::start(config).await.unwrap();
    let service = app.service();

    let report = PrefetchScheduler::new(service.clone(), 16)
        .run(&split_provider_list("local"), 2)
        .await;

    assert_eq!(report.queued, 21);
    assert_eq!(report.fetched, 21);
    assert_eq!(report.failed, 0);
    assert_eq!(upstream.hits(), 21);
    for z in 0..=2u8 {
        for x in 0..(1u32 << z) {
            for y in 0..(1u32 << z) {
                assert!(service.cache().has(&Tile::new("local", z, x, y)).await);
            }
        }
    }

    app.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_prefetch_excludes_blacklisted_and_noprefetch() {
    let upstream = spawn_upstream().await;
    let dir = TempDir::new().unwrap();

    let mut manual = ProviderDescriptor::new("manual", ProviderKind::Xyz)
        .with_url(format!("{}/manual", upstream.base_url));
    manual.prefetchable = false;
    let listed = ProviderDescriptor::new("listed", ProviderKind::Xyz)
        .with_url(format!("{}/listed", upstream.base_url));
    let live = {
        let mut d = ProviderDescriptor::new("live", ProviderKind::Xyz)
            .with_url(format!("{}/live", upstream.base_url));
        d.cacheable = false;
        d
    };

    let config = AppConfig::new(vec![manual, listed, live])
        .with_cache(CacheConfig::new(dir.path()))
        .with_prefetch(PrefetchConfig {
            blacklist: vec!["/listed".to_string()],
            ..PrefetchConfig::default()
        });
    let app = TileProxyApp::start(config).await.unwrap();

    let report = PrefetchScheduler::new(app.service(), 4)
        .run(&split_provider_list("manual; listed, live"), 1)
        .await;

    assert_eq!(report.fetched, 0);
    assert_eq!(report.skipped, 15);
    assert_eq!(upstream.hits(), 0);

    app.shutdown().await;
}
