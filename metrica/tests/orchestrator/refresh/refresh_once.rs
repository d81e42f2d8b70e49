use std::sync::Arc;
use std::time::Duration;

use metrica::{CacheInfo, CacheKey, Clock, FreshnessConfig, Metrica, MetricaError};
use metrica_mock::MockBehavior;

use crate::helpers::{
    GLOBEX, clock, daily_january, dt, immediate, january, key, metrica, scripted,
};

async fn refresh_requests(ctl: &metrica_mock::ScriptController) -> usize {
    ctl.immediate_requests(&key(GLOBEX))
        .await
        .iter()
        .filter(|r| r.force_refresh)
        .count()
}

#[tokio::test(start_paused = true)]
async fn stale_entry_is_refreshed_once_per_detection() {
    let (backend, ctl) = scripted();
    let clock = clock();
    ctl.set_snapshot_behavior(key(GLOBEX), MockBehavior::Return(immediate(daily_january())))
        .await;
    let metrica = metrica(backend, &clock);
    metrica.prime(GLOBEX, january()).await.unwrap();
    clock.advance(chrono::Duration::hours(5));
    ctl.set_snapshot_behavior(
        key(GLOBEX),
        MockBehavior::Fail(MetricaError::network("scripted", "connection reset")),
    )
    .await;

    for _ in 0..5 {
        metrica.load(GLOBEX, january()).await.unwrap();
        metrica.check_freshness();
    }
    metrica.join_refreshes().await;
    assert_eq!(refresh_requests(&ctl).await, 1);

    // Still inside the cooldown window: no further attempt.
    clock.advance(chrono::Duration::hours(1));
    assert!(metrica.check_freshness().is_empty());
    metrica.join_refreshes().await;
    assert_eq!(refresh_requests(&ctl).await, 1);

    // Cooldown elapsed: exactly one more attempt.
    clock.advance(chrono::Duration::hours(4));
    assert_eq!(metrica.check_freshness().len(), 1);
    assert!(metrica.check_freshness().is_empty());
    metrica.join_refreshes().await;
    assert_eq!(refresh_requests(&ctl).await, 2);
}

#[tokio::test(start_paused = true)]
async fn fresh_entry_is_not_refreshed() {
    let (backend, ctl) = scripted();
    ctl.set_snapshot_behavior(key(GLOBEX), MockBehavior::Return(immediate(daily_january())))
        .await;
    let metrica = metrica(backend, &clock());
    metrica.prime(GLOBEX, january()).await.unwrap();
    metrica.load(GLOBEX, january()).await.unwrap();

    assert!(metrica.check_freshness().is_empty());
    metrica.join_refreshes().await;
    assert_eq!(refresh_requests(&ctl).await, 0);
}

#[tokio::test(start_paused = true)]
async fn sweep_refreshes_selected_resource_periodically() {
    let (backend, ctl) = scripted();
    let clock = clock();
    ctl.set_snapshot_behavior(key(GLOBEX), MockBehavior::Return(immediate(daily_january())))
        .await;
    let metrica = Metrica::builder()
        .with_backend(backend)
        .freshness(FreshnessConfig {
            max_age: Duration::from_secs(3600),
            retry_cooldown: Duration::from_secs(3600),
            check_interval: Some(Duration::from_secs(60)),
        })
        .clock(Arc::new(clock.clone()))
        .build()
        .unwrap();
    metrica.prime(GLOBEX, january()).await.unwrap();
    metrica.load(GLOBEX, january()).await.unwrap();
    metrica.start_freshness_sweep().unwrap();

    tokio::time::sleep(Duration::from_secs(61)).await;
    metrica.join_refreshes().await;
    assert_eq!(refresh_requests(&ctl).await, 0);

    clock.advance(chrono::Duration::hours(2));
    tokio::time::sleep(Duration::from_secs(60)).await;
    metrica.join_refreshes().await;
    assert_eq!(refresh_requests(&ctl).await, 1);

    let entry = metrica
        .cache()
        .get_exact(&CacheKey {
            resource: key(GLOBEX),
            range: january(),
        })
        .unwrap();
    assert_eq!(entry.fetched_at, clock.now());
    metrica.shutdown();
}

#[tokio::test]
async fn sweep_requires_an_interval() {
    let (backend, _ctl) = scripted();
    let metrica = metrica(backend, &clock());
    assert!(matches!(
        metrica.start_freshness_sweep(),
        Err(MetricaError::InvalidArg(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn server_timestamp_ages_a_primed_entry() {
    let (backend, ctl) = scripted();
    let mut old = immediate(daily_january());
    old.cache_info = Some(CacheInfo {
        source: Some("cache".into()),
        cached_at: Some("2024-02-01T06:00:00".into()),
        ttl_hours: Some(4.0),
    });
    ctl.set_snapshot_behavior(key(GLOBEX), MockBehavior::Return(old))
        .await;
    let metrica = metrica(backend, &clock());

    let primed = metrica.prime(GLOBEX, january()).await.unwrap();
    assert_eq!(primed.fetched_at, dt(2024, 2, 1, 6));

    ctl.set_snapshot_behavior(key(GLOBEX), MockBehavior::Return(immediate(daily_january())))
        .await;
    metrica.load(GLOBEX, january()).await.unwrap();
    metrica.join_refreshes().await;

    assert_eq!(refresh_requests(&ctl).await, 1);
    let entry = metrica
        .cache()
        .get_exact(&CacheKey {
            resource: key(GLOBEX),
            range: january(),
        })
        .unwrap();
    assert_eq!(entry.fetched_at, dt(2024, 2, 1, 12));
    assert!(!metrica.snapshot().used_fallback);
}
