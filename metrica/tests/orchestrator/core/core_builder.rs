use std::sync::Arc;
use std::time::Duration;

use metrica::{CacheKey, Metrica, MetricaError, PollConfig, RetryConfig};
use metrica_mock::MockBackend;
use serde_json::json;

use crate::helpers::{ACME, clock, january, key, metrica, scripted};

#[test]
fn build_requires_a_backend() {
    let err = Metrica::builder().build().unwrap_err();
    assert!(matches!(err, MetricaError::InvalidArg(_)));
}

#[test]
fn build_rejects_zero_poll_interval_and_attempts() {
    let backend = Arc::new(MockBackend::new());
    let err = Metrica::builder()
        .with_backend(backend.clone())
        .poll(PollConfig {
            interval: Duration::ZERO,
            max_wait: None,
        })
        .build()
        .unwrap_err();
    assert!(matches!(err, MetricaError::InvalidArg(_)));

    let err = Metrica::builder()
        .with_backend(backend)
        .retry(RetryConfig {
            max_attempts: 0,
            delay: Duration::from_secs(1),
        })
        .build()
        .unwrap_err();
    assert!(matches!(err, MetricaError::InvalidArg(_)));
}

#[tokio::test]
async fn invalid_keys_fail_before_any_submission() {
    let (backend, ctl) = scripted();
    let metrica = metrica(backend, &clock());

    for bad in ["", "   ", "all", "acme store", "acme/store"] {
        let err = metrica.load(bad, january()).await.unwrap_err();
        assert!(
            matches!(err, MetricaError::InvalidResourceKey { .. }),
            "{bad:?} gave {err:?}"
        );
    }
    assert!(ctl.created_jobs().await.is_empty());
    let snap = metrica.snapshot();
    assert!(snap.selection.is_none());
    assert_eq!(snap.generation, 0);
}

#[tokio::test]
async fn reload_without_selection_is_rejected() {
    let (backend, _ctl) = scripted();
    let metrica = metrica(backend, &clock());
    assert!(matches!(
        metrica.reload().await,
        Err(MetricaError::InvalidArg(_))
    ));
}

#[tokio::test]
async fn preferences_round_trip_through_the_store() {
    let (backend, _ctl) = scripted();
    let metrica = metrica(backend, &clock());

    assert_eq!(metrica.load_preferences("campaigns").await.unwrap(), None);
    let prefs = json!({"hidden": ["cpv"], "order": ["cost", "roas"]});
    metrica
        .save_preferences("campaigns", prefs.clone())
        .await
        .unwrap();
    assert_eq!(
        metrica.load_preferences("campaigns").await.unwrap(),
        Some(prefs)
    );
    assert!(metrica.save_preferences(" ", json!({})).await.is_err());
}

#[tokio::test]
async fn prime_without_immediate_path_is_unsupported() {
    let (backend, _ctl) = scripted();
    let metrica = metrica(backend, &clock());

    let err = metrica.prime(ACME, january()).await.unwrap_err();

    assert_eq!(err, MetricaError::unsupported("snapshot"));
    let key = CacheKey {
        resource: key(ACME),
        range: january(),
    };
    assert!(metrica.cache().get_exact(&key).is_none());
}
