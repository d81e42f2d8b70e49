use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use metrica::{Admission, ConcurrencyGuard, MetricaError, Ticket};

use crate::helpers::{ACME, GLOBEX, key};

#[test]
fn same_key_is_rejected_while_active() {
    let guard = ConcurrencyGuard::new();
    let slot = guard.try_start(&key(ACME), 1).expect("first start admitted");
    assert!(guard.try_start(&key(ACME), 1).is_none());
    assert!(guard.try_start(&key(ACME), 2).is_none());
    assert!(guard.is_active(&key(ACME)));
    drop(slot);
    assert!(!guard.is_active(&key(ACME)));
    assert!(guard.try_start(&key(ACME), 2).is_some());
}

#[test]
fn other_key_is_deferred_until_release() {
    let guard = ConcurrencyGuard::new();
    let slot = guard.try_start(&key(ACME), 1).unwrap();
    assert!(matches!(guard.admit(&key(GLOBEX), 2), Admission::Deferred));

    guard.supersede(&key(GLOBEX));
    assert!(guard.active().is_none());
    assert!(matches!(guard.admit(&key(GLOBEX), 2), Admission::Started(_)));
    drop(slot);
}

#[test]
fn supersede_keeps_slot_for_selected_key() {
    let guard = ConcurrencyGuard::new();
    let _slot = guard.try_start(&key(ACME), 1).unwrap();
    guard.supersede(&key(ACME));
    assert!(guard.is_active(&key(ACME)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_try_start_admits_exactly_one() {
    let guard = ConcurrencyGuard::new();
    let admitted = Arc::new(AtomicUsize::new(0));
    let mut tasks = Vec::new();
    for _ in 0..32 {
        let guard = guard.clone();
        let admitted = Arc::clone(&admitted);
        tasks.push(tokio::spawn(async move {
            if let Some(slot) = guard.try_start(&key(ACME), 7) {
                admitted.fetch_add(1, Ordering::SeqCst);
                std::mem::forget(slot);
            }
        }));
    }
    for t in tasks {
        t.await.unwrap();
    }
    assert_eq!(admitted.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn duplicate_command_joins_running_cycle() {
    let guard = ConcurrencyGuard::new();
    let Ticket::Lead(slot) = guard.admit_or_wait(&key(ACME), 3).await else {
        panic!("first command leads");
    };
    let Ticket::Follow(waiter) = guard.admit_or_wait(&key(ACME), 3).await else {
        panic!("duplicate command follows");
    };
    slot.finish(Err(MetricaError::job_failed("job-1", "boom")));
    let outcome = waiter.outcome().await;
    assert_eq!(outcome.unwrap_err(), MetricaError::job_failed("job-1", "boom"));
}

#[tokio::test]
async fn dropped_slot_reports_superseded_to_followers() {
    let guard = ConcurrencyGuard::new();
    let slot = guard.try_start(&key(ACME), 1).unwrap();
    let waiter = slot.waiter();
    drop(slot);
    assert!(matches!(
        waiter.outcome().await,
        Err(MetricaError::Superseded { .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn deferred_command_starts_after_release() {
    let guard = ConcurrencyGuard::new();
    let slot = guard.try_start(&key(ACME), 1).unwrap();

    let waiting = {
        let guard = guard.clone();
        tokio::spawn(async move { guard.admit_or_wait(&key(GLOBEX), 2).await })
    };
    tokio::task::yield_now().await;
    assert!(!waiting.is_finished());

    slot.finish(Err(MetricaError::Other("done".into())));
    let ticket = waiting.await.unwrap();
    assert!(matches!(ticket, Ticket::Lead(_)));
    assert!(guard.is_active(&key(GLOBEX)));
}
