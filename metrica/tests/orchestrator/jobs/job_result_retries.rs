use std::time::Duration;

use metrica::{JobId, JobPhase, JobStatus, MetricaError};
use metrica_mock::{JobScript, MockBehavior};

use crate::helpers::{ACME, acme_records, clock, january, key, metrica, scripted};

#[tokio::test(start_paused = true)]
async fn not_ready_results_are_retried_silently() {
    let (backend, ctl) = scripted();
    ctl.set_job_script(
        key(ACME),
        JobScript::completing_after(0, acme_records()).with_not_ready(4),
    )
    .await;
    let metrica = metrica(backend, &clock());
    let started = tokio::time::Instant::now();

    let loaded = metrica.load(ACME, january()).await.unwrap();

    assert_eq!(loaded.view.len(), 3);
    assert_eq!(ctl.result_calls(&JobId::new("job-1")).await, 5);
    assert!(started.elapsed() >= Duration::from_secs(12));
    assert!(metrica.snapshot().error.is_none());
}

#[tokio::test(start_paused = true)]
async fn exhausted_retries_end_the_cycle_with_an_error() {
    let (backend, ctl) = scripted();
    ctl.set_job_script(
        key(ACME),
        JobScript::completing_after(0, acme_records()).with_not_ready(50),
    )
    .await;
    let metrica = metrica(backend, &clock());

    let err = metrica.load(ACME, january()).await.unwrap_err();

    assert_eq!(
        err,
        MetricaError::RetriesExhausted {
            job_id: "job-1".into(),
            attempts: 10,
        }
    );
    assert_eq!(ctl.result_calls(&JobId::new("job-1")).await, 10);
    let snap = metrica.snapshot();
    assert_eq!(snap.phase, JobPhase::Error);
    assert_eq!(snap.error.as_deref(), Some(err.to_string().as_str()));
    assert_eq!(snap.job.unwrap().status, JobStatus::Error);
}

#[tokio::test(start_paused = true)]
async fn other_result_errors_are_not_retried() {
    let (backend, ctl) = scripted();
    let mut script = JobScript::completing_after(0, acme_records());
    script.result = MockBehavior::Fail(MetricaError::server("scripted", 502, "Bad Gateway"));
    ctl.set_job_script(key(ACME), script).await;
    let metrica = metrica(backend, &clock());

    let err = metrica.load(ACME, january()).await.unwrap_err();

    assert!(matches!(err, MetricaError::Server { status: 502, .. }));
    assert_eq!(ctl.result_calls(&JobId::new("job-1")).await, 1);
    assert_eq!(metrica.snapshot().phase, JobPhase::Error);
    assert!(metrica.cache().is_empty());
}
