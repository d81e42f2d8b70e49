use std::time::Duration;

use metrica::{JobId, JobPhase, JobStatus, JobStatusReport, Metrica, MetricaError, PollConfig};
use metrica_mock::{JobScript, MockBehavior};

use crate::helpers::{ACME, acme_records, clock, january, key, metrica, scripted};

#[tokio::test(start_paused = true)]
async fn backend_failure_surfaces_last_progress() {
    let (backend, ctl) = scripted();
    ctl.set_job_script(
        key(ACME),
        JobScript::failing(JobStatus::Failed, "Falha ao consultar a origem"),
    )
    .await;
    let metrica = metrica(backend, &clock());

    let err = metrica.load(ACME, january()).await.unwrap_err();

    assert_eq!(
        err,
        MetricaError::job_failed("job-1", "Falha ao consultar a origem")
    );
    let snap = metrica.snapshot();
    assert_eq!(snap.phase, JobPhase::Error);
    assert_eq!(snap.job.unwrap().status, JobStatus::Failed);
    assert!(snap.error.unwrap().contains("Falha ao consultar a origem"));
    assert_eq!(ctl.result_calls(&JobId::new("job-1")).await, 0);
}

#[tokio::test(start_paused = true)]
async fn error_status_without_text_keeps_previous_progress() {
    let (backend, ctl) = scripted();
    let mut script = JobScript::completing_after(1, acme_records());
    script.statuses = vec![
        MockBehavior::Return(JobStatusReport {
            status: JobStatus::Processing,
            progress: Some("Etapa 1".into()),
            elapsed_seconds: None,
        }),
        MockBehavior::Return(JobStatusReport::bare(JobStatus::Error)),
    ];
    ctl.set_job_script(key(ACME), script).await;
    let metrica = metrica(backend, &clock());

    let err = metrica.load(ACME, january()).await.unwrap_err();

    assert_eq!(err, MetricaError::job_failed("job-1", "Etapa 1"));
    assert_eq!(metrica.snapshot().job.unwrap().status, JobStatus::Error);
}

#[tokio::test(start_paused = true)]
async fn transient_status_errors_do_not_stop_polling() {
    let (backend, ctl) = scripted();
    let mut script = JobScript::completing_after(0, acme_records());
    script.statuses = vec![
        MockBehavior::Fail(MetricaError::network("scripted", "connection reset")),
        MockBehavior::Fail(MetricaError::server("scripted", 503, "busy")),
        MockBehavior::Return(JobStatusReport::bare(JobStatus::Completed)),
    ];
    ctl.set_job_script(key(ACME), script).await;
    let metrica = metrica(backend, &clock());

    let loaded = metrica.load(ACME, january()).await.unwrap();

    assert_eq!(loaded.view.len(), 3);
    assert_eq!(ctl.status_calls(&JobId::new("job-1")).await, 3);
}

#[tokio::test(start_paused = true)]
async fn poll_deadline_ends_a_stuck_job() {
    let (backend, ctl) = scripted();
    let mut script = JobScript::completing_after(0, acme_records());
    script.statuses = vec![MockBehavior::Return(JobStatusReport::bare(
        JobStatus::Processing,
    ))];
    ctl.set_job_script(key(ACME), script).await;
    let clock = clock();
    let metrica = Metrica::builder()
        .with_backend(backend)
        .poll(PollConfig {
            interval: Duration::from_secs(3),
            max_wait: Some(Duration::from_secs(20)),
        })
        .clock(std::sync::Arc::new(clock))
        .build()
        .unwrap();

    let err = metrica.load(ACME, january()).await.unwrap_err();

    assert_eq!(
        err,
        MetricaError::PollTimeout {
            job_id: "job-1".into(),
            waited_ms: 20_000,
        }
    );
    assert_eq!(metrica.snapshot().phase, JobPhase::Error);
    assert_eq!(ctl.status_calls(&JobId::new("job-1")).await, 7);
}

#[tokio::test(start_paused = true)]
async fn hanging_submission_times_out() {
    let (backend, ctl) = scripted();
    ctl.set_job_script(
        key(ACME),
        JobScript::completing_after(0, acme_records()).with_create(MockBehavior::Hang),
    )
    .await;
    let metrica = Metrica::builder()
        .with_backend(backend)
        .request_timeout(Duration::from_secs(5))
        .build()
        .unwrap();

    let err = metrica.load(ACME, january()).await.unwrap_err();

    assert!(matches!(err, MetricaError::Network { .. }));
    assert!(err.to_string().contains("timed out after 5000 ms"));
    let snap = metrica.snapshot();
    assert_eq!(snap.phase, JobPhase::Error);
    assert!(snap.job.is_none());
    assert!(ctl.created_jobs().await.is_empty());
}
