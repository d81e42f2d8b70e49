use std::time::Duration;

use metrica::{DataSource, JobId, JobPhase, JobStatus, JobStatusReport, MetricaError};
use metrica_mock::{JobScript, MockBehavior};

use crate::helpers::{ACME, acme_records, clock, january, key, metrica, scripted};

#[tokio::test(start_paused = true)]
async fn reload_bypasses_the_cache_with_a_new_job() {
    let (backend, ctl) = scripted();
    ctl.set_job_script(key(ACME), JobScript::completing_after(1, acme_records()))
        .await;
    let metrica = metrica(backend, &clock());

    let first = metrica.load(ACME, january()).await.unwrap();
    assert_eq!(
        first.source,
        DataSource::Job {
            job_id: JobId::new("job-1")
        }
    );
    let again = metrica.load(ACME, january()).await.unwrap();
    assert!(matches!(again.source, DataSource::Cache { exact: true, .. }));
    assert_eq!(ctl.create_calls(&key(ACME)).await, 1);

    let generation = metrica.snapshot().generation;
    let reloaded = metrica.reload().await.unwrap();

    assert_eq!(
        reloaded.source,
        DataSource::Job {
            job_id: JobId::new("job-2")
        }
    );
    assert_eq!(ctl.create_calls(&key(ACME)).await, 2);
    let snap = metrica.snapshot();
    assert!(snap.generation > generation);
    assert_eq!(snap.phase, JobPhase::Completed);
    assert_eq!(snap.job.unwrap().id, JobId::new("job-2"));
}

#[tokio::test(start_paused = true)]
async fn shutdown_cancels_the_running_cycle() {
    let (backend, ctl) = scripted();
    let mut script = JobScript::completing_after(0, acme_records());
    script.statuses = vec![MockBehavior::Return(JobStatusReport::bare(
        JobStatus::Processing,
    ))];
    ctl.set_job_script(key(ACME), script).await;
    let metrica = metrica(backend, &clock());

    let pending = {
        let metrica = metrica.clone();
        tokio::spawn(async move { metrica.load(ACME, january()).await })
    };
    tokio::time::sleep(Duration::from_secs(7)).await;
    let polls = ctl.status_calls(&JobId::new("job-1")).await;
    assert!(polls >= 2);

    metrica.shutdown();

    assert!(matches!(
        pending.await.unwrap(),
        Err(MetricaError::Superseded { .. })
    ));
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(ctl.status_calls(&JobId::new("job-1")).await, polls);
    assert!(!metrica.guard().is_active(&key(ACME)));
    assert!(metrica.cache().is_empty());

    let snap = metrica.snapshot();
    assert!(!snap.is_loading());
    assert_eq!(snap.phase, JobPhase::Error);
    assert_eq!(snap.job.unwrap().status, JobStatus::Error);
    assert!(snap.error.unwrap().contains("superseded"));
}
