use std::time::Duration;

use metrica::{DataSource, JobPhase, JobStatus, JobStatusReport, MetricaError};
use metrica_mock::{JobScript, MockBehavior};

use crate::helpers::{
    ACME, GLOBEX, acme_records, clock, daily_january, january, key, metrica, range, scripted,
};

#[tokio::test(start_paused = true)]
async fn duplicate_loads_share_one_job() {
    let (backend, ctl) = scripted();
    ctl.set_job_script(key(ACME), JobScript::completing_after(2, acme_records()))
        .await;
    let metrica = metrica(backend, &clock());

    let (a, b, c) = tokio::join!(
        metrica.load(ACME, january()),
        metrica.load(ACME, january()),
        metrica.load(ACME, january()),
    );

    assert_eq!(ctl.create_calls(&key(ACME)).await, 1);
    let a = a.unwrap();
    assert_eq!(a.view, b.unwrap().view);
    assert_eq!(a.view, c.unwrap().view);
    assert!(matches!(a.source, DataSource::Job { .. }));
}

#[tokio::test(start_paused = true)]
async fn range_change_on_same_key_waits_for_running_job() {
    let (backend, ctl) = scripted();
    ctl.set_job_script(key(ACME), JobScript::completing_after(2, acme_records()))
        .await;
    let metrica = metrica(backend, &clock());

    let first = {
        let metrica = metrica.clone();
        tokio::spawn(async move { metrica.load(ACME, january()).await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    let narrow = metrica
        .load(ACME, range("2024-01-01", "2024-01-10"))
        .await
        .unwrap();

    assert_eq!(ctl.create_calls(&key(ACME)).await, 1);
    assert!(matches!(narrow.source, DataSource::Job { .. }));
    assert_eq!(narrow.view.len(), 1);
    assert!(matches!(
        first.await.unwrap(),
        Err(MetricaError::Superseded { .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn switching_resource_supersedes_running_cycle() {
    let (backend, ctl) = scripted();
    let mut slow = JobScript::completing_after(0, acme_records());
    slow.statuses = vec![MockBehavior::Return(JobStatusReport {
        status: JobStatus::Processing,
        progress: Some("Consultando".into()),
        elapsed_seconds: Some(1.0),
    })];
    ctl.set_job_script(key(ACME), slow).await;
    ctl.set_job_script(key(GLOBEX), JobScript::completing_after(1, daily_january()))
        .await;
    let metrica = metrica(backend, &clock());

    let first = {
        let metrica = metrica.clone();
        tokio::spawn(async move { metrica.load(ACME, january()).await })
    };
    tokio::time::sleep(Duration::from_secs(4)).await;
    let acme_job = ctl.created_jobs().await[0].0.clone();
    let polls_before = ctl.status_calls(&acme_job).await;
    assert!(polls_before >= 1);

    let globex = metrica.load(GLOBEX, january()).await.unwrap();
    assert_eq!(globex.view.len(), 31);
    assert!(matches!(
        first.await.unwrap(),
        Err(MetricaError::Superseded { .. })
    ));

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert!(ctl.status_calls(&acme_job).await <= polls_before + 1);

    let snap = metrica.snapshot();
    assert_eq!(snap.phase, JobPhase::Completed);
    assert_eq!(snap.selection.unwrap().resource, key(GLOBEX));
    assert_eq!(snap.job.unwrap().resource_key, key(GLOBEX));
    assert!(snap.error.is_none());
}
