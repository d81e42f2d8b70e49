use metrica::{AttributionModel, CacheKey, DataSource, JobPhase, JobStatus};
use metrica_mock::{JobScript, MockBehavior};

use crate::helpers::{ACME, acme_records, clock, january, key, metrica, scripted};

#[tokio::test(start_paused = true)]
async fn job_cycle_stores_reconciled_records_for_requested_range() {
    let (backend, ctl) = scripted();
    ctl.set_job_script(key(ACME), JobScript::completing_after(1, acme_records()))
        .await;
    let metrica = metrica(backend, &clock());

    let loaded = metrica.load(ACME, january()).await.unwrap();

    let DataSource::Job { job_id } = &loaded.source else {
        panic!("expected a job cycle, got {:?}", loaded.source);
    };
    assert_eq!(job_id.as_str(), "job-1");
    assert_eq!(ctl.create_calls(&key(ACME)).await, 1);
    assert_eq!(ctl.status_calls(job_id).await, 2);

    assert_eq!(loaded.view.len(), 3);
    for record in loaded.view.records() {
        for model in AttributionModel::ALL {
            let m = record.metrics(model);
            assert!(m.transactions > 0, "{model:?} transactions missing");
            assert!(m.revenue > 0.0, "{model:?} revenue missing");
        }
        assert_ne!(
            record.metrics(AttributionModel::LastNonDirect),
            record.metrics(AttributionModel::OriginStack)
        );
    }

    let stored = metrica
        .cache()
        .get_exact(&CacheKey {
            resource: key(ACME),
            range: january(),
        })
        .expect("entry stored under the requested range");
    assert_eq!(stored.records.len(), 3);
    assert!((stored.summary.totals.cost - 500.0).abs() < 1e-9);

    let snap = metrica.snapshot();
    assert_eq!(snap.phase, JobPhase::Completed);
    assert!(!snap.is_loading());
    assert!(snap.error.is_none());
    let job = snap.job.expect("job kept for display");
    assert_eq!(job.status, JobStatus::Completed);
    assert!((job.elapsed_seconds - 3.0).abs() < f64::EPSILON);
    assert_eq!(snap.elapsed_seconds, Some(3.0));
    assert_eq!(snap.progress_text, metrica.config().labels.downloading);
    assert_eq!(snap.dataset.as_ref(), Some(&loaded.view));
}

#[tokio::test(start_paused = true)]
async fn submission_publishes_starting_label() {
    let (backend, ctl) = scripted();
    let mut script = JobScript::completing_after(0, acme_records());
    script.statuses = vec![MockBehavior::Hang];
    ctl.set_job_script(key(ACME), script).await;
    let metrica = metrica(backend, &clock());
    let mut rx = metrica.subscribe();

    let task = {
        let metrica = metrica.clone();
        tokio::spawn(async move { metrica.load(ACME, january()).await })
    };

    let snap = rx.wait_for(|s| s.is_loading()).await.unwrap().clone();
    assert_eq!(snap.phase, JobPhase::Processing);
    assert_eq!(snap.progress_text, "Iniciando...");
    let job = snap.job.expect("current job");
    assert_eq!(job.status, JobStatus::Processing);
    assert_eq!(job.resource_key, key(ACME));

    task.abort();
    metrica.shutdown();
}

#[tokio::test(start_paused = true)]
async fn progress_updates_keep_processing_state() {
    let (backend, ctl) = scripted();
    ctl.set_job_script(key(ACME), JobScript::completing_after(3, acme_records()))
        .await;
    let metrica = metrica(backend, &clock());
    let mut rx = metrica.subscribe();

    let task = {
        let metrica = metrica.clone();
        tokio::spawn(async move { metrica.load(ACME, january()).await })
    };

    let snap = rx
        .wait_for(|s| s.progress_text.starts_with("Etapa 2"))
        .await
        .unwrap()
        .clone();
    assert_eq!(snap.progress_text, "Etapa 2 (6s)");
    assert_eq!(snap.elapsed_seconds, Some(6.0));
    assert_eq!(snap.phase, JobPhase::Processing);

    let loaded = task.await.unwrap().unwrap();
    assert_eq!(loaded.view.len(), 3);
}
