use std::sync::Arc;

use async_trait::async_trait;
use metrica::{
    CacheKey, CampaignBackend, DataSource, ImmediateRequest, ImmediateResponse, JobId, JobPhase,
    JobProvider, JobResult, JobSpec, JobStatusReport, JobTicket, MetricaError, RefreshOutcome,
    ResourceKey, SnapshotProvider,
};
use metrica_mock::MockBackend;

use crate::helpers::{ACME, clock, january, key, metrica};

/// Runs jobs but has no immediate path.
struct JobsOnly(MockBackend);

#[async_trait]
impl JobProvider for JobsOnly {
    async fn create_job(&self, spec: &JobSpec) -> Result<JobTicket, MetricaError> {
        self.0.create_job(spec).await
    }

    async fn job_status(&self, job_id: &JobId) -> Result<JobStatusReport, MetricaError> {
        self.0.job_status(job_id).await
    }

    async fn job_result(&self, job_id: &JobId) -> Result<JobResult, MetricaError> {
        self.0.job_result(job_id).await
    }
}

impl CampaignBackend for JobsOnly {
    fn name(&self) -> &'static str {
        "jobs-only"
    }

    fn as_job_provider(&self) -> Option<&dyn JobProvider> {
        Some(self as &dyn JobProvider)
    }
}

/// Serves immediate data but cannot run jobs.
struct SnapshotOnly(MockBackend);

#[async_trait]
impl SnapshotProvider for SnapshotOnly {
    async fn immediate_data(
        &self,
        resource: &ResourceKey,
        req: &ImmediateRequest,
    ) -> Result<ImmediateResponse, MetricaError> {
        self.0.immediate_data(resource, req).await
    }
}

impl CampaignBackend for SnapshotOnly {
    fn name(&self) -> &'static str {
        "snapshot-only"
    }

    fn as_snapshot_provider(&self) -> Option<&dyn SnapshotProvider> {
        Some(self as &dyn SnapshotProvider)
    }
}

#[tokio::test(start_paused = true)]
async fn refresh_without_immediate_path_fails_without_fallback() {
    let metrica = metrica(Arc::new(JobsOnly(MockBackend::new())), &clock());

    let loaded = metrica.load(ACME, january()).await.unwrap();
    assert!(matches!(loaded.source, DataSource::Job { .. }));
    assert_eq!(loaded.view.len(), 3);

    let outcome = metrica
        .refresh(CacheKey {
            resource: key(ACME),
            range: january(),
        })
        .await;
    assert_eq!(
        outcome,
        RefreshOutcome::Failed {
            error: MetricaError::unsupported("snapshot"),
        }
    );
    assert!(!metrica.snapshot().used_fallback);
    assert_eq!(
        metrica.prime(ACME, january()).await.unwrap_err(),
        MetricaError::unsupported("snapshot")
    );
}

#[tokio::test(start_paused = true)]
async fn load_without_job_role_fails_unless_primed() {
    let metrica = metrica(Arc::new(SnapshotOnly(MockBackend::new())), &clock());

    let err = metrica.load(ACME, january()).await.unwrap_err();
    assert_eq!(err, MetricaError::unsupported("jobs"));
    let snap = metrica.snapshot();
    assert_eq!(snap.phase, JobPhase::Error);
    assert!(snap.job.is_none());
    assert!(snap.error.is_some());

    metrica.prime(ACME, january()).await.unwrap();
    let loaded = metrica.load(ACME, january()).await.unwrap();
    assert!(matches!(loaded.source, DataSource::Cache { exact: true, .. }));
    assert_eq!(loaded.view.len(), 3);
    assert!(metrica.snapshot().error.is_none());
}
