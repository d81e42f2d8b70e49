use async_trait::async_trait;

use metrica_types::{
    ImmediateRequest, ImmediateResponse, JobId, JobResult, JobSpec, JobStatusReport, JobTicket,
    MetricaError, ResourceKey,
};

/// Focused role trait for backends that run asynchronous compute jobs.
#[async_trait]
pub trait JobProvider: Send + Sync {
    /// Submit a job computing the dataset named by `spec`.
    async fn create_job(&self, spec: &JobSpec) -> Result<JobTicket, MetricaError>;

    /// Fetch the current status of a submitted job.
    async fn job_status(&self, job_id: &JobId) -> Result<JobStatusReport, MetricaError>;

    /// Fetch the output of a completed job.
    ///
    /// Implementations return [`MetricaError::NotReady`] while the backend has
    /// not yet reflected the job's completion.
    async fn job_result(&self, job_id: &JobId) -> Result<JobResult, MetricaError>;
}

/// Focused role trait for backends that serve data synchronously.
#[async_trait]
pub trait SnapshotProvider: Send + Sync {
    /// Fetch data for `resource` without a job cycle.
    async fn immediate_data(
        &self,
        resource: &ResourceKey,
        req: &ImmediateRequest,
    ) -> Result<ImmediateResponse, MetricaError>;
}

/// Main backend trait. Exposes role discovery.
#[async_trait]
pub trait CampaignBackend: Send + Sync {
    /// A stable identifier used in errors and logs (e.g. "metrica-http").
    fn name(&self) -> &'static str;

    /// Human-friendly vendor string.
    fn vendor(&self) -> &'static str {
        "unknown"
    }

    /// Advertise the job protocol by returning a usable trait object when supported.
    fn as_job_provider(&self) -> Option<&dyn JobProvider> {
        None
    }

    /// Advertise the immediate data path by returning a usable trait object when supported.
    fn as_snapshot_provider(&self) -> Option<&dyn SnapshotProvider> {
        None
    }
}

/// Resolve the job role or fail with `Unsupported`.
///
/// # Errors
/// Returns `Unsupported { capability: "jobs" }` when the backend has no job role.
pub fn require_jobs(backend: &dyn CampaignBackend) -> Result<&dyn JobProvider, MetricaError> {
    backend
        .as_job_provider()
        .ok_or_else(|| MetricaError::unsupported("jobs"))
}

/// Resolve the immediate data role or fail with `Unsupported`.
///
/// # Errors
/// Returns `Unsupported { capability: "snapshot" }` when the backend has no
/// immediate data role.
pub fn require_snapshot(
    backend: &dyn CampaignBackend,
) -> Result<&dyn SnapshotProvider, MetricaError> {
    backend
        .as_snapshot_provider()
        .ok_or_else(|| MetricaError::unsupported("snapshot"))
}
