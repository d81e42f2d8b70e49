//! Deterministic campaign backends for tests and examples.
//!
//! - [`MockBackend`] serves static fixtures through both the job protocol and
//!   the immediate path.
//! - [`ScriptedBackend`] defers every answer to a [`ScriptController`] so
//!   tests can script status sequences, not-ready windows, failures and hangs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use metrica_core::backend::{CampaignBackend, JobProvider, SnapshotProvider};
use metrica_core::{
    CacheInfo, ImmediateRequest, ImmediateResponse, JobId, JobResult, JobSpec, JobStatus,
    JobStatusReport, JobTicket, MetricaError, RawRecord, ResourceKey, coerce::coerce_date,
};

mod dynamic;
mod fixtures;

pub use dynamic::{JobScript, MockBehavior, ScriptController, ScriptedBackend};

struct MockJob {
    resource: ResourceKey,
    polls: u32,
}

/// Mock backend for CI-safe examples. Provides deterministic data from static fixtures.
///
/// Fixture resources: `acme_store` (3 records), `globex` (one record per day
/// of January 2024) and `empty_store`. Two resources simulate failures:
/// jobs for `failing_store` end in `failed`, and immediate reads of
/// `outage_store` (same data as `acme_store` through jobs) answer with
/// status 500.
pub struct MockBackend {
    next_id: AtomicU64,
    jobs: Mutex<HashMap<JobId, MockJob>>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    /// Polls answered with `processing` before a job completes.
    pub const PROCESSING_POLLS: u32 = 2;

    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            jobs: Mutex::new(HashMap::new()),
        }
    }

    fn not_found(what: &str) -> MetricaError {
        MetricaError::not_found(what.to_string())
    }

    fn fixture(resource: &ResourceKey) -> Result<Vec<RawRecord>, MetricaError> {
        fixtures::campaigns::by_resource(resource.as_str())
            .ok_or_else(|| Self::not_found(&format!("dataset for {resource}")))
    }
}

#[async_trait]
impl CampaignBackend for MockBackend {
    fn name(&self) -> &'static str {
        "metrica-mock"
    }

    fn vendor(&self) -> &'static str {
        "Mock"
    }

    fn as_job_provider(&self) -> Option<&dyn JobProvider> {
        Some(self as &dyn JobProvider)
    }

    fn as_snapshot_provider(&self) -> Option<&dyn SnapshotProvider> {
        Some(self as &dyn SnapshotProvider)
    }
}

#[async_trait]
impl JobProvider for MockBackend {
    async fn create_job(&self, spec: &JobSpec) -> Result<JobTicket, MetricaError> {
        if spec.resource_key.as_str() != "failing_store" {
            Self::fixture(&spec.resource_key)?;
        }
        let n = self.next_id.fetch_add(1, Ordering::Relaxed);
        let job_id = JobId::new(format!("mock-job-{n}"));
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner).insert(
            job_id.clone(),
            MockJob {
                resource: spec.resource_key.clone(),
                polls: 0,
            },
        );
        Ok(JobTicket { job_id })
    }

    async fn job_status(&self, job_id: &JobId) -> Result<JobStatusReport, MetricaError> {
        let mut jobs = self.jobs.lock().unwrap_or_else(PoisonError::into_inner);
        let job = jobs
            .get_mut(job_id)
            .ok_or_else(|| Self::not_found(&format!("job {job_id}")))?;
        job.polls += 1;
        if job.resource.as_str() == "failing_store" {
            return Ok(JobStatusReport {
                status: JobStatus::Failed,
                progress: Some("Falha ao consultar a origem dos dados".into()),
                elapsed_seconds: Some(f64::from(job.polls) * 3.0),
            });
        }
        let report = if job.polls <= Self::PROCESSING_POLLS {
            JobStatusReport {
                status: JobStatus::Processing,
                progress: Some(format!("Consultando dados ({}/3)", job.polls)),
                elapsed_seconds: Some(f64::from(job.polls) * 3.0),
            }
        } else {
            JobStatusReport::bare(JobStatus::Completed)
        };
        Ok(report)
    }

    async fn job_result(&self, job_id: &JobId) -> Result<JobResult, MetricaError> {
        let resource = {
            let jobs = self.jobs.lock().unwrap_or_else(PoisonError::into_inner);
            let job = jobs
                .get(job_id)
                .ok_or_else(|| Self::not_found(&format!("job {job_id}")))?;
            if job.polls <= Self::PROCESSING_POLLS {
                return Err(MetricaError::not_ready(job_id.as_str()));
            }
            job.resource.clone()
        };
        let data = Self::fixture(&resource)?;
        Ok(JobResult {
            count: data.len() as u64,
            data,
        })
    }
}

#[async_trait]
impl SnapshotProvider for MockBackend {
    async fn immediate_data(
        &self,
        resource: &ResourceKey,
        req: &ImmediateRequest,
    ) -> Result<ImmediateResponse, MetricaError> {
        if resource.as_str() == "outage_store" {
            return Err(MetricaError::server(
                self.name(),
                500,
                "Internal Server Error",
            ));
        }
        let data: Vec<RawRecord> = Self::fixture(resource)?
            .into_iter()
            .filter(|r| {
                coerce_date(r.get("date"))
                    .is_some_and(|d| req.start_date <= d && d <= req.end_date)
            })
            .collect();
        Ok(ImmediateResponse {
            data,
            summary: None,
            cache_info: Some(CacheInfo {
                source: Some(if req.last_cache { "cache" } else { "database" }.into()),
                cached_at: None,
                ttl_hours: Some(4.0),
            }),
        })
    }
}
