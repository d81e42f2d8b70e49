use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use metrica_core::backend::{CampaignBackend, JobProvider, SnapshotProvider};
use metrica_core::{
    ImmediateRequest, ImmediateResponse, JobId, JobResult, JobSpec, JobStatus, JobStatusReport,
    JobTicket, MetricaError, RawRecord, ResourceKey,
};

/// Instruction for how a method should behave for a given input.
#[derive(Clone, Debug)]
pub enum MockBehavior<T> {
    /// Return the provided value immediately.
    Return(T),
    /// Fail immediately with the provided error.
    Fail(MetricaError),
    /// Hang indefinitely (simulate a stalled request).
    Hang,
}

impl<T> MockBehavior<T> {
    async fn resolve(self) -> Result<T, MetricaError> {
        match self {
            Self::Return(v) => Ok(v),
            Self::Fail(e) => Err(e),
            Self::Hang => std::future::pending().await,
        }
    }
}

/// Scripted behavior of every job created for one resource.
#[derive(Clone, Debug)]
pub struct JobScript {
    /// Answer to `create_job`.
    pub create: MockBehavior<()>,
    /// Answers to successive `job_status` calls; the last one repeats.
    /// An empty script answers `completed`.
    pub statuses: Vec<MockBehavior<JobStatusReport>>,
    /// Number of `job_result` calls answered with `NotReady` first.
    pub not_ready: u32,
    /// Answer to `job_result` once the not-ready window has passed.
    pub result: MockBehavior<JobResult>,
}

impl JobScript {
    /// Job that reports `processing` `polls` times, then completes with `data`.
    #[must_use]
    pub fn completing_after(polls: u32, data: Vec<RawRecord>) -> Self {
        let mut statuses: Vec<MockBehavior<JobStatusReport>> = (1..=polls)
            .map(|i| {
                MockBehavior::Return(JobStatusReport {
                    status: JobStatus::Processing,
                    progress: Some(format!("Etapa {i}")),
                    elapsed_seconds: Some(f64::from(i) * 3.0),
                })
            })
            .collect();
        statuses.push(MockBehavior::Return(JobStatusReport::bare(
            JobStatus::Completed,
        )));
        Self {
            create: MockBehavior::Return(()),
            statuses,
            not_ready: 0,
            result: MockBehavior::Return(JobResult {
                count: data.len() as u64,
                data,
            }),
        }
    }

    /// Job that reports `status` (`error` or `failed`) with `progress` on its first poll.
    #[must_use]
    pub fn failing(status: JobStatus, progress: &str) -> Self {
        Self {
            create: MockBehavior::Return(()),
            statuses: vec![MockBehavior::Return(JobStatusReport {
                status,
                progress: Some(progress.to_string()),
                elapsed_seconds: None,
            })],
            not_ready: 0,
            result: MockBehavior::Fail(MetricaError::not_found("result of a failed job")),
        }
    }

    /// Answer the first `n` result calls with `NotReady`.
    #[must_use]
    pub const fn with_not_ready(mut self, n: u32) -> Self {
        self.not_ready = n;
        self
    }

    /// Replace the `create_job` answer.
    #[must_use]
    pub fn with_create(mut self, create: MockBehavior<()>) -> Self {
        self.create = create;
        self
    }
}

#[derive(Default)]
struct JobRuntime {
    resource: Option<ResourceKey>,
    status_calls: usize,
    result_calls: usize,
}

#[derive(Default)]
struct InternalState {
    job_scripts: HashMap<ResourceKey, JobScript>,
    snapshot_rules: HashMap<ResourceKey, MockBehavior<ImmediateResponse>>,
    jobs: HashMap<JobId, JobRuntime>,
    created: Vec<(JobId, ResourceKey)>,
    create_calls: HashMap<ResourceKey, usize>,
    immediate_requests: HashMap<ResourceKey, Vec<ImmediateRequest>>,
    next_job: u64,
}

/// Controller handle used by tests to drive the scripted backend from the outside.
pub struct ScriptController {
    state: Arc<Mutex<InternalState>>,
}

impl ScriptController {
    /// Script every job created for `resource`.
    pub async fn set_job_script(&self, resource: ResourceKey, script: JobScript) {
        let mut guard = self.state.lock().await;
        guard.job_scripts.insert(resource, script);
    }

    /// Set the behavior of immediate reads of `resource`.
    pub async fn set_snapshot_behavior(
        &self,
        resource: ResourceKey,
        behavior: MockBehavior<ImmediateResponse>,
    ) {
        let mut guard = self.state.lock().await;
        guard.snapshot_rules.insert(resource, behavior);
    }

    /// Number of `create_job` calls made for `resource`.
    pub async fn create_calls(&self, resource: &ResourceKey) -> usize {
        let guard = self.state.lock().await;
        guard.create_calls.get(resource).copied().unwrap_or(0)
    }

    /// Jobs created so far, in order.
    pub async fn created_jobs(&self) -> Vec<(JobId, ResourceKey)> {
        self.state.lock().await.created.clone()
    }

    /// Number of `job_status` calls made for `job_id`.
    pub async fn status_calls(&self, job_id: &JobId) -> usize {
        let guard = self.state.lock().await;
        guard.jobs.get(job_id).map_or(0, |j| j.status_calls)
    }

    /// Number of `job_result` calls made for `job_id`.
    pub async fn result_calls(&self, job_id: &JobId) -> usize {
        let guard = self.state.lock().await;
        guard.jobs.get(job_id).map_or(0, |j| j.result_calls)
    }

    /// Immediate requests received for `resource`, in order.
    pub async fn immediate_requests(&self, resource: &ResourceKey) -> Vec<ImmediateRequest> {
        let guard = self.state.lock().await;
        guard
            .immediate_requests
            .get(resource)
            .cloned()
            .unwrap_or_default()
    }

    /// Clear all configured behaviors and request logs.
    pub async fn clear_all_behaviors(&self) {
        let mut guard = self.state.lock().await;
        guard.job_scripts.clear();
        guard.snapshot_rules.clear();
        guard.jobs.clear();
        guard.created.clear();
        guard.create_calls.clear();
        guard.immediate_requests.clear();
    }
}

/// A backend that defers all behavior to an external controller.
pub struct ScriptedBackend {
    name: &'static str,
    state: Arc<Mutex<InternalState>>,
}

impl ScriptedBackend {
    /// Create a new scripted backend and its controller.
    #[must_use]
    pub fn new_with_controller(name: &'static str) -> (Arc<dyn CampaignBackend>, ScriptController) {
        let state = Arc::new(Mutex::new(InternalState::default()));
        let controller = ScriptController {
            state: Arc::clone(&state),
        };
        let me = Arc::new(Self { name, state });
        (me as Arc<dyn CampaignBackend>, controller)
    }
}

#[async_trait]
impl CampaignBackend for ScriptedBackend {
    fn name(&self) -> &'static str {
        self.name
    }

    fn vendor(&self) -> &'static str {
        "ScriptedMock"
    }

    fn as_job_provider(&self) -> Option<&dyn JobProvider> {
        Some(self as &dyn JobProvider)
    }

    fn as_snapshot_provider(&self) -> Option<&dyn SnapshotProvider> {
        Some(self as &dyn SnapshotProvider)
    }
}

#[async_trait]
impl JobProvider for ScriptedBackend {
    async fn create_job(&self, spec: &JobSpec) -> Result<JobTicket, MetricaError> {
        // Take a behavior snapshot without holding the lock across await points.
        let behavior = {
            let mut guard = self.state.lock().await;
            *guard
                .create_calls
                .entry(spec.resource_key.clone())
                .or_default() += 1;
            guard
                .job_scripts
                .get(&spec.resource_key)
                .map(|s| s.create.clone())
        };
        let Some(behavior) = behavior else {
            return Err(MetricaError::unsupported("jobs"));
        };
        behavior.resolve().await?;

        let mut guard = self.state.lock().await;
        guard.next_job += 1;
        let job_id = JobId::new(format!("job-{}", guard.next_job));
        guard.jobs.insert(
            job_id.clone(),
            JobRuntime {
                resource: Some(spec.resource_key.clone()),
                ..JobRuntime::default()
            },
        );
        guard
            .created
            .push((job_id.clone(), spec.resource_key.clone()));
        Ok(JobTicket { job_id })
    }

    async fn job_status(&self, job_id: &JobId) -> Result<JobStatusReport, MetricaError> {
        let behavior = {
            let mut guard = self.state.lock().await;
            let st = &mut *guard;
            let job = st
                .jobs
                .get_mut(job_id)
                .ok_or_else(|| MetricaError::not_found(format!("job {job_id}")))?;
            let call = job.status_calls;
            job.status_calls += 1;
            let script = job.resource.as_ref().and_then(|r| st.job_scripts.get(r));
            match script {
                Some(s) if !s.statuses.is_empty() => {
                    s.statuses[call.min(s.statuses.len() - 1)].clone()
                }
                _ => MockBehavior::Return(JobStatusReport::bare(JobStatus::Completed)),
            }
        };
        behavior.resolve().await
    }

    async fn job_result(&self, job_id: &JobId) -> Result<JobResult, MetricaError> {
        let behavior = {
            let mut guard = self.state.lock().await;
            let st = &mut *guard;
            let job = st
                .jobs
                .get_mut(job_id)
                .ok_or_else(|| MetricaError::not_found(format!("job {job_id}")))?;
            let call = job.result_calls;
            job.result_calls += 1;
            let script = job.resource.as_ref().and_then(|r| st.job_scripts.get(r));
            match script {
                Some(s) if call < s.not_ready as usize => {
                    MockBehavior::Fail(MetricaError::not_ready(job_id.as_str()))
                }
                Some(s) => s.result.clone(),
                None => MockBehavior::Return(JobResult::default()),
            }
        };
        behavior.resolve().await
    }
}

#[async_trait]
impl SnapshotProvider for ScriptedBackend {
    async fn immediate_data(
        &self,
        resource: &ResourceKey,
        req: &ImmediateRequest,
    ) -> Result<ImmediateResponse, MetricaError> {
        let behavior = {
            let mut guard = self.state.lock().await;
            guard
                .immediate_requests
                .entry(resource.clone())
                .or_default()
                .push(req.clone());
            guard.snapshot_rules.get(resource).cloned()
        };
        match behavior {
            Some(b) => b.resolve().await,
            None => Err(MetricaError::unsupported("snapshot")),
        }
    }
}
