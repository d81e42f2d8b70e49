//! One job cycle: submit, poll until terminal, fetch the result, store it.

use std::sync::Arc;

use metrica_core::{
    CacheEntry, DateRange, EntryOrigin, Job, JobId, JobProvider, JobResult, JobSpec, JobStatus,
    JobStatusReport, MetricaError, ProgressLabels, ResourceKey, reconcile_all, require_jobs,
};
use tokio::time::MissedTickBehavior;

use crate::core::Inner;
use crate::state::Event;

/// Progress text for a status answer: the backend's text (or the
/// `processing` label when it sent none) followed by `" ({secs}s)"` when the
/// elapsed time is known.
#[must_use]
pub fn progress_text(labels: &ProgressLabels, report: &JobStatusReport) -> String {
    let base = report
        .progress
        .as_deref()
        .filter(|p| !p.is_empty())
        .unwrap_or(&labels.processing);
    match report.elapsed_seconds {
        Some(secs) => format!("{base} ({}s)", secs.round()),
        None => base.to_string(),
    }
}

impl Inner {
    /// Run a full job cycle for `resource` and `range`.
    ///
    /// Terminal failures are published to the snapshot before returning.
    /// A superseded cycle returns `Superseded` without touching shared state.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "metrica::job::cycle",
            skip_all,
            fields(resource = %resource, range = %range),
        )
    )]
    pub(crate) async fn run_cycle(
        &self,
        resource: &ResourceKey,
        range: DateRange,
    ) -> Result<Arc<CacheEntry>, MetricaError> {
        let mut job_id = None;
        let outcome = self.drive(resource, range, &mut job_id).await;
        if let Err(error) = &outcome {
            self.fail(resource, job_id, error);
        }
        outcome
    }

    async fn drive(
        &self,
        resource: &ResourceKey,
        range: DateRange,
        job_id: &mut Option<JobId>,
    ) -> Result<Arc<CacheEntry>, MetricaError> {
        let jobs = require_jobs(self.backend.as_ref())?;
        let id = self.submit(jobs, resource, range).await?;
        *job_id = Some(id.clone());

        self.poll_until_done(jobs, resource, &id).await?;
        self.apply(Event::Downloading {
            job_id: id.clone(),
            text: self.cfg.labels.downloading.clone(),
        });

        let result = self.fetch_result(jobs, resource, &id).await?;
        let records = reconcile_all(&result.data)
            .into_iter()
            .filter(|r| r.date.is_none_or(|d| range.contains(d)))
            .collect();
        let entry = CacheEntry::new(
            resource.clone(),
            range,
            records,
            self.clock.now(),
            EntryOrigin::Job { job_id: id.clone() },
        );
        let stored = self.commit_job_result(&id, entry)?;
        #[cfg(feature = "tracing")]
        tracing::info!(
            resource = %resource,
            job_id = %id,
            records = stored.records.len(),
            "job completed"
        );
        Ok(stored)
    }

    async fn submit(
        &self,
        jobs: &dyn JobProvider,
        resource: &ResourceKey,
        range: DateRange,
    ) -> Result<JobId, MetricaError> {
        let spec = JobSpec {
            resource_key: resource.clone(),
            range: Some(range),
        };
        let ticket = self.call(resource, jobs.create_job(&spec)).await?;
        let job = Job {
            id: ticket.job_id.clone(),
            resource_key: resource.clone(),
            status: JobStatus::Processing,
            progress_text: self.cfg.labels.starting.clone(),
            elapsed_seconds: 0.0,
            created_at: self.clock.now(),
        };
        if !self.apply(Event::Submitted { job }) {
            return Err(MetricaError::superseded(resource.as_str()));
        }
        #[cfg(feature = "tracing")]
        tracing::info!(resource = %resource, job_id = %ticket.job_id, "job submitted");
        Ok(ticket.job_id)
    }

    async fn poll_until_done(
        &self,
        jobs: &dyn JobProvider,
        resource: &ResourceKey,
        id: &JobId,
    ) -> Result<(), MetricaError> {
        let poll = async {
            let mut ticker = tokio::time::interval(self.cfg.poll.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut last_progress = self.cfg.labels.starting.clone();
            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    () = self.key_superseded(resource) => {
                        return Err(MetricaError::superseded(resource.as_str()));
                    }
                }
                let report = match self.call(resource, jobs.job_status(id)).await {
                    Ok(report) => report,
                    Err(e @ MetricaError::Superseded { .. }) => return Err(e),
                    Err(_e) => {
                        #[cfg(feature = "tracing")]
                        tracing::debug!(job_id = %id, error = %_e, "status check failed; polling continues");
                        continue;
                    }
                };
                let text = progress_text(&self.cfg.labels, &report);
                #[cfg(feature = "tracing")]
                tracing::debug!(job_id = %id, status = ?report.status, progress = %text, "status update");
                let applied = self.apply(Event::Progress {
                    job_id: id.clone(),
                    status: report.status,
                    text: text.clone(),
                    elapsed_seconds: report.elapsed_seconds,
                });
                if !applied {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(job_id = %id, "stale status callback ignored");
                    return Err(MetricaError::superseded(resource.as_str()));
                }
                match report.status {
                    JobStatus::Processing => last_progress = text,
                    JobStatus::Completed => return Ok(()),
                    JobStatus::Error | JobStatus::Failed => {
                        let progress = report.progress.unwrap_or(last_progress);
                        return Err(MetricaError::job_failed(id.as_str(), progress));
                    }
                }
            }
        };
        match self.cfg.poll.max_wait {
            Some(limit) => tokio::time::timeout(limit, poll).await.unwrap_or_else(|_| {
                Err(MetricaError::PollTimeout {
                    job_id: id.to_string(),
                    waited_ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
                })
            }),
            None => poll.await,
        }
    }

    async fn fetch_result(
        &self,
        jobs: &dyn JobProvider,
        resource: &ResourceKey,
        id: &JobId,
    ) -> Result<JobResult, MetricaError> {
        let retry = self.cfg.retry;
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.call(resource, jobs.job_result(id)).await {
                Ok(result) => return Ok(result),
                Err(e) if e.is_retryable() && attempt < retry.max_attempts => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(job_id = %id, attempt, "result not ready; retrying");
                    tokio::select! {
                        () = tokio::time::sleep(retry.delay) => {}
                        () = self.key_superseded(resource) => {
                            return Err(MetricaError::superseded(resource.as_str()));
                        }
                    }
                }
                Err(e) if e.is_retryable() => {
                    return Err(MetricaError::RetriesExhausted {
                        job_id: id.to_string(),
                        attempts: attempt,
                    });
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Run a backend call under the request timeout, giving up as soon as
    /// `resource` stops being selected.
    async fn call<T, F>(&self, resource: &ResourceKey, fut: F) -> Result<T, MetricaError>
    where
        F: Future<Output = Result<T, MetricaError>>,
    {
        tokio::select! {
            out = self.timed(fut) => out,
            () = self.key_superseded(resource) => Err(MetricaError::superseded(resource.as_str())),
        }
    }

    /// Apply the request timeout to a single backend call.
    pub(crate) async fn timed<T, F>(&self, fut: F) -> Result<T, MetricaError>
    where
        F: Future<Output = Result<T, MetricaError>>,
    {
        match self.cfg.request_timeout {
            Some(limit) => tokio::time::timeout(limit, fut).await.unwrap_or_else(|_| {
                Err(MetricaError::network(
                    self.backend.name(),
                    format!("request timed out after {} ms", limit.as_millis()),
                ))
            }),
            None => fut.await,
        }
    }

    fn fail(&self, resource: &ResourceKey, job_id: Option<JobId>, error: &MetricaError) {
        if matches!(error, MetricaError::Superseded { .. }) {
            #[cfg(feature = "tracing")]
            tracing::debug!(resource = %resource, "superseded cycle ended");
            return;
        }
        #[cfg(feature = "tracing")]
        tracing::warn!(resource = %resource, job_id = ?job_id, error = %error, "job cycle failed");
        self.apply(Event::Failed {
            resource: resource.clone(),
            job_id,
            error: error.clone(),
        });
    }
}
