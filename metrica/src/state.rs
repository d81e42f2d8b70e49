//! Orchestration state and its transitions.
//!
//! All mutable orchestration state lives in one [`OrchestratorState`]. Every
//! change goes through [`OrchestratorState::handle`], which also enforces the
//! current-job marker: events carrying a job id that is no longer current are
//! ignored.

use std::collections::HashSet;
use std::sync::Arc;

use metrica_core::{
    CacheEntry, CacheKey, Job, JobId, JobPhase, JobStatus, MetricaError, RefreshOutcome,
    ResourceKey,
};

use crate::snapshot::{DashboardSnapshot, Selection};
use crate::view::DatasetView;

/// Inputs to the state machine.
#[derive(Debug, Clone)]
pub enum Event {
    /// The UI selected a resource and range.
    Select(Selection),
    /// The UI asked to recompute the current selection.
    Reload,
    /// The backend accepted a job for the selected resource.
    Submitted {
        /// The new current job.
        job: Job,
    },
    /// A status answer arrived.
    Progress {
        /// Job the answer is about.
        job_id: JobId,
        /// Reported status.
        status: JobStatus,
        /// Formatted progress text.
        text: String,
        /// Reported elapsed seconds.
        elapsed_seconds: Option<f64>,
    },
    /// Polling ended and the result is being downloaded.
    Downloading {
        /// Job being downloaded.
        job_id: JobId,
        /// Progress text to show.
        text: String,
    },
    /// The job's result was stored in the cache.
    Completed {
        /// Job that completed.
        job_id: JobId,
    },
    /// A job cycle failed terminally.
    Failed {
        /// Resource the cycle was for.
        resource: ResourceKey,
        /// Job, when submission had succeeded.
        job_id: Option<JobId>,
        /// What went wrong.
        error: MetricaError,
    },
    /// A dataset was served for a selection generation.
    Served {
        /// Generation the request was made under.
        generation: u64,
        /// What to display.
        view: DatasetView,
    },
    /// A background refresh is about to call the backend.
    RefreshStarted {
        /// Entry being refreshed.
        key: CacheKey,
    },
    /// A background refresh ended.
    RefreshFinished {
        /// Entry that was refreshed.
        key: CacheKey,
        /// How it ended.
        outcome: RefreshOutcome,
        /// The replacement entry on success.
        entry: Option<Arc<CacheEntry>>,
    },
}

/// Shared orchestration state. Held behind a mutex that is never held across
/// an `.await`.
#[derive(Debug, Default)]
pub struct OrchestratorState {
    generation: u64,
    selection: Option<Selection>,
    phase: JobPhase,
    job: Option<Job>,
    progress_text: String,
    elapsed_seconds: Option<f64>,
    error: Option<String>,
    dataset: Option<DatasetView>,
    used_fallback: bool,
    refreshing: HashSet<CacheKey>,
}

impl OrchestratorState {
    /// Fresh state with nothing selected.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply `event`. Returns `false` when the event was stale or a no-op.
    pub fn handle(&mut self, event: Event) -> bool {
        match event {
            Event::Select(selection) => self.select(selection),
            Event::Reload => self.reload(),
            Event::Submitted { job } => self.submitted(job),
            Event::Progress {
                job_id,
                status,
                text,
                elapsed_seconds,
            } => self.progress(&job_id, status, text, elapsed_seconds),
            Event::Downloading { job_id, text } => {
                if !self.is_current_job(&job_id) {
                    return false;
                }
                if let Some(job) = self.job.as_mut() {
                    job.progress_text.clone_from(&text);
                }
                self.progress_text = text;
                true
            }
            Event::Completed { job_id } => {
                if !self.is_current_job(&job_id) {
                    return false;
                }
                if let Some(job) = self.job.as_mut() {
                    job.status = JobStatus::Completed;
                }
                self.phase = JobPhase::Completed;
                true
            }
            Event::Failed {
                resource,
                job_id,
                error,
            } => self.failed(&resource, job_id.as_ref(), &error),
            Event::Served { generation, view } => {
                if generation != self.generation {
                    return false;
                }
                if self.phase != JobPhase::Processing {
                    self.phase = JobPhase::Completed;
                }
                self.error = None;
                self.dataset = Some(view);
                true
            }
            Event::RefreshStarted { key } => self.refreshing.insert(key),
            Event::RefreshFinished {
                key,
                outcome,
                entry,
            } => self.refresh_finished(&key, &outcome, entry),
        }
    }

    fn select(&mut self, selection: Selection) -> bool {
        if self.selection.as_ref() == Some(&selection) {
            return false;
        }
        let key_changed = self
            .selection
            .as_ref()
            .is_none_or(|s| s.resource != selection.resource);
        self.generation += 1;
        if key_changed {
            self.phase = JobPhase::Idle;
            self.job = None;
            self.progress_text.clear();
            self.elapsed_seconds = None;
            self.error = None;
            self.dataset = None;
            self.used_fallback = false;
        } else if self.phase == JobPhase::Error {
            self.phase = JobPhase::Idle;
            self.error = None;
        }
        self.selection = Some(selection);
        true
    }

    fn reload(&mut self) -> bool {
        if self.selection.is_none() {
            return false;
        }
        self.generation += 1;
        if self.phase == JobPhase::Error {
            self.phase = JobPhase::Idle;
            self.error = None;
        }
        true
    }

    fn submitted(&mut self, job: Job) -> bool {
        if !self.is_selected(&job.resource_key) {
            return false;
        }
        self.phase = JobPhase::Processing;
        self.progress_text.clone_from(&job.progress_text);
        self.elapsed_seconds = None;
        self.error = None;
        self.job = Some(job);
        true
    }

    fn progress(
        &mut self,
        job_id: &JobId,
        status: JobStatus,
        text: String,
        elapsed_seconds: Option<f64>,
    ) -> bool {
        if !self.is_current_job(job_id) {
            return false;
        }
        if let Some(job) = self.job.as_mut() {
            job.status = status;
            job.progress_text.clone_from(&text);
            if let Some(secs) = elapsed_seconds {
                job.elapsed_seconds = secs;
            }
        }
        if elapsed_seconds.is_some() {
            self.elapsed_seconds = elapsed_seconds;
        }
        self.progress_text = text;
        true
    }

    fn failed(&mut self, resource: &ResourceKey, job_id: Option<&JobId>, error: &MetricaError) -> bool {
        let applies = match job_id {
            Some(id) => self.is_current_job(id),
            None => self.is_selected(resource),
        };
        if !applies {
            return false;
        }
        if let Some(job) = self.job.as_mut()
            && job_id.is_some()
            && !job.status.is_failure()
        {
            job.status = JobStatus::Error;
        }
        self.phase = JobPhase::Error;
        self.error = Some(error.to_string());
        true
    }

    fn refresh_finished(
        &mut self,
        key: &CacheKey,
        outcome: &RefreshOutcome,
        entry: Option<Arc<CacheEntry>>,
    ) -> bool {
        self.refreshing.remove(key);
        let selected = self.is_selected(&key.resource);
        match (outcome, entry) {
            (RefreshOutcome::Refreshed, Some(entry)) => {
                if let Some(view) = self.dataset.as_ref()
                    && view.entry().resource == key.resource
                    && view.entry().range == key.range
                {
                    self.dataset = Some(view.rebased(entry));
                }
                if selected {
                    self.used_fallback = false;
                }
            }
            (RefreshOutcome::UsedFallback { .. }, _) => {
                if selected {
                    self.used_fallback = true;
                }
            }
            _ => {}
        }
        true
    }

    /// Current selection generation.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Current selection.
    #[must_use]
    pub const fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    /// Current cycle phase.
    #[must_use]
    pub const fn phase(&self) -> JobPhase {
        self.phase
    }

    /// True when `resource` is the selected resource.
    #[must_use]
    pub fn is_selected(&self, resource: &ResourceKey) -> bool {
        self.selection
            .as_ref()
            .is_some_and(|s| &s.resource == resource)
    }

    /// True when `job_id` is the current job marker and it is still processing.
    #[must_use]
    pub fn is_current_job(&self, job_id: &JobId) -> bool {
        self.phase == JobPhase::Processing && self.job.as_ref().is_some_and(|j| &j.id == job_id)
    }

    /// True while a background refresh of `key` is in flight.
    #[must_use]
    pub fn is_refreshing(&self, key: &CacheKey) -> bool {
        self.refreshing.contains(key)
    }

    /// Copy of the observable state.
    #[must_use]
    pub fn snapshot(&self) -> DashboardSnapshot {
        DashboardSnapshot {
            generation: self.generation,
            selection: self.selection.clone(),
            phase: self.phase,
            job: self.job.clone(),
            progress_text: self.progress_text.clone(),
            elapsed_seconds: self.elapsed_seconds,
            error: self.error.clone(),
            dataset: self.dataset.clone(),
            used_fallback: self.used_fallback,
            refreshing: !self.refreshing.is_empty(),
        }
    }
}
