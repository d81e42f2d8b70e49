use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use metrica_cache::{FreshnessMonitor, RangeCache};
use metrica_core::{
    CacheConfig, CacheEntry, CacheKey, CampaignBackend, Clock, DataSource, DateRange,
    EntryOrigin, FreshnessConfig, JobId, JobPhase, MemoryPreferenceStore, MetricaConfig,
    MetricaError, PollConfig, PreferenceStore, ProgressLabels, RefreshOutcome, ResourceKey,
    RetryConfig, SystemClock, TaskHandle,
};
use tokio::sync::watch;

use crate::guard::{ConcurrencyGuard, CycleSlot, Ticket};
use crate::snapshot::{DashboardSnapshot, Selection};
use crate::state::{Event, OrchestratorState};
use crate::view::DatasetView;

/// A dataset served by [`Metrica::load`].
#[derive(Debug, Clone, PartialEq)]
pub struct Loaded {
    /// What to display.
    pub view: DatasetView,
    /// Where the data came from.
    pub source: DataSource,
}

/// Controller that serves campaign datasets from cache or a job cycle.
///
/// Cheap to clone; clones share state, cache and background tasks.
#[derive(Clone)]
pub struct Metrica {
    pub(crate) inner: Arc<Inner>,
}

pub(crate) struct Inner {
    pub(crate) backend: Arc<dyn CampaignBackend>,
    pub(crate) cfg: MetricaConfig,
    pub(crate) cache: RangeCache,
    pub(crate) freshness: FreshnessMonitor,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) guard: ConcurrencyGuard,
    state: Mutex<OrchestratorState>,
    generation: watch::Sender<u64>,
    snapshots: watch::Sender<DashboardSnapshot>,
    preferences: Arc<dyn PreferenceStore>,
    cycles: Mutex<Vec<TaskHandle>>,
    pub(crate) refreshes: Mutex<HashMap<CacheKey, TaskHandle>>,
    pub(crate) sweep: Mutex<Option<TaskHandle>>,
}

pub(crate) fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Builder for constructing a [`Metrica`] controller.
pub struct MetricaBuilder {
    backend: Option<Arc<dyn CampaignBackend>>,
    cfg: MetricaConfig,
    clock: Option<Arc<dyn Clock>>,
    preferences: Option<Arc<dyn PreferenceStore>>,
}

impl Default for MetricaBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricaBuilder {
    /// Create a new builder with the reference timings.
    ///
    /// Behavior and trade-offs:
    /// - Starts without a backend; you must supply one via [`Self::with_backend`].
    /// - Polls every 3 s without a deadline, retries "not ready" results 10 times
    ///   3 s apart, and treats entries older than 4 h as stale.
    /// - The cache is unbounded and staleness uses the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self {
            backend: None,
            cfg: MetricaConfig::default(),
            clock: None,
            preferences: None,
        }
    }

    /// Register the backend that runs jobs and serves immediate data.
    #[must_use]
    pub fn with_backend(mut self, backend: Arc<dyn CampaignBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Replace the whole configuration.
    #[must_use]
    pub fn config(mut self, cfg: MetricaConfig) -> Self {
        self.cfg = cfg;
        self
    }

    /// Set the status polling cadence.
    ///
    /// Behavior and trade-offs:
    /// - Shorter intervals surface progress sooner at the cost of more status calls.
    /// - `max_wait` bounds the whole poll phase; without it a job that never
    ///   leaves `processing` is polled until it is superseded.
    #[must_use]
    pub const fn poll(mut self, poll: PollConfig) -> Self {
        self.cfg.poll = poll;
        self
    }

    /// Set the retry policy for results that are not ready yet.
    #[must_use]
    pub const fn retry(mut self, retry: RetryConfig) -> Self {
        self.cfg.retry = retry;
        self
    }

    /// Set the staleness policy.
    ///
    /// Behavior and trade-offs:
    /// - `max_age` decides when a served entry triggers a background refresh.
    /// - `retry_cooldown` spaces repeated refreshes of one entry; lowering it
    ///   retries failed refreshes sooner but adds backend load.
    /// - `check_interval` only takes effect once
    ///   [`Metrica::start_freshness_sweep`] is called.
    #[must_use]
    pub const fn freshness(mut self, freshness: FreshnessConfig) -> Self {
        self.cfg.freshness = freshness;
        self
    }

    /// Bound the range cache.
    #[must_use]
    pub const fn cache_config(mut self, cache: CacheConfig) -> Self {
        self.cfg.cache = cache;
        self
    }

    /// Override the progress texts.
    #[must_use]
    pub fn labels(mut self, labels: ProgressLabels) -> Self {
        self.cfg.labels = labels;
        self
    }

    /// Bound every individual backend call.
    ///
    /// Behavior and trade-offs:
    /// - An expired call fails with a `Network` error. During polling that only
    ///   skips a tick; during result fetching or submission it ends the cycle.
    #[must_use]
    pub const fn request_timeout(mut self, timeout: Duration) -> Self {
        self.cfg.request_timeout = Some(timeout);
        self
    }

    /// Inject the clock used for staleness and timestamps.
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Supply the layout-preference collaborator. Defaults to an in-memory store.
    #[must_use]
    pub fn preference_store(mut self, store: Arc<dyn PreferenceStore>) -> Self {
        self.preferences = Some(store);
        self
    }

    /// Build the controller.
    ///
    /// # Errors
    /// Returns `InvalidArg` if no backend was registered, if the poll interval
    /// is zero, or if the retry policy allows no attempt.
    pub fn build(self) -> Result<Metrica, MetricaError> {
        let Some(backend) = self.backend else {
            return Err(MetricaError::InvalidArg(
                "no backend registered; add one via with_backend(...)".to_string(),
            ));
        };
        if self.cfg.poll.interval.is_zero() {
            return Err(MetricaError::InvalidArg(
                "poll.interval must be greater than zero".to_string(),
            ));
        }
        if self.cfg.retry.max_attempts == 0 {
            return Err(MetricaError::InvalidArg(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }

        let clock: Arc<dyn Clock> = match self.clock {
            Some(clock) => clock,
            None => Arc::new(SystemClock),
        };
        let preferences: Arc<dyn PreferenceStore> = match self.preferences {
            Some(store) => store,
            None => Arc::new(MemoryPreferenceStore::new()),
        };
        let state = OrchestratorState::new();
        let (snapshots, _) = watch::channel(state.snapshot());
        let (generation, _) = watch::channel(state.generation());

        Ok(Metrica {
            inner: Arc::new(Inner {
                backend,
                cache: RangeCache::new(&self.cfg.cache),
                freshness: FreshnessMonitor::new(&self.cfg.freshness, Arc::clone(&clock)),
                clock,
                guard: ConcurrencyGuard::new(),
                state: Mutex::new(state),
                generation,
                snapshots,
                preferences,
                cycles: Mutex::new(Vec::new()),
                refreshes: Mutex::new(HashMap::new()),
                sweep: Mutex::new(None),
                cfg: self.cfg,
            }),
        })
    }
}

impl Metrica {
    /// Start building a new `Metrica` instance.
    ///
    /// ```rust,ignore
    /// use std::sync::Arc;
    /// use metrica::{DateRange, Metrica};
    /// use metrica_http::HttpBackend;
    ///
    /// let backend = HttpBackend::builder("https://api.example.com/")
    ///     .bearer_token("...")
    ///     .build()?;
    /// let metrica = Metrica::builder()
    ///     .with_backend(Arc::new(backend))
    ///     .build()?;
    /// let loaded = metrica
    ///     .load("acme_store", DateRange::parse("2024-01-01", "2024-01-31")?)
    ///     .await?;
    /// ```
    #[must_use]
    pub fn builder() -> MetricaBuilder {
        MetricaBuilder::new()
    }

    /// Select `resource` and `range` and serve them.
    ///
    /// A cache entry that covers the range is served at once (and refreshed in
    /// the background when stale). Otherwise a job cycle runs and the call
    /// resolves once its result is stored. Repeated calls for an unchanged
    /// selection join the running cycle instead of submitting another job.
    ///
    /// # Errors
    /// - `InvalidResourceKey` before anything else when `resource` is malformed.
    /// - `Superseded` when another selection replaced this one while waiting.
    /// - The cycle's terminal failure (`JobFailed`, `RetriesExhausted`,
    ///   `PollTimeout`, `Server`, `Network`, ...), which is also published in
    ///   the snapshot's `error`.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "metrica::load",
            skip_all,
            fields(resource = %resource, range = %range),
        )
    )]
    pub async fn load(&self, resource: &str, range: DateRange) -> Result<Loaded, MetricaError> {
        let resource = ResourceKey::parse(resource)?;
        let generation = self.inner.select(Selection {
            resource: resource.clone(),
            range,
        });
        self.inner.serve(resource, range, generation, true).await
    }

    /// Recompute the current selection with a new job, bypassing the cache.
    ///
    /// # Errors
    /// `InvalidArg` when nothing is selected, otherwise as [`Self::load`].
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "metrica::reload", skip(self))
    )]
    pub async fn reload(&self) -> Result<Loaded, MetricaError> {
        let (selection, generation) = {
            let mut state = lock(&self.inner.state);
            if !state.handle(Event::Reload) {
                return Err(MetricaError::InvalidArg("nothing is selected".to_string()));
            }
            self.inner.publish(&state);
            let Some(selection) = state.selection().cloned() else {
                return Err(MetricaError::InvalidArg("nothing is selected".to_string()));
            };
            (selection, state.generation())
        };
        self.inner.announce(&selection.resource, generation);
        self.inner
            .serve(selection.resource, selection.range, generation, false)
            .await
    }

    /// Refresh one cache entry right away through the immediate path.
    ///
    /// Returns `Skipped` when the entry does not exist, is already being
    /// refreshed, or its resource has a job cycle running.
    pub async fn refresh(&self, key: CacheKey) -> RefreshOutcome {
        self.inner.refresh(key).await
    }

    /// Queue background refreshes for the stale entries of the selected
    /// resource. Returns the keys that were queued.
    pub fn check_freshness(&self) -> Vec<CacheKey> {
        self.inner.check_freshness()
    }

    /// Start the periodic freshness sweep. Replaces a running sweep.
    ///
    /// # Errors
    /// `InvalidArg` when `freshness.check_interval` is unset or zero.
    pub fn start_freshness_sweep(&self) -> Result<(), MetricaError> {
        self.inner.start_freshness_sweep()
    }

    /// Wait for every background refresh queued so far.
    pub async fn join_refreshes(&self) {
        self.inner.join_refreshes().await;
    }

    /// Warm the cache for `resource` and `range` from the immediate path
    /// without a job cycle and without changing the selection.
    ///
    /// # Errors
    /// `InvalidResourceKey` for a malformed key, `Unsupported` when the backend
    /// has no immediate path, or the backend's failure.
    pub async fn prime(
        &self,
        resource: &str,
        range: DateRange,
    ) -> Result<Arc<CacheEntry>, MetricaError> {
        let resource = ResourceKey::parse(resource)?;
        self.inner.prime(resource, range).await
    }

    /// Subscribe to snapshot updates. The receiver starts at the current snapshot.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<DashboardSnapshot> {
        self.inner.snapshots.subscribe()
    }

    /// Latest published snapshot.
    #[must_use]
    pub fn snapshot(&self) -> DashboardSnapshot {
        self.inner.snapshots.borrow().clone()
    }

    /// Dataset on display, if any.
    #[must_use]
    pub fn current(&self) -> Option<DatasetView> {
        self.inner.snapshots.borrow().dataset.clone()
    }

    /// The range cache.
    #[must_use]
    pub fn cache(&self) -> &RangeCache {
        &self.inner.cache
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &MetricaConfig {
        &self.inner.cfg
    }

    /// The admission guard for job cycles.
    #[must_use]
    pub fn guard(&self) -> &ConcurrencyGuard {
        &self.inner.guard
    }

    /// Persist layout preferences for `table_id`.
    ///
    /// # Errors
    /// Whatever the preference store reports.
    pub async fn save_preferences(
        &self,
        table_id: &str,
        prefs: serde_json::Value,
    ) -> Result<(), MetricaError> {
        self.inner.preferences.save(table_id, prefs).await
    }

    /// Load layout preferences for `table_id`.
    ///
    /// # Errors
    /// Whatever the preference store reports.
    pub async fn load_preferences(
        &self,
        table_id: &str,
    ) -> Result<Option<serde_json::Value>, MetricaError> {
        self.inner.preferences.load(table_id).await
    }

    /// Cancel every job cycle, refresh and sweep owned by this controller.
    ///
    /// A job that was still processing ends as failed with
    /// [`MetricaError::Superseded`].
    pub fn shutdown(&self) {
        let cycles = std::mem::take(&mut *lock(&self.inner.cycles));
        let refreshes = std::mem::take(&mut *lock(&self.inner.refreshes));
        let sweep = lock(&self.inner.sweep).take();
        for task in cycles
            .into_iter()
            .chain(refreshes.into_values())
            .chain(sweep)
        {
            task.cancel();
        }
        let snapshot = self.snapshot();
        if snapshot.phase == JobPhase::Processing
            && let Some(job) = snapshot.job
        {
            self.inner.apply(Event::Failed {
                error: MetricaError::superseded(job.resource_key.as_str()),
                resource: job.resource_key,
                job_id: Some(job.id),
            });
        }
    }
}

impl std::fmt::Debug for Metrica {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrica")
            .field("backend", &self.inner.backend.name())
            .field("cache", &self.inner.cache)
            .field("guard", &self.inner.guard)
            .finish_non_exhaustive()
    }
}

impl Inner {
    pub(crate) fn publish(&self, state: &OrchestratorState) {
        self.snapshots.send_replace(state.snapshot());
    }

    /// Apply `event` and publish a snapshot when it changed anything.
    pub(crate) fn apply(&self, event: Event) -> bool {
        let mut state = lock(&self.state);
        let applied = state.handle(event);
        if applied {
            self.publish(&state);
        }
        applied
    }

    pub(crate) fn is_selected(&self, resource: &ResourceKey) -> bool {
        lock(&self.state).is_selected(resource)
    }

    pub(crate) fn selection(&self) -> Option<Selection> {
        lock(&self.state).selection().cloned()
    }

    fn select(&self, selection: Selection) -> u64 {
        let resource = selection.resource.clone();
        let generation = {
            let mut state = lock(&self.state);
            if state.handle(Event::Select(selection)) {
                self.publish(&state);
            }
            state.generation()
        };
        self.announce(&resource, generation);
        generation
    }

    fn announce(&self, resource: &ResourceKey, generation: u64) {
        self.generation.send_if_modified(|current| {
            if *current == generation {
                return false;
            }
            *current = generation;
            true
        });
        self.guard.supersede(resource);
        self.guard.retain_generation(generation);
    }

    /// Resolves once the selection generation differs from `generation`.
    pub(crate) async fn generation_moved(&self, generation: u64) {
        let mut rx = self.generation.subscribe();
        let _ = rx.wait_for(|g| *g != generation).await;
    }

    /// Resolves once `resource` stops being the selected resource.
    pub(crate) async fn key_superseded(&self, resource: &ResourceKey) {
        let mut rx = self.generation.subscribe();
        while self.is_selected(resource) {
            if rx.changed().await.is_err() {
                return;
            }
        }
    }

    /// Store a job's entry and mark the job completed, unless the job stopped
    /// being current while its result was downloaded.
    pub(crate) fn commit_job_result(
        &self,
        job_id: &JobId,
        entry: CacheEntry,
    ) -> Result<Arc<CacheEntry>, MetricaError> {
        let key = entry.key();
        let stored = {
            let mut state = lock(&self.state);
            if !state.is_current_job(job_id) {
                return Err(MetricaError::superseded(entry.resource.as_str()));
            }
            let stored = self.cache.put(entry);
            state.handle(Event::Completed {
                job_id: job_id.clone(),
            });
            self.publish(&state);
            stored
        };
        self.freshness.forget(&key);
        Ok(stored)
    }

    async fn serve(
        self: &Arc<Self>,
        resource: ResourceKey,
        range: DateRange,
        generation: u64,
        use_cache: bool,
    ) -> Result<Loaded, MetricaError> {
        let mut use_cache = use_cache;
        loop {
            if use_cache && let Some(hit) = self.cache.lookup(&resource, &range) {
                #[cfg(feature = "tracing")]
                tracing::debug!(
                    resource = %resource,
                    coverage = hit.coverage,
                    exact = hit.exact,
                    "cache hit"
                );
                let view = DatasetView::new(Arc::clone(&hit.entry), range);
                self.maybe_refresh(&hit.entry);
                self.apply(Event::Served {
                    generation,
                    view: view.clone(),
                });
                return Ok(Loaded {
                    view,
                    source: DataSource::Cache {
                        coverage: hit.coverage,
                        exact: hit.exact,
                    },
                });
            }
            #[cfg(feature = "tracing")]
            if use_cache {
                tracing::debug!(resource = %resource, range = %range, "cache miss");
            }
            use_cache = true;

            let ticket = tokio::select! {
                ticket = self.guard.admit_or_wait(&resource, generation) => ticket,
                () = self.generation_moved(generation) => {
                    return Err(MetricaError::superseded(resource.as_str()));
                }
            };
            let waiter = match ticket {
                Ticket::Lead(slot) => {
                    let waiter = slot.waiter();
                    self.spawn_cycle(slot, range);
                    waiter
                }
                Ticket::Follow(waiter) => waiter,
            };
            let entry = tokio::select! {
                outcome = waiter.outcome() => outcome?,
                () = self.generation_moved(generation) => {
                    return Err(MetricaError::superseded(resource.as_str()));
                }
            };
            if *self.generation.borrow() != generation {
                return Err(MetricaError::superseded(resource.as_str()));
            }
            if entry.range.covers(&range) {
                let source = match &entry.origin {
                    EntryOrigin::Job { job_id } => DataSource::Job {
                        job_id: job_id.clone(),
                    },
                    EntryOrigin::Immediate => DataSource::Immediate,
                };
                let view = DatasetView::new(entry, range);
                self.apply(Event::Served {
                    generation,
                    view: view.clone(),
                });
                return Ok(Loaded { view, source });
            }
        }
    }

    fn spawn_cycle(self: &Arc<Self>, slot: CycleSlot, range: DateRange) {
        let inner = Arc::clone(self);
        let resource = slot.key().resource.clone();
        let task = TaskHandle::spawn(async move {
            let outcome = inner.run_cycle(&resource, range).await;
            slot.finish(outcome);
        });
        let mut cycles = lock(&self.cycles);
        cycles.retain(|t| !t.is_finished());
        cycles.push(task);
    }
}
