//! Background refresh of stale cache entries through the immediate path.

use std::sync::{Arc, Weak};

use metrica_core::{
    CacheEntry, CacheInfo, CacheKey, DateRange, EntryOrigin, ImmediateRequest, ImmediateResponse,
    MetricaError, RefreshOutcome, ResourceKey, TaskHandle, reconcile_all, require_snapshot,
};
use tokio::time::MissedTickBehavior;

use crate::core::{Inner, lock};
use crate::state::Event;

impl Inner {
    /// Queue a background refresh of `entry` when it is stale and its
    /// cooldown allows another attempt.
    pub(crate) fn maybe_refresh(self: &Arc<Self>, entry: &CacheEntry) -> bool {
        if !self.freshness.should_refresh(entry) {
            return false;
        }
        self.spawn_refresh(entry.key())
    }

    fn spawn_refresh(self: &Arc<Self>, key: CacheKey) -> bool {
        let mut tasks = lock(&self.refreshes);
        tasks.retain(|_, task| !task.is_finished());
        if tasks.contains_key(&key) {
            return false;
        }
        let inner = Arc::clone(self);
        let task_key = key.clone();
        tasks.insert(
            key,
            TaskHandle::spawn(async move {
                let _ = inner.refresh(task_key).await;
            }),
        );
        true
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "metrica::refresh",
            skip_all,
            fields(resource = %key.resource, range = %key.range),
        )
    )]
    pub(crate) async fn refresh(&self, key: CacheKey) -> RefreshOutcome {
        if self.guard.is_active(&key.resource) || self.cache.get_exact(&key).is_none() {
            return RefreshOutcome::Skipped;
        }
        let snapshot = match require_snapshot(self.backend.as_ref()) {
            Ok(snapshot) => snapshot,
            Err(error) => return RefreshOutcome::Failed { error },
        };
        if !self.apply(Event::RefreshStarted { key: key.clone() }) {
            return RefreshOutcome::Skipped;
        }

        let req = ImmediateRequest::refresh(key.range);
        let result = self.timed(snapshot.immediate_data(&key.resource, &req)).await;
        let (outcome, entry) = match result {
            Ok(resp) => {
                let entry = self.cache.put(self.entry_from_immediate(&key.resource, key.range, resp));
                #[cfg(feature = "tracing")]
                tracing::debug!(records = entry.records.len(), "cache entry refreshed");
                (RefreshOutcome::Refreshed, Some(entry))
            }
            Err(error) if error.is_recoverable() => {
                #[cfg(feature = "tracing")]
                tracing::warn!(error = %error, "refresh failed; keeping previous entry");
                (RefreshOutcome::UsedFallback { error }, None)
            }
            Err(error) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(error = %error, "refresh failed");
                (RefreshOutcome::Failed { error }, None)
            }
        };
        self.apply(Event::RefreshFinished {
            key,
            outcome: outcome.clone(),
            entry,
        });
        outcome
    }

    pub(crate) fn entry_from_immediate(
        &self,
        resource: &ResourceKey,
        range: DateRange,
        resp: ImmediateResponse,
    ) -> CacheEntry {
        let fetched_at = resp
            .cache_info
            .as_ref()
            .and_then(CacheInfo::cached_at_utc)
            .unwrap_or_else(|| self.clock.now());
        let records = reconcile_all(&resp.data)
            .into_iter()
            .filter(|r| r.date.is_none_or(|d| range.contains(d)))
            .collect();
        CacheEntry::new(
            resource.clone(),
            range,
            records,
            fetched_at,
            EntryOrigin::Immediate,
        )
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "metrica::prime",
            skip_all,
            fields(resource = %resource, range = %range),
        )
    )]
    pub(crate) async fn prime(
        &self,
        resource: ResourceKey,
        range: DateRange,
    ) -> Result<Arc<CacheEntry>, MetricaError> {
        let snapshot = require_snapshot(self.backend.as_ref())?;
        let resp = self
            .timed(snapshot.immediate_data(&resource, &ImmediateRequest::cached(range)))
            .await?;
        Ok(self
            .cache
            .put(self.entry_from_immediate(&resource, range, resp)))
    }

    pub(crate) fn check_freshness(self: &Arc<Self>) -> Vec<CacheKey> {
        let Some(selection) = self.selection() else {
            return Vec::new();
        };
        self.cache
            .entries(&selection.resource)
            .into_iter()
            .filter(|entry| self.maybe_refresh(entry))
            .map(|entry| entry.key())
            .collect()
    }

    pub(crate) fn start_freshness_sweep(self: &Arc<Self>) -> Result<(), MetricaError> {
        let Some(every) = self
            .cfg
            .freshness
            .check_interval
            .filter(|d| !d.is_zero())
        else {
            return Err(MetricaError::InvalidArg(
                "freshness.check_interval must be set and greater than zero".to_string(),
            ));
        };
        let weak: Weak<Self> = Arc::downgrade(self);
        let task = TaskHandle::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                let _queued = inner.check_freshness();
                #[cfg(feature = "tracing")]
                if !_queued.is_empty() {
                    tracing::debug!(queued = _queued.len(), "freshness sweep queued refreshes");
                }
            }
        });
        *lock(&self.sweep) = Some(task);
        Ok(())
    }

    pub(crate) async fn join_refreshes(&self) {
        let tasks: Vec<TaskHandle> = lock(&self.refreshes).drain().map(|(_, t)| t).collect();
        futures::future::join_all(tasks.into_iter().map(TaskHandle::join)).await;
    }
}
