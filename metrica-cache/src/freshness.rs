use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use metrica_core::Clock;
use metrica_types::{CacheEntry, CacheKey, FreshnessConfig};

fn to_delta(d: Duration) -> TimeDelta {
    TimeDelta::from_std(d).unwrap_or(TimeDelta::MAX)
}

/// Judges entry age and rations background refreshes.
///
/// A stale entry is admitted for refresh once; further checks of the same
/// key are refused until `retry_cooldown` has passed, even if the entry was
/// replaced in between by one that is itself already stale. [`forget`]
/// clears the bookkeeping for a key.
///
/// [`forget`]: FreshnessMonitor::forget
#[derive(Debug)]
pub struct FreshnessMonitor {
    clock: Arc<dyn Clock>,
    max_age: TimeDelta,
    retry_cooldown: TimeDelta,
    attempts: Mutex<HashMap<CacheKey, DateTime<Utc>>>,
}

impl FreshnessMonitor {
    /// Build a monitor reading time from `clock`.
    #[must_use]
    pub fn new(cfg: &FreshnessConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            max_age: to_delta(cfg.max_age),
            retry_cooldown: to_delta(cfg.retry_cooldown),
            attempts: Mutex::new(HashMap::new()),
        }
    }

    /// Current time according to the injected clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Age of `entry`; negative ages (clock skew) read as zero.
    #[must_use]
    pub fn age(&self, entry: &CacheEntry) -> TimeDelta {
        (self.now() - entry.fetched_at).max(TimeDelta::zero())
    }

    /// True when `entry` is older than the configured maximum age.
    #[must_use]
    pub fn is_stale(&self, entry: &CacheEntry) -> bool {
        self.age(entry) > self.max_age
    }

    /// Admit a refresh of `entry` if it is stale and no refresh of its key was
    /// admitted within the cooldown. Admission is recorded.
    pub fn should_refresh(&self, entry: &CacheEntry) -> bool {
        if !self.is_stale(entry) {
            return false;
        }
        let now = self.now();
        let key = entry.key();
        let mut attempts = self.attempts.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(prev) = attempts.get(&key)
            && now - *prev < self.retry_cooldown
        {
            #[cfg(feature = "tracing")]
            tracing::debug!(resource = %entry.resource, range = %entry.range, "refresh already attempted within cooldown");
            return false;
        }
        attempts.insert(key, now);
        #[cfg(feature = "tracing")]
        tracing::info!(resource = %entry.resource, range = %entry.range, fetched_at = %entry.fetched_at, "stale entry admitted for refresh");
        true
    }

    /// Drop bookkeeping for `key`.
    pub fn forget(&self, key: &CacheKey) {
        self.attempts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }
}
