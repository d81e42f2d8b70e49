use std::sync::Arc;

use metrica_types::{CacheConfig, CacheEntry, CacheKey, DateRange, ResourceKey};
use moka::policy::EvictionPolicy;
use moka::sync::Cache;

/// A cache entry selected for a query range.
#[derive(Debug, Clone)]
pub struct CacheHit {
    /// The covering entry.
    pub entry: Arc<CacheEntry>,
    /// Share of the entry's span the query occupies, in `(0, 1]`.
    pub coverage: f64,
    /// True when the entry's range equals the query range.
    pub exact: bool,
}

/// Store of reconciled datasets keyed by resource and exact date range.
///
/// Entries are immutable and replaced wholesale by [`RangeCache::put`]; no
/// two entries are ever merged. Clones share the same storage.
#[derive(Clone)]
pub struct RangeCache {
    store: Cache<CacheKey, Arc<CacheEntry>>,
}

impl Default for RangeCache {
    fn default() -> Self {
        Self::new(&CacheConfig::default())
    }
}

impl std::fmt::Debug for RangeCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RangeCache")
            .field("entries", &self.store.entry_count())
            .finish()
    }
}

impl RangeCache {
    /// Build a cache. Without bounds in `cfg` it never evicts.
    #[must_use]
    pub fn new(cfg: &CacheConfig) -> Self {
        let mut builder = Cache::builder();
        if let Some(max) = cfg.max_entries {
            builder = builder
                .max_capacity(max)
                .eviction_policy(EvictionPolicy::lru());
        }
        if let Some(tti) = cfg.time_to_idle {
            builder = builder.time_to_idle(tti);
        }
        Self {
            store: builder.build(),
        }
    }

    /// Store `entry` under its own exact range, replacing any previous entry
    /// for that key.
    pub fn put(&self, entry: CacheEntry) -> Arc<CacheEntry> {
        let entry = Arc::new(entry);
        #[cfg(feature = "tracing")]
        tracing::debug!(
            resource = %entry.resource,
            range = %entry.range,
            records = entry.records.len(),
            "cache put"
        );
        self.store.insert(entry.key(), Arc::clone(&entry));
        entry
    }

    /// Entry stored under exactly `key`.
    #[must_use]
    pub fn get_exact(&self, key: &CacheKey) -> Option<Arc<CacheEntry>> {
        self.store.get(key)
    }

    /// Find an entry that fully covers `query` for `resource`.
    ///
    /// An exact key match wins. Otherwise the covering entry with the
    /// smallest span (largest coverage) is chosen; among equal spans the most
    /// recently fetched one.
    #[must_use]
    pub fn lookup(&self, resource: &ResourceKey, query: &DateRange) -> Option<CacheHit> {
        let exact_key = CacheKey {
            resource: resource.clone(),
            range: *query,
        };
        if let Some(entry) = self.store.get(&exact_key) {
            #[cfg(feature = "tracing")]
            tracing::debug!(resource = %resource, range = %query, "cache hit (exact)");
            return Some(CacheHit {
                entry,
                coverage: 1.0,
                exact: true,
            });
        }

        let best = self
            .store
            .iter()
            .filter(|(k, _)| &k.resource == resource)
            .filter_map(|(_, entry)| {
                let coverage = entry.range.coverage_of(query)?;
                Some((coverage, entry))
            })
            .max_by(|(ca, ea), (cb, eb)| {
                ca.total_cmp(cb)
                    .then_with(|| ea.fetched_at.cmp(&eb.fetched_at))
            });

        let Some((coverage, entry)) = best else {
            #[cfg(feature = "tracing")]
            tracing::debug!(resource = %resource, range = %query, "cache miss");
            return None;
        };
        // Register the read so idle and LRU bookkeeping see it.
        let _ = self.store.get(&entry.key());
        #[cfg(feature = "tracing")]
        tracing::debug!(
            resource = %resource,
            range = %query,
            entry_range = %entry.range,
            coverage,
            "cache hit (covering)"
        );
        Some(CacheHit {
            entry,
            coverage,
            exact: false,
        })
    }

    /// All entries for `resource`, most recently fetched first.
    #[must_use]
    pub fn entries(&self, resource: &ResourceKey) -> Vec<Arc<CacheEntry>> {
        let mut out: Vec<Arc<CacheEntry>> = self
            .store
            .iter()
            .filter(|(k, _)| &k.resource == resource)
            .map(|(_, v)| v)
            .collect();
        out.sort_by(|a, b| b.fetched_at.cmp(&a.fetched_at));
        out
    }

    /// Remove the entry stored under `key`.
    pub fn invalidate(&self, key: &CacheKey) {
        self.store.invalidate(key);
    }

    /// Remove every entry for `resource`.
    pub fn invalidate_resource(&self, resource: &ResourceKey) {
        let keys: Vec<Arc<CacheKey>> = self
            .store
            .iter()
            .filter(|(k, _)| &k.resource == resource)
            .map(|(k, _)| k)
            .collect();
        for k in keys {
            self.store.invalidate(k.as_ref());
        }
    }

    /// Remove everything.
    pub fn clear(&self) {
        self.store.invalidate_all();
    }

    /// Apply pending evictions now. Maintenance otherwise runs amortized over
    /// later cache operations.
    pub fn run_pending_tasks(&self) {
        self.store.run_pending_tasks();
    }

    /// Number of live entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.store.iter().count()
    }

    /// True when no entry is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.store.iter().next().is_none()
    }
}
