//! Cached datasets.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::job::JobId;
use crate::range::DateRange;
use crate::record::CampaignRecord;
use crate::resource::ResourceKey;
use crate::summary::Summary;

/// Exact identity of a cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    /// Dataset.
    pub resource: ResourceKey,
    /// Range the entry was fetched for.
    pub range: DateRange,
}

/// How an entry's data was obtained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum EntryOrigin {
    /// A completed job cycle.
    Job {
        /// Job that produced the data.
        job_id: JobId,
    },
    /// The immediate path (priming or background refresh).
    Immediate,
}

/// A reconciled dataset for one resource and range.
///
/// Entries are replaced wholesale and never modified in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Dataset.
    pub resource: ResourceKey,
    /// Range the entry covers.
    pub range: DateRange,
    /// Reconciled records.
    pub records: Arc<[CampaignRecord]>,
    /// Summary over all `records`.
    pub summary: Summary,
    /// When the data was computed.
    pub fetched_at: DateTime<Utc>,
    /// Provenance.
    pub origin: EntryOrigin,
}

impl CacheEntry {
    /// Build an entry, computing its summary from `records`.
    #[must_use]
    pub fn new(
        resource: ResourceKey,
        range: DateRange,
        records: Vec<CampaignRecord>,
        fetched_at: DateTime<Utc>,
        origin: EntryOrigin,
    ) -> Self {
        let summary = Summary::of(&records);
        Self {
            resource,
            range,
            records: records.into(),
            summary,
            fetched_at,
            origin,
        }
    }

    /// Exact key of this entry.
    #[must_use]
    pub fn key(&self) -> CacheKey {
        CacheKey {
            resource: self.resource.clone(),
            range: self.range,
        }
    }
}
