//! DTOs of the immediate (non-job) data path.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::job::RawRecord;
use crate::range::DateRange;

/// Request for data served without a job cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImmediateRequest {
    /// First day requested.
    pub start_date: NaiveDate,
    /// Last day requested.
    pub end_date: NaiveDate,
    /// Accept the backend's own cached copy.
    #[serde(default)]
    pub last_cache: bool,
    /// Ask the backend to recompute and bypass its cache.
    #[serde(default)]
    pub force_refresh: bool,
}

impl ImmediateRequest {
    /// Read-through request that accepts the backend cache.
    #[must_use]
    pub fn cached(range: DateRange) -> Self {
        Self {
            start_date: range.start(),
            end_date: range.end(),
            last_cache: true,
            force_refresh: false,
        }
    }

    /// Request that forces fresh data.
    #[must_use]
    pub fn refresh(range: DateRange) -> Self {
        Self {
            start_date: range.start(),
            end_date: range.end(),
            last_cache: false,
            force_refresh: true,
        }
    }
}

/// Provenance of an immediate response.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CacheInfo {
    /// Where the backend took the data from (e.g. "cache", "database").
    #[serde(default)]
    pub source: Option<String>,
    /// When the backend computed the data. Naive timestamps are UTC.
    #[serde(default)]
    pub cached_at: Option<String>,
    /// Backend-side cache lifetime in hours.
    #[serde(default)]
    pub ttl_hours: Option<f64>,
}

impl CacheInfo {
    /// Parse `cached_at` as RFC 3339, falling back to a naive UTC timestamp.
    #[must_use]
    pub fn cached_at_utc(&self) -> Option<DateTime<Utc>> {
        let raw = self.cached_at.as_deref()?.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
            .map(|naive| naive.and_utc())
    }
}

/// Answer to an immediate request.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ImmediateResponse {
    /// Raw records.
    #[serde(default)]
    pub data: Vec<RawRecord>,
    /// Backend-computed summary, kept verbatim. Local summaries are always
    /// recomputed from records.
    #[serde(default)]
    pub summary: Option<serde_json::Value>,
    /// Provenance.
    #[serde(default)]
    pub cache_info: Option<CacheInfo>,
}
