//! Outcome reports returned by the orchestrator.

use serde::{Deserialize, Serialize};

use crate::job::JobId;
use crate::MetricaError;

/// Where a served dataset came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum DataSource {
    /// An existing cache entry.
    Cache {
        /// Share of the entry's span the query occupies.
        coverage: f64,
        /// True when the entry's range equals the query range.
        exact: bool,
    },
    /// A job cycle run for this request.
    Job {
        /// Job that produced the data.
        job_id: JobId,
    },
    /// The immediate path.
    Immediate,
}

/// Result of a background refresh attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum RefreshOutcome {
    /// The entry was replaced with fresh data.
    Refreshed,
    /// A recoverable failure; the previous entry stays authoritative.
    UsedFallback {
        /// What went wrong.
        error: MetricaError,
    },
    /// A non-recoverable failure; the previous entry stays but the failure
    /// is reported as-is.
    Failed {
        /// What went wrong.
        error: MetricaError,
    },
    /// Nothing to do: the entry is fresh, already being refreshed, or was
    /// refreshed recently.
    Skipped,
}

impl RefreshOutcome {
    /// True when the previous entry was kept because of a recoverable failure.
    #[must_use]
    pub const fn used_fallback(&self) -> bool {
        matches!(self, Self::UsedFallback { .. })
    }
}
