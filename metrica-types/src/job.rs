//! Remote compute jobs and the DTOs of the job protocol.

use core::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::range::DateRange;
use crate::resource::ResourceKey;

/// Raw backend record: a loosely-typed JSON object.
pub type RawRecord = serde_json::Map<String, serde_json::Value>;

/// Identifier assigned by the backend to a submitted job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    /// Wrap a backend-assigned id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the id text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Status reported by the backend for a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Still computing.
    #[serde(alias = "pending", alias = "queued", alias = "running")]
    Processing,
    /// Result available (possibly after a short delay).
    Completed,
    /// Backend reported an error.
    Error,
    /// Backend reported a failure.
    Failed,
}

impl JobStatus {
    /// True for every status except `Processing`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Processing)
    }

    /// True for `Error` and `Failed`.
    #[must_use]
    pub const fn is_failure(self) -> bool {
        matches!(self, Self::Error | Self::Failed)
    }
}

/// Lifecycle phase of the orchestrator's current job cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobPhase {
    /// No job submitted.
    #[default]
    Idle,
    /// Submitted and being polled or downloaded.
    Processing,
    /// Result stored in the cache.
    Completed,
    /// Failed terminally.
    Error,
}

/// Client-side view of a submitted job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// Backend-assigned id.
    pub id: JobId,
    /// Dataset being computed.
    pub resource_key: ResourceKey,
    /// Last status reported by the backend.
    pub status: JobStatus,
    /// Last human-readable progress text.
    pub progress_text: String,
    /// Seconds since the backend started the job.
    pub elapsed_seconds: f64,
    /// When the job was submitted.
    pub created_at: DateTime<Utc>,
}

/// Job submission request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSpec {
    /// Dataset to compute.
    pub resource_key: ResourceKey,
    /// Optional range hint; backends may compute a wider range.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<DateRange>,
}

/// Acknowledgement of a job submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobTicket {
    /// Backend-assigned id.
    pub job_id: JobId,
}

/// Answer to a status request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobStatusReport {
    /// Current status.
    pub status: JobStatus,
    /// Optional human-readable progress.
    #[serde(default)]
    pub progress: Option<String>,
    /// Optional seconds since the job started.
    #[serde(default)]
    pub elapsed_seconds: Option<f64>,
}

impl JobStatusReport {
    /// Report with no progress details.
    #[must_use]
    pub const fn bare(status: JobStatus) -> Self {
        Self {
            status,
            progress: None,
            elapsed_seconds: None,
        }
    }
}

/// Completed job output.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct JobResult {
    /// Raw records.
    #[serde(default)]
    pub data: Vec<RawRecord>,
    /// Record count as reported by the backend.
    #[serde(default)]
    pub count: u64,
}
