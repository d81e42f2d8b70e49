use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unified error type for the metrica workspace.
///
/// Covers validation failures, the job protocol's transient and terminal
/// outcomes, and transport-level failures reported by a backend.
#[derive(Debug, Error, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum MetricaError {
    /// The resource key is empty or malformed; raised before any job is submitted.
    #[error("invalid resource key: {reason}")]
    InvalidResourceKey {
        /// Why the key was rejected.
        reason: String,
    },

    /// Invalid input argument.
    #[error("invalid argument: {0}")]
    InvalidArg(String),

    /// The job result was requested before the backend reflected its completion.
    #[error("result for job {job_id} is not ready yet")]
    NotReady {
        /// Job whose result is pending.
        job_id: String,
    },

    /// The backend reported the job as `error` or `failed`.
    #[error("job {job_id} failed: {progress}")]
    JobFailed {
        /// Job that failed.
        job_id: String,
        /// Last progress text observed before the failure.
        progress: String,
    },

    /// The result fetcher gave up after the configured number of attempts.
    #[error("result for job {job_id} still unavailable after {attempts} attempts")]
    RetriesExhausted {
        /// Job whose result never became available.
        job_id: String,
        /// Attempts made.
        attempts: u32,
    },

    /// Polling exceeded the configured maximum wait.
    #[error("job {job_id} still processing after {waited_ms} ms")]
    PollTimeout {
        /// Job that was still processing.
        job_id: String,
        /// Milliseconds spent polling.
        waited_ms: u64,
    },

    /// The backend answered with a non-success HTTP status.
    #[error("{backend} answered with status {status}: {msg}")]
    Server {
        /// Backend name.
        backend: String,
        /// HTTP status code.
        status: u16,
        /// Response body or reason phrase.
        msg: String,
    },

    /// The request never produced a response (connect, DNS, timeout).
    #[error("network failure talking to {backend}: {msg}")]
    Network {
        /// Backend name.
        backend: String,
        /// Transport error description.
        msg: String,
    },

    /// Issues with the returned or expected data (missing fields, etc.).
    #[error("data issue: {0}")]
    Data(String),

    /// A resource could not be found.
    #[error("not found: {what}")]
    NotFound {
        /// Description of the missing resource.
        what: String,
    },

    /// The work belonged to a selection that is no longer current.
    #[error("work for {resource} was superseded by a newer selection")]
    Superseded {
        /// Resource whose work was discarded.
        resource: String,
    },

    /// The backend does not implement the requested role.
    #[error("unsupported capability: {capability}")]
    Unsupported {
        /// Capability label, e.g. "jobs" or "snapshot".
        capability: String,
    },

    /// Unknown/opaque error.
    #[error("unknown error: {0}")]
    Other(String),
}

impl MetricaError {
    /// Helper: build an `InvalidResourceKey` error.
    pub fn invalid_key(reason: impl Into<String>) -> Self {
        Self::InvalidResourceKey {
            reason: reason.into(),
        }
    }

    /// Helper: build a `NotReady` error for a job id.
    pub fn not_ready(job_id: impl Into<String>) -> Self {
        Self::NotReady {
            job_id: job_id.into(),
        }
    }

    /// Helper: build a `JobFailed` error carrying the last progress text.
    pub fn job_failed(job_id: impl Into<String>, progress: impl Into<String>) -> Self {
        Self::JobFailed {
            job_id: job_id.into(),
            progress: progress.into(),
        }
    }

    /// Helper: build a `Server` error.
    pub fn server(backend: impl Into<String>, status: u16, msg: impl Into<String>) -> Self {
        Self::Server {
            backend: backend.into(),
            status,
            msg: msg.into(),
        }
    }

    /// Helper: build a `Network` error.
    pub fn network(backend: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Network {
            backend: backend.into(),
            msg: msg.into(),
        }
    }

    /// Helper: build a `Superseded` error.
    pub fn superseded(resource: impl Into<String>) -> Self {
        Self::Superseded {
            resource: resource.into(),
        }
    }

    /// Helper: build a `NotFound` error.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    /// Helper: build an `Unsupported` error.
    pub fn unsupported(capability: impl Into<String>) -> Self {
        Self::Unsupported {
            capability: capability.into(),
        }
    }

    /// Returns true for the one condition the result fetcher retries locally.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::NotReady { .. })
    }

    /// Returns true for failures a background refresh recovers from by keeping
    /// the previous cache entry: 5xx answers and network failures.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        match self {
            Self::Server { status, .. } => *status >= 500,
            Self::Network { .. } => true,
            _ => false,
        }
    }

    /// Returns true if this error ends a job cycle for the caller.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::NotReady { .. } | Self::Superseded { .. })
    }
}
