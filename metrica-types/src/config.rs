//! Configuration types shared across the orchestrator, cache and backends.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Timing of the job status poller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollConfig {
    /// Delay between status checks. The first check is issued immediately.
    pub interval: Duration,
    /// Optional bound on the whole poll phase. `None` polls until the backend
    /// reports a terminal status or the job is superseded.
    pub max_wait: Option<Duration>,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(3000),
            max_wait: None,
        }
    }
}

/// Retry policy for "result not ready yet" answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts, including the first one (>= 1).
    pub max_attempts: u32,
    /// Fixed delay between attempts.
    pub delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            delay: Duration::from_millis(3000),
        }
    }
}

/// Staleness policy for cached entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreshnessConfig {
    /// Entries older than this are stale.
    pub max_age: Duration,
    /// Minimum spacing between refresh attempts for the same entry.
    pub retry_cooldown: Duration,
    /// When set, a background sweep checks the active resource at this cadence.
    pub check_interval: Option<Duration>,
}

impl Default for FreshnessConfig {
    fn default() -> Self {
        let four_hours = Duration::from_secs(4 * 60 * 60);
        Self {
            max_age: four_hours,
            retry_cooldown: four_hours,
            check_interval: None,
        }
    }
}

/// Bounds for the range cache. Both are off by default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of entries kept; least recently used entries go first.
    pub max_entries: Option<u64>,
    /// Entries not read or written for this long are dropped.
    pub time_to_idle: Option<Duration>,
}

/// Human-readable progress texts published while a job runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressLabels {
    /// Shown right after submission.
    pub starting: String,
    /// Shown when the backend reports progress without any text.
    pub processing: String,
    /// Shown once the job completed and the result is being downloaded.
    pub downloading: String,
}

impl Default for ProgressLabels {
    fn default() -> Self {
        Self {
            starting: "Iniciando...".to_string(),
            processing: "Processando...".to_string(),
            downloading: "Processamento concluído, baixando dados...".to_string(),
        }
    }
}

/// Global configuration for the `Metrica` orchestrator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricaConfig {
    /// Status polling.
    pub poll: PollConfig,
    /// Result fetch retries.
    pub retry: RetryConfig,
    /// Staleness and background refresh.
    pub freshness: FreshnessConfig,
    /// Range cache bounds.
    pub cache: CacheConfig,
    /// Progress texts.
    pub labels: ProgressLabels,
    /// Optional timeout applied to every individual backend call.
    pub request_timeout: Option<Duration>,
}
