//! Metrica serves campaign-performance datasets computed by slow remote jobs.
//!
//! Overview
//! - Submits a compute job to a backend implementing the `metrica_core`
//!   contracts, polls its status on a timer and downloads the result once it
//!   is ready, retrying "not ready yet" answers.
//! - Reconciles every raw record into both attribution models at once so a
//!   dashboard can toggle models or compare them without another fetch.
//! - Keeps results in a range-aware cache: a query inside a cached range is
//!   served from the tightest covering entry, sliced to the query range.
//! - Refreshes stale entries in the background through the backend's
//!   immediate path and falls back to the previous entry on 5xx and network
//!   failures.
//!
//! Key behaviors and trade-offs
//! - One job cycle at a time: repeated loads of an unchanged selection join
//!   the running cycle, and selecting another resource releases it. A
//!   superseded cycle is not aborted; it stops at its next suspension point
//!   and never mutates shared state afterwards.
//! - Poll errors are transient: a failed status request is logged and retried
//!   on the next tick. Only a backend-reported failure, exhausted result
//!   retries or the optional poll deadline end a cycle with an error.
//! - Background refresh failures never surface as errors to `load`; they are
//!   reported through `DashboardSnapshot::used_fallback` and the returned
//!   `RefreshOutcome`.
//! - The cache is unbounded unless `CacheConfig` sets a capacity or an idle
//!   timeout.
//!
//! Examples
//! Loading a dataset and watching progress:
//! ```rust,ignore
//! use std::sync::Arc;
//! use metrica::{AttributionModel, DateRange, Metrica};
//!
//! let metrica = Metrica::builder()
//!     .with_backend(Arc::new(backend))
//!     .build()?;
//!
//! let mut updates = metrica.subscribe();
//! tokio::spawn(async move {
//!     while updates.changed().await.is_ok() {
//!         let snap = updates.borrow().clone();
//!         println!("{:?} {}", snap.phase, snap.progress_text);
//!     }
//! });
//!
//! let loaded = metrica
//!     .load("acme_store", DateRange::parse("2024-01-01", "2024-01-31")?)
//!     .await?;
//! let roas = loaded.view.ratios(AttributionModel::LastNonDirect).roas;
//! ```
//!
//! See `metrica/examples/` for a runnable demonstration against the mock backend.
#![warn(missing_docs)]

pub(crate) mod core;
pub mod guard;
mod job;
mod refresh;
mod snapshot;
pub mod state;
mod view;

pub use crate::core::{Loaded, Metrica, MetricaBuilder};
pub use guard::{Admission, CommandKey, ConcurrencyGuard, CycleOutcome, CycleSlot, CycleWaiter, Ticket};
pub use job::progress_text;
pub use snapshot::{DashboardSnapshot, Selection};
pub use view::DatasetView;

pub use metrica_cache::{CacheHit, FreshnessMonitor, RangeCache};

// Re-export core types for convenience
pub use metrica_core::{
    AttributionDelta,
    AttributionModel,
    ByModel,
    CacheConfig,
    CacheEntry,
    CacheInfo,
    CacheKey,
    CampaignBackend,
    CampaignRecord,
    CampaignRollup,
    Clock,
    DataSource,
    DateRange,
    DerivedRatios,
    EntryOrigin,
    FreshnessConfig,
    ImmediateRequest,
    ImmediateResponse,
    Job,
    JobId,
    JobPhase,
    JobProvider,
    JobResult,
    JobSpec,
    JobStatus,
    JobStatusReport,
    JobTicket,
    ManualClock,
    MemoryPreferenceStore,
    MetricaConfig,
    MetricaError,
    ModelMetrics,
    PollConfig,
    PreferenceStore,
    ProgressLabels,
    RawRecord,
    RecordFilter,
    RefreshOutcome,
    ResourceKey,
    RetryConfig,
    SnapshotProvider,
    Summary,
    SystemClock,
    TaskHandle,
    Totals,
};
