//! Data transfer objects, configuration and errors shared by the metrica crates.
#![warn(missing_docs)]

mod attribution;
mod cache;
mod config;
mod error;
mod job;
mod range;
mod record;
mod reports;
mod resource;
mod summary;
mod wire;

pub use attribution::{AttributionModel, ByModel, ModelMetrics};
pub use cache::{CacheEntry, CacheKey, EntryOrigin};
pub use config::{
    CacheConfig, FreshnessConfig, MetricaConfig, PollConfig, ProgressLabels, RetryConfig,
};
pub use error::MetricaError;
pub use job::{
    Job, JobId, JobPhase, JobResult, JobSpec, JobStatus, JobStatusReport, JobTicket, RawRecord,
};
pub use range::DateRange;
pub use record::{
    AttributionDelta, CampaignRecord, DerivedRatios, PixelMetrics, SubscriptionSlice,
    Subscriptions, ratio,
};
pub use reports::{DataSource, RefreshOutcome};
pub use resource::ResourceKey;
pub use summary::{Summary, Totals};
pub use wire::{CacheInfo, ImmediateRequest, ImmediateResponse};
