//! metrica-core
//!
//! Backend contracts and pure domain logic shared across the metrica crates.
//!
//! - `backend`: the `CampaignBackend` trait and its role traits.
//! - `coerce`: total coercion of loosely-typed backend values.
//! - `reconcile`: expansion of raw records into dual-attribution records.
//! - `rollup`: per-campaign grouping and record filters.
//! - `schedule`: owned task handles and injectable clocks.
//! - `preferences`: the layout-preference store contract.
//!
//! Async runtime (Tokio)
//! ---------------------
//! `schedule::TaskHandle` wraps `tokio::task::JoinHandle<()>` and uses
//! `tokio::sync::oneshot::Sender<()>` for cooperative shutdown, so code that
//! spawns background work through it must run under a Tokio 1.x runtime.
#![warn(missing_docs)]

/// Backend role traits and the primary `CampaignBackend` interface.
pub mod backend;
pub mod coerce;
/// Preference persistence contract.
pub mod preferences;
pub mod reconcile;
pub mod rollup;
pub mod schedule;

pub use backend::{CampaignBackend, JobProvider, SnapshotProvider, require_jobs, require_snapshot};
pub use preferences::{MemoryPreferenceStore, PreferenceStore};
pub use reconcile::{reconcile, reconcile_all};
pub use rollup::{CampaignRollup, RecordFilter, platforms, rollup_by_campaign};
pub use schedule::{Clock, ManualClock, SystemClock, TaskHandle};

pub use metrica_types::*;
