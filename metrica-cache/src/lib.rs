//! metrica-cache
//!
//! In-memory storage for reconciled datasets.
//!
//! - [`RangeCache`] keeps one entry per `(resource, range)` and answers
//!   queries with the tightest entry that fully covers them.
//! - [`FreshnessMonitor`] decides when an entry is stale and admits at most
//!   one refresh per entry and cooldown window.
#![warn(missing_docs)]

mod freshness;
mod range_cache;

pub use crate::freshness::FreshnessMonitor;
pub use crate::range_cache::{CacheHit, RangeCache};
