//! What a dashboard renders, published on every state transition.

use metrica_core::{DateRange, Job, JobPhase, ResourceKey};

use crate::view::DatasetView;

/// The dataset currently selected for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// Selected dataset.
    pub resource: ResourceKey,
    /// Selected date range.
    pub range: DateRange,
}

/// Point-in-time copy of the orchestrator's observable state.
///
/// Obtain a live stream with [`crate::Metrica::subscribe`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardSnapshot {
    /// Bumped on every selection change.
    pub generation: u64,
    /// Current selection, if any.
    pub selection: Option<Selection>,
    /// Phase of the current job cycle.
    pub phase: JobPhase,
    /// Current (or last) job of the selected resource.
    pub job: Option<Job>,
    /// Human-readable progress, e.g. `"Etapa 2 (6s)"`.
    pub progress_text: String,
    /// Seconds reported by the backend for the current job.
    pub elapsed_seconds: Option<f64>,
    /// Message of the last terminal failure of the selected resource.
    pub error: Option<String>,
    /// Dataset on display.
    pub dataset: Option<DatasetView>,
    /// A background refresh failed recoverably and the displayed data is the
    /// previous cache entry.
    pub used_fallback: bool,
    /// At least one background refresh is in flight.
    pub refreshing: bool,
}

impl DashboardSnapshot {
    /// True while a job for the selection is submitted and not yet stored.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.phase == JobPhase::Processing
    }
}
