//! Read-only views over cached datasets.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use metrica_core::{
    AttributionModel, CacheEntry, CampaignRecord, CampaignRollup, DateRange, DerivedRatios,
    ModelMetrics, RecordFilter, Summary, platforms, rollup_by_campaign,
};

/// A cache entry narrowed to a query range and an optional record filter.
///
/// When the range equals the entry's own range the view shares the entry's
/// records and summary. Otherwise records are sliced to dated records inside
/// the range and the summary is recomputed from the slice, totals first and
/// ratios after.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetView {
    entry: Arc<CacheEntry>,
    range: DateRange,
    filter: RecordFilter,
    records: Arc<[CampaignRecord]>,
    summary: Summary,
}

impl DatasetView {
    /// View `entry` through `range`.
    #[must_use]
    pub fn new(entry: Arc<CacheEntry>, range: DateRange) -> Self {
        Self::build(entry, range, RecordFilter::default())
    }

    /// View the whole of `entry`.
    #[must_use]
    pub fn whole(entry: Arc<CacheEntry>) -> Self {
        let range = entry.range;
        Self::new(entry, range)
    }

    fn build(entry: Arc<CacheEntry>, range: DateRange, filter: RecordFilter) -> Self {
        if range == entry.range && filter.is_empty() {
            return Self {
                records: Arc::clone(&entry.records),
                summary: entry.summary,
                entry,
                range,
                filter,
            };
        }
        let whole = range == entry.range;
        let records: Vec<CampaignRecord> = entry
            .records
            .iter()
            .filter(|r| whole || r.date.is_some_and(|d| range.contains(d)))
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        let summary = Summary::of(&records);
        Self {
            entry,
            range,
            filter,
            records: records.into(),
            summary,
        }
    }

    /// Same range over a different filter. The filter replaces the current one.
    #[must_use]
    pub fn filtered(&self, filter: RecordFilter) -> Self {
        Self::build(Arc::clone(&self.entry), self.range, filter)
    }

    /// Same range and filter over a replacement entry.
    #[must_use]
    pub fn rebased(&self, entry: Arc<CacheEntry>) -> Self {
        Self::build(entry, self.range, self.filter.clone())
    }

    /// The underlying cache entry.
    #[must_use]
    pub const fn entry(&self) -> &Arc<CacheEntry> {
        &self.entry
    }

    /// Query range.
    #[must_use]
    pub const fn range(&self) -> DateRange {
        self.range
    }

    /// Active record filter.
    #[must_use]
    pub const fn filter(&self) -> &RecordFilter {
        &self.filter
    }

    /// Records in view.
    #[must_use]
    pub fn records(&self) -> &[CampaignRecord] {
        &self.records
    }

    /// Summary over the records in view.
    #[must_use]
    pub const fn summary(&self) -> &Summary {
        &self.summary
    }

    /// Totals under `model`.
    #[must_use]
    pub const fn metrics(&self, model: AttributionModel) -> &ModelMetrics {
        self.summary.totals.attribution.get(model)
    }

    /// Ratios under `model`.
    #[must_use]
    pub const fn ratios(&self, model: AttributionModel) -> &DerivedRatios {
        self.summary.ratios.get(model)
    }

    /// When the underlying data was computed.
    #[must_use]
    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.entry.fetched_at
    }

    /// Number of records in view.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when no record is in view.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Per-campaign rollups of the records in view.
    #[must_use]
    pub fn rollup(&self) -> Vec<CampaignRollup> {
        rollup_by_campaign(self.records.iter())
    }

    /// Distinct platforms among the records in view.
    #[must_use]
    pub fn platforms(&self) -> Vec<String> {
        platforms(self.records.iter())
    }
}
