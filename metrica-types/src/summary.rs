//! Aggregate totals and ratios over a set of records.

use serde::{Deserialize, Serialize};

use crate::attribution::{ByModel, ModelMetrics};
use crate::record::{
    AttributionDelta, CampaignRecord, DerivedRatios, PixelMetrics, Subscriptions, ratio,
};

/// Additive totals over any number of records.
///
/// Ratios are intentionally absent: they are derived once from the final
/// totals by [`Totals::finish`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Totals {
    /// Records folded in.
    pub records: u64,
    /// Spend.
    pub cost: f64,
    /// Impressions.
    pub impressions: u64,
    /// Clicks.
    pub clicks: u64,
    /// Leads.
    pub leads: u64,
    /// Conversions per attribution model.
    pub attribution: ByModel<ModelMetrics>,
    /// Pixel-tracked conversions.
    pub pixel: PixelMetrics,
    /// Subscription splits.
    pub subscriptions: Subscriptions,
}

impl Totals {
    /// Fold one record in. Counts saturate at `u64::MAX`.
    pub fn add(&mut self, r: &CampaignRecord) {
        self.records = self.records.saturating_add(1);
        self.cost += r.cost;
        self.impressions = self.impressions.saturating_add(r.impressions);
        self.clicks = self.clicks.saturating_add(r.clicks);
        self.leads = self.leads.saturating_add(r.leads);
        self.attribution += r.attribution;
        self.pixel += r.pixel;
        self.subscriptions += r.subscriptions;
    }

    /// Derive ratios from the accumulated totals.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn finish(self) -> Summary {
        let ratios = self
            .attribution
            .map(|_, m| DerivedRatios::compute(self.cost, m, &self.subscriptions));
        let delta = AttributionDelta::between(&ratios);
        Summary {
            ctr: ratio(self.clicks as f64 * 100.0, self.impressions as f64),
            cpc: ratio(self.cost, self.clicks as f64),
            cpm: ratio(self.cost * 1000.0, self.impressions as f64),
            cpl: ratio(self.cost, self.leads as f64),
            totals: self,
            ratios,
            delta,
        }
    }
}

impl<'a> FromIterator<&'a CampaignRecord> for Totals {
    fn from_iter<I: IntoIterator<Item = &'a CampaignRecord>>(iter: I) -> Self {
        let mut t = Self::default();
        for r in iter {
            t.add(r);
        }
        t
    }
}

/// Totals plus ratios computed from those totals.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Summary {
    /// Additive totals.
    pub totals: Totals,
    /// Ratios per attribution model.
    pub ratios: ByModel<DerivedRatios>,
    /// Baseline-to-other model deltas.
    pub delta: AttributionDelta,
    /// Click-through rate in percent.
    pub ctr: Option<f64>,
    /// Cost per click.
    pub cpc: Option<f64>,
    /// Cost per thousand impressions.
    pub cpm: Option<f64>,
    /// Cost per lead.
    pub cpl: Option<f64>,
}

impl Summary {
    /// Summarize a record set.
    #[must_use]
    pub fn of<'a>(records: impl IntoIterator<Item = &'a CampaignRecord>) -> Self {
        records.into_iter().collect::<Totals>().finish()
    }
}
