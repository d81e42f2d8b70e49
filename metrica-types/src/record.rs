//! Canonical campaign records and their derived metrics.

use core::ops::AddAssign;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::attribution::{AttributionModel, ByModel, ModelMetrics};

/// Revenue and count for one subscription slice.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SubscriptionSlice {
    /// Subscription revenue.
    pub revenue: f64,
    /// Number of subscriptions.
    pub count: u64,
}

impl AddAssign for SubscriptionSlice {
    fn add_assign(&mut self, rhs: Self) {
        self.revenue += rhs.revenue;
        self.count = self.count.saturating_add(rhs.count);
    }
}

/// Subscription revenue split by kind (recurring or first purchase) and cadence.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Subscriptions {
    /// Monthly renewals.
    pub recurring_monthly: SubscriptionSlice,
    /// Annual renewals.
    pub recurring_annual: SubscriptionSlice,
    /// First monthly subscriptions.
    pub first_monthly: SubscriptionSlice,
    /// First annual subscriptions.
    pub first_annual: SubscriptionSlice,
}

impl Subscriptions {
    /// Renewal revenue across both cadences.
    #[must_use]
    pub fn recurring_revenue(&self) -> f64 {
        self.recurring_monthly.revenue + self.recurring_annual.revenue
    }
}

impl AddAssign for Subscriptions {
    fn add_assign(&mut self, rhs: Self) {
        self.recurring_monthly += rhs.recurring_monthly;
        self.recurring_annual += rhs.recurring_annual;
        self.first_monthly += rhs.first_monthly;
        self.first_annual += rhs.first_annual;
    }
}

/// Conversions reported by the ad platform's own pixel.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PixelMetrics {
    /// Pixel-tracked transactions.
    pub transactions: u64,
    /// Pixel-tracked revenue.
    pub revenue: f64,
}

impl AddAssign for PixelMetrics {
    fn add_assign(&mut self, rhs: Self) {
        self.transactions = self.transactions.saturating_add(rhs.transactions);
        self.revenue += rhs.revenue;
    }
}

/// Ratios derived for one attribution model.
///
/// Ratios are `None` when their denominator is zero.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DerivedRatios {
    /// Model revenue minus renewal revenue, floored at zero.
    pub display_revenue: f64,
    /// Display revenue per unit of spend.
    pub roas: Option<f64>,
    /// First-purchase revenue per unit of spend.
    pub roas_first: Option<f64>,
    /// Spend per first-time acquisition.
    pub cpa: Option<f64>,
    /// Spend per transaction of any kind.
    pub cpv: Option<f64>,
}

impl DerivedRatios {
    /// Derive ratios from spend, model metrics and subscription splits.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn compute(cost: f64, metrics: &ModelMetrics, subs: &Subscriptions) -> Self {
        let display_revenue = (metrics.revenue - subs.recurring_revenue()).max(0.0);
        Self {
            display_revenue,
            roas: ratio(display_revenue, cost),
            roas_first: ratio(metrics.revenue_first, cost),
            cpa: ratio(cost, metrics.transactions_first as f64),
            cpv: ratio(cost, metrics.transactions as f64),
        }
    }
}

/// Relative change from the baseline model to the other model.
///
/// Each field is `None` when the baseline's ratio is undefined or zero, never
/// `Some(0.0)` by default.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AttributionDelta {
    /// `(roas_b - roas_a) / roas_a * 100`.
    pub roas_pct: Option<f64>,
    /// `(cpa_a - cpa_b) / cpa_a * 100`; positive means the other model is cheaper.
    pub cpa_pct: Option<f64>,
}

impl AttributionDelta {
    /// Compare the two models' ratios, baseline first.
    #[must_use]
    pub fn between(ratios: &ByModel<DerivedRatios>) -> Self {
        let a = ratios.get(AttributionModel::BASELINE);
        let b = ratios.get(AttributionModel::BASELINE.counterpart());
        let roas_pct = match (a.roas, b.roas) {
            (Some(ra), Some(rb)) if ra != 0.0 => Some((rb - ra) / ra * 100.0),
            _ => None,
        };
        let cpa_pct = match (a.cpa, b.cpa) {
            (Some(ca), Some(cb)) if ca != 0.0 => Some((ca - cb) / ca * 100.0),
            _ => None,
        };
        Self { roas_pct, cpa_pct }
    }
}

/// Divide, returning `None` for a zero denominator or a non-finite quotient.
#[must_use]
pub fn ratio(num: f64, den: f64) -> Option<f64> {
    if den == 0.0 {
        return None;
    }
    let v = num / den;
    v.is_finite().then_some(v)
}

/// One campaign-day of advertising performance with both attribution views.
///
/// Produced once by the reconciler and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignRecord {
    /// Ad platform (e.g. "google", "meta").
    pub platform: String,
    /// Campaign name as reported by the platform.
    pub campaign_name: String,
    /// Reporting day, when the backend sent a parsable one.
    pub date: Option<NaiveDate>,
    /// Spend.
    pub cost: f64,
    /// Impressions.
    pub impressions: u64,
    /// Clicks.
    pub clicks: u64,
    /// Leads.
    pub leads: u64,
    /// Conversions under each attribution model.
    pub attribution: ByModel<ModelMetrics>,
    /// Pixel-tracked conversions.
    pub pixel: PixelMetrics,
    /// Subscription splits.
    pub subscriptions: Subscriptions,
    /// Ratios under each attribution model.
    pub ratios: ByModel<DerivedRatios>,
    /// Click-through rate in percent.
    pub ctr: Option<f64>,
    /// Cost per click.
    pub cpc: Option<f64>,
    /// Baseline-to-other model deltas.
    pub delta: AttributionDelta,
}

impl CampaignRecord {
    /// Metrics under `model`.
    #[must_use]
    pub const fn metrics(&self, model: AttributionModel) -> &ModelMetrics {
        self.attribution.get(model)
    }

    /// Ratios under `model`.
    #[must_use]
    pub const fn ratios(&self, model: AttributionModel) -> &DerivedRatios {
        self.ratios.get(model)
    }
}
