//! Expansion of raw backend records into canonical [`CampaignRecord`]s.

use metrica_types::{
    AttributionDelta, AttributionModel, ByModel, CampaignRecord, DerivedRatios, ModelMetrics,
    PixelMetrics, RawRecord, SubscriptionSlice, Subscriptions, ratio,
};

use crate::coerce::{coerce_count, coerce_date, coerce_number, coerce_text};

/// Raw field names carrying one attribution model's conversions.
struct ModelFields {
    transactions: &'static str,
    revenue: &'static str,
    transactions_first: &'static str,
    revenue_first: &'static str,
}

const fn model_fields(model: AttributionModel) -> ModelFields {
    match model {
        AttributionModel::LastNonDirect => ModelFields {
            transactions: "transactions",
            revenue: "revenue",
            transactions_first: "transactions_first",
            revenue_first: "revenue_first",
        },
        AttributionModel::OriginStack => ModelFields {
            transactions: "transactions_origin_stack",
            revenue: "revenue_origin_stack",
            transactions_first: "transactions_first_origin_stack",
            revenue_first: "revenue_first_origin_stack",
        },
    }
}

/// Look up the first present field among `names`.
fn field<'a>(raw: &'a RawRecord, names: &[&str]) -> Option<&'a serde_json::Value> {
    names.iter().find_map(|n| raw.get(*n))
}

fn slice(raw: &RawRecord, revenue: &[&str], count: &[&str]) -> SubscriptionSlice {
    SubscriptionSlice {
        revenue: coerce_number(field(raw, revenue)),
        count: coerce_count(field(raw, count)),
    }
}

// The backend spells the monthly cadence "montly"; the correct spelling is
// accepted as a fallback.
fn subscriptions(raw: &RawRecord) -> Subscriptions {
    Subscriptions {
        recurring_monthly: slice(
            raw,
            &["recurring_montly_revenue", "recurring_monthly_revenue"],
            &["recurring_montly_subscriptions", "recurring_monthly_subscriptions"],
        ),
        recurring_annual: slice(
            raw,
            &["recurring_annual_revenue"],
            &["recurring_annual_subscriptions"],
        ),
        first_monthly: slice(
            raw,
            &["first_montly_revenue", "first_monthly_revenue"],
            &["first_montly_subscriptions", "first_monthly_subscriptions"],
        ),
        first_annual: slice(
            raw,
            &["first_annual_revenue"],
            &["first_annual_subscriptions"],
        ),
    }
}

fn model_metrics(raw: &RawRecord, model: AttributionModel) -> ModelMetrics {
    let f = model_fields(model);
    ModelMetrics {
        transactions: coerce_count(raw.get(f.transactions)),
        revenue: coerce_number(raw.get(f.revenue)),
        transactions_first: coerce_count(raw.get(f.transactions_first)),
        revenue_first: coerce_number(raw.get(f.revenue_first)),
    }
}

/// Expand one raw record into a canonical record carrying both attribution
/// views and their derived ratios.
///
/// Total: every numeric field goes through safety coercion, so malformed
/// input yields zeros rather than an error.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn reconcile(raw: &RawRecord) -> CampaignRecord {
    let cost = coerce_number(raw.get("cost"));
    let impressions = coerce_count(raw.get("impressions"));
    let clicks = coerce_count(raw.get("clicks"));
    let subscriptions = subscriptions(raw);
    let attribution = ByModel::from_fn(|m| model_metrics(raw, m));
    let ratios = attribution.map(|_, m| DerivedRatios::compute(cost, m, &subscriptions));
    let delta = AttributionDelta::between(&ratios);

    CampaignRecord {
        platform: coerce_text(raw.get("platform")),
        campaign_name: coerce_text(raw.get("campaign_name")),
        date: coerce_date(raw.get("date")),
        cost,
        impressions,
        clicks,
        leads: coerce_count(raw.get("leads")),
        attribution,
        pixel: PixelMetrics {
            transactions: coerce_count(raw.get("pixel_transactions")),
            revenue: coerce_number(raw.get("pixel_revenue")),
        },
        subscriptions,
        ratios,
        ctr: ratio(clicks as f64 * 100.0, impressions as f64),
        cpc: ratio(cost, clicks as f64),
        delta,
    }
}

/// Reconcile a batch, preserving order.
#[must_use]
#[cfg_attr(
    feature = "tracing",
    tracing::instrument(name = "metrica_core::reconcile_all", skip(raw), fields(records = raw.len()))
)]
pub fn reconcile_all(raw: &[RawRecord]) -> Vec<CampaignRecord> {
    let out: Vec<CampaignRecord> = raw.iter().map(reconcile).collect();
    #[cfg(feature = "tracing")]
    {
        let undated = out.iter().filter(|r| r.date.is_none()).count();
        if undated > 0 {
            tracing::debug!(undated, "records without a parsable date");
        }
    }
    out
}
