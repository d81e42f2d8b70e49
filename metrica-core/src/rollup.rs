//! Grouping and filtering of reconciled records.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use metrica_types::{CampaignRecord, Summary, Totals};

/// Totals for one `(platform, campaign_name)` pair across all its days.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignRollup {
    /// Ad platform.
    pub platform: String,
    /// Campaign name.
    pub campaign_name: String,
    /// Days folded in and the resulting ratios, under both models.
    pub summary: Summary,
}

/// Group records by platform and campaign.
///
/// Ratios are recomputed from each group's summed totals. Output is ordered
/// by platform, then campaign name.
#[must_use]
pub fn rollup_by_campaign<'a>(
    records: impl IntoIterator<Item = &'a CampaignRecord>,
) -> Vec<CampaignRollup> {
    let mut groups: BTreeMap<(&'a str, &'a str), Totals> = BTreeMap::new();
    for r in records {
        groups
            .entry((r.platform.as_str(), r.campaign_name.as_str()))
            .or_default()
            .add(r);
    }
    groups
        .into_iter()
        .map(|((platform, campaign_name), totals)| CampaignRollup {
            platform: platform.to_string(),
            campaign_name: campaign_name.to_string(),
            summary: totals.finish(),
        })
        .collect()
}

/// Narrowing applied to a record set before display.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordFilter {
    /// Keep only this platform (case-insensitive). `None` keeps all.
    pub platform: Option<String>,
    /// Keep only campaigns whose name contains this term (case-insensitive).
    pub search: Option<String>,
}

impl RecordFilter {
    /// Filter by platform.
    #[must_use]
    pub fn platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = Some(platform.into());
        self
    }

    /// Filter by campaign-name search term.
    #[must_use]
    pub fn search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }

    /// True when the filter keeps everything.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.platform.as_deref().is_none_or(|p| p.trim().is_empty())
            && self.search.as_deref().is_none_or(|s| s.trim().is_empty())
    }

    /// True when `record` passes the filter.
    #[must_use]
    pub fn matches(&self, record: &CampaignRecord) -> bool {
        if let Some(p) = self.platform.as_deref().map(str::trim)
            && !p.is_empty()
            && !record.platform.eq_ignore_ascii_case(p)
        {
            return false;
        }
        if let Some(term) = self.search.as_deref().map(str::trim)
            && !term.is_empty()
            && !record
                .campaign_name
                .to_lowercase()
                .contains(&term.to_lowercase())
        {
            return false;
        }
        true
    }
}

/// Distinct platforms, sorted.
#[must_use]
pub fn platforms<'a>(records: impl IntoIterator<Item = &'a CampaignRecord>) -> Vec<String> {
    let mut out: Vec<String> = records.into_iter().map(|r| r.platform.clone()).collect();
    out.sort();
    out.dedup();
    out
}
