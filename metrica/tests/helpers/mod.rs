// Re-export helpers so tests can `use crate::helpers::*;`
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use metrica::{
    CampaignBackend, DateRange, FreshnessConfig, ImmediateResponse, ManualClock, Metrica,
    PollConfig, RawRecord, ResourceKey, RetryConfig,
};
use metrica_mock::{ScriptController, ScriptedBackend};
use serde_json::{Value, json};

// ---------- Lightweight fixtures and helpers for tests ----------

/// Common resource keys used across tests.
pub const ACME: &str = "acme_store";
pub const GLOBEX: &str = "globex";
pub const INITECH: &str = "initech";

/// Construct a UTC `DateTime` from components for readability in tests.
pub fn dt(y: i32, m: u32, d: u32, hh: u32) -> chrono::DateTime<chrono::Utc> {
    chrono::NaiveDate::from_ymd_opt(y, m, d)
        .and_then(|date| date.and_hms_opt(hh, 0, 0))
        .expect("valid timestamp")
        .and_utc()
}

pub fn range(start: &str, end: &str) -> DateRange {
    DateRange::parse(start, end).expect("valid range")
}

pub fn january() -> DateRange {
    range("2024-01-01", "2024-01-31")
}

pub fn key(raw: &str) -> ResourceKey {
    ResourceKey::parse(raw).expect("valid key")
}

pub fn obj(v: Value) -> RawRecord {
    match v {
        Value::Object(map) => map,
        other => panic!("expected an object, got {other}"),
    }
}

/// A raw record with distinct numbers under both attribution models.
pub fn raw_record(campaign: &str, date: &str, cost: f64, revenue: f64) -> RawRecord {
    obj(json!({
        "platform": "google",
        "campaign_name": campaign,
        "date": date,
        "cost": cost,
        "impressions": 1000,
        "clicks": 50,
        "leads": 5,
        "transactions": 4,
        "revenue": revenue,
        "transactions_first": 2,
        "revenue_first": revenue / 2.0,
        "transactions_origin_stack": 3,
        "revenue_origin_stack": revenue * 0.75,
        "transactions_first_origin_stack": 1,
        "revenue_first_origin_stack": revenue / 4.0
    }))
}

/// Three January records, as in the acceptance scenario.
pub fn acme_records() -> Vec<RawRecord> {
    vec![
        raw_record("Brand Search", "2024-01-05", 120.0, 1800.0),
        raw_record("Prospecting", "2024-01-12", 300.0, 900.0),
        raw_record("Performance Max", "2024-01-20", 80.0, 400.0),
    ]
}

/// One record per day of January 2024, each costing 10.
pub fn daily_january() -> Vec<RawRecord> {
    (1..=31)
        .map(|d| raw_record("Always On", &format!("2024-01-{d:02}"), 10.0, 30.0))
        .collect()
}

pub fn immediate(data: Vec<RawRecord>) -> ImmediateResponse {
    ImmediateResponse {
        data,
        summary: None,
        cache_info: None,
    }
}

pub fn clock() -> ManualClock {
    ManualClock::new(dt(2024, 2, 1, 12))
}

pub fn scripted() -> (Arc<dyn CampaignBackend>, ScriptController) {
    ScriptedBackend::new_with_controller("scripted")
}

/// Reference timings: poll every 3 s, 10 result attempts 3 s apart, 4 h staleness.
pub fn metrica(backend: Arc<dyn CampaignBackend>, clock: &ManualClock) -> Metrica {
    Metrica::builder()
        .with_backend(backend)
        .poll(PollConfig {
            interval: Duration::from_secs(3),
            max_wait: None,
        })
        .retry(RetryConfig {
            max_attempts: 10,
            delay: Duration::from_secs(3),
        })
        .freshness(FreshnessConfig::default())
        .clock(Arc::new(clock.clone()))
        .build()
        .expect("valid configuration")
}
