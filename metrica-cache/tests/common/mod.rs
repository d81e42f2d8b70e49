#![allow(dead_code)]

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use metrica_types::{CacheEntry, DateRange, EntryOrigin, ResourceKey};

pub fn key(s: &str) -> ResourceKey {
    ResourceKey::parse(s).expect("valid key")
}

pub fn day(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").expect("valid date")
}

pub fn range(a: &str, b: &str) -> DateRange {
    DateRange::parse(a, b).expect("valid range")
}

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0)
        .single()
        .expect("valid instant")
}

pub fn entry(resource: &str, r: DateRange, fetched_at: DateTime<Utc>) -> CacheEntry {
    CacheEntry::new(key(resource), r, Vec::new(), fetched_at, EntryOrigin::Immediate)
}
