//! Total numeric coercion for loosely-typed backend values.
//!
//! Every function here maps any JSON value to a usable number or text and
//! never fails: missing, `null`, non-numeric and non-finite inputs become `0`
//! (or an empty string).

use chrono::NaiveDate;
use serde_json::Value;

/// Coerce a JSON value to a finite `f64`.
///
/// Numbers pass through; strings are parsed after trimming and must be
/// numeric in their entirety (`"12.5x"` is `0`, not `12.5`). Anything else,
/// including `NaN` and infinities, is `0`.
#[must_use]
pub fn coerce_number(value: Option<&Value>) -> f64 {
    let v = match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };
    if v.is_finite() { v } else { 0.0 }
}

/// Coerce a JSON value to a non-negative count, rounding to the nearest integer.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn coerce_count(value: Option<&Value>) -> u64 {
    if let Some(Value::Number(n)) = value
        && let Some(u) = n.as_u64()
    {
        return u;
    }
    let v = coerce_number(value).round();
    if v <= 0.0 {
        0
    } else if v >= u64::MAX as f64 {
        u64::MAX
    } else {
        v as u64
    }
}

/// Coerce a JSON value to text. Numbers and booleans are rendered; anything
/// else is empty.
#[must_use]
pub fn coerce_text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

/// Parse the leading `YYYY-MM-DD` of a date or timestamp string.
#[must_use]
pub fn coerce_date(value: Option<&Value>) -> Option<NaiveDate> {
    let s = value?.as_str()?.trim();
    let head = s.get(..10)?;
    NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()
}
