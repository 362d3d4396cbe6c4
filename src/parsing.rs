//! Lenient parsing helpers for account-intelligence payloads.
//!
//! Upstream tools return loosely typed JSON whose field names drift between
//! accounts. Everything here is total: a value of the wrong shape yields
//! `None` instead of an error. The one exception is
//! [`extract_structured_payload`], which fails when a tool response carries
//! no JSON at all.

use crate::errors::AppError;
use crate::models::ContentBlock;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;

const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M%:z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
];

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
];

const CURRENCY_NOISE: &[char] = &['$', '€', '£', '¥', ','];

/// Parses an ISO-8601 style date string into UTC.
///
/// Only JSON strings are accepted. A trailing `Z` means UTC and naive
/// timestamps are read as UTC.
pub fn parse_date(value: &Value) -> Option<DateTime<Utc>> {
    value.as_str().and_then(parse_date_str)
}

pub fn parse_date_str(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    let normalized = match raw.strip_suffix('Z').or_else(|| raw.strip_suffix('z')) {
        Some(body) => format!("{}+00:00", body),
        None => raw.to_string(),
    };

    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(&normalized, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(&normalized, fmt) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(&normalized, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Parses a monetary amount from a number or a formatted string like `"$1,250.50"`.
pub fn parse_amount(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let stripped: String = s.chars().filter(|c| !CURRENCY_NOISE.contains(c)).collect();
            stripped.trim().parse::<f64>().ok()
        }
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

/// Returns the JSON payload of the first text block that looks like an object or array.
pub fn extract_structured_payload(blocks: &[ContentBlock]) -> Result<Value, AppError> {
    for block in blocks {
        if block.kind.as_deref() != Some("text") {
            continue;
        }
        let Some(text) = block.text.as_deref() else {
            continue;
        };

        let trimmed = text.trim();
        let looks_structured = (trimmed.starts_with('{') && trimmed.ends_with('}'))
            || (trimmed.starts_with('[') && trimmed.ends_with(']'));
        if !looks_structured {
            continue;
        }

        return serde_json::from_str(trimmed).map_err(|e| {
            AppError::DataFormat(format!("Tool response JSON could not be parsed: {}", e))
        });
    }

    Err(AppError::DataFormat(
        "No JSON found in tool response content".to_string(),
    ))
}

/// Whether a value carries a usable signal (not null, false, zero or empty).
pub fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|v| v != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// First present value among the candidate keys, in priority order.
pub fn first_present<'a>(obj: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| obj.get(*key))
        .find(|value| is_present(value))
}

/// Renders a scalar as a display name.
pub fn as_name(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// First present value among the candidate keys, rendered as a name.
pub fn first_name(obj: &Value, keys: &[&str]) -> Option<String> {
    first_present(obj, keys).and_then(as_name)
}

/// First present string value among the candidate keys.
pub fn first_str(obj: &Value, keys: &[&str]) -> Option<String> {
    first_present(obj, keys)
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Non-negative integer from a JSON number or numeric string.
pub fn as_count(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|v| *v >= 0.0 && v.fract() == 0.0).map(|v| v as u64)),
        Value::String(s) => s.replace(',', "").trim().parse::<u64>().ok(),
        _ => None,
    }
}
