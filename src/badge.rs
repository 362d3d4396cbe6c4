//! Timing badge: how urgent is it to engage this account right now.

use crate::models::{Badge, ContractSignal, ScoringPolicy};
use crate::parsing::parse_date;
use chrono::{DateTime, Utc};
use serde_json::Value;

/// Install fields that may carry a "last seen / verified" date.
pub const RECENCY_DATE_FIELDS: &[&str] = &[
    "lastVerified",
    "verificationDate",
    "lastSeen",
    "firstSeen",
    "lastUpdated",
    "lastVerifiedDate",
    "firstVerifiedDate",
];

const CONTRACT_WEIGHT: f64 = 0.6;
const RECENCY_WEIGHT: f64 = 0.4;
const HOT_THRESHOLD: f64 = 0.75;
const WARM_THRESHOLD: f64 = 0.4;

/// Urgency of the nearest contract renewal, in `[0, 1]`.
pub fn contract_urgency(contract: &ContractSignal) -> f64 {
    match contract.days_to_renewal {
        Some(days) if days <= 30 => 1.0,
        Some(days) if days <= 90 => 0.8,
        Some(days) if days <= 180 => 0.5,
        Some(days) if days <= 365 => 0.2,
        _ => 0.0,
    }
}

/// Smallest day delta between `now` and any recency date across all installs.
///
/// Dates in the future produce negative deltas, which count as fresh activity.
pub fn freshest_activity_days(installs: &[Value], now: DateTime<Utc>) -> Option<i64> {
    installs
        .iter()
        .filter(|item| item.is_object())
        .flat_map(|item| {
            RECENCY_DATE_FIELDS
                .iter()
                .filter_map(move |field| item.get(*field).and_then(parse_date))
        })
        .map(|seen| (now - seen).num_days())
        .min()
}

/// Recency of tech activity, in `[0, 1]`.
pub fn recency_score(days: Option<i64>) -> f64 {
    match days {
        Some(d) if d <= 30 => 1.0,
        Some(d) if d <= 120 => 0.6,
        Some(d) if d <= 365 => 0.2,
        _ => 0.0,
    }
}

/// Classifies an account's timing from its installs and contract signal.
///
/// `installs` is `None` when the technographic payload held no install list.
pub fn trigger_badge(
    installs: Option<&[Value]>,
    contract: &ContractSignal,
    now: DateTime<Utc>,
    policy: ScoringPolicy,
) -> Badge {
    let freshest = installs.and_then(|items| freshest_activity_days(items, now));

    match policy {
        ScoringPolicy::ContractAware => {
            let combined = CONTRACT_WEIGHT * contract_urgency(contract)
                + RECENCY_WEIGHT * recency_score(freshest);
            if combined >= HOT_THRESHOLD {
                Badge::Hot
            } else if combined >= WARM_THRESHOLD {
                Badge::Warm
            } else {
                Badge::Cold
            }
        }
        ScoringPolicy::RecencyOnly => match freshest {
            Some(days) if days <= 30 => Badge::Hot,
            Some(days) if days <= 120 => Badge::Warm,
            _ => Badge::Cold,
        },
    }
}
