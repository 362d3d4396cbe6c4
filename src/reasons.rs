//! Human-readable justifications and the recommended next action.

use crate::models::{
    Badge, CloudSpendSummary, ContractSignal, FirmographicSummary, FunctionalAreaSummary,
    SpendSummary, TechnographicSummary,
};

pub const ACTION_RENEWAL: &str = "Engage ahead of contract renewal window";
pub const ACTION_OUTBOUND_TECH: &str = "Outbound now with recent tech change angle";
pub const ACTION_PREP: &str = "Prep account, monitor signals, soft outreach";
pub const ACTION_DEPRIORITIZE: &str = "Deprioritize for now";

/// Renewals within this many days get a reason line.
const RENEWAL_REASON_DAYS: u64 = 180;
/// Renewals within this many days override every other action.
const RENEWAL_ACTION_DAYS: u64 = 90;

/// Borrowed view over every summary of one account.
#[derive(Debug, Clone, Copy)]
pub struct AccountSignals<'a> {
    pub firmographic: &'a FirmographicSummary,
    pub technographic: &'a TechnographicSummary,
    pub cloud_spend: &'a CloudSpendSummary,
    pub spend: &'a SpendSummary,
    pub functional_areas: &'a FunctionalAreaSummary,
    pub contract: &'a ContractSignal,
}

/// Reasons in fixed priority order, truncated to `limit`.
///
/// Order decides which reasons survive truncation, so it must not change.
pub fn build_reasons(signals: &AccountSignals<'_>, limit: usize) -> Vec<String> {
    let mut reasons = Vec::new();

    if let Some(days) = signals.contract.days_to_renewal {
        if days <= RENEWAL_REASON_DAYS {
            reasons.push(format!("Contract renewal window (~{} days)", days));
        }
    }

    let top_areas = &signals.functional_areas.top_areas;
    if !top_areas.is_empty() {
        reasons.push(format!("Active in functions: {}", top_areas.join(", ")));
    }

    let top_categories = &signals.spend.top_categories;
    if !top_categories.is_empty() {
        reasons.push(format!("Top IT spend areas: {}", top_categories.join(", ")));
    }

    if let Some(top) = signals.technographic.top_technologies.first() {
        reasons.push(format!("Key stack present: {}", top));
    }

    if let Some(industry) = signals.firmographic.industry.as_deref() {
        if !industry.is_empty() {
            reasons.push(format!("Industry fit: {}", industry));
        }
    }

    let monthly = signals.cloud_spend.monthly_spend;
    if monthly != 0.0 {
        reasons.push(format!(
            "Cloud spend signal (~${:.2}M/mo)",
            monthly / 1_000_000.0
        ));
    }

    let annual = signals.spend.annual_spend;
    if annual != 0.0 {
        reasons.push(format!("IT spend signal (~${:.0}M/yr)", annual / 1_000_000.0));
    }

    match signals.technographic.badge {
        Badge::Hot => reasons.push("Recent tech verification activity (Hot)".to_string()),
        Badge::Warm => reasons.push("Some recent tech activity (Warm)".to_string()),
        Badge::Cold => {}
    }

    if signals.cloud_spend.has_known_services() {
        reasons.push(format!(
            "Top cloud services: {}",
            signals.cloud_spend.top_cloud_services.join(", ")
        ));
    }

    reasons.truncate(limit);
    reasons
}

/// Single next action: an imminent renewal beats everything, then the badge decides.
pub fn recommended_action(
    badge: Badge,
    cloud_spend: &CloudSpendSummary,
    contract: &ContractSignal,
) -> String {
    if matches!(contract.days_to_renewal, Some(days) if days <= RENEWAL_ACTION_DAYS) {
        return ACTION_RENEWAL.to_string();
    }

    match badge {
        Badge::Hot => match cloud_spend.primary_service() {
            Some(vendor) => format!(
                "Outbound now with cloud services angle (focus on {})",
                vendor
            ),
            None => ACTION_OUTBOUND_TECH.to_string(),
        },
        Badge::Warm => ACTION_PREP.to_string(),
        Badge::Cold => ACTION_DEPRIORITIZE.to_string(),
    }
}
