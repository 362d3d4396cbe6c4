//! Signal extractors: one per data category.
//!
//! Each extractor is a pure function from an untyped payload to a small fixed
//! record. Field names are tried in priority order because the upstream API
//! is not consistent across accounts; unexpected shapes produce the empty
//! summary rather than an error.

use crate::badge::trigger_badge;
use crate::models::{
    ContractSignal, CloudSpendSummary, FirmographicSummary, FunctionalAreaSummary, ScoringPolicy,
    SpendSummary, TechnographicSummary, UNKNOWN_CLOUD_PROVIDER,
};
use crate::parsing::{as_count, as_name, first_name, first_present, first_str, parse_amount, parse_date};
use chrono::{DateTime, Utc};
use serde_json::Value;

const INSTALL_LIST_KEYS: &[&str] = &[
    "products",
    "technologies",
    "results",
    "items",
    "data",
    "installations",
    "installs",
];
const TECHNOLOGY_NAME_KEYS: &[&str] = &["productName", "technologyName", "name", "vendorName"];
const PRODUCT_NAME_KEYS: &[&str] = &["productName", "technologyName", "name"];
const SUMMARY_WINDOW: usize = 10;
const MAX_PRODUCTS: usize = 3;

const TOTAL_SPEND_KEYS: &[&str] = &[
    "totalSpendAmount",
    "totalSpend",
    "totalITSpendAmount",
    "totalITSpend",
    "annualSpend",
    "totalAnnualSpend",
    "itSpend",
    "totalItSpend",
];
const CATEGORY_LIST_KEYS: &[&str] = &[
    "categories",
    "categorySpend",
    "spendByCategory",
    "categoryBreakdown",
];
const CATEGORY_NAME_KEYS: &[&str] = &["category", "name", "categoryName"];
const CATEGORY_SPEND_KEYS: &[&str] = &[
    "totalSpendAmount",
    "spendAmount",
    "totalSpend",
    "spend",
    "value",
    "amount",
];

const AREA_LIST_KEYS: &[&str] = &["functionalAreas", "departments", "results", "data", "items"];
const AREA_NAME_KEYS: &[&str] = &["name", "functionalArea", "department", "function"];
const AREA_KEYWORDS: &[&str] = &[
    "it",
    "engineering",
    "data",
    "security",
    "cloud",
    "ai",
    "machine learning",
    "ml",
];

const CONTRACT_LIST_KEYS: &[&str] = &["contracts", "results", "items", "data", "contractsList"];
const CONTRACT_DATE_FIELDS: &[&str] = &[
    "renewalDate",
    "contractRenewalDate",
    "endDate",
    "expirationDate",
    "contractEndDate",
    "renewal",
    "renewal_date",
];

const TOP_N: usize = 3;

// ============ Firmographic ============

pub fn summarize_firmographic(data: &Value) -> FirmographicSummary {
    if !data.is_object() {
        return FirmographicSummary::default();
    }

    FirmographicSummary {
        name: first_str(data, &["name"]),
        industry: first_str(data, &["industry"]),
        employee_count: data.get("employeeCount").and_then(as_count),
        it_spend: data
            .get("itSpend")
            .and_then(parse_amount)
            .filter(|v| *v >= 0.0),
        country: first_str(data, &["country"]),
        website: first_str(data, &["website"]),
    }
}

// ============ Technographic ============

/// Install list located inside a technographic payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstallSet {
    /// `None` when the payload held no list at all.
    pub items: Option<Vec<Value>>,
    /// Total reported by the API, which may exceed the items delivered.
    pub total_count: Option<u64>,
}

impl InstallSet {
    pub fn as_slice(&self) -> Option<&[Value]> {
        self.items.as_deref()
    }

    /// Number of installs actually delivered.
    pub fn returned(&self) -> usize {
        self.items.as_ref().map(Vec::len).unwrap_or(0)
    }

    /// Best-available install count.
    ///
    /// The reported total is trusted only when it is at least the number of
    /// items delivered.
    pub fn best_count(&self) -> Option<u64> {
        let returned = self.items.as_ref()?.len() as u64;
        match self.total_count {
            Some(total) if total >= returned => Some(total),
            _ => Some(returned),
        }
    }

    /// Mean numeric `intensity` across every delivered install.
    pub fn mean_intensity(&self) -> Option<f64> {
        mean_intensity(self.items.as_deref().unwrap_or(&[]))
    }
}

pub fn infer_installs(data: &Value) -> InstallSet {
    match data {
        Value::Array(items) => InstallSet {
            items: Some(items.clone()),
            total_count: None,
        },
        Value::Object(_) => InstallSet {
            items: INSTALL_LIST_KEYS
                .iter()
                .find_map(|key| data.get(*key).and_then(Value::as_array))
                .cloned(),
            total_count: data.get("totalCount").and_then(Value::as_u64),
        },
        _ => InstallSet::default(),
    }
}

fn mean_intensity(items: &[Value]) -> Option<f64> {
    let intensities: Vec<f64> = items
        .iter()
        .filter_map(|item| item.get("intensity"))
        .filter_map(Value::as_f64)
        .collect();

    if intensities.is_empty() {
        None
    } else {
        Some(intensities.iter().sum::<f64>() / intensities.len() as f64)
    }
}

pub fn summarize_technographic(
    installs: &InstallSet,
    contract: &ContractSignal,
    now: DateTime<Utc>,
    policy: ScoringPolicy,
) -> TechnographicSummary {
    let badge = trigger_badge(installs.as_slice(), contract, now, policy);

    let window = installs
        .as_slice()
        .map(|items| &items[..items.len().min(SUMMARY_WINDOW)])
        .unwrap_or(&[]);

    let top_technologies = window
        .iter()
        .filter(|item| item.is_object())
        .filter_map(|item| first_name(item, TECHNOLOGY_NAME_KEYS))
        .collect();

    TechnographicSummary {
        count: installs.best_count(),
        badge,
        top_technologies,
        avg_intensity: mean_intensity(window),
    }
}

/// Up to three distinct product names, used to scope the functional-area query.
pub fn top_products(installs: &InstallSet) -> Vec<String> {
    let mut products: Vec<String> = Vec::new();
    for item in installs.as_slice().unwrap_or(&[]) {
        if !item.is_object() {
            continue;
        }
        if let Some(name) = first_name(item, PRODUCT_NAME_KEYS) {
            if !products.contains(&name) {
                products.push(name);
            }
        }
        if products.len() >= MAX_PRODUCTS {
            break;
        }
    }
    products
}

// ============ Cloud spend ============

/// Summarizes `technologyServices[].vendors[]`.
///
/// Every well-formed vendor counts toward `vendor_count` and `monthly_spend`;
/// only allowlisted vendors compete for `top_cloud_services`.
pub fn summarize_cloud_spend(data: &Value, allowlist: &[String]) -> CloudSpendSummary {
    if !data.is_object() {
        return CloudSpendSummary::default();
    }

    let services = data
        .get("technologyServices")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[]);
    let allowlist: Vec<String> = allowlist.iter().map(|v| v.to_lowercase()).collect();

    let mut monthly_spend = 0.0;
    let mut vendor_count = 0u64;
    let mut spend_by_vendor: Vec<(String, f64)> = Vec::new();

    let vendors = services
        .iter()
        .filter_map(|service| service.get("vendors").and_then(Value::as_array))
        .flatten()
        .filter(|vendor| vendor.is_object());

    for vendor in vendors {
        vendor_count += 1;

        let name = first_name(vendor, &["vendorName", "name"]).unwrap_or_else(|| "Unknown".to_string());
        let lowered = name.to_lowercase();
        let is_cloud = allowlist.iter().any(|keyword| lowered.contains(keyword.as_str()));

        let spend = match vendor.get("estimatedMonthlySpend") {
            None | Some(Value::Null) => Some(0.0),
            Some(value) => value.as_f64(),
        };
        let Some(spend) = spend else {
            continue;
        };

        monthly_spend += spend;
        if is_cloud {
            match spend_by_vendor.iter_mut().find(|(vendor, _)| *vendor == name) {
                Some((_, total)) => *total += spend,
                None => spend_by_vendor.push((name, spend)),
            }
        }
    }

    let mut top_cloud_services = top_by_value(spend_by_vendor, TOP_N);
    if top_cloud_services.is_empty() {
        top_cloud_services.push(UNKNOWN_CLOUD_PROVIDER.to_string());
    }

    CloudSpendSummary {
        monthly_spend,
        vendor_count,
        services_count: services.len() as u64,
        top_cloud_services,
    }
}

// ============ IT spend ============

/// Summarizes company spend.
///
/// The annual figure is the maximum across candidate total fields, since the
/// same figure often appears under several names.
pub fn summarize_spend(data: &Value) -> SpendSummary {
    if !data.is_object() {
        return SpendSummary::default();
    }

    let annual_spend = TOTAL_SPEND_KEYS
        .iter()
        .filter_map(|key| data.get(*key).and_then(parse_amount))
        .fold(0.0_f64, f64::max);

    let pairs: Vec<(String, f64)> = CATEGORY_LIST_KEYS
        .iter()
        .filter_map(|key| data.get(*key).and_then(Value::as_array))
        .flatten()
        .filter(|item| item.is_object())
        .filter_map(|item| {
            let name = first_name(item, CATEGORY_NAME_KEYS)?;
            let spend = first_present(item, CATEGORY_SPEND_KEYS).and_then(parse_amount)?;
            Some((name, spend))
        })
        .collect();

    SpendSummary {
        annual_spend,
        top_categories: top_by_value(pairs, TOP_N),
    }
}

// ============ Functional areas ============

/// Functional areas whose names mention a technical keyword.
///
/// Duplicates are dropped by exact name, so differently cased spellings of
/// the same area are kept as separate entries.
pub fn summarize_functional_areas(data: &Value) -> FunctionalAreaSummary {
    if !data.is_object() {
        return FunctionalAreaSummary::default();
    }

    let mut areas: Vec<String> = Vec::new();
    let items = AREA_LIST_KEYS
        .iter()
        .filter_map(|key| data.get(*key).and_then(Value::as_array))
        .flatten()
        .filter(|item| item.is_object());

    for item in items {
        let Some(name) = first_present(item, AREA_NAME_KEYS).and_then(as_name) else {
            continue;
        };
        let lowered = name.to_lowercase();
        let relevant = AREA_KEYWORDS.iter().any(|keyword| lowered.contains(keyword));
        if relevant && !areas.contains(&name) {
            areas.push(name);
        }
    }

    FunctionalAreaSummary {
        area_count: areas.len() as u64,
        top_areas: areas.into_iter().take(TOP_N).collect(),
    }
}

// ============ Contracts ============

/// Days until the soonest renewal or expiration strictly after `now`.
///
/// The first list-shaped container wins even when empty; an empty or missing
/// list makes the object itself the only candidate record.
pub fn contract_signal(data: &Value, now: DateTime<Utc>) -> ContractSignal {
    let single = std::slice::from_ref(data);
    let candidates: &[Value] = match data {
        Value::Array(items) => items,
        Value::Object(_) => CONTRACT_LIST_KEYS
            .iter()
            .find_map(|key| data.get(*key).and_then(Value::as_array))
            .map(Vec::as_slice)
            .filter(|items| !items.is_empty())
            .unwrap_or(single),
        _ => &[],
    };

    let soonest = candidates
        .iter()
        .filter(|item| item.is_object())
        .flat_map(|item| {
            CONTRACT_DATE_FIELDS
                .iter()
                .filter_map(move |field| item.get(*field).and_then(parse_date))
        })
        .filter(|date| *date > now)
        .min();

    ContractSignal {
        days_to_renewal: soonest.map(|date| (date - now).num_days().max(0) as u64),
    }
}

/// Names ordered by value descending; ties keep first-seen order.
fn top_by_value(mut pairs: Vec<(String, f64)>, limit: usize) -> Vec<String> {
    pairs.sort_by(|a, b| b.1.total_cmp(&a.1));
    pairs.into_iter().take(limit).map(|(name, _)| name).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CLOUD_VENDOR_ALLOWLIST;
    use chrono::{Duration, TimeZone};
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap()
    }

    fn allowlist() -> Vec<String> {
        CLOUD_VENDOR_ALLOWLIST.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_firmographic_summary() {
        let summary = summarize_firmographic(&json!({
            "name": "Acme Corp",
            "industry": "Manufacturing",
            "employeeCount": 10000,
            "itSpend": "$5,000,000",
            "country": "US",
            "website": "acme.com",
            "unrelated": true
        }));

        assert_eq!(summary.name.as_deref(), Some("Acme Corp"));
        assert_eq!(summary.employee_count, Some(10_000));
        assert_eq!(summary.it_spend, Some(5_000_000.0));
        assert_eq!(summary.website.as_deref(), Some("acme.com"));
    }

    #[test]
    fn test_firmographic_non_object_is_empty() {
        assert_eq!(summarize_firmographic(&json!([1, 2])), FirmographicSummary::default());
        assert_eq!(
            summarize_firmographic(&json!({"employeeCount": -3, "itSpend": -10})),
            FirmographicSummary::default()
        );
    }

    #[test]
    fn test_infer_installs_key_priority() {
        let set = infer_installs(&json!({
            "totalCount": 57,
            "results": [{"productName": "B"}],
            "products": [{"productName": "A"}, {"productName": "C"}]
        }));
        assert_eq!(set.returned(), 2);
        assert_eq!(set.total_count, Some(57));
        assert_eq!(set.best_count(), Some(57));
    }

    #[test]
    fn test_untrustworthy_total_falls_back_to_list_length() {
        let set = infer_installs(&json!({"totalCount": 1, "items": [{}, {}, {}]}));
        assert_eq!(set.best_count(), Some(3));

        let set = infer_installs(&json!({"totalCount": "many", "items": [{}, {}]}));
        assert_eq!(set.best_count(), Some(2));
    }

    #[test]
    fn test_infer_installs_without_list() {
        let set = infer_installs(&json!({"message": "no installs"}));
        assert_eq!(set.items, None);
        assert_eq!(set.best_count(), None);

        let set = infer_installs(&json!([{"name": "X"}]));
        assert_eq!(set.best_count(), Some(1));
    }

    #[test]
    fn test_technographic_summary_window() {
        let items: Vec<Value> = (0..12)
            .map(|i| json!({"productName": format!("P{}", i), "intensity": i * 100}))
            .collect();
        let set = InstallSet {
            items: Some(items),
            total_count: None,
        };

        let summary =
            summarize_technographic(&set, &ContractSignal::default(), now(), ScoringPolicy::ContractAware);
        assert_eq!(summary.count, Some(12));
        assert_eq!(summary.top_technologies.len(), 10);
        assert_eq!(summary.top_technologies[0], "P0");
        // mean of 0..=900 step 100
        assert_eq!(summary.avg_intensity, Some(450.0));
        // whole list: mean of 0..=1100 step 100
        assert_eq!(set.mean_intensity(), Some(550.0));
    }

    #[test]
    fn test_technology_names_fall_back_through_keys() {
        let set = infer_installs(&json!({"installs": [
            {"technologyName": "Kubernetes"},
            {"vendorName": "Datadog"},
            {"intensity": 5},
            "junk"
        ]}));
        let summary =
            summarize_technographic(&set, &ContractSignal::default(), now(), ScoringPolicy::ContractAware);
        assert_eq!(summary.top_technologies, vec!["Kubernetes", "Datadog"]);
        assert_eq!(summary.avg_intensity, Some(5.0));
    }

    #[test]
    fn test_top_products_distinct_and_capped() {
        let set = infer_installs(&json!({"products": [
            {"productName": "Snowflake"},
            {"productName": "Snowflake"},
            {"vendorName": "Ignored"},
            {"name": "dbt"},
            {"technologyName": "Looker"},
            {"productName": "Fivetran"}
        ]}));
        assert_eq!(top_products(&set), vec!["Snowflake", "dbt", "Looker"]);
    }

    #[test]
    fn test_cloud_spend_summary() {
        let data = json!({"technologyServices": [
            {"vendors": [
                {"vendorName": "Amazon Web Services", "estimatedMonthlySpend": 120000},
                {"vendorName": "Datadog", "estimatedMonthlySpend": 30000},
                "broken"
            ]},
            {"vendors": [
                {"name": "Microsoft Azure", "estimatedMonthlySpend": 50000.5},
                {"vendorName": "Amazon Web Services", "estimatedMonthlySpend": 1000},
                {"vendorName": "Google Cloud Platform"}
            ]},
            {"noVendors": true}
        ]});

        let summary = summarize_cloud_spend(&data, &allowlist());
        assert_eq!(summary.services_count, 3);
        assert_eq!(summary.vendor_count, 5);
        assert_eq!(summary.monthly_spend, 201000.5);
        assert_eq!(
            summary.top_cloud_services,
            vec!["Amazon Web Services", "Microsoft Azure", "Google Cloud Platform"]
        );
    }

    #[test]
    fn test_cloud_spend_placeholder_when_no_cloud_vendor() {
        let data = json!({"technologyServices": [{"vendors": [{"vendorName": "Salesforce", "estimatedMonthlySpend": 900}]}]});
        let summary = summarize_cloud_spend(&data, &allowlist());
        assert_eq!(summary.monthly_spend, 900.0);
        assert_eq!(summary.top_cloud_services, vec![UNKNOWN_CLOUD_PROVIDER]);

        let summary = summarize_cloud_spend(&json!("nope"), &allowlist());
        assert_eq!(summary.top_cloud_services, vec![UNKNOWN_CLOUD_PROVIDER]);
        assert_eq!(summary.vendor_count, 0);
    }

    #[test]
    fn test_spend_takes_max_not_sum() {
        let data = json!({
            "totalSpend": "$12,000,000",
            "totalITSpend": 8_000_000,
            "annualSpend": "unknown",
            "categories": [
                {"category": "Security", "spend": 2_000_000},
                {"name": "Cloud", "totalSpendAmount": "$5,000,000"},
                {"category": "Zero", "spend": 0, "value": 10}
            ],
            "spendByCategory": [
                {"categoryName": "Data", "amount": 3_500_000},
                {"category": "No spend"}
            ]
        });

        let summary = summarize_spend(&data);
        assert_eq!(summary.annual_spend, 12_000_000.0);
        assert_eq!(summary.top_categories, vec!["Cloud", "Data", "Security"]);
    }

    #[test]
    fn test_spend_defaults() {
        assert_eq!(summarize_spend(&json!({})), SpendSummary::default());
        assert_eq!(summarize_spend(&json!(null)), SpendSummary::default());
    }

    #[test]
    fn test_functional_areas_keyword_match() {
        let data = json!({
            "functionalAreas": [
                {"name": "IT Operations"},
                {"name": "Sales"},
                {"department": "Data Engineering"},
                {"name": "IT Operations"}
            ],
            "items": [
                {"function": "IT"},
                {"name": "Cloud Operations"}
            ]
        });

        let summary = summarize_functional_areas(&data);
        assert_eq!(summary.area_count, 4);
        assert_eq!(
            summary.top_areas,
            vec!["IT Operations", "Data Engineering", "IT"]
        );
    }

    #[test]
    fn test_functional_area_dedup_is_case_sensitive() {
        let data = json!({"departments": [{"name": "IT"}, {"name": "it"}]});
        let summary = summarize_functional_areas(&data);
        assert_eq!(summary.top_areas, vec!["IT", "it"]);
    }

    #[test]
    fn test_contract_signal_picks_soonest_future_date() {
        let data = json!({"contracts": [
            {"renewalDate": (now() - Duration::days(10)).to_rfc3339()},
            {"endDate": (now() + Duration::days(200)).to_rfc3339()},
            {"expirationDate": (now() + Duration::days(45)).to_rfc3339(), "renewal": "soon"}
        ]});
        assert_eq!(contract_signal(&data, now()).days_to_renewal, Some(45));
    }

    #[test]
    fn test_contract_signal_ignores_past_dates() {
        let data = json!([
            {"renewalDate": "2020-01-01"},
            {"contractEndDate": "2024-12-31T00:00:00Z"}
        ]);
        assert_eq!(contract_signal(&data, now()), ContractSignal::default());
    }

    #[test]
    fn test_contract_signal_falls_back_to_single_record() {
        let data = json!({"renewal_date": "2025-07-01", "contracts": []});
        assert_eq!(contract_signal(&data, now()).days_to_renewal, Some(30));

        assert_eq!(contract_signal(&json!({}), now()), ContractSignal::default());

        // An empty first container stops the search; later containers are not consulted
        let data = json!({"contracts": [], "results": [{"renewalDate": "2025-07-01"}]});
        assert_eq!(contract_signal(&data, now()), ContractSignal::default());
        assert_eq!(contract_signal(&json!("2025-07-01"), now()), ContractSignal::default());
    }
}
