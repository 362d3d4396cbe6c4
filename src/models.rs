use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Placeholder reported when no allowlisted cloud vendor was found.
pub const UNKNOWN_CLOUD_PROVIDER: &str = "Unknown cloud provider";

// ============ Data source wire types ============

/// One content block of a tool response.
///
/// Only text blocks are inspected; other block types (images, resources)
/// deserialize with `text: None` and are skipped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            kind: Some("text".to_string()),
            text: Some(text.into()),
        }
    }
}

// ============ Classification ============

/// Three-level timing badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Badge {
    Hot,
    Warm,
    Cold,
}

impl fmt::Display for Badge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Badge::Hot => "Hot",
            Badge::Warm => "Warm",
            Badge::Cold => "Cold",
        };
        f.write_str(label)
    }
}

/// Which badge formula, boost table, fit components and reason limit apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScoringPolicy {
    /// Contract urgency and install recency combined; seven fit components.
    #[default]
    ContractAware,
    /// Install recency only; four fit components and larger boosts.
    RecencyOnly,
}

impl ScoringPolicy {
    /// Maximum number of reasons kept on a ranked account.
    pub fn reason_limit(self) -> usize {
        match self {
            ScoringPolicy::ContractAware => 3,
            ScoringPolicy::RecencyOnly => 2,
        }
    }
}

impl fmt::Display for ScoringPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoringPolicy::ContractAware => f.write_str("contract-aware"),
            ScoringPolicy::RecencyOnly => f.write_str("recency-only"),
        }
    }
}

impl FromStr for ScoringPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "contract-aware" | "contract_aware" | "canonical" => Ok(ScoringPolicy::ContractAware),
            "recency-only" | "recency_only" | "lean" => Ok(ScoringPolicy::RecencyOnly),
            other => Err(format!(
                "unknown scoring policy '{}' (expected contract-aware or recency-only)",
                other
            )),
        }
    }
}

// ============ Signal summaries ============

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FirmographicSummary {
    pub name: Option<String>,
    pub industry: Option<String>,
    pub employee_count: Option<u64>,
    pub it_spend: Option<f64>,
    pub country: Option<String>,
    pub website: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TechnographicSummary {
    /// Best-available install count; `None` when no install list was found.
    pub count: Option<u64>,
    pub badge: Badge,
    pub top_technologies: Vec<String>,
    pub avg_intensity: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudSpendSummary {
    pub monthly_spend: f64,
    pub vendor_count: u64,
    pub services_count: u64,
    pub top_cloud_services: Vec<String>,
}

impl Default for CloudSpendSummary {
    fn default() -> Self {
        Self {
            monthly_spend: 0.0,
            vendor_count: 0,
            services_count: 0,
            top_cloud_services: vec![UNKNOWN_CLOUD_PROVIDER.to_string()],
        }
    }
}

impl CloudSpendSummary {
    /// Top allowlisted vendor, ignoring the placeholder entry.
    pub fn primary_service(&self) -> Option<&str> {
        self.top_cloud_services
            .first()
            .map(String::as_str)
            .filter(|name| *name != UNKNOWN_CLOUD_PROVIDER)
    }

    /// True when at least one real allowlisted vendor was ranked.
    pub fn has_known_services(&self) -> bool {
        self.primary_service().is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpendSummary {
    pub annual_spend: f64,
    pub top_categories: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionalAreaSummary {
    pub area_count: u64,
    pub top_areas: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractSignal {
    pub days_to_renewal: Option<u64>,
}

// ============ Output ============

/// Final per-domain record, ordered by `score` in a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedAccount {
    pub domain: String,
    pub company: Option<String>,
    pub score: f64,
    pub fit_score: f64,
    pub badge: Badge,
    pub employee_count: Option<u64>,
    pub it_spend: Option<f64>,
    pub company_spend_annual: f64,
    pub tech_count: Option<u64>,
    pub tech_intensity: Option<f64>,
    pub cloud_monthly_spend: f64,
    pub cloud_top_services: Vec<String>,
    pub fai_areas: Vec<String>,
    pub spend_top_categories: Vec<String>,
    pub industry: Option<String>,
    pub top_technologies: Vec<String>,
    pub days_to_renewal: Option<u64>,
    pub reasons: Vec<String>,
    pub action: String,
}

// ============ API types ============

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrioritizeRequest {
    pub domains: Vec<String>,
    #[serde(default)]
    pub with_blurbs: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrioritizedAccount {
    #[serde(flatten)]
    pub account: RankedAccount,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sales_blurb: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrioritizeResponse {
    pub run_id: uuid::Uuid,
    pub count: usize,
    pub accounts: Vec<PrioritizedAccount>,
}
