//! Batch driver: fetches every signal for each domain, scores it and ranks the batch.
//!
//! Domains are processed one at a time over a single data-source session.
//! A domain whose fetch fails is retried under [`RetryPolicy`]; once the
//! attempts are exhausted it is dropped from the output without an error.

use crate::config::EngineConfig;
use crate::data_source::{tools, CachedDataSource, DataSource};
use crate::errors::{AppError, ResultExt};
use crate::extractors::{
    contract_signal, infer_installs, summarize_cloud_spend, summarize_firmographic,
    summarize_functional_areas, summarize_spend, summarize_technographic, top_products,
};
use crate::models::RankedAccount;
use crate::parsing::extract_structured_payload;
use crate::reasons::{build_reasons, recommended_action, AccountSignals};
use crate::scoring::{final_score, fit_score, round2, FitInputs};
use chrono::{DateTime, Utc};
use regex::Regex;
use serde_json::{json, Value};
use std::sync::OnceLock;
use std::time::Duration;
use uuid::Uuid;

/// Per-domain retry schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            base_delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// Backoff slept after failed attempt `attempt` (1-based): `base_delay * attempt`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay * attempt
    }
}

// ============ Domain input ============

fn hostname_regex() -> &'static Regex {
    static HOSTNAME: OnceLock<Regex> = OnceLock::new();
    HOSTNAME.get_or_init(|| {
        Regex::new(r"^(?:[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?\.)+[a-z][a-z0-9-]{0,62}$")
            .expect("static hostname regex")
    })
}

/// Cleans one user-supplied domain: scheme, `www.`, path, port and trailing dots go.
pub fn normalize_domain(raw: &str) -> Option<String> {
    let lowered = raw.trim().to_lowercase();
    let without_scheme = lowered
        .strip_prefix("https://")
        .or_else(|| lowered.strip_prefix("http://"))
        .unwrap_or(&lowered);
    let host = without_scheme
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default();
    let host = host.split(':').next().unwrap_or_default();
    let host = host.strip_prefix("www.").unwrap_or(host);
    let host = host.trim_end_matches('.');

    if hostname_regex().is_match(host) {
        Some(host.to_string())
    } else {
        None
    }
}

/// Normalizes a batch of domains, dropping blanks and invalid hosts and
/// keeping the first occurrence of each duplicate.
pub fn normalize_domains<I, S>(raw: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut domains: Vec<String> = Vec::new();
    for entry in raw {
        let entry = entry.as_ref();
        if entry.trim().is_empty() {
            continue;
        }
        match normalize_domain(entry) {
            Some(domain) if !domains.contains(&domain) => domains.push(domain),
            Some(_) => {}
            None => tracing::warn!("Skipping invalid domain: {:?}", entry),
        }
    }
    domains
}

// ============ Fetch ============

/// Raw structured payloads of every signal category for one domain.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DomainSignals {
    pub firmographic: Value,
    pub technographic: Value,
    pub cloud_spend: Value,
    pub spend: Value,
    pub contracts: Value,
    pub functional_areas: Value,
}

async fn fetch_payload(
    source: &dyn DataSource,
    tool: &str,
    params: Value,
) -> Result<Value, AppError> {
    let blocks = source.call_tool(tool, params).await?;
    extract_structured_payload(&blocks)
}

/// Best-effort fetch: any failure degrades to an empty object.
async fn fetch_optional(source: &dyn DataSource, tool: &str, params: Value) -> Value {
    match fetch_payload(source, tool, params).await {
        Ok(payload) => payload,
        Err(e) => {
            tracing::warn!("{} unavailable, continuing without it: {}", tool, e);
            json!({})
        }
    }
}

/// Fetches the six signal categories for a domain, in order.
///
/// Firmographic, technographic and cloud spend are required; spend, contracts
/// and functional areas are best effort. The functional-area tool is only
/// called when the technographic payload names at least one product.
pub async fn fetch_domain_signals(
    source: &dyn DataSource,
    domain: &str,
    engine: &EngineConfig,
) -> Result<DomainSignals, AppError> {
    let firmographic = fetch_payload(source, tools::FIRMOGRAPHIC, json!({ "companyDomain": domain }))
        .await
        .with_context(|| format!("firmographic for {}", domain))?;

    let technographic = fetch_payload(
        source,
        tools::TECHNOGRAPHIC,
        json!({
            "companyDomain": domain,
            "limit": engine.max_results,
            "maxResults": engine.max_results,
        }),
    )
    .await
    .with_context(|| format!("technographic for {}", domain))?;

    let cloud_spend = fetch_payload(source, tools::CLOUD_SPEND, json!({ "companyDomain": domain }))
        .await
        .with_context(|| format!("cloud spend for {}", domain))?;

    let spend = fetch_optional(source, tools::SPEND, json!({ "companyDomain": domain })).await;
    let contracts =
        fetch_optional(source, tools::CONTRACTS, json!({ "companyDomain": domain })).await;

    let products = top_products(&infer_installs(&technographic));
    let functional_areas = if products.is_empty() {
        json!({})
    } else {
        fetch_optional(
            source,
            tools::FUNCTIONAL_AREAS,
            json!({ "companyDomain": domain, "products": products }),
        )
        .await
    };

    Ok(DomainSignals {
        firmographic,
        technographic,
        cloud_spend,
        spend,
        contracts,
        functional_areas,
    })
}

// ============ Scoring ============

/// Runs the pure pipeline over one domain's payloads.
pub fn build_ranked_account(
    domain: &str,
    signals: &DomainSignals,
    engine: &EngineConfig,
    now: DateTime<Utc>,
) -> RankedAccount {
    let policy = engine.scoring_policy;

    let firmographic = summarize_firmographic(&signals.firmographic);
    let installs = infer_installs(&signals.technographic);
    let contract = contract_signal(&signals.contracts, now);
    let technographic = summarize_technographic(&installs, &contract, now, policy);
    let cloud_spend = summarize_cloud_spend(&signals.cloud_spend, &engine.cloud_vendor_allowlist);
    let spend = summarize_spend(&signals.spend);
    let functional_areas = summarize_functional_areas(&signals.functional_areas);

    let inputs = FitInputs {
        employees: firmographic.employee_count.unwrap_or(0) as f64,
        firmographic_it_spend: firmographic.it_spend.unwrap_or(0.0),
        annual_spend: spend.annual_spend,
        install_count: installs.returned(),
        avg_intensity: installs.mean_intensity(),
        cloud_monthly_spend: cloud_spend.monthly_spend,
        area_count: functional_areas.area_count,
    };
    let fit = fit_score(&inputs, policy);
    let badge = technographic.badge;

    let account_signals = AccountSignals {
        firmographic: &firmographic,
        technographic: &technographic,
        cloud_spend: &cloud_spend,
        spend: &spend,
        functional_areas: &functional_areas,
        contract: &contract,
    };
    let reasons = build_reasons(&account_signals, policy.reason_limit());
    let action = recommended_action(badge, &cloud_spend, &contract);

    RankedAccount {
        domain: domain.to_string(),
        company: firmographic.name.clone(),
        score: round2(final_score(fit, badge, policy)),
        fit_score: fit,
        badge,
        employee_count: firmographic.employee_count,
        it_spend: firmographic.it_spend,
        company_spend_annual: spend.annual_spend,
        tech_count: technographic.count,
        tech_intensity: technographic.avg_intensity,
        cloud_monthly_spend: cloud_spend.monthly_spend,
        cloud_top_services: cloud_spend.top_cloud_services,
        fai_areas: functional_areas.top_areas,
        spend_top_categories: spend.top_categories,
        industry: firmographic.industry,
        top_technologies: technographic.top_technologies,
        days_to_renewal: contract.days_to_renewal,
        reasons,
        action,
    }
}

/// Sorts by score descending. Stable, so ties keep input order.
pub fn rank_accounts(accounts: &mut [RankedAccount]) {
    accounts.sort_by(|a, b| b.score.total_cmp(&a.score));
}

// ============ Batch ============

/// Output of one batch.
#[derive(Debug, Clone, PartialEq)]
pub struct PrioritizationRun {
    pub run_id: Uuid,
    pub accounts: Vec<RankedAccount>,
}

/// Drives one batch over a data source.
pub struct Prioritizer<'a> {
    source: &'a dyn DataSource,
    engine: &'a EngineConfig,
}

impl<'a> Prioritizer<'a> {
    pub fn new(source: &'a dyn DataSource, engine: &'a EngineConfig) -> Self {
        Self { source, engine }
    }

    /// Scores every domain with the current time as "now".
    pub async fn run(&self, domains: &[String]) -> PrioritizationRun {
        self.run_at(domains, Utc::now()).await
    }

    /// Scores every domain against a fixed "now".
    ///
    /// 1. Wrap the source in a run-scoped response cache
    /// 2. Fetch and score each domain, retrying failures
    /// 3. Drop domains that exhausted their attempts
    /// 4. Rank the survivors by score
    pub async fn run_at(&self, domains: &[String], now: DateTime<Utc>) -> PrioritizationRun {
        let run_id = Uuid::new_v4();
        let cached = CachedDataSource::new(self.source, self.engine.tool_cache_ttl);

        tracing::info!(
            "[{}] Prioritizing {} domains (policy: {})",
            run_id,
            domains.len(),
            self.engine.scoring_policy
        );

        let mut accounts = Vec::with_capacity(domains.len());
        for domain in domains {
            match self.score_with_retry(&cached, domain, now, run_id).await {
                Some(account) => {
                    tracing::info!(
                        "[{}] ✓ {} scored {:.2} ({})",
                        run_id,
                        domain,
                        account.score,
                        account.badge
                    );
                    accounts.push(account);
                }
                None => tracing::warn!("[{}] Dropping {} after failed attempts", run_id, domain),
            }
        }

        rank_accounts(&mut accounts);
        tracing::info!(
            "[{}] Ranked {} of {} domains",
            run_id,
            accounts.len(),
            domains.len()
        );

        PrioritizationRun { run_id, accounts }
    }

    async fn score_with_retry(
        &self,
        source: &dyn DataSource,
        domain: &str,
        now: DateTime<Utc>,
        run_id: Uuid,
    ) -> Option<RankedAccount> {
        let retry = self.engine.retry;

        for attempt in 1..=retry.max_attempts {
            tracing::debug!("[{}] Fetching {} (attempt {})", run_id, domain, attempt);

            match fetch_domain_signals(source, domain, self.engine).await {
                Ok(signals) => return Some(build_ranked_account(domain, &signals, self.engine, now)),
                Err(e) => {
                    tracing::warn!(
                        "[{}] Attempt {}/{} failed for {}: {}",
                        run_id,
                        attempt,
                        retry.max_attempts,
                        domain,
                        e
                    );
                    if !e.is_retryable() {
                        return None;
                    }
                    tokio::time::sleep(retry.delay_for(attempt)).await;
                }
            }
        }

        None
    }
}

/// Batch entry point: ranked accounts for `domains`, failed domains omitted.
pub async fn prioritize_accounts(
    source: &dyn DataSource,
    domains: &[String],
    engine: &EngineConfig,
) -> Vec<RankedAccount> {
    Prioritizer::new(source, engine).run(domains).await.accounts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Badge;

    #[test]
    fn test_retry_schedule() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 2);
        assert_eq!(policy.delay_for(1), Duration::from_millis(500));
        assert_eq!(policy.delay_for(2), Duration::from_millis(1000));
    }

    #[test]
    fn test_normalize_domain() {
        assert_eq!(normalize_domain(" Acme.COM "), Some("acme.com".into()));
        assert_eq!(
            normalize_domain("https://www.acme.com/about?x=1"),
            Some("acme.com".into())
        );
        assert_eq!(normalize_domain("http://shop.acme.co.uk:8080"), Some("shop.acme.co.uk".into()));
        assert_eq!(normalize_domain("acme.com."), Some("acme.com".into()));
        assert_eq!(normalize_domain("localhost"), None);
        assert_eq!(normalize_domain("not a domain"), None);
        assert_eq!(normalize_domain("-bad-.com"), None);
    }

    #[test]
    fn test_normalize_domains_dedupes_in_order() {
        let domains = normalize_domains(["b.com", "", "A.com", "www.b.com", "???", "a.com"]);
        assert_eq!(domains, vec!["b.com", "a.com"]);
    }

    #[test]
    fn test_rank_is_stable_on_ties() {
        let now = Utc::now();
        let engine = EngineConfig::default();
        let mut accounts: Vec<RankedAccount> = ["first.com", "second.com", "third.com"]
            .iter()
            .map(|d| build_ranked_account(d, &DomainSignals::default(), &engine, now))
            .collect();
        accounts[2].score = 10.0;

        rank_accounts(&mut accounts);
        let order: Vec<&str> = accounts.iter().map(|a| a.domain.as_str()).collect();
        assert_eq!(order, vec!["third.com", "first.com", "second.com"]);
    }

    #[test]
    fn test_empty_signals_give_cold_zero_account() {
        let account = build_ranked_account(
            "empty.com",
            &DomainSignals::default(),
            &EngineConfig::default(),
            Utc::now(),
        );
        assert_eq!(account.score, 0.0);
        assert_eq!(account.badge, Badge::Cold);
        assert!(account.reasons.is_empty());
        assert_eq!(account.action, "Deprioritize for now");
        assert_eq!(account.cloud_top_services, vec!["Unknown cloud provider"]);
        assert_eq!(account.tech_count, None);
    }
}
