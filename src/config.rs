use crate::models::ScoringPolicy;
use crate::orchestrator::RetryPolicy;
use serde::Deserialize;
use std::time::Duration;

/// Cloud vendor names whose spend feeds the top cloud services ranking.
pub const CLOUD_VENDOR_ALLOWLIST: &[&str] = &[
    "Amazon Web Services",
    "AWS",
    "Amazon",
    "Microsoft Azure",
    "Azure",
    "Google Cloud",
    "Google Cloud Platform",
    "GCP",
    "Oracle Cloud",
    "Oracle Cloud Infrastructure",
    "OCI",
    "IBM Cloud",
];

pub const DEFAULT_MAX_RESULTS: u32 = 200;
pub const DEFAULT_OPENROUTER_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
pub const DEFAULT_OPENROUTER_MODEL: &str = "openai/gpt-4o-mini";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub port: u16,
    pub mcp_url: String,
    pub mcp_token: Option<String>,
    pub max_results: u32,
    pub scoring_policy: ScoringPolicy,
    pub tool_cache_ttl_secs: u64,
    pub openrouter_api_key: Option<String>,
    pub openrouter_url: String,
    pub openrouter_model: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            mcp_url: std::env::var("MCP_URL")
                .map_err(|_| anyhow::anyhow!("MCP_URL environment variable required"))
                .and_then(|raw| {
                    if raw.trim().is_empty() {
                        anyhow::bail!("MCP_URL cannot be empty");
                    }
                    if !raw.starts_with("http://") && !raw.starts_with("https://") {
                        anyhow::bail!("MCP_URL must start with http:// or https://");
                    }
                    url::Url::parse(&raw)
                        .map_err(|e| anyhow::anyhow!("MCP_URL is not a valid URL: {}", e))?;
                    Ok(raw)
                })?,
            mcp_token: std::env::var("MCP_TOKEN")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            max_results: std::env::var("MAX_RESULTS")
                .unwrap_or_else(|_| DEFAULT_MAX_RESULTS.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("MAX_RESULTS must be a positive number"))
                .and_then(|n: u32| {
                    if n == 0 {
                        anyhow::bail!("MAX_RESULTS must be greater than zero");
                    }
                    Ok(n)
                })?,
            scoring_policy: std::env::var("SCORING_POLICY")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(|raw| raw.parse::<ScoringPolicy>())
                .transpose()
                .map_err(|e| anyhow::anyhow!(e))?
                .unwrap_or_default(),
            tool_cache_ttl_secs: std::env::var("TOOL_CACHE_TTL_SECS")
                .unwrap_or_else(|_| "600".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("TOOL_CACHE_TTL_SECS must be a number of seconds"))?,
            openrouter_api_key: std::env::var("OPENROUTER_API_KEY")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            openrouter_url: std::env::var("OPENROUTER_URL")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_OPENROUTER_URL.to_string()),
            openrouter_model: std::env::var("OPENROUTER_MODEL")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_OPENROUTER_MODEL.to_string()),
        };

        // Log successful configuration load (without sensitive values)
        tracing::info!("Configuration loaded successfully");
        tracing::debug!("MCP URL: {}", redact_url(&config.mcp_url));
        tracing::debug!("Scoring policy: {}", config.scoring_policy);
        tracing::debug!("Max technographic results: {}", config.max_results);
        if config.openrouter_api_key.is_some() {
            tracing::info!("Sales blurbs enabled (model: {})", config.openrouter_model);
        }
        tracing::debug!("Server Port: {}", config.port);

        Ok(config)
    }

    /// Builds the immutable engine configuration handed to the orchestrator.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            max_results: self.max_results,
            scoring_policy: self.scoring_policy,
            tool_cache_ttl: Duration::from_secs(self.tool_cache_ttl_secs),
            ..EngineConfig::default()
        }
    }
}

/// Immutable settings for one prioritization engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Result limit passed to the technographic tool.
    pub max_results: u32,
    pub cloud_vendor_allowlist: Vec<String>,
    pub retry: RetryPolicy,
    pub scoring_policy: ScoringPolicy,
    /// Lifetime of cached tool responses within a batch.
    pub tool_cache_ttl: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_results: DEFAULT_MAX_RESULTS,
            cloud_vendor_allowlist: CLOUD_VENDOR_ALLOWLIST
                .iter()
                .map(|v| v.to_string())
                .collect(),
            retry: RetryPolicy::default(),
            scoring_policy: ScoringPolicy::default(),
            tool_cache_ttl: Duration::from_secs(600),
        }
    }
}

/// Hides the path of an MCP URL, which may embed an API key.
pub fn redact_url(raw: &str) -> String {
    match url::Url::parse(raw) {
        Ok(parsed) => format!(
            "{}://{}/[REDACTED]",
            parsed.scheme(),
            parsed.host_str().unwrap_or("unknown")
        ),
        Err(_) => "[REDACTED]".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact_url_hides_embedded_key() {
        let redacted = redact_url("https://phoenix.example.com/api/ai/phx_secret/mcp");
        assert_eq!(redacted, "https://phoenix.example.com/[REDACTED]");
        assert!(!redacted.contains("phx_secret"));
    }

    #[test]
    fn test_default_engine_config() {
        let engine = EngineConfig::default();
        assert_eq!(engine.max_results, 200);
        assert_eq!(engine.retry.max_attempts, 2);
        assert_eq!(engine.scoring_policy, ScoringPolicy::ContractAware);
        assert!(engine.cloud_vendor_allowlist.iter().any(|v| v == "GCP"));
    }
}
