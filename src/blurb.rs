//! Optional sales note for a ranked account, written by a chat-completions model.

use crate::errors::AppError;
use crate::models::RankedAccount;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const SYSTEM_PROMPT: &str = "You are a B2B sales strategist. Write a concise, factual account brief \
for a seller: why this account matters now, which angle to lead with and one suggested next step. \
Use only the facts provided. Keep it under 120 words.";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Clone)]
pub struct SalesBlurbClient {
    client: reqwest::Client,
    api_key: String,
    url: String,
    model: String,
}

impl SalesBlurbClient {
    pub fn new(api_key: String, url: String, model: String) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| AppError::InternalError(format!("Failed to create blurb client: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            url,
            model,
        })
    }

    /// Asks the model for a sales note about `account`.
    pub async fn generate(&self, account: &RankedAccount) -> Result<String, AppError> {
        tracing::debug!("Generating sales blurb for {}", account.domain);

        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: fact_sheet(account),
                },
            ],
            temperature: 0.4,
        };

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::ExternalApiError(format!(
                "Blurb API returned {}: {}",
                status, error_text
            )));
        }

        let body: ChatResponse = response.json().await?;
        let content = body
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| AppError::ExternalApiError("Blurb API returned no content".into()))?;

        Ok(content)
    }

    /// Like [`generate`](Self::generate), but a failure is logged and yields `None`.
    pub async fn generate_or_skip(&self, account: &RankedAccount) -> Option<String> {
        match self.generate(account).await {
            Ok(blurb) => Some(blurb),
            Err(e) => {
                tracing::warn!("Sales blurb failed for {}: {}", account.domain, e);
                None
            }
        }
    }
}

fn or_unknown<T: ToString>(value: Option<T>) -> String {
    value
        .map(|v| v.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn list_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "none".to_string()
    } else {
        items.join(", ")
    }
}

/// Plain-text facts handed to the model.
pub fn fact_sheet(account: &RankedAccount) -> String {
    let mut lines = vec![
        format!(
            "Company: {}",
            account.company.as_deref().unwrap_or(&account.domain)
        ),
        format!("Domain: {}", account.domain),
        format!("Score: {:.2} (fit {:.2})", account.score, account.fit_score),
        format!("Badge: {}", account.badge),
        format!("Industry: {}", or_unknown(account.industry.as_deref())),
        format!("Employees: {}", or_unknown(account.employee_count)),
        format!("IT spend: {}", or_unknown(account.it_spend)),
        format!("Annual company spend: {}", account.company_spend_annual),
        format!("Cloud monthly spend: {}", account.cloud_monthly_spend),
        format!("Cloud services: {}", list_or_none(&account.cloud_top_services)),
        format!("Technology installs: {}", or_unknown(account.tech_count)),
        format!("Average install intensity: {}", or_unknown(account.tech_intensity)),
        format!("Top technologies: {}", list_or_none(&account.top_technologies)),
        format!("Top spend categories: {}", list_or_none(&account.spend_top_categories)),
        format!("Functional areas: {}", list_or_none(&account.fai_areas)),
        format!("Days to renewal: {}", or_unknown(account.days_to_renewal)),
    ];

    lines.push("Reasons:".to_string());
    lines.extend(account.reasons.iter().map(|reason| format!("- {}", reason)));
    lines.push(format!("Recommended action: {}", account.action));

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Badge;

    fn account() -> RankedAccount {
        RankedAccount {
            domain: "acme.com".into(),
            company: Some("Acme Corp".into()),
            score: 72.5,
            fit_score: 57.5,
            badge: Badge::Hot,
            employee_count: Some(12_000),
            it_spend: None,
            company_spend_annual: 0.0,
            tech_count: Some(40),
            tech_intensity: None,
            cloud_monthly_spend: 250_000.0,
            cloud_top_services: vec!["AWS".into()],
            fai_areas: vec![],
            spend_top_categories: vec![],
            industry: Some("Retail".into()),
            top_technologies: vec!["Snowflake".into()],
            days_to_renewal: None,
            reasons: vec!["Key stack present: Snowflake".into()],
            action: "Outbound now with cloud services angle (focus on AWS)".into(),
        }
    }

    #[test]
    fn test_fact_sheet_lists_every_input() {
        let sheet = fact_sheet(&account());
        assert!(sheet.starts_with("Company: Acme Corp\nDomain: acme.com"));
        assert!(sheet.contains("Score: 72.50 (fit 57.50)"));
        assert!(sheet.contains("Badge: Hot"));
        assert!(sheet.contains("IT spend: unknown"));
        assert!(sheet.contains("Functional areas: none"));
        assert!(sheet.contains("- Key stack present: Snowflake"));
        assert!(sheet.ends_with("Recommended action: Outbound now with cloud services angle (focus on AWS)"));
    }

    #[test]
    fn test_fact_sheet_falls_back_to_domain() {
        let mut anonymous = account();
        anonymous.company = None;
        assert!(fact_sheet(&anonymous).starts_with("Company: acme.com"));
    }
}
