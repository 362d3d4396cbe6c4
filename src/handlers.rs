use crate::blurb::SalesBlurbClient;
use crate::config::{Config, EngineConfig};
use crate::errors::{AppError, ResultExt};
use crate::mcp_client::McpSession;
use crate::models::{PrioritizeRequest, PrioritizeResponse, PrioritizedAccount};
use crate::orchestrator::{normalize_domains, Prioritizer};
use axum::{extract::State, http::StatusCode, Json};
use serde_json::json;
use std::sync::Arc;

/// Upper bound on domains accepted in one request.
pub const MAX_DOMAINS_PER_REQUEST: usize = 100;

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Immutable engine settings built once from `config`.
    pub engine: EngineConfig,
    /// Sales blurb client; `None` when no OpenRouter key is configured.
    pub blurb_client: Option<SalesBlurbClient>,
}

/// Health check endpoint.
///
/// Returns the service status and version.
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

/// POST /api/v1/accounts/prioritize
///
/// Ranks the requested domains by sales readiness. One data-source session is
/// opened for the request and closed before responding.
///
/// # Arguments
///
/// * `state` - The application state.
/// * `payload` - Domains to rank and whether to attach sales blurbs.
///
/// # Returns
///
/// * `Result<Json<PrioritizeResponse>, AppError>` - The ranked accounts or an error.
pub async fn prioritize(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<PrioritizeRequest>,
) -> Result<Json<PrioritizeResponse>, AppError> {
    tracing::info!(
        "POST /accounts/prioritize - {} domains, blurbs: {}",
        payload.domains.len(),
        payload.with_blurbs
    );

    let domains = normalize_domains(&payload.domains);
    if domains.is_empty() {
        return Err(AppError::BadRequest(
            "At least one valid domain is required".to_string(),
        ));
    }
    if domains.len() > MAX_DOMAINS_PER_REQUEST {
        return Err(AppError::BadRequest(format!(
            "At most {} domains per request",
            MAX_DOMAINS_PER_REQUEST
        )));
    }

    let session = McpSession::connect(&state.config.mcp_url, state.config.mcp_token.as_deref())
        .await
        .context("opening account data session")?;
    let run = Prioritizer::new(&session, &state.engine).run(&domains).await;
    session.close().await;

    let blurb_client = match (&state.blurb_client, payload.with_blurbs) {
        (Some(client), true) => Some(client),
        (None, true) => {
            tracing::warn!("Sales blurbs requested but OPENROUTER_API_KEY is not set");
            None
        }
        _ => None,
    };

    let mut accounts = Vec::with_capacity(run.accounts.len());
    for account in run.accounts {
        let sales_blurb = match blurb_client {
            Some(client) => client.generate_or_skip(&account).await,
            None => None,
        };
        accounts.push(PrioritizedAccount {
            account,
            sales_blurb,
        });
    }

    tracing::info!("[{}] Returning {} ranked accounts", run.run_id, accounts.len());

    Ok(Json(PrioritizeResponse {
        run_id: run.run_id,
        count: accounts.len(),
        accounts,
    }))
}
