//! Ranks a batch of domains from the command line and prints the result as JSON.
//!
//! Domains come from the arguments, or from stdin (one per line) when no
//! arguments are given. `--blurbs` attaches a sales note to each account.

use account_prioritizer::blurb::SalesBlurbClient;
use account_prioritizer::config::Config;
use account_prioritizer::mcp_client::McpSession;
use account_prioritizer::models::{PrioritizeResponse, PrioritizedAccount};
use account_prioritizer::orchestrator::{normalize_domains, Prioritizer};
use std::io::{BufRead, IsTerminal};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout stays valid JSON
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "account_prioritizer=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut with_blurbs = false;
    let mut raw_domains = Vec::new();
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--blurbs" => with_blurbs = true,
            "-h" | "--help" => {
                eprintln!("usage: prioritize [--blurbs] [DOMAIN ...]  (reads stdin when no domains)");
                return Ok(());
            }
            _ => raw_domains.push(arg),
        }
    }

    if raw_domains.is_empty() {
        let stdin = std::io::stdin();
        if stdin.is_terminal() {
            eprintln!("Enter domains, one per line (Ctrl-D to finish):");
        }
        for line in stdin.lock().lines() {
            raw_domains.push(line?);
        }
    }

    let domains = normalize_domains(&raw_domains);
    if domains.is_empty() {
        anyhow::bail!("No valid domains given");
    }

    let config = Config::from_env()?;
    let engine = config.engine_config();

    let blurb_client = match (&config.openrouter_api_key, with_blurbs) {
        (Some(key), true) => Some(SalesBlurbClient::new(
            key.clone(),
            config.openrouter_url.clone(),
            config.openrouter_model.clone(),
        )?),
        (None, true) => anyhow::bail!("--blurbs requires OPENROUTER_API_KEY"),
        _ => None,
    };

    let session = McpSession::connect(&config.mcp_url, config.mcp_token.as_deref()).await?;
    let run = Prioritizer::new(&session, &engine).run(&domains).await;
    session.close().await;

    let mut accounts = Vec::with_capacity(run.accounts.len());
    for account in run.accounts {
        let sales_blurb = match &blurb_client {
            Some(client) => client.generate_or_skip(&account).await,
            None => None,
        };
        accounts.push(PrioritizedAccount {
            account,
            sales_blurb,
        });
    }

    let response = PrioritizeResponse {
        run_id: run.run_id,
        count: accounts.len(),
        accounts,
    };
    println!("{}", serde_json::to_string_pretty(&response)?);

    Ok(())
}
