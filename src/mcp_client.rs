use crate::config::redact_url;
use crate::data_source::DataSource;
use crate::errors::AppError;
use crate::models::ContentBlock;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, ACCEPT, CONTENT_TYPE};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

const PROTOCOL_VERSION: &str = "2025-03-26";
const SESSION_HEADER: &str = "mcp-session-id";

/// Result body of a `tools/call` request.
#[derive(Debug, Deserialize)]
struct ToolCallResult {
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default, rename = "isError")]
    is_error: bool,
}

/// Client session against a streamable-HTTP MCP server.
///
/// One session is opened per batch and reused for every domain. Requests are
/// JSON-RPC 2.0 over POST; the server may answer with plain JSON or with an
/// SSE stream carrying the response message.
pub struct McpSession {
    client: reqwest::Client,
    endpoint: String,
    token: Option<String>,
    session_id: Option<String>,
    next_id: AtomicU64,
}

impl McpSession {
    /// Opens a session: `initialize` followed by `notifications/initialized`.
    ///
    /// # Arguments
    ///
    /// * `endpoint` - The MCP endpoint URL.
    /// * `token` - Optional bearer token.
    pub async fn connect(endpoint: &str, token: Option<&str>) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| AppError::SessionError(format!("Failed to create MCP client: {}", e)))?;

        let mut session = Self {
            client,
            endpoint: endpoint.to_string(),
            token: token.map(str::to_string),
            session_id: None,
            next_id: AtomicU64::new(1),
        };

        tracing::info!("Opening MCP session: {}", redact_url(endpoint));

        let id = session.next_request_id();
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": "initialize",
            "params": {
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": {},
                "clientInfo": {
                    "name": env!("CARGO_PKG_NAME"),
                    "version": env!("CARGO_PKG_VERSION"),
                }
            }
        });

        let response = session
            .send(&body)
            .await
            .map_err(|e| AppError::SessionError(format!("initialize failed: {}", e)))?;
        session.session_id = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let init = read_rpc_result(response, id)
            .await
            .map_err(|e| AppError::SessionError(format!("initialize rejected: {}", e)))?;
        let server_name = init
            .pointer("/serverInfo/name")
            .and_then(Value::as_str)
            .unwrap_or("unknown");
        tracing::debug!("MCP server: {}", server_name);

        let notification = json!({
            "jsonrpc": "2.0",
            "method": "notifications/initialized",
        });
        session
            .send(&notification)
            .await
            .map_err(|e| AppError::SessionError(format!("initialized notification failed: {}", e)))?;

        tracing::info!("✓ MCP session established");
        Ok(session)
    }

    /// Ends the session on the server. Errors are logged, never returned.
    pub async fn close(self) {
        let Some(session_id) = self.session_id() else {
            return;
        };

        let mut request = self
            .client
            .delete(&self.endpoint)
            .header(SESSION_HEADER, session_id);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        match request.send().await {
            Ok(response) => tracing::debug!("MCP session closed ({})", response.status()),
            Err(e) => tracing::debug!("MCP session close failed: {}", e),
        }
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    fn next_request_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    async fn send(&self, body: &Value) -> Result<reqwest::Response, AppError> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .header(ACCEPT, "application/json, text/event-stream")
            .json(body);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        if let Some(session_id) = &self.session_id {
            request = request.header(SESSION_HEADER, session_id);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::ExternalApiError(format!("MCP request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::ExternalApiError(format!(
                "MCP server returned {}: {}",
                status, error_text
            )));
        }

        Ok(response)
    }
}

#[async_trait]
impl DataSource for McpSession {
    async fn call_tool(&self, name: &str, params: Value) -> Result<Vec<ContentBlock>, AppError> {
        let id = self.next_request_id();
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": "tools/call",
            "params": {
                "name": name,
                "arguments": params,
            }
        });

        tracing::debug!("Calling tool {}", name);
        let response = self.send(&body).await?;
        let result = read_rpc_result(response, id).await?;

        let result: ToolCallResult = serde_json::from_value(result).map_err(|e| {
            AppError::ExternalApiError(format!("Malformed {} result: {}", name, e))
        })?;

        if result.is_error {
            let message = result
                .content
                .iter()
                .find_map(|block| block.text.clone())
                .unwrap_or_else(|| "Unknown error".to_string());
            return Err(AppError::ExternalApiError(format!(
                "Tool {} failed: {}",
                name, message
            )));
        }

        Ok(result.content)
    }
}

/// Reads the JSON-RPC response with the given id from a JSON or SSE body.
async fn read_rpc_result(response: reqwest::Response, id: u64) -> Result<Value, AppError> {
    let is_stream = is_event_stream(response.headers());
    let text = response
        .text()
        .await
        .map_err(|e| AppError::ExternalApiError(format!("Failed to read MCP response: {}", e)))?;

    let messages = if is_stream {
        parse_sse_messages(&text)
    } else {
        match serde_json::from_str::<Value>(&text) {
            Ok(Value::Array(batch)) => batch,
            Ok(message) => vec![message],
            Err(e) => {
                return Err(AppError::ExternalApiError(format!(
                    "Failed to parse MCP response: {}",
                    e
                )))
            }
        }
    };

    let message = messages
        .into_iter()
        .find(|m| m.get("id").and_then(Value::as_u64) == Some(id))
        .ok_or_else(|| {
            AppError::ExternalApiError(format!("No JSON-RPC response for request {}", id))
        })?;

    if let Some(error) = message.get("error") {
        let msg = error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown error");
        return Err(AppError::ExternalApiError(format!("JSON-RPC error: {}", msg)));
    }

    Ok(message.get("result").cloned().unwrap_or(Value::Null))
}

fn is_event_stream(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("text/event-stream"))
        .unwrap_or(false)
}

/// Parses the JSON messages carried by the `data:` lines of an SSE body.
fn parse_sse_messages(body: &str) -> Vec<Value> {
    let mut messages = Vec::new();
    let mut data = String::new();

    for line in body.lines().chain(std::iter::once("")) {
        if line.is_empty() {
            if !data.is_empty() {
                if let Ok(message) = serde_json::from_str::<Value>(&data) {
                    messages.push(message);
                }
                data.clear();
            }
            continue;
        }
        if let Some(payload) = line.strip_prefix("data:") {
            if !data.is_empty() {
                data.push('\n');
            }
            data.push_str(payload.strip_prefix(' ').unwrap_or(payload));
        }
    }

    messages
}
