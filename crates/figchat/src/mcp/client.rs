use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{error, info, warn};

use super::errors::{McpError, RpcFailure, TransportError};
use super::protocol::{
    is_handshake_method, CallToolResult, JsonRpcRequest, JsonRpcResponse,
    DEFAULT_PROTOCOL_VERSION, INITIALIZE, INITIALIZED, PROMPTS_LIST, RESOURCES_LIST, TOOLS_CALL,
    TOOLS_LIST,
};
use super::session::AvailabilityGuard;
use super::sse::first_data_payload;

pub const DEFAULT_SERVER_URL: &str = "https://mcp.figma.com/mcp";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_RETRIES: u32 = 3;

#[derive(Debug, Clone)]
pub struct McpClientConfig {
    pub server_url: String,
    /// Sent as a bearer token when present
    pub token: Option<String>,
    pub timeout: Duration,
    /// Reported but never acted on; the client does not retry
    pub retries: u32,
    pub protocol_version: String,
}

impl Default for McpClientConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            token: None,
            timeout: DEFAULT_TIMEOUT,
            retries: DEFAULT_RETRIES,
            protocol_version: DEFAULT_PROTOCOL_VERSION.to_string(),
        }
    }
}

impl McpClientConfig {
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            ..Default::default()
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }
}

/// JSON-RPC client for the design server.
///
/// Construct once and share behind an `Arc`: the correlation counter and the
/// availability state are process-wide.
#[derive(Debug)]
pub struct McpClient {
    http: Client,
    config: McpClientConfig,
    request_id: AtomicU64,
    availability: AvailabilityGuard,
}

impl McpClient {
    pub fn new(config: McpClientConfig) -> Result<Self, McpError> {
        url::Url::parse(&config.server_url)
            .map_err(|e| McpError::Config(format!("{}: {}", config.server_url, e)))?;

        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("figchat/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| McpError::Config(e.to_string()))?;

        Ok(Self {
            http,
            config,
            request_id: AtomicU64::new(0),
            availability: AvailabilityGuard::new(),
        })
    }

    pub fn config(&self) -> &McpClientConfig {
        &self.config
    }

    pub fn is_server_available(&self) -> bool {
        self.availability.is_available()
    }

    /// Runs the initialization handshake if the server is not yet known to be available.
    pub async fn ensure_available(&self) -> bool {
        self.availability.ensure(|| self.handshake()).await
    }

    async fn handshake(&self) -> bool {
        let response = match self.dispatch(INITIALIZE, None).await {
            Ok(response) => response,
            Err(failure) => {
                warn!(error = %failure, "Figma MCP server not available");
                return false;
            }
        };

        if let Some(err) = response.get("error").filter(|e| !e.is_null()) {
            warn!(error = %err, "Figma MCP server rejected initialize");
            return false;
        }

        if let Err(failure) = self.dispatch(INITIALIZED, None).await {
            warn!(error = %failure, "Failed to acknowledge MCP initialization");
        }
        true
    }

    /// Send one JSON-RPC request and return the decoded response document.
    ///
    /// Every method other than the handshake pair requires the server to be available;
    /// a single handshake is attempted first when it is not.
    pub async fn send(&self, method: &str, params: Option<Value>) -> Result<Value, RpcFailure> {
        if !is_handshake_method(method) && !self.ensure_available().await {
            return Err(RpcFailure::unavailable());
        }
        self.dispatch(method, params).await
    }

    fn envelope(&self, method: &str, params: Option<Value>) -> JsonRpcRequest {
        match params {
            Some(params) => {
                let id = self.request_id.fetch_add(1, Ordering::SeqCst) + 1;
                JsonRpcRequest::with_params(method, params, id)
            }
            None => JsonRpcRequest::notification(method),
        }
    }

    async fn dispatch(&self, method: &str, params: Option<Value>) -> Result<Value, RpcFailure> {
        let request = self.envelope(method, params);
        info!(method, id = ?request.id, "Calling Figma MCP");

        let start = Instant::now();
        let result = self.post(&request).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(value) => {
                info!(method, duration_ms, "Figma MCP call completed");
                Ok(value)
            }
            Err(e) => {
                error!(method, duration_ms, error = %e, "Figma MCP call failed");
                Err(e.into())
            }
        }
    }

    async fn post(&self, request: &JsonRpcRequest) -> Result<Value, TransportError> {
        let mut builder = self
            .http
            .post(&self.config.server_url)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json, text/event-stream")
            .header("mcp-protocol-version", &self.config.protocol_version)
            .json(request);

        if let Some(token) = &self.config.token {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await?;
        let status = response.status();
        if status != StatusCode::OK && status != StatusCode::ACCEPTED {
            return Err(TransportError::Status {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or_default().to_string(),
            });
        }

        let body = response.text().await?;
        decode_body(&body)
    }

    /// Invoke a tool by name.
    ///
    /// Content items pointing at the server's local filesystem are removed from the
    /// result before it is returned.
    pub async fn call_tool(&self, name: &str, arguments: Value) -> Result<CallToolResult, McpError> {
        let response = self
            .send(TOOLS_CALL, Some(json!({ "name": name, "arguments": arguments })))
            .await?;

        let mut result: CallToolResult = into_result(response)?;
        result.content.retain(|item| !item.is_local_file());
        Ok(result)
    }

    pub async fn list_tools(&self) -> Result<Value, McpError> {
        self.discover(TOOLS_LIST).await
    }

    pub async fn list_resources(&self) -> Result<Value, McpError> {
        self.discover(RESOURCES_LIST).await
    }

    pub async fn list_prompts(&self) -> Result<Value, McpError> {
        self.discover(PROMPTS_LIST).await
    }

    async fn discover(&self, method: &str) -> Result<Value, McpError> {
        let response = self.send(method, Some(json!({}))).await?;
        into_result(response)
    }
}

/// Decode a response body: event-stream bodies yield their first data frame, anything
/// else is parsed as JSON. Bodies that are neither come back as a JSON string.
fn decode_body(body: &str) -> Result<Value, TransportError> {
    if let Some(payload) = first_data_payload(body) {
        return serde_json::from_str(&payload).map_err(|e| TransportError::Decode(e.to_string()));
    }

    if body.trim().is_empty() {
        return Ok(Value::Null);
    }

    Ok(serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_string())))
}

fn into_result<T: DeserializeOwned>(response: Value) -> Result<T, McpError> {
    let response: JsonRpcResponse =
        serde_json::from_value(response).map_err(|e| McpError::Protocol(e.to_string()))?;

    if let Some(err) = response.error {
        return Err(McpError::Server {
            code: err.code,
            message: err.message,
        });
    }

    let result = response
        .result
        .ok_or_else(|| McpError::Protocol("response has no result".to_string()))?;
    serde_json::from_value(result).map_err(|e| McpError::Protocol(e.to_string()))
}
