//! JSON-RPC 2.0 envelope types for MCP over HTTP.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::models::content::Content;

/// JSON-RPC version string.
pub const JSONRPC_VERSION: &str = "2.0";

/// MCP protocol version sent in the `mcp-protocol-version` header.
pub const DEFAULT_PROTOCOL_VERSION: &str = "2025-06-18";

pub const INITIALIZE: &str = "initialize";
pub const INITIALIZED: &str = "notifications/initialized";
pub const TOOLS_CALL: &str = "tools/call";
pub const TOOLS_LIST: &str = "tools/list";
pub const RESOURCES_LIST: &str = "resources/list";
pub const PROMPTS_LIST: &str = "prompts/list";

/// Methods that may be sent before the server is known to be available.
pub fn is_handshake_method(method: &str) -> bool {
    method == INITIALIZE || method == INITIALIZED
}

/// A JSON-RPC request. Requests without params carry no id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
}

impl JsonRpcRequest {
    /// Build a request without params (and therefore without an id).
    pub fn notification(method: impl Into<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.into(),
            params: None,
            id: None,
        }
    }

    /// Build a request carrying params under the given correlation id.
    ///
    /// Object params also get `_meta.progressToken` set to the id.
    pub fn with_params(method: impl Into<String>, params: Value, id: u64) -> Self {
        let params = match params {
            Value::Object(mut map) => {
                map.insert("_meta".to_string(), json!({ "progressToken": id }));
                Value::Object(map)
            }
            other => other,
        };

        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.into(),
            params: Some(params),
            id: Some(id),
        }
    }
}

/// A JSON-RPC response as decoded from the server body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JsonRpcResponse {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<JsonRpcError>,
}

/// A JSON-RPC error object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Result of a `tools/call` request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallToolResult {
    #[serde(default)]
    pub content: Vec<Content>,
    #[serde(default)]
    pub is_error: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_has_no_id_or_params() {
        let request = JsonRpcRequest::notification(INITIALIZE);
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"jsonrpc": "2.0", "method": "initialize"})
        );
    }

    #[test]
    fn test_params_get_progress_token() {
        let request = JsonRpcRequest::with_params(
            TOOLS_CALL,
            json!({"name": "whoami", "arguments": {}}),
            7,
        );
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "jsonrpc": "2.0",
                "method": "tools/call",
                "params": {
                    "name": "whoami",
                    "arguments": {},
                    "_meta": {"progressToken": 7}
                },
                "id": 7
            })
        );
    }

    #[test]
    fn test_call_tool_result_defaults() {
        let result: CallToolResult = serde_json::from_value(json!({})).unwrap();
        assert!(result.content.is_empty());
        assert!(!result.is_error);
    }
}
