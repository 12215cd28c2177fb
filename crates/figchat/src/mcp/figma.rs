//! Typed wrappers for the design server's tools.
//!
//! Each wrapper checks its mandatory fields before anything is sent.
use serde::Serialize;
use serde_json::Value;

use super::client::McpClient;
use super::errors::McpError;
use super::protocol::CallToolResult;
use crate::catalog;

/// Fails with [`McpError::MissingParameters`] if any of `required` is absent, null or an
/// empty string in `arguments`.
pub fn check_required(arguments: &Value, required: &[&str]) -> Result<(), McpError> {
    let missing = |field: &&str| match arguments.get(*field) {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(_) => false,
    };

    if required.iter().any(missing) {
        return Err(McpError::MissingParameters(required.join(" and ")));
    }
    Ok(())
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeParams {
    pub node_id: String,
    pub file_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_languages: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_frameworks: Option<String>,
}

impl NodeParams {
    pub fn new(node_id: impl Into<String>, file_key: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            file_key: file_key.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DesignContextParams {
    #[serde(flatten)]
    pub node: NodeParams,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub force_code: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disable_code_connect: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FigjamParams {
    #[serde(flatten)]
    pub node: NodeParams,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_images_of_nodes: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeConnectParams {
    pub node_id: String,
    pub file_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_connect_label: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DesignSystemRulesParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_languages: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_frameworks: Option<String>,
}

const NODE_AND_FILE: &[&str] = &["nodeId", "fileKey"];

impl McpClient {
    async fn call_checked<P: Serialize>(
        &self,
        tool: &str,
        params: &P,
        required: &[&str],
    ) -> Result<CallToolResult, McpError> {
        let arguments =
            serde_json::to_value(params).map_err(|e| McpError::Protocol(e.to_string()))?;
        check_required(&arguments, required)?;
        self.call_tool(tool, arguments).await
    }

    pub async fn get_screenshot(&self, params: &NodeParams) -> Result<CallToolResult, McpError> {
        self.call_checked(catalog::GET_SCREENSHOT, params, NODE_AND_FILE)
            .await
    }

    pub async fn create_design_system_rules(
        &self,
        params: &DesignSystemRulesParams,
    ) -> Result<CallToolResult, McpError> {
        self.call_checked(catalog::CREATE_DESIGN_SYSTEM_RULES, params, &[])
            .await
    }

    pub async fn get_design_context(
        &self,
        params: &DesignContextParams,
    ) -> Result<CallToolResult, McpError> {
        self.call_checked(catalog::GET_DESIGN_CONTEXT, params, NODE_AND_FILE)
            .await
    }

    pub async fn get_metadata(&self, params: &NodeParams) -> Result<CallToolResult, McpError> {
        self.call_checked(catalog::GET_METADATA, params, NODE_AND_FILE)
            .await
    }

    pub async fn get_variable_defs(
        &self,
        params: &NodeParams,
    ) -> Result<CallToolResult, McpError> {
        self.call_checked(catalog::GET_VARIABLE_DEFS, params, NODE_AND_FILE)
            .await
    }

    pub async fn get_figjam(&self, params: &FigjamParams) -> Result<CallToolResult, McpError> {
        self.call_checked(catalog::GET_FIGJAM, params, NODE_AND_FILE)
            .await
    }

    pub async fn get_code_connect_map(
        &self,
        params: &CodeConnectParams,
    ) -> Result<CallToolResult, McpError> {
        self.call_checked(catalog::GET_CODE_CONNECT_MAP, params, NODE_AND_FILE)
            .await
    }

    pub async fn whoami(&self) -> Result<CallToolResult, McpError> {
        self.call_tool(catalog::WHOAMI, Value::Object(Default::default()))
            .await
    }
}
