use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

use crate::catalog::figma_tools;
use crate::errors::{AgentError, AgentResult};
use crate::mcp::figma::check_required;
use crate::mcp::McpClient;
use crate::models::content::Content;
use crate::models::tool::{Tool, ToolCall};
use crate::systems::System;

/// Exposes the design server's tools to the agent
pub struct FigmaSystem {
    client: Arc<McpClient>,
    tools: Vec<Tool>,
}

impl FigmaSystem {
    pub fn new(client: Arc<McpClient>) -> Self {
        Self {
            client,
            tools: figma_tools(),
        }
    }

    fn tool(&self, name: &str) -> AgentResult<&Tool> {
        self.tools
            .iter()
            .find(|tool| tool.name == name)
            .ok_or_else(|| AgentError::ToolNotFound(name.to_string()))
    }
}

#[async_trait]
impl System for FigmaSystem {
    fn name(&self) -> &str {
        "figma"
    }

    fn description(&self) -> &str {
        "Reads designs, metadata, variables and Code Connect mappings from Figma files"
    }

    fn tools(&self) -> &[Tool] {
        &self.tools
    }

    async fn call(&self, tool_call: ToolCall) -> AgentResult<Vec<Content>> {
        let tool = self.tool(&tool_call.name)?;

        // Unparsed argument text goes to the server untouched
        if tool_call.arguments.is_object() {
            check_required(&tool_call.arguments, &tool.required())
                .map_err(|e| AgentError::InvalidParameters(e.to_string()))?;
        }

        let arguments = match tool_call.arguments {
            Value::Null => Value::Object(Default::default()),
            arguments => arguments,
        };

        let start = Instant::now();
        let result = self.client.call_tool(&tool_call.name, arguments).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(result) => {
                info!(
                    tool = %tool_call.name,
                    duration_ms,
                    items = result.content.len(),
                    is_error = result.is_error,
                    "Tool execution completed"
                );
                Ok(result.content)
            }
            Err(e) => {
                error!(tool = %tool_call.name, duration_ms, error = %e, "Tool execution failed");
                Err(AgentError::ExecutionError(e.to_string()))
            }
        }
    }
}
