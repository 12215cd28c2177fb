use figchat::agent::Agent;
use figchat::mcp::McpClient;
use figchat::providers::openai::OpenAiProvider;
use figchat::systems::figma::FigmaSystem;
use std::sync::Arc;

use crate::configuration::Settings;

/// Shared application state
///
/// The MCP client lives for the whole process so its request counter and availability
/// survive across requests. The agent is cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub agent: Agent,
    pub mcp: Arc<McpClient>,
}

impl AppState {
    pub fn new(agent: Agent, mcp: Arc<McpClient>) -> Self {
        Self { agent, mcp }
    }

    pub fn from_settings(settings: Settings) -> anyhow::Result<Self> {
        let mcp = Arc::new(McpClient::new(settings.mcp.into_config())?);
        let provider = OpenAiProvider::new(settings.provider.into_config())?;

        let mut agent = Agent::new(Arc::new(provider), settings.agent.max_tool_rounds)
            .with_system_prompt(settings.agent.load_system_prompt());
        agent.add_system(Arc::new(FigmaSystem::new(mcp.clone())));

        Ok(Self::new(agent, mcp))
    }
}
