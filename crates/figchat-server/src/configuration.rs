use crate::error::{to_env_var, ConfigError};
use config::{Config, Environment};
use figchat::agent::DEFAULT_SYSTEM_PROMPT;
use figchat::mcp::client::{DEFAULT_RETRIES, DEFAULT_SERVER_URL};
use figchat::mcp::protocol::DEFAULT_PROTOCOL_VERSION;
use figchat::mcp::McpClientConfig;
use figchat::providers::configs::{OpenAiProviderConfig, DEFAULT_HOST, DEFAULT_MODEL};
use serde::Deserialize;
use std::net::{AddrParseError, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

/// Required settings without defaults, with the section they live in
const REQUIRED: &[(&str, &str)] = &[("api_key", "provider"), ("max_tool_rounds", "agent")];

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl ServerSettings {
    pub fn socket_addr(&self) -> Result<SocketAddr, AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderSettings {
    pub host: String,
    pub api_key: String,
    pub model: String,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<i32>,
    #[serde(default)]
    pub referer: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

impl ProviderSettings {
    pub fn into_config(self) -> OpenAiProviderConfig {
        OpenAiProviderConfig {
            host: self.host,
            api_key: self.api_key,
            model: self.model,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            referer: self.referer,
            title: self.title,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct McpSettings {
    pub url: String,
    #[serde(default)]
    pub token: Option<String>,
    pub timeout_secs: u64,
    pub retries: u32,
    pub protocol_version: String,
}

impl McpSettings {
    pub fn into_config(self) -> McpClientConfig {
        let mut config = McpClientConfig::new(self.url)
            .with_timeout(Duration::from_secs(self.timeout_secs))
            .with_retries(self.retries);
        if let Some(token) = self.token {
            config = config.with_token(token);
        }
        config.protocol_version = self.protocol_version;
        config
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AgentSettings {
    pub max_tool_rounds: usize,
    pub system_prompt_path: PathBuf,
}

impl AgentSettings {
    /// Read the system prompt, falling back to the built-in one if the file is unreadable
    pub fn load_system_prompt(&self) -> String {
        match std::fs::read_to_string(&self.system_prompt_path) {
            Ok(prompt) => prompt,
            Err(e) => {
                tracing::warn!(
                    path = %self.system_prompt_path.display(),
                    error = %e,
                    "Could not read system prompt, using the built-in prompt"
                );
                DEFAULT_SYSTEM_PROMPT.to_string()
            }
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub provider: ProviderSettings,
    pub mcp: McpSettings,
    pub agent: AgentSettings,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Self::load_and_validate()
    }

    fn load_and_validate() -> Result<Self, ConfigError> {
        let config = Config::builder()
            // Server defaults
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            // Provider defaults
            .set_default("provider.host", DEFAULT_HOST)?
            .set_default("provider.model", DEFAULT_MODEL)?
            // MCP defaults
            .set_default("mcp.url", DEFAULT_SERVER_URL)?
            .set_default("mcp.timeout_secs", 60)?
            .set_default("mcp.retries", i64::from(DEFAULT_RETRIES))?
            .set_default("mcp.protocol_version", DEFAULT_PROTOCOL_VERSION)?
            // Agent defaults
            .set_default("agent.system_prompt_path", "prompt-system.md")?
            // Layer on the environment variables
            .add_source(
                Environment::with_prefix("FIGCHAT")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize().map_err(|err| {
            tracing::debug!("Configuration error: {:?}", &err);
            match missing_setting(&err.to_string()) {
                Some(key) => ConfigError::MissingEnvVar {
                    env_var: to_env_var(&key),
                },
                None => ConfigError::Other(err),
            }
        })
    }
}

/// Extract the dotted key from messages like "missing field `api_key` for key `provider`"
fn missing_setting(message: &str) -> Option<String> {
    let rest = message.strip_prefix("missing field `")?;
    let (field, rest) = rest.split_once('`')?;

    let section = rest
        .strip_prefix(" for key `")
        .and_then(|key| key.split_once('`'))
        .map(|(key, _)| key.to_string())
        .or_else(|| {
            REQUIRED
                .iter()
                .find(|(name, _)| *name == field)
                .map(|(_, section)| section.to_string())
        });

    Some(match section {
        Some(section) => format!("{}.{}", section, field),
        None => field.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    fn clean_env() {
        for (key, _) in env::vars() {
            if key.starts_with("FIGCHAT_") {
                env::remove_var(&key);
            }
        }
    }

    fn set_required() {
        env::set_var("FIGCHAT_PROVIDER__API_KEY", "test-key");
        env::set_var("FIGCHAT_AGENT__MAX_TOOL_ROUNDS", "5");
    }

    #[test]
    #[serial]
    fn test_default_settings() {
        clean_env();
        set_required();

        let settings = Settings::new().unwrap();
        assert_eq!(settings.server.host, "127.0.0.1");
        assert_eq!(settings.server.port, 3000);

        assert_eq!(settings.provider.host, "https://openrouter.ai/api");
        assert_eq!(settings.provider.api_key, "test-key");
        assert_eq!(settings.provider.model, "anthropic/claude-sonnet-4.5");
        assert_eq!(settings.provider.temperature, None);

        assert_eq!(settings.mcp.url, "https://mcp.figma.com/mcp");
        assert_eq!(settings.mcp.token, None);
        assert_eq!(settings.mcp.timeout_secs, 60);
        assert_eq!(settings.mcp.retries, 3);
        assert_eq!(settings.mcp.protocol_version, "2025-06-18");

        assert_eq!(settings.agent.max_tool_rounds, 5);
        assert_eq!(
            settings.agent.system_prompt_path,
            PathBuf::from("prompt-system.md")
        );

        clean_env();
    }

    #[test]
    #[serial]
    fn test_environment_override() {
        clean_env();
        set_required();
        env::set_var("FIGCHAT_SERVER__PORT", "8080");
        env::set_var("FIGCHAT_PROVIDER__MODEL", "openai/gpt-4o");
        env::set_var("FIGCHAT_PROVIDER__TEMPERATURE", "0.5");
        env::set_var("FIGCHAT_PROVIDER__TITLE", "Chat with Figma");
        env::set_var("FIGCHAT_MCP__URL", "http://127.0.0.1:3845/mcp");
        env::set_var("FIGCHAT_MCP__TOKEN", "figd_token");
        env::set_var("FIGCHAT_MCP__TIMEOUT_SECS", "10");
        env::set_var("FIGCHAT_MCP__RETRIES", "5");

        let settings = Settings::new().unwrap();
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.provider.model, "openai/gpt-4o");
        assert_eq!(settings.provider.temperature, Some(0.5));
        assert_eq!(settings.provider.title.as_deref(), Some("Chat with Figma"));

        let mcp = settings.mcp.into_config();
        assert_eq!(mcp.server_url, "http://127.0.0.1:3845/mcp");
        assert_eq!(mcp.token.as_deref(), Some("figd_token"));
        assert_eq!(mcp.timeout, Duration::from_secs(10));
        assert_eq!(mcp.retries, 5);
        assert_eq!(mcp.protocol_version, "2025-06-18");

        clean_env();
    }

    #[test]
    #[serial]
    fn test_missing_api_key() {
        clean_env();
        env::set_var("FIGCHAT_AGENT__MAX_TOOL_ROUNDS", "5");

        match Settings::new() {
            Err(ConfigError::MissingEnvVar { env_var }) => {
                assert_eq!(env_var, "FIGCHAT_PROVIDER__API_KEY")
            }
            other => panic!("unexpected result: {other:?}"),
        }

        clean_env();
    }

    #[test]
    #[serial]
    fn test_missing_max_tool_rounds() {
        clean_env();
        env::set_var("FIGCHAT_PROVIDER__API_KEY", "test-key");

        match Settings::new() {
            Err(ConfigError::MissingEnvVar { env_var }) => {
                assert_eq!(env_var, "FIGCHAT_AGENT__MAX_TOOL_ROUNDS")
            }
            other => panic!("unexpected result: {other:?}"),
        }

        clean_env();
    }

    #[test]
    fn test_missing_setting() {
        assert_eq!(
            missing_setting("missing field `api_key` for key `provider`").as_deref(),
            Some("provider.api_key")
        );
        assert_eq!(
            missing_setting("missing field `max_tool_rounds`").as_deref(),
            Some("agent.max_tool_rounds")
        );
        assert_eq!(missing_setting("invalid type: string"), None);
    }

    #[test]
    fn test_socket_addr_conversion() {
        let server_settings = ServerSettings {
            host: "127.0.0.1".to_string(),
            port: 3000,
        };
        let addr = server_settings.socket_addr().unwrap();
        assert_eq!(addr.to_string(), "127.0.0.1:3000");
    }

    #[test]
    fn test_missing_prompt_file_falls_back() {
        let agent = AgentSettings {
            max_tool_rounds: 1,
            system_prompt_path: PathBuf::from("/nonexistent/prompt-system.md"),
        };
        assert_eq!(agent.load_system_prompt(), DEFAULT_SYSTEM_PROMPT);
    }
}
