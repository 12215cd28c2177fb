use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {env_var}")]
    MissingEnvVar { env_var: String },
    #[error("Configuration error: {0}")]
    Other(#[from] config::ConfigError),
}

// Convert a configuration key like "provider.api_key" to its environment variable
pub fn to_env_var(key: &str) -> String {
    format!("FIGCHAT_{}", key.replace('.', "__").to_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_env_var() {
        assert_eq!(to_env_var("provider.api_key"), "FIGCHAT_PROVIDER__API_KEY");
        assert_eq!(
            to_env_var("agent.max_tool_rounds"),
            "FIGCHAT_AGENT__MAX_TOOL_ROUNDS"
        );
    }
}
