pub const DEFAULT_HOST: &str = "https://openrouter.ai/api";
pub const DEFAULT_MODEL: &str = "anthropic/claude-sonnet-4.5";

#[derive(Debug, Clone)]
pub struct OpenAiProviderConfig {
    pub host: String,
    pub api_key: String,
    pub model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<i32>,
    /// Sent as `HTTP-Referer` for provider attribution
    pub referer: Option<String>,
    /// Sent as `X-Title` for provider attribution
    pub title: Option<String>,
}

impl OpenAiProviderConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            temperature: None,
            max_tokens: None,
            referer: None,
            title: None,
        }
    }
}
