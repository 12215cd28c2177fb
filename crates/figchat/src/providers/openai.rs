use anyhow::Result;
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use reqwest::{Client, Response, StatusCode};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use super::base::{ChunkStream, Provider};
use super::configs::OpenAiProviderConfig;
use super::errors::ProviderError;
use super::utils::{messages_to_openai_spec, tools_to_openai_spec};
use crate::models::message::Message;
use crate::models::tool::Tool;
use crate::stream::ProviderChunk;

/// Streaming client for OpenAI-compatible chat completion endpoints
pub struct OpenAiProvider {
    client: Client,
    config: OpenAiProviderConfig,
}

impl OpenAiProvider {
    pub fn new(config: OpenAiProviderConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(600)) // 10 minutes timeout
            .build()?;

        Ok(Self { client, config })
    }

    fn payload(&self, messages: &[Message], tools: &[Tool]) -> Result<Value> {
        let mut payload = json!({
            "model": self.config.model,
            "messages": messages_to_openai_spec(messages),
            "stream": true,
        });

        if let Some(map) = payload.as_object_mut() {
            if !tools.is_empty() {
                map.insert("tools".to_string(), json!(tools_to_openai_spec(tools)?));
                map.insert("tool_choice".to_string(), json!("auto"));
            }
            if let Some(temp) = self.config.temperature {
                map.insert("temperature".to_string(), json!(temp));
            }
            if let Some(tokens) = self.config.max_tokens {
                map.insert("max_tokens".to_string(), json!(tokens));
            }
        }

        Ok(payload)
    }

    async fn post(&self, payload: &Value) -> Result<Response> {
        let url = format!(
            "{}/v1/chat/completions",
            self.config.host.trim_end_matches('/')
        );

        let mut request = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .header("Accept", "text/event-stream")
            .json(payload);

        if let Some(referer) = &self.config.referer {
            request = request.header("HTTP-Referer", referer);
        }
        if let Some(title) = &self.config.title {
            request = request.header("X-Title", title);
        }

        let response = request.send().await?;

        match response.status() {
            StatusCode::OK => Ok(response),
            StatusCode::TOO_MANY_REQUESTS => {
                Err(ProviderError::rate_limited(response.headers()).into())
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(ProviderError::Api {
                    status: status.as_u16(),
                    body,
                }
                .into())
            }
        }
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    async fn stream(&self, messages: &[Message], tools: &[Tool]) -> Result<ChunkStream> {
        let payload = self.payload(messages, tools)?;
        debug!(model = %self.config.model, messages = messages.len(), "Sending streaming request");

        let response = self.post(&payload).await?;
        Ok(Box::pin(sse_chunks(response)))
    }
}

enum SseLine<'a> {
    Data(&'a str),
    Done,
    Skip,
}

fn classify_line(line: &str) -> SseLine<'_> {
    match line.strip_prefix("data:") {
        Some(data) => match data.trim() {
            "[DONE]" => SseLine::Done,
            "" => SseLine::Skip,
            data => SseLine::Data(data),
        },
        None => SseLine::Skip,
    }
}

/// Parse the event-stream body into chunks, splitting on newlines across reads.
fn sse_chunks(response: Response) -> impl Stream<Item = Result<ProviderChunk>> + Send + 'static {
    async_stream::try_stream! {
        let mut bytes = response.bytes_stream();
        let mut buffer: Vec<u8> = Vec::new();

        'read: while let Some(next) = bytes.next().await {
            let next = next.map_err(|e| ProviderError::Stream(e.to_string()))?;
            buffer.extend_from_slice(&next);

            while let Some(end) = buffer.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = buffer.drain(..=end).collect();
                let line = String::from_utf8_lossy(&line);
                match classify_line(line.trim_end()) {
                    SseLine::Done => break 'read,
                    SseLine::Skip => {}
                    SseLine::Data(data) => {
                        let chunk: ProviderChunk = serde_json::from_str(data)
                            .map_err(|e| ProviderError::Stream(format!("invalid chunk: {}", e)))?;
                        yield chunk;
                    }
                }
            }
        }
    }
}
