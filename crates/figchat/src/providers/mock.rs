use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

use super::base::{ChunkStream, Provider};
use crate::models::message::Message;
use crate::models::tool::Tool;
use crate::stream::ProviderChunk;

/// A mock provider that streams pre-configured turns for testing
#[derive(Clone, Default)]
pub struct MockProvider {
    turns: Arc<Mutex<Vec<Vec<ProviderChunk>>>>,
    seen: Arc<Mutex<Vec<Vec<Message>>>>,
}

impl MockProvider {
    /// Create a new mock provider with one chunk sequence per model turn
    pub fn new(turns: Vec<Vec<ProviderChunk>>) -> Self {
        Self {
            turns: Arc::new(Mutex::new(turns)),
            seen: Arc::default(),
        }
    }

    /// Conversations passed to each call, in order
    pub fn seen(&self) -> Vec<Vec<Message>> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn stream(&self, messages: &[Message], _tools: &[Tool]) -> Result<ChunkStream> {
        self.seen.lock().unwrap().push(messages.to_vec());

        let mut turns = self.turns.lock().unwrap();
        let chunks = if turns.is_empty() {
            // Return an empty turn if no more pre-configured responses
            vec![text_chunk("")]
        } else {
            turns.remove(0)
        };
        Ok(Box::pin(futures::stream::iter(chunks.into_iter().map(Ok))))
    }
}

fn chunk(value: Value) -> ProviderChunk {
    serde_json::from_value(value).unwrap()
}

pub fn text_chunk(text: &str) -> ProviderChunk {
    chunk(json!({
        "id": "mock",
        "object": "chat.completion.chunk",
        "choices": [{"index": 0, "delta": {"role": "assistant", "content": text}}]
    }))
}

pub fn tool_call_chunk(index: u32, id: &str, name: &str, arguments: &str) -> ProviderChunk {
    chunk(json!({
        "id": "mock",
        "object": "chat.completion.chunk",
        "choices": [{"index": 0, "delta": {"tool_calls": [{
            "index": index,
            "id": id,
            "type": "function",
            "function": {"name": name, "arguments": arguments}
        }]}}]
    }))
}

pub fn finish_chunk(reason: &str) -> ProviderChunk {
    chunk(json!({
        "id": "mock",
        "object": "chat.completion.chunk",
        "choices": [{"index": 0, "delta": {}, "finish_reason": reason}]
    }))
}
