//! Incremental model output.
//!
//! [`ProviderChunk`] is what a provider streams; it accepts both the snake_case wire form
//! and the camelCase form some SDKs emit. [`adapt_chunk`] maps it one-to-one onto
//! [`CompletionChunk`], the shape forwarded to the caller. [`TurnAccumulator`] folds the
//! adapted chunks of one model turn into an assistant [`Message`].
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AgentError;
use crate::models::message::Message;
use crate::models::tool::ToolCall;
use crate::providers::utils::is_valid_function_name;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ProviderChunk {
    pub id: Option<String>,
    pub created: Option<i64>,
    pub model: Option<String>,
    pub object: Option<String>,
    #[serde(alias = "systemFingerprint")]
    pub system_fingerprint: Option<String>,
    pub choices: Vec<ProviderChoice>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ProviderChoice {
    pub index: u32,
    pub delta: ProviderDelta,
    #[serde(alias = "finishReason")]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ProviderDelta {
    pub content: Option<String>,
    pub role: Option<String>,
    #[serde(alias = "toolCalls")]
    pub tool_calls: Option<Vec<ProviderToolCallDelta>>,
    #[serde(alias = "functionCall")]
    pub function_call: Option<ProviderFunctionDelta>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ProviderToolCallDelta {
    pub index: u32,
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub function: Option<ProviderFunctionDelta>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ProviderFunctionDelta {
    pub name: Option<String>,
    pub arguments: Option<String>,
}

/// Chunk shape sent downstream. Absent fields are omitted when serialized.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompletionChunk {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_fingerprint: Option<String>,
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkChoice {
    pub index: u32,
    pub delta: ChunkDelta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkDelta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ChunkToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<ChunkFunction>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkToolCall {
    pub index: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function: Option<ChunkFunction>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkFunction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<String>,
}

impl From<ProviderFunctionDelta> for ChunkFunction {
    fn from(delta: ProviderFunctionDelta) -> Self {
        ChunkFunction {
            name: delta.name,
            arguments: delta.arguments,
        }
    }
}

impl From<ProviderToolCallDelta> for ChunkToolCall {
    fn from(delta: ProviderToolCallDelta) -> Self {
        ChunkToolCall {
            index: delta.index,
            id: delta.id,
            kind: delta.kind,
            function: delta.function.map(ChunkFunction::from),
        }
    }
}

/// Convert one provider chunk into the downstream shape.
///
/// Stateless: tool-call deltas keep their index and partial argument text, and nothing
/// is carried over from earlier chunks.
pub fn adapt_chunk(chunk: ProviderChunk) -> CompletionChunk {
    CompletionChunk {
        id: chunk.id,
        created: chunk.created,
        model: chunk.model,
        object: chunk.object,
        system_fingerprint: chunk.system_fingerprint,
        choices: chunk
            .choices
            .into_iter()
            .map(|choice| ChunkChoice {
                index: choice.index,
                delta: ChunkDelta {
                    content: choice.delta.content,
                    role: choice.delta.role,
                    tool_calls: choice
                        .delta
                        .tool_calls
                        .map(|calls| calls.into_iter().map(ChunkToolCall::from).collect()),
                    function_call: choice.delta.function_call.map(ChunkFunction::from),
                },
                finish_reason: choice.finish_reason,
            })
            .collect(),
    }
}

#[derive(Debug, Default)]
struct PendingCall {
    id: Option<String>,
    name: String,
    arguments: String,
}

impl PendingCall {
    fn absorb(&mut self, id: Option<&str>, function: Option<&ChunkFunction>) {
        if let Some(id) = id.filter(|id| !id.is_empty()) {
            self.id = Some(id.to_string());
        }
        if let Some(function) = function {
            if let Some(name) = &function.name {
                self.name.push_str(name);
            }
            if let Some(arguments) = &function.arguments {
                self.arguments.push_str(arguments);
            }
        }
    }
}

/// Collects the text and tool requests of a single model turn.
#[derive(Debug, Default)]
pub struct TurnAccumulator {
    text: String,
    tool_calls: BTreeMap<u32, PendingCall>,
    function_call: Option<PendingCall>,
    finish_reason: Option<String>,
}

impl TurnAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Absorb the first choice of a chunk.
    pub fn push(&mut self, chunk: &CompletionChunk) {
        let Some(choice) = chunk.choices.first() else {
            return;
        };

        if let Some(content) = &choice.delta.content {
            self.text.push_str(content);
        }

        for call in choice.delta.tool_calls.iter().flatten() {
            self.tool_calls
                .entry(call.index)
                .or_default()
                .absorb(call.id.as_deref(), call.function.as_ref());
        }

        if let Some(function) = &choice.delta.function_call {
            self.function_call
                .get_or_insert_with(PendingCall::default)
                .absorb(None, Some(function));
        }

        if let Some(reason) = &choice.finish_reason {
            self.finish_reason = Some(reason.clone());
        }
    }

    pub fn finish_reason(&self) -> Option<&str> {
        self.finish_reason.as_deref()
    }

    /// Build the assistant message for the turn. Tool requests appear in index order,
    /// followed by a legacy function call if one was streamed.
    pub fn into_message(self) -> Message {
        let mut message = Message::assistant();
        if !self.text.is_empty() {
            message = message.with_text(self.text);
        }

        for call in self.tool_calls.into_values().chain(self.function_call) {
            let id = call
                .id
                .unwrap_or_else(|| format!("call_{}", Uuid::new_v4().simple()));

            let tool_call = if is_valid_function_name(&call.name) {
                Ok(ToolCall::from_raw_arguments(call.name, &call.arguments))
            } else {
                Err(AgentError::ToolNotFound(format!(
                    "The provided function name '{}' had invalid characters, it must match this regex [a-zA-Z0-9_-]+",
                    call.name
                )))
            };
            message = message.with_tool_request(id, tool_call);
        }

        message
    }
}
