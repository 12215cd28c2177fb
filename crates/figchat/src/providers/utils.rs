use anyhow::{anyhow, Result};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{json, Value};

use crate::models::content::Content;
use crate::models::message::{Message, MessageContent};
use crate::models::tool::{Tool, ToolCall};

lazy_static! {
    static ref INVALID_NAME_CHARS: Regex = Regex::new(r"[^a-zA-Z0-9_-]").unwrap();
    static ref VALID_NAME: Regex = Regex::new(r"^[a-zA-Z0-9_-]+$").unwrap();
}

/// Function name used in the request history for a tool request the model produced
/// with an unusable name. Keeps the request paired with its error result.
pub const INVALID_TOOL_NAME: &str = "invalid_tool_call";

/// Convert internal Message format to OpenAI's API message specification
pub fn messages_to_openai_spec(messages: &[Message]) -> Vec<Value> {
    let mut messages_spec = Vec::new();

    for message in messages {
        let mut converted = json!({
            "role": message.role
        });

        let mut output = Vec::new();

        for content in &message.content {
            match content {
                MessageContent::Text(text) => {
                    if !text.is_empty() {
                        converted["content"] = json!(text);
                    }
                }
                MessageContent::ToolRequest(request) => {
                    let function = match &request.tool_call {
                        Ok(tool_call) => json!({
                            "name": sanitize_function_name(&tool_call.name),
                            "arguments": raw_arguments(tool_call),
                        }),
                        Err(_) => json!({
                            "name": INVALID_TOOL_NAME,
                            "arguments": "{}",
                        }),
                    };

                    if let Some(map) = converted.as_object_mut() {
                        let tool_calls = map.entry("tool_calls").or_insert(json!([]));
                        if let Some(tool_calls) = tool_calls.as_array_mut() {
                            tool_calls.push(json!({
                                "id": request.id,
                                "type": "function",
                                "function": function,
                            }));
                        }
                    }
                }
                MessageContent::ToolResponse(response) => {
                    let text = match &response.tool_result {
                        Ok(contents) => tool_result_text(contents),
                        Err(e) => format!("Error: {}", e),
                    };

                    output.push(json!({
                        "role": "tool",
                        "tool_call_id": response.id,
                        "name": response.name,
                        "content": text,
                    }));
                }
            }
        }

        if converted.get("content").is_some() || converted.get("tool_calls").is_some() {
            output.insert(0, converted);
        }
        messages_spec.extend(output);
    }

    messages_spec
}

/// A lone plain text item is sent as its text, so results echoed back in the caller's
/// history keep the same shape on every turn. Anything richer is sent as JSON.
fn tool_result_text(contents: &[Content]) -> String {
    match contents {
        [item] if item.uri.is_none() && item.extra.is_empty() => match item.as_text() {
            Some(text) => text.to_string(),
            None => serde_json::to_string(contents).unwrap_or_else(|e| format!("Error: {}", e)),
        },
        _ => serde_json::to_string(contents).unwrap_or_else(|e| format!("Error: {}", e)),
    }
}

/// Arguments the model sent as unparseable text go back verbatim.
fn raw_arguments(tool_call: &ToolCall) -> String {
    match &tool_call.arguments {
        Value::String(raw) => raw.clone(),
        arguments => arguments.to_string(),
    }
}

/// Convert internal Tool format to OpenAI's API tool specification
pub fn tools_to_openai_spec(tools: &[Tool]) -> Result<Vec<Value>> {
    let mut tool_names = std::collections::HashSet::new();
    let mut result = Vec::new();

    for tool in tools {
        if !tool_names.insert(&tool.name) {
            return Err(anyhow!("Duplicate tool name: {}", tool.name));
        }

        result.push(json!({
            "type": "function",
            "function": {
                "name": tool.name,
                "description": tool.description,
                "parameters": tool.parameters,
            }
        }));
    }

    Ok(result)
}

pub fn sanitize_function_name(name: &str) -> String {
    INVALID_NAME_CHARS.replace_all(name, "_").to_string()
}

pub fn is_valid_function_name(name: &str) -> bool {
    VALID_NAME.is_match(name)
}
