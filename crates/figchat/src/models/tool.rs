use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A tool that can be used by a model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tool {
    /// The name of the tool
    pub name: String,
    /// A description of what the tool does
    pub description: String,
    /// A JSON Schema object describing the parameters the tool accepts
    pub parameters: Value,
}

impl Tool {
    /// Create a new tool with the given name and description
    pub fn new<N, D>(name: N, description: D, parameters: Value) -> Self
    where
        N: Into<String>,
        D: Into<String>,
    {
        Tool {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }

    /// Names listed under `required` in the parameter schema
    pub fn required(&self) -> Vec<&str> {
        self.parameters
            .get("required")
            .and_then(Value::as_array)
            .map(|fields| fields.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }
}

/// A tool call request that a system can execute
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    /// The name of the tool to execute
    pub name: String,
    /// The arguments for the execution. Arguments the model produced that could not be
    /// parsed as JSON are kept verbatim as a string value.
    pub arguments: Value,
}

impl ToolCall {
    /// Create a new ToolCall with the given name and arguments
    pub fn new<S: Into<String>>(name: S, arguments: Value) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }

    /// Build a call from the raw argument text streamed by the model.
    ///
    /// Empty text means no arguments. Text that is not valid JSON is logged and
    /// forwarded as-is so the tool server can report on it.
    pub fn from_raw_arguments<S: Into<String>>(name: S, raw: &str) -> Self {
        let name = name.into();
        if raw.trim().is_empty() {
            return Self::new(name, Value::Object(Default::default()));
        }

        let arguments = match serde_json::from_str::<Value>(raw) {
            Ok(arguments) => arguments,
            Err(e) => {
                tracing::error!(tool = %name, error = %e, "Error parsing arguments for tool call");
                Value::String(raw.to_string())
            }
        };
        Self::new(name, arguments)
    }
}
