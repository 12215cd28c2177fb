use crate::state::AppState;
use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use bytes::Bytes;
use figchat::{
    agent::ReplyEvent,
    models::content::Content,
    models::message::{Message, MessageContent},
    models::role::Role,
    models::tool::ToolCall,
    providers::errors::ProviderError,
};
use futures::{stream::StreamExt, Stream};
use serde::Deserialize;
use serde_json::{json, Value};
use std::{
    convert::Infallible,
    pin::Pin,
    task::{Context, Poll},
    time::Duration,
};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_stream::wrappers::ReceiverStream;

// Types matching the incoming JSON structure
#[derive(Debug, Deserialize)]
struct ChatRequest {
    messages: Vec<IncomingMessage>,
}

#[derive(Debug, Deserialize)]
struct IncomingMessage {
    role: String,
    #[serde(default)]
    content: Value,
    #[serde(default)]
    tool_calls: Vec<IncomingToolCall>,
    #[serde(default)]
    tool_call_id: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IncomingToolCall {
    id: String,
    function: IncomingFunction,
}

#[derive(Debug, Deserialize)]
struct IncomingFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

/// How the reply is written to the client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReplyFormat {
    /// Only the model's text deltas
    Text,
    /// The line-prefixed data stream protocol
    Data,
}

impl ReplyFormat {
    fn from_headers(headers: &HeaderMap) -> Result<Self, StatusCode> {
        match headers.get("x-protocol") {
            None => Ok(ReplyFormat::Text),
            Some(protocol) => match protocol.to_str() {
                Ok("data") => Ok(ReplyFormat::Data),
                _ => Err(StatusCode::BAD_REQUEST),
            },
        }
    }

    /// Terminal line for a failure after the response has started.
    ///
    /// Plain text clients get the message on its own line behind an `[error]` marker.
    fn error_line(self, message: &str) -> String {
        match self {
            ReplyFormat::Text => format!("\n[error] {}\n", message),
            ReplyFormat::Data => ProtocolFormatter::format_error(message),
        }
    }
}

// Streams the channel out as the response body
pub struct ChatStream {
    rx: ReceiverStream<String>,
}

impl ChatStream {
    fn new(rx: ReceiverStream<String>) -> Self {
        Self { rx }
    }
}

impl Stream for ChatStream {
    type Item = Result<Bytes, Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.rx)
            .poll_next(cx)
            .map(|opt| opt.map(|s| Ok(Bytes::from(s))))
    }
}

impl ChatStream {
    fn into_reply(self, format: ReplyFormat) -> Response {
        let body = Body::from_stream(self);
        match format {
            ReplyFormat::Text => (
                [
                    (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
                    (header::CACHE_CONTROL, "no-cache"),
                ],
                body,
            )
                .into_response(),
            ReplyFormat::Data => (
                [
                    (header::CONTENT_TYPE, "text/event-stream"),
                    (header::CACHE_CONTROL, "no-cache"),
                    (header::CONNECTION, "keep-alive"),
                    (HeaderName::from_static("x-vercel-ai-data-stream"), "v1"),
                ],
                body,
            )
                .into_response(),
        }
    }
}

fn message_text(content: &Value) -> String {
    match content {
        Value::String(text) => text.clone(),
        Value::Array(parts) => parts
            .iter()
            .filter_map(|part| part.get("text").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join(""),
        _ => String::new(),
    }
}

// Convert incoming messages to our internal Message type
fn convert_messages(incoming: Vec<IncomingMessage>) -> Vec<Message> {
    let mut messages = Vec::new();

    for msg in incoming {
        let text = message_text(&msg.content);
        match msg.role.as_str() {
            "system" => messages.push(Message::system().with_text(text)),
            "user" => messages.push(Message::user().with_text(text)),
            "assistant" => {
                let mut message = Message::assistant();
                if !text.is_empty() {
                    message = message.with_text(text);
                }
                for call in msg.tool_calls {
                    let tool_call =
                        ToolCall::from_raw_arguments(call.function.name, &call.function.arguments);
                    message = message.with_tool_request(call.id, Ok(tool_call));
                }
                messages.push(message);
            }
            "tool" => messages.push(Message::tool(
                msg.tool_call_id.unwrap_or_default(),
                msg.name.unwrap_or_default(),
                Ok(vec![Content::text(text)]),
            )),
            _ => {
                tracing::warn!("Unknown role: {}", msg.role);
            }
        }
    }

    messages
}

// Protocol-specific message formatting
struct ProtocolFormatter;

impl ProtocolFormatter {
    fn format_text(text: &str) -> String {
        let encoded_text = serde_json::to_string(text).unwrap_or_else(|_| String::new());
        format!("0:{}\n", encoded_text)
    }

    fn format_tool_call(id: &str, name: &str, args: &Value) -> String {
        // Tool calls start with "9:"
        let tool_call = json!({
            "toolCallId": id,
            "toolName": name,
            "args": args
        });
        format!("9:{}\n", tool_call)
    }

    fn format_tool_response(id: &str, result: &[Content]) -> String {
        // Tool responses start with "a:"
        let response = json!({
            "toolCallId": id,
            "result": result,
        });
        format!("a:{}\n", response)
    }

    fn format_error(message: &str) -> String {
        let encoded = serde_json::to_string(message).unwrap_or_else(|_| String::new());
        format!("3:{}\n", encoded)
    }

    fn format_finish(reason: &str) -> String {
        // Finish messages start with "d:"
        let finish = json!({
            "finishReason": reason,
            "usage": {
                "promptTokens": 0,
                "completionTokens": 0
            }
        });
        format!("d:{}\n", finish)
    }
}

/// Lines to write for one agent event
fn render_event(event: ReplyEvent, format: ReplyFormat) -> Vec<String> {
    let mut lines = Vec::new();

    match event {
        ReplyEvent::Chunk(chunk) => {
            for choice in chunk.choices {
                if let Some(content) = choice.delta.content.filter(|c| !c.is_empty()) {
                    lines.push(match format {
                        ReplyFormat::Text => content,
                        ReplyFormat::Data => ProtocolFormatter::format_text(&content),
                    });
                }
            }
        }
        // Plain text clients only see the model's words
        ReplyEvent::Message(_) if format == ReplyFormat::Text => {}
        ReplyEvent::Message(message) => match message.role {
            Role::Assistant => {
                for request in message.tool_requests() {
                    match &request.tool_call {
                        Ok(tool_call) => lines.push(ProtocolFormatter::format_tool_call(
                            &request.id,
                            &tool_call.name,
                            &tool_call.arguments,
                        )),
                        // An invalid call still needs a request line to pair with its result
                        Err(_) => lines.push(ProtocolFormatter::format_tool_call(
                            &request.id,
                            "invalid name",
                            &json!({}),
                        )),
                    }
                }
            }
            Role::Tool => {
                for content in message.content {
                    if let MessageContent::ToolResponse(response) = content {
                        let result = match response.tool_result {
                            Ok(result) => result,
                            Err(err) => vec![Content::text(format!("Error: {}", err))],
                        };
                        lines.push(ProtocolFormatter::format_tool_response(
                            &response.id,
                            &result,
                        ));
                    }
                }
            }
            Role::System | Role::User => {}
        },
    }

    lines
}

/// Response for an error raised before anything was streamed
fn upstream_error_response(err: &anyhow::Error) -> Response {
    match err.downcast_ref::<ProviderError>() {
        Some(ProviderError::RateLimited {
            retry_after,
            limit,
            remaining,
            reset,
        }) => {
            let mut headers = HeaderMap::new();
            let pairs = [
                (header::RETRY_AFTER, retry_after),
                (HeaderName::from_static("x-ratelimit-limit"), limit),
                (HeaderName::from_static("x-ratelimit-remaining"), remaining),
                (HeaderName::from_static("x-ratelimit-reset"), reset),
            ];
            for (name, value) in pairs {
                if let Some(value) = value.as_deref().and_then(|v| HeaderValue::from_str(v).ok()) {
                    headers.insert(name, value);
                }
            }
            (
                StatusCode::TOO_MANY_REQUESTS,
                headers,
                Json(json!({"error": err.to_string()})),
            )
                .into_response()
        }
        Some(_) => (
            StatusCode::BAD_GATEWAY,
            Json(json!({"error": err.to_string()})),
        )
            .into_response(),
        None => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": err.to_string()})),
        )
            .into_response(),
    }
}

async fn handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ChatRequest>,
) -> Response {
    let format = match ReplyFormat::from_headers(&headers) {
        Ok(format) => format,
        Err(status) => return status.into_response(),
    };

    let messages = convert_messages(request.messages);
    let mut stream = state.agent.reply(&messages);

    // Wait for the first event so upstream failures can still pick the status code
    let first = match stream.next().await {
        Some(Ok(event)) => Some(event),
        Some(Err(e)) => {
            tracing::error!("Failed to start reply stream: {}", e);
            return upstream_error_response(&e);
        }
        None => None,
    };

    // Create channel for streaming
    let (tx, rx) = mpsc::channel(100);

    // Spawn task to handle streaming
    tokio::spawn(async move {
        let mut failed = false;

        'events: {
            if let Some(event) = first {
                for line in render_event(event, format) {
                    if tx.send(line).await.is_err() {
                        break 'events;
                    }
                }
            }

            loop {
                match timeout(Duration::from_millis(500), stream.next()).await {
                    Ok(Some(Ok(event))) => {
                        for line in render_event(event, format) {
                            if let Err(e) = tx.send(line).await {
                                tracing::error!("Error sending message through channel: {}", e);
                                break 'events;
                            }
                        }
                    }
                    Ok(Some(Err(e))) => {
                        tracing::error!("Error processing message: {}", e);
                        failed = true;
                        let _ = tx.send(format.error_line(&e.to_string())).await;
                        break;
                    }
                    Ok(None) => break,
                    Err(_) => {
                        // Heartbeat, used to detect disconnected clients and then stop the agent
                        if tx.is_closed() {
                            break;
                        }
                    }
                }
            }

            if format == ReplyFormat::Data {
                let reason = if failed { "error" } else { "stop" };
                let _ = tx.send(ProtocolFormatter::format_finish(reason)).await;
            }
        }
    });

    ChatStream::new(ReceiverStream::new(rx)).into_reply(format)
}

// Configure routes for this module
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/chat", post(handler))
        .with_state(state)
}
