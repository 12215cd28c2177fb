use serde::Serialize;
use thiserror::Error;

use crate::models::content::Content;

/// Coarse classification of an RPC failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    ConnectionRefused,
    Timeout,
    Status(u16),
    Unavailable,
    Other,
}

/// Errors raised while talking HTTP to the MCP server, before normalization.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Cannot connect to Figma MCP server. Please ensure Figma desktop app is running with MCP enabled.")]
    ConnectionRefused,

    #[error("Request to Figma MCP server timed out. Please try again.")]
    Timeout,

    #[error("Figma MCP server responded with error: {status} {reason}")]
    Status { status: u16, reason: String },

    #[error("Invalid response body from Figma MCP server: {0}")]
    Decode(String),

    #[error("{0}")]
    Request(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout
        } else if err.is_connect() {
            TransportError::ConnectionRefused
        } else if let Some(status) = err.status() {
            TransportError::Status {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or_default().to_string(),
            }
        } else {
            TransportError::Request(err.to_string())
        }
    }
}

impl TransportError {
    pub fn kind(&self) -> FailureKind {
        match self {
            TransportError::ConnectionRefused => FailureKind::ConnectionRefused,
            TransportError::Timeout => FailureKind::Timeout,
            TransportError::Status { status, .. } => FailureKind::Status(*status),
            TransportError::Decode(_) | TransportError::Request(_) => FailureKind::Other,
        }
    }
}

/// The uniform error envelope returned by every RPC boundary.
///
/// Serializes as `{"content": [{"type": "text", "text": "..."}], "isError": true, "error": "..."}`.
#[derive(Debug, Clone, PartialEq, Serialize, Error)]
#[error("{message}")]
#[serde(rename_all = "camelCase")]
pub struct RpcFailure {
    pub content: Vec<Content>,
    pub is_error: bool,
    #[serde(rename = "error")]
    pub message: String,
    #[serde(skip)]
    pub kind: FailureKind,
}

impl RpcFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            content: vec![Content::text(format!("Figma MCP server error: {}", message))],
            is_error: true,
            message,
            kind,
        }
    }

    /// Failure used when the initialization handshake did not succeed.
    pub fn unavailable() -> Self {
        Self::new(
            FailureKind::Unavailable,
            "Figma MCP server is not available",
        )
    }
}

impl From<TransportError> for RpcFailure {
    fn from(err: TransportError) -> Self {
        RpcFailure::new(err.kind(), err.to_string())
    }
}

/// Errors returned by the tool invocation gateway.
#[derive(Debug, Error)]
pub enum McpError {
    /// A wrapper was called without one of its mandatory fields; nothing was sent.
    #[error("{0} are required parameters")]
    MissingParameters(String),

    #[error(transparent)]
    Rpc(#[from] RpcFailure),

    #[error("Figma MCP server returned error {code}: {message}")]
    Server { code: i64, message: String },

    #[error("Unexpected response from Figma MCP server: {0}")]
    Protocol(String),

    #[error("Invalid MCP client configuration: {0}")]
    Config(String),
}
