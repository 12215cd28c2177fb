//! Client for the design server's MCP endpoint
//!
//! The server speaks JSON-RPC 2.0 over HTTP POST and may answer either with a plain JSON
//! document or with a server-sent-event body. [`McpClient`] owns everything that has to
//! persist between requests: the request id counter and whether the initialization
//! handshake has succeeded.
pub mod client;
pub mod errors;
pub mod figma;
pub mod protocol;
pub mod session;
pub mod sse;

pub use client::{McpClient, McpClientConfig};
pub use errors::{FailureKind, McpError, RpcFailure, TransportError};
pub use protocol::CallToolResult;
